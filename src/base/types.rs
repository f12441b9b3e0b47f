use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// Sender id the chat service uses for integrations and other automation.
pub const SYSTEM_SENDER_ID: &str = "0";

/// Where an incoming message was posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageOrigin {
    /// A flow (channel) message, possibly inside a thread.
    Flow,
    /// A direct message to the configured user.
    Private,
}

/// A single inbound message, as fetched from the chat service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Sender user id.
    pub user_id: String,
    /// Text content of the message.
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub sent: i64,
    /// Flow id, for flow messages.
    pub flow: Option<String>,
    /// Thread id, when the message belongs to a thread.
    pub thread_id: Option<String>,
    pub origin: MessageOrigin,
}

impl IncomingMessage {
    /// The moment the message was sent, truncated to whole seconds.
    pub fn moment(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.sent.div_euclid(1000), 0)
    }
}

/// Resolved details about a chat user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    pub id: u64,
    /// Display name; used as the key of the last-communication history.
    pub nick: String,
    #[serde(default)]
    pub name: String,
}

/// A requester that still needs an away reply, along with the message that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingMention {
    pub user: String,
    pub user_id: u64,
    pub message: String,
    pub moment: DateTime<Utc>,
    pub flow: Option<String>,
    pub thread_id: Option<String>,
}

/// Pending mentions keyed by requester display name, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PendingMentions {
    entries: Vec<PendingMention>,
}

impl PendingMentions {
    /// Insert a mention unless one is already pending for the same requester.
    ///
    /// Returns whether the mention was inserted.
    pub fn insert_if_absent(&mut self, mention: PendingMention) -> bool {
        if self.contains(&mention.user) {
            return false;
        }

        self.entries.push(mention);
        true
    }

    pub fn contains(&self, user: &str) -> bool {
        self.get(user).is_some()
    }

    pub fn get(&self, user: &str) -> Option<&PendingMention> {
        self.entries.iter().find(|m| m.user == user)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Requester display names, in insertion order.
    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|m| m.user.as_str())
    }
}

impl IntoIterator for PendingMentions {
    type Item = PendingMention;
    type IntoIter = std::vec::IntoIter<PendingMention>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn message(sent: i64) -> IncomingMessage {
        IncomingMessage {
            user_id: "42".to_string(),
            content: "hello".to_string(),
            sent,
            flow: None,
            thread_id: None,
            origin: MessageOrigin::Private,
        }
    }

    #[test]
    fn moment_truncates_milliseconds() {
        let expected = Utc.with_ymd_and_hms(2020, 1, 2, 15, 4, 5).unwrap();

        assert_eq!(message(expected.timestamp() * 1000 + 999).moment(), Some(expected));
        assert_eq!(message(expected.timestamp() * 1000).moment(), Some(expected));
    }

    #[test]
    fn pending_mentions_keep_first_per_user() {
        let moment = Utc.with_ymd_and_hms(2020, 1, 2, 15, 4, 0).unwrap();
        let mention = |user: &str, message: &str| PendingMention {
            user: user.to_string(),
            user_id: 1,
            message: message.to_string(),
            moment,
            flow: None,
            thread_id: None,
        };
        let mut pending = PendingMentions::default();

        assert!(pending.insert_if_absent(mention("ana", "first")));
        assert!(pending.insert_if_absent(mention("bob", "other")));
        assert!(!pending.insert_if_absent(mention("ana", "second")));

        assert_eq!(pending.len(), 2);
        assert_eq!(pending.get("ana").map(|m| m.message.as_str()), Some("first"));
        assert_eq!(pending.users().collect::<Vec<_>>(), vec!["ana", "bob"]);
    }
}
