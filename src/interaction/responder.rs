//! The away responder.
//!
//! [`ResponderConfig`] decides who still needs an away reply and sends it:
//! - `get_non_answered_mentions` fetches mentions and unread private messages and
//!   filters them down to at most one pending mention per requester.
//! - `respond_to_flow` / `respond_to_person` render the response template and post it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::{
    base::{
        config::Config,
        error::{ReplyTarget, ResponderError, TemplateError},
        template::Template,
        types::{IncomingMessage, MessageOrigin, PendingMention, PendingMentions, Res, SYSTEM_SENDER_ID},
    },
    service::{chat::ChatClient, history::LastCommunication},
};

/// Format used for the `From` and `Until` template fields (e.g. `02 Jan 20 15:04 UTC`).
pub const WINDOW_FORMAT: &str = "%d %b %y %H:%M %Z";

/// Product name linked from every reply.
const PRODUCT_NAME: &str = "Igor";

/// Append the attribution suffix to a reply.
pub fn add_suffix(message: &str, site_location: &str) -> String {
    format!("{message} Powered by [{PRODUCT_NAME}]({site_location})")
}

/// Responder bound to a single identity and its away window.
pub struct ResponderConfig {
    /// The identity this responder answers for.
    pub identity: String,
    active_from: DateTime<Utc>,
    active_until: DateTime<Utc>,
    template: Template,
    name_pattern: Regex,
    chat: ChatClient,
    history: Arc<dyn LastCommunication>,
}

impl ResponderConfig {
    /// Create a new responder.
    ///
    /// Fails if the message template is malformed.
    pub fn new(
        identity: &str,
        username: &str,
        message_format: &str,
        active_from: DateTime<Utc>,
        active_until: DateTime<Utc>,
        chat: ChatClient,
        history: Arc<dyn LastCommunication>,
    ) -> Res<Self> {
        let template = Template::parse(message_format).map_err(ResponderError::Template)?;
        let name_pattern = Regex::new(&format!("(?i)@{}", regex::escape(username)))?;

        Ok(Self {
            identity: identity.to_string(),
            active_from,
            active_until,
            template,
            name_pattern,
            chat,
            history,
        })
    }

    /// Create a responder from the application configuration.
    pub fn from_config(config: &Config, chat: ChatClient, history: Arc<dyn LastCommunication>) -> Res<Self> {
        Self::new(
            &config.identity,
            &config.flowdock_username,
            &config.message_format,
            config.active_from,
            config.active_until,
            chat,
            history,
        )
    }

    /// Whether the away window is open right now.
    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    /// Whether the away window is open at `moment`; both ends are exclusive.
    pub fn is_active_at(&self, moment: DateTime<Utc>) -> bool {
        self.active_from < moment && moment < self.active_until
    }

    /// Fetch mentions and unread private messages and return the ones that still need a reply,
    /// keyed by requester display name.
    ///
    /// Any fetch failure aborts the whole call: an incomplete view of who is waiting is not
    /// something to reply from.
    #[instrument(skip_all, fields(identity = %self.identity))]
    pub async fn get_non_answered_mentions(&self, mention_limit: u32) -> Res<PendingMentions> {
        let mut result = PendingMentions::default();

        let mentions = self.chat.fetch_mentions(mention_limit).await.map_err(|e| e.context("Could not fetch flowdock mentions"))?;
        for mention in mentions {
            self.add_message_to_result(mention, &mut result).await;
        }

        let private_messages = self
            .chat
            .fetch_unread_private_messages()
            .await
            .map_err(|e| e.context("Could not fetch flowdock private messages"))?;
        for private_message in private_messages {
            self.add_message_to_result(private_message, &mut result).await;
        }

        debug!("Found {} non-answered mentions", result.len());

        Ok(result)
    }

    /// Add `message` to `result` if its sender still needs a reply.
    ///
    /// A message sent in the same second as the last recorded reply counts as answered:
    /// the already-answered boundary is inclusive. A sender that can't be resolved is
    /// skipped with a warning rather than failing the batch.
    async fn add_message_to_result(&self, message: IncomingMessage, result: &mut PendingMentions) {
        // Integrations and other automation.
        if message.user_id == SYSTEM_SENDER_ID {
            return;
        }

        if message.origin == MessageOrigin::Flow && !self.name_pattern.is_match(&message.content) {
            return;
        }

        let Some(moment) = message.moment() else {
            warn!("Ignoring message from {} with out-of-range timestamp {}", message.user_id, message.sent);
            return;
        };

        if moment < self.active_from {
            return;
        }

        let user = match self.chat.resolve_user(&message.user_id).await {
            Ok(user) => user,
            Err(err) => {
                warn!("Ignoring message from {}, could not resolve the user: {:#}", message.user_id, err);
                return;
            }
        };

        if let Some(last) = self.history.last_communication_with(&user.nick)
            && last >= moment
        {
            return;
        }

        debug!("Reply candidate {} ({})", user.nick, user.name);

        result.insert_if_absent(PendingMention {
            user: user.nick,
            user_id: user.id,
            message: message.content,
            moment,
            flow: message.flow,
            thread_id: message.thread_id,
        });
    }

    /// Send the away reply into a flow thread.
    pub async fn respond_to_flow(&self, flow: &str, thread: &str, site_location: &str) -> Result<(), ResponderError> {
        let target = ReplyTarget::Flow {
            flow: flow.to_string(),
            thread: thread.to_string(),
        };

        let msg = self.get_response_message().map_err(|source| ResponderError::Render { target: target.clone(), source })?;
        let msg_with_suffix = add_suffix(&msg, site_location);

        info!("Responding to {}, msg {}", target, msg_with_suffix);

        self.chat
            .post_to_flow(flow, thread, &msg_with_suffix)
            .await
            .map_err(|source| ResponderError::Delivery { target, source })
    }

    /// Send the away reply as a private message.
    pub async fn respond_to_person(&self, user_id: u64, site_location: &str) -> Result<(), ResponderError> {
        let target = ReplyTarget::User { user_id };

        let msg = self.get_response_message().map_err(|source| ResponderError::Render { target: target.clone(), source })?;
        let msg_with_suffix = add_suffix(&msg, site_location);

        info!("Responding to {}, msg {}", target, msg_with_suffix);

        self.chat
            .post_to_user(user_id, &msg_with_suffix)
            .await
            .map_err(|source| ResponderError::Delivery { target, source })
    }

    /// Render the response template for the configured window.
    pub fn get_response_message(&self) -> Result<String, TemplateError> {
        let from = self.active_from.format(WINDOW_FORMAT).to_string();
        let until = self.active_until.format(WINDOW_FORMAT).to_string();

        self.template.render(&[("From", from.as_str()), ("Until", until.as_str())])
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use mockall::mock;

    use super::*;
    use crate::{
        base::types::{UserDetails, Void},
        service::chat::GenericChatClient,
    };

    mock! {
        pub Chat {}

        #[async_trait]
        impl GenericChatClient for Chat {
            async fn fetch_mentions(&self, limit: u32) -> Res<Vec<IncomingMessage>>;
            async fn fetch_unread_private_messages(&self) -> Res<Vec<IncomingMessage>>;
            async fn resolve_user(&self, user_id: &str) -> Res<UserDetails>;
            async fn post_to_flow(&self, flow: &str, thread_id: &str, text: &str) -> Void;
            async fn post_to_user(&self, user_id: u64, text: &str) -> Void;
        }
    }

    fn active_from() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 2, 15, 4, 0).unwrap()
    }

    fn active_until() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 3, 16, 0, 0).unwrap()
    }

    fn create_test_responder(message_format: &str, chat: MockChat) -> Res<ResponderConfig> {
        ResponderConfig::new(
            "milan",
            "milan",
            message_format,
            active_from(),
            active_until(),
            ChatClient::new(Arc::new(chat)),
            Arc::new(HashMap::<String, DateTime<Utc>>::new()),
        )
    }

    #[test]
    fn active_window_is_exclusive() {
        let responder = create_test_responder("away", MockChat::new()).unwrap();
        let second = Duration::seconds(1);

        assert!(!responder.is_active_at(active_from() - second));
        assert!(!responder.is_active_at(active_from()));
        assert!(responder.is_active_at(active_from() + second));
        assert!(responder.is_active_at(active_until() - second));
        assert!(!responder.is_active_at(active_until()));
        assert!(!responder.is_active_at(active_until() + second));
    }

    #[test]
    fn renders_window_bounds() {
        let responder = create_test_responder("{{.From}} / {{.Until}}", MockChat::new()).unwrap();

        assert_eq!(responder.get_response_message().unwrap(), "02 Jan 20 15:04 UTC / 03 Jan 20 16:00 UTC");
    }

    #[test]
    fn suffix_links_site_location() {
        assert_eq!(add_suffix("I'm away", "https://example.com"), "I'm away Powered by [Igor](https://example.com)");
    }

    #[test]
    fn malformed_template_fails_construction() {
        let err = create_test_responder("back {{.Until", MockChat::new()).err().unwrap();

        assert!(matches!(err.downcast_ref::<ResponderError>(), Some(ResponderError::Template(TemplateError::Unclosed(5)))));
    }

    #[test]
    fn username_is_matched_literally() {
        let responder = ResponderConfig::new(
            "dot",
            "a.b",
            "away",
            active_from(),
            active_until(),
            ChatClient::new(Arc::new(MockChat::new())),
            Arc::new(HashMap::<String, DateTime<Utc>>::new()),
        )
        .unwrap();

        assert!(responder.name_pattern.is_match("hey @A.B"));
        assert!(!responder.name_pattern.is_match("hey @axb"));
    }

    #[tokio::test]
    async fn responds_to_flow_with_suffix() {
        let mut chat = MockChat::new();
        chat.expect_post_to_flow()
            .withf(|flow, thread, text| flow == "f-1" && thread == "t-1" && text == "Back 03 Jan 20 16:00 UTC Powered by [Igor](https://example.com)")
            .times(1)
            .returning(|_, _, _| Ok(()));

        let responder = create_test_responder("Back {{.Until}}", chat).unwrap();

        responder.respond_to_flow("f-1", "t-1", "https://example.com").await.unwrap();
    }

    #[tokio::test]
    async fn render_failure_skips_delivery() {
        let mut chat = MockChat::new();
        chat.expect_post_to_user().never();

        let responder = create_test_responder("Ask {{.Backup}}", chat).unwrap();
        let err = responder.respond_to_person(17, "https://example.com").await.unwrap_err();

        assert!(matches!(err, ResponderError::Render { .. }));
        assert_eq!(err.target(), Some(&ReplyTarget::User { user_id: 17 }));
        assert!(err.to_string().contains("user 17"));
    }

    #[tokio::test]
    async fn delivery_failure_names_target() {
        let mut chat = MockChat::new();
        chat.expect_post_to_flow().returning(|_, _, _| Err(anyhow::anyhow!("flow is archived")));

        let responder = create_test_responder("away", chat).unwrap();
        let err = responder.respond_to_flow("f-1", "t-1", "https://example.com").await.unwrap_err();

        assert!(matches!(err, ResponderError::Delivery { .. }));
        assert!(err.to_string().contains("flow f-1, thread t-1"));
        assert!(err.to_string().contains("flow is archived"));
    }
}
