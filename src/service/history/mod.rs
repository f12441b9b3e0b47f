//! Last-communication history.
//!
//! The responder only ever reads from the history: it asks when a requester was
//! last answered. Writing is left to whoever sends the replies (see `runtime`).

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use chrono::{DateTime, Utc};

// Traits.

/// Read-only lookup of when each requester was last answered.
///
/// Keys are requester display names.
pub trait LastCommunication: Send + Sync + 'static {
    /// When the requester was last answered, if ever.
    fn last_communication_with(&self, name: &str) -> Option<DateTime<Utc>>;
}

impl LastCommunication for HashMap<String, DateTime<Utc>> {
    fn last_communication_with(&self, name: &str) -> Option<DateTime<Utc>> {
        self.get(name).copied()
    }
}

// Structs.

/// In-memory history store.
///
/// It is designed to be trivially cloneable; clones share the same entries.
#[derive(Clone, Default)]
pub struct MemoryHistory {
    inner: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
}

impl MemoryHistory {
    /// Create a history seeded with existing entries.
    pub fn new(seed: HashMap<String, DateTime<Utc>>) -> Self {
        Self { inner: Arc::new(RwLock::new(seed)) }
    }

    /// Record that `name` was answered at `moment`.
    pub fn record(&self, name: &str, moment: DateTime<Utc>) {
        let mut entries = self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(name.to_string(), moment);
    }

    /// A copy of all entries.
    pub fn snapshot(&self) -> HashMap<String, DateTime<Utc>> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }
}

impl LastCommunication for MemoryHistory {
    fn last_communication_with(&self, name: &str) -> Option<DateTime<Utc>> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner()).get(name).copied()
    }
}
