//! Chat service integration for igor.
//!
//! This module provides functionality for interacting with the chat platform:
//! - Fetching mentions and unread private messages
//! - Resolving user details
//! - Replying in flows and in private conversations
//!
//! It defines the `GenericChatClient` trait that can be implemented for different
//! chat services, with a default implementation for Flowdock.

pub mod flowdock;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{IncomingMessage, Res, UserDetails, Void};

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait is the whole boundary between the responder and the chat service.
/// Implementing it allows the responder to run against a different service, or
/// against a mock in tests.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Fetch the most recent mentions of the configured user.
    ///
    /// At most `limit` messages are returned, in the order the service reports them.
    async fn fetch_mentions(&self, limit: u32) -> Res<Vec<IncomingMessage>>;

    /// Fetch private messages the configured user has not read yet.
    async fn fetch_unread_private_messages(&self) -> Res<Vec<IncomingMessage>>;

    /// Resolve the details (display name and numeric id) of a user.
    async fn resolve_user(&self, user_id: &str) -> Res<UserDetails>;

    /// Post a message into a flow, inside the given thread.
    async fn post_to_flow(&self, flow: &str, thread_id: &str, text: &str) -> Void;

    /// Post a private message to a user.
    async fn post_to_user(&self, user_id: u64, text: &str) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
