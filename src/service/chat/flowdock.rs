//! Flowdock REST implementation of the chat client.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{NoneAsEmptyString, serde_as};
use tracing::{debug, instrument};

use crate::base::{
    config::Config,
    types::{IncomingMessage, MessageOrigin, Res, UserDetails, Void},
};

use super::{ChatClient, GenericChatClient};

// Extra methods on `ChatClient` applied by the flowdock implementation.

impl ChatClient {
    /// Creates a new Flowdock chat client.
    pub fn flowdock(config: &Config) -> Res<Self> {
        let client = FlowdockChatClient::new(&config.flowdock_api_url, &config.flowdock_token)?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Wire types.

/// A notification entry, as returned by the notification endpoints.
#[derive(Debug, Deserialize)]
struct FlowdockNotification {
    message: FlowdockMessageEvent,
}

/// The subset of a Flowdock message event that igor cares about.
#[serde_as]
#[derive(Debug, Deserialize)]
struct FlowdockMessageEvent {
    user: String,
    /// A plain string for `message` events, an object with a `text` field for `comment` events.
    #[serde(default)]
    content: Value,
    sent: i64,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    flow: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    thread_id: Option<String>,
}

impl From<FlowdockMessageEvent> for IncomingMessage {
    fn from(event: FlowdockMessageEvent) -> Self {
        let content = match event.content {
            Value::String(text) => text,
            Value::Object(mut object) => match object.remove("text") {
                Some(Value::String(text)) => text,
                _ => String::new(),
            },
            _ => String::new(),
        };

        let origin = if event.flow.is_some() { MessageOrigin::Flow } else { MessageOrigin::Private };

        Self {
            user_id: event.user,
            content,
            sent: event.sent,
            flow: event.flow,
            thread_id: event.thread_id,
            origin,
        }
    }
}

#[derive(Debug, Serialize)]
struct FlowMessageRequest<'a> {
    event: &'static str,
    flow: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_id: Option<&'a str>,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct PrivateMessageRequest<'a> {
    event: &'static str,
    content: &'a str,
}

// Structs.

/// Flowdock client implementation.
///
/// Authenticates with a personal API token sent as the basic-auth username.
#[derive(Clone)]
pub struct FlowdockChatClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl FlowdockChatClient {
    /// Create a new Flowdock chat client against the given API base URL.
    pub fn new(api_url: &str, token: &str) -> Res<Self> {
        let client = reqwest::Client::builder().user_agent(concat!("igor/", env!("CARGO_PKG_VERSION"))).build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.api_url, path)).basic_auth(&self.token, Some(""))
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> Res<Response> {
        let response = request.send().await.with_context(|| format!("Flowdock request to {path} failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_else(|e| format!("Failed to read error response: {e}"));
            return Err(anyhow::anyhow!("Flowdock request to {path} failed ({status}): {message}"));
        }

        Ok(response)
    }

    async fn fetch_notifications(&self, path: &str) -> Res<Vec<IncomingMessage>> {
        let response = self.send(self.request(Method::GET, path), path).await?;
        let notifications: Vec<FlowdockNotification> = response.json().await.with_context(|| format!("Malformed Flowdock response from {path}"))?;

        debug!("Fetched {} notifications from {}", notifications.len(), path);

        Ok(notifications.into_iter().map(|n| n.message.into()).collect())
    }
}

#[async_trait]
impl GenericChatClient for FlowdockChatClient {
    #[instrument(skip(self))]
    async fn fetch_mentions(&self, limit: u32) -> Res<Vec<IncomingMessage>> {
        self.fetch_notifications(&format!("/notifications/mentions?limit={limit}")).await
    }

    #[instrument(skip(self))]
    async fn fetch_unread_private_messages(&self) -> Res<Vec<IncomingMessage>> {
        self.fetch_notifications("/notifications/private?unread=true").await
    }

    #[instrument(skip(self))]
    async fn resolve_user(&self, user_id: &str) -> Res<UserDetails> {
        let path = format!("/users/{user_id}");
        let response = self.send(self.request(Method::GET, &path), &path).await?;

        Ok(response.json().await.with_context(|| format!("Malformed Flowdock response from {path}"))?)
    }

    #[instrument(skip(self, text))]
    async fn post_to_flow(&self, flow: &str, thread_id: &str, text: &str) -> Void {
        let path = "/messages";
        let body = FlowMessageRequest {
            event: "message",
            flow,
            thread_id: Some(thread_id).filter(|t| !t.is_empty()),
            content: text,
        };

        self.send(self.request(Method::POST, path).json(&body), path).await?;

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn post_to_user(&self, user_id: u64, text: &str) -> Void {
        let path = format!("/private/{user_id}/messages");
        let body = PrivateMessageRequest { event: "message", content: text };

        self.send(self.request(Method::POST, &path).json(&body), &path).await?;

        Ok(())
    }
}

// Tests.
