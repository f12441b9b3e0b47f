//! Runtime services and shared state for igor.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    interaction::responder::ResponderConfig,
    service::{chat::ChatClient, history::MemoryHistory},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the configuration, the chat client, the reply history and
/// the responder built on top of them.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The chat client instance.
    pub chat: ChatClient,
    /// When each requester was last answered.
    pub history: MemoryHistory,
    /// The responder for the configured identity.
    pub responder: Arc<ResponderConfig>,
}

impl Runtime {
    /// Create a new runtime instance talking to Flowdock.
    #[instrument(skip_all)]
    pub fn new(config: Config) -> Res<Self> {
        let chat = ChatClient::flowdock(&config)?;

        Self::with_chat(config, chat)
    }

    /// Create a new runtime instance around an existing chat client.
    pub fn with_chat(config: Config, chat: ChatClient) -> Res<Self> {
        let history = MemoryHistory::new(config.last_communication.clone());
        let responder = ResponderConfig::from_config(&config, chat.clone(), Arc::new(history.clone()))?;

        Ok(Self {
            config,
            chat,
            history,
            responder: Arc::new(responder),
        })
    }

    /// Run a single poll pass, returning how many replies were sent.
    ///
    /// A failure to collect the pending mentions fails the pass before anything is sent.
    /// A failure to answer one requester is logged and the remaining ones are still answered.
    #[instrument(skip_all, fields(identity = %self.responder.identity))]
    pub async fn run_once(&self) -> Res<usize> {
        if !self.responder.is_active() {
            info!("Responder is not active, nothing to do.");
            return Ok(0);
        }

        let mentions = self.responder.get_non_answered_mentions(self.config.mention_limit).await?;

        info!("Found {} requesters waiting for a reply", mentions.len());

        let site_location = &self.config.site_location;
        let mut sent = 0;

        for mention in mentions {
            let result = match &mention.flow {
                Some(flow) => self.responder.respond_to_flow(flow, mention.thread_id.as_deref().unwrap_or_default(), site_location).await,
                None => self.responder.respond_to_person(mention.user_id, site_location).await,
            };

            match result {
                Ok(()) => {
                    self.history.record(&mention.user, Utc::now());
                    sent += 1;
                }
                Err(err) => error!("Could not reply to {}: {}", mention.user, err),
            }
        }

        Ok(sent)
    }

    /// Start polling.
    ///
    /// With a zero poll interval a single pass is run and its failure is returned.
    /// Otherwise passes run on the interval until Ctrl-C; failed passes are logged and
    /// retried on the next tick.
    pub async fn start(&self) -> Void {
        if self.config.poll_interval_seconds == 0 {
            let sent = self.run_once().await?;
            info!("Sent {} replies.", sent);
            return Ok(());
        }

        let mut interval = tokio::time::interval(Duration::from_secs(self.config.poll_interval_seconds));

        loop {
            tokio::select! {
                _ = interval.tick() => match self.run_once().await {
                    Ok(sent) => info!("Poll pass done, sent {} replies.", sent),
                    Err(err) => warn!("Poll pass failed: {:#}", err),
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutting down ...");
                    break;
                }
            }
        }

        Ok(())
    }
}
