//! Library root for `igor`.
//!
//! Igor is an away responder for Flowdock. While its owner is away it:
//! - Watches for mentions and unread private messages
//! - Skips anything already answered, sent before the away window, or sent by automation
//! - Replies once per requester with a templated out-of-office message
//!
//! The chat service and the reply history sit behind traits, so the responder can be
//! exercised without a network connection.

pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::{debug, info};

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the igor runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with the chat client, history and responder
/// - Runs a single pass (`once`) or polls until interrupted
pub async fn start(config: Config, once: bool) -> Void {
    info!("Starting igor for {} ...", config.identity);

    // Start the crypto provider.
    install_crypto_provider();

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config)?;

    // Run.
    if once {
        let sent = runtime.run_once().await?;
        info!("Sent {} replies.", sent);
        return Ok(());
    }

    runtime.start().await?;

    Ok(())
}

/// Install the ring crypto provider for rustls, returning whether this call installed it.
///
/// An already-installed provider is kept.
pub fn install_crypto_provider() -> bool {
    let installed = crypto::ring::default_provider().install_default().is_ok();

    if !installed {
        debug!("A rustls crypto provider was already installed, keeping it.");
    }

    installed
}
