//! Mention handling and away replies for igor.
//!
//! This module provides the responder, which:
//! - Collects mentions and private messages that still need a reply
//! - Renders the away message for the configured window
//! - Posts replies back into flows or private conversations

pub mod responder;
