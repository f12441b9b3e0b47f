//! Service integrations for external APIs and state.
//!
//! This module contains implementations for the services igor depends on:
//! - Chat services (e.g., Flowdock)
//! - The last-communication history
//!
//! Each service module defines both generic traits and concrete implementations,
//! allowing for extensibility and easy testing.

pub mod chat;
pub mod history;
