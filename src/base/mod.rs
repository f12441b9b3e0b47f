//! Core components, types, and utilities for igor.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - Response templates.
//! - Common types, errors and result handling.

pub mod config;
pub mod error;
pub mod template;
pub mod types;
