//! Recoverable errors raised by the responder.
//!
//! Fetch failures are not represented here: they abort the whole poll pass and
//! travel as plain [`anyhow::Error`]s. The variants below are the ones a caller
//! is expected to log and move past.

use std::fmt;

use thiserror::Error;

/// Where a reply was headed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyTarget {
    /// A flow, and the thread within it.
    Flow { flow: String, thread: String },
    /// A private conversation with a user.
    User { user_id: u64 },
}

impl fmt::Display for ReplyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyTarget::Flow { flow, thread } => write!(f, "flow {flow}, thread {thread}"),
            ReplyTarget::User { user_id } => write!(f, "user {user_id}"),
        }
    }
}

/// Problems with the response template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unclosed action starting at byte {0}")]
    Unclosed(usize),

    #[error("empty action at byte {0}")]
    EmptyAction(usize),

    #[error("unsupported action \"{action}\" at byte {position}; expected a field reference like {{{{.From}}}}")]
    UnsupportedAction { action: String, position: usize },

    #[error("can't evaluate field {0}")]
    MissingField(String),
}

/// Errors returned by the responder operations.
#[derive(Error, Debug)]
pub enum ResponderError {
    #[error("Invalid response template: {0}")]
    Template(#[from] TemplateError),

    #[error("Could not answer to {target} because of {source}")]
    Render { target: ReplyTarget, source: TemplateError },

    #[error("Could not deliver answer to {target}: {source}")]
    Delivery { target: ReplyTarget, source: anyhow::Error },
}

impl ResponderError {
    /// The reply target, for render and delivery errors.
    pub fn target(&self) -> Option<&ReplyTarget> {
        match self {
            ResponderError::Template(_) => None,
            ResponderError::Render { target, .. } | ResponderError::Delivery { target, .. } => Some(target),
        }
    }
}
