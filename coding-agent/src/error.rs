//! Error types for the agent.
//!
//! Only `MissingCredential` is fatal, and only at startup. Everything else is
//! scoped to one task or refinement round and reported to the user.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("missing credential: set {var} (environment or .env) before starting")]
    MissingCredential { var: &'static str },

    #[error("generation service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation service returned {status}: {body}")]
    GenerationStatus { status: u16, body: String },

    #[error("generation service returned an empty reply")]
    EmptyReply,

    #[error("{event} is not accepted while {state}")]
    UnexpectedEvent {
        state: &'static str,
        event: &'static str,
    },

    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {path}: {source}")]
    InvalidSettings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// Whether the session must stop rather than move on to the next task.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AgentError::MissingCredential { .. })
    }
}
