//! Error kinds surfaced by backends and the dispatcher.

use crate::agent_api::BackendKind;

/// A backend could not produce a reply.
///
/// Connect failures, non-success statuses, unparseable bodies, timeouts and
/// sign-in failures all collapse into this one error.
#[derive(Debug, thiserror::Error)]
#[error("{backend} backend unavailable: {source:#}")]
pub struct BackendError {
    pub backend: BackendKind,
    #[source]
    pub source: anyhow::Error,
}

impl BackendError {
    pub fn new(backend: BackendKind, source: impl Into<anyhow::Error>) -> Self {
        Self {
            backend,
            source: source.into(),
        }
    }
}

/// Dispatch error types
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Unknown persona: {id}")]
    UnknownPersona { id: String },

    #[error(transparent)]
    BackendUnavailable(#[from] BackendError),

    #[error("Request cancelled")]
    Cancelled,
}

impl DispatchError {
    pub fn unknown_persona(id: impl Into<String>) -> Self {
        DispatchError::UnknownPersona { id: id.into() }
    }

    /// Whether the fallback generator may stand in for this failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DispatchError::BackendUnavailable(_))
    }
}
