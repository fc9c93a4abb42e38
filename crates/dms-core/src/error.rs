// ── Core error types ──
//
// User-facing errors from dms-core. Callers match on the typed not-found
// variants instead of raw remote codes: the single well-known "not found"
// code is mapped at each call site (where the entity and identifier are
// known), and every other gateway error propagates through `Api`.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum DmsError {
    // ── Argument errors ──────────────────────────────────────────────
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("Argument '{name}' is out of range: {reason}")]
    OutOfRange { name: String, reason: String },

    // ── Not-found errors ─────────────────────────────────────────────
    #[error("Element not found: {identifier}")]
    ElementNotFound { identifier: String },

    #[error("Agent not found: {agent_id}")]
    AgentNotFound { agent_id: i32 },

    #[error("View not found: {identifier}")]
    ViewNotFound { identifier: String },

    #[error("Service not found: {identifier}")]
    ServiceNotFound { identifier: String },

    #[error("Protocol not found: {name} version {version}")]
    ProtocolNotFound { name: String, version: String },

    #[error("Template '{name}' not found for protocol {protocol} version {version}")]
    TemplateNotFound {
        name: String,
        protocol: String,
        version: String,
    },

    // ── State errors ─────────────────────────────────────────────────
    #[error("Element {identifier} is stopped")]
    ElementStopped { identifier: String },

    #[error("{entity} {identifier} is not loaded; call load() first")]
    NotLoaded {
        entity: &'static str,
        identifier: String,
    },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Incorrect data: {message}")]
    IncorrectData { message: String },

    #[error("Collection is full: at most {capacity} entries are allowed")]
    Overflow { capacity: usize },

    // ── Gateway errors ───────────────────────────────────────────────
    #[error(transparent)]
    Api(#[from] dms_api::Error),
}

impl DmsError {
    pub(crate) fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn out_of_range(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OutOfRange {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn incorrect(message: impl Into<String>) -> Self {
        Self::IncorrectData {
            message: message.into(),
        }
    }

    /// Returns `true` for any of the typed not-found variants.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. }
                | Self::AgentNotFound { .. }
                | Self::ViewNotFound { .. }
                | Self::ServiceNotFound { .. }
                | Self::ProtocolNotFound { .. }
                | Self::TemplateNotFound { .. }
        )
    }
}

/// Map the remote "not found" code to `not_found()`, pass anything else
/// through as [`DmsError::Api`].
pub(crate) fn map_not_found(err: dms_api::Error, not_found: impl FnOnce() -> DmsError) -> DmsError {
    if err.is_not_found() {
        not_found()
    } else {
        DmsError::Api(err)
    }
}
