use thiserror::Error;

/// Remote error code the platform returns when an entity id does not
/// resolve to anything (`0x80131500`).
pub const NOT_FOUND_CODE: i32 = -2_146_233_088;

/// Top-level error type for the `dms-api` crate.
///
/// Covers every failure mode of the gateway: remote errors carrying a
/// numeric code, HTTP transport, framing, and protocol mismatches.
/// `dms-core` maps the one well-known "not found" code into typed domain
/// errors and propagates everything else unchanged.
#[derive(Debug, Error)]
pub enum Error {
    // ── Remote ──────────────────────────────────────────────────────
    /// The remote side rejected the request with a numeric error code.
    #[error("Remote error {code}: {message}")]
    Remote { code: i32, message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A response arrived, but not of the kind the request asked for.
    #[error("Unexpected response: expected {expected}, got {got}")]
    UnexpectedResponse { expected: &'static str, got: String },

    /// The gateway produced no response where exactly one was required.
    #[error("No response received for {request}")]
    NoResponse { request: &'static str },
}

impl Error {
    /// Build a remote error carrying the "not found" code.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::Remote {
            code: NOT_FOUND_CODE,
            message: message.into(),
        }
    }

    /// Returns `true` if this is the remote "entity not found by id" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Remote { code, .. } if *code == NOT_FOUND_CODE)
    }

    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// Nothing in this workspace retries automatically; callers decide.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// The numeric remote error code, if this error carries one.
    pub fn remote_code(&self) -> Option<i32> {
        match self {
            Self::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_code_is_recognized() {
        assert!(Error::not_found("Element 400/201 is unavailable").is_not_found());
        assert_eq!(
            Error::not_found("x").remote_code(),
            Some(NOT_FOUND_CODE)
        );
    }

    #[test]
    fn other_codes_are_not_not_found() {
        let err = Error::Remote {
            code: -2_147_220_935,
            message: "busy".into(),
        };
        assert!(!err.is_not_found());
        assert!(!Error::NoResponse { request: "GetElementInfo" }.is_not_found());
    }
}
