//! CLI error types with miette diagnostics.
//!
//! Maps `DmsError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use dms_config::ConfigError;
use dms_core::DmsError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const STATE: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the gateway")]
    #[diagnostic(
        code(dms::connection_failed),
        help(
            "Check that the gateway is running and accessible.\n\
             Try: dms agents list --insecure"
        )
    )]
    ConnectionFailed {
        #[source]
        source: dms_api::Error,
    },

    #[error("TLS setup failed: {message}")]
    #[diagnostic(
        code(dms::tls_error),
        help(
            "Use --insecure (-k) to accept a self-signed certificate, \
             or configure ca_cert in your profile."
        )
    )]
    TlsError { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("No password configured for user '{username}' in profile '{profile}'")]
    #[diagnostic(
        code(dms::no_credentials),
        help(
            "Store one with: dms config set-password --profile {profile}\n\
             Or set the DMS_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String, username: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(dms::not_found),
        help("Run: dms {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Element {identifier} is stopped")]
    #[diagnostic(
        code(dms::element_stopped),
        help("Start it first: dms elements start {identifier}")
    )]
    ElementStopped { identifier: String },

    // ── Remote ───────────────────────────────────────────────────────
    #[error("Gateway error ({code}): {message}")]
    #[diagnostic(code(dms::remote_error))]
    RemoteError { code: i32, message: String },

    #[error(transparent)]
    #[diagnostic(code(dms::api))]
    Api(dms_api::Error),

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(dms::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(dms::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: dms config init --url <URL>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No gateway configured")]
    #[diagnostic(
        code(dms::no_config),
        help(
            "Create a profile with: dms config init --url <URL>\n\
             Or pass --url. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(dms::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(dms::confirmation_required),
        help("Re-run with --yes (-y) to confirm.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(dms::timeout),
        help("Increase timeout with --timeout or check gateway responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render JSON: {0}")]
    #[diagnostic(code(dms::json))]
    Json(#[from] serde_json::Error),

    #[error("Could not render YAML: {0}")]
    #[diagnostic(code(dms::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } => exit_code::CONNECTION,
            Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::ElementStopped { .. } => exit_code::STATE,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    fn not_found(resource_type: &str, identifier: String, list_command: &str) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            identifier,
            list_command: list_command.into(),
        }
    }
}

// ── Gateway errors ───────────────────────────────────────────────────

impl From<dms_api::Error> for CliError {
    fn from(err: dms_api::Error) -> Self {
        match err {
            dms_api::Error::Remote { code, message } => CliError::RemoteError { code, message },
            dms_api::Error::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            dms_api::Error::Tls(message) => CliError::TlsError { message },
            err @ dms_api::Error::Transport(_) => CliError::ConnectionFailed { source: err },
            other => CliError::Api(other),
        }
    }
}

// ── DmsError → CliError mapping ──────────────────────────────────────

impl From<DmsError> for CliError {
    fn from(err: DmsError) -> Self {
        match err {
            DmsError::ElementNotFound { identifier } => {
                Self::not_found("element", identifier, "elements list")
            }
            DmsError::AgentNotFound { agent_id } => {
                Self::not_found("agent", agent_id.to_string(), "agents list")
            }
            DmsError::ViewNotFound { identifier } => {
                Self::not_found("view", identifier, "views list")
            }
            DmsError::ServiceNotFound { identifier } => {
                Self::not_found("service", identifier, "services list")
            }
            DmsError::ProtocolNotFound { name, version } => {
                Self::not_found("protocol", format!("{name} {version}"), "protocols list")
            }
            DmsError::TemplateNotFound {
                name,
                protocol,
                version,
            } => Self::not_found(
                "template",
                format!("{name} ({protocol} {version})"),
                "protocols show",
            ),

            DmsError::ElementStopped { identifier } => CliError::ElementStopped { identifier },

            DmsError::InvalidArgument { name, reason } | DmsError::OutOfRange { name, reason } => {
                CliError::Validation {
                    field: name,
                    reason,
                }
            }
            err @ (DmsError::IncorrectData { .. }
            | DmsError::Overflow { .. }
            | DmsError::NotLoaded { .. }) => CliError::Validation {
                field: "input".into(),
                reason: err.to_string(),
            },

            DmsError::Api(err) => err.into(),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile, username } => {
                CliError::NoCredentials { profile, username }
            }
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_exit_code_four() {
        let err: CliError = DmsError::ElementNotFound {
            identifier: "400/201".into(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert!(err.to_string().contains("400/201"));
    }

    #[test]
    fn remote_codes_survive_the_mapping() {
        let err: CliError = DmsError::Api(dms_api::Error::Remote {
            code: -5,
            message: "busy".into(),
        })
        .into();
        assert!(matches!(err, CliError::RemoteError { code: -5, .. }));
    }

    #[test]
    fn stopped_element_has_its_own_exit_code() {
        let err: CliError = DmsError::ElementStopped {
            identifier: "400/201".into(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::STATE);
    }
}
