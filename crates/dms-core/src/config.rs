// ── Runtime connection configuration ──
//
// Describes *how* to reach the platform's gateway. Carries credential data
// and transport tuning, but never touches disk: `dms-config` (or any other
// caller) builds a `DmsConfig` and hands it to `Dms::connect`.

use std::path::PathBuf;
use std::time::Duration;

use dms_api::{TlsMode, TransportConfig};
use secrecy::SecretString;
use url::Url;

/// Basic-auth credentials for the gateway.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed agents).
    DangerAcceptInvalid,
}

/// Configuration for connecting to one system.
#[derive(Debug, Clone)]
pub struct DmsConfig {
    /// Gateway base URL (e.g., `https://dms.example.net`).
    pub url: Url,
    /// `None` for gateways that do not require authentication.
    pub credentials: Option<Credentials>,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl DmsConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(url: Url) -> Self {
        Self {
            url,
            credentials: None,
            tls: TlsVerification::default(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn transport_mirrors_tls_and_timeout() {
        let mut config = DmsConfig::new(Url::parse("https://dms.local").unwrap());
        config.tls = TlsVerification::DangerAcceptInvalid;
        config.timeout = Duration::from_secs(5);

        let transport = config.transport();
        assert!(matches!(transport.tls, TlsMode::DangerAcceptInvalid));
        assert_eq!(transport.timeout, Duration::from_secs(5));
    }
}
