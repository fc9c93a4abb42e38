// HTTP gateway
//
// `TransportConfig` builds the reqwest client (TLS, timeout), and
// `HttpCommunication` implements `Communication` by POSTing each request as
// JSON and unwrapping the `{ ok, data, error }` envelope.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::communication::Communication;
use crate::error::Error;
use crate::messages::{Request, Response};

/// TLS verification mode (api-level mirror of core's TlsVerification).
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (for self-signed agents).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("dms-sdk/", env!("CARGO_PKG_VERSION")));

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

// ── Envelope ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    data: Vec<Response>,
    #[serde(default)]
    error: Option<RemoteError>,
}

#[derive(Debug, Deserialize)]
struct RemoteError {
    code: i32,
    #[serde(default)]
    message: String,
}

// ── HttpCommunication ────────────────────────────────────────────────

/// JSON-over-HTTP implementation of [`Communication`].
///
/// Every request is a `POST {base}/api/messages`; the body is the
/// serialized [`Request`] and the reply is the response envelope:
/// ```json
/// { "ok": true, "data": [ { "type": "elementInfo", "data": { ... } } ] }
/// { "ok": false, "error": { "code": -2146233088, "message": "..." } }
/// ```
pub struct HttpCommunication {
    http: reqwest::Client,
    endpoint: Url,
    credentials: Option<(String, SecretString)>,
    timeout_secs: u64,
}

impl HttpCommunication {
    /// Create a gateway for the agent at `base_url`.
    pub fn new(base_url: &Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, base_url, transport.timeout)
    }

    /// Create a gateway around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: &Url,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let base = base_url.as_str().trim_end_matches('/');
        let endpoint = Url::parse(&format!("{base}/api/messages"))?;
        Ok(Self {
            http,
            endpoint,
            credentials: None,
            timeout_secs: timeout.as_secs(),
        })
    }

    /// Authenticate every request with HTTP basic auth.
    pub fn with_credentials(mut self, username: impl Into<String>, password: SecretString) -> Self {
        self.credentials = Some((username.into(), password));
        self
    }

    /// The endpoint every request is posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn post(&self, request: &Request) -> Result<String, Error> {
        let mut builder = self.http.post(self.endpoint.clone()).json(request);
        if let Some((user, password)) = &self.credentials {
            builder = builder.basic_auth(user, Some(password.expose_secret()));
        }

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_secs: self.timeout_secs,
                }
            } else {
                Error::Transport(e)
            }
        })?;

        let resp = resp.error_for_status()?;
        resp.text().await.map_err(Error::Transport)
    }
}

#[async_trait]
impl Communication for HttpCommunication {
    async fn send_message(&self, request: Request) -> Result<Vec<Response>, Error> {
        debug!(request = request.name(), "POST {}", self.endpoint);

        let body = self.post(&request).await?;
        let envelope: Envelope =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;

        if envelope.ok {
            return Ok(envelope.data);
        }

        let remote = envelope.error.unwrap_or(RemoteError {
            code: 0,
            message: "request rejected without error details".into(),
        });
        Err(Error::Remote {
            code: remote.code,
            message: remote.message,
        })
    }
}
