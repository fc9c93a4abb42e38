// SNMPv3 secret encoding
//
// Agents expect SNMPv3 passwords in an agent-specific encoded form. The
// encoder is handed to `Dms` at construction and consulted only when a
// connection serializes its security configuration.

use secrecy::{ExposeSecret, SecretString};

use crate::error::DmsError;

/// Encodes secrets for transmission to an agent.
pub trait CredentialEncoder: Send + Sync {
    fn encode(&self, secret: &SecretString) -> Result<String, DmsError>;
}

/// Sends secrets as-is. Suitable for agents reached over TLS that accept
/// clear-text credentials, and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextEncoder;

impl CredentialEncoder for PlainTextEncoder {
    fn encode(&self, secret: &SecretString) -> Result<String, DmsError> {
        Ok(secret.expose_secret().to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let secret = SecretString::from("auth-pass");
        assert_eq!(PlainTextEncoder.encode(&secret).unwrap(), "auth-pass");
    }
}
