// HTTP connection with its TCP endpoint.

use dms_api::messages::ElementPortInfo;

use crate::error::DmsError;
use crate::tracked::assign;

use super::PortField;
use super::ip::IpSettings;

pub const DEFAULT_HTTP_PORT: u16 = 80;
pub const DEFAULT_HTTPS_PORT: u16 = 443;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConnection {
    tcp: IpSettings,
    is_ssl: bool,
    bypass_proxy: bool,
}

impl HttpConnection {
    /// New plain-HTTP connection to `host` on port 80.
    pub fn new(host: &str) -> Result<Self, DmsError> {
        Ok(Self {
            tcp: IpSettings::new(host, Some(DEFAULT_HTTP_PORT))?,
            is_ssl: false,
            bypass_proxy: false,
        })
    }

    /// New HTTPS connection to `host` on port 443.
    pub fn new_tls(host: &str) -> Result<Self, DmsError> {
        Ok(Self {
            tcp: IpSettings::new(host, Some(DEFAULT_HTTPS_PORT))?,
            is_ssl: true,
            bypass_proxy: false,
        })
    }

    pub(crate) fn from_port(info: &ElementPortInfo) -> Self {
        Self {
            tcp: IpSettings::from_port(info),
            is_ssl: info.is_ssl,
            bypass_proxy: info.bypass_proxy,
        }
    }

    /// Remote host, port and timing.
    pub fn tcp(&self) -> &IpSettings {
        &self.tcp
    }

    pub fn tcp_mut(&mut self) -> &mut IpSettings {
        &mut self.tcp
    }

    pub fn is_ssl(&self) -> bool {
        self.is_ssl
    }

    pub fn bypass_proxy(&self) -> bool {
        self.bypass_proxy
    }

    pub fn set_ssl(&mut self, is_ssl: bool) {
        assign(&mut self.is_ssl, is_ssl, &mut self.tcp.changes, PortField::IsSsl);
    }

    pub fn set_bypass_proxy(&mut self, bypass: bool) {
        assign(
            &mut self.bypass_proxy,
            bypass,
            &mut self.tcp.changes,
            PortField::BypassProxy,
        );
    }

    pub(crate) fn is_updated(&self) -> bool {
        self.tcp.changes.any()
    }

    pub(crate) fn write_changed(&self, info: &mut ElementPortInfo) {
        self.tcp.write_changed(info);
        if self.tcp.changes.contains(&PortField::IsSsl) {
            info.is_ssl = self.is_ssl;
        }
        if self.tcp.changes.contains(&PortField::BypassProxy) {
            info.bypass_proxy = self.bypass_proxy;
        }
    }

    pub(crate) fn write_all(&self, info: &mut ElementPortInfo) {
        self.tcp.write_all(info);
        info.is_ssl = self.is_ssl;
        info.bypass_proxy = self.bypass_proxy;
        info.type_of_ip = "tcp".into();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tls_constructor_uses_443() {
        let conn = HttpConnection::new_tls("api.example.net").unwrap();
        assert_eq!(conn.tcp().ip_port(), Some(443));
        assert!(conn.is_ssl());
    }

    #[test]
    fn proxy_flag_is_tracked() {
        let mut conn = HttpConnection::new("10.2.2.2").unwrap();
        conn.set_bypass_proxy(false);
        assert!(!conn.is_updated());
        conn.set_bypass_proxy(true);
        assert!(conn.is_updated());
    }
}
