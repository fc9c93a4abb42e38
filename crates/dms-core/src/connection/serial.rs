// Serial-over-IP and smart-serial connections.

use dms_api::messages::ElementPortInfo;
use strum::{Display, EnumString};

use crate::error::DmsError;
use crate::tracked::assign;

use super::ip::IpSettings;
use super::{ConnectionKind, PortField};

/// Transport used to carry serial traffic over IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum IpTransport {
    #[default]
    Tcp,
    Udp,
}

fn transport_from_tag(tag: &str) -> IpTransport {
    tag.parse().unwrap_or_default()
}

// ── Serial ──────────────────────────────────────────────────────────

/// Serial connection reached over TCP or UDP. `single` marks a port that
/// must not be shared with other elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConnection {
    ip: IpSettings,
    transport: IpTransport,
    is_ssl: bool,
    single: bool,
}

impl SerialConnection {
    pub fn new(polling_ip: &str, ip_port: u16, transport: IpTransport) -> Result<Self, DmsError> {
        Ok(Self {
            ip: IpSettings::new(polling_ip, Some(ip_port))?,
            transport,
            is_ssl: false,
            single: false,
        })
    }

    /// Same as [`new`](Self::new) for a port reserved to one element.
    pub fn new_single(
        polling_ip: &str,
        ip_port: u16,
        transport: IpTransport,
    ) -> Result<Self, DmsError> {
        Ok(Self {
            single: true,
            ..Self::new(polling_ip, ip_port, transport)?
        })
    }

    pub(crate) fn from_port(kind: ConnectionKind, info: &ElementPortInfo) -> Self {
        Self {
            ip: IpSettings::from_port(info),
            transport: transport_from_tag(&info.type_of_ip),
            is_ssl: info.is_ssl,
            single: kind == ConnectionKind::SerialSingle,
        }
    }

    pub fn kind(&self) -> ConnectionKind {
        if self.single {
            ConnectionKind::SerialSingle
        } else {
            ConnectionKind::Serial
        }
    }

    pub fn ip(&self) -> &IpSettings {
        &self.ip
    }

    pub fn ip_mut(&mut self) -> &mut IpSettings {
        &mut self.ip
    }

    pub fn transport(&self) -> IpTransport {
        self.transport
    }

    pub fn is_ssl(&self) -> bool {
        self.is_ssl
    }

    pub fn set_transport(&mut self, transport: IpTransport) {
        assign(&mut self.transport, transport, &mut self.ip.changes, PortField::TypeOfIp);
    }

    pub fn set_ssl(&mut self, is_ssl: bool) {
        assign(&mut self.is_ssl, is_ssl, &mut self.ip.changes, PortField::IsSsl);
    }

    pub(crate) fn is_updated(&self) -> bool {
        self.ip.changes.any()
    }

    pub(crate) fn write_changed(&self, info: &mut ElementPortInfo) {
        self.ip.write_changed(info);
        if self.ip.changes.contains(&PortField::TypeOfIp) {
            info.type_of_ip = self.transport.to_string();
        }
        if self.ip.changes.contains(&PortField::IsSsl) {
            info.is_ssl = self.is_ssl;
        }
    }

    pub(crate) fn write_all(&self, info: &mut ElementPortInfo) {
        self.ip.write_all(info);
        info.type_of_ip = self.transport.to_string();
        info.is_ssl = self.is_ssl;
    }
}

// ── Smart-serial ────────────────────────────────────────────────────

/// Smart-serial connection: the agent listens for, or connects to, a raw
/// TCP stream and frames responses itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartSerialConnection {
    ip: IpSettings,
    transport: IpTransport,
    single: bool,
}

impl SmartSerialConnection {
    pub fn new(polling_ip: &str, ip_port: u16) -> Result<Self, DmsError> {
        Ok(Self {
            ip: IpSettings::new(polling_ip, Some(ip_port))?,
            transport: IpTransport::Tcp,
            single: false,
        })
    }

    pub fn new_single(polling_ip: &str, ip_port: u16) -> Result<Self, DmsError> {
        Ok(Self {
            single: true,
            ..Self::new(polling_ip, ip_port)?
        })
    }

    pub(crate) fn from_port(kind: ConnectionKind, info: &ElementPortInfo) -> Self {
        Self {
            ip: IpSettings::from_port(info),
            transport: transport_from_tag(&info.type_of_ip),
            single: kind == ConnectionKind::SmartSerialSingle,
        }
    }

    pub fn kind(&self) -> ConnectionKind {
        if self.single {
            ConnectionKind::SmartSerialSingle
        } else {
            ConnectionKind::SmartSerial
        }
    }

    pub fn ip(&self) -> &IpSettings {
        &self.ip
    }

    pub fn ip_mut(&mut self) -> &mut IpSettings {
        &mut self.ip
    }

    pub fn transport(&self) -> IpTransport {
        self.transport
    }

    pub fn set_transport(&mut self, transport: IpTransport) {
        assign(&mut self.transport, transport, &mut self.ip.changes, PortField::TypeOfIp);
    }

    pub(crate) fn is_updated(&self) -> bool {
        self.ip.changes.any()
    }

    pub(crate) fn write_changed(&self, info: &mut ElementPortInfo) {
        self.ip.write_changed(info);
        if self.ip.changes.contains(&PortField::TypeOfIp) {
            info.type_of_ip = self.transport.to_string();
        }
    }

    pub(crate) fn write_all(&self, info: &mut ElementPortInfo) {
        self.ip.write_all(info);
        info.type_of_ip = self.transport.to_string();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn single_flag_follows_tag() {
        let info = ElementPortInfo {
            protocol_type: "serial single".into(),
            type_of_ip: "udp".into(),
            ..ElementPortInfo::default()
        };
        let conn = SerialConnection::from_port(ConnectionKind::SerialSingle, &info);
        assert_eq!(conn.kind(), ConnectionKind::SerialSingle);
        assert_eq!(conn.transport(), IpTransport::Udp);
    }

    #[test]
    fn unknown_transport_defaults_to_tcp() {
        assert_eq!(transport_from_tag(""), IpTransport::Tcp);
        assert_eq!(transport_from_tag("UDP"), IpTransport::Udp);
    }

    #[test]
    fn transport_change_is_written() {
        let mut conn = SmartSerialConnection::new("10.1.1.1", 4001).unwrap();
        conn.set_transport(IpTransport::Tcp);
        assert!(!conn.is_updated());
        conn.set_transport(IpTransport::Udp);
        let mut info = ElementPortInfo::default();
        conn.write_changed(&mut info);
        assert_eq!(info.type_of_ip, "udp");
    }
}
