// ── Element connections ──
//
// One connection per element port. The raw port record's tag selects the
// concrete variant; parsing and serialization are exhaustive matches over
// `ElementConnection`. Each variant tracks its own changed fields so an
// update only rewrites what moved.

pub mod http;
pub mod ip;
pub mod serial;
pub mod snmp;

use dms_api::messages::ElementPortInfo;
use strum::{AsRefStr, Display, EnumString};

use crate::credential::CredentialEncoder;
use crate::error::DmsError;

pub use http::HttpConnection;
pub use ip::IpSettings;
pub use serial::{IpTransport, SerialConnection, SmartSerialConnection};
pub use snmp::{
    SnmpCommunityConnection, SnmpV3AuthAlgorithm, SnmpV3Connection, SnmpV3EncryptionAlgorithm,
    SnmpV3Security, SnmpV3SecurityConfig, SnmpV3SecurityLevel,
};

// ── Kinds ───────────────────────────────────────────────────────────

/// Connection type tag, as declared by a protocol or carried on a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(ascii_case_insensitive)]
pub enum ConnectionKind {
    #[strum(serialize = "virtual")]
    Virtual,
    #[strum(to_string = "snmp", serialize = "snmpv1")]
    SnmpV1,
    #[strum(serialize = "snmpv2")]
    SnmpV2,
    #[strum(serialize = "snmpv3")]
    SnmpV3,
    #[strum(serialize = "serial")]
    Serial,
    #[strum(serialize = "serial single")]
    SerialSingle,
    #[strum(serialize = "smart-serial")]
    SmartSerial,
    #[strum(serialize = "smart-serial single")]
    SmartSerialSingle,
    #[strum(serialize = "http")]
    Http,
    #[strum(serialize = "gpib")]
    Gpib,
    #[strum(serialize = "opc")]
    Opc,
    #[strum(serialize = "sla")]
    Sla,
    #[strum(serialize = "websocket")]
    WebSocket,
}

impl ConnectionKind {
    /// Parse a raw tag, failing with a data error for unknown tags.
    pub fn from_tag(tag: &str) -> Result<Self, DmsError> {
        tag.trim()
            .parse()
            .map_err(|_| DmsError::incorrect(format!("unknown connection type '{tag}'")))
    }

    /// Whether a connection of this kind can be placed on a port the
    /// protocol declares as `declared`. SNMP versions satisfy every older
    /// version; shared serial ports accept the single-port variant's
    /// connection and vice versa within the same family.
    pub fn satisfies(self, declared: ConnectionKind) -> bool {
        use ConnectionKind as K;
        match (self, declared) {
            (a, b) if a == b => true,
            (K::SnmpV2, K::SnmpV1) | (K::SnmpV3, K::SnmpV1 | K::SnmpV2) => true,
            (K::Serial, K::SerialSingle) | (K::SmartSerial, K::SmartSerialSingle) => true,
            _ => false,
        }
    }
}

/// Changed-field markers shared by every connection variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortField {
    PollingIp,
    IpPort,
    BusAddress,
    Retries,
    Timeout,
    ElapsedTimeout,
    GetCommunity,
    SetCommunity,
    TypeOfIp,
    IsSsl,
    BypassProxy,
    Security,
}

/// What serialization needs beyond the connection itself.
pub(crate) struct PortWriteContext<'a> {
    pub encoder: &'a dyn CredentialEncoder,
    /// Host agent predates the SNMPv3 credential layout change.
    pub legacy_snmpv3: bool,
}

// ── Simple variants ─────────────────────────────────────────────────

/// Port without a physical endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VirtualConnection;

/// IP connection of a type with no dedicated settings (GPIB, OPC, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealConnection {
    kind: ConnectionKind,
    ip: IpSettings,
}

impl RealConnection {
    pub fn new(kind: ConnectionKind, polling_ip: &str, ip_port: Option<u16>) -> Result<Self, DmsError> {
        Ok(Self {
            kind,
            ip: IpSettings::new(polling_ip, ip_port)?,
        })
    }

    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    pub fn ip(&self) -> &IpSettings {
        &self.ip
    }

    pub fn ip_mut(&mut self) -> &mut IpSettings {
        &mut self.ip
    }
}

// ── ElementConnection ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementConnection {
    Virtual(VirtualConnection),
    SnmpV1(SnmpCommunityConnection),
    SnmpV2(SnmpCommunityConnection),
    SnmpV3(SnmpV3Connection),
    Serial(SerialConnection),
    SmartSerial(SmartSerialConnection),
    Http(HttpConnection),
    Real(RealConnection),
}

impl ElementConnection {
    /// Parse a raw port record.
    pub fn from_port(info: &ElementPortInfo) -> Result<Self, DmsError> {
        use ConnectionKind as K;
        let kind = ConnectionKind::from_tag(&info.protocol_type)?;
        Ok(match kind {
            K::Virtual => Self::Virtual(VirtualConnection),
            K::SnmpV1 => Self::SnmpV1(SnmpCommunityConnection::from_port(info)),
            K::SnmpV2 => Self::SnmpV2(SnmpCommunityConnection::from_port(info)),
            K::SnmpV3 => Self::SnmpV3(SnmpV3Connection::from_port(info)?),
            K::Serial | K::SerialSingle => Self::Serial(SerialConnection::from_port(kind, info)),
            K::SmartSerial | K::SmartSerialSingle => {
                Self::SmartSerial(SmartSerialConnection::from_port(kind, info))
            }
            K::Http => Self::Http(HttpConnection::from_port(info)),
            K::Gpib | K::Opc | K::Sla | K::WebSocket => Self::Real(RealConnection {
                kind,
                ip: IpSettings::from_port(info),
            }),
        })
    }

    pub fn kind(&self) -> ConnectionKind {
        match self {
            Self::Virtual(_) => ConnectionKind::Virtual,
            Self::SnmpV1(_) => ConnectionKind::SnmpV1,
            Self::SnmpV2(_) => ConnectionKind::SnmpV2,
            Self::SnmpV3(_) => ConnectionKind::SnmpV3,
            Self::Serial(c) => c.kind(),
            Self::SmartSerial(c) => c.kind(),
            Self::Http(_) => ConnectionKind::Http,
            Self::Real(c) => c.kind(),
        }
    }

    /// `true` when a field changed since load.
    pub fn is_updated(&self) -> bool {
        match self {
            Self::Virtual(_) => false,
            Self::SnmpV1(c) | Self::SnmpV2(c) => c.is_updated(),
            Self::SnmpV3(c) => c.is_updated(),
            Self::Serial(c) => c.is_updated(),
            Self::SmartSerial(c) => c.is_updated(),
            Self::Http(c) => c.is_updated(),
            Self::Real(c) => c.ip.changes.any(),
        }
    }

    /// Apply changed fields onto the port's current raw record.
    pub(crate) fn write_changed(
        &self,
        info: &mut ElementPortInfo,
        ctx: &PortWriteContext<'_>,
    ) -> Result<(), DmsError> {
        match self {
            Self::Virtual(_) => {}
            Self::SnmpV1(c) | Self::SnmpV2(c) => c.write_changed(info),
            Self::SnmpV3(c) => c.write_changed(info, ctx)?,
            Self::Serial(c) => c.write_changed(info),
            Self::SmartSerial(c) => c.write_changed(info),
            Self::Http(c) => c.write_changed(info),
            Self::Real(c) => c.ip.write_changed(info),
        }
        Ok(())
    }

    /// Serialize the whole connection as the record for `port_index`.
    pub(crate) fn to_port(
        &self,
        port_index: i32,
        ctx: &PortWriteContext<'_>,
    ) -> Result<ElementPortInfo, DmsError> {
        let mut info = ElementPortInfo {
            port_index,
            protocol_type: self.kind().to_string(),
            ..ElementPortInfo::default()
        };
        match self {
            Self::Virtual(_) => {}
            Self::SnmpV1(c) | Self::SnmpV2(c) => c.write_all(&mut info),
            Self::SnmpV3(c) => c.write_all(&mut info, ctx)?,
            Self::Serial(c) => c.write_all(&mut info),
            Self::SmartSerial(c) => c.write_all(&mut info),
            Self::Http(c) => c.write_all(&mut info),
            Self::Real(c) => c.ip.write_all(&mut info),
        }
        Ok(info)
    }
}

// ── Mutable access ──────────────────────────────────────────────────

/// Mutable borrow of one connection's settings. The variant itself cannot
/// be changed through it; use `DmsElement::set_connection` to replace a
/// connection.
#[derive(Debug)]
pub enum ElementConnectionMut<'a> {
    Virtual,
    SnmpV1(&'a mut SnmpCommunityConnection),
    SnmpV2(&'a mut SnmpCommunityConnection),
    SnmpV3(&'a mut SnmpV3Connection),
    Serial(&'a mut SerialConnection),
    SmartSerial(&'a mut SmartSerialConnection),
    Http(&'a mut HttpConnection),
    Real(&'a mut RealConnection),
}

impl<'a> From<&'a mut ElementConnection> for ElementConnectionMut<'a> {
    fn from(connection: &'a mut ElementConnection) -> Self {
        match connection {
            ElementConnection::Virtual(_) => Self::Virtual,
            ElementConnection::SnmpV1(c) => Self::SnmpV1(c),
            ElementConnection::SnmpV2(c) => Self::SnmpV2(c),
            ElementConnection::SnmpV3(c) => Self::SnmpV3(c),
            ElementConnection::Serial(c) => Self::Serial(c),
            ElementConnection::SmartSerial(c) => Self::SmartSerial(c),
            ElementConnection::Http(c) => Self::Http(c),
            ElementConnection::Real(c) => Self::Real(c),
        }
    }
}

// ── Collection ──────────────────────────────────────────────────────

/// One port: the connection plus the wire record it was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PortSlot {
    port_index: i32,
    connection: ElementConnection,
    /// Raw record and parsed connection as loaded; `None` for new ports.
    loaded: Option<(ElementPortInfo, ElementConnection)>,
    replaced: bool,
}

impl PortSlot {
    fn fresh(port_index: i32, connection: ElementConnection) -> Self {
        Self {
            port_index,
            connection,
            loaded: None,
            replaced: true,
        }
    }

    /// Settings swapped wholesale through a mutable borrow leave no field
    /// markers behind; they show up as a difference from the loaded copy.
    fn is_replaced(&self) -> bool {
        self.replaced
            || (!self.connection.is_updated()
                && self
                    .loaded
                    .as_ref()
                    .is_some_and(|(_, original)| *original != self.connection))
    }

    fn has_updates(&self) -> bool {
        self.is_replaced() || self.connection.is_updated()
    }
}

/// The connections of one element, ordered by port index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementConnections {
    slots: Vec<PortSlot>,
}

impl ElementConnections {
    pub(crate) fn from_ports(ports: &[ElementPortInfo]) -> Result<Self, DmsError> {
        let mut sorted: Vec<&ElementPortInfo> = ports.iter().collect();
        sorted.sort_by_key(|p| p.port_index);
        let slots = sorted
            .into_iter()
            .map(|info| {
                let connection = ElementConnection::from_port(info)?;
                Ok(PortSlot {
                    port_index: info.port_index,
                    loaded: Some((info.clone(), connection.clone())),
                    connection,
                    replaced: false,
                })
            })
            .collect::<Result<Vec<_>, DmsError>>()?;
        Ok(Self { slots })
    }

    pub fn get(&self, index: usize) -> Option<&ElementConnection> {
        self.slots.get(index).map(|s| &s.connection)
    }

    /// Edit the settings of the connection at `index` in place. Each
    /// setter records its own changed field.
    pub fn get_mut(&mut self, index: usize) -> Option<ElementConnectionMut<'_>> {
        self.slots
            .get_mut(index)
            .map(|s| ElementConnectionMut::from(&mut s.connection))
    }

    /// Wire port number of the connection at `index`.
    pub fn port_index(&self, index: usize) -> Option<i32> {
        self.slots.get(index).map(|s| s.port_index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ElementConnection> {
        self.slots.iter().map(|s| &s.connection)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Put `connection` at position `index`, checked against the kind the
    /// protocol declares for that slot's port number. `index` may append
    /// one past the end; the new port takes the number after the last one.
    pub(crate) fn assign(
        &mut self,
        index: usize,
        connection: ElementConnection,
        declared: &[ConnectionKind],
    ) -> Result<(), DmsError> {
        let port_index = match self.slots.get(index) {
            Some(slot) => slot.port_index,
            None if index == self.slots.len() => {
                self.slots.last().map_or(0, |s| s.port_index.saturating_add(1))
            }
            None => {
                return Err(DmsError::out_of_range(
                    "index",
                    format!(
                        "port {index} cannot be set before port {}",
                        self.slots.len()
                    ),
                ));
            }
        };
        let declared_kind = usize::try_from(port_index)
            .ok()
            .and_then(|i| declared.get(i).copied())
            .ok_or_else(|| {
                DmsError::out_of_range(
                    "index",
                    format!(
                        "port {port_index} does not exist; the protocol declares {} connection(s)",
                        declared.len()
                    ),
                )
            })?;
        if !connection.kind().satisfies(declared_kind) {
            return Err(DmsError::incorrect(format!(
                "connection at index {index}: a {} connection cannot be used where the protocol declares {declared_kind}",
                connection.kind()
            )));
        }

        match self.slots.get_mut(index) {
            Some(slot) => {
                if slot.connection == connection {
                    return Ok(());
                }
                slot.connection = connection;
                slot.replaced = true;
            }
            None => self.slots.push(PortSlot::fresh(port_index, connection)),
        }
        Ok(())
    }

    pub fn has_updates(&self) -> bool {
        self.slots.iter().any(PortSlot::has_updates)
    }

    /// Port records for every changed connection. Replaced connections are
    /// serialized whole; edited ones are applied onto the record they were
    /// loaded from.
    pub(crate) fn changed_ports(
        &self,
        ctx: &PortWriteContext<'_>,
    ) -> Result<Vec<ElementPortInfo>, DmsError> {
        let mut ports = Vec::new();
        for slot in &self.slots {
            if slot.is_replaced() {
                ports.push(slot.connection.to_port(slot.port_index, ctx)?);
            } else if slot.connection.is_updated() {
                let mut record = slot.loaded.as_ref().map_or_else(
                    || ElementPortInfo {
                        port_index: slot.port_index,
                        protocol_type: slot.connection.kind().to_string(),
                        ..ElementPortInfo::default()
                    },
                    |(info, _)| info.clone(),
                );
                slot.connection.write_changed(&mut record, ctx)?;
                ports.push(record);
            }
        }
        Ok(ports)
    }

    /// Every connection serialized whole, for element creation.
    pub(crate) fn all_ports(&self, ctx: &PortWriteContext<'_>) -> Result<Vec<ElementPortInfo>, DmsError> {
        self.slots
            .iter()
            .map(|s| s.connection.to_port(s.port_index, ctx))
            .collect()
    }
}

impl From<Vec<ElementConnection>> for ElementConnections {
    fn from(items: Vec<ElementConnection>) -> Self {
        let slots = (0..)
            .zip(items)
            .map(|(port_index, connection)| PortSlot {
                port_index,
                connection,
                loaded: None,
                replaced: false,
            })
            .collect();
        Self { slots }
    }
}
