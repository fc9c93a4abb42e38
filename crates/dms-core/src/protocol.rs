// ── Protocols ──
//
// A protocol is the driver definition an element executes, addressed by
// `(name, version)`. The special version "Production" points at another
// concrete version.

use std::fmt;

use dms_api::messages::{AlarmTemplateInfo, ProtocolInfo, Request, TrendTemplateInfo};
use tracing::debug;

use crate::connection::ConnectionKind;
use crate::dms::Dms;
use crate::error::DmsError;
use crate::template::{DmsAlarmTemplate, DmsTrendTemplate};

/// Version name that resolves to the protocol's production version.
pub const PRODUCTION_VERSION: &str = "Production";

/// `(name, version)` reference to a protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProtocolRef {
    pub name: String,
    pub version: String,
}

impl ProtocolRef {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_owned(),
            version: version.to_owned(),
        }
    }

    /// Build a reference, rejecting empty parts.
    pub fn validated(name: &str, version: &str) -> Result<Self, DmsError> {
        if name.trim().is_empty() {
            return Err(DmsError::invalid("protocolName", "must not be empty"));
        }
        if version.trim().is_empty() {
            return Err(DmsError::invalid("protocolVersion", "must not be empty"));
        }
        Ok(Self::new(name.trim(), version.trim()))
    }
}

impl fmt::Display for ProtocolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// A port declared by a protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConnection {
    pub name: String,
    pub kind: ConnectionKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ProtocolData {
    protocol_type: Option<ConnectionKind>,
    device_type: String,
    referenced_version: Option<String>,
    connections: Vec<ProtocolConnection>,
}

impl ProtocolData {
    fn from_info(info: &ProtocolInfo) -> Result<Self, DmsError> {
        let protocol_type = if info.protocol_type.trim().is_empty() {
            None
        } else {
            Some(ConnectionKind::from_tag(&info.protocol_type)?)
        };

        let mut connections = info
            .connections
            .iter()
            .map(|c| {
                Ok(ProtocolConnection {
                    name: c.name.clone(),
                    kind: ConnectionKind::from_tag(&c.protocol_type)?,
                })
            })
            .collect::<Result<Vec<_>, DmsError>>()?;
        if connections.is_empty() {
            if let Some(kind) = protocol_type {
                connections.push(ProtocolConnection {
                    name: String::new(),
                    kind,
                });
            }
        }

        Ok(Self {
            protocol_type,
            device_type: info.device_type.clone(),
            referenced_version: (!info.referenced_version.is_empty())
                .then(|| info.referenced_version.clone()),
            connections,
        })
    }
}

/// Handle to one protocol version.
#[derive(Clone)]
pub struct DmsProtocol {
    dms: Dms,
    reference: ProtocolRef,
    data: Option<ProtocolData>,
}

impl fmt::Debug for DmsProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmsProtocol")
            .field("reference", &self.reference)
            .field("loaded", &self.data.is_some())
            .finish()
    }
}

impl DmsProtocol {
    pub(crate) fn new(dms: Dms, reference: ProtocolRef) -> Self {
        Self {
            dms,
            reference,
            data: None,
        }
    }

    pub(crate) fn from_info(dms: Dms, info: &ProtocolInfo) -> Result<Self, DmsError> {
        Ok(Self {
            dms,
            reference: ProtocolRef::new(&info.name, &info.version),
            data: Some(ProtocolData::from_info(info)?),
        })
    }

    fn not_found(&self) -> DmsError {
        DmsError::ProtocolNotFound {
            name: self.reference.name.clone(),
            version: self.reference.version.clone(),
        }
    }

    fn request(&self) -> Request {
        Request::GetProtocol {
            name: self.reference.name.clone(),
            version: self.reference.version.clone(),
        }
    }

    fn loaded(&self) -> Result<&ProtocolData, DmsError> {
        self.data.as_ref().ok_or_else(|| DmsError::NotLoaded {
            entity: "Protocol",
            identifier: self.reference.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.reference.name
    }

    pub fn version(&self) -> &str {
        &self.reference.version
    }

    pub fn reference(&self) -> &ProtocolRef {
        &self.reference
    }

    pub fn is_production_version(&self) -> bool {
        self.reference.version.eq_ignore_ascii_case(PRODUCTION_VERSION)
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    pub async fn exists(&self) -> Result<bool, DmsError> {
        self.dms.probe(self.request()).await
    }

    pub async fn load(&mut self) -> Result<(), DmsError> {
        self.data = None;
        debug!(protocol = %self.reference, "loading protocol");
        let info: ProtocolInfo = self.dms.fetch(self.request(), || self.not_found()).await?;
        self.data = Some(ProtocolData::from_info(&info)?);
        Ok(())
    }

    pub async fn load_on_demand(&mut self) -> Result<(), DmsError> {
        if self.data.is_none() {
            self.load().await?;
        }
        Ok(())
    }

    /// Main connection type, if the protocol declares one.
    pub fn protocol_type(&self) -> Result<Option<ConnectionKind>, DmsError> {
        Ok(self.loaded()?.protocol_type)
    }

    pub fn device_type(&self) -> Result<&str, DmsError> {
        Ok(&self.loaded()?.device_type)
    }

    /// Concrete version behind "Production".
    pub fn referenced_version(&self) -> Result<Option<&str>, DmsError> {
        Ok(self.loaded()?.referenced_version.as_deref())
    }

    pub fn connections(&self) -> Result<&[ProtocolConnection], DmsError> {
        Ok(&self.loaded()?.connections)
    }

    /// Declared connection kind per port index.
    pub fn connection_kinds(&self) -> Result<Vec<ConnectionKind>, DmsError> {
        Ok(self.loaded()?.connections.iter().map(|c| c.kind).collect())
    }

    // ── Templates ────────────────────────────────────────────────────

    fn template_not_found(&self, name: &str) -> DmsError {
        DmsError::TemplateNotFound {
            name: name.to_owned(),
            protocol: self.reference.name.clone(),
            version: self.reference.version.clone(),
        }
    }

    fn alarm_template_request(&self, name: &str) -> Request {
        Request::GetAlarmTemplate {
            protocol: self.reference.name.clone(),
            version: self.reference.version.clone(),
            name: name.to_owned(),
        }
    }

    fn trend_template_request(&self, name: &str) -> Request {
        Request::GetTrendTemplate {
            protocol: self.reference.name.clone(),
            version: self.reference.version.clone(),
            name: name.to_owned(),
        }
    }

    pub async fn alarm_template(&self, name: &str) -> Result<DmsAlarmTemplate, DmsError> {
        let info: AlarmTemplateInfo = self
            .dms
            .fetch(self.alarm_template_request(name), || self.template_not_found(name))
            .await?;
        DmsAlarmTemplate::from_info(info)
    }

    pub async fn alarm_template_exists(&self, name: &str) -> Result<bool, DmsError> {
        self.dms.probe(self.alarm_template_request(name)).await
    }

    pub async fn trend_template(&self, name: &str) -> Result<DmsTrendTemplate, DmsError> {
        let info: TrendTemplateInfo = self
            .dms
            .fetch(self.trend_template_request(name), || self.template_not_found(name))
            .await?;
        Ok(DmsTrendTemplate::from_info(info))
    }

    pub async fn trend_template_exists(&self, name: &str) -> Result<bool, DmsError> {
        self.dms.probe(self.trend_template_request(name)).await
    }
}
