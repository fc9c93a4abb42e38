// Alarm and trend templates.
//
// Templates are snapshots fetched through their protocol
// (`DmsProtocol::alarm_template` / `trend_template`); they carry no change
// tracking.

use dms_api::messages::{AlarmTemplateInfo, TrendTemplateInfo};

use crate::error::DmsError;
use crate::protocol::ProtocolRef;

/// One member of an alarm template group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmTemplateGroupEntry {
    /// Name of the standalone template this entry refers to.
    pub template: String,
    pub is_enabled: bool,
    pub is_scheduled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmTemplateKind {
    Standalone { description: String, is_used: bool },
    Group { entries: Vec<AlarmTemplateGroupEntry> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmsAlarmTemplate {
    name: String,
    protocol: ProtocolRef,
    kind: AlarmTemplateKind,
}

impl DmsAlarmTemplate {
    pub(crate) fn from_info(info: AlarmTemplateInfo) -> Result<Self, DmsError> {
        let kind = match info.kind.as_str() {
            "" | "standalone" => AlarmTemplateKind::Standalone {
                description: info.description,
                is_used: info.is_used,
            },
            "group" => AlarmTemplateKind::Group {
                entries: info
                    .entries
                    .into_iter()
                    .map(|e| AlarmTemplateGroupEntry {
                        template: e.name,
                        is_enabled: e.is_enabled,
                        is_scheduled: e.is_scheduled,
                    })
                    .collect(),
            },
            other => {
                return Err(DmsError::incorrect(format!(
                    "alarm template '{}' has unknown kind '{other}'",
                    info.name
                )));
            }
        };
        Ok(Self {
            name: info.name,
            protocol: ProtocolRef::new(&info.protocol, &info.version),
            kind,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn protocol(&self) -> &ProtocolRef {
        &self.protocol
    }

    pub fn kind(&self) -> &AlarmTemplateKind {
        &self.kind
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, AlarmTemplateKind::Group { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmsTrendTemplate {
    name: String,
    protocol: ProtocolRef,
}

impl DmsTrendTemplate {
    pub(crate) fn from_info(info: TrendTemplateInfo) -> Self {
        Self {
            protocol: ProtocolRef::new(&info.protocol, &info.version),
            name: info.name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn protocol(&self) -> &ProtocolRef {
        &self.protocol
    }
}
