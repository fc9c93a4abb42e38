// Management network protocol message types
//
// Models the request/response vocabulary of the gateway. Field values stay
// close to the wire: states, connection kinds and template kinds travel as
// raw integers or tag strings and are mapped into closed domain enums by
// `dms-core`. Fields use `#[serde(default)]` liberally because older agents
// omit fields newer ones send.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Shared keys ──────────────────────────────────────────────────────

/// Composite `(agent, local id)` key as it travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementKey {
    pub agent_id: i32,
    pub element_id: i32,
}

/// Which family of property definitions a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyKind {
    Element,
    View,
    Service,
}

/// A bound `name = value` pair, used both for loaded property instances and
/// for changed properties in update messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyValueInfo {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

// ── Requests ─────────────────────────────────────────────────────────

/// Every request the SDK sends through a [`Communication`](crate::Communication).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "message",
    content = "body",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Request {
    // Agents
    GetAgentInfo { agent_id: Option<i32> },
    GetAgentBuildInfo { agent_id: i32 },

    // Elements
    GetElementInfo { agent_id: i32, element_id: i32 },
    GetElementByName { name: String },
    GetElements { agent_id: Option<i32> },
    GetElementPortInfo { agent_id: i32, element_id: i32 },
    AddElement { agent_id: i32, element: ElementUpdate },
    UpdateElement {
        agent_id: i32,
        element_id: i32,
        update: ElementUpdate,
    },
    SetElementState {
        agent_id: i32,
        element_id: i32,
        state: ElementStateChange,
    },
    GetParameter {
        agent_id: i32,
        element_id: i32,
        parameter_id: i32,
        table_key: Option<String>,
    },
    SetParameter {
        agent_id: i32,
        element_id: i32,
        parameter_id: i32,
        table_key: Option<String>,
        value: ParameterValue,
    },

    // Views
    GetViewInfo { view_id: i32 },
    GetViewByName { name: String },
    GetViews,
    AddView { name: String, parent_id: i32 },
    UpdateView { view_id: i32, update: ViewUpdate },
    DeleteView { view_id: i32 },

    // Protocols and templates
    GetProtocol { name: String, version: String },
    GetProtocols,
    GetAlarmTemplate {
        protocol: String,
        version: String,
        name: String,
    },
    GetTrendTemplate {
        protocol: String,
        version: String,
        name: String,
    },

    // Properties
    GetPropertyConfig { kind: PropertyKind },

    // Services
    GetServiceInfo { agent_id: i32, service_id: i32 },
    GetServices { agent_id: Option<i32> },
    AddService { agent_id: i32, service: ServiceUpdate },
    UpdateService {
        agent_id: i32,
        service_id: i32,
        update: ServiceUpdate,
    },
    DeleteService { agent_id: i32, service_id: i32 },
}

impl Request {
    /// Stable message name, used for logging and error reporting.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetAgentInfo { .. } => "GetAgentInfo",
            Self::GetAgentBuildInfo { .. } => "GetAgentBuildInfo",
            Self::GetElementInfo { .. } => "GetElementInfo",
            Self::GetElementByName { .. } => "GetElementByName",
            Self::GetElements { .. } => "GetElements",
            Self::GetElementPortInfo { .. } => "GetElementPortInfo",
            Self::AddElement { .. } => "AddElement",
            Self::UpdateElement { .. } => "UpdateElement",
            Self::SetElementState { .. } => "SetElementState",
            Self::GetParameter { .. } => "GetParameter",
            Self::SetParameter { .. } => "SetParameter",
            Self::GetViewInfo { .. } => "GetViewInfo",
            Self::GetViewByName { .. } => "GetViewByName",
            Self::GetViews => "GetViews",
            Self::AddView { .. } => "AddView",
            Self::UpdateView { .. } => "UpdateView",
            Self::DeleteView { .. } => "DeleteView",
            Self::GetProtocol { .. } => "GetProtocol",
            Self::GetProtocols => "GetProtocols",
            Self::GetAlarmTemplate { .. } => "GetAlarmTemplate",
            Self::GetTrendTemplate { .. } => "GetTrendTemplate",
            Self::GetPropertyConfig { .. } => "GetPropertyConfig",
            Self::GetServiceInfo { .. } => "GetServiceInfo",
            Self::GetServices { .. } => "GetServices",
            Self::AddService { .. } => "AddService",
            Self::UpdateService { .. } => "UpdateService",
            Self::DeleteService { .. } => "DeleteService",
        }
    }
}

/// State transitions an element can be asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementStateChange {
    Start,
    Stop,
    Pause,
    Restart,
    Delete,
    Hide,
    Unhide,
    Mask,
    Unmask,
}

/// Parameter payload for get/set parameter messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterValue {
    Empty,
    Number(f64),
    Text(String),
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

// ── Responses ────────────────────────────────────────────────────────

/// Every response the gateway can hand back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Response {
    AgentInfo(AgentInfo),
    BuildInfo(BuildInfo),
    ElementInfo(ElementInfo),
    PortInfo(ElementPortInfo),
    ElementCreated { element_id: i32 },
    ParameterValue(ParameterValue),
    ViewInfo(ViewInfo),
    ViewCreated { view_id: i32 },
    ProtocolInfo(ProtocolInfo),
    AlarmTemplate(AlarmTemplateInfo),
    TrendTemplate(TrendTemplateInfo),
    PropertyConfig(PropertyConfig),
    ServiceInfo(ServiceInfo),
    ServiceCreated { service_id: i32 },
    Ack,
}

impl Response {
    /// Stable response kind name, used in `UnexpectedResponse` errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AgentInfo(_) => "AgentInfo",
            Self::BuildInfo(_) => "BuildInfo",
            Self::ElementInfo(_) => "ElementInfo",
            Self::PortInfo(_) => "PortInfo",
            Self::ElementCreated { .. } => "ElementCreated",
            Self::ParameterValue(_) => "ParameterValue",
            Self::ViewInfo(_) => "ViewInfo",
            Self::ViewCreated { .. } => "ViewCreated",
            Self::ProtocolInfo(_) => "ProtocolInfo",
            Self::AlarmTemplate(_) => "AlarmTemplate",
            Self::TrendTemplate(_) => "TrendTemplate",
            Self::PropertyConfig(_) => "PropertyConfig",
            Self::ServiceInfo(_) => "ServiceInfo",
            Self::ServiceCreated { .. } => "ServiceCreated",
            Self::Ack => "Ack",
        }
    }
}

// ── Agent ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInfo {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub host_name: String,
    /// Raw agent state tag: "running", "starting", "stopping", "stopped".
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub agent_id: i32,
    /// Version string, `major.minor.build.revision-buildNumber`.
    pub version: String,
}

// ── Element ──────────────────────────────────────────────────────────

/// Full element record, as returned by element info requests and enumerations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    pub agent_id: i32,
    pub element_id: i32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub protocol_name: String,
    #[serde(default)]
    pub protocol_version: String,
    /// Raw state code, see `dms_core::ElementState`.
    #[serde(default)]
    pub state: i32,
    #[serde(default)]
    pub host_agent_id: i32,
    #[serde(default)]
    pub alarm_template: String,
    #[serde(default)]
    pub trend_template: String,
    #[serde(default)]
    pub views: Vec<i32>,
    #[serde(default)]
    pub properties: Vec<PropertyValueInfo>,
    #[serde(default)]
    pub ports: Vec<ElementPortInfo>,

    // Advanced
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub is_read_only: bool,
    #[serde(default)]
    pub is_simulation: bool,
    #[serde(default)]
    pub timeout_ms: i32,

    // Device
    #[serde(default)]
    pub device_type: String,

    // DVE
    #[serde(default)]
    pub is_dve_creation_enabled: bool,
    #[serde(default)]
    pub dve_parent: Option<ElementKey>,

    // Failover
    #[serde(default)]
    pub is_failover: bool,
    #[serde(default)]
    pub keep_online: bool,
    #[serde(default)]
    pub is_online: bool,

    // Redundancy
    #[serde(default)]
    pub is_derived: bool,

    // Replication
    #[serde(default)]
    pub replication: Option<ReplicationInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationInfo {
    #[serde(default)]
    pub remote_element: String,
    #[serde(default)]
    pub source_agent_address: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub options: String,
    #[serde(default)]
    pub connects_to_all_agents: bool,
}

/// One physical or logical port of an element.
///
/// The `protocol_type` tag selects which of the remaining fields are
/// meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementPortInfo {
    pub port_index: i32,
    /// Raw connection tag: "virtual", "snmp", "snmpv2", "snmpv3", "serial",
    /// "serial single", "smart-serial", "smart-serial single", "http", ...
    pub protocol_type: String,
    #[serde(default)]
    pub polling_ip: String,
    #[serde(default)]
    pub ip_port: Option<u16>,
    #[serde(default)]
    pub bus_address: String,
    #[serde(default)]
    pub get_community: String,
    #[serde(default)]
    pub set_community: String,
    #[serde(default)]
    pub retries: i32,
    #[serde(default)]
    pub timeout_ms: i32,
    #[serde(default)]
    pub elapsed_timeout_ms: i32,
    /// "udp" or "tcp".
    #[serde(default)]
    pub type_of_ip: String,
    #[serde(default)]
    pub is_ssl: bool,
    #[serde(default)]
    pub bypass_proxy: bool,
    #[serde(default)]
    pub library_credentials: Option<Uuid>,
    #[serde(default)]
    pub snmp_v3: Option<SnmpV3PortInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnmpV3PortInfo {
    #[serde(default)]
    pub username: String,
    /// "authPriv", "authNoPriv", "noAuthNoPriv".
    #[serde(default)]
    pub security_level: String,
    #[serde(default)]
    pub auth_algorithm: String,
    #[serde(default)]
    pub auth_password: String,
    #[serde(default)]
    pub priv_algorithm: String,
    #[serde(default)]
    pub priv_password: String,
}

/// Element create/update payload.
///
/// Only populated fields travel; an update carries exactly the fields the
/// caller changed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarm_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_dve_creation_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_online: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyValueInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<ElementPortInfo>,
}

impl ElementUpdate {
    /// `true` when no field is populated.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ── View ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewInfo {
    pub id: i32,
    pub name: String,
    /// `None` only for the root view.
    #[serde(default)]
    pub parent_id: Option<i32>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub child_ids: Vec<i32>,
    #[serde(default)]
    pub elements: Vec<ElementKey>,
    #[serde(default)]
    pub properties: Vec<PropertyValueInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyValueInfo>,
}

// ── Protocol & templates ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolInfo {
    pub name: String,
    pub version: String,
    /// Raw main connection tag of the protocol.
    #[serde(default)]
    pub protocol_type: String,
    #[serde(default)]
    pub device_type: String,
    /// Version a "Production" entry points at; empty otherwise.
    #[serde(default)]
    pub referenced_version: String,
    #[serde(default)]
    pub connections: Vec<ProtocolConnectionInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolConnectionInfo {
    #[serde(default)]
    pub name: String,
    pub protocol_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmTemplateInfo {
    pub name: String,
    pub protocol: String,
    pub version: String,
    /// "standalone" or "group".
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_used: bool,
    #[serde(default)]
    pub entries: Vec<AlarmTemplateEntryInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmTemplateEntryInfo {
    pub name: String,
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(default)]
    pub is_scheduled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendTemplateInfo {
    pub name: String,
    pub protocol: String,
    pub version: String,
}

// ── Properties ───────────────────────────────────────────────────────

/// One system-wide property definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyConfig {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub regex: String,
    #[serde(default)]
    pub is_read_only: bool,
    #[serde(default)]
    pub entries: Vec<String>,
    #[serde(default)]
    pub is_filter_enabled: bool,
    #[serde(default)]
    pub is_visible_in_surveyor: bool,
}

// ── Service ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub agent_id: i32,
    pub service_id: i32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub views: Vec<i32>,
    #[serde(default)]
    pub properties: Vec<PropertyValueInfo>,
    #[serde(default)]
    pub included: Vec<ServiceInclusionInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInclusionInfo {
    /// "element" or "service".
    pub kind: String,
    pub agent_id: i32,
    pub id: i32,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub is_excluded: bool,
    /// Highest alarm severity this inclusion may raise the service to.
    #[serde(default)]
    pub alarm_cap: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyValueInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included: Option<Vec<ServiceInclusionInfo>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn element_update_skips_unchanged_fields() {
        let update = ElementUpdate {
            description: Some("core router".into()),
            ..ElementUpdate::default()
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value, json!({ "description": "core router" }));
    }

    #[test]
    fn empty_update_is_empty() {
        assert!(ElementUpdate::default().is_empty());
        let update = ElementUpdate {
            views: Some(vec![3]),
            ..ElementUpdate::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn request_is_adjacently_tagged() {
        let req = Request::GetElementInfo {
            agent_id: 400,
            element_id: 201,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({ "message": "getElementInfo", "body": { "agentId": 400, "elementId": 201 } })
        );
        assert_eq!(req.name(), "GetElementInfo");
    }

    #[test]
    fn element_info_tolerates_missing_fields() {
        let info: ElementInfo = serde_json::from_value(json!({
            "agentId": 400,
            "elementId": 201,
            "name": "Router 1"
        }))
        .unwrap();
        assert_eq!(info.element_id, 201);
        assert!(info.ports.is_empty());
        assert!(info.replication.is_none());
    }
}
