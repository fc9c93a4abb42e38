// dms-core: Typed domain objects over the management network protocol gateway.

pub mod agent;
pub mod config;
pub mod connection;
pub mod credential;
pub mod dms;
pub mod element;
pub mod error;
pub mod id;
pub mod naming;
pub mod property;
pub mod protocol;
pub mod service;
pub mod template;
pub mod tracked;
pub mod view;

// ── Primary re-exports ──────────────────────────────────────────────
pub use agent::{AgentState, AgentVersion, Dma, SNMPV3_LAYOUT_VERSION};
pub use config::{Credentials, DmsConfig, TlsVerification};
pub use credential::{CredentialEncoder, PlainTextEncoder};
pub use dms::Dms;
pub use element::{DmsElement, ElementConfiguration, ElementState};
pub use error::DmsError;
pub use id::{DmsElementId, DmsServiceId};
pub use naming::{MAX_NAME_LENGTH, validate_name, validate_view_name};
pub use property::{DmsProperty, PropertyCollection, PropertyDefinition, PropertyDefinitions};
pub use protocol::{DmsProtocol, PRODUCTION_VERSION, ProtocolConnection, ProtocolRef};
pub use service::{
    AlarmLevel, DmsService, MAX_SERVICE_INCLUSIONS, ServiceConfiguration, ServiceInclusion,
    ServiceParamsConfiguration, ServiceTarget,
};
pub use template::{AlarmTemplateGroupEntry, AlarmTemplateKind, DmsAlarmTemplate, DmsTrendTemplate};
pub use view::{DmsView, ROOT_VIEW_ID, ViewConfiguration};

// Connection types at the crate root for ergonomics.
pub use connection::{
    ConnectionKind, ElementConnection, ElementConnectionMut, ElementConnections, HttpConnection,
    IpSettings, IpTransport, RealConnection, SerialConnection, SmartSerialConnection,
    SnmpCommunityConnection, SnmpV3AuthAlgorithm, SnmpV3Connection, SnmpV3EncryptionAlgorithm,
    SnmpV3Security, SnmpV3SecurityConfig, SnmpV3SecurityLevel, VirtualConnection,
};

// Gateway types callers need to build a root or a mock.
pub use dms_api::messages::{ParameterValue, PropertyKind};
pub use dms_api::{Communication, MockCommunication};
