// ── Agents ──
//
// An agent (DMA) hosts elements and services. The handle follows the same
// explicit load model as every other entity; the build version is fetched
// separately and cached per handle because it only matters for a few
// version-dependent wire layouts.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use dms_api::messages::{AgentInfo, BuildInfo, ElementInfo, ServiceInfo};
use dms_api::{CommunicationExt, Request, Response};
use strum::{Display, EnumString};
use tracing::{debug, info};

use crate::connection::PortWriteContext;
use crate::dms::{Dms, unexpected};
use crate::element::{DmsElement, ElementConfiguration};
use crate::error::{DmsError, map_not_found};
use crate::id::{DmsElementId, DmsServiceId};
use crate::service::{DmsService, ServiceConfiguration};

/// Last agent version that still expects SNMPv3 credentials in the
/// community fields of a port record.
pub const SNMPV3_LAYOUT_VERSION: AgentVersion = AgentVersion::new(10, 0, 3, 0, 9019);

// ── Version ─────────────────────────────────────────────────────────

/// Agent build version, `major.minor.build.revision-buildNumber`.
///
/// Ordering compares the five numbers left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub revision: u32,
    pub build_number: u32,
}

impl AgentVersion {
    pub const fn new(major: u32, minor: u32, build: u32, revision: u32, build_number: u32) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
            build_number,
        }
    }

    fn parts(self) -> [u32; 5] {
        [
            self.major,
            self.minor,
            self.build,
            self.revision,
            self.build_number,
        ]
    }
}

impl Ord for AgentVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts().cmp(&other.parts())
    }
}

impl PartialOrd for AgentVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for AgentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}-{}",
            self.major, self.minor, self.build, self.revision, self.build_number
        )
    }
}

impl FromStr for AgentVersion {
    type Err = DmsError;

    /// The `-buildNumber` suffix is optional and defaults to 0.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || {
            DmsError::invalid(
                "version",
                format!("'{s}' is not major.minor.build.revision-buildNumber"),
            )
        };
        let s = s.trim();
        let (dotted, build_number) = match s.split_once('-') {
            Some((dotted, number)) => (dotted, number.parse::<u32>().map_err(|_| bad())?),
            None => (s, 0),
        };
        let numbers = dotted
            .split('.')
            .map(|part| part.parse::<u32>().map_err(|_| bad()))
            .collect::<Result<Vec<_>, _>>()?;
        let &[major, minor, build, revision] = numbers.as_slice() else {
            return Err(bad());
        };
        Ok(Self::new(major, minor, build, revision, build_number))
    }
}

// ── State ───────────────────────────────────────────────────────────

/// Run state of an agent process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AgentState {
    Running,
    Starting,
    Stopping,
    Stopped,
    #[default]
    Unknown,
}

impl AgentState {
    fn from_tag(tag: &str) -> Self {
        tag.parse().unwrap_or_default()
    }
}

// ── Handle ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
struct AgentData {
    name: String,
    host_name: String,
    state: AgentState,
}

impl From<AgentInfo> for AgentData {
    fn from(info: AgentInfo) -> Self {
        Self {
            state: AgentState::from_tag(&info.state),
            name: info.name,
            host_name: info.host_name,
        }
    }
}

/// Handle to one agent.
#[derive(Debug, Clone)]
pub struct Dma {
    dms: Dms,
    id: i32,
    data: Option<AgentData>,
    version: Option<AgentVersion>,
}

impl Dma {
    pub(crate) fn new(dms: Dms, id: i32) -> Result<Self, DmsError> {
        if id < 1 {
            return Err(DmsError::out_of_range(
                "agentId",
                format!("{id} is not a valid agent id"),
            ));
        }
        Ok(Self {
            dms,
            id,
            data: None,
            version: None,
        })
    }

    pub(crate) fn from_info(dms: Dms, info: AgentInfo) -> Self {
        Self {
            dms,
            id: info.id,
            data: Some(info.into()),
            version: None,
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    fn not_found(&self) -> DmsError {
        DmsError::AgentNotFound { agent_id: self.id }
    }

    fn request(&self) -> Request {
        Request::GetAgentInfo {
            agent_id: Some(self.id),
        }
    }

    fn loaded(&self) -> Result<&AgentData, DmsError> {
        self.data.as_ref().ok_or_else(|| DmsError::NotLoaded {
            entity: "Agent",
            identifier: self.id.to_string(),
        })
    }

    pub async fn exists(&self) -> Result<bool, DmsError> {
        self.dms.probe(self.request()).await
    }

    pub async fn load(&mut self) -> Result<(), DmsError> {
        self.data = None;
        debug!(agent_id = self.id, "loading agent");
        let info: AgentInfo = self.dms.fetch(self.request(), || self.not_found()).await?;
        self.data = Some(info.into());
        Ok(())
    }

    pub async fn load_on_demand(&mut self) -> Result<(), DmsError> {
        if self.data.is_none() {
            self.load().await?;
        }
        Ok(())
    }

    pub fn name(&self) -> Result<&str, DmsError> {
        Ok(&self.loaded()?.name)
    }

    pub fn host_name(&self) -> Result<&str, DmsError> {
        Ok(&self.loaded()?.host_name)
    }

    pub fn state(&self) -> Result<AgentState, DmsError> {
        Ok(self.loaded()?.state)
    }

    /// Build version, fetched on first call and cached on this handle.
    pub async fn version(&mut self) -> Result<AgentVersion, DmsError> {
        if let Some(version) = self.version {
            return Ok(version);
        }
        let info: BuildInfo = self
            .dms
            .fetch(Request::GetAgentBuildInfo { agent_id: self.id }, || {
                self.not_found()
            })
            .await?;
        let version: AgentVersion = info.version.parse()?;
        debug!(agent_id = self.id, %version, "agent version");
        self.version = Some(version);
        Ok(version)
    }

    /// `true` when this agent runs a version strictly above `threshold`.
    pub async fn is_version_higher(&mut self, threshold: &str) -> Result<bool, DmsError> {
        let threshold: AgentVersion = threshold.parse()?;
        Ok(self.version().await? > threshold)
    }

    // ── Hosted elements ──────────────────────────────────────────────

    pub async fn elements(&self) -> Result<Vec<DmsElement>, DmsError> {
        let infos: Vec<ElementInfo> = self
            .dms
            .comm()
            .request_many(Request::GetElements {
                agent_id: Some(self.id),
            })
            .await
            .map_err(|e| map_not_found(e, || self.not_found()))?;
        infos
            .into_iter()
            .map(|info| DmsElement::from_info(self.dms.clone(), info))
            .collect()
    }

    /// Element by name, restricted to this agent.
    pub async fn element_by_name(&self, name: &str) -> Result<DmsElement, DmsError> {
        let element = self.dms.element_by_name(name).await?;
        if element.id().agent_id() != self.id {
            return Err(DmsError::ElementNotFound {
                identifier: format!("{name} on agent {}", self.id),
            });
        }
        Ok(element)
    }

    /// Create an element on this agent and return its new id.
    pub async fn create_element(
        &mut self,
        config: &ElementConfiguration,
    ) -> Result<DmsElementId, DmsError> {
        let legacy_snmpv3 = if config.has_snmpv3() {
            self.version().await? <= SNMPV3_LAYOUT_VERSION
        } else {
            false
        };
        let ctx = PortWriteContext {
            encoder: self.dms.encoder(),
            legacy_snmpv3,
        };
        let element = config.to_update(&ctx)?;

        let response = self
            .dms
            .comm()
            .send_single_response_message(Request::AddElement {
                agent_id: self.id,
                element,
            })
            .await
            .map_err(|e| map_not_found(e, || self.not_found()))?;
        match response {
            Some(Response::ElementCreated { element_id }) => {
                let id = DmsElementId::new(self.id, element_id)?;
                info!(element = %id, name = config.name(), "element created");
                Ok(id)
            }
            Some(other) => Err(unexpected("ElementCreated", &other)),
            None => Err(dms_api::Error::NoResponse {
                request: "AddElement",
            }
            .into()),
        }
    }

    // ── Hosted services ──────────────────────────────────────────────

    pub async fn services(&self) -> Result<Vec<DmsService>, DmsError> {
        let infos: Vec<ServiceInfo> = self
            .dms
            .comm()
            .request_many(Request::GetServices {
                agent_id: Some(self.id),
            })
            .await
            .map_err(|e| map_not_found(e, || self.not_found()))?;
        infos
            .into_iter()
            .map(|info| DmsService::from_info(self.dms.clone(), info))
            .collect()
    }

    /// Create a service on this agent and return its new id.
    pub async fn create_service(
        &self,
        config: &ServiceConfiguration,
    ) -> Result<DmsServiceId, DmsError> {
        let response = self
            .dms
            .comm()
            .send_single_response_message(Request::AddService {
                agent_id: self.id,
                service: config.to_update(),
            })
            .await
            .map_err(|e| map_not_found(e, || self.not_found()))?;
        match response {
            Some(Response::ServiceCreated { service_id }) => {
                let id = DmsServiceId::new(self.id, service_id)?;
                info!(service = %id, name = config.name(), "service created");
                Ok(id)
            }
            Some(other) => Err(unexpected("ServiceCreated", &other)),
            None => Err(dms_api::Error::NoResponse {
                request: "AddService",
            }
            .into()),
        }
    }
}
