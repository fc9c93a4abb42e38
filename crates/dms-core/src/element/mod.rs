// ── Elements ──
//
// `DmsElement` is the handle callers work with most. It follows the explicit
// load model: getters never touch the network and fail with `NotLoaded`
// until `load()` (or `load_on_demand()`) succeeded. Setters record changes
// locally; `update()` sends them as one minimal message.
//
// Once a handle learns its element is gone (failed update, delete) it is
// permanently marked deleted and refuses further wire operations.

pub mod configuration;
pub mod settings;
pub mod state;

use std::collections::BTreeSet;
use std::fmt;

use dms_api::messages::{
    ElementInfo, ElementPortInfo, ElementStateChange, ElementUpdate, ParameterValue, PropertyKind,
};
use dms_api::{CommunicationExt, Request};
use tracing::{debug, info, warn};

use crate::agent::{AgentVersion, Dma, SNMPV3_LAYOUT_VERSION};
use crate::connection::{ConnectionKind, ElementConnection, ElementConnections, PortWriteContext};
use crate::dms::Dms;
use crate::error::{DmsError, map_not_found};
use crate::id::DmsElementId;
use crate::property::PropertyCollection;
use crate::protocol::ProtocolRef;
use crate::template::{DmsAlarmTemplate, DmsTrendTemplate};
use crate::tracked::SettingsGroup;
use crate::view::{DmsView, ROOT_VIEW_ID};

pub use configuration::{DEFAULT_ELEMENT_TIMEOUT, ElementConfiguration};
pub use settings::{
    AdvancedSettings, DeviceSettings, DveSettings, FailoverSettings, GeneralSettings,
    MAX_ELEMENT_TIMEOUT, RedundancySettings, ReplicationSettings,
};
pub use state::ElementState;

// ── Loaded snapshot ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct ElementData {
    general: GeneralSettings,
    advanced: AdvancedSettings,
    device: DeviceSettings,
    dve: DveSettings,
    failover: FailoverSettings,
    redundancy: RedundancySettings,
    replication: ReplicationSettings,
    views: BTreeSet<i32>,
    /// View membership as loaded; `views != view_baseline` means changed.
    view_baseline: BTreeSet<i32>,
    properties: PropertyCollection,
    /// `None` until the port layout is known.
    connections: Option<ElementConnections>,
}

impl ElementData {
    fn from_info(info: &ElementInfo) -> Result<Self, DmsError> {
        let mut data = Self {
            general: GeneralSettings::default(),
            advanced: AdvancedSettings::default(),
            device: DeviceSettings::default(),
            dve: DveSettings::default(),
            failover: FailoverSettings::default(),
            redundancy: RedundancySettings::default(),
            replication: ReplicationSettings::default(),
            views: info.views.iter().copied().collect(),
            view_baseline: info.views.iter().copied().collect(),
            properties: PropertyCollection::from_values(&info.properties, &info.name),
            connections: None,
        };
        data.general.load(info);
        data.advanced.load(info);
        data.device.load(info);
        data.dve.load(info);
        data.failover.load(info);
        data.redundancy.load(info);
        data.replication.load(info);
        if !info.ports.is_empty() {
            data.set_ports(&info.ports)?;
        }
        Ok(data)
    }

    fn set_ports(&mut self, ports: &[ElementPortInfo]) -> Result<(), DmsError> {
        self.connections = Some(ElementConnections::from_ports(ports)?);
        Ok(())
    }

    fn views_changed(&self) -> bool {
        self.views != self.view_baseline
    }

    fn connections_changed(&self) -> bool {
        self.connections
            .as_ref()
            .is_some_and(ElementConnections::has_updates)
    }

    fn has_updates(&self) -> bool {
        self.general.has_updates()
            || self.advanced.has_updates()
            || self.device.has_updates()
            || self.dve.has_updates()
            || self.failover.has_updates()
            || self.redundancy.has_updates()
            || self.replication.has_updates()
            || self.properties.has_updates()
            || self.views_changed()
            || self.connections_changed()
    }

    fn build_update(&self, ctx: &PortWriteContext<'_>) -> Result<ElementUpdate, DmsError> {
        let mut update = ElementUpdate::default();
        self.general.fill_update(&mut update);
        self.advanced.fill_update(&mut update);
        self.device.fill_update(&mut update);
        self.dve.fill_update(&mut update);
        self.failover.fill_update(&mut update);
        self.redundancy.fill_update(&mut update);
        self.replication.fill_update(&mut update);
        if self.views_changed() {
            update.views = Some(self.views.iter().copied().collect());
        }
        if self.properties.has_updates() {
            update.properties = self.properties.changed_values();
        }
        if let Some(connections) = self.connections.as_ref().filter(|c| c.has_updates()) {
            update.ports = connections.changed_ports(ctx)?;
        }
        Ok(update)
    }
}

// ── Handle ──────────────────────────────────────────────────────────

/// Handle to one element.
#[derive(Clone)]
pub struct DmsElement {
    dms: Dms,
    id: DmsElementId,
    data: Option<ElementData>,
    deleted: bool,
    host_version: Option<AgentVersion>,
    declared_connections: Option<Vec<ConnectionKind>>,
}

impl fmt::Debug for DmsElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmsElement")
            .field("id", &self.id)
            .field("loaded", &self.data.is_some())
            .field("deleted", &self.deleted)
            .finish_non_exhaustive()
    }
}

impl DmsElement {
    pub(crate) fn new(dms: Dms, id: DmsElementId) -> Self {
        Self {
            dms,
            id,
            data: None,
            deleted: false,
            host_version: None,
            declared_connections: None,
        }
    }

    pub(crate) fn from_info(dms: Dms, info: ElementInfo) -> Result<Self, DmsError> {
        let id = DmsElementId::new(info.agent_id, info.element_id)?;
        let mut element = Self::new(dms, id);
        element.data = Some(ElementData::from_info(&info)?);
        Ok(element)
    }

    pub fn id(&self) -> DmsElementId {
        self.id
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    /// `true` once this handle saw its element deleted, or loaded it in
    /// the `Deleted` state.
    pub fn is_deleted(&self) -> bool {
        self.deleted
            || self
                .data
                .as_ref()
                .is_some_and(|d| d.general.state() == ElementState::Deleted)
    }

    fn not_found(&self) -> DmsError {
        DmsError::ElementNotFound {
            identifier: self.id.to_string(),
        }
    }

    fn ensure_not_deleted(&self) -> Result<(), DmsError> {
        if self.is_deleted() {
            return Err(self.not_found());
        }
        Ok(())
    }

    fn info_request(&self) -> Request {
        Request::GetElementInfo {
            agent_id: self.id.agent_id(),
            element_id: self.id.element_id(),
        }
    }

    fn loaded(&self) -> Result<&ElementData, DmsError> {
        self.data.as_ref().ok_or_else(|| DmsError::NotLoaded {
            entity: "Element",
            identifier: self.id.to_string(),
        })
    }

    fn loaded_mut(&mut self) -> Result<&mut ElementData, DmsError> {
        self.ensure_not_deleted()?;
        let identifier = self.id.to_string();
        self.data.as_mut().ok_or(DmsError::NotLoaded {
            entity: "Element",
            identifier,
        })
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Whether the element exists remotely. Never touches the snapshot.
    pub async fn exists(&self) -> Result<bool, DmsError> {
        if self.deleted {
            return Ok(false);
        }
        self.dms.probe(self.info_request()).await
    }

    /// Fetch the full record in one request, replacing any snapshot and
    /// discarding pending changes.
    pub async fn load(&mut self) -> Result<(), DmsError> {
        if self.deleted {
            return Err(self.not_found());
        }
        self.data = None;
        debug!(element = %self.id, "loading element");
        let info: ElementInfo = self
            .dms
            .fetch(self.info_request(), || self.not_found())
            .await?;
        self.data = Some(ElementData::from_info(&info)?);
        Ok(())
    }

    pub async fn load_on_demand(&mut self) -> Result<(), DmsError> {
        if self.data.is_none() {
            self.load().await?;
        }
        Ok(())
    }

    /// Fetch the port layout when the loaded record did not carry one.
    pub async fn load_connections(&mut self) -> Result<(), DmsError> {
        self.ensure_not_deleted()?;
        self.loaded()?;
        let request = Request::GetElementPortInfo {
            agent_id: self.id.agent_id(),
            element_id: self.id.element_id(),
        };
        let ports: Vec<ElementPortInfo> = self
            .dms
            .comm()
            .request_many(request)
            .await
            .map_err(|e| map_not_found(e, || self.not_found()))?;
        self.loaded_mut()?.set_ports(&ports)
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn general(&self) -> Result<&GeneralSettings, DmsError> {
        Ok(&self.loaded()?.general)
    }

    pub fn advanced(&self) -> Result<&AdvancedSettings, DmsError> {
        Ok(&self.loaded()?.advanced)
    }

    pub fn device(&self) -> Result<&DeviceSettings, DmsError> {
        Ok(&self.loaded()?.device)
    }

    pub fn dve(&self) -> Result<&DveSettings, DmsError> {
        Ok(&self.loaded()?.dve)
    }

    pub fn failover(&self) -> Result<&FailoverSettings, DmsError> {
        Ok(&self.loaded()?.failover)
    }

    pub fn redundancy(&self) -> Result<&RedundancySettings, DmsError> {
        Ok(&self.loaded()?.redundancy)
    }

    pub fn replication(&self) -> Result<&ReplicationSettings, DmsError> {
        Ok(&self.loaded()?.replication)
    }

    pub fn name(&self) -> Result<&str, DmsError> {
        Ok(self.general()?.name())
    }

    pub fn description(&self) -> Result<&str, DmsError> {
        Ok(self.general()?.description())
    }

    pub fn protocol(&self) -> Result<&ProtocolRef, DmsError> {
        Ok(self.general()?.protocol())
    }

    pub fn state(&self) -> Result<ElementState, DmsError> {
        Ok(self.general()?.state())
    }

    pub fn alarm_template(&self) -> Result<Option<&str>, DmsError> {
        Ok(self.general()?.alarm_template())
    }

    pub fn trend_template(&self) -> Result<Option<&str>, DmsError> {
        Ok(self.general()?.trend_template())
    }

    /// Ids of the views the element belongs to, including pending edits.
    pub fn views(&self) -> Result<&BTreeSet<i32>, DmsError> {
        Ok(&self.loaded()?.views)
    }

    pub fn properties(&self) -> Result<&PropertyCollection, DmsError> {
        Ok(&self.loaded()?.properties)
    }

    /// The element's connections. Fails with `NotLoaded` when the record
    /// came without ports; see [`DmsElement::load_connections`].
    pub fn connections(&self) -> Result<&ElementConnections, DmsError> {
        self.loaded()?
            .connections
            .as_ref()
            .ok_or_else(|| DmsError::NotLoaded {
                entity: "Element connections",
                identifier: self.id.to_string(),
            })
    }

    /// `true` when at least one change is waiting for `update()`.
    pub fn has_pending_changes(&self) -> bool {
        self.data.as_ref().is_some_and(ElementData::has_updates)
    }

    /// Handle for the agent hosting the element.
    pub fn host_agent(&self) -> Result<Dma, DmsError> {
        let host = self.general()?.host_agent_id();
        let host = if host > 0 { host } else { self.id.agent_id() };
        Dma::new(self.dms.clone(), host)
    }

    /// Unloaded handles for the views the element belongs to.
    pub fn view_handles(&self) -> Result<Vec<DmsView>, DmsError> {
        Ok(self
            .loaded()?
            .views
            .iter()
            .map(|&id| self.dms.view(id))
            .collect())
    }

    // ── Local writes ─────────────────────────────────────────────────

    pub fn set_name(&mut self, name: &str) -> Result<(), DmsError> {
        self.loaded_mut()?.general.set_name(name)
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> Result<(), DmsError> {
        self.loaded_mut()?.general.set_description(description);
        Ok(())
    }

    pub fn advanced_mut(&mut self) -> Result<&mut AdvancedSettings, DmsError> {
        Ok(&mut self.loaded_mut()?.advanced)
    }

    pub fn dve_mut(&mut self) -> Result<&mut DveSettings, DmsError> {
        Ok(&mut self.loaded_mut()?.dve)
    }

    pub fn failover_mut(&mut self) -> Result<&mut FailoverSettings, DmsError> {
        Ok(&mut self.loaded_mut()?.failover)
    }

    fn check_template_protocol(&self, template: &ProtocolRef, name: &str) -> Result<(), DmsError> {
        let own = self.protocol()?;
        if own != template {
            return Err(DmsError::incorrect(format!(
                "template '{name}' belongs to protocol {template}, element {} runs {own}",
                self.id
            )));
        }
        Ok(())
    }

    /// Assign an alarm template of the element's own protocol.
    pub fn set_alarm_template(&mut self, template: &DmsAlarmTemplate) -> Result<(), DmsError> {
        self.check_template_protocol(template.protocol(), template.name())?;
        self.loaded_mut()?
            .general
            .set_alarm_template(Some(template.name().to_owned()));
        Ok(())
    }

    pub fn clear_alarm_template(&mut self) -> Result<(), DmsError> {
        self.loaded_mut()?.general.set_alarm_template(None);
        Ok(())
    }

    /// Assign a trend template of the element's own protocol.
    pub fn set_trend_template(&mut self, template: &DmsTrendTemplate) -> Result<(), DmsError> {
        self.check_template_protocol(template.protocol(), template.name())?;
        self.loaded_mut()?
            .general
            .set_trend_template(Some(template.name().to_owned()));
        Ok(())
    }

    pub fn clear_trend_template(&mut self) -> Result<(), DmsError> {
        self.loaded_mut()?.general.set_trend_template(None);
        Ok(())
    }

    fn check_view_id(view_id: i32) -> Result<(), DmsError> {
        if view_id < ROOT_VIEW_ID {
            return Err(DmsError::out_of_range(
                "viewId",
                format!("{view_id} is not a valid view id"),
            ));
        }
        Ok(())
    }

    /// Add the element to a view. Adding a current view changes nothing.
    pub fn add_view(&mut self, view_id: i32) -> Result<(), DmsError> {
        Self::check_view_id(view_id)?;
        self.loaded_mut()?.views.insert(view_id);
        Ok(())
    }

    pub fn remove_view(&mut self, view_id: i32) -> Result<(), DmsError> {
        self.loaded_mut()?.views.remove(&view_id);
        Ok(())
    }

    /// Replace the view membership. An empty set is accepted here and
    /// rejected by `update()`.
    pub fn set_views(&mut self, views: impl IntoIterator<Item = i32>) -> Result<(), DmsError> {
        let views: BTreeSet<i32> = views.into_iter().collect();
        for &id in &views {
            Self::check_view_id(id)?;
        }
        self.loaded_mut()?.views = views;
        Ok(())
    }

    /// Write a property value after checking it against the system-wide
    /// definition (fetched once per root).
    pub async fn set_property(
        &mut self,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), DmsError> {
        self.ensure_not_deleted()?;
        self.loaded()?;
        let definition = self
            .dms
            .property_definition(PropertyKind::Element, name)
            .await?;
        self.loaded_mut()?.properties.set(&definition, value)?;
        Ok(())
    }

    /// Mutable access to the connections for in-place edits of their
    /// settings. Replacing a connection goes through `set_connection`.
    pub fn connections_mut(&mut self) -> Result<&mut ElementConnections, DmsError> {
        let identifier = self.id.to_string();
        self.loaded_mut()?
            .connections
            .as_mut()
            .ok_or(DmsError::NotLoaded {
                entity: "Element connections",
                identifier,
            })
    }

    /// Connection kinds the element's protocol declares per port, fetched
    /// once per handle.
    async fn declared_connection_kinds(&mut self) -> Result<Vec<ConnectionKind>, DmsError> {
        if let Some(kinds) = &self.declared_connections {
            return Ok(kinds.clone());
        }
        let reference = self.protocol()?.clone();
        let mut protocol = self.dms.protocol(&reference.name, &reference.version)?;
        protocol.load().await?;
        let kinds = protocol.connection_kinds()?;
        self.declared_connections = Some(kinds.clone());
        Ok(kinds)
    }

    /// Replace the connection on port `index`. The new connection must
    /// satisfy the kind the protocol declares for that port.
    pub async fn set_connection(
        &mut self,
        index: usize,
        connection: ElementConnection,
    ) -> Result<(), DmsError> {
        self.ensure_not_deleted()?;
        if self.loaded()?.connections.is_none() {
            self.load_connections().await?;
        }
        let declared = self.declared_connection_kinds().await?;
        self.connections_mut()?.assign(index, connection, &declared)
    }

    // ── Update ───────────────────────────────────────────────────────

    /// `true` when the hosting agent still expects the legacy SNMPv3 port
    /// layout. The agent version is fetched once per handle.
    async fn host_is_legacy(&mut self) -> Result<bool, DmsError> {
        let version = match self.host_version {
            Some(version) => version,
            None => {
                let version = self.host_agent()?.version().await?;
                self.host_version = Some(version);
                version
            }
        };
        Ok(version <= SNMPV3_LAYOUT_VERSION)
    }

    /// Send every pending change in one message.
    ///
    /// On success the snapshot is dropped; call `load()` to read the new
    /// state. On failure the snapshot is dropped too, and if the element
    /// turns out to be gone the handle is marked deleted.
    pub async fn update(&mut self) -> Result<(), DmsError> {
        self.ensure_not_deleted()?;
        let Some(data) = self.data.as_ref() else {
            return Ok(());
        };
        if !data.has_updates() {
            debug!(element = %self.id, "no pending changes");
            return Ok(());
        }
        if data.views_changed() && data.views.is_empty() {
            return Err(DmsError::incorrect(format!(
                "element {} must belong to at least one view",
                self.id
            )));
        }

        let legacy_snmpv3 = if data.connections_changed() {
            self.host_is_legacy().await?
        } else {
            false
        };
        let update = {
            let ctx = PortWriteContext {
                encoder: self.dms.encoder(),
                legacy_snmpv3,
            };
            self.loaded()?.build_update(&ctx)?
        };

        let request = Request::UpdateElement {
            agent_id: self.id.agent_id(),
            element_id: self.id.element_id(),
            update,
        };
        let result = self.dms.comm().request_ack(request).await;
        // Dropping the snapshot also forgets every change set and the view
        // baseline.
        self.data = None;
        match result {
            Ok(_) => {
                info!(element = %self.id, "element updated");
                Ok(())
            }
            Err(err) => Err(self.update_failed(err).await),
        }
    }

    async fn update_failed(&mut self, err: dms_api::Error) -> DmsError {
        let gone = err.is_not_found() || matches!(self.exists().await, Ok(false));
        if gone {
            warn!(element = %self.id, "element disappeared during update");
            self.deleted = true;
            return self.not_found();
        }
        DmsError::Api(err)
    }

    // ── State changes ────────────────────────────────────────────────

    async fn change_state(&mut self, change: ElementStateChange) -> Result<(), DmsError> {
        self.ensure_not_deleted()?;
        let request = Request::SetElementState {
            agent_id: self.id.agent_id(),
            element_id: self.id.element_id(),
            state: change,
        };
        match self.dms.comm().request_ack(request).await {
            Ok(_) => {
                let state = ElementState::after(change);
                if let Some(data) = self.data.as_mut() {
                    data.general.set_state(state);
                }
                if change == ElementStateChange::Delete {
                    self.deleted = true;
                }
                info!(element = %self.id, %state, "element state changed");
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                self.data = None;
                self.deleted = true;
                Err(self.not_found())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn start(&mut self) -> Result<(), DmsError> {
        self.change_state(ElementStateChange::Start).await
    }

    pub async fn stop(&mut self) -> Result<(), DmsError> {
        self.change_state(ElementStateChange::Stop).await
    }

    pub async fn pause(&mut self) -> Result<(), DmsError> {
        self.change_state(ElementStateChange::Pause).await
    }

    pub async fn restart(&mut self) -> Result<(), DmsError> {
        self.change_state(ElementStateChange::Restart).await
    }

    /// Delete the element. The handle is unusable afterwards.
    pub async fn delete(&mut self) -> Result<(), DmsError> {
        self.change_state(ElementStateChange::Delete).await
    }

    pub async fn hide(&mut self) -> Result<(), DmsError> {
        self.change_state(ElementStateChange::Hide).await
    }

    pub async fn unhide(&mut self) -> Result<(), DmsError> {
        self.change_state(ElementStateChange::Unhide).await
    }

    pub async fn mask(&mut self) -> Result<(), DmsError> {
        self.change_state(ElementStateChange::Mask).await
    }

    pub async fn unmask(&mut self) -> Result<(), DmsError> {
        self.change_state(ElementStateChange::Unmask).await
    }

    // ── Parameters ───────────────────────────────────────────────────

    async fn check_parameter_access(&mut self, parameter_id: i32) -> Result<(), DmsError> {
        if parameter_id < 1 {
            return Err(DmsError::out_of_range(
                "parameterId",
                format!("{parameter_id} is not a valid parameter id"),
            ));
        }
        self.ensure_not_deleted()?;
        self.load_on_demand().await?;
        self.ensure_not_deleted()?;
        if self.state()? == ElementState::Stopped {
            return Err(DmsError::ElementStopped {
                identifier: self.id.to_string(),
            });
        }
        Ok(())
    }

    fn check_table_key(key: &str) -> Result<(), DmsError> {
        if key.is_empty() {
            return Err(DmsError::invalid("key", "must not be empty"));
        }
        Ok(())
    }

    async fn read_parameter(
        &mut self,
        parameter_id: i32,
        table_key: Option<String>,
    ) -> Result<ParameterValue, DmsError> {
        self.check_parameter_access(parameter_id).await?;
        let request = Request::GetParameter {
            agent_id: self.id.agent_id(),
            element_id: self.id.element_id(),
            parameter_id,
            table_key,
        };
        self.dms.fetch(request, || self.not_found()).await
    }

    async fn write_parameter(
        &mut self,
        parameter_id: i32,
        table_key: Option<String>,
        value: ParameterValue,
    ) -> Result<(), DmsError> {
        self.check_parameter_access(parameter_id).await?;
        let request = Request::SetParameter {
            agent_id: self.id.agent_id(),
            element_id: self.id.element_id(),
            parameter_id,
            table_key,
            value,
        };
        self.dms
            .comm()
            .request_ack(request)
            .await
            .map_err(|e| map_not_found(e, || self.not_found()))?;
        debug!(element = %self.id, parameter_id, "parameter set");
        Ok(())
    }

    pub async fn get_standalone_parameter(
        &mut self,
        parameter_id: i32,
    ) -> Result<ParameterValue, DmsError> {
        self.read_parameter(parameter_id, None).await
    }

    pub async fn set_standalone_parameter(
        &mut self,
        parameter_id: i32,
        value: impl Into<ParameterValue>,
    ) -> Result<(), DmsError> {
        self.write_parameter(parameter_id, None, value.into()).await
    }

    /// Read one cell of a table column, addressed by row key.
    pub async fn get_table_cell(
        &mut self,
        column_parameter_id: i32,
        key: &str,
    ) -> Result<ParameterValue, DmsError> {
        Self::check_table_key(key)?;
        self.read_parameter(column_parameter_id, Some(key.to_owned()))
            .await
    }

    pub async fn set_table_cell(
        &mut self,
        column_parameter_id: i32,
        key: &str,
        value: impl Into<ParameterValue>,
    ) -> Result<(), DmsError> {
        Self::check_table_key(key)?;
        self.write_parameter(column_parameter_id, Some(key.to_owned()), value.into())
            .await
    }
}
