// ── Element settings groups ──
//
// Each group is one cohesive slice of an element record. All of them load
// from `ElementInfo` and write their changed fields into `ElementUpdate`;
// read-only groups never record changes.

use std::time::Duration;

use dms_api::messages::{ElementInfo, ElementUpdate};

use crate::connection::ip::{from_millis, to_millis};
use crate::error::DmsError;
use crate::id::DmsElementId;
use crate::naming::validate_name;
use crate::protocol::ProtocolRef;
use crate::tracked::{ChangeSet, SettingsGroup, assign};

use super::state::ElementState;

/// Upper bound of the element timeout.
pub const MAX_ELEMENT_TIMEOUT: Duration = Duration::from_secs(120);

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_owned())
}

pub(crate) fn check_element_timeout(timeout: Duration) -> Result<(), DmsError> {
    if timeout > MAX_ELEMENT_TIMEOUT {
        return Err(DmsError::out_of_range(
            "timeout",
            format!("{} s exceeds the maximum of 120 s", timeout.as_secs()),
        ));
    }
    Ok(())
}

// ── General ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneralField {
    Name,
    Description,
    AlarmTemplate,
    TrendTemplate,
}

/// Name, description, protocol, state, host agent and templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneralSettings {
    name: String,
    description: String,
    protocol: ProtocolRef,
    state: ElementState,
    host_agent_id: i32,
    alarm_template: Option<String>,
    trend_template: Option<String>,
    changes: ChangeSet<GeneralField>,
}

impl GeneralSettings {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn protocol(&self) -> &ProtocolRef {
        &self.protocol
    }

    pub fn state(&self) -> ElementState {
        self.state
    }

    pub fn host_agent_id(&self) -> i32 {
        self.host_agent_id
    }

    pub fn alarm_template(&self) -> Option<&str> {
        self.alarm_template.as_deref()
    }

    pub fn trend_template(&self) -> Option<&str> {
        self.trend_template.as_deref()
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), DmsError> {
        let name = validate_name(name, "name")?;
        assign(&mut self.name, name, &mut self.changes, GeneralField::Name);
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        assign(
            &mut self.description,
            description.into(),
            &mut self.changes,
            GeneralField::Description,
        );
    }

    pub(crate) fn set_alarm_template(&mut self, template: Option<String>) {
        assign(
            &mut self.alarm_template,
            template,
            &mut self.changes,
            GeneralField::AlarmTemplate,
        );
    }

    pub(crate) fn set_trend_template(&mut self, template: Option<String>) {
        assign(
            &mut self.trend_template,
            template,
            &mut self.changes,
            GeneralField::TrendTemplate,
        );
    }

    /// Cached state only; no message is sent.
    pub(crate) fn set_state(&mut self, state: ElementState) {
        self.state = state;
    }
}

impl SettingsGroup for GeneralSettings {
    type Source = ElementInfo;
    type Target = ElementUpdate;

    fn load(&mut self, info: &ElementInfo) {
        self.name = info.name.clone();
        self.description = info.description.clone();
        self.protocol = ProtocolRef::new(&info.protocol_name, &info.protocol_version);
        self.state = ElementState::from_code(info.state);
        self.host_agent_id = info.host_agent_id;
        self.alarm_template = non_empty(&info.alarm_template);
        self.trend_template = non_empty(&info.trend_template);
    }

    fn fill_update(&self, update: &mut ElementUpdate) {
        for field in self.changes.iter() {
            match field {
                GeneralField::Name => update.name = Some(self.name.clone()),
                GeneralField::Description => update.description = Some(self.description.clone()),
                // An empty template name removes the assignment.
                GeneralField::AlarmTemplate => {
                    update.alarm_template = Some(self.alarm_template.clone().unwrap_or_default());
                }
                GeneralField::TrendTemplate => {
                    update.trend_template = Some(self.trend_template.clone().unwrap_or_default());
                }
            }
        }
    }

    fn has_updates(&self) -> bool {
        self.changes.any()
    }
}

// ── Advanced ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdvancedField {
    IsHidden,
    IsReadOnly,
    Timeout,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvancedSettings {
    is_hidden: bool,
    is_read_only: bool,
    is_simulation: bool,
    timeout: Duration,
    changes: ChangeSet<AdvancedField>,
}

impl AdvancedSettings {
    pub fn is_hidden(&self) -> bool {
        self.is_hidden
    }

    pub fn is_read_only(&self) -> bool {
        self.is_read_only
    }

    pub fn is_simulation(&self) -> bool {
        self.is_simulation
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        assign(&mut self.is_hidden, hidden, &mut self.changes, AdvancedField::IsHidden);
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        assign(
            &mut self.is_read_only,
            read_only,
            &mut self.changes,
            AdvancedField::IsReadOnly,
        );
    }

    /// Element timeout, at most 120 s.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), DmsError> {
        check_element_timeout(timeout)?;
        assign(&mut self.timeout, timeout, &mut self.changes, AdvancedField::Timeout);
        Ok(())
    }
}

impl SettingsGroup for AdvancedSettings {
    type Source = ElementInfo;
    type Target = ElementUpdate;

    fn load(&mut self, info: &ElementInfo) {
        self.is_hidden = info.is_hidden;
        self.is_read_only = info.is_read_only;
        self.is_simulation = info.is_simulation;
        self.timeout = from_millis(info.timeout_ms);
    }

    fn fill_update(&self, update: &mut ElementUpdate) {
        for field in self.changes.iter() {
            match field {
                AdvancedField::IsHidden => update.is_hidden = Some(self.is_hidden),
                AdvancedField::IsReadOnly => update.is_read_only = Some(self.is_read_only),
                AdvancedField::Timeout => update.timeout_ms = Some(to_millis(self.timeout)),
            }
        }
    }

    fn has_updates(&self) -> bool {
        self.changes.any()
    }
}

// ── Device ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSettings {
    device_type: String,
}

impl DeviceSettings {
    pub fn device_type(&self) -> &str {
        &self.device_type
    }
}

impl SettingsGroup for DeviceSettings {
    type Source = ElementInfo;
    type Target = ElementUpdate;

    fn load(&mut self, info: &ElementInfo) {
        self.device_type = info.device_type.clone();
    }

    fn fill_update(&self, _update: &mut ElementUpdate) {}

    fn has_updates(&self) -> bool {
        false
    }
}

// ── DVE ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DveField {
    CreationEnabled,
}

/// Dynamic virtual element settings. A DVE child carries its parent's id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DveSettings {
    is_dve_creation_enabled: bool,
    parent: Option<DmsElementId>,
    changes: ChangeSet<DveField>,
}

impl DveSettings {
    pub fn is_dve_creation_enabled(&self) -> bool {
        self.is_dve_creation_enabled
    }

    pub fn is_child(&self) -> bool {
        self.parent.is_some()
    }

    pub fn parent(&self) -> Option<DmsElementId> {
        self.parent
    }

    /// Only parent elements can spawn DVEs.
    pub fn set_dve_creation_enabled(&mut self, enabled: bool) -> Result<(), DmsError> {
        if let Some(parent) = self.parent {
            return Err(DmsError::incorrect(format!(
                "element is a DVE child of {parent} and cannot create DVEs itself"
            )));
        }
        assign(
            &mut self.is_dve_creation_enabled,
            enabled,
            &mut self.changes,
            DveField::CreationEnabled,
        );
        Ok(())
    }
}

impl SettingsGroup for DveSettings {
    type Source = ElementInfo;
    type Target = ElementUpdate;

    fn load(&mut self, info: &ElementInfo) {
        self.is_dve_creation_enabled = info.is_dve_creation_enabled;
        self.parent = info
            .dve_parent
            .and_then(|key| DmsElementId::try_from(key).ok())
            .filter(|id| !id.is_unset());
    }

    fn fill_update(&self, update: &mut ElementUpdate) {
        if self.changes.contains(&DveField::CreationEnabled) {
            update.is_dve_creation_enabled = Some(self.is_dve_creation_enabled);
        }
    }

    fn has_updates(&self) -> bool {
        self.changes.any()
    }
}

// ── Failover ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailoverField {
    KeepOnline,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailoverSettings {
    is_failover: bool,
    keep_online: bool,
    is_online: bool,
    changes: ChangeSet<FailoverField>,
}

impl FailoverSettings {
    pub fn is_failover(&self) -> bool {
        self.is_failover
    }

    /// Keep the element running on the backup agent as well.
    pub fn keep_online(&self) -> bool {
        self.keep_online
    }

    pub fn is_online(&self) -> bool {
        self.is_online
    }

    pub fn set_keep_online(&mut self, keep_online: bool) {
        assign(
            &mut self.keep_online,
            keep_online,
            &mut self.changes,
            FailoverField::KeepOnline,
        );
    }
}

impl SettingsGroup for FailoverSettings {
    type Source = ElementInfo;
    type Target = ElementUpdate;

    fn load(&mut self, info: &ElementInfo) {
        self.is_failover = info.is_failover;
        self.keep_online = info.keep_online;
        self.is_online = info.is_online;
    }

    fn fill_update(&self, update: &mut ElementUpdate) {
        if self.changes.contains(&FailoverField::KeepOnline) {
            update.keep_online = Some(self.keep_online);
        }
    }

    fn has_updates(&self) -> bool {
        self.changes.any()
    }
}

// ── Redundancy ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedundancySettings {
    is_derived: bool,
}

impl RedundancySettings {
    /// Element was derived from a redundancy group.
    pub fn is_derived(&self) -> bool {
        self.is_derived
    }
}

impl SettingsGroup for RedundancySettings {
    type Source = ElementInfo;
    type Target = ElementUpdate;

    fn load(&mut self, info: &ElementInfo) {
        self.is_derived = info.is_derived;
    }

    fn fill_update(&self, _update: &mut ElementUpdate) {}

    fn has_updates(&self) -> bool {
        false
    }
}

// ── Replication ─────────────────────────────────────────────────────

/// Replication of an element living on another system.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicationSettings {
    is_replicated: bool,
    remote_element: String,
    source_agent_address: String,
    domain: String,
    user_name: String,
    options: String,
    connects_to_all_agents: bool,
}

impl ReplicationSettings {
    pub fn is_replicated(&self) -> bool {
        self.is_replicated
    }

    pub fn remote_element(&self) -> &str {
        &self.remote_element
    }

    pub fn source_agent_address(&self) -> &str {
        &self.source_agent_address
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn options(&self) -> &str {
        &self.options
    }

    pub fn connects_to_all_agents(&self) -> bool {
        self.connects_to_all_agents
    }
}

impl SettingsGroup for ReplicationSettings {
    type Source = ElementInfo;
    type Target = ElementUpdate;

    fn load(&mut self, info: &ElementInfo) {
        let replication = info.replication.clone().unwrap_or_default();
        self.is_replicated = info.replication.is_some();
        self.remote_element = replication.remote_element;
        self.source_agent_address = replication.source_agent_address;
        self.domain = replication.domain;
        self.user_name = replication.user_name;
        self.options = replication.options;
        self.connects_to_all_agents = replication.connects_to_all_agents;
    }

    fn fill_update(&self, _update: &mut ElementUpdate) {}

    fn has_updates(&self) -> bool {
        false
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dms_api::messages::ElementKey;

    fn info() -> ElementInfo {
        ElementInfo {
            agent_id: 400,
            element_id: 201,
            name: "Router 1".into(),
            description: "edge".into(),
            protocol_name: "Cisco Router".into(),
            protocol_version: "1.0.0.1".into(),
            state: 1,
            host_agent_id: 400,
            alarm_template: "Default".into(),
            timeout_ms: 30_000,
            ..ElementInfo::default()
        }
    }

    #[test]
    fn load_does_not_mark_changes() {
        let mut general = GeneralSettings::default();
        general.load(&info());
        assert!(!general.has_updates());
        assert_eq!(general.state(), ElementState::Active);
        assert_eq!(general.alarm_template(), Some("Default"));
        assert_eq!(general.trend_template(), None);
    }

    #[test]
    fn fill_update_only_copies_changed_fields() {
        let mut general = GeneralSettings::default();
        general.load(&info());
        general.set_description("core");
        general.set_name("Router 1").unwrap();

        let mut update = ElementUpdate::default();
        general.fill_update(&mut update);
        assert_eq!(
            update,
            ElementUpdate {
                description: Some("core".into()),
                ..ElementUpdate::default()
            }
        );
    }

    #[test]
    fn cleared_template_is_sent_empty() {
        let mut general = GeneralSettings::default();
        general.load(&info());
        general.set_alarm_template(None);
        let mut update = ElementUpdate::default();
        general.fill_update(&mut update);
        assert_eq!(update.alarm_template.as_deref(), Some(""));
    }

    #[test]
    fn element_timeout_range() {
        let mut advanced = AdvancedSettings::default();
        advanced.load(&info());
        assert_eq!(advanced.timeout(), Duration::from_secs(30));
        assert!(advanced.set_timeout(Duration::from_secs(121)).is_err());
        advanced.set_timeout(Duration::from_secs(120)).unwrap();

        let mut update = ElementUpdate::default();
        advanced.fill_update(&mut update);
        assert_eq!(update.timeout_ms, Some(120_000));
    }

    #[test]
    fn dve_child_cannot_enable_creation() {
        let mut raw = info();
        raw.dve_parent = Some(ElementKey {
            agent_id: 400,
            element_id: 100,
        });
        let mut dve = DveSettings::default();
        dve.load(&raw);
        assert!(dve.is_child());
        assert!(dve.set_dve_creation_enabled(true).is_err());
    }

    #[test]
    fn replication_flag_follows_presence() {
        let mut replication = ReplicationSettings::default();
        replication.load(&info());
        assert!(!replication.is_replicated());
    }
}
