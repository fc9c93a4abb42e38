// Element creation payload.

use std::collections::BTreeSet;
use std::time::Duration;

use dms_api::messages::{ElementUpdate, PropertyValueInfo};

use crate::connection::ip::to_millis;
use crate::connection::{ElementConnection, ElementConnections, PortWriteContext};
use crate::error::DmsError;
use crate::naming::validate_name;
use crate::protocol::ProtocolRef;
use crate::view::ROOT_VIEW_ID;

use super::settings::check_element_timeout;

/// Element timeout applied when the builder does not set one.
pub const DEFAULT_ELEMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything needed to create an element on an agent.
///
/// Built with `ElementConfiguration::new` and the `with_*` methods, then
/// passed to [`Dma::create_element`](crate::Dma::create_element). Without
/// explicit views the element lands in the root view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementConfiguration {
    name: String,
    description: String,
    protocol: ProtocolRef,
    connections: ElementConnections,
    views: BTreeSet<i32>,
    alarm_template: Option<String>,
    trend_template: Option<String>,
    is_hidden: bool,
    is_read_only: bool,
    timeout: Duration,
    is_dve_creation_enabled: bool,
    properties: Vec<PropertyValueInfo>,
}

impl ElementConfiguration {
    pub fn new(
        name: &str,
        protocol: ProtocolRef,
        connections: Vec<ElementConnection>,
    ) -> Result<Self, DmsError> {
        let name = validate_name(name, "name")?;
        let protocol = ProtocolRef::validated(&protocol.name, &protocol.version)?;
        Ok(Self {
            name,
            description: String::new(),
            protocol,
            connections: connections.into(),
            views: BTreeSet::from([ROOT_VIEW_ID]),
            alarm_template: None,
            trend_template: None,
            is_hidden: false,
            is_read_only: false,
            timeout: DEFAULT_ELEMENT_TIMEOUT,
            is_dve_creation_enabled: false,
            properties: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replace the view membership. At least one view is required.
    pub fn with_views(mut self, views: impl IntoIterator<Item = i32>) -> Result<Self, DmsError> {
        let views: BTreeSet<i32> = views.into_iter().collect();
        if views.is_empty() {
            return Err(DmsError::incorrect("an element must belong to at least one view"));
        }
        if let Some(bad) = views.iter().find(|&&v| v < ROOT_VIEW_ID) {
            return Err(DmsError::out_of_range(
                "views",
                format!("{bad} is not a valid view id"),
            ));
        }
        self.views = views;
        Ok(self)
    }

    #[must_use]
    pub fn with_alarm_template(mut self, name: impl Into<String>) -> Self {
        self.alarm_template = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_trend_template(mut self, name: impl Into<String>) -> Self {
        self.trend_template = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.is_hidden = hidden;
        self
    }

    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.is_read_only = read_only;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, DmsError> {
        check_element_timeout(timeout)?;
        self.timeout = timeout;
        Ok(self)
    }

    #[must_use]
    pub fn with_dve_creation(mut self, enabled: bool) -> Self {
        self.is_dve_creation_enabled = enabled;
        self
    }

    /// Initial property value. A repeated name replaces the earlier value.
    #[must_use]
    pub fn with_property(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self
            .properties
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(name))
        {
            Some(existing) => existing.value = value,
            None => self.properties.push(PropertyValueInfo {
                name: name.to_owned(),
                value,
            }),
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn protocol(&self) -> &ProtocolRef {
        &self.protocol
    }

    pub fn connections(&self) -> &ElementConnections {
        &self.connections
    }

    pub fn views(&self) -> &BTreeSet<i32> {
        &self.views
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn has_snmpv3(&self) -> bool {
        self.connections
            .iter()
            .any(|c| matches!(c, ElementConnection::SnmpV3(_)))
    }

    /// The full creation message; every field travels.
    pub(crate) fn to_update(&self, ctx: &PortWriteContext<'_>) -> Result<ElementUpdate, DmsError> {
        Ok(ElementUpdate {
            name: Some(self.name.clone()),
            description: Some(self.description.clone()),
            protocol_name: Some(self.protocol.name.clone()),
            protocol_version: Some(self.protocol.version.clone()),
            alarm_template: self.alarm_template.clone(),
            trend_template: self.trend_template.clone(),
            is_hidden: Some(self.is_hidden),
            is_read_only: Some(self.is_read_only),
            timeout_ms: Some(to_millis(self.timeout)),
            is_dve_creation_enabled: Some(self.is_dve_creation_enabled),
            keep_online: None,
            views: Some(self.views.iter().copied().collect()),
            properties: self.properties.clone(),
            ports: self.connections.all_ports(ctx)?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::connection::SnmpCommunityConnection;
    use crate::credential::PlainTextEncoder;
    use pretty_assertions::assert_eq;

    fn ctx() -> PortWriteContext<'static> {
        PortWriteContext {
            encoder: &PlainTextEncoder,
            legacy_snmpv3: false,
        }
    }

    fn router() -> ElementConfiguration {
        ElementConfiguration::new(
            "Router 1",
            ProtocolRef::new("Cisco Router", "1.0.0.1"),
            vec![ElementConnection::SnmpV2(
                SnmpCommunityConnection::new("10.0.0.1").unwrap(),
            )],
        )
        .unwrap()
    }

    #[test]
    fn defaults_to_root_view() {
        let update = router().to_update(&ctx()).unwrap();
        assert_eq!(update.views, Some(vec![ROOT_VIEW_ID]));
        assert_eq!(update.timeout_ms, Some(30_000));
        assert_eq!(update.ports.len(), 1);
        assert_eq!(update.ports[0].protocol_type, "snmpv2");
        assert_eq!(update.ports[0].get_community, "public");
    }

    #[test]
    fn rejects_invalid_name_and_empty_views() {
        assert!(
            ElementConfiguration::new("a/b", ProtocolRef::new("P", "1"), Vec::new()).is_err()
        );
        assert!(matches!(
            router().with_views(Vec::new()),
            Err(DmsError::IncorrectData { .. })
        ));
    }

    #[test]
    fn timeout_is_bounded() {
        assert!(router().with_timeout(Duration::from_secs(121)).is_err());
        assert!(router().with_timeout(Duration::from_secs(120)).is_ok());
    }

    #[test]
    fn repeated_property_replaces_value() {
        let config = router()
            .with_property("Location", "Brussels")
            .with_property("location", "Ghent");
        let update = config.to_update(&ctx()).unwrap();
        assert_eq!(update.properties.len(), 1);
        assert_eq!(update.properties[0].value, "Ghent");
    }
}
