// ── Services ──
//
// A service aggregates elements and other services. Each inclusion can
// carry an alias, be excluded from the service state, and cap the alarm
// severity it contributes.

use std::collections::BTreeSet;
use std::fmt;

use dms_api::messages::{PropertyKind, ServiceInclusionInfo, ServiceInfo, ServiceUpdate};
use dms_api::{CommunicationExt, Request};
use strum::{Display, EnumString};
use tracing::{debug, info};

use crate::dms::Dms;
use crate::error::{DmsError, map_not_found};
use crate::id::{DmsElementId, DmsServiceId};
use crate::naming::validate_name;
use crate::property::PropertyCollection;
use crate::tracked::{ChangeSet, assign};
use crate::view::ROOT_VIEW_ID;

/// Most inclusions a single service can hold.
pub const MAX_SERVICE_INCLUSIONS: usize = 1000;

// ── Inclusions ──────────────────────────────────────────────────────

/// Alarm severity, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AlarmLevel {
    Normal,
    Warning,
    Minor,
    Major,
    Critical,
}

impl AlarmLevel {
    pub fn from_code(code: i32) -> Result<Self, DmsError> {
        Ok(match code {
            1 => Self::Normal,
            2 => Self::Warning,
            3 => Self::Minor,
            4 => Self::Major,
            5 => Self::Critical,
            other => {
                return Err(DmsError::incorrect(format!(
                    "unknown alarm level code {other}"
                )));
            }
        })
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Normal => 1,
            Self::Warning => 2,
            Self::Minor => 3,
            Self::Major => 4,
            Self::Critical => 5,
        }
    }
}

/// What an inclusion points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceTarget {
    Element(DmsElementId),
    Service(DmsServiceId),
}

impl fmt::Display for ServiceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(id) => write!(f, "element {id}"),
            Self::Service(id) => write!(f, "service {id}"),
        }
    }
}

/// One element or service included in a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInclusion {
    pub target: ServiceTarget,
    pub alias: String,
    pub is_excluded: bool,
    /// Highest severity this inclusion may raise the service to.
    pub alarm_cap: Option<AlarmLevel>,
}

impl ServiceInclusion {
    pub fn new(target: ServiceTarget) -> Self {
        Self {
            target,
            alias: String::new(),
            is_excluded: false,
            alarm_cap: None,
        }
    }

    fn from_info(info: &ServiceInclusionInfo) -> Result<Self, DmsError> {
        let target = match info.kind.as_str() {
            "element" => ServiceTarget::Element(DmsElementId::new(info.agent_id, info.id)?),
            "service" => ServiceTarget::Service(DmsServiceId::new(info.agent_id, info.id)?),
            other => {
                return Err(DmsError::incorrect(format!(
                    "unknown service inclusion kind '{other}'"
                )));
            }
        };
        Ok(Self {
            target,
            alias: info.alias.clone(),
            is_excluded: info.is_excluded,
            alarm_cap: info.alarm_cap.map(AlarmLevel::from_code).transpose()?,
        })
    }

    fn to_info(&self) -> ServiceInclusionInfo {
        let (kind, agent_id, id) = match self.target {
            ServiceTarget::Element(e) => ("element", e.agent_id(), e.element_id()),
            ServiceTarget::Service(s) => ("service", s.agent_id(), s.service_id()),
        };
        ServiceInclusionInfo {
            kind: kind.to_owned(),
            agent_id,
            id,
            alias: self.alias.clone(),
            is_excluded: self.is_excluded,
            alarm_cap: self.alarm_cap.map(AlarmLevel::code),
        }
    }
}

/// The inclusion list of a service, bounded by [`MAX_SERVICE_INCLUSIONS`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceParamsConfiguration {
    inclusions: Vec<ServiceInclusion>,
}

impl ServiceParamsConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_infos(infos: &[ServiceInclusionInfo]) -> Result<Self, DmsError> {
        Ok(Self {
            inclusions: infos
                .iter()
                .map(ServiceInclusion::from_info)
                .collect::<Result<_, _>>()?,
        })
    }

    fn to_infos(&self) -> Vec<ServiceInclusionInfo> {
        self.inclusions.iter().map(ServiceInclusion::to_info).collect()
    }

    /// Append an inclusion. Fails with [`DmsError::Overflow`] when full.
    pub fn include(
        &mut self,
        inclusion: ServiceInclusion,
    ) -> Result<&mut ServiceInclusion, DmsError> {
        if self.is_full() {
            return Err(DmsError::Overflow {
                capacity: MAX_SERVICE_INCLUSIONS,
            });
        }
        self.inclusions.push(inclusion);
        let last = self.inclusions.len() - 1;
        Ok(&mut self.inclusions[last])
    }

    pub fn include_element(
        &mut self,
        id: DmsElementId,
    ) -> Result<&mut ServiceInclusion, DmsError> {
        self.include(ServiceInclusion::new(ServiceTarget::Element(id)))
    }

    pub fn include_service(
        &mut self,
        id: DmsServiceId,
    ) -> Result<&mut ServiceInclusion, DmsError> {
        self.include(ServiceInclusion::new(ServiceTarget::Service(id)))
    }

    pub fn remove(&mut self, index: usize) -> Option<ServiceInclusion> {
        (index < self.inclusions.len()).then(|| self.inclusions.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<&ServiceInclusion> {
        self.inclusions.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ServiceInclusion> {
        self.inclusions.get_mut(index)
    }

    pub fn contains(&self, target: ServiceTarget) -> bool {
        self.inclusions.iter().any(|i| i.target == target)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceInclusion> {
        self.inclusions.iter()
    }

    pub fn len(&self) -> usize {
        self.inclusions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inclusions.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inclusions.len() >= MAX_SERVICE_INCLUSIONS
    }
}

fn check_views(views: &BTreeSet<i32>) -> Result<(), DmsError> {
    if let Some(bad) = views.iter().find(|&&v| v < ROOT_VIEW_ID) {
        return Err(DmsError::out_of_range(
            "views",
            format!("{bad} is not a valid view id"),
        ));
    }
    Ok(())
}

// ── Creation ────────────────────────────────────────────────────────

/// Everything needed to create a service on an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfiguration {
    name: String,
    description: String,
    views: BTreeSet<i32>,
    params: ServiceParamsConfiguration,
}

impl ServiceConfiguration {
    pub fn new(name: &str) -> Result<Self, DmsError> {
        Ok(Self {
            name: validate_name(name, "name")?,
            description: String::new(),
            views: BTreeSet::from([ROOT_VIEW_ID]),
            params: ServiceParamsConfiguration::new(),
        })
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_views(mut self, views: impl IntoIterator<Item = i32>) -> Result<Self, DmsError> {
        let views: BTreeSet<i32> = views.into_iter().collect();
        check_views(&views)?;
        self.views = views;
        Ok(self)
    }

    #[must_use]
    pub fn with_params(mut self, params: ServiceParamsConfiguration) -> Self {
        self.params = params;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &ServiceParamsConfiguration {
        &self.params
    }

    pub(crate) fn to_update(&self) -> ServiceUpdate {
        ServiceUpdate {
            name: Some(self.name.clone()),
            description: Some(self.description.clone()),
            views: Some(self.views.iter().copied().collect()),
            properties: Vec::new(),
            included: Some(self.params.to_infos()),
        }
    }
}

// ── Handle ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ServiceField {
    Name,
    Description,
    Views,
    Params,
}

#[derive(Debug, Clone)]
struct ServiceData {
    name: String,
    description: String,
    views: BTreeSet<i32>,
    properties: PropertyCollection,
    params: ServiceParamsConfiguration,
    changes: ChangeSet<ServiceField>,
}

impl ServiceData {
    fn from_info(info: &ServiceInfo) -> Result<Self, DmsError> {
        Ok(Self {
            name: info.name.clone(),
            description: info.description.clone(),
            views: info.views.iter().copied().collect(),
            properties: PropertyCollection::from_values(&info.properties, &info.name),
            params: ServiceParamsConfiguration::from_infos(&info.included)?,
            changes: ChangeSet::new(),
        })
    }

    fn has_updates(&self) -> bool {
        self.changes.any() || self.properties.has_updates()
    }

    fn build_update(&self) -> ServiceUpdate {
        let mut update = ServiceUpdate::default();
        for field in self.changes.iter() {
            match field {
                ServiceField::Name => update.name = Some(self.name.clone()),
                ServiceField::Description => update.description = Some(self.description.clone()),
                ServiceField::Views => update.views = Some(self.views.iter().copied().collect()),
                ServiceField::Params => update.included = Some(self.params.to_infos()),
            }
        }
        if self.properties.has_updates() {
            update.properties = self.properties.changed_values();
        }
        update
    }
}

/// Handle to one service.
#[derive(Clone)]
pub struct DmsService {
    dms: Dms,
    id: DmsServiceId,
    data: Option<ServiceData>,
}

impl fmt::Debug for DmsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmsService")
            .field("id", &self.id)
            .field("loaded", &self.data.is_some())
            .finish_non_exhaustive()
    }
}

impl DmsService {
    pub(crate) fn new(dms: Dms, id: DmsServiceId) -> Self {
        Self { dms, id, data: None }
    }

    pub(crate) fn from_info(dms: Dms, info: ServiceInfo) -> Result<Self, DmsError> {
        Ok(Self {
            dms,
            id: DmsServiceId::new(info.agent_id, info.service_id)?,
            data: Some(ServiceData::from_info(&info)?),
        })
    }

    pub fn id(&self) -> DmsServiceId {
        self.id
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    fn not_found(&self) -> DmsError {
        DmsError::ServiceNotFound {
            identifier: self.id.to_string(),
        }
    }

    fn request(&self) -> Request {
        Request::GetServiceInfo {
            agent_id: self.id.agent_id(),
            service_id: self.id.service_id(),
        }
    }

    fn loaded(&self) -> Result<&ServiceData, DmsError> {
        self.data.as_ref().ok_or_else(|| DmsError::NotLoaded {
            entity: "Service",
            identifier: self.id.to_string(),
        })
    }

    fn loaded_mut(&mut self) -> Result<&mut ServiceData, DmsError> {
        let identifier = self.id.to_string();
        self.data.as_mut().ok_or(DmsError::NotLoaded {
            entity: "Service",
            identifier,
        })
    }

    pub async fn exists(&self) -> Result<bool, DmsError> {
        self.dms.probe(self.request()).await
    }

    pub async fn load(&mut self) -> Result<(), DmsError> {
        self.data = None;
        debug!(service = %self.id, "loading service");
        let info: ServiceInfo = self.dms.fetch(self.request(), || self.not_found()).await?;
        self.data = Some(ServiceData::from_info(&info)?);
        Ok(())
    }

    pub async fn load_on_demand(&mut self) -> Result<(), DmsError> {
        if self.data.is_none() {
            self.load().await?;
        }
        Ok(())
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn name(&self) -> Result<&str, DmsError> {
        Ok(&self.loaded()?.name)
    }

    pub fn description(&self) -> Result<&str, DmsError> {
        Ok(&self.loaded()?.description)
    }

    pub fn views(&self) -> Result<&BTreeSet<i32>, DmsError> {
        Ok(&self.loaded()?.views)
    }

    pub fn properties(&self) -> Result<&PropertyCollection, DmsError> {
        Ok(&self.loaded()?.properties)
    }

    pub fn params(&self) -> Result<&ServiceParamsConfiguration, DmsError> {
        Ok(&self.loaded()?.params)
    }

    pub fn has_pending_changes(&self) -> bool {
        self.data.as_ref().is_some_and(ServiceData::has_updates)
    }

    // ── Local writes ─────────────────────────────────────────────────

    pub fn set_name(&mut self, name: &str) -> Result<(), DmsError> {
        let name = validate_name(name, "name")?;
        let data = self.loaded_mut()?;
        assign(&mut data.name, name, &mut data.changes, ServiceField::Name);
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> Result<(), DmsError> {
        let data = self.loaded_mut()?;
        assign(
            &mut data.description,
            description.into(),
            &mut data.changes,
            ServiceField::Description,
        );
        Ok(())
    }

    pub fn set_views(&mut self, views: impl IntoIterator<Item = i32>) -> Result<(), DmsError> {
        let views: BTreeSet<i32> = views.into_iter().collect();
        check_views(&views)?;
        let data = self.loaded_mut()?;
        assign(&mut data.views, views, &mut data.changes, ServiceField::Views);
        Ok(())
    }

    /// Replace the whole inclusion list.
    pub fn set_params(&mut self, params: ServiceParamsConfiguration) -> Result<(), DmsError> {
        let data = self.loaded_mut()?;
        assign(&mut data.params, params, &mut data.changes, ServiceField::Params);
        Ok(())
    }

    pub async fn set_property(
        &mut self,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), DmsError> {
        self.loaded()?;
        let definition = self
            .dms
            .property_definition(PropertyKind::Service, name)
            .await?;
        self.loaded_mut()?.properties.set(&definition, value)?;
        Ok(())
    }

    // ── Remote writes ────────────────────────────────────────────────

    /// Send pending changes. The snapshot is dropped either way.
    pub async fn update(&mut self) -> Result<(), DmsError> {
        let Some(data) = self.data.as_ref() else {
            return Ok(());
        };
        if !data.has_updates() {
            return Ok(());
        }
        let request = Request::UpdateService {
            agent_id: self.id.agent_id(),
            service_id: self.id.service_id(),
            update: data.build_update(),
        };
        let result = self.dms.comm().request_ack(request).await;
        self.data = None;
        result.map_err(|e| map_not_found(e, || self.not_found()))?;
        info!(service = %self.id, "service updated");
        Ok(())
    }

    pub async fn delete(&mut self) -> Result<(), DmsError> {
        self.dms
            .comm()
            .request_ack(Request::DeleteService {
                agent_id: self.id.agent_id(),
                service_id: self.id.service_id(),
            })
            .await
            .map_err(|e| map_not_found(e, || self.not_found()))?;
        self.data = None;
        info!(service = %self.id, "service deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn capacity_is_enforced() {
        let mut params = ServiceParamsConfiguration::new();
        for i in 1..=1000 {
            params
                .include_element(DmsElementId::new(400, i).unwrap())
                .unwrap();
        }
        assert!(params.is_full());
        let err = params
            .include_element(DmsElementId::new(400, 1001).unwrap())
            .unwrap_err();
        assert!(matches!(err, DmsError::Overflow { capacity: 1000 }));
        assert_eq!(params.len(), 1000);
    }

    #[test]
    fn inclusion_wire_shape() {
        let mut params = ServiceParamsConfiguration::new();
        let inclusion = params
            .include_service(DmsServiceId::new(12, 7).unwrap())
            .unwrap();
        inclusion.alias = "Uplink".into();
        inclusion.alarm_cap = Some(AlarmLevel::Minor);

        let infos = params.to_infos();
        assert_eq!(infos[0].kind, "service");
        assert_eq!(infos[0].agent_id, 12);
        assert_eq!(infos[0].id, 7);
        assert_eq!(infos[0].alarm_cap, Some(3));

        let back = ServiceParamsConfiguration::from_infos(&infos).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn unknown_inclusion_kind_is_rejected() {
        let info = ServiceInclusionInfo {
            kind: "view".into(),
            agent_id: 1,
            id: 2,
            alias: String::new(),
            is_excluded: false,
            alarm_cap: None,
        };
        assert!(ServiceInclusion::from_info(&info).is_err());
    }

    #[test]
    fn alarm_levels_are_ordered() {
        assert!(AlarmLevel::Critical > AlarmLevel::Minor);
        assert_eq!(AlarmLevel::from_code(4).unwrap(), AlarmLevel::Major);
        assert!(AlarmLevel::from_code(9).is_err());
    }
}
