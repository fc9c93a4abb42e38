// ── Properties ──
//
// A property *definition* is system-wide schema (name, constraints, flags)
// fetched once per `Dms` root and kind. A property *instance* is a value
// bound to one element, view or service. Names match case-insensitively.

use std::sync::Arc;

use dms_api::messages::{PropertyConfig, PropertyKind, PropertyValueInfo};
use indexmap::IndexMap;
use tracing::warn;

use crate::error::DmsError;
use crate::tracked::ChangeSet;

fn key(name: &str) -> String {
    name.to_lowercase()
}

// ── Definitions ─────────────────────────────────────────────────────

/// System-wide definition of one element, view or service property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDefinition {
    pub id: i32,
    pub name: String,
    pub kind: PropertyKind,
    /// Pattern text as configured on the system. Informational only:
    /// `check_value` does not match against it, and a value that violates
    /// it is rejected by the agent when the update is sent.
    pub regex: String,
    pub is_read_only: bool,
    /// Allowed values. Empty means free text.
    pub discrete_entries: Vec<String>,
    pub is_filter_enabled: bool,
    pub is_visible_in_surveyor: bool,
}

impl PropertyDefinition {
    pub(crate) fn from_config(kind: PropertyKind, config: PropertyConfig) -> Self {
        Self {
            id: config.id,
            name: config.name,
            kind,
            regex: config.regex,
            is_read_only: config.is_read_only,
            discrete_entries: config.entries,
            is_filter_enabled: config.is_filter_enabled,
            is_visible_in_surveyor: config.is_visible_in_surveyor,
        }
    }

    pub fn is_discrete(&self) -> bool {
        !self.discrete_entries.is_empty()
    }

    /// Check that `value` may be written to an instance of this definition:
    /// the definition must be writable and, when discrete, list `value`.
    pub fn check_value(&self, value: &str) -> Result<(), DmsError> {
        if self.is_read_only {
            return Err(DmsError::invalid(
                self.name.clone(),
                "property is read-only",
            ));
        }
        if self.is_discrete() && !self.discrete_entries.iter().any(|e| e == value) {
            return Err(DmsError::invalid(
                self.name.clone(),
                format!(
                    "'{value}' is not one of the allowed values: {}",
                    self.discrete_entries.join(", ")
                ),
            ));
        }
        Ok(())
    }
}

/// All definitions of one kind, keyed case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct PropertyDefinitions {
    by_name: IndexMap<String, Arc<PropertyDefinition>>,
}

impl PropertyDefinitions {
    pub(crate) fn from_configs(kind: PropertyKind, configs: Vec<PropertyConfig>) -> Self {
        let mut by_name = IndexMap::with_capacity(configs.len());
        for config in configs {
            let k = key(&config.name);
            if by_name.contains_key(&k) {
                warn!(name = %config.name, ?kind, "duplicate property definition, keeping the first");
                continue;
            }
            by_name.insert(k, Arc::new(PropertyDefinition::from_config(kind, config)));
        }
        Self { by_name }
    }

    /// Look a definition up by name; unknown names are out of range.
    pub fn get(&self, name: &str) -> Result<&Arc<PropertyDefinition>, DmsError> {
        self.by_name.get(&key(name)).ok_or_else(|| {
            DmsError::out_of_range("name", format!("no property named '{name}' is defined"))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(&key(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PropertyDefinition>> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

// ── Instances ───────────────────────────────────────────────────────

/// A property value bound to one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmsProperty {
    pub name: String,
    pub value: String,
}

/// The property instances of one element, view or service, with change
/// tracking for writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyCollection {
    entries: IndexMap<String, DmsProperty>,
    changes: ChangeSet<String>,
}

impl PropertyCollection {
    /// Build from a raw response. Duplicate names keep the first value.
    pub(crate) fn from_values(values: &[PropertyValueInfo], owner: &str) -> Self {
        let mut entries = IndexMap::with_capacity(values.len());
        for v in values {
            let k = key(&v.name);
            if entries.contains_key(&k) {
                warn!(owner, name = %v.name, "duplicate property in response, keeping the first");
                continue;
            }
            entries.insert(
                k,
                DmsProperty {
                    name: v.name.clone(),
                    value: v.value.clone(),
                },
            );
        }
        Self {
            entries,
            changes: ChangeSet::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&DmsProperty> {
        self.entries.get(&key(name))
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(|p| p.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DmsProperty> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write a value after checking it against its definition. A property
    /// defined on the system but absent from this object is added.
    pub(crate) fn set(
        &mut self,
        definition: &PropertyDefinition,
        value: impl Into<String>,
    ) -> Result<bool, DmsError> {
        let value = value.into();
        definition.check_value(&value)?;

        let k = key(&definition.name);
        match self.entries.get_mut(&k) {
            Some(existing) if existing.value == value => Ok(false),
            Some(existing) => {
                existing.value = value;
                self.changes.mark(k);
                Ok(true)
            }
            None => {
                self.entries.insert(
                    k.clone(),
                    DmsProperty {
                        name: definition.name.clone(),
                        value,
                    },
                );
                self.changes.mark(k);
                Ok(true)
            }
        }
    }

    pub fn has_updates(&self) -> bool {
        self.changes.any()
    }

    /// The changed `name = value` pairs, in change order.
    pub(crate) fn changed_values(&self) -> Vec<PropertyValueInfo> {
        self.changes
            .iter()
            .filter_map(|k| self.entries.get(k))
            .map(|p| PropertyValueInfo {
                name: p.name.clone(),
                value: p.value.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(id: i32, name: &str) -> PropertyConfig {
        PropertyConfig {
            id,
            name: name.into(),
            ..PropertyConfig::default()
        }
    }

    fn pair(name: &str, value: &str) -> PropertyValueInfo {
        PropertyValueInfo {
            name: name.into(),
            value: value.into(),
        }
    }

    #[test]
    fn definition_lookup_is_case_insensitive() {
        let defs = PropertyDefinitions::from_configs(
            PropertyKind::Element,
            vec![config(1, "Location"), config(2, "Owner")],
        );
        assert_eq!(defs.get("location").unwrap().id, 1);
        assert_eq!(defs.get("OWNER").unwrap().id, 2);
        assert!(matches!(defs.get("Rack"), Err(DmsError::OutOfRange { .. })));
        assert!(!defs.contains("Rack"));
    }

    #[test]
    fn duplicate_definitions_keep_first() {
        let defs = PropertyDefinitions::from_configs(
            PropertyKind::View,
            vec![config(1, "Location"), config(9, "location")],
        );
        assert_eq!(defs.len(), 1);
        assert_eq!(defs.get("Location").unwrap().id, 1);
    }

    #[test]
    fn duplicate_instances_keep_first() {
        let props = PropertyCollection::from_values(
            &[pair("Location", "Brussels"), pair("LOCATION", "Ghent")],
            "400/201",
        );
        assert_eq!(props.len(), 1);
        assert_eq!(props.value("location"), Some("Brussels"));
    }

    #[test]
    fn set_same_value_is_not_a_change() {
        let def = PropertyDefinition::from_config(PropertyKind::Element, config(1, "Location"));
        let mut props = PropertyCollection::from_values(&[pair("Location", "Brussels")], "x");
        assert!(!props.set(&def, "Brussels").unwrap());
        assert!(!props.has_updates());

        assert!(props.set(&def, "Ghent").unwrap());
        assert_eq!(props.changed_values(), vec![pair("Location", "Ghent")]);
    }

    #[test]
    fn read_only_and_discrete_rules() {
        let mut ro = config(1, "Serial");
        ro.is_read_only = true;
        let ro = PropertyDefinition::from_config(PropertyKind::Element, ro);

        let mut discrete = config(2, "Tier");
        discrete.entries = vec!["Gold".into(), "Silver".into()];
        let discrete = PropertyDefinition::from_config(PropertyKind::Element, discrete);

        let mut props = PropertyCollection::default();
        assert!(props.set(&ro, "X1").is_err());
        assert!(props.set(&discrete, "Bronze").is_err());
        assert!(props.set(&discrete, "Gold").unwrap());
        assert_eq!(props.value("tier"), Some("Gold"));
    }

    #[test]
    fn pattern_is_carried_but_left_to_the_agent() {
        let mut zip = config(3, "Zip");
        zip.regex = "^[0-9]{4}$".into();
        let zip = PropertyDefinition::from_config(PropertyKind::Element, zip);
        assert_eq!(zip.regex, "^[0-9]{4}$");

        let mut props = PropertyCollection::default();
        assert!(zip.check_value("not-a-zip").is_ok());
        assert!(props.set(&zip, "not-a-zip").unwrap());
        assert_eq!(props.changed_values(), vec![pair("Zip", "not-a-zip")]);
    }
}
