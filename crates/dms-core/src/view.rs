// ── Views ──
//
// Views form a tree rooted at view -1. Elements and services belong to one
// or more views. `DmsView` follows the same load/update model as elements:
// edits are local until `update()` sends the changed fields.

use std::fmt;

use dms_api::messages::{PropertyKind, ViewInfo, ViewUpdate};
use dms_api::{CommunicationExt, Request};
use tracing::{debug, info};

use crate::dms::Dms;
use crate::element::DmsElement;
use crate::error::{DmsError, map_not_found};
use crate::id::DmsElementId;
use crate::naming::validate_view_name;
use crate::property::PropertyCollection;
use crate::tracked::{ChangeSet, assign};

/// Id of the root of the view tree.
pub const ROOT_VIEW_ID: i32 = -1;

fn check_view_id(name: &str, view_id: i32) -> Result<(), DmsError> {
    if view_id < ROOT_VIEW_ID {
        return Err(DmsError::out_of_range(
            name,
            format!("{view_id} is not a valid view id"),
        ));
    }
    Ok(())
}

/// Name and parent of a view to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewConfiguration {
    name: String,
    parent_id: i32,
}

impl ViewConfiguration {
    /// A view directly under the root.
    pub fn new(name: &str) -> Result<Self, DmsError> {
        Ok(Self {
            name: validate_view_name(name, false)?,
            parent_id: ROOT_VIEW_ID,
        })
    }

    pub fn with_parent(mut self, parent_id: i32) -> Result<Self, DmsError> {
        check_view_id("parentId", parent_id)?;
        self.parent_id = parent_id;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_id(&self) -> i32 {
        self.parent_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ViewField {
    Name,
    Parent,
}

#[derive(Debug, Clone)]
struct ViewData {
    name: String,
    parent_id: Option<i32>,
    path: String,
    child_ids: Vec<i32>,
    elements: Vec<DmsElementId>,
    properties: PropertyCollection,
    changes: ChangeSet<ViewField>,
}

impl ViewData {
    fn from_info(info: ViewInfo) -> Result<Self, DmsError> {
        if info.parent_id.is_none() && info.id != ROOT_VIEW_ID {
            return Err(DmsError::incorrect(format!(
                "view {} has no parent; only the root view may omit it",
                info.id
            )));
        }
        let elements = info
            .elements
            .into_iter()
            .map(DmsElementId::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            properties: PropertyCollection::from_values(&info.properties, &info.name),
            name: info.name,
            parent_id: info.parent_id,
            path: info.path,
            child_ids: info.child_ids,
            elements,
            changes: ChangeSet::new(),
        })
    }

    fn has_updates(&self) -> bool {
        self.changes.any() || self.properties.has_updates()
    }

    fn build_update(&self) -> ViewUpdate {
        let mut update = ViewUpdate::default();
        for field in self.changes.iter() {
            match field {
                ViewField::Name => update.name = Some(self.name.clone()),
                ViewField::Parent => update.parent_id = self.parent_id,
            }
        }
        if self.properties.has_updates() {
            update.properties = self.properties.changed_values();
        }
        update
    }
}

/// Handle to one view.
#[derive(Clone)]
pub struct DmsView {
    dms: Dms,
    id: i32,
    data: Option<ViewData>,
}

impl fmt::Debug for DmsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmsView")
            .field("id", &self.id)
            .field("loaded", &self.data.is_some())
            .finish_non_exhaustive()
    }
}

impl DmsView {
    pub(crate) fn new(dms: Dms, id: i32) -> Self {
        Self {
            dms,
            id,
            data: None,
        }
    }

    pub(crate) fn from_info(dms: Dms, info: ViewInfo) -> Result<Self, DmsError> {
        let id = info.id;
        Ok(Self {
            dms,
            id,
            data: Some(ViewData::from_info(info)?),
        })
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_VIEW_ID
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    fn not_found(&self) -> DmsError {
        DmsError::ViewNotFound {
            identifier: self.id.to_string(),
        }
    }

    fn request(&self) -> Request {
        Request::GetViewInfo { view_id: self.id }
    }

    fn loaded(&self) -> Result<&ViewData, DmsError> {
        self.data.as_ref().ok_or_else(|| DmsError::NotLoaded {
            entity: "View",
            identifier: self.id.to_string(),
        })
    }

    fn loaded_mut(&mut self) -> Result<&mut ViewData, DmsError> {
        let identifier = self.id.to_string();
        self.data.as_mut().ok_or(DmsError::NotLoaded {
            entity: "View",
            identifier,
        })
    }

    pub async fn exists(&self) -> Result<bool, DmsError> {
        self.dms.probe(self.request()).await
    }

    pub async fn load(&mut self) -> Result<(), DmsError> {
        self.data = None;
        debug!(view_id = self.id, "loading view");
        let info: ViewInfo = self.dms.fetch(self.request(), || self.not_found()).await?;
        self.data = Some(ViewData::from_info(info)?);
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

    /// `None` for the root view.
    pub fn parent_id(&self) -> Result<Option<i32>, DmsError> {
        Ok(self.loaded()?.parent_id)
    }

    /// Slash-separated path from the root.
    pub fn path(&self) -> Result<&str, DmsError> {
        Ok(&self.loaded()?.path)
    }

    pub fn child_view_ids(&self) -> Result<&[i32], DmsError> {
        Ok(&self.loaded()?.child_ids)
    }

    pub fn element_ids(&self) -> Result<&[DmsElementId], DmsError> {
        Ok(&self.loaded()?.elements)
    }

    pub fn properties(&self) -> Result<&PropertyCollection, DmsError> {
        Ok(&self.loaded()?.properties)
    }

    pub fn has_pending_changes(&self) -> bool {
        self.data.as_ref().is_some_and(ViewData::has_updates)
    }

    /// Unloaded handles for the direct children.
    pub fn child_views(&self) -> Result<Vec<DmsView>, DmsError> {
        Ok(self
            .child_view_ids()?
            .iter()
            .map(|&id| self.dms.view(id))
            .collect())
    }

    pub fn parent_view(&self) -> Result<Option<DmsView>, DmsError> {
        Ok(self.parent_id()?.map(|id| self.dms.view(id)))
    }

    /// Unloaded handles for the elements in this view.
    pub fn elements(&self) -> Result<Vec<DmsElement>, DmsError> {
        Ok(self
            .element_ids()?
            .iter()
            .map(|&id| self.dms.element(id))
            .collect())
    }

    // ── Local writes ─────────────────────────────────────────────────

    pub fn set_name(&mut self, name: &str) -> Result<(), DmsError> {
        let name = validate_view_name(name, self.is_root())?;
        let data = self.loaded_mut()?;
        assign(&mut data.name, name, &mut data.changes, ViewField::Name);
        Ok(())
    }

    /// Move the view under `parent_id`. The root cannot move and a view
    /// cannot be its own parent.
    pub fn set_parent(&mut self, parent_id: i32) -> Result<(), DmsError> {
        if self.is_root() {
            return Err(DmsError::invalid("parentId", "the root view has no parent"));
        }
        check_view_id("parentId", parent_id)?;
        if parent_id == self.id {
            return Err(DmsError::invalid("parentId", "a view cannot be its own parent"));
        }
        let data = self.loaded_mut()?;
        assign(
            &mut data.parent_id,
            Some(parent_id),
            &mut data.changes,
            ViewField::Parent,
        );
        Ok(())
    }

    pub async fn set_property(
        &mut self,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), DmsError> {
        self.loaded()?;
        let definition = self.dms.property_definition(PropertyKind::View, name).await?;
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
        let request = Request::UpdateView {
            view_id: self.id,
            update: data.build_update(),
        };
        let result = self.dms.comm().request_ack(request).await;
        self.data = None;
        result.map_err(|e| map_not_found(e, || self.not_found()))?;
        info!(view_id = self.id, "view updated");
        Ok(())
    }

    /// Delete the view. The root view cannot be deleted.
    pub async fn delete(&mut self) -> Result<(), DmsError> {
        if self.is_root() {
            return Err(DmsError::invalid("viewId", "the root view cannot be deleted"));
        }
        self.dms
            .comm()
            .request_ack(Request::DeleteView { view_id: self.id })
            .await
            .map_err(|e| map_not_found(e, || self.not_found()))?;
        self.data = None;
        info!(view_id = self.id, "view deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn configuration_defaults_to_root_parent() {
        let config = ViewConfiguration::new(" Studios ").unwrap();
        assert_eq!(config.name(), "Studios");
        assert_eq!(config.parent_id(), ROOT_VIEW_ID);
    }

    #[test]
    fn configuration_rejects_pipe_and_bad_parent() {
        assert!(ViewConfiguration::new("A|B").is_err());
        assert!(ViewConfiguration::new("").is_err());
        assert!(ViewConfiguration::new("A").unwrap().with_parent(-2).is_err());
    }

    #[test]
    fn update_carries_only_changed_fields() {
        let mut data = ViewData::from_info(ViewInfo {
            id: 12,
            name: "Studios".into(),
            parent_id: Some(-1),
            ..ViewInfo::default()
        })
        .unwrap();
        data.name = "Studio A".into();
        data.changes.mark(ViewField::Name);
        let update = data.build_update();
        assert_eq!(update.name.as_deref(), Some("Studio A"));
        assert_eq!(update.parent_id, None);
    }

    #[test]
    fn only_the_root_may_lack_a_parent() {
        let orphan = ViewInfo {
            id: 12,
            name: "Studios".into(),
            parent_id: None,
            ..ViewInfo::default()
        };
        assert!(matches!(
            ViewData::from_info(orphan),
            Err(DmsError::IncorrectData { .. })
        ));

        let root = ViewInfo {
            id: ROOT_VIEW_ID,
            name: "Root".into(),
            parent_id: None,
            ..ViewInfo::default()
        };
        assert_eq!(ViewData::from_info(root).unwrap().parent_id, None);
    }
}
