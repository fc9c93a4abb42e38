// ── Change tracking ──
//
// Every mutable settings aggregate carries a `ChangeSet` of field markers.
// Setters compare-then-mark through `assign`: writing the current value is
// a no-op, writing a new value marks the field exactly once. `update()`
// turns the marked fields into one minimal outbound message.

use std::hash::Hash;

use indexmap::IndexSet;

/// Set of changed-field markers, in first-marked order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet<F: Hash + Eq> {
    fields: IndexSet<F>,
}

impl<F: Hash + Eq> Default for ChangeSet<F> {
    fn default() -> Self {
        Self {
            fields: IndexSet::new(),
        }
    }
}

impl<F: Hash + Eq> ChangeSet<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a field changed. Marking twice keeps one entry.
    pub fn mark(&mut self, field: F) {
        self.fields.insert(field);
    }

    pub fn contains(&self, field: &F) -> bool {
        self.fields.contains(field)
    }

    /// `true` when at least one field is marked.
    pub fn any(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &F> {
        self.fields.iter()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }
}

/// Store `value` into `slot`, marking `field` only when the value changed.
///
/// Returns whether a change was recorded.
pub(crate) fn assign<T: PartialEq, F: Hash + Eq>(
    slot: &mut T,
    value: T,
    changes: &mut ChangeSet<F>,
    field: F,
) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    changes.mark(field);
    true
}

/// A cohesive group of fields loaded from one response and written back
/// through one update message.
pub trait SettingsGroup {
    /// Raw record the group is populated from.
    type Source;
    /// Outgoing message the group writes its changed fields into.
    type Target;

    /// Populate every field from `source`. Leaves the change set alone.
    fn load(&mut self, source: &Self::Source);

    /// Copy each changed field into its slot of `target`.
    fn fill_update(&self, target: &mut Self::Target);

    /// `true` when at least one field changed since the last load or update.
    fn has_updates(&self) -> bool;
}
