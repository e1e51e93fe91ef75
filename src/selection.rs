//! The UI-side selection model: OR-groups of AND-ed facet choices.

use serde::{Deserialize, Serialize};

use crate::condition::Condition;

/// One concrete facet choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub field: String,
    /// Facet alias, set when several facets share `field`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub condition: Condition,
}

impl Selection {
    pub fn new(field: impl Into<String>, condition: Condition) -> Self {
        Self { field: field.into(), name: None, condition }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Selections AND-ed together.
pub type GroupSelections = Vec<Selection>;

/// OR-groups of selections. Never holds zero groups: `[[]]` means "no filter".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<GroupSelections>", into = "Vec<GroupSelections>")]
pub struct SearchSelections(Vec<GroupSelections>);

impl Default for SearchSelections {
    fn default() -> Self {
        Self(vec![Vec::new()])
    }
}

impl From<Vec<GroupSelections>> for SearchSelections {
    fn from(groups: Vec<GroupSelections>) -> Self {
        Self::new(groups)
    }
}

impl From<SearchSelections> for Vec<GroupSelections> {
    fn from(selections: SearchSelections) -> Self {
        selections.0
    }
}

impl SearchSelections {
    /// Wraps `groups`, substituting `[[]]` when there is no first group.
    pub fn new(groups: Vec<GroupSelections>) -> Self {
        if groups.is_empty() {
            Self::default()
        } else {
            Self(groups)
        }
    }

    /// A single AND-group.
    pub fn single(group: GroupSelections) -> Self {
        Self(vec![group])
    }

    pub fn groups(&self) -> &[GroupSelections] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no group holds a selection.
    pub fn is_empty(&self) -> bool {
        !self.is_active()
    }

    /// True when at least one group holds a selection.
    pub fn is_active(&self) -> bool {
        self.0.iter().any(|group| !group.is_empty())
    }

    /// Replaces the content of the group at `index`. Out of range indices are ignored.
    pub fn update_group(&mut self, index: usize, group: GroupSelections) {
        if let Some(slot) = self.0.get_mut(index) {
            *slot = group;
        }
    }

    pub fn add_group(&mut self) {
        self.0.push(Vec::new());
    }

    /// Removes the group at `index`; later groups shift down. Removing the
    /// last remaining group leaves `[[]]`.
    pub fn remove_group(&mut self, index: usize) {
        if index < self.0.len() {
            self.0.remove(index);
        }
        if self.0.is_empty() {
            self.0.push(Vec::new());
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
