//! The filter condition tree sent to the backend and the builders turning
//! search selections into it.
//!
//! ```text
//! Filter { groups }                      OR of groups
//!   └─ FilterGroup { conditions, joins } AND of conditions
//!        ├─ FilterCondition              {field: {operator: payload}}
//!        └─ joins[relation] → FilterGroup (conditions on the related entity)
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::condition::Condition;
use crate::facet::{find_facet, Facet};
use crate::selection::{SearchSelections, Selection};

/// Field name of the global free-text search input.
pub const SEARCH_FIELD: &str = "search";

/// Pseudo-field holding custom operators.
pub const CUSTOM_FIELD: &str = "custom";

/// The value attached to one key of a leaf: a known operator, or any JSON
/// a host screen chose to put there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldCondition {
    Operator(Condition),
    Raw(serde_json::Value),
}

/// One leaf of the tree. Leaves built from selections hold exactly one key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterCondition(pub BTreeMap<String, FieldCondition>);

impl FilterCondition {
    pub fn field(field: impl Into<String>, condition: Condition) -> Self {
        let mut map = BTreeMap::new();
        map.insert(field.into(), FieldCondition::Operator(condition));
        Self(map)
    }

    /// `{custom: {<operator>: payload}}`
    pub fn custom(operator: impl Into<String>, payload: serde_json::Value) -> Self {
        let mut operators = serde_json::Map::new();
        operators.insert(operator.into(), payload);
        Self::raw(CUSTOM_FIELD, serde_json::Value::Object(operators))
    }

    pub fn raw(field: impl Into<String>, value: serde_json::Value) -> Self {
        let mut map = BTreeMap::new();
        map.insert(field.into(), FieldCondition::Raw(value));
        Self(map)
    }

    pub fn get(&self, field: &str) -> Option<&FieldCondition> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldCondition)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// AND-group. Also used for join nodes, where the conditions apply to the
/// related entity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterGroup {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<FilterCondition>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub joins: BTreeMap<String, FilterGroup>,
}

impl FilterGroup {
    pub fn new(conditions: Vec<FilterCondition>) -> Self {
        Self { conditions, joins: BTreeMap::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.joins.values().all(FilterGroup::is_empty)
    }

    /// Conjunction of two groups: conditions concatenate, joins on the same
    /// relation merge recursively.
    pub fn and(&self, other: &FilterGroup) -> FilterGroup {
        let mut merged = self.clone();
        merged.conditions.extend(other.conditions.iter().cloned());
        for (relation, join) in &other.joins {
            let combined = match merged.joins.get(relation) {
                Some(existing) => existing.and(join),
                None => join.clone(),
            };
            merged.joins.insert(relation.clone(), combined);
        }
        merged
    }

    fn push_at(&mut self, path: &[&str], condition: FilterCondition) {
        match path.split_first() {
            None => self.conditions.push(condition),
            Some((relation, rest)) => self
                .joins
                .entry((*relation).to_string())
                .or_default()
                .push_at(rest, condition),
        }
    }
}

/// OR of AND-groups.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub groups: Vec<FilterGroup>,
}

impl Filter {
    pub fn new(groups: Vec<FilterGroup>) -> Self {
        Self { groups }
    }

    /// One AND-group made of `conditions`.
    pub fn single(conditions: Vec<FilterCondition>) -> Self {
        Self::new(vec![FilterGroup::new(conditions)])
    }

    /// True when the filter lets every row through: it has no groups, or
    /// one of its groups is empty and so always matches.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() || self.groups.iter().any(FilterGroup::is_empty)
    }

    /// Conjunction of two OR-trees, distributing AND over OR:
    /// `(a1 | a2) & (b1 | b2)` becomes `a1&b1 | a1&b2 | a2&b1 | a2&b2`.
    /// An unconstrained side leaves the other one unchanged.
    pub fn and(&self, other: &Filter) -> Filter {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }

        let groups = self
            .groups
            .iter()
            .flat_map(|l| other.groups.iter().map(move |r| l.and(r)))
            .collect();
        Filter::new(groups)
    }
}

/// Leaf for a selection that already went through its facet.
fn selection_condition(selection: &Selection) -> (Vec<&str>, FilterCondition) {
    let mut path: Vec<&str> = selection.field.split('.').collect();
    let field = path.pop().unwrap_or_default();
    let condition = match &selection.condition {
        Condition::Custom(payload) => FilterCondition::custom(field, payload.clone()),
        other => FilterCondition::field(field, other.clone()),
    };
    (path, condition)
}

fn free_search_condition(selection: &Selection) -> Option<FilterCondition> {
    if selection.field != SEARCH_FIELD {
        return None;
    }
    match &selection.condition {
        Condition::Like(op) => Some(FilterCondition::custom(SEARCH_FIELD, json!({ "value": op.value }))),
        _ => None,
    }
}

/// Builds the AND-group for one group of selections, in order.
///
/// Each selection goes through its facet (flag condition, transform). A
/// selection without a facet is dropped, except the free-text search.
pub fn conditions_for_group(facets: &[Facet], selections: &[Selection]) -> FilterGroup {
    let mut group = FilterGroup::default();
    for selection in selections {
        match find_facet(facets, selection) {
            Some(facet) => {
                let prepared = facet.prepare(selection.clone());
                let (path, condition) = selection_condition(&prepared);
                group.push_at(&path, condition);
            }
            None => match free_search_condition(selection) {
                Some(condition) => group.conditions.push(condition),
                None => warn!(field = %selection.field, "dropping selection without a matching facet"),
            },
        }
    }
    group
}

/// Builds the filter for all OR-groups. Returns `None` when nothing
/// constrains the query, so the key can be omitted instead of sending an
/// empty `groups` list.
pub fn filter_for_selections(facets: &[Facet], selections: &SearchSelections) -> Option<Filter> {
    let groups: Vec<FilterGroup> = selections
        .groups()
        .iter()
        .map(|group| conditions_for_group(facets, group))
        .filter(|group| !group.is_empty())
        .collect();

    if groups.is_empty() {
        None
    } else {
        Some(Filter::new(groups))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facet::wrap_like;
    use pretty_assertions::assert_eq;

    fn facets() -> Vec<Facet> {
        vec![
            Facet::dropdown("Name", "name", "text").with_transform(wrap_like),
            Facet::dropdown("Status", "status", "select"),
            Facet::dropdown("Artist", "artist.name", "text"),
            Facet::flag("Visible", "isVisible", Condition::equal(true)),
            Facet::dropdown("Tags", "tags", "custom"),
        ]
    }

    #[test]
    fn test_group_preserves_order_and_applies_transform() {
        let group = conditions_for_group(
            &facets(),
            &[
                Selection::new("status", Condition::is_in(["new", "open"])),
                Selection::new("name", Condition::like("foo")),
            ],
        );
        assert_eq!(
            serde_json::to_value(&group).unwrap(),
            json!({"conditions": [
                {"status": {"in": {"values": ["new", "open"]}}},
                {"name": {"like": {"value": "%foo%"}}},
            ]})
        );
    }

    #[test]
    fn test_unknown_field_is_dropped() {
        let group = conditions_for_group(
            &facets(),
            &[Selection::new("nope", Condition::equal(1)), Selection::new("status", Condition::null())],
        );
        assert_eq!(group, FilterGroup::new(vec![FilterCondition::field("status", Condition::null())]));
    }

    #[test]
    fn test_free_search_becomes_custom_search() {
        let group = conditions_for_group(&facets(), &[Selection::new("search", Condition::like("asdf"))]);
        assert_eq!(
            serde_json::to_value(&group).unwrap(),
            json!({"conditions": [{"custom": {"search": {"value": "asdf"}}}]})
        );
    }

    #[test]
    fn test_dotted_field_builds_join() {
        let group = conditions_for_group(&facets(), &[Selection::new("artist.name", Condition::like("bob"))]);
        assert_eq!(
            serde_json::to_value(&group).unwrap(),
            json!({"joins": {"artist": {"conditions": [{"name": {"like": {"value": "bob"}}}]}}})
        );
    }

    #[test]
    fn test_flag_and_custom_facets() {
        let group = conditions_for_group(
            &facets(),
            &[
                Selection::new("isVisible", Condition::empty()),
                Selection::new("tags", Condition::custom(json!({"values": [1, 2]}))),
            ],
        );
        assert_eq!(
            serde_json::to_value(&group).unwrap(),
            json!({"conditions": [
                {"isVisible": {"equal": {"value": true}}},
                {"custom": {"tags": {"values": [1, 2]}}},
            ]})
        );
    }

    #[test]
    fn test_empty_selections_yield_absent_filter() {
        assert_eq!(filter_for_selections(&facets(), &SearchSelections::default()), None);

        let only_unknown = SearchSelections::single(vec![Selection::new("nope", Condition::null())]);
        assert_eq!(filter_for_selections(&facets(), &only_unknown), None);
    }

    #[test]
    fn test_groups_become_or_groups() {
        let selections = SearchSelections::new(vec![
            vec![Selection::new("status", Condition::equal("a"))],
            vec![],
            vec![Selection::new("status", Condition::equal("b"))],
        ]);
        let filter = filter_for_selections(&facets(), &selections).unwrap();
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({"groups": [
                {"conditions": [{"status": {"equal": {"value": "a"}}}]},
                {"conditions": [{"status": {"equal": {"value": "b"}}}]},
            ]})
        );
    }

    #[test]
    fn test_and_distributes_over_groups() {
        let a = FilterCondition::raw("a", json!(true));
        let b = FilterCondition::raw("b", json!(true));
        let c = FilterCondition::raw("c", json!(true));
        let left = Filter::new(vec![FilterGroup::new(vec![a.clone()]), FilterGroup::new(vec![b.clone()])]);
        let right = Filter::single(vec![c.clone()]);

        assert_eq!(
            left.and(&right),
            Filter::new(vec![
                FilterGroup::new(vec![a.clone(), c.clone()]),
                FilterGroup::new(vec![b.clone(), c.clone()]),
            ])
        );
        assert_eq!(Filter::default().and(&right), right);
        assert_eq!(right.and(&Filter::new(vec![FilterGroup::default()])), right);
    }

    #[test]
    fn test_empty_group_matches_everything() {
        let a = FilterCondition::raw("a", json!(true));
        let a_or_anything = Filter::new(vec![FilterGroup::new(vec![a.clone()]), FilterGroup::default()]);
        assert!(a_or_anything.is_empty());
        assert!(!Filter::single(vec![a.clone()]).is_empty());

        let c = Filter::single(vec![FilterCondition::raw("c", json!(true))]);
        assert_eq!(a_or_anything.and(&c), c);
    }

    #[test]
    fn test_joins_merge_on_and() {
        let mut left = FilterGroup::default();
        left.push_at(&["artist"], FilterCondition::raw("name", json!("x")));
        let mut right = FilterGroup::default();
        right.push_at(&["artist"], FilterCondition::raw("age", json!(3)));

        let merged = left.and(&right);
        assert_eq!(merged.joins["artist"].conditions.len(), 2);
    }

    #[test]
    fn test_raw_leaves_round_trip_through_json() {
        let filter: Filter = serde_json::from_value(json!({"groups": [{"conditions": [
            {"field1": true},
            {"parent": {"empty": {}}},
            {"custom": {"search": {"value": "qwer"}}},
        ]}]}))
        .unwrap();

        let conditions = &filter.groups[0].conditions;
        assert_eq!(conditions[0].get("field1"), Some(&FieldCondition::Raw(json!(true))));
        assert_eq!(conditions[1], FilterCondition::field("parent", Condition::empty()));
        assert_eq!(conditions[2], FilterCondition::custom("search", json!({"value": "qwer"})));
    }
}
