//! QueryVariablesManager: a registry of named partial query variables,
//! merged on every write and republished to observers.
//!
//! ## Merge rules
//!
//! Fragments are visited in priority order, lowest first: names missing from
//! the priority list (sorted by name), then the listed names in list order.
//!
//! 1. `pagination` and `sorting`: the highest-priority fragment that sets
//!    the key wins.
//! 2. `filter`: every fragment's filter is AND-ed onto the accumulated one.
//!    The `navigation` fragment is skipped while the `search` fragment
//!    carries a filter.
//! 3. Keys nobody sets stay absent; an empty filter is omitted.

use std::collections::BTreeMap;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{QueryError, Result};
use crate::filter::Filter;
use crate::query_variables::QueryVariables;

pub const DEFAULT_FRAGMENT: &str = "default";
pub const CONTEXTUAL_FRAGMENT: &str = "contextual";
pub const NAVIGATION_FRAGMENT: &str = "navigation";
pub const SEARCH_FRAGMENT: &str = "search";
pub const PERSISTED_FRAGMENT: &str = "persisted";

/// Lowest to highest priority.
pub fn default_priority() -> Vec<String> {
    [
        DEFAULT_FRAGMENT,
        CONTEXTUAL_FRAGMENT,
        NAVIGATION_FRAGMENT,
        SEARCH_FRAGMENT,
        PERSISTED_FRAGMENT,
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}

type Callback = Box<dyn FnMut(&QueryVariables) + Send>;

struct Observer {
    lifetime: CancellationToken,
    callback: Callback,
}

pub struct QueryVariablesManager {
    fragments: BTreeMap<String, Option<QueryVariables>>,
    priority: Vec<String>,
    current: QueryVariables,
    observers: Vec<Observer>,
}

impl Default for QueryVariablesManager {
    fn default() -> Self {
        Self::new(default_priority())
    }
}

impl QueryVariablesManager {
    pub fn new(priority: Vec<String>) -> Self {
        Self {
            fragments: BTreeMap::new(),
            priority,
            current: QueryVariables::default(),
            observers: Vec::new(),
        }
    }

    /// The merged value as of the last write.
    pub fn variables(&self) -> &QueryVariables {
        &self.current
    }

    pub fn get(&self, name: &str) -> Option<&QueryVariables> {
        self.fragments.get(name).and_then(Option::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fragments.contains_key(name)
    }

    /// Inserts or overwrites the fragment `name`. `None` keeps the key but
    /// contributes nothing.
    pub fn set(&mut self, name: &str, value: Option<QueryVariables>) {
        debug!(fragment = name, present = value.is_some(), "set query variables fragment");
        self.fragments.insert(name.to_string(), value);
        self.publish();
    }

    /// Validates a JSON fragment before storing it. A wrong shape is a bug
    /// in the producer and is reported as [`QueryError::InvalidFragment`].
    pub fn set_json(&mut self, name: &str, value: serde_json::Value) -> Result<()> {
        let value = if value.is_null() {
            None
        } else {
            let variables = serde_json::from_value(value).map_err(|source| QueryError::InvalidFragment {
                name: name.to_string(),
                source,
            })?;
            Some(variables)
        };
        self.set(name, value);
        Ok(())
    }

    /// Overlays the keys of `value` onto the existing fragment.
    pub fn merge(&mut self, name: &str, value: QueryVariables) {
        let mut fragment = self.get(name).cloned().unwrap_or_default();
        fragment.overlay(value);
        self.set(name, Some(fragment));
    }

    /// Fills only the keys the existing fragment lacks.
    pub fn defaults(&mut self, name: &str, value: QueryVariables) {
        let mut fragment = self.get(name).cloned().unwrap_or_default();
        fragment.fill_missing(value);
        self.set(name, Some(fragment));
    }

    /// Registers `observer` until `lifetime` is cancelled. The observer is
    /// called with the current value right away, then after every change.
    pub fn subscribe<F>(&mut self, lifetime: &CancellationToken, mut observer: F)
    where
        F: FnMut(&QueryVariables) + Send + 'static,
    {
        if lifetime.is_cancelled() {
            return;
        }
        observer(&self.current);
        self.observers.push(Observer {
            lifetime: lifetime.clone(),
            callback: Box::new(observer),
        });
    }

    pub fn observer_count(&self) -> usize {
        self.observers.iter().filter(|o| !o.lifetime.is_cancelled()).count()
    }

    /// Releases every fragment and observer.
    pub fn teardown(&mut self) {
        self.fragments.clear();
        self.observers.clear();
        self.current = QueryVariables::default();
    }

    fn publish(&mut self) {
        let merged = merge_fragments(&self.fragments, &self.priority);
        if merged == self.current {
            return;
        }
        self.current = merged;
        debug!(variables = ?self.current, "query variables changed");

        self.observers.retain(|o| !o.lifetime.is_cancelled());
        for observer in &mut self.observers {
            (observer.callback)(&self.current);
        }
    }
}

fn search_is_active(fragments: &BTreeMap<String, Option<QueryVariables>>) -> bool {
    fragments
        .get(SEARCH_FRAGMENT)
        .and_then(Option::as_ref)
        .and_then(|fragment| fragment.filter.as_ref())
        .is_some_and(|filter| !filter.is_empty())
}

/// Merged variables of `fragments`. Pure; see the module docs for the rules.
pub fn merge_fragments(
    fragments: &BTreeMap<String, Option<QueryVariables>>,
    priority: &[String],
) -> QueryVariables {
    let rank = |name: &str| {
        priority
            .iter()
            .position(|p| p == name)
            .map_or(0, |index| index + 1)
    };
    let mut ordered: Vec<(&String, &QueryVariables)> = fragments
        .iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (name, v)))
        .collect();
    // Stable: equal ranks keep the map's name order.
    ordered.sort_by_key(|(name, _)| rank(name.as_str()));

    let skip_navigation = search_is_active(fragments);
    let mut merged = QueryVariables::default();
    let mut filter: Option<Filter> = None;

    for (name, fragment) in ordered {
        if fragment.pagination.is_some() {
            merged.pagination = fragment.pagination;
        }
        if fragment.sorting.is_some() {
            merged.sorting = fragment.sorting.clone();
        }
        if let Some(contribution) = &fragment.filter {
            if name == NAVIGATION_FRAGMENT && skip_navigation {
                continue;
            }
            filter = Some(match filter {
                Some(acc) => acc.and(contribution),
                None => Filter::default().and(contribution),
            });
        }
    }

    merged.filter = filter.filter(|f| !f.is_empty());
    merged
}
