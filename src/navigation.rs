//! Hierarchical drill-down: the navigation filter fragment, breadcrumbs and
//! child links, plus the per-row "has children" lookups.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::condition::Condition;
use crate::error::{QueryError, Result};
use crate::filter::{Filter, FilterCondition};
use crate::manager::QueryVariablesManager;
use crate::query_variables::QueryVariables;
use crate::route::RouteState;
use crate::url_codec::ANCESTOR_PARAM;

/// An item as returned by the backend, with its ancestor nested under the
/// relation name (`{"id": "3", "name": "c", "parent": {"id": "2", ...}}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreadcrumbItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub relations: serde_json::Map<String, Value>,
}

impl BreadcrumbItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            relations: serde_json::Map::new(),
        }
    }

    pub fn with_ancestor(mut self, relation: &str, ancestor: BreadcrumbItem) -> Self {
        let value = serde_json::to_value(ancestor).unwrap_or(Value::Null);
        self.relations.insert(relation.to_string(), value);
        self
    }

    /// The item under `relation`; absent, null or unreadable means none.
    pub fn ancestor(&self, relation: &str) -> Option<BreadcrumbItem> {
        match self.relations.get(relation)? {
            Value::Null => None,
            value => match serde_json::from_value(value.clone()) {
                Ok(item) => Some(item),
                Err(err) => {
                    warn!(item = %self.id, relation, error = %err, "unreadable ancestor");
                    None
                }
            },
        }
    }
}

pub trait Identifiable {
    fn id(&self) -> &str;
}

impl Identifiable for BreadcrumbItem {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NavigableItem<T> {
    pub item: T,
    pub has_navigation: bool,
}

/// Relative navigation target: stay on the current route, replacing its
/// matrix parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NavigationTarget {
    pub params: BTreeMap<String, String>,
}

impl NavigationTarget {
    pub fn apply(&self, route: &RouteState) -> RouteState {
        let mut next = route.clone();
        if let Some(last) = next.segments.last_mut() {
            last.params = self.params.clone();
        } else {
            for (key, value) in &self.params {
                next = next.with_param(key, value);
            }
        }
        next
    }
}

/// The backend the navigable list reads items from.
#[async_trait]
pub trait ItemSource: Send + Sync {
    async fn get_one(&self, id: &str) -> Result<Option<BreadcrumbItem>>;

    async fn count(&self, variables: &QueryVariables) -> Result<u64>;
}

#[derive(Debug, Clone)]
pub struct NavigationFilterComposer {
    ancestor_relation_name: String,
    max_depth: usize,
}

impl NavigationFilterComposer {
    pub fn new(ancestor_relation_name: impl Into<String>, max_depth: usize) -> Self {
        Self {
            ancestor_relation_name: ancestor_relation_name.into(),
            max_depth: max_depth.max(1),
        }
    }

    pub fn ancestor_relation_name(&self) -> &str {
        &self.ancestor_relation_name
    }

    /// Children of `ancestor_id`, or top-level items when there is none.
    pub fn condition(&self, ancestor_id: Option<&str>) -> FilterCondition {
        let condition = match ancestor_id {
            Some(id) => Condition::have([id]),
            None => Condition::empty(),
        };
        FilterCondition::field(self.ancestor_relation_name.clone(), condition)
    }

    /// The `navigation` fragment.
    pub fn fragment(&self, ancestor_id: Option<&str>) -> QueryVariables {
        QueryVariables::with_filter(Filter::single(vec![self.condition(ancestor_id)]))
    }

    /// Root-first chain ending with `item`.
    ///
    /// Walks the ancestor relation iteratively; a repeated id or a chain
    /// longer than the configured depth is an error rather than a hang.
    pub fn breadcrumb(&self, item: &BreadcrumbItem) -> Result<Vec<BreadcrumbItem>> {
        let mut chain = vec![item.clone()];
        let mut seen = HashSet::from([item.id.clone()]);
        let mut next = item.ancestor(&self.ancestor_relation_name);

        while let Some(ancestor) = next {
            if chain.len() >= self.max_depth {
                return Err(QueryError::BreadcrumbTooDeep { max_depth: self.max_depth });
            }
            if !seen.insert(ancestor.id.clone()) {
                return Err(QueryError::AncestorCycle { id: ancestor.id });
            }
            next = ancestor.ancestor(&self.ancestor_relation_name);
            chain.push(ancestor);
        }

        chain.reverse();
        Ok(chain)
    }

    /// Link to the children of `ancestor_id`; an absent or empty id links to the root.
    pub fn child_link(&self, ancestor_id: Option<&str>) -> NavigationTarget {
        let mut params = BTreeMap::new();
        if let Some(id) = ancestor_id.filter(|id| !id.is_empty()) {
            params.insert(ANCESTOR_PARAM.to_string(), id.to_string());
        }
        NavigationTarget { params }
    }

    /// Fetches `ancestor_id` and derives its breadcrumbs. Any failure, or
    /// cancellation of `lifetime`, yields no breadcrumbs.
    pub async fn fetch_breadcrumbs<S>(&self, source: &S, ancestor_id: &str, lifetime: &CancellationToken) -> Vec<BreadcrumbItem>
    where
        S: ItemSource + ?Sized,
    {
        let fetched = tokio::select! {
            biased;
            _ = lifetime.cancelled() => return Vec::new(),
            fetched = source.get_one(ancestor_id) => fetched,
        };

        match fetched {
            Ok(Some(item)) => self.breadcrumb(&item).unwrap_or_else(|err| {
                warn!(ancestor = ancestor_id, error = %err, "cannot build breadcrumbs");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(ancestor = ancestor_id, error = %err, "cannot fetch ancestor");
                Vec::new()
            }
        }
    }

    /// Counts the children of every item concurrently. Items whose count
    /// failed or was cancelled are reported without navigation.
    pub async fn navigable_items<S, T>(&self, source: &S, items: Vec<T>, lifetime: &CancellationToken) -> Vec<NavigableItem<T>>
    where
        S: ItemSource + ?Sized,
        T: Identifiable,
    {
        let lookups = items.into_iter().map(|item| async move {
            let mut manager = QueryVariablesManager::default();
            manager.set("variables", Some(self.fragment(Some(item.id()))));

            let has_navigation = tokio::select! {
                biased;
                _ = lifetime.cancelled() => false,
                count = source.count(manager.variables()) => match count {
                    Ok(count) => count > 0,
                    Err(err) => {
                        warn!(item = item.id(), error = %err, "cannot count children");
                        false
                    }
                },
            };

            NavigableItem { item, has_navigation }
        });

        join_all(lookups).await
    }
}
