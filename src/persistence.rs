//! Where list state is kept between visits: the URL and a scoped key/value
//! storage. Values are the already-encoded parameter texts.

use std::collections::HashMap;

use tracing::debug;

use crate::route::RouteState;

pub trait PersistenceAdapter {
    fn persist_in_storage(&mut self, key: &str, value: Option<&str>, scope: &str);

    fn retrieve_from_storage(&self, key: &str, scope: &str) -> Option<String>;

    /// Writes `key` as a parameter of the route's last segment. Returns
    /// whether the URL changed.
    fn persist_in_url(&mut self, key: &str, value: Option<&str>, route: &RouteState) -> bool;

    /// URL first, then storage.
    fn get(&self, key: &str, route: &RouteState, scope: &str) -> Option<String> {
        route
            .param(key)
            .map(str::to_string)
            .or_else(|| self.retrieve_from_storage(key, scope))
    }

    /// Both storage and URL.
    fn persist(&mut self, key: &str, value: Option<&str>, route: &RouteState, scope: &str) -> bool {
        self.persist_in_storage(key, value, scope);
        self.persist_in_url(key, value, route)
    }
}

/// Keeps storage in a map and records the last URL it navigated to.
#[derive(Debug, Default, Clone)]
pub struct MemoryPersistence {
    storage: HashMap<(String, String), String>,
    route: Option<RouteState>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// The route written by the latest `persist_in_url`, if any.
    pub fn route(&self) -> Option<&RouteState> {
        self.route.as_ref()
    }
}

impl PersistenceAdapter for MemoryPersistence {
    fn persist_in_storage(&mut self, key: &str, value: Option<&str>, scope: &str) {
        let slot = (scope.to_string(), key.to_string());
        match value {
            Some(value) => {
                self.storage.insert(slot, value.to_string());
            }
            None => {
                self.storage.remove(&slot);
            }
        }
    }

    fn retrieve_from_storage(&self, key: &str, scope: &str) -> Option<String> {
        self.storage.get(&(scope.to_string(), key.to_string())).cloned()
    }

    fn persist_in_url(&mut self, key: &str, value: Option<&str>, route: &RouteState) -> bool {
        let next = match value {
            Some(value) => route.with_param(key, value),
            None => route.without_param(key),
        };
        if &next == route {
            return false;
        }
        debug!(route = %next, "navigate");
        self.route = Some(next);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_is_scoped() {
        let mut persistence = MemoryPersistence::new();
        persistence.persist_in_storage("pa", Some("x"), "/a");
        assert_eq!(persistence.retrieve_from_storage("pa", "/a"), Some("x".to_string()));
        assert_eq!(persistence.retrieve_from_storage("pa", "/b"), None);

        persistence.persist_in_storage("pa", None, "/a");
        assert_eq!(persistence.retrieve_from_storage("pa", "/a"), None);
    }

    #[test]
    fn test_url_wins_over_storage() {
        let route = RouteState::parse("/list;pa=from-url").unwrap();
        let mut persistence = MemoryPersistence::new();
        persistence.persist_in_storage("pa", Some("from-storage"), "/list");
        persistence.persist_in_storage("so", Some("stored-sort"), "/list");

        assert_eq!(persistence.get("pa", &route, "/list"), Some("from-url".to_string()));
        assert_eq!(persistence.get("so", &route, "/list"), Some("stored-sort".to_string()));
        assert_eq!(persistence.get("ns", &route, "/list"), None);
    }

    #[test]
    fn test_persist_in_url_reports_changes() {
        let mut route = RouteState::parse("/list").unwrap();
        let mut persistence = MemoryPersistence::new();

        assert!(persistence.persist_in_url("na", Some("3"), &route));
        route = persistence.route().unwrap().clone();
        assert!(!persistence.persist_in_url("na", Some("3"), &route));
        assert!(persistence.persist_in_url("pa", Some("p"), &route));
        route = persistence.route().unwrap().clone();
        assert_eq!(route.to_string(), "/list;na=3;pa=p");

        assert!(persistence.persist_in_url("na", None, &route));
        assert_eq!(persistence.route().unwrap().param("na"), None);
    }
}
