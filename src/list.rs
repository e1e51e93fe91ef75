//! ListController: the state behind one searchable, paginated list screen.
//!
//! The controller owns the screen's [`QueryVariablesManager`] and feeds it
//! from five producers:
//!
//! | fragment     | producer                                        |
//! |--------------|-------------------------------------------------|
//! | `default`    | configuration (page size, default sorting)      |
//! | `contextual` | the hosting screen                              |
//! | `navigation` | the `na` route parameter (navigable lists only) |
//! | `search`     | the search selections (`ns`)                    |
//! | `persisted`  | user pagination and sorting (`pa`, `so`)        |
//!
//! Every user change is written back through the [`PersistenceAdapter`],
//! both in the URL and in storage keyed by the route path.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ListConfig;
use crate::facet::Facet;
use crate::filter::filter_for_selections;
use crate::manager::{
    QueryVariablesManager, CONTEXTUAL_FRAGMENT, DEFAULT_FRAGMENT, NAVIGATION_FRAGMENT, PERSISTED_FRAGMENT,
    SEARCH_FRAGMENT,
};
use crate::navigation::{BreadcrumbItem, Identifiable, ItemSource, NavigableItem, NavigationFilterComposer};
use crate::persistence::PersistenceAdapter;
use crate::query_variables::{Pagination, QueryVariables, Sorting};
use crate::route::RouteState;
use crate::selection::SearchSelections;
use crate::url_codec::{
    from_url, pagination_from_param, pagination_to_param, sorting_from_param, sorting_to_param, to_url,
    ANCESTOR_PARAM, PAGINATION_PARAM, SEARCH_PARAM, SORTING_PARAM,
};

pub struct ListController<P: PersistenceAdapter> {
    config: ListConfig,
    facets: Vec<Facet>,
    persistence: P,
    manager: QueryVariablesManager,
    navigation: NavigationFilterComposer,
    selections: SearchSelections,
    breadcrumbs: Vec<BreadcrumbItem>,
    /// Ancestor whose breadcrumbs are still to be fetched
    pending_ancestor: Option<String>,
    lifetime: CancellationToken,
    route: RouteState,
}

impl<P: PersistenceAdapter> ListController<P> {
    pub fn new(config: ListConfig, facets: Vec<Facet>, persistence: P) -> Self {
        let manager = QueryVariablesManager::new(config.fragment_priority.clone());
        let navigation = NavigationFilterComposer::new(config.ancestor_relation_name.clone(), config.max_breadcrumb_depth);
        Self {
            config,
            facets,
            persistence,
            manager,
            navigation,
            selections: SearchSelections::default(),
            breadcrumbs: Vec::new(),
            pending_ancestor: None,
            lifetime: CancellationToken::new(),
            route: RouteState::default(),
        }
    }

    pub fn variables(&self) -> &QueryVariables {
        self.manager.variables()
    }

    pub fn manager(&self) -> &QueryVariablesManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut QueryVariablesManager {
        &mut self.manager
    }

    pub fn selections(&self) -> &SearchSelections {
        &self.selections
    }

    pub fn breadcrumbs(&self) -> &[BreadcrumbItem] {
        &self.breadcrumbs
    }

    pub fn route(&self) -> &RouteState {
        &self.route
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    /// Token cancelled when the controller is dropped; scopes subscriptions
    /// and pending lookups.
    pub fn lifetime(&self) -> &CancellationToken {
        &self.lifetime
    }

    /// Variables imposed by the hosting screen. May be called before or
    /// after [`init`](Self::init).
    pub fn set_context_variables(&mut self, variables: QueryVariables) {
        self.manager.set(CONTEXTUAL_FRAGMENT, Some(variables));
    }

    /// Restores the screen state for `route`: defaults, then whatever the URL
    /// or storage holds for `ns`, `pa` and `so`, then the navigation mode.
    pub fn init(&mut self, route: RouteState) {
        self.route = route;

        let defaults = QueryVariables {
            filter: None,
            pagination: Some(Pagination::new(0, self.config.default_page_size)),
            sorting: Some(self.config.default_sorting.clone()).filter(|s| !s.is_empty()),
        };
        self.manager.set(DEFAULT_FRAGMENT, Some(defaults));

        if let Some(ns) = self.restore(SEARCH_PARAM) {
            self.selections = from_url(&ns);
            let fragment = self.search_fragment();
            self.manager.set(SEARCH_FRAGMENT, fragment);
        }

        let persisted = QueryVariables {
            filter: None,
            pagination: self.restore(PAGINATION_PARAM).and_then(|pa| pagination_from_param(&pa)),
            sorting: self.restore(SORTING_PARAM).and_then(|so| sorting_from_param(&so)),
        };
        if !persisted.is_empty() {
            self.manager.set(PERSISTED_FRAGMENT, Some(persisted));
        }

        if self.config.navigable {
            self.apply_route_navigation();
            // A search restored from storage suspends navigation like one in the URL.
            if self.selections.is_active() {
                self.suspend_navigation();
            }
        }

        debug!(route = %self.route, variables = ?self.manager.variables(), "list initialized");
    }

    /// Applies new search selections and persists them. Going back to the
    /// first page keeps the user's page size.
    pub fn search(&mut self, selections: SearchSelections) {
        let active = selections.is_active();
        if active && self.config.navigable {
            self.suspend_navigation();
        }

        self.selections = selections;
        let fragment = self.search_fragment();
        self.manager.set(SEARCH_FRAGMENT, fragment);
        let encoded = active.then(|| to_url(&self.selections));
        self.persist(SEARCH_PARAM, encoded.as_deref());

        let persisted_page = self
            .manager
            .get(PERSISTED_FRAGMENT)
            .and_then(|fragment| fragment.pagination)
            .filter(|pagination| pagination.page_index != 0);
        if let Some(pagination) = persisted_page {
            self.paginate(Pagination { offset: None, page_index: 0, ..pagination });
        }

        if !active && self.config.navigable {
            self.apply_route_navigation();
        }
    }

    pub fn clear_search(&mut self) {
        self.search(SearchSelections::default());
    }

    pub fn paginate(&mut self, pagination: Pagination) {
        self.manager.merge(PERSISTED_FRAGMENT, QueryVariables::with_pagination(pagination));
        self.persist(PAGINATION_PARAM, Some(&pagination_to_param(&pagination)));
    }

    pub fn sort(&mut self, sorting: Vec<Sorting>) {
        let encoded = sorting_to_param(&sorting);
        self.manager.merge(PERSISTED_FRAGMENT, QueryVariables::with_sorting(sorting));
        self.persist(SORTING_PARAM, Some(&encoded));
    }

    /// Follows a navigation of the hosting router.
    pub fn on_route_change(&mut self, route: RouteState) {
        self.route = route;
        if self.config.navigable {
            self.apply_route_navigation();
        }
    }

    /// Fetches the breadcrumbs of the ancestor set by the latest route, if
    /// not fetched yet.
    pub async fn resolve_breadcrumbs<S>(&mut self, source: &S)
    where
        S: ItemSource + ?Sized,
    {
        let Some(ancestor) = self.pending_ancestor.take() else {
            return;
        };
        self.breadcrumbs = self.navigation.fetch_breadcrumbs(source, &ancestor, &self.lifetime).await;
    }

    /// Flags which rows of a fetched page have children.
    pub async fn navigable_page<S, T>(&self, source: &S, items: Vec<T>) -> Vec<NavigableItem<T>>
    where
        S: ItemSource + ?Sized,
        T: Identifiable,
    {
        self.navigation.navigable_items(source, items, &self.lifetime).await
    }

    /// Route to the children of `ancestor_id`, or to the root.
    pub fn child_route(&self, ancestor_id: Option<&str>) -> RouteState {
        self.navigation.child_link(ancestor_id).apply(&self.route)
    }

    fn search_fragment(&self) -> Option<QueryVariables> {
        filter_for_selections(&self.facets, &self.selections).map(QueryVariables::with_filter)
    }

    fn restore(&self, key: &str) -> Option<String> {
        self.persistence.get(key, &self.route, &self.route.storage_key())
    }

    fn persist(&mut self, key: &str, value: Option<&str>) {
        let scope = self.route.storage_key();
        if self.persistence.persist(key, value, &self.route, &scope) {
            self.route = match value {
                Some(value) => self.route.with_param(key, value),
                None => self.route.without_param(key),
            };
        }
    }

    /// `ns` in the route wins over `na`. An ancestor restricts the list to
    /// its children and clears the search; no ancestor shows the roots.
    fn apply_route_navigation(&mut self) {
        if self.route.param(SEARCH_PARAM).is_some() {
            return;
        }

        match self.route.param(ANCESTOR_PARAM).map(str::to_string) {
            Some(ancestor) => {
                self.manager.set(NAVIGATION_FRAGMENT, Some(self.navigation.fragment(Some(&ancestor))));
                self.pending_ancestor = Some(ancestor);
                self.reset_search();
            }
            None => {
                self.manager.set(NAVIGATION_FRAGMENT, Some(self.navigation.fragment(None)));
                self.breadcrumbs.clear();
                self.pending_ancestor = None;
            }
        }
    }

    fn suspend_navigation(&mut self) {
        self.manager.set(NAVIGATION_FRAGMENT, None);
        self.breadcrumbs.clear();
        self.pending_ancestor = None;
    }

    fn reset_search(&mut self) {
        self.selections = SearchSelections::default();
        self.manager.set(SEARCH_FRAGMENT, None);
        self.persist(SEARCH_PARAM, None);
    }
}

impl<P: PersistenceAdapter> Drop for ListController<P> {
    fn drop(&mut self) {
        self.lifetime.cancel();
        self.manager.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use crate::facet::wrap_like;
    use crate::navigation::tests::{chain, StaticSource};
    use crate::persistence::MemoryPersistence;
    use crate::selection::Selection;
    use crate::sql_compiler::SqlCompiler;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn facets() -> Vec<Facet> {
        vec![Facet::dropdown("Name", "name", "text").with_transform(wrap_like)]
    }

    fn navigable() -> ListController<MemoryPersistence> {
        let config = ListConfig {
            navigable: true,
            ..ListConfig::default()
        };
        ListController::new(config, facets(), MemoryPersistence::new())
    }

    fn name_search(value: &str) -> SearchSelections {
        SearchSelections::single(vec![Selection::new("name", Condition::like(value))])
    }

    fn json_of(list: &ListController<MemoryPersistence>) -> serde_json::Value {
        serde_json::to_value(list.variables()).unwrap()
    }

    #[test]
    fn test_search_is_persisted_and_resets_page() {
        let mut list = ListController::new(ListConfig::default(), facets(), MemoryPersistence::new());
        list.init(RouteState::parse("/items").unwrap());
        list.paginate(Pagination::new(3, 20));

        list.search(name_search("ab"));

        assert_eq!(
            json_of(&list),
            json!({
                "filter": {"groups": [{"conditions": [{"name": {"like": {"value": "%ab%"}}}]}]},
                "pagination": {"offset": null, "pageIndex": 0, "pageSize": 20}
            })
        );
        assert!(list.route().param(SEARCH_PARAM).is_some());
        assert_eq!(
            list.persistence().retrieve_from_storage(SEARCH_PARAM, "/items"),
            Some(to_url(&name_search("ab")))
        );

        list.clear_search();
        assert!(list.variables().filter.is_none());
        assert_eq!(list.route().param(SEARCH_PARAM), None);
        assert_eq!(list.persistence().retrieve_from_storage(SEARCH_PARAM, "/items"), None);
    }

    #[test]
    fn test_sort_overrides_default() {
        let config = ListConfig {
            default_sorting: vec![Sorting::desc("name")],
            ..ListConfig::default()
        };
        let mut list = ListController::new(config, facets(), MemoryPersistence::new());
        list.init(RouteState::parse("/items").unwrap());
        assert_eq!(list.variables().sorting, Some(vec![Sorting::desc("name")]));

        list.sort(vec![Sorting::asc("date")]);
        assert_eq!(list.variables().sorting, Some(vec![Sorting::asc("date")]));
        assert!(list.route().param(SORTING_PARAM).is_some());
    }

    #[test]
    fn test_navigable_root_and_child() {
        let mut list = navigable();
        list.init(RouteState::parse("/items").unwrap());
        assert_eq!(
            json_of(&list)["filter"],
            json!({"groups": [{"conditions": [{"parent": {"empty": {}}}]}]})
        );

        list.on_route_change(list.child_route(Some("3")));
        assert_eq!(
            json_of(&list)["filter"],
            json!({"groups": [{"conditions": [{"parent": {"have": {"values": ["3"]}}}]}]})
        );
    }

    #[test]
    fn test_search_suspends_navigation() {
        let mut list = navigable();
        list.init(RouteState::parse("/items;na=3").unwrap());

        list.search(name_search("x"));
        assert_eq!(
            json_of(&list)["filter"],
            json!({"groups": [{"conditions": [{"name": {"like": {"value": "%x%"}}}]}]})
        );
        assert!(list.breadcrumbs().is_empty());

        // Clearing the search brings the route's ancestor back.
        list.clear_search();
        assert_eq!(
            json_of(&list)["filter"],
            json!({"groups": [{"conditions": [{"parent": {"have": {"values": ["3"]}}}]}]})
        );
    }

    #[test]
    fn test_search_param_wins_over_ancestor_on_reload() {
        let route = RouteState::parse("/items;na=3").unwrap().with_param(SEARCH_PARAM, &to_url(&name_search("x")));
        let mut list = navigable();
        list.init(route);

        assert_eq!(
            json_of(&list)["filter"],
            json!({"groups": [{"conditions": [{"name": {"like": {"value": "%x%"}}}]}]})
        );
        assert_eq!(list.manager().get(NAVIGATION_FRAGMENT), None);
    }

    #[test]
    fn test_search_from_storage_suspends_navigation() {
        let mut persistence = MemoryPersistence::new();
        persistence.persist_in_storage(SEARCH_PARAM, Some(&to_url(&name_search("x"))), "/items");
        let config = ListConfig {
            navigable: true,
            ..ListConfig::default()
        };
        let mut list = ListController::new(config, facets(), persistence);
        list.init(RouteState::parse("/items").unwrap());

        assert!(list.selections().is_active());
        assert_eq!(list.manager().get(NAVIGATION_FRAGMENT), None);
        assert!(list.breadcrumbs().is_empty());
        assert_eq!(
            json_of(&list)["filter"],
            json!({"groups": [{"conditions": [{"name": {"like": {"value": "%x%"}}}]}]})
        );
    }

    #[test]
    fn test_overflowing_page_from_url_falls_back_to_default() {
        let pa = urlencoding::encode(r#"{"pageIndex":18446744073709551615,"pageSize":10}"#).into_owned();
        let mut list = ListController::new(ListConfig::default(), facets(), MemoryPersistence::new());
        list.init(RouteState::parse("/items").unwrap().with_param(PAGINATION_PARAM, &pa));

        assert_eq!(list.variables().pagination, Some(Pagination::new(0, ListConfig::default().default_page_size)));
        let sql = SqlCompiler::new("items").compile(list.variables()).unwrap().sql;
        assert!(sql.ends_with("OFFSET 0"), "{}", sql);
    }

    #[tokio::test]
    async fn test_breadcrumbs_follow_route() {
        let mut source = StaticSource::default();
        source.items.insert("3".to_string(), chain());

        let mut list = navigable();
        list.init(RouteState::parse("/items;na=3").unwrap());
        list.resolve_breadcrumbs(&source).await;
        let names: Vec<_> = list.breadcrumbs().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);

        list.on_route_change(RouteState::parse("/items").unwrap());
        assert!(list.breadcrumbs().is_empty());
    }

    #[test]
    fn test_drop_cancels_lifetime() {
        let list = navigable();
        let lifetime = list.lifetime().clone();
        drop(list);
        assert!(lifetime.is_cancelled());
    }
}
