//! Query-variable composition and faceted-search translation for
//! searchable, paginated list screens.
//!
//! Search selections chosen through facets are translated into a filter
//! tree, merged with contextual, navigation and persisted fragments by the
//! [`QueryVariablesManager`], and round-tripped through the URL so a list
//! can be restored on reload.

pub mod condition;
pub mod config;
pub mod error;
pub mod facet;
pub mod filter;
pub mod lexer;
pub mod list;
pub mod manager;
pub mod navigation;
pub mod parser;
pub mod persistence;
pub mod query_variables;
pub mod route;
pub mod selection;
pub mod sql_compiler;
pub mod token;
pub mod url_codec;

pub use condition::{Condition, Scalar};
pub use config::ListConfig;
pub use error::{QueryError, Result};
pub use facet::{Facet, FacetKind};
pub use filter::{conditions_for_group, filter_for_selections, Filter, FilterCondition, FilterGroup};
pub use list::ListController;
pub use manager::QueryVariablesManager;
pub use navigation::{BreadcrumbItem, ItemSource, NavigationFilterComposer};
pub use persistence::{MemoryPersistence, PersistenceAdapter};
pub use query_variables::{Pagination, QueryVariables, Sorting, SortingOrder};
pub use route::RouteState;
pub use selection::{GroupSelections, SearchSelections, Selection};
pub use url_codec::{from_url, to_url};
