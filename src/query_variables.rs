//! The variables shape consumed by the transport layer.

use serde::{Deserialize, Serialize};

use crate::filter::Filter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortingOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sorting {
    pub field: String,
    #[serde(default)]
    pub order: SortingOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_as_highest: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_string_as_highest: Option<bool>,
}

impl Sorting {
    pub fn new(field: impl Into<String>, order: SortingOrder) -> Self {
        Self {
            field: field.into(),
            order,
            null_as_highest: None,
            empty_string_as_highest: None,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortingOrder::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortingOrder::Desc)
    }
}

/// `offset` is always sent, as `null` unless a fragment sets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub page_index: u64,
    pub page_size: u64,
}

impl Pagination {
    pub fn new(page_index: u64, page_size: u64) -> Self {
        Self { offset: None, page_index, page_size }
    }

    /// Row offset the page starts at, saturating at `u64::MAX`.
    pub fn effective_offset(&self) -> u64 {
        self.offset.unwrap_or_else(|| self.page_index.saturating_mul(self.page_size))
    }
}

/// Partial query variables: a fragment, or the merged result. Absent keys
/// are never serialized.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QueryVariables {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sorting: Option<Vec<Sorting>>,
}

impl QueryVariables {
    pub fn with_filter(filter: Filter) -> Self {
        Self { filter: Some(filter), ..Self::default() }
    }

    pub fn with_pagination(pagination: Pagination) -> Self {
        Self { pagination: Some(pagination), ..Self::default() }
    }

    pub fn with_sorting(sorting: Vec<Sorting>) -> Self {
        Self { sorting: Some(sorting), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.filter.is_none() && self.pagination.is_none() && self.sorting.is_none()
    }

    /// Keys present in `other` replace ours.
    pub fn overlay(&mut self, other: QueryVariables) {
        if other.filter.is_some() {
            self.filter = other.filter;
        }
        if other.pagination.is_some() {
            self.pagination = other.pagination;
        }
        if other.sorting.is_some() {
            self.sorting = other.sorting;
        }
    }

    /// Keys missing here are taken from `other`.
    pub fn fill_missing(&mut self, other: QueryVariables) {
        if self.filter.is_none() {
            self.filter = other.filter;
        }
        if self.pagination.is_none() {
            self.pagination = other.pagination;
        }
        if self.sorting.is_none() {
            self.sorting = other.sorting;
        }
    }
}
