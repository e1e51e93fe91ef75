//! Compact, URL-safe encodings of persisted list state.
//!
//! | key  | content                                 |
//! |------|-----------------------------------------|
//! | `ns` | search selections (see [`to_url`])      |
//! | `na` | ancestor id, plain text                 |
//! | `pa` | `{pageIndex, pageSize}`                 |
//! | `so` | `[{field, order}]`                      |
//!
//! Selections are written as JSON with short keys, `f` (field), `n`
//! (facet alias) and `c` (condition), then percent-encoded:
//!
//! ```text
//! [[{"f":"search","c":{"like":{"value":"asdf"}}}]]
//! ```
//!
//! Decoding never fails the caller: malformed selections are dropped one by
//! one and an undecodable payload yields `[[]]`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::condition::Condition;
use crate::error::{QueryError, Result};
use crate::query_variables::{Pagination, Sorting};
use crate::selection::{GroupSelections, SearchSelections, Selection};

pub const SEARCH_PARAM: &str = "ns";
pub const ANCESTOR_PARAM: &str = "na";
pub const PAGINATION_PARAM: &str = "pa";
pub const SORTING_PARAM: &str = "so";

#[derive(Serialize, Deserialize)]
struct CompactSelection {
    f: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    n: Option<String>,
    c: Condition,
}

impl From<&Selection> for CompactSelection {
    fn from(selection: &Selection) -> Self {
        Self {
            f: selection.field.clone(),
            n: selection.name.clone(),
            c: selection.condition.clone(),
        }
    }
}

impl From<CompactSelection> for Selection {
    fn from(compact: CompactSelection) -> Self {
        Selection {
            field: compact.f,
            name: compact.n,
            condition: compact.c,
        }
    }
}

/// Deterministic encoding; `from_url(&to_url(s)) == s` for every selection
/// whose condition is finite. Selections carrying NaN or infinities are left
/// out with a warning.
pub fn to_url(selections: &SearchSelections) -> String {
    let compact: Vec<Vec<CompactSelection>> = selections
        .groups()
        .iter()
        .map(|group| {
            group
                .iter()
                .filter(|selection| {
                    let finite = selection.condition.is_finite();
                    if !finite {
                        warn!(field = %selection.field, "dropping selection with a non-finite value");
                    }
                    finite
                })
                .map(CompactSelection::from)
                .collect()
        })
        .collect();
    // Plain structs and `Condition` only; serializing them to a string cannot fail.
    let json = serde_json::to_string(&compact).unwrap_or_else(|_| "[[]]".to_string());
    urlencoding::encode(&json).into_owned()
}

/// Strict decoding of the envelope. Individual malformed selections or
/// groups are still skipped; only an unreadable payload is an error.
pub fn decode_selections(text: &str) -> Result<SearchSelections> {
    if text.trim().is_empty() {
        return Ok(SearchSelections::default());
    }

    let decoded = urlencoding::decode(text).map_err(|e| QueryError::Decode {
        key: SEARCH_PARAM.to_string(),
        message: e.to_string(),
    })?;
    let value: Value = serde_json::from_str(&decoded).map_err(|e| QueryError::Decode {
        key: SEARCH_PARAM.to_string(),
        message: e.to_string(),
    })?;
    let Value::Array(groups) = value else {
        return Err(QueryError::Decode {
            key: SEARCH_PARAM.to_string(),
            message: "expected a list of groups".to_string(),
        });
    };

    let mut result: Vec<GroupSelections> = Vec::with_capacity(groups.len());
    for group in groups {
        let Value::Array(items) = group else {
            warn!("dropping malformed selection group");
            continue;
        };
        let mut selections = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value::<CompactSelection>(item) {
                Ok(compact) => selections.push(Selection::from(compact)),
                Err(err) => warn!(error = %err, "dropping malformed selection"),
            }
        }
        result.push(selections);
    }

    Ok(SearchSelections::new(result))
}

/// Soft decoding: anything unreadable becomes `[[]]`.
pub fn from_url(text: &str) -> SearchSelections {
    decode_selections(text).unwrap_or_else(|err| {
        warn!(error = %err, "ignoring unreadable search selections");
        SearchSelections::default()
    })
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageParam {
    page_index: u64,
    page_size: u64,
}

pub fn pagination_to_param(pagination: &Pagination) -> String {
    let param = PageParam {
        page_index: pagination.page_index,
        page_size: pagination.page_size,
    };
    let json = serde_json::to_string(&param).unwrap_or_default();
    urlencoding::encode(&json).into_owned()
}

/// `None` (with a warning) when the parameter cannot be read, has a zero
/// page size, or points past the last addressable row.
pub fn pagination_from_param(text: &str) -> Option<Pagination> {
    match decode_json::<PageParam>(PAGINATION_PARAM, text) {
        Ok(param) if param.page_size == 0 || param.page_index.checked_mul(param.page_size).is_none() => {
            warn!(
                page_index = param.page_index,
                page_size = param.page_size,
                "ignoring out of range pagination"
            );
            None
        }
        Ok(param) => Some(Pagination::new(param.page_index, param.page_size)),
        Err(err) => {
            warn!(error = %err, "ignoring unreadable pagination");
            None
        }
    }
}

pub fn sorting_to_param(sorting: &[Sorting]) -> String {
    let json = serde_json::to_string(sorting).unwrap_or_default();
    urlencoding::encode(&json).into_owned()
}

pub fn sorting_from_param(text: &str) -> Option<Vec<Sorting>> {
    match decode_json::<Vec<Sorting>>(SORTING_PARAM, text) {
        Ok(sorting) => Some(sorting),
        Err(err) => {
            warn!(error = %err, "ignoring unreadable sorting");
            None
        }
    }
}

fn decode_json<T: for<'de> Deserialize<'de>>(key: &str, text: &str) -> Result<T> {
    let decoded = urlencoding::decode(text).map_err(|e| QueryError::Decode {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&decoded).map_err(|e| QueryError::Decode {
        key: key.to_string(),
        message: e.to_string(),
    })
}
