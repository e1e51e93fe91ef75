//! Facet descriptors: static configuration mapping a search concept to a
//! backend field, plus the stock selection transforms.

use std::fmt;
use std::sync::Arc;

use serde_json::json;

use crate::condition::{Condition, Scalar};
use crate::selection::Selection;

/// Pure function applied to a selection before its condition is built.
pub type Transform = Arc<dyn Fn(Selection) -> Selection + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum FacetKind {
    /// Set or unset; when set, always yields `condition`.
    Flag { condition: Condition },
    /// Values are picked by an interactive component identified by `component`.
    Dropdown {
        component: String,
        show_validate_button: bool,
        configuration: serde_json::Value,
    },
}

#[derive(Clone)]
pub struct Facet {
    /// Label shown in the GUI.
    pub display: String,
    /// Target field; a dotted path (`artist.name`) goes through joins.
    pub field: String,
    /// Alias distinguishing facets that share `field`.
    pub name: Option<String>,
    pub transform: Option<Transform>,
    pub kind: FacetKind,
}

impl fmt::Debug for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Facet")
            .field("display", &self.display)
            .field("field", &self.field)
            .field("name", &self.name)
            .field("transform", &self.transform.as_ref().map(|_| "<fn>"))
            .field("kind", &self.kind)
            .finish()
    }
}

impl Facet {
    pub fn flag(display: impl Into<String>, field: impl Into<String>, condition: Condition) -> Self {
        Self {
            display: display.into(),
            field: field.into(),
            name: None,
            transform: None,
            kind: FacetKind::Flag { condition },
        }
    }

    pub fn dropdown(display: impl Into<String>, field: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            display: display.into(),
            field: field.into(),
            name: None,
            transform: None,
            kind: FacetKind::Dropdown {
                component: component.into(),
                show_validate_button: false,
                configuration: serde_json::Value::Null,
            },
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Selection) -> Selection + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn with_configuration(mut self, value: serde_json::Value) -> Self {
        if let FacetKind::Dropdown { configuration, .. } = &mut self.kind {
            *configuration = value;
        }
        self
    }

    pub fn with_validate_button(mut self) -> Self {
        if let FacetKind::Dropdown { show_validate_button, .. } = &mut self.kind {
            *show_validate_button = true;
        }
        self
    }

    /// Does this facet own `selection`?
    pub fn matches(&self, selection: &Selection) -> bool {
        self.field == selection.field && (selection.name.is_none() || self.name == selection.name)
    }

    /// Flag facets impose their fixed condition, then the transform runs.
    pub fn prepare(&self, mut selection: Selection) -> Selection {
        if let FacetKind::Flag { condition } = &self.kind {
            selection.condition = condition.clone();
        }
        match &self.transform {
            Some(transform) => transform(selection),
            None => selection,
        }
    }
}

/// First facet owning `selection`, if any.
pub fn find_facet<'a>(facets: &'a [Facet], selection: &Selection) -> Option<&'a Facet> {
    facets.iter().find(|facet| facet.matches(selection))
}

fn map_like(mut selection: Selection, wrap: impl Fn(&str) -> String) -> Selection {
    if let Condition::Like(op) = &mut selection.condition {
        if let Scalar::String(value) = &op.value {
            op.value = Scalar::String(wrap(value));
        }
    }
    selection
}

/// `like` value `abc` becomes `%abc%`.
pub fn wrap_like(selection: Selection) -> Selection {
    map_like(selection, |value| format!("%{}%", value))
}

/// `like` value `abc` becomes `abc%`.
pub fn wrap_prefix(selection: Selection) -> Selection {
    map_like(selection, |value| format!("{}%", value))
}

/// `like` value `abc` becomes `%abc`.
pub fn wrap_suffix(selection: Selection) -> Selection {
    map_like(selection, |value| format!("%{}", value))
}

/// Moves the selection onto another field.
pub fn replace_field(field: impl Into<String>) -> impl Fn(Selection) -> Selection + Send + Sync + 'static {
    let field = field.into();
    move |mut selection| {
        selection.field = field.clone();
        selection
    }
}

/// Turns a single-value condition into a custom operator named after the
/// field: `{field: f, equal: {value: v}}` becomes `{custom: {f: {value: v}}}`.
pub fn replace_operator_by_field(mut selection: Selection) -> Selection {
    let payload = selection.condition.value().map(|value| json!({ "value": value }));
    if let Some(payload) = payload {
        selection.condition = Condition::custom(payload);
    }
    selection
}
