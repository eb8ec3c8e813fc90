//! Field specifications
//!
//! Binds a semantic review field to the locator template it is read from.

use serde::{Deserialize, Serialize};

use super::locator::LocatorTemplate;
use super::review::ReviewField;

/// What to read from a located node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReadTarget {
    /// Rendered text content
    #[default]
    Text,
    /// A named attribute (e.g. `aria-label`)
    Attribute(String),
}

/// Whether a field repeats per review or exists once per page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldScope {
    #[default]
    Position,
    Page,
}

/// How one review field is located and read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub field: ReviewField,
    pub locator: LocatorTemplate,
    #[serde(default)]
    pub read: ReadTarget,
    #[serde(default)]
    pub scope: FieldScope,
}

impl FieldSpec {
    /// Per-review field read from text
    pub fn text(field: ReviewField, locator: LocatorTemplate) -> Self {
        Self {
            field,
            locator,
            read: ReadTarget::Text,
            scope: FieldScope::Position,
        }
    }

    /// Per-review field read from an attribute
    pub fn attribute(field: ReviewField, locator: LocatorTemplate, name: &str) -> Self {
        Self {
            field,
            locator,
            read: ReadTarget::Attribute(name.to_string()),
            scope: FieldScope::Position,
        }
    }

    /// Mark this field as shared across the whole page
    #[must_use]
    pub fn page_scoped(mut self) -> Self {
        self.scope = FieldScope::Page;
        self
    }

    pub fn is_page_scoped(&self) -> bool {
        self.scope == FieldScope::Page
    }
}
