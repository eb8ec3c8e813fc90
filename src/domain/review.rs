//! Review record entity
//!
//! One superset schema covers every store: fields a source does not expose
//! simply stay `None`, which keeps the sink and the exporters uniform.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic fields a review source can expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReviewField {
    AppName,
    Platform,
    ReviewerName,
    Rating,
    Date,
    Title,
    Body,
    HelpfulCount,
}

impl ReviewField {
    /// All fields in export column order
    pub const ALL: [ReviewField; 8] = [
        ReviewField::AppName,
        ReviewField::Platform,
        ReviewField::ReviewerName,
        ReviewField::Rating,
        ReviewField::Date,
        ReviewField::Title,
        ReviewField::Body,
        ReviewField::HelpfulCount,
    ];

    /// Column name used in exported files
    pub fn column_name(self) -> &'static str {
        match self {
            Self::AppName => "appName",
            Self::Platform => "platform",
            Self::ReviewerName => "reviewerName",
            Self::Rating => "rating",
            Self::Date => "date",
            Self::Title => "title",
            Self::Body => "body",
            Self::HelpfulCount => "helpfulCount",
        }
    }
}

impl fmt::Display for ReviewField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// A resolved field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Number(u32),
}

/// One scraped review
///
/// Field order matches [`ReviewField::ALL`]; the CSV writer relies on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub app_name: Option<String>,
    pub platform: Option<String>,
    pub reviewer_name: Option<String>,
    pub rating: Option<u8>,
    pub date: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub helpful_count: Option<u32>,
}

impl ReviewRecord {
    /// Export header in stable column order
    pub fn columns() -> Vec<&'static str> {
        ReviewField::ALL.iter().map(|f| f.column_name()).collect()
    }

    /// True when no field resolved at all
    pub fn is_empty(&self) -> bool {
        self.populated_fields() == 0
    }

    /// Number of fields carrying a value
    pub fn populated_fields(&self) -> usize {
        ReviewField::ALL.iter().filter(|f| self.has(**f)).count()
    }

    /// Whether a given field carries a value
    pub fn has(&self, field: ReviewField) -> bool {
        match field {
            ReviewField::AppName => self.app_name.is_some(),
            ReviewField::Platform => self.platform.is_some(),
            ReviewField::ReviewerName => self.reviewer_name.is_some(),
            ReviewField::Rating => self.rating.is_some(),
            ReviewField::Date => self.date.is_some(),
            ReviewField::Title => self.title.is_some(),
            ReviewField::Body => self.body.is_some(),
            ReviewField::HelpfulCount => self.helpful_count.is_some(),
        }
    }

    /// Store a resolved value in the matching slot
    ///
    /// Numbers landing in a text slot are kept as their decimal text; text
    /// landing in a numeric slot is ignored (the extractor never does this).
    pub fn set(&mut self, field: ReviewField, value: FieldValue) {
        match (field, value) {
            (ReviewField::Rating, FieldValue::Number(n)) => {
                self.rating = u8::try_from(n).ok();
            }
            (ReviewField::HelpfulCount, FieldValue::Number(n)) => self.helpful_count = Some(n),
            (ReviewField::Rating | ReviewField::HelpfulCount, FieldValue::Text(_)) => {}
            (field, FieldValue::Number(n)) => self.set_text(field, n.to_string()),
            (field, FieldValue::Text(text)) => self.set_text(field, text),
        }
    }

    fn set_text(&mut self, field: ReviewField, text: String) {
        let slot = match field {
            ReviewField::AppName => &mut self.app_name,
            ReviewField::Platform => &mut self.platform,
            ReviewField::ReviewerName => &mut self.reviewer_name,
            ReviewField::Date => &mut self.date,
            ReviewField::Title => &mut self.title,
            ReviewField::Body => &mut self.body,
            ReviewField::Rating | ReviewField::HelpfulCount => return,
        };
        *slot = Some(text);
    }
}
