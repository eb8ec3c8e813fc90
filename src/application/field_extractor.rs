//! Field Extractor
//!
//! Resolves one semantic field at one position: wait for the node, read its
//! text or attribute, then reduce numeric fields to their first digit run.

use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;

use crate::domain::{FieldSpec, FieldValue, ReadTarget, ReviewField, SessionDriver};
use crate::infrastructure::extraction_error::{ExtractionError, ExtractionResult};

lazy_static! {
    static ref DIGIT_RUN: Regex = Regex::new(r"\d+").expect("digit pattern is valid");
}

/// Highest star rating a store displays
pub const MAX_RATING: u32 = 5;

/// First run of decimal digits in `raw`, if any
///
/// ```
/// use review_harvest::application::field_extractor::extract_first_number;
/// assert_eq!(extract_first_number("Mit 4 von 5 Sternen bewertet"), Some(4));
/// assert_eq!(extract_first_number("keine Angabe"), None);
/// ```
pub fn extract_first_number(raw: &str) -> Option<u32> {
    DIGIT_RUN.find(raw).and_then(|m| m.as_str().parse().ok())
}

/// Turn raw node text into a typed value for `field`
pub fn parse_value(field: ReviewField, raw: &str) -> ExtractionResult<FieldValue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ExtractionError::parse_error(field, raw, "empty text"));
    }

    match field {
        ReviewField::Rating => {
            let rating = extract_first_number(trimmed)
                .ok_or_else(|| ExtractionError::parse_error(field, trimmed, "no digits"))?;
            if !(1..=MAX_RATING).contains(&rating) {
                return Err(ExtractionError::parse_error(field, trimmed, "rating outside 1..=5"));
            }
            Ok(FieldValue::Number(rating))
        }
        ReviewField::HelpfulCount => extract_first_number(trimmed)
            .map(FieldValue::Number)
            .ok_or_else(|| ExtractionError::parse_error(field, trimmed, "no digits")),
        _ => Ok(FieldValue::Text(trimmed.to_string())),
    }
}

/// Bounded-wait reader for field specs over one session
pub struct FieldExtractor<'a, D: SessionDriver> {
    driver: &'a D,
    timeout: Duration,
}

impl<'a, D: SessionDriver> FieldExtractor<'a, D> {
    pub fn new(driver: &'a D, timeout: Duration) -> Self {
        Self { driver, timeout }
    }

    /// Resolve `spec` at `position`
    ///
    /// Fails with `NotFound` when the node does not appear within the timeout
    /// and with `ParseError` when its content does not fit the field.
    pub async fn resolve(&self, spec: &FieldSpec, position: u32) -> ExtractionResult<FieldValue> {
        let locator = spec.locator.at(position);
        let node = self.driver.query_node(&locator, self.timeout).await?;

        let raw = match &spec.read {
            ReadTarget::Text => self.driver.read_text(&node).await?,
            ReadTarget::Attribute(name) => self
                .driver
                .read_attribute(&node, name)
                .await?
                .ok_or_else(|| ExtractionError::parse_error(spec.field, "", &format!("attribute '{name}' missing")))?,
        };

        parse_value(spec.field, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LocatorTemplate;
    use crate::infrastructure::memory_session::{InMemorySession, MemoryNode};
    use rstest::rstest;

    #[rstest]
    #[case("Mit 4 von 5 Sternen bewertet", Some(4))]
    #[case("5 von 5", Some(5))]
    #[case("12 Personen fanden diese Rezension hilfreich", Some(12))]
    #[case("1.234 Personen", Some(1))]
    #[case("keine Sterne", None)]
    #[case("", None)]
    fn test_extract_first_number(#[case] raw: &str, #[case] expected: Option<u32>) {
        assert_eq!(extract_first_number(raw), expected);
    }

    #[rstest]
    #[case("Mit 3 von 5 Sternen bewertet", Ok(FieldValue::Number(3)))]
    #[case("0 von 5", Err("parse_error"))]
    #[case("Mit 9 Sternen", Err("parse_error"))]
    #[case("ohne Zahl", Err("parse_error"))]
    #[case("   ", Err("parse_error"))]
    fn test_rating_parsing(#[case] raw: &str, #[case] expected: Result<FieldValue, &str>) {
        let parsed = parse_value(ReviewField::Rating, raw).map_err(|e| e.kind());
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_text_fields_are_trimmed() {
        assert_eq!(
            parse_value(ReviewField::Body, "  Tolle App\n"),
            Ok(FieldValue::Text("Tolle App".into()))
        );
    }

    #[tokio::test]
    async fn test_resolve_reads_text_and_attributes() {
        let session = InMemorySession::new()
            .with_family(LocatorTemplate::xpath("(//span[@class='user'])[{index}]"), |p| {
                Some(MemoryNode::text(format!("User {p}")))
            })
            .with_family(LocatorTemplate::xpath("(//figure)[{index}]"), |_| {
                Some(MemoryNode::with_attribute("aria-label", "4 von 5"))
            });
        let extractor = FieldExtractor::new(&session, Duration::from_millis(10));

        let name = FieldSpec::text(
            ReviewField::ReviewerName,
            LocatorTemplate::xpath("(//span[@class='user'])[{index}]"),
        );
        assert_eq!(extractor.resolve(&name, 2).await, Ok(FieldValue::Text("User 2".into())));

        let rating = FieldSpec::attribute(ReviewField::Rating, LocatorTemplate::xpath("(//figure)[{index}]"), "aria-label");
        assert_eq!(extractor.resolve(&rating, 1).await, Ok(FieldValue::Number(4)));

        let missing_attr = FieldSpec::attribute(ReviewField::Date, LocatorTemplate::xpath("(//figure)[{index}]"), "datetime");
        assert_eq!(extractor.resolve(&missing_attr, 1).await.unwrap_err().kind(), "parse_error");
    }

    #[tokio::test]
    async fn test_resolve_missing_node_is_not_found() {
        let session = InMemorySession::new();
        let extractor = FieldExtractor::new(&session, Duration::from_millis(25));
        let spec = FieldSpec::text(ReviewField::Title, LocatorTemplate::xpath("(//h3)[{index}]"));

        let err = extractor.resolve(&spec, 1).await.unwrap_err();
        assert_eq!(err, ExtractionError::not_found("xpath:(//h3)[1]", 25));
    }
}
