//! Locator templates
//!
//! A template describes a family of repeating DOM nodes; rendering it with a
//! 1-based position yields a single-node query.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder substituted with the position when a template is rendered
pub const POSITION_PLACEHOLDER: &str = "{index}";

/// Query language of a locator expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocatorStrategy {
    #[default]
    XPath,
    Css,
}

/// A concrete single-node query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    pub strategy: LocatorStrategy,
    pub expression: String,
    /// Position the locator was rendered for, if any
    pub position: Option<u32>,
}

impl Locator {
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self {
            strategy: LocatorStrategy::XPath,
            expression: expression.into(),
            position: None,
        }
    }

    pub fn css(expression: impl Into<String>) -> Self {
        Self {
            strategy: LocatorStrategy::Css,
            expression: expression.into(),
            position: None,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.strategy {
            LocatorStrategy::XPath => write!(f, "xpath:{}", self.expression),
            LocatorStrategy::Css => write!(f, "css:{}", self.expression),
        }
    }
}

/// Parameterized reference to a DOM node family
///
/// Templates without the `{index}` placeholder address a single page-level
/// node and render to the same locator for every position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocatorTemplate {
    #[serde(default)]
    pub strategy: LocatorStrategy,
    pub pattern: String,
}

impl LocatorTemplate {
    pub fn xpath(pattern: impl Into<String>) -> Self {
        Self {
            strategy: LocatorStrategy::XPath,
            pattern: pattern.into(),
        }
    }

    pub fn css(pattern: impl Into<String>) -> Self {
        Self {
            strategy: LocatorStrategy::Css,
            pattern: pattern.into(),
        }
    }

    /// Whether rendering depends on the position
    pub fn is_positional(&self) -> bool {
        self.pattern.contains(POSITION_PLACEHOLDER)
    }

    /// Render the query for the node at `position` (1-based)
    pub fn at(&self, position: u32) -> Locator {
        if !self.is_positional() {
            return self.page_level();
        }
        Locator {
            strategy: self.strategy,
            expression: self.pattern.replace(POSITION_PLACEHOLDER, &position.to_string()),
            position: Some(position),
        }
    }

    /// Render the query ignoring positions
    pub fn page_level(&self) -> Locator {
        Locator {
            strategy: self.strategy,
            expression: self.pattern.clone(),
            position: None,
        }
    }
}

impl fmt::Display for LocatorTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_template_renders_index() {
        let template = LocatorTemplate::xpath("(//time[@class='we-customer-review__date'])[{index}]");
        let locator = template.at(7);

        assert!(template.is_positional());
        assert_eq!(locator.expression, "(//time[@class='we-customer-review__date'])[7]");
        assert_eq!(locator.position, Some(7));
        assert_eq!(locator.strategy, LocatorStrategy::XPath);
    }

    #[test]
    fn test_page_level_template_ignores_position() {
        let template = LocatorTemplate::xpath("//h1[@itemprop='name']");
        assert!(!template.is_positional());
        assert_eq!(template.at(3), template.page_level());
        assert_eq!(template.at(3).position, None);
    }

    #[test]
    fn test_locator_display_names_strategy() {
        assert_eq!(Locator::css("div.card").to_string(), "css:div.card");
        assert_eq!(Locator::xpath("//div").to_string(), "xpath://div");
    }
}
