//! Store-specific source profiles
//!
//! Each profile carries the locators for one store's review listing, how the
//! position bound is obtained, and how output files are named. The built-in
//! defaults target the German storefronts; every locator can be overridden
//! from the config file when the markup drifts.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::{FieldSpec, LocatorTemplate, ReviewField};

/// How the highest review position is obtained
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundStrategy {
    /// Walk a fixed number of positions
    Fixed { count: u32 },
    /// Run adaptive discovery on the item locator
    Discover,
}

/// A click needed before reviews are listed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickAction {
    pub locator: LocatorTemplate,
    /// Human-readable label for logs
    pub label: String,
}

/// How the output file stem is derived from the source URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileNaming {
    /// Value of a query parameter, e.g. `id=com.example.app`
    QueryParam { name: String, prefix: String },
    /// A path segment counted from the end (1 = last)
    PathSegment { from_end: usize, prefix: String },
}

impl FileNaming {
    /// Deterministic file stem for a source URL
    pub fn file_stem(&self, source_url: &str) -> String {
        let parsed = Url::parse(source_url).ok();
        let (prefix, part) = match self {
            Self::QueryParam { name, prefix } => {
                let value = parsed.as_ref().and_then(|url| {
                    url.query_pairs()
                        .find(|(key, _)| key == name.as_str())
                        .map(|(_, value)| value.into_owned())
                });
                (prefix, value)
            }
            Self::PathSegment { from_end, prefix } => {
                let segment = parsed.as_ref().and_then(|url| {
                    let segments: Vec<&str> = url
                        .path_segments()
                        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
                        .unwrap_or_default();
                    from_end
                        .checked_sub(1)
                        .and_then(|offset| segments.len().checked_sub(offset + 1))
                        .and_then(|idx| segments.get(idx))
                        .map(|seg| (*seg).to_string())
                });
                (prefix, segment)
            }
        };

        let part = part
            .map(|p| sanitize_stem(&p))
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        format!("{prefix}{part}")
    }
}

/// Keep `[A-Za-z0-9._-]`, replace everything else with `_`
fn sanitize_stem(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Everything needed to scrape one store's review listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceProfile {
    pub name: String,

    /// Host names this profile applies to
    pub hosts: Vec<String>,

    /// Platform label stamped on records when no platform field resolves
    pub platform: Option<String>,

    pub fields: Vec<FieldSpec>,

    /// Repeating review container probed by discovery
    pub item_locator: LocatorTemplate,

    /// Optional end-of-listing marker that stops discovery early
    #[serde(default)]
    pub end_marker: Option<LocatorTemplate>,

    pub bound: BoundStrategy,

    /// First position to extract (1-based)
    pub start_index: u32,

    /// Click performed after navigation to reveal the full review list
    #[serde(default)]
    pub open_reviews: Option<ClickAction>,

    pub file_naming: FileNaming,
}

impl SourceProfile {
    /// Whether this profile handles the given URL
    pub fn matches(&self, source_url: &str) -> bool {
        Url::parse(source_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
            .is_some_and(|host| self.hosts.iter().any(|h| h.eq_ignore_ascii_case(&host)))
    }

    /// Apple App Store "see all reviews" page
    ///
    /// The listing renders a fixed window of reviews, so no discovery runs.
    pub fn app_store() -> Self {
        let xp = LocatorTemplate::xpath;
        Self {
            name: "app_store".to_string(),
            hosts: vec!["apps.apple.com".to_string()],
            platform: Some("iOS".to_string()),
            fields: vec![
                FieldSpec::text(ReviewField::AppName, xp("//a[@class='see-all-header__link link']")).page_scoped(),
                FieldSpec::text(
                    ReviewField::Title,
                    xp("(//h3[@class='we-truncate we-truncate--single-line  we-customer-review__title'])[{index}]"),
                ),
                FieldSpec::text(
                    ReviewField::ReviewerName,
                    xp("(//span[@class='we-truncate we-truncate--single-line  we-customer-review__user'])[{index}]"),
                ),
                FieldSpec::attribute(
                    ReviewField::Date,
                    xp("(//time[@class='we-customer-review__date'])[{index}]"),
                    "aria-label",
                ),
                FieldSpec::attribute(
                    ReviewField::Rating,
                    xp("(//figure[@class='we-star-rating we-customer-review__rating we-star-rating--large' and contains(@aria-label, 'von 5')])[{index}]"),
                    "aria-label",
                ),
                FieldSpec::text(ReviewField::Body, xp("(//div[@class='we-clamp'])[{index}]")),
            ],
            item_locator: xp("(//div[contains(@class, 'we-customer-review')])[{index}]"),
            end_marker: None,
            bound: BoundStrategy::Fixed { count: 10 },
            start_index: 1,
            open_reviews: None,
            file_naming: FileNaming::PathSegment {
                from_end: 2,
                prefix: "app_store_reviews_".to_string(),
            },
        }
    }

    /// Google Play details page with the "all reviews" dialog
    ///
    /// The dialog lazily appends reviews while scrolling, so the bound is
    /// discovered. The first three cards belong to the details page preview.
    pub fn google_play() -> Self {
        let xp = LocatorTemplate::xpath;
        Self {
            name: "google_play".to_string(),
            hosts: vec!["play.google.com".to_string()],
            platform: None,
            fields: vec![
                FieldSpec::text(ReviewField::AppName, xp("//h1[@itemprop='name']")).page_scoped(),
                FieldSpec::text(
                    ReviewField::Platform,
                    xp("(//i[@class='google-material-icons Ka7T4c'])[last()]"),
                )
                .page_scoped(),
                FieldSpec::text(ReviewField::ReviewerName, xp("(//div[@class='X5PpBb'])[{index}]")),
                FieldSpec::text(ReviewField::Date, xp("(//span[@class='bp9Aid'])[{index}]")),
                FieldSpec::attribute(
                    ReviewField::Rating,
                    xp("(//div[@class='iXRFPc' and contains(@aria-label, 'Mit')])[{index}]"),
                    "aria-label",
                ),
                FieldSpec::text(ReviewField::Body, xp("(//div[@class='h3YV2d'])[{index}]")),
                FieldSpec::text(ReviewField::HelpfulCount, xp("(//div[@class='AJTPZc'])[{index}]")),
            ],
            item_locator: xp("//div[@class='RHo1pe'][{index}]"),
            end_marker: None,
            bound: BoundStrategy::Discover,
            start_index: 4,
            open_reviews: Some(ClickAction {
                locator: xp("//button[contains(., 'Alle Rezensionen ansehen')]"),
                label: "Alle Rezensionen ansehen".to_string(),
            }),
            file_naming: FileNaming::QueryParam {
                name: "id".to_string(),
                prefix: "reviews_".to_string(),
            },
        }
    }
}

/// The configured profiles, matched against source URLs in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceProfiles {
    pub app_store: SourceProfile,
    pub google_play: SourceProfile,
}

impl Default for SourceProfiles {
    fn default() -> Self {
        Self {
            app_store: SourceProfile::app_store(),
            google_play: SourceProfile::google_play(),
        }
    }
}

impl SourceProfiles {
    /// Pick the profile responsible for a source URL
    pub fn for_url(&self, source_url: &str) -> Option<&SourceProfile> {
        [&self.app_store, &self.google_play]
            .into_iter()
            .find(|profile| profile.matches(source_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        "https://play.google.com/store/apps/details?id=com.pix4d.capturepro&hl=de_DE",
        "reviews_com.pix4d.capturepro"
    )]
    #[case("https://play.google.com/store/apps/details?hl=de_DE", "reviews_unknown")]
    fn test_query_param_naming(#[case] url: &str, #[case] expected: &str) {
        let naming = SourceProfile::google_play().file_naming;
        assert_eq!(naming.file_stem(url), expected);
    }

    #[rstest]
    #[case(
        "https://apps.apple.com/de/app/funimate-videobearbeitung-app/id844570015?see-all=reviews",
        "app_store_reviews_funimate-videobearbeitung-app"
    )]
    #[case(
        "https://apps.apple.com/de/app/snapchat-chatte-mit-freunden/id447188370?see-all=reviews",
        "app_store_reviews_snapchat-chatte-mit-freunden"
    )]
    #[case("https://apps.apple.com/", "app_store_reviews_unknown")]
    fn test_path_segment_naming(#[case] url: &str, #[case] expected: &str) {
        let naming = SourceProfile::app_store().file_naming;
        assert_eq!(naming.file_stem(url), expected);
    }

    #[test]
    fn test_stem_is_sanitized() {
        let naming = FileNaming::QueryParam {
            name: "id".into(),
            prefix: "reviews_".into(),
        };
        assert_eq!(
            naming.file_stem("https://example.com/?id=a/b%20c"),
            "reviews_a_b_c"
        );
    }

    #[test]
    fn test_profiles_match_by_host() {
        let profiles = SourceProfiles::default();

        let apple = profiles
            .for_url("https://apps.apple.com/de/app/x/id1?see-all=reviews")
            .unwrap();
        assert_eq!(apple.name, "app_store");

        let google = profiles
            .for_url("https://play.google.com/store/apps/details?id=tiar.ua.slf")
            .unwrap();
        assert_eq!(google.name, "google_play");
        assert_eq!(google.start_index, 4);
        assert_eq!(google.bound, BoundStrategy::Discover);

        assert!(profiles.for_url("https://example.com/reviews").is_none());
        assert!(profiles.for_url("not a url").is_none());
    }

    #[test]
    fn test_builtin_profiles_keep_page_fields_page_scoped() {
        for profile in [SourceProfile::app_store(), SourceProfile::google_play()] {
            for spec in &profile.fields {
                assert_eq!(spec.is_page_scoped(), !spec.locator.is_positional(), "{:?}", spec.field);
            }
        }
    }
}
