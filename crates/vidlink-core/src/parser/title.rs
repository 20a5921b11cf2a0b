//! Title matchers
//!
//! Finds the human-readable title of a video page.

use std::fmt;

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VidlinkError};

/// Definition of a title rule, as written in the configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TitleRule {
    /// Text of the first non-empty element matching a CSS selector
    Css { selector: String },
    /// `content` of a `<meta property=..>` or `<meta name=..>` tag
    Meta { name: String },
}

/// Compiled title matcher
#[derive(Debug, Clone)]
pub struct TitleMatcher {
    selector: Selector,
    kind: TitleRule,
}

impl TitleMatcher {
    /// Compile a rule definition.
    ///
    /// # Errors
    /// Returns `VidlinkError::InvalidPattern` for a bad selector or meta name.
    pub fn compile(rule: &TitleRule) -> Result<Self> {
        let source = match rule {
            TitleRule::Css { selector } => selector.clone(),
            TitleRule::Meta { name } => {
                if name.is_empty() || name.contains('"') {
                    return Err(VidlinkError::InvalidPattern(format!(
                        "meta name {:?} is not usable",
                        name
                    )));
                }
                format!(r#"meta[property="{0}"], meta[name="{0}"]"#, name)
            }
        };

        let selector = Selector::parse(&source).map_err(|e| {
            VidlinkError::InvalidPattern(format!("selector {:?}: {:?}", source, e))
        })?;

        Ok(Self {
            selector,
            kind: rule.clone(),
        })
    }

    /// Find the first non-empty title this matcher yields.
    pub fn find(&self, document: &Html) -> Option<String> {
        document
            .select(&self.selector)
            .map(|el| match self.kind {
                TitleRule::Css { .. } => collapse_whitespace(&el.text().collect::<String>()),
                TitleRule::Meta { .. } => {
                    collapse_whitespace(el.value().attr("content").unwrap_or_default())
                }
            })
            .find(|text| !text.is_empty())
    }
}

impl fmt::Display for TitleMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TitleRule::Css { selector } => write!(f, "css {}", selector),
            TitleRule::Meta { name } => write!(f, "meta {}", name),
        }
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(rule: TitleRule, body: &str) -> Option<String> {
        TitleMatcher::compile(&rule)
            .unwrap()
            .find(&Html::parse_document(body))
    }

    #[test]
    fn test_css_skips_empty_elements() {
        let body = "<h1> </h1><h1>Second Heading</h1>";
        let rule = TitleRule::Css {
            selector: "h1".to_string(),
        };
        assert_eq!(find(rule, body).as_deref(), Some("Second Heading"));
    }

    #[test]
    fn test_css_class_selector() {
        let body = r#"<div class="video-title"><span>Part</span> <b>Two</b></div>"#;
        let rule = TitleRule::Css {
            selector: ".video-title".to_string(),
        };
        assert_eq!(find(rule, body).as_deref(), Some("Part Two"));
    }

    #[test]
    fn test_meta_property_and_name() {
        let rule = TitleRule::Meta {
            name: "og:title".to_string(),
        };
        let by_property = r#"<head><meta property="og:title" content="From Property"></head>"#;
        let by_name = r#"<head><meta name="og:title" content="From Name"></head>"#;
        assert_eq!(find(rule.clone(), by_property).as_deref(), Some("From Property"));
        assert_eq!(find(rule, by_name).as_deref(), Some("From Name"));
    }

    #[test]
    fn test_meta_without_content() {
        let rule = TitleRule::Meta {
            name: "title".to_string(),
        };
        assert_eq!(find(rule, r#"<meta name="title">"#), None);
    }

    #[test]
    fn test_meta_name_with_quote_rejected() {
        let rule = TitleRule::Meta {
            name: "og\"title".to_string(),
        };
        assert!(TitleMatcher::compile(&rule).is_err());
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
        assert_eq!(collapse_whitespace("   "), "");
    }
}
