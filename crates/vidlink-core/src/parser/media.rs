//! Media URL matchers
//!
//! Finds the direct media-file location on a content page.

use std::fmt;

use regex_lite::{Regex, RegexBuilder};
use reqwest::Url;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VidlinkError};

/// Definition of a media-URL rule, as written in the configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UrlRule {
    /// Regular expression over the raw page body.
    ///
    /// If the pattern has a capture group, group 1 is the URL;
    /// otherwise the whole match is. Matching is case-insensitive.
    Regex { pattern: String },
    /// Attribute of the first element matching a CSS selector
    Attribute { selector: String, attribute: String },
}

/// Compiled media-URL matcher
#[derive(Debug, Clone)]
pub enum UrlMatcher {
    /// Regex over the raw body
    Regex(Regex),
    /// Element attribute lookup
    Attribute {
        selector: Selector,
        source: String,
        attribute: String,
    },
}

impl UrlMatcher {
    /// Compile a rule definition.
    ///
    /// # Errors
    /// Returns `VidlinkError::InvalidPattern` for a bad regex or selector.
    pub fn compile(rule: &UrlRule) -> Result<Self> {
        match rule {
            UrlRule::Regex { pattern } => RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map(UrlMatcher::Regex)
                .map_err(|e| {
                    VidlinkError::InvalidPattern(format!("regex {:?}: {}", pattern, e))
                }),
            UrlRule::Attribute {
                selector,
                attribute,
            } => {
                if attribute.trim().is_empty() {
                    return Err(VidlinkError::InvalidPattern(format!(
                        "selector {:?} has an empty attribute name",
                        selector
                    )));
                }
                let compiled = Selector::parse(selector).map_err(|e| {
                    VidlinkError::InvalidPattern(format!("selector {:?}: {:?}", selector, e))
                })?;
                Ok(UrlMatcher::Attribute {
                    selector: compiled,
                    source: selector.clone(),
                    attribute: attribute.clone(),
                })
            }
        }
    }

    /// Find the first URL this matcher yields, in document order.
    /// Later matches are ignored.
    ///
    /// Relative values are joined onto `base`. A value that does not end up
    /// as a single-line absolute http(s) URL is a miss.
    pub fn find(&self, body: &str, document: &Html, base: Option<&Url>) -> Option<String> {
        let raw = match self {
            UrlMatcher::Regex(re) => {
                let caps = re.captures(body)?;
                caps.get(1).or_else(|| caps.get(0))?.as_str().to_string()
            }
            UrlMatcher::Attribute {
                selector,
                attribute,
                ..
            } => document
                .select(selector)
                .filter_map(|el| el.value().attr(attribute))
                .map(str::trim)
                .find(|value| !value.is_empty())?
                .to_string(),
        };

        absolute_media_url(&decode_entities(raw.trim()), base)
    }
}

impl fmt::Display for UrlMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlMatcher::Regex(re) => write!(f, "regex {}", re.as_str()),
            UrlMatcher::Attribute {
                source, attribute, ..
            } => write!(f, "{}[{}]", source, attribute),
        }
    }
}

/// Resolve a raw match into an absolute http(s) URL.
///
/// Returns `None` for empty values, in-page anchors, values with whitespace
/// or control characters, relative values without a base and non-http schemes.
pub fn absolute_media_url(raw: &str, base: Option<&Url>) -> Option<String> {
    if raw.is_empty()
        || raw.starts_with('#')
        || raw.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return None;
    }
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(_) => base?.join(raw).ok()?,
    };
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    Some(url.to_string())
}

/// Undo the HTML escaping a URL picks up when it sits inside markup.
fn decode_entities(raw: &str) -> String {
    raw.replace("&amp;", "&")
        .replace("&#38;", "&")
        .replace("\\/", "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(rule: UrlRule, body: &str) -> Option<String> {
        find_at(rule, body, None)
    }

    fn find_at(rule: UrlRule, body: &str, base: Option<&str>) -> Option<String> {
        let matcher = UrlMatcher::compile(&rule).unwrap();
        let base = base.map(|b| Url::parse(b).unwrap());
        matcher.find(body, &Html::parse_document(body), base.as_ref())
    }

    fn source_src() -> UrlRule {
        UrlRule::Attribute {
            selector: "video source".to_string(),
            attribute: "src".to_string(),
        }
    }

    #[test]
    fn test_regex_whole_match() {
        let body = r#"<video src="https://s3.example.com/course/01.mp4"></video>"#;
        let rule = UrlRule::Regex {
            pattern: r#"https://s3\.example\.com/[^"\s]+\.mp4"#.to_string(),
        };
        assert_eq!(
            find(rule, body).as_deref(),
            Some("https://s3.example.com/course/01.mp4")
        );
    }

    #[test]
    fn test_regex_capture_group() {
        let body = r#"player.setup({ file: "https://cdn.example.com/a.mp4" })"#;
        let rule = UrlRule::Regex {
            pattern: r#"file:\s*"([^"]+)""#.to_string(),
        };
        assert_eq!(
            find(rule, body).as_deref(),
            Some("https://cdn.example.com/a.mp4")
        );
    }

    #[test]
    fn test_regex_case_insensitive() {
        let body = "HTTPS://CDN.EXAMPLE.COM/A.MP4";
        let rule = UrlRule::Regex {
            pattern: r"https://cdn\.example\.com/\S+\.mp4".to_string(),
        };
        assert_eq!(find(rule, body).as_deref(), Some("https://cdn.example.com/A.MP4"));
    }

    #[test]
    fn test_regex_decodes_escaped_ampersand() {
        let body = r#"<a href="https://cdn.example.com/a.mp4?token=1&amp;expires=2">x</a>"#;
        let rule = UrlRule::Regex {
            pattern: r#"https://cdn\.example\.com/[^"\s]+"#.to_string(),
        };
        assert_eq!(
            find(rule, body).as_deref(),
            Some("https://cdn.example.com/a.mp4?token=1&expires=2")
        );
    }

    #[test]
    fn test_regex_decodes_json_escaped_slashes() {
        let body = r#"{"file":"https:\/\/cdn.example.com\/a.mp4"}"#;
        let rule = UrlRule::Regex {
            pattern: r#""file":"([^"]+)""#.to_string(),
        };
        assert_eq!(
            find(rule, body).as_deref(),
            Some("https://cdn.example.com/a.mp4")
        );
    }

    #[test]
    fn test_attribute_skips_empty_values() {
        let body = r#"
            <video><source src=""><source src="https://cdn.example.com/b.mp4"></video>
        "#;
        let rule = UrlRule::Attribute {
            selector: "video source".to_string(),
            attribute: "src".to_string(),
        };
        assert_eq!(
            find(rule, body).as_deref(),
            Some("https://cdn.example.com/b.mp4")
        );
    }

    #[test]
    fn test_attribute_missing_element() {
        let rule = UrlRule::Attribute {
            selector: "video source".to_string(),
            attribute: "src".to_string(),
        };
        assert_eq!(find(rule, "<html><body></body></html>"), None);
    }

    #[test]
    fn test_relative_source_joined_onto_page_url() {
        let body = r#"<video><source src="/media/1.mp4"></video>"#;
        assert_eq!(
            find_at(source_src(), body, Some("https://learn.example.com/panel/video/1")).as_deref(),
            Some("https://learn.example.com/media/1.mp4")
        );
        assert_eq!(find(source_src(), body), None);
    }

    #[test]
    fn test_url_with_embedded_newline_is_a_miss() {
        let body = "<video><source src=\"https://cdn.example.com/a\nb.mp4\"></video>";
        assert_eq!(find_at(source_src(), body, Some("https://learn.example.com/")), None);

        let rule = UrlRule::Regex {
            pattern: r#""file":"([^"]+)""#.to_string(),
        };
        let body = "{\"file\":\"https://cdn.example.com/a\nb.mp4\"}";
        assert_eq!(find(rule, body), None);
    }

    #[test]
    fn test_fragment_and_other_schemes_are_misses() {
        let base = Some("https://learn.example.com/panel/video/1");
        let fragment = r##"<video><source src="#player"></video>"##;
        assert_eq!(find_at(source_src(), fragment, base), None);

        let blob = r#"<video><source src="blob:https://learn.example.com/9f2c"></video>"#;
        assert_eq!(find_at(source_src(), blob, base), None);
        let script = r#"<video><source src="javascript:void(0)"></video>"#;
        assert_eq!(find_at(source_src(), script, base), None);
    }

    #[test]
    fn test_invalid_regex() {
        let rule = UrlRule::Regex {
            pattern: "([a-z".to_string(),
        };
        match UrlMatcher::compile(&rule) {
            Err(VidlinkError::InvalidPattern(msg)) => assert!(msg.contains("([a-z")),
            _ => panic!("Expected InvalidPattern error"),
        }
    }

    #[test]
    fn test_empty_attribute_rejected() {
        let rule = UrlRule::Attribute {
            selector: "video".to_string(),
            attribute: " ".to_string(),
        };
        assert!(UrlMatcher::compile(&rule).is_err());
    }

    #[test]
    fn test_display() {
        let matcher = UrlMatcher::compile(&UrlRule::Attribute {
            selector: "video source".to_string(),
            attribute: "src".to_string(),
        })
        .unwrap();
        assert_eq!(matcher.to_string(), "video source[src]");
    }
}
