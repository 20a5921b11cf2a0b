//! Page parsers for media links and titles
//!
//! A page is read through a [`PatternSet`]: an explicitly ranked list of
//! extraction rules. Each rule is either a media-URL matcher or a title
//! matcher, rules are tried in rank order and the first one that produces
//! a value wins.
//!
//! - `media`: URL matchers (regular expression, element attribute)
//! - `title`: title matchers (CSS selector, meta tag)
//!
//! Extraction is a pure function of the page body and the rule set.

pub mod media;
pub mod title;

use reqwest::Url;
use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

pub use media::{UrlMatcher, UrlRule};
pub use title::{TitleMatcher, TitleRule};

/// A rule together with its explicit rank.
///
/// Lower priorities are tried first; rules sharing a priority keep the
/// order in which they were declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranked<T> {
    /// Rank of the rule (default: 0)
    #[serde(default)]
    pub priority: u32,
    /// The rule itself
    #[serde(flatten)]
    pub rule: T,
}

impl<T> Ranked<T> {
    /// Wrap a rule with the given priority
    pub fn new(priority: u32, rule: T) -> Self {
        Self { priority, rule }
    }
}

/// A compiled extraction rule
#[derive(Debug, Clone)]
pub enum ExtractionRule {
    /// Locates the media URL
    MediaUrl(UrlMatcher),
    /// Locates the video title
    Title(TitleMatcher),
}

/// Result of reading one page
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extraction {
    /// First media URL found, `None` when no rule matched
    pub media_url: Option<String>,
    /// First non-empty title found, `None` when no rule matched
    pub title: Option<String>,
}

/// Ordered set of extraction rules
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    /// Rules sorted by rank, declaration order preserved within a rank
    rules: Vec<(u32, ExtractionRule)>,
}

impl PatternSet {
    /// Build a pattern set from already compiled rules.
    ///
    /// Rules are sorted by priority with a stable sort.
    pub fn new(rules: Vec<(u32, ExtractionRule)>) -> Self {
        let mut rules = rules;
        rules.sort_by_key(|(priority, _)| *priority);
        Self { rules }
    }

    /// Compile rule definitions into a pattern set.
    ///
    /// # Errors
    /// Returns `VidlinkError::InvalidPattern` if any regex or selector does not compile.
    ///
    /// # Example
    /// ```
    /// use vidlink_core::parser::{PatternSet, Ranked, TitleRule, UrlRule};
    ///
    /// let patterns = PatternSet::compile(
    ///     &[Ranked::new(0, UrlRule::Regex { pattern: r#"https://cdn\.example\.com/[^"\s]+\.mp4"#.into() })],
    ///     &[Ranked::new(0, TitleRule::Css { selector: "h1".into() })],
    /// ).unwrap();
    ///
    /// let page = r#"<h1>Intro</h1><video src="https://cdn.example.com/v/1.mp4"></video>"#;
    /// let extraction = patterns.extract(page);
    /// assert_eq!(extraction.media_url.as_deref(), Some("https://cdn.example.com/v/1.mp4"));
    /// assert_eq!(extraction.title.as_deref(), Some("Intro"));
    /// ```
    pub fn compile(media: &[Ranked<UrlRule>], titles: &[Ranked<TitleRule>]) -> Result<Self> {
        let mut rules = Vec::with_capacity(media.len() + titles.len());
        for ranked in media {
            rules.push((
                ranked.priority,
                ExtractionRule::MediaUrl(UrlMatcher::compile(&ranked.rule)?),
            ));
        }
        for ranked in titles {
            rules.push((
                ranked.priority,
                ExtractionRule::Title(TitleMatcher::compile(&ranked.rule)?),
            ));
        }
        Ok(Self::new(rules))
    }

    /// Media-URL matchers in the order they are tried
    pub fn media_matchers(&self) -> impl Iterator<Item = &UrlMatcher> {
        self.rules.iter().filter_map(|(_, rule)| match rule {
            ExtractionRule::MediaUrl(matcher) => Some(matcher),
            ExtractionRule::Title(_) => None,
        })
    }

    /// Title matchers in the order they are tried
    pub fn title_matchers(&self) -> impl Iterator<Item = &TitleMatcher> {
        self.rules.iter().filter_map(|(_, rule)| match rule {
            ExtractionRule::Title(matcher) => Some(matcher),
            ExtractionRule::MediaUrl(_) => None,
        })
    }

    /// Number of rules in the set
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set has no rules at all
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Read the media URL and title from a page body.
    ///
    /// A miss on either side is reported as `None`, never as an error.
    /// Relative media URLs count as a miss; see [`PatternSet::extract_at`].
    pub fn extract(&self, body: &str) -> Extraction {
        self.extract_with_base(body, None)
    }

    /// Like [`PatternSet::extract`], resolving relative media URLs against
    /// the address the page was fetched from.
    pub fn extract_at(&self, body: &str, page_url: &str) -> Extraction {
        let base = Url::parse(page_url).ok();
        self.extract_with_base(body, base.as_ref())
    }

    fn extract_with_base(&self, body: &str, base: Option<&Url>) -> Extraction {
        let document = Html::parse_document(body);

        let media_url = self.media_matchers().find_map(|matcher| {
            let found = matcher.find(body, &document, base);
            if found.is_some() {
                debug!(rule = %matcher, "media URL matched");
            }
            found
        });

        let title = self.title_matchers().find_map(|matcher| {
            let found = matcher.find(&document);
            if found.is_some() {
                debug!(rule = %matcher, "title matched");
            }
            found
        });

        Extraction { media_url, title }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PAGE: &str = r#"
        <html>
        <head>
            <meta property="og:title" content="Meta Title">
        </head>
        <body>
            <h1 class="lesson-title">  Lesson   One </h1>
            <video><source src="https://mirror.example.com/lesson-1.mp4"></video>
            <script>var player = { file: "https://cdn.example.com/files/lesson-1.mp4" };</script>
            <a href="https://cdn.example.com/files/lesson-1-backup.mp4">backup</a>
        </body>
        </html>
    "#;

    fn regex(priority: u32, pattern: &str) -> Ranked<UrlRule> {
        Ranked::new(
            priority,
            UrlRule::Regex {
                pattern: pattern.to_string(),
            },
        )
    }

    fn css(priority: u32, selector: &str) -> Ranked<TitleRule> {
        Ranked::new(
            priority,
            TitleRule::Css {
                selector: selector.to_string(),
            },
        )
    }

    #[test]
    fn test_first_match_in_document_order_wins() {
        let patterns =
            PatternSet::compile(&[regex(0, r#"https://cdn\.example\.com/[^"\s]+\.mp4"#)], &[])
                .unwrap();
        let extraction = patterns.extract(PAGE);
        assert_eq!(
            extraction.media_url.as_deref(),
            Some("https://cdn.example.com/files/lesson-1.mp4")
        );
    }

    #[test]
    fn test_rules_are_tried_by_priority_not_declaration() {
        let media = [
            regex(5, r#"https://cdn\.example\.com/[^"\s]+\.mp4"#),
            Ranked::new(
                1,
                UrlRule::Attribute {
                    selector: "video source".to_string(),
                    attribute: "src".to_string(),
                },
            ),
        ];
        let patterns = PatternSet::compile(&media, &[]).unwrap();
        assert_eq!(
            patterns.extract(PAGE).media_url.as_deref(),
            Some("https://mirror.example.com/lesson-1.mp4")
        );
    }

    #[test]
    fn test_equal_priority_keeps_declaration_order() {
        let media = [
            regex(0, r#"https://nothing\.example\.com/[^"]+"#),
            regex(0, r#"https://cdn\.example\.com/[^"\s]+backup\.mp4"#),
            regex(0, r#"https://cdn\.example\.com/[^"\s]+\.mp4"#),
        ];
        let patterns = PatternSet::compile(&media, &[]).unwrap();
        assert_eq!(
            patterns.extract(PAGE).media_url.as_deref(),
            Some("https://cdn.example.com/files/lesson-1-backup.mp4")
        );
    }

    #[test]
    fn test_no_match_is_absent_not_error() {
        let patterns = PatternSet::compile(
            &[regex(0, r"https://s3\.example\.org/\S+\.mp4")],
            &[css(0, "h2.missing")],
        )
        .unwrap();
        assert_eq!(patterns.extract(PAGE), Extraction::default());
    }

    #[test]
    fn test_unusable_url_falls_through_to_next_rule() {
        let page = r#"<video><source src="/media/2.mp4"></video>
            <script>var poster = "blob:https://learn.example.com/9f2c";</script>"#;
        let media = [
            regex(0, r#"var poster = "([^"]+)""#),
            Ranked::new(
                1,
                UrlRule::Attribute {
                    selector: "video source".to_string(),
                    attribute: "src".to_string(),
                },
            ),
        ];
        let patterns = PatternSet::compile(&media, &[]).unwrap();

        assert_eq!(
            patterns
                .extract_at(page, "https://learn.example.com/panel/video/2")
                .media_url
                .as_deref(),
            Some("https://learn.example.com/media/2.mp4")
        );
        assert_eq!(patterns.extract(page).media_url, None);
    }

    #[test]
    fn test_title_falls_through_to_next_selector() {
        let titles = [
            css(0, ".does-not-exist"),
            Ranked::new(
                1,
                TitleRule::Meta {
                    name: "og:title".to_string(),
                },
            ),
        ];
        let patterns = PatternSet::compile(&[], &titles).unwrap();
        assert_eq!(patterns.extract(PAGE).title.as_deref(), Some("Meta Title"));
    }

    #[test]
    fn test_title_whitespace_collapsed() {
        let patterns = PatternSet::compile(&[], &[css(0, "h1")]).unwrap();
        assert_eq!(patterns.extract(PAGE).title.as_deref(), Some("Lesson One"));
    }

    #[test]
    fn test_invalid_rule_rejected_at_compile_time() {
        assert!(PatternSet::compile(&[regex(0, "(unclosed")], &[]).is_err());
        assert!(PatternSet::compile(&[], &[css(0, "h1[")]).is_err());
    }

    #[test]
    fn test_matchers_split_by_kind() {
        let patterns = PatternSet::compile(
            &[regex(0, "a"), regex(1, "b")],
            &[css(0, "h1")],
        )
        .unwrap();
        assert_eq!(patterns.len(), 3);
        assert_eq!(patterns.media_matchers().count(), 2);
        assert_eq!(patterns.title_matchers().count(), 1);
        assert!(PatternSet::default().is_empty());
    }

    #[test]
    fn test_ranked_rule_from_toml() {
        #[derive(Deserialize)]
        struct Rules {
            media: Vec<Ranked<UrlRule>>,
        }
        let rules: Rules = toml::from_str(
            r#"
            [[media]]
            kind = "regex"
            pattern = 'https://cdn\.example\.com/\S+'

            [[media]]
            kind = "attribute"
            priority = 2
            selector = "video source"
            attribute = "src"
            "#,
        )
        .unwrap();
        assert_eq!(rules.media[0].priority, 0);
        assert_eq!(rules.media[1].priority, 2);
        assert!(matches!(rules.media[1].rule, UrlRule::Attribute { .. }));
    }

    proptest! {
        #[test]
        fn prop_extraction_is_deterministic(
            slug in "[a-z0-9]{1,12}",
            title in "[A-Za-z][A-Za-z ]{0,20}",
            noise in "[a-z ]{0,40}",
        ) {
            let body = format!(
                "<html><body><p>{noise}</p><h1>{title}</h1>\
                 <script>src = \"https://cdn.example.com/{slug}.mp4\"</script></body></html>"
            );
            let patterns = PatternSet::compile(
                &[regex(0, r#"https://cdn\.example\.com/[^"\s]+\.mp4"#)],
                &[css(0, "h1")],
            ).unwrap();

            let first = patterns.extract(&body);
            let second = patterns.extract(&body);
            let fresh = PatternSet::compile(
                &[regex(0, r#"https://cdn\.example\.com/[^"\s]+\.mp4"#)],
                &[css(0, "h1")],
            ).unwrap().extract(&body);

            prop_assert_eq!(&first, &second);
            prop_assert_eq!(&first, &fresh);
            let expected_url = format!("https://cdn.example.com/{}.mp4", slug);
            prop_assert_eq!(first.media_url.as_deref(), Some(expected_url.as_str()));
        }
    }
}
