//! Season/episode naming
//!
//! Maps the zero-based video index of a collection run onto a
//! (season, episode) slot of a [`SeasonLayout`], and renders the final
//! filename from a [`FilenameTemplate`].

use std::fmt;
use std::ops::ControlFlow;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VidlinkError};

/// A (season, episode) position, both 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpisodeSlot {
    /// Season number (1-based)
    pub season: u32,
    /// Episode number within the season (1-based)
    pub episode: u32,
}

impl EpisodeSlot {
    /// Create a slot
    pub fn new(season: u32, episode: u32) -> Self {
        Self { season, episode }
    }

    /// Zero-padded label, e.g. `S03-E01`
    pub fn label(&self) -> String {
        format!("S{:02}-E{:02}", self.season, self.episode)
    }
}

impl fmt::Display for EpisodeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{:02}-E{:02}", self.season, self.episode)
    }
}

/// Episode counts per season plus the slot the first video lands on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonLayout {
    /// Episode count of each season, season 1 first
    seasons: Vec<u32>,
    /// Slot of video index 0
    start: EpisodeSlot,
}

impl SeasonLayout {
    /// Create a layout, validating that the start slot lies inside it.
    ///
    /// # Errors
    /// Returns `VidlinkError::InvalidLayout` if the layout is empty, a season
    /// has no episodes, or the starting season/episode is out of bounds.
    ///
    /// # Example
    /// ```
    /// use vidlink_core::naming::{EpisodeSlot, SeasonLayout};
    ///
    /// let layout = SeasonLayout::new(vec![13, 19, 6, 10, 10, 7], 3, 1).unwrap();
    /// assert_eq!(layout.locate(0).unwrap(), EpisodeSlot::new(3, 1));
    /// assert_eq!(layout.locate(6).unwrap(), EpisodeSlot::new(4, 1));
    /// ```
    pub fn new(seasons: Vec<u32>, starting_season: u32, starting_episode: u32) -> Result<Self> {
        if seasons.is_empty() {
            return Err(VidlinkError::InvalidLayout(
                "at least one season is required".to_string(),
            ));
        }
        if let Some(position) = seasons.iter().position(|&count| count == 0) {
            return Err(VidlinkError::InvalidLayout(format!(
                "season {} has no episodes",
                position + 1
            )));
        }
        if starting_season == 0 || starting_season as usize > seasons.len() {
            return Err(VidlinkError::InvalidLayout(format!(
                "starting season {} is outside 1..={}",
                starting_season,
                seasons.len()
            )));
        }
        let season_len = seasons[starting_season as usize - 1];
        if starting_episode == 0 || starting_episode > season_len {
            return Err(VidlinkError::InvalidLayout(format!(
                "starting episode {} is outside 1..={} of season {}",
                starting_episode, season_len, starting_season
            )));
        }

        Ok(Self {
            seasons,
            start: EpisodeSlot::new(starting_season, starting_episode),
        })
    }

    /// Episode counts per season
    pub fn seasons(&self) -> &[u32] {
        &self.seasons
    }

    /// Slot of video index 0
    pub fn start(&self) -> EpisodeSlot {
        self.start
    }

    /// Number of slots from the start slot to the end of the last season
    pub fn capacity(&self) -> u64 {
        let from_start_season: u64 = self.seasons[self.start.season as usize - 1..]
            .iter()
            .map(|&count| u64::from(count))
            .sum();
        from_start_season - u64::from(self.start.episode - 1)
    }

    /// Find the slot of a video index.
    ///
    /// Walks the seasons from the starting one, consuming the episode counts
    /// until the offset falls inside a season.
    ///
    /// # Errors
    /// Returns `VidlinkError::LayoutExhausted` if the index lies past the
    /// last season.
    pub fn locate(&self, video_index: u64) -> Result<EpisodeSlot> {
        let exhausted = || VidlinkError::LayoutExhausted {
            index: video_index,
            capacity: self.capacity(),
        };
        let offset = video_index
            .checked_add(u64::from(self.start.episode - 1))
            .ok_or_else(exhausted)?;
        let first = self.start.season as usize - 1;

        let walk = self.seasons.iter().enumerate().skip(first).try_fold(
            offset,
            |remaining, (position, &count)| {
                let count = u64::from(count);
                if remaining < count {
                    ControlFlow::Break(EpisodeSlot::new(
                        position as u32 + 1,
                        remaining as u32 + 1,
                    ))
                } else {
                    ControlFlow::Continue(remaining - count)
                }
            },
        );

        match walk {
            ControlFlow::Break(slot) => Ok(slot),
            ControlFlow::Continue(_) => Err(exhausted()),
        }
    }

    /// Check that `count` consecutive videos fit from the start slot.
    ///
    /// # Errors
    /// Returns `VidlinkError::LayoutExhausted` naming the first index that
    /// does not fit.
    pub fn ensure_capacity(&self, count: u64) -> Result<()> {
        let capacity = self.capacity();
        if count > capacity {
            return Err(VidlinkError::LayoutExhausted {
                index: capacity,
                capacity,
            });
        }
        Ok(())
    }
}

/// Locate a video index and return its slot together with its label.
pub fn name_episode(video_index: u64, layout: &SeasonLayout) -> Result<(EpisodeSlot, String)> {
    let slot = layout.locate(video_index)?;
    Ok((slot, slot.label()))
}

/// Make a title safe to use inside a filename.
///
/// Replaces `\ / : * ? " < > |` and control characters with `_`,
/// collapses whitespace and trims surrounding dots and spaces.
pub fn sanitize_title(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() && !c.is_whitespace() => '_',
            c => c,
        })
        .collect();

    replaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == '.' || c == ' ')
        .to_string()
}

/// One piece of a parsed [`FilenameTemplate`]
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Label,
    Season(usize),
    Episode(usize),
    Title,
}

/// Filename pattern with `{label}`, `{season}`, `{episode}` and `{title}`
/// placeholders. `{season:NN}` and `{episode:NN}` zero-pad to width NN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilenameTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl FilenameTemplate {
    /// Template used when none is configured
    pub const DEFAULT: &'static str = "{label}-{title}.mp4";

    /// Parse a template, rejecting unknown placeholders.
    ///
    /// # Errors
    /// Returns `VidlinkError::Config` for unknown placeholders or a template
    /// without any episode placeholder (every file would get the same name).
    pub fn new(template: &str) -> Result<Self> {
        let re = Regex::new(r"\{([a-z]+)(?::(\d{1,2}))?\}")
            .map_err(|e| VidlinkError::Config(format!("placeholder pattern: {}", e)))?;

        let mut segments = Vec::new();
        let mut last = 0;
        for caps in re.captures_iter(template) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.start() > last {
                segments.push(Segment::Literal(template[last..whole.start()].to_string()));
            }
            last = whole.end();

            let name = caps.get(1).map_or("", |m| m.as_str());
            let width = caps.get(2).and_then(|m| m.as_str().parse::<usize>().ok());
            let segment = match (name, width) {
                ("label", None) => Segment::Label,
                ("title", None) => Segment::Title,
                ("season", width) => Segment::Season(width.unwrap_or(0)),
                ("episode", width) => Segment::Episode(width.unwrap_or(0)),
                ("label" | "title", Some(_)) => {
                    return Err(VidlinkError::Config(format!(
                        "placeholder {{{}}} does not take a width",
                        name
                    )))
                }
                (other, _) => {
                    return Err(VidlinkError::Config(format!(
                        "unknown placeholder {{{}}} in filename template",
                        other
                    )))
                }
            };
            segments.push(segment);
        }
        if last < template.len() {
            segments.push(Segment::Literal(template[last..].to_string()));
        }

        if !segments
            .iter()
            .any(|s| matches!(s, Segment::Label | Segment::Episode(_)))
        {
            return Err(VidlinkError::Config(
                "filename template needs {label} or {episode}".to_string(),
            ));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// Template source
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Render a filename; the title is sanitized first.
    ///
    /// # Example
    /// ```
    /// use vidlink_core::naming::{EpisodeSlot, FilenameTemplate};
    ///
    /// let template = FilenameTemplate::default();
    /// let name = template.render(EpisodeSlot::new(6, 2), "Traits: the basics");
    /// assert_eq!(name, "S06-E02-Traits_ the basics.mp4");
    /// ```
    pub fn render(&self, slot: EpisodeSlot, title: &str) -> String {
        let title = sanitize_title(title);
        let mut name = String::with_capacity(self.source.len() + title.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => name.push_str(text),
                Segment::Label => name.push_str(&slot.label()),
                Segment::Season(width) => {
                    name.push_str(&format!("{:0width$}", slot.season, width = *width))
                }
                Segment::Episode(width) => {
                    name.push_str(&format!("{:0width$}", slot.episode, width = *width))
                }
                Segment::Title => name.push_str(&title),
            }
        }
        name
    }
}

impl Default for FilenameTemplate {
    fn default() -> Self {
        Self {
            source: Self::DEFAULT.to_string(),
            segments: vec![
                Segment::Label,
                Segment::Literal("-".to_string()),
                Segment::Title,
                Segment::Literal(".mp4".to_string()),
            ],
        }
    }
}

impl TryFrom<String> for FilenameTemplate {
    type Error = VidlinkError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<FilenameTemplate> for String {
    fn from(template: FilenameTemplate) -> Self {
        template.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_layout() -> SeasonLayout {
        SeasonLayout::new(vec![13, 19, 6, 10, 10, 7], 3, 1).unwrap()
    }

    #[test]
    fn test_locate_start_of_range() {
        assert_eq!(sample_layout().locate(0).unwrap(), EpisodeSlot::new(3, 1));
    }

    #[test]
    fn test_locate_rolls_into_next_season() {
        let layout = sample_layout();
        assert_eq!(layout.locate(5).unwrap(), EpisodeSlot::new(3, 6));
        assert_eq!(layout.locate(6).unwrap(), EpisodeSlot::new(4, 1));
        assert_eq!(layout.locate(16).unwrap(), EpisodeSlot::new(5, 1));
    }

    #[test]
    fn test_locate_mid_season_start() {
        let layout = SeasonLayout::new(vec![19, 6, 10], 2, 5).unwrap();
        assert_eq!(layout.locate(0).unwrap(), EpisodeSlot::new(2, 5));
        assert_eq!(layout.locate(1).unwrap(), EpisodeSlot::new(2, 6));
        assert_eq!(layout.locate(2).unwrap(), EpisodeSlot::new(3, 1));
    }

    #[test]
    fn test_capacity() {
        assert_eq!(sample_layout().capacity(), 6 + 10 + 10 + 7);
        let layout = SeasonLayout::new(vec![19, 6, 10], 2, 5).unwrap();
        assert_eq!(layout.capacity(), 2 + 10);
    }

    #[test]
    fn test_last_slot_and_exhaustion() {
        let layout = sample_layout();
        let last = layout.capacity() - 1;
        assert_eq!(layout.locate(last).unwrap(), EpisodeSlot::new(6, 7));

        match layout.locate(last + 1) {
            Err(VidlinkError::LayoutExhausted { index, capacity }) => {
                assert_eq!(index, last + 1);
                assert_eq!(capacity, 33);
            }
            other => panic!("Expected LayoutExhausted, got {:?}", other),
        }
    }

    #[test]
    fn test_locate_huge_index_is_exhausted() {
        let layout = SeasonLayout::new(vec![19, 6, 10], 2, 5).unwrap();
        match layout.locate(u64::MAX) {
            Err(VidlinkError::LayoutExhausted { index, capacity }) => {
                assert_eq!(index, u64::MAX);
                assert_eq!(capacity, 12);
            }
            other => panic!("Expected LayoutExhausted, got {:?}", other),
        }
    }

    #[test]
    fn test_ensure_capacity_exact_fit() {
        let layout = sample_layout();
        assert!(layout.ensure_capacity(33).is_ok());
        assert!(matches!(
            layout.ensure_capacity(34),
            Err(VidlinkError::LayoutExhausted { index: 33, capacity: 33 })
        ));
    }

    #[test]
    fn test_invalid_layouts() {
        assert!(matches!(
            SeasonLayout::new(vec![], 1, 1),
            Err(VidlinkError::InvalidLayout(_))
        ));
        assert!(matches!(
            SeasonLayout::new(vec![4, 0, 3], 1, 1),
            Err(VidlinkError::InvalidLayout(_))
        ));
        assert!(matches!(
            SeasonLayout::new(vec![4, 3], 3, 1),
            Err(VidlinkError::InvalidLayout(_))
        ));
        assert!(matches!(
            SeasonLayout::new(vec![4, 3], 0, 1),
            Err(VidlinkError::InvalidLayout(_))
        ));
        assert!(matches!(
            SeasonLayout::new(vec![4, 3], 2, 4),
            Err(VidlinkError::InvalidLayout(_))
        ));
        assert!(matches!(
            SeasonLayout::new(vec![4, 3], 2, 0),
            Err(VidlinkError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_label_format() {
        assert_eq!(EpisodeSlot::new(3, 1).label(), "S03-E01");
        assert_eq!(EpisodeSlot::new(12, 105).label(), "S12-E105");
        assert_eq!(EpisodeSlot::new(3, 1).to_string(), "S03-E01");
    }

    #[test]
    fn test_name_episode() {
        let (slot, label) = name_episode(6, &sample_layout()).unwrap();
        assert_eq!(slot, EpisodeSlot::new(4, 1));
        assert_eq!(label, "S04-E01");
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("Normal Title"), "Normal Title");
        assert_eq!(sanitize_title("What is a <T>?"), "What is a _T__");
        assert_eq!(sanitize_title("a/b\\c:d|e*f\"g"), "a_b_c_d_e_f_g");
        assert_eq!(sanitize_title("  lots \n of   space "), "lots of space");
        assert_eq!(sanitize_title("...dots..."), "dots");
        assert_eq!(sanitize_title("tab\u{0}null"), "tab_null");
    }

    #[test]
    fn test_template_render_default() {
        let template = FilenameTemplate::default();
        assert_eq!(
            template.render(EpisodeSlot::new(3, 1), "Intro: Ownership"),
            "S03-E01-Intro_ Ownership.mp4"
        );
    }

    #[test]
    fn test_default_template_matches_parsed_default() {
        assert_eq!(
            FilenameTemplate::default(),
            FilenameTemplate::new(FilenameTemplate::DEFAULT).unwrap()
        );
    }

    #[test]
    fn test_template_from_toml_string() {
        #[derive(Deserialize)]
        struct Output {
            filename_format: FilenameTemplate,
        }
        let output: Output = toml::from_str(r#"filename_format = "{label} {title}.mkv""#).unwrap();
        assert_eq!(output.filename_format.as_str(), "{label} {title}.mkv");
        assert!(toml::from_str::<Output>(r#"filename_format = "{nope}""#).is_err());
    }

    #[test]
    fn test_template_render_padding() {
        let template = FilenameTemplate::new("{season}x{episode:03} {title}.mkv").unwrap();
        assert_eq!(
            template.render(EpisodeSlot::new(2, 7), "Lifetimes"),
            "2x007 Lifetimes.mkv"
        );
    }

    #[test]
    fn test_template_rejects_unknown_placeholder() {
        assert!(matches!(
            FilenameTemplate::new("{label}-{show}.mp4"),
            Err(VidlinkError::Config(_))
        ));
        assert!(matches!(
            FilenameTemplate::new("{label}-{title:02}.mp4"),
            Err(VidlinkError::Config(_))
        ));
    }

    #[test]
    fn test_template_requires_episode_placeholder() {
        assert!(FilenameTemplate::new("{title}.mp4").is_err());
        assert!(FilenameTemplate::new("{season}-{episode}.mp4").is_ok());
    }

    fn arb_layout() -> impl Strategy<Value = SeasonLayout> {
        prop::collection::vec(1u32..25, 1..8)
            .prop_flat_map(|seasons| {
                let len = seasons.len() as u32;
                (Just(seasons), 1..=len)
            })
            .prop_flat_map(|(seasons, season)| {
                let episodes = seasons[season as usize - 1];
                (Just(seasons), Just(season), 1..=episodes)
            })
            .prop_map(|(seasons, season, episode)| {
                SeasonLayout::new(seasons, season, episode).unwrap()
            })
    }

    proptest! {
        #[test]
        fn prop_slots_strictly_increase(layout in arb_layout()) {
            let mut previous: Option<EpisodeSlot> = None;
            for index in 0..layout.capacity() {
                let slot = layout.locate(index).unwrap();
                prop_assert!(slot.episode >= 1);
                prop_assert!(slot.episode <= layout.seasons()[slot.season as usize - 1]);
                if let Some(prev) = previous {
                    prop_assert!(slot > prev);
                }
                previous = Some(slot);
            }
        }

        #[test]
        fn prop_exhaustion_exactly_at_capacity(layout in arb_layout()) {
            let capacity = layout.capacity();
            prop_assert!(layout.ensure_capacity(capacity).is_ok());
            prop_assert!(layout.locate(capacity - 1).is_ok());
            let exhausted = matches!(
                layout.locate(capacity),
                Err(VidlinkError::LayoutExhausted { .. })
            );
            prop_assert!(exhausted);
            prop_assert!(layout.ensure_capacity(capacity + 1).is_err());
        }

        #[test]
        fn prop_sanitized_title_has_no_reserved_chars(title in ".{0,40}") {
            let clean = sanitize_title(&title);
            prop_assert!(!clean.chars().any(|c| "\\/:*?\"<>|".contains(c) || c.is_control()));
        }
    }
}
