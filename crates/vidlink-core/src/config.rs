//! Configuration file (`vidlink.toml`)
//!
//! Every section is optional; missing keys fall back to the defaults below.
//! The typed runtime pieces (client settings, season layout, pattern set,
//! filename template, dispatch settings) are built and validated from here.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::{ClientConfig, DEFAULT_USER_AGENT};
use crate::collector::SiteSettings;
use crate::dispatch::DispatchSettings;
use crate::error::{Result, VidlinkError};
use crate::naming::{sanitize_title, FilenameTemplate, SeasonLayout};
use crate::parser::{PatternSet, Ranked, TitleRule, UrlRule};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "vidlink.toml";

/// Number of cookie characters shown by [`AppConfig::redacted`]
const COOKIE_PREVIEW_LEN: usize = 20;

/// Target site and session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Page URL; `{id}` is replaced by the video ID, otherwise the ID is appended
    pub base_url: String,
    /// User-Agent header
    pub user_agent: String,
    /// Session cookies sent with every request
    pub cookies: BTreeMap<String, String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://example.com/panel/video/{id}".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cookies: BTreeMap::new(),
        }
    }
}

/// Inclusive video ID range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeConfig {
    pub start: u32,
    pub end: u32,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self { start: 1, end: 1 }
    }
}

/// Season layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Episode count per season, season 1 first
    pub seasons: Vec<u32>,
    /// Season of the first video in the range (1-based)
    pub starting_season: u32,
    /// Episode of the first video in the range (1-based)
    pub starting_episode: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            seasons: vec![10],
            starting_season: 1,
            starting_episode: 1,
        }
    }
}

/// Fetch pacing and retries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Lower bound of the random delay between requests, in milliseconds
    pub min_delay_ms: u64,
    /// Upper bound of the random delay between requests, in milliseconds
    pub max_delay_ms: u64,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Attempts per page, including the first
    pub max_retries: u32,
    /// Base of the exponential retry backoff, in milliseconds
    pub backoff_base_ms: u64,
    /// Bodies shorter than this are treated as not fully loaded
    pub min_body_len: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let client = ClientConfig::default();
        Self {
            min_delay_ms: client.min_delay.as_millis() as u64,
            max_delay_ms: client.max_delay.as_millis() as u64,
            timeout_secs: client.timeout.as_secs(),
            max_retries: client.max_retries,
            backoff_base_ms: client.backoff_base.as_millis() as u64,
            min_body_len: client.min_body_len,
        }
    }
}

/// Extraction rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternsConfig {
    pub media: Vec<Ranked<UrlRule>>,
    pub title: Vec<Ranked<TitleRule>>,
}

impl Default for PatternsConfig {
    fn default() -> Self {
        Self {
            media: vec![
                Ranked::new(
                    0,
                    UrlRule::Regex {
                        pattern: r#"https://s3\.example\.com/[^"\s]+\.mp4"#.to_string(),
                    },
                ),
                Ranked::new(
                    10,
                    UrlRule::Attribute {
                        selector: "video source".to_string(),
                        attribute: "src".to_string(),
                    },
                ),
            ],
            title: vec![
                Ranked::new(
                    0,
                    TitleRule::Css {
                        selector: "h1".to_string(),
                    },
                ),
                Ranked::new(
                    10,
                    TitleRule::Meta {
                        name: "og:title".to_string(),
                    },
                ),
            ],
        }
    }
}

/// Output files and naming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Link list written by `collect` and read by `dispatch`
    pub links_file: PathBuf,
    /// Filename template
    pub filename_format: String,
    /// Title used when no title rule matches
    pub default_title: String,
    /// Save each fetched page as `debug_<id>.html`
    pub debug_capture: bool,
    /// Directory of the debug pages
    pub debug_dir: PathBuf,
    /// Directory of `collect.log` and `dispatch.log`
    pub log_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            links_file: PathBuf::from("download_links.txt"),
            filename_format: FilenameTemplate::DEFAULT.to_string(),
            default_title: "Unknown_Title".to_string(),
            debug_capture: false,
            debug_dir: PathBuf::from("debug"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// Dispatch defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Directory download managers save into
    pub destination: PathBuf,
    /// Pause between download-manager invocations, in milliseconds
    pub manager_delay_ms: u64,
    /// Pause between browser tabs, in milliseconds
    pub browser_delay_ms: u64,
    /// Path of the download manager executable, if not on PATH
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_program: Option<String>,
    /// Clipboard command reading from stdin
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clipboard_command: Option<Vec<String>>,
    /// Command that opens a URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opener_command: Option<Vec<String>>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        let settings = DispatchSettings::default();
        Self {
            destination: settings.destination,
            manager_delay_ms: settings.manager_delay.as_millis() as u64,
            browser_delay_ms: settings.browser_delay.as_millis() as u64,
            manager_program: None,
            clipboard_command: None,
            opener_command: None,
        }
    }
}

/// Whole configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub range: RangeConfig,
    pub layout: LayoutConfig,
    pub fetch: FetchConfig,
    pub patterns: PatternsConfig,
    pub output: OutputConfig,
    pub dispatch: DispatchConfig,
}

impl AppConfig {
    /// Parse configuration text.
    ///
    /// # Errors
    /// Returns `VidlinkError::Config` if the text is not valid TOML for this schema.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| VidlinkError::Config(e.to_string()))
    }

    /// Load configuration from disk.
    ///
    /// # Errors
    /// Returns `VidlinkError::Io` if the file cannot be read, or
    /// `VidlinkError::Config` if it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| VidlinkError::io(path, e))?;
        Self::from_toml(&text).map_err(|e| match e {
            VidlinkError::Config(reason) => {
                VidlinkError::Config(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })
    }

    /// Write the default configuration to `path`.
    ///
    /// # Errors
    /// Returns `VidlinkError::Config` if the file already exists, or
    /// `VidlinkError::Io` if it cannot be written.
    pub fn init(path: &Path) -> Result<Self> {
        if path.exists() {
            return Err(VidlinkError::Config(format!(
                "{} already exists",
                path.display()
            )));
        }
        let config = Self::default();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| VidlinkError::io(parent, e))?;
        }
        fs::write(path, config.to_toml()?).map_err(|e| VidlinkError::io(path, e))?;
        info!(path = %path.display(), "Created default config");
        Ok(config)
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| VidlinkError::Config(e.to_string()))
    }

    /// Copy with cookie values cut to their first characters, for display.
    pub fn redacted(&self) -> Self {
        let mut shown = self.clone();
        for value in shown.site.cookies.values_mut() {
            if value.chars().count() > COOKIE_PREVIEW_LEN {
                let preview: String = value.chars().take(COOKIE_PREVIEW_LEN).collect();
                *value = format!("{}...", preview);
            }
        }
        shown
    }

    /// HTTP client settings
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            min_delay: Duration::from_millis(self.fetch.min_delay_ms),
            max_delay: Duration::from_millis(self.fetch.max_delay_ms),
            timeout: Duration::from_secs(self.fetch.timeout_secs),
            max_retries: self.fetch.max_retries,
            backoff_base: Duration::from_millis(self.fetch.backoff_base_ms),
            min_body_len: self.fetch.min_body_len,
            user_agent: self.site.user_agent.clone(),
            cookies: self.site.cookies.clone(),
        }
    }

    /// Validated season layout
    pub fn season_layout(&self) -> Result<SeasonLayout> {
        SeasonLayout::new(
            self.layout.seasons.clone(),
            self.layout.starting_season,
            self.layout.starting_episode,
        )
    }

    /// Compiled extraction rules
    ///
    /// # Errors
    /// Returns `VidlinkError::InvalidPattern` for a bad rule, or
    /// `VidlinkError::Config` when there is no media rule at all.
    pub fn pattern_set(&self) -> Result<PatternSet> {
        if self.patterns.media.is_empty() {
            return Err(VidlinkError::Config(
                "at least one [[patterns.media]] rule is required".to_string(),
            ));
        }
        PatternSet::compile(&self.patterns.media, &self.patterns.title)
    }

    /// Parsed filename template
    pub fn filename_template(&self) -> Result<FilenameTemplate> {
        FilenameTemplate::new(&self.output.filename_format)
    }

    /// Site settings of the collector
    pub fn site_settings(&self) -> SiteSettings {
        SiteSettings {
            base_url: self.site.base_url.clone(),
            default_title: self.output.default_title.clone(),
            debug_dir: self
                .output
                .debug_capture
                .then(|| self.output.debug_dir.clone()),
        }
    }

    /// Dispatch settings
    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            destination: self.dispatch.destination.clone(),
            manager_delay: Duration::from_millis(self.dispatch.manager_delay_ms),
            browser_delay: Duration::from_millis(self.dispatch.browser_delay_ms),
            manager_program: self.dispatch.manager_program.clone(),
            clipboard_command: self.dispatch.clipboard_command.clone(),
            opener_command: self.dispatch.opener_command.clone(),
        }
    }

    /// Check every runtime piece can be built.
    pub fn validate(&self) -> Result<()> {
        if self.range.start > self.range.end {
            return Err(VidlinkError::InvalidRange {
                start: self.range.start,
                end: self.range.end,
            });
        }
        if self.site.base_url.trim().is_empty() {
            return Err(VidlinkError::Config("site.base_url is empty".to_string()));
        }
        if sanitize_title(&self.output.default_title).is_empty() {
            return Err(VidlinkError::Config(
                "output.default_title is empty once made filename-safe".to_string(),
            ));
        }
        self.season_layout()?;
        self.pattern_set()?;
        self.filename_template()?;
        Ok(())
    }
}
