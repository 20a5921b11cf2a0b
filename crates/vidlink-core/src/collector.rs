//! Link collection
//!
//! Walks an inclusive range of video IDs, one page at a time, and turns
//! every ID into a [`VideoRecord`]. A failing ID is recorded and skipped
//! over; it still consumes its episode slot, so later IDs keep their
//! numbering. The link list is rewritten after every record.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::artifact;
use crate::client::PageClient;
use crate::config::AppConfig;
use crate::error::{Result, VidlinkError};
use crate::naming::{name_episode, sanitize_title, FilenameTemplate, SeasonLayout};
use crate::parser::PatternSet;
use crate::types::{LinkCollectionResult, ResolutionFailure, VideoRecord};

/// Placeholder replaced by the video ID in [`SiteSettings::base_url`]
pub const ID_PLACEHOLDER: &str = "{id}";

/// Where pages live and how unnamed pages are handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSettings {
    /// Page URL, with `{id}` or with the ID appended
    pub base_url: String,
    /// Title used when no title rule matches
    pub default_title: String,
    /// Directory for `debug_<id>.html` captures, `None` to disable
    pub debug_dir: Option<PathBuf>,
}

impl SiteSettings {
    /// Page URL of a video ID.
    ///
    /// # Example
    /// ```
    /// use vidlink_core::collector::SiteSettings;
    ///
    /// let site = SiteSettings {
    ///     base_url: "https://example.com/panel/video/".to_string(),
    ///     default_title: "Unknown_Title".to_string(),
    ///     debug_dir: None,
    /// };
    /// assert_eq!(site.page_url(5504), "https://example.com/panel/video/5504");
    /// ```
    pub fn page_url(&self, video_id: u32) -> String {
        if self.base_url.contains(ID_PLACEHOLDER) {
            self.base_url.replace(ID_PLACEHOLDER, &video_id.to_string())
        } else {
            format!("{}{}", self.base_url, video_id)
        }
    }
}

/// Drives fetching, extraction and naming across an ID range
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use vidlink_core::{AppConfig, LinkCollector};
///
/// # async fn example() -> Result<(), vidlink_core::VidlinkError> {
/// let config = AppConfig::load(Path::new("vidlink.toml"))?;
/// let collector = LinkCollector::from_config(&config)?;
/// let result = collector
///     .collect(config.range.start, config.range.end, &config.output.links_file)
///     .await?;
/// println!("{} of {} resolved", result.resolved().count(), result.len());
/// # Ok(())
/// # }
/// ```
pub struct LinkCollector {
    client: PageClient,
    patterns: PatternSet,
    layout: SeasonLayout,
    template: FilenameTemplate,
    site: SiteSettings,
}

impl LinkCollector {
    /// Create a collector from its parts.
    pub fn new(
        client: PageClient,
        patterns: PatternSet,
        layout: SeasonLayout,
        template: FilenameTemplate,
        site: SiteSettings,
    ) -> Self {
        Self {
            client,
            patterns,
            layout,
            template,
            site,
        }
    }

    /// Build every part from a configuration.
    ///
    /// # Errors
    /// Returns the first validation error of the configuration, or an
    /// error if the HTTP client cannot be created.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            PageClient::with_config(config.client_config())?,
            config.pattern_set()?,
            config.season_layout()?,
            config.filename_template()?,
            config.site_settings(),
        ))
    }

    /// The underlying page client
    pub fn client(&self) -> &PageClient {
        &self.client
    }

    /// Site settings in use
    pub fn site(&self) -> &SiteSettings {
        &self.site
    }

    /// Collect records for `start_id..=end_id` and keep `artifact` up to date.
    ///
    /// IDs are processed strictly in ascending order, one at a time.
    ///
    /// # Returns
    /// * `Ok(LinkCollectionResult)` with one record per ID, failures included
    /// * `Err(VidlinkError::InvalidRange)` if `start_id > end_id`
    /// * `Err(VidlinkError::LayoutExhausted)` if the range does not fit the
    ///   season layout; checked before the first request
    /// * `Err(VidlinkError::Io)` if the link list cannot be written
    pub async fn collect(
        &self,
        start_id: u32,
        end_id: u32,
        artifact_path: &Path,
    ) -> Result<LinkCollectionResult> {
        if start_id > end_id {
            return Err(VidlinkError::InvalidRange {
                start: start_id,
                end: end_id,
            });
        }
        let count = u64::from(end_id - start_id) + 1;
        self.layout.ensure_capacity(count)?;

        info!(
            start = start_id,
            end = end_id,
            count,
            first_slot = %self.layout.start(),
            "Collecting links"
        );

        let mut result = LinkCollectionResult::default();
        for (index, video_id) in (start_id..=end_id).enumerate() {
            let record = self.resolve(video_id, index as u64).await?;
            result.records.push(record);
            artifact::write_atomic(artifact_path, &result.to_entries())?;
        }

        let resolved = result.resolved().count();
        info!(
            processed = result.len(),
            resolved,
            failed = result.len() - resolved,
            requests = self.client.requests_sent(),
            links_file = %artifact_path.display(),
            "Collection finished"
        );
        Ok(result)
    }

    /// Produce the record of one ID. Only layout errors escape.
    async fn resolve(&self, video_id: u32, index: u64) -> Result<VideoRecord> {
        let (slot, label) = name_episode(index, &self.layout)?;
        let url = self.site.page_url(video_id);
        debug!(video_id, %url, %label, "Fetching page");

        let (title, media_url, failure) = match self.client.fetch(&url).await {
            Ok(page) => {
                self.capture(video_id, &page.body);
                let extraction = self.patterns.extract_at(&page.body, &url);
                let title = extraction
                    .title
                    .filter(|title| !sanitize_title(title).is_empty())
                    .unwrap_or_else(|| self.site.default_title.clone());
                match extraction.media_url {
                    Some(media_url) => (title, Some(media_url), None),
                    None => (title, None, Some(ResolutionFailure::NoMediaUrl)),
                }
            }
            Err(e) => (
                self.site.default_title.clone(),
                None,
                Some(ResolutionFailure::Network(e.to_string())),
            ),
        };

        let file_name = self.template.render(slot, &title);
        match (&media_url, &failure) {
            (Some(media_url), _) => {
                info!(video_id, %label, file = %file_name, url = %media_url, "Resolved");
            }
            (None, Some(reason)) => {
                warn!(video_id, %label, file = %file_name, %reason, "Resolution failed");
            }
            (None, None) => {}
        }

        Ok(VideoRecord {
            video_id,
            season: slot.season,
            episode: slot.episode,
            title,
            media_url,
            file_name,
            failure,
        })
    }

    /// Save a fetched page for inspection when debug capture is on.
    fn capture(&self, video_id: u32, body: &str) {
        let Some(dir) = &self.site.debug_dir else {
            return;
        };
        let path = dir.join(format!("debug_{}.html", video_id));
        let written = fs::create_dir_all(dir).and_then(|()| fs::write(&path, body));
        match written {
            Ok(()) => debug!(video_id, path = %path.display(), "Saved debug page"),
            Err(e) => warn!(video_id, path = %path.display(), error = %e, "Could not save debug page"),
        }
    }
}
