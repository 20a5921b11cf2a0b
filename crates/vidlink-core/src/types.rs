//! Data types for vidlink
//!
//! Records produced by a collection run and the link-list model shared
//! by the artifact file and the dispatcher.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::naming::EpisodeSlot;

/// Why a video ID has no media URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ResolutionFailure {
    /// The page could not be fetched after all retries
    Network(String),
    /// The page was fetched but no URL rule matched
    NoMediaUrl,
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionFailure::Network(message) => write!(f, "network: {}", message),
            ResolutionFailure::NoMediaUrl => write!(f, "no media URL on page"),
        }
    }
}

/// Outcome of processing one video ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Platform video ID
    pub video_id: u32,
    /// Season number (1-based)
    pub season: u32,
    /// Episode number within the season (1-based)
    pub episode: u32,
    /// Page title, or the configured default
    pub title: String,
    /// Direct media URL, `None` on resolution failure
    pub media_url: Option<String>,
    /// Suggested filename
    pub file_name: String,
    /// Reason for a missing URL
    pub failure: Option<ResolutionFailure>,
}

impl VideoRecord {
    /// Slot this record was named after
    pub fn slot(&self) -> EpisodeSlot {
        EpisodeSlot::new(self.season, self.episode)
    }

    /// Whether a media URL was found
    pub fn is_resolved(&self) -> bool {
        self.media_url.is_some()
    }

    /// Convert into the link-list line model
    pub fn to_entry(&self) -> LinkEntry {
        LinkEntry {
            file_name: self.file_name.clone(),
            media_url: self.media_url.clone(),
            video_id: Some(self.video_id),
            note: self.failure.as_ref().map(ToString::to_string),
        }
    }
}

/// Ordered records of one collection run, ascending by video ID
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCollectionResult {
    /// One record per processed ID
    pub records: Vec<VideoRecord>,
}

impl LinkCollectionResult {
    /// Records with a media URL
    pub fn resolved(&self) -> impl Iterator<Item = &VideoRecord> {
        self.records.iter().filter(|r| r.is_resolved())
    }

    /// Records without a media URL
    pub fn failures(&self) -> impl Iterator<Item = &VideoRecord> {
        self.records.iter().filter(|r| !r.is_resolved())
    }

    /// Link-list entries in record order
    pub fn to_entries(&self) -> Vec<LinkEntry> {
        self.records.iter().map(VideoRecord::to_entry).collect()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no ID was processed
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// One entry of a persisted link list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    /// Suggested filename
    pub file_name: String,
    /// Media URL, `None` for a flagged unresolved entry
    pub media_url: Option<String>,
    /// Platform video ID, when known
    pub video_id: Option<u32>,
    /// Free-form reason attached to unresolved entries
    pub note: Option<String>,
}

impl LinkEntry {
    /// Entry for a resolved link
    pub fn resolved(url: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            media_url: Some(url.into()),
            video_id: None,
            note: None,
        }
    }
}
