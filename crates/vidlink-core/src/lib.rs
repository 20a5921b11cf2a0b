//! vidlink core library
//!
//! Resolves direct media-file links from a range of numbered video pages on
//! an authenticated platform, names each one after a season/episode layout,
//! and hands the resulting list to an external download mechanism.
//!
//! # Features
//! - Rate-limited page fetching with randomized delays and retry backoff
//! - Ranked fallback rules for media URLs and titles
//! - Season/episode naming across seasons of different lengths
//! - Crash-safe link list, rewritten after every processed page
//! - Dispatch to IDM, aria2, wget, the clipboard or the browser

pub mod artifact;
pub mod client;
pub mod collector;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod naming;
pub mod parser;
pub mod types;

// Re-export main types for convenience
pub use client::{ClientConfig, FetchedPage, PageClient, RateLimiter};
pub use collector::{LinkCollector, SiteSettings};
pub use config::AppConfig;
pub use dispatch::{dispatch, DispatchMode, DispatchReport, DispatchSettings, LinkHandler, ManagerKind};
pub use error::{DispatchError, Result, VidlinkError};
pub use naming::{name_episode, EpisodeSlot, FilenameTemplate, SeasonLayout};
pub use parser::{Extraction, PatternSet, Ranked, TitleRule, UrlRule};
pub use types::{LinkCollectionResult, LinkEntry, ResolutionFailure, VideoRecord};
