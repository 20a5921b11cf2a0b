//! Persisted link list
//!
//! The list uses the aria2 input-file layout: a URL line followed by an
//! indented `out=` option line, entries separated by blank lines.
//! Entries without a URL are kept as `#unresolved` comment lines, which
//! download managers ignore and [`parse`] reads back as skipped entries.
//!
//! ```text
//! https://cdn.example.com/v1.mp4
//!   out=S03-E01-Intro.mp4
//!
//! #unresolved	5507	S03-E04-Unknown_Title.mp4	network: HTTP 503
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, VidlinkError};
use crate::types::LinkEntry;

const UNRESOLVED_MARKER: &str = "#unresolved";
const OUT_OPTION: &str = "out=";

/// Render entries into link-list text.
pub fn render(entries: &[LinkEntry]) -> String {
    let mut text = String::new();
    for entry in entries {
        match entry.media_url.as_deref().map(str::trim) {
            Some(url) if is_url_line(url) => {
                text.push_str(url);
                text.push('\n');
                text.push_str("  ");
                text.push_str(OUT_OPTION);
                text.push_str(&single_line(&entry.file_name));
                text.push('\n');
            }
            Some(url) => {
                let note = format!("media URL {:?} cannot be stored", url);
                push_unresolved(&mut text, entry, &note);
            }
            None => push_unresolved(&mut text, entry, entry.note.as_deref().unwrap_or_default()),
        }
        text.push('\n');
    }
    text
}

/// A URL line must read back as the same single URL.
fn is_url_line(url: &str) -> bool {
    !url.is_empty()
        && !url.starts_with('#')
        && !url.chars().any(|c| c.is_whitespace() || c.is_control())
}

fn push_unresolved(text: &mut String, entry: &LinkEntry, note: &str) {
    let id = entry
        .video_id
        .map_or_else(|| "-".to_string(), |id| id.to_string());
    text.push_str(&format!(
        "{}\t{}\t{}\t{}\n",
        UNRESOLVED_MARKER,
        id,
        single_line(&entry.file_name),
        single_line(note),
    ));
}

/// Parse link-list text.
///
/// A URL without an `out=` line takes its filename from the last path
/// segment of the URL. Other comment lines and other aria2 options are
/// ignored.
///
/// # Errors
/// Returns `VidlinkError::Artifact` for an option line with no URL above
/// it, or a malformed `#unresolved` line.
pub fn parse(text: &str) -> Result<Vec<LinkEntry>> {
    let mut entries = Vec::new();
    let mut pending: Option<(String, Option<String>)> = None;

    for (number, line) in text.lines().enumerate() {
        let line_no = number + 1;

        if line.trim().is_empty() {
            flush(&mut pending, &mut entries);
            continue;
        }

        if line.starts_with(char::is_whitespace) {
            let option = line.trim();
            let Some((_, file_name)) = pending.as_mut() else {
                return Err(VidlinkError::Artifact {
                    line: line_no,
                    reason: format!("option {:?} without a preceding URL", option),
                });
            };
            if let Some(name) = option.strip_prefix(OUT_OPTION) {
                *file_name = Some(name.trim().to_string());
            }
            continue;
        }

        flush(&mut pending, &mut entries);

        if let Some(rest) = line.strip_prefix(UNRESOLVED_MARKER) {
            entries.push(parse_unresolved(rest, line_no)?);
        } else if !line.starts_with('#') {
            pending = Some((line.trim().to_string(), None));
        }
    }
    flush(&mut pending, &mut entries);

    Ok(entries)
}

/// Write entries atomically: the list is written to a sibling temp file
/// and renamed over the target.
///
/// # Errors
/// Returns `VidlinkError::Io` if the directory, temp file or rename fails.
pub fn write_atomic(path: &Path, entries: &[LinkEntry]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| VidlinkError::io(parent, e))?;
    }

    let tmp_path = temp_path(path);
    fs::write(&tmp_path, render(entries)).map_err(|e| VidlinkError::io(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| VidlinkError::io(path, e))
}

/// Read and parse a link list from disk.
///
/// # Errors
/// Returns `VidlinkError::Io` if the file cannot be read, or
/// `VidlinkError::Artifact` if it is malformed.
pub fn load(path: &Path) -> Result<Vec<LinkEntry>> {
    let text = fs::read_to_string(path).map_err(|e| VidlinkError::io(path, e))?;
    parse(&text)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "links".into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn flush(pending: &mut Option<(String, Option<String>)>, entries: &mut Vec<LinkEntry>) {
    if let Some((url, file_name)) = pending.take() {
        let file_name = file_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| file_name_from_url(&url));
        entries.push(LinkEntry::resolved(url, file_name));
    }
}

fn parse_unresolved(rest: &str, line: usize) -> Result<LinkEntry> {
    let mut fields = rest.strip_prefix('\t').unwrap_or(rest).splitn(3, '\t');

    let id_field = fields.next().unwrap_or_default().trim();
    let video_id = match id_field {
        "" | "-" => None,
        raw => Some(raw.parse::<u32>().map_err(|_| VidlinkError::Artifact {
            line,
            reason: format!("video ID {:?} is not a number", raw),
        })?),
    };

    let file_name = fields.next().unwrap_or_default().trim().to_string();
    if file_name.is_empty() {
        return Err(VidlinkError::Artifact {
            line,
            reason: "unresolved entry has no filename".to_string(),
        });
    }

    let note = fields
        .next()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    Ok(LinkEntry {
        file_name,
        media_url: None,
        video_id,
        note,
    })
}

/// Last non-empty path segment of a URL, without query or fragment.
fn file_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = path.split_once("://").map_or(path, |(_, rest)| rest);
    path.split('/')
        .skip(1)
        .filter(|segment| !segment.is_empty())
        .last()
        .unwrap_or("download")
        .to_string()
}

fn single_line(text: &str) -> String {
    text.replace(['\t', '\r', '\n'], " ")
}
