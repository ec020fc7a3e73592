//! Clipboard access used by paste handling.
//!
//! The session only sees the [`ClipboardFileProvider`] capability; the app
//! picks a concrete implementation for the platform it runs on.

use regex::Regex;
use shared::PastedImage;
use std::path::{Path, PathBuf};

pub trait ClipboardFileProvider {
    /// Plain text on the clipboard, if any.
    fn text(&mut self) -> Option<String>;
    /// Files copied in a file manager.
    fn file_paths(&mut self) -> Option<Vec<PathBuf>>;
    fn image(&mut self) -> Option<PastedImage>;
}

/// Decode one `file://` URI into a local path.
fn path_from_uri(uri: &str) -> Option<PathBuf> {
    let raw = uri.trim().strip_prefix("file://")?;
    // Some file managers send `file://localhost/...`.
    let raw = raw.strip_prefix("localhost").unwrap_or(raw);
    let decoded = urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    let drive = Regex::new(r"^/([A-Za-z]):/").ok()?;
    let normalized = drive.replace(&decoded, "$1:/").into_owned();
    if normalized.is_empty() {
        return None;
    }
    Some(PathBuf::from(normalized))
}

/// Parse a `text/uri-list` payload. Lines that are not `file://` URIs
/// (including `#` comments) are skipped.
pub fn parse_uri_list(content: &str) -> Vec<PathBuf> {
    content.lines().filter_map(path_from_uri).collect()
}

/// True when pasted text is probably a file reference, not prose.
pub fn looks_like_file(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    trimmed.starts_with("file://") || Path::new(trimmed).exists()
}

/// File paths carried by clipboard text: a URI list or one existing path.
pub fn paths_from_text(text: &str) -> Option<Vec<PathBuf>> {
    let trimmed = text.trim();
    if trimmed.starts_with("file://") {
        let paths = parse_uri_list(trimmed);
        return (!paths.is_empty()).then_some(paths);
    }
    let path = Path::new(trimmed);
    if !trimmed.is_empty() && path.exists() {
        return Some(vec![path.to_path_buf()]);
    }
    None
}
