//! System clipboard backed by arboard.

use agent_host::clipboard::{paths_from_text, ClipboardFileProvider};
use shared::PastedImage;
use std::path::PathBuf;

/// Clipboard view for one paste.
///
/// `pasted` is the text egui already read for a paste event, if any; it
/// spares a second round-trip to the system clipboard.
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
    pasted: Option<String>,
}

impl SystemClipboard {
    pub fn open(pasted: Option<String>) -> Self {
        let inner = match arboard::Clipboard::new() {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!(error = %e, "system clipboard unavailable");
                None
            }
        };
        Self { inner, pasted }
    }
}

impl ClipboardFileProvider for SystemClipboard {
    fn text(&mut self) -> Option<String> {
        if let Some(text) = &self.pasted {
            return Some(text.clone());
        }
        let text = self.inner.as_mut()?.get_text().ok()?;
        (!text.trim().is_empty()).then_some(text)
    }

    // File managers on Linux publish copied files as a `file://` URI list;
    // a copied path shows up as plain text everywhere.
    fn file_paths(&mut self) -> Option<Vec<PathBuf>> {
        let text = self.text()?;
        paths_from_text(&text)
    }

    fn image(&mut self) -> Option<PastedImage> {
        let image = self.inner.as_mut()?.get_image().ok()?;
        Some(PastedImage {
            width: u32::try_from(image.width).ok()?,
            height: u32::try_from(image.height).ok()?,
            rgba: image.bytes.into_owned(),
        })
    }
}
