//! Attachments queued for the next turn of a session.

use std::path::PathBuf;

/// A bitmap captured from the clipboard, stored as tightly packed RGBA8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PastedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Where the bytes of an image attachment come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    Bitmap(PastedImage),
}

/// Kind of file an attachment is treated as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    Image,
    Pdf,
    Text,
}

impl AttachmentKind {
    pub fn label(&self) -> &'static str {
        match self {
            AttachmentKind::Image => "Image",
            AttachmentKind::Pdf => "PDF",
            AttachmentKind::Text => "File",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Attachment {
    Image(ImageSource),
    Pdf(PathBuf),
    Text(PathBuf),
}

impl Attachment {
    pub fn kind(&self) -> AttachmentKind {
        match self {
            Attachment::Image(_) => AttachmentKind::Image,
            Attachment::Pdf(_) => AttachmentKind::Pdf,
            Attachment::Text(_) => AttachmentKind::Text,
        }
    }
}

/// The three per-kind pending lists of a session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingAttachments {
    pub images: Vec<ImageSource>,
    pub pdfs: Vec<PathBuf>,
    pub texts: Vec<PathBuf>,
}

impl PendingAttachments {
    /// Queue an attachment and return its 1-based position within its kind.
    pub fn push(&mut self, attachment: Attachment) -> usize {
        match attachment {
            Attachment::Image(src) => {
                self.images.push(src);
                self.images.len()
            }
            Attachment::Pdf(path) => {
                self.pdfs.push(path);
                self.pdfs.len()
            }
            Attachment::Text(path) => {
                self.texts.push(path);
                self.texts.len()
            }
        }
    }

    /// Move every pending list out, leaving all three empty.
    pub fn take(&mut self) -> PendingAttachments {
        std::mem::take(self)
    }

    pub fn clear(&mut self) {
        self.images.clear();
        self.pdfs.clear();
        self.texts.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.pdfs.is_empty() && self.texts.is_empty()
    }
}
