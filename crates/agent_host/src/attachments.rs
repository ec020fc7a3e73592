//! Attachment classification and image payload helpers.

use crate::readers::FileReader;
use shared::{Attachment, AttachmentKind, ChatConfig, ChatMode, ImageSource, PastedImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Bounding box of attachment previews, in pixels.
pub const THUMBNAIL_SIZE: u32 = 150;

/// How a file reached the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachSource {
    Dropped,
    Pasted,
    Picked,
}

impl AttachSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachSource::Dropped => "dropped",
            AttachSource::Pasted => "pasted",
            AttachSource::Picked => "attached",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            AttachSource::Dropped => "Dropped",
            AttachSource::Pasted => "Pasted",
            AttachSource::Picked => "Attached",
        }
    }
}

/// Why a file was not queued.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    NotFound(PathBuf),
    ImagesDisabled,
    PdfDisabled,
}

impl Rejection {
    /// Inline notice shown in the conversation view.
    pub fn notice(&self, source: AttachSource) -> String {
        match self {
            Rejection::NotFound(path) => format!(
                "[!!] Error: {} file path not found: {} [!!]",
                source.title(),
                path.display()
            ),
            Rejection::ImagesDisabled => {
                "[!!] Image attachments are disabled for this LLM. [!!]".to_string()
            }
            Rejection::PdfDisabled => {
                "[!!] PDF processing is disabled. Rebuild with the `pdf` feature or enable it in settings. [!!]".to_string()
            }
        }
    }
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Decide the kind of a file from its extension.
///
/// Anything that is neither a known image nor a PDF is read as text.
pub fn kind_for_path(path: &Path, config: &ChatConfig) -> AttachmentKind {
    let ext = lowercase_extension(path).unwrap_or_default();
    if config.image_extensions.iter().any(|e| *e == ext) {
        AttachmentKind::Image
    } else if config.pdf_extensions.iter().any(|e| *e == ext) {
        AttachmentKind::Pdf
    } else {
        AttachmentKind::Text
    }
}

/// Turn a path into an attachment, or explain why it can't be one.
pub fn classify(
    path: &Path,
    config: &ChatConfig,
    mode: ChatMode,
    pdf_enabled: bool,
) -> Result<Attachment, Rejection> {
    if !path.exists() {
        return Err(Rejection::NotFound(path.to_path_buf()));
    }
    match kind_for_path(path, config) {
        AttachmentKind::Image if !mode.accepts_images() => Err(Rejection::ImagesDisabled),
        AttachmentKind::Image => Ok(Attachment::Image(ImageSource::Path(path.to_path_buf()))),
        AttachmentKind::Pdf if !pdf_enabled => Err(Rejection::PdfDisabled),
        AttachmentKind::Pdf => Ok(Attachment::Pdf(path.to_path_buf())),
        AttachmentKind::Text => Ok(Attachment::Text(path.to_path_buf())),
    }
}

/// File name for display, falling back to the full path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn to_dynamic(image: &PastedImage) -> anyhow::Result<image::DynamicImage> {
    let buffer = image::RgbaImage::from_raw(image.width, image.height, image.rgba.clone())
        .ok_or_else(|| anyhow::anyhow!("bitmap size does not match {}x{}", image.width, image.height))?;
    Ok(image::DynamicImage::ImageRgba8(buffer))
}

/// Encode a clipboard bitmap as PNG.
pub fn encode_png(image: &PastedImage) -> anyhow::Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    to_dynamic(image)?.write_to(&mut out, image::ImageOutputFormat::Png)?;
    Ok(out.into_inner())
}

/// Decode an image attachment and shrink it to fit the preview box.
pub fn thumbnail(source: &ImageSource, reader: &dyn FileReader) -> anyhow::Result<PastedImage> {
    let full = match source {
        ImageSource::Path(path) => image::load_from_memory(&reader.read_image_bytes(path)?)?,
        ImageSource::Bitmap(bitmap) => to_dynamic(bitmap)?,
    };
    // Small images are shown as they are, never enlarged.
    let small = if full.width() > THUMBNAIL_SIZE || full.height() > THUMBNAIL_SIZE {
        full.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE).to_rgba8()
    } else {
        full.to_rgba8()
    };
    Ok(PastedImage {
        width: small.width(),
        height: small.height(),
        rgba: small.into_raw(),
    })
}

/// Bytes to send (or preview) for an image attachment.
pub fn image_bytes(source: &ImageSource, reader: &dyn FileReader) -> anyhow::Result<Vec<u8>> {
    match source {
        ImageSource::Path(path) => Ok(reader.read_image_bytes(path)?),
        ImageSource::Bitmap(bitmap) => encode_png(bitmap),
    }
}

/// Preview label for the image at 1-based `position`.
pub fn image_label(source: &ImageSource, position: usize) -> String {
    match source {
        ImageSource::Path(path) => display_name(path),
        ImageSource::Bitmap(_) => format!("Pasted Image {}", position),
    }
}
