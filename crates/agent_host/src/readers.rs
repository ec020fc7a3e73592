//! File readers used to turn attachments into model input.

use std::fs;
use std::path::{Path, PathBuf};

/// Whether this build can extract text from PDFs at all.
pub const PDF_COMPILED_IN: bool = cfg!(feature = "pdf");

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("PDF processing is disabled")]
    PdfDisabled,
    #[error("could not extract text from {}: {message}", path.display())]
    PdfParse { path: PathBuf, message: String },
}

/// Source of attachment content.
pub trait FileReader: Send + Sync {
    fn read_image_bytes(&self, path: &Path) -> Result<Vec<u8>, ReadError>;
    /// UTF-8 text; invalid byte sequences are dropped.
    fn read_text(&self, path: &Path) -> Result<String, ReadError>;
    /// Text of every page, joined by newlines.
    fn extract_pdf_text(&self, path: &Path) -> Result<String, ReadError>;
    fn pdf_enabled(&self) -> bool;
}

/// Reads attachments straight from the local filesystem.
#[derive(Debug, Clone)]
pub struct FsReader {
    pdf_enabled: bool,
}

impl FsReader {
    /// PDF support is on only when requested and compiled in.
    pub fn new(pdf_requested: bool) -> Self {
        if pdf_requested && !PDF_COMPILED_IN {
            tracing::warn!("PDF support requested but this build has no PDF backend");
        }
        Self {
            pdf_enabled: pdf_requested && PDF_COMPILED_IN,
        }
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, ReadError> {
    fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ReadError::NotFound(path.to_path_buf())
        } else {
            ReadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

impl FileReader for FsReader {
    fn read_image_bytes(&self, path: &Path) -> Result<Vec<u8>, ReadError> {
        read_bytes(path)
    }

    fn read_text(&self, path: &Path) -> Result<String, ReadError> {
        let bytes = read_bytes(path)?;
        // Skip invalid byte runs; an encoded U+FFFD in the file is kept.
        Ok(bytes.utf8_chunks().map(|chunk| chunk.valid()).collect())
    }

    fn extract_pdf_text(&self, path: &Path) -> Result<String, ReadError> {
        if !self.pdf_enabled {
            return Err(ReadError::PdfDisabled);
        }
        extract_pdf(path)
    }

    fn pdf_enabled(&self) -> bool {
        self.pdf_enabled
    }
}

#[cfg(feature = "pdf")]
fn extract_pdf(path: &Path) -> Result<String, ReadError> {
    if !path.exists() {
        return Err(ReadError::NotFound(path.to_path_buf()));
    }
    // pdf-extract panics on some malformed documents.
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text(path));
    match result {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(ReadError::PdfParse {
            path: path.to_path_buf(),
            message: format!("{:?}", e),
        }),
        Err(_) => Err(ReadError::PdfParse {
            path: path.to_path_buf(),
            message: "parser crashed".into(),
        }),
    }
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(_path: &Path) -> Result<String, ReadError> {
    Err(ReadError::PdfDisabled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_text_drops_invalid_utf8() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"caf\xC3\xA9 \xFF ok").unwrap();

        let text = FsReader::new(false).read_text(file.path()).unwrap();
        assert_eq!(text, "café  ok");
    }

    #[test]
    fn test_read_text_keeps_encoded_replacement_char() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"a\xFFb\xEF\xBF\xBDc").unwrap();

        let text = FsReader::new(false).read_text(file.path()).unwrap();
        assert_eq!(text, "ab\u{FFFD}c");
    }

    #[test]
    fn test_missing_image_is_not_found() {
        let err = FsReader::new(false)
            .read_image_bytes(Path::new("/definitely/not/here.png"))
            .unwrap_err();
        assert!(matches!(err, ReadError::NotFound(_)));
    }

    #[test]
    fn test_disabled_pdf_support_rejects_extraction() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let reader = FsReader::new(false);
        assert!(!reader.pdf_enabled());
        assert!(matches!(
            reader.extract_pdf_text(file.path()),
            Err(ReadError::PdfDisabled)
        ));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_garbage_pdf_is_a_parse_error() {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"this is not a pdf").unwrap();

        let err = FsReader::new(true).extract_pdf_text(file.path()).unwrap_err();
        assert!(matches!(err, ReadError::PdfParse { .. }));
    }
}
