//! Content extraction for uploaded documents.
//!
//! Pulls raw UTF-8 text out of a file on disk. PDF parsing is delegated
//! to `pdf-extract`; plain text and markdown are read as-is. Extraction
//! failures never panic; the indexing pipeline reports and skips the item.

use std::path::Path;

use crate::models::Document;

/// Extraction error. The pipeline surfaces these as warnings and skips
/// the affected file.
#[derive(Debug)]
pub enum ExtractError {
    Io(String),
    Pdf(String),
    UnsupportedFileType(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Io(e) => write!(f, "read failed: {}", e),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::UnsupportedFileType(ext) => {
                write!(f, "unsupported file type: {}", ext)
            }
        }
    }
}

impl std::error::Error for ExtractError {}

/// File extensions the extractor accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md"];

/// Read a document from disk, extracting text according to its extension.
pub fn read_document(path: &Path) -> Result<Document, ExtractError> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let text = match ext.as_str() {
        "pdf" => extract_pdf(path)?,
        "txt" | "md" => {
            std::fs::read_to_string(path).map_err(|e| ExtractError::Io(e.to_string()))?
        }
        other => return Err(ExtractError::UnsupportedFileType(other.to_string())),
    };

    Ok(Document { filename, text })
}

fn extract_pdf(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path).map_err(|e| ExtractError::Io(e.to_string()))?;
    pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_plain_text_file() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"line one\nline two").unwrap();
        let doc = read_document(file.path()).unwrap();
        assert_eq!(doc.text, "line one\nline two");
        assert!(doc.filename.ends_with(".txt"));
    }

    #[test]
    fn unsupported_extension_returns_error() {
        let file = tempfile::Builder::new().suffix(".docx").tempfile().unwrap();
        let err = read_document(file.path()).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFileType(_)));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"not a pdf").unwrap();
        let err = read_document(file.path()).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn missing_file_returns_io_error() {
        let err = read_document(Path::new("/nonexistent/file.txt")).unwrap_err();
        assert!(matches!(err, ExtractError::Io(_)));
    }
}
