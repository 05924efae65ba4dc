//! Error types for outline and task-section extraction.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for docoutline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while validating, extracting or saving a document.
#[derive(Error, Debug)]
pub enum Error {
    /// The input file does not exist.
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The input is not a PDF (wrong extension or missing `%PDF` signature).
    #[error("Not a valid PDF file: {}", .0.display())]
    NotPdf(PathBuf),

    /// The document is encrypted.
    #[error("Encrypted PDF not supported")]
    Encrypted,

    /// The document has no pages.
    #[error("PDF has no pages")]
    EmptyDocument,

    /// The document exceeds the configured page limit.
    #[error("PDF has too many pages ({0}, max {1})")]
    TooManyPages(usize, usize),

    /// The input directory for a batch run holds no PDF files.
    #[error("No PDF files found in {}", .0.display())]
    NoInputFiles(PathBuf),

    /// Error parsing the PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// Text extraction failed for one page.
    #[error("Text extraction error on page {page}: {reason}")]
    PageExtract { page: usize, reason: String },

    /// Text extraction failed for the whole document.
    #[error("Text extraction error: {0}")]
    TextExtract(String),

    /// Page index is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),

    /// Output could not be serialized.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Output could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Two batch inputs map to the same output file.
    #[error("Output {} is already claimed by {}", path.display(), other.display())]
    OutputConflict { path: PathBuf, other: PathBuf },

    /// I/O error when reading files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// True for errors that reject a document before any processing.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::NotPdf(_)
                | Error::Encrypted
                | Error::EmptyDocument
                | Error::TooManyPages(..)
                | Error::NoInputFiles(_)
        )
    }

    /// True for failures of the underlying text/layout extraction.
    pub fn is_extraction_error(&self) -> bool {
        matches!(
            self,
            Error::PdfParse(_)
                | Error::PageExtract { .. }
                | Error::TextExtract(_)
                | Error::PageOutOfRange(..)
        )
    }

    /// True when an output could not be produced or written.
    pub fn is_serialization_error(&self) -> bool {
        matches!(
            self,
            Error::Serialize(_) | Error::Write { .. } | Error::OutputConflict { .. }
        )
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<pdf_extract::OutputError> for Error {
    fn from(err: pdf_extract::OutputError) -> Self {
        Error::TextExtract(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::TooManyPages(80, 50);
        assert_eq!(err.to_string(), "PDF has too many pages (80, max 50)");

        let err = Error::PageExtract {
            page: 3,
            reason: "bad stream".to_string(),
        };
        assert_eq!(err.to_string(), "Text extraction error on page 3: bad stream");
    }

    #[test]
    fn test_error_classes() {
        assert!(Error::Encrypted.is_input_error());
        assert!(Error::NotPdf(PathBuf::from("a.txt")).is_input_error());
        assert!(Error::PdfParse("x".into()).is_extraction_error());
        assert!(!Error::PdfParse("x".into()).is_input_error());

        let write = Error::Write {
            path: PathBuf::from("/nope/out.json"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(write.is_serialization_error());

        let conflict = Error::OutputConflict {
            path: PathBuf::from("out/report_outline.json"),
            other: PathBuf::from("in/report.pdf"),
        };
        assert!(conflict.is_serialization_error());
        assert_eq!(
            conflict.to_string(),
            "Output out/report_outline.json is already claimed by in/report.pdf"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
