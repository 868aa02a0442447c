//! Error types for the ocrpdf library.

use std::io;
use thiserror::Error;

/// Result type alias for ocrpdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while adding a text layer to a PDF.
///
/// Only some of these ever leave [`Pipeline::run`](crate::Pipeline::run):
/// image, recognition and metadata errors are handled at page or field
/// scope and end up in the [`ProcessReport`](crate::ProcessReport) instead.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing or navigating the PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// A required PDF object is missing.
    #[error("Missing required object: {0}")]
    MissingObject(String),

    /// Error reading or decoding an embedded image.
    #[error("Image extraction error: {0}")]
    ImageExtract(String),

    /// The embedded image uses a filter or color space we cannot decode.
    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    /// The recognizer failed for a page.
    #[error("Recognition failed on page {page}: {message}")]
    Recognition { page: usize, message: String },

    /// Page labels or outline could not be read or applied.
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// An output document could not be written.
    #[error("Failed to write {path}: {message}")]
    Write { path: String, message: String },

    /// Processing was cancelled between pages.
    #[error("Processing cancelled before page {0}")]
    Cancelled(usize),

    /// Page index is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error must abort the whole run.
    ///
    /// Everything else is recoverable at word, page or metadata scope.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::UnknownFormat
                | Error::UnsupportedVersion(_)
                | Error::PdfParse(_)
                | Error::Encrypted
                | Error::Write { .. }
                | Error::Cancelled(_)
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

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageExtract(err.to_string())
    }
}
