//! # ocrpdf
//!
//! Add an invisible, selectable OCR text layer to scanned image-only PDFs.
//!
//! Each page's image is decoded, color-normalized and rotated upright, run
//! through a text recognizer, and the recognized words are written back as
//! invisible text sized and positioned over the glyphs in the image.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ocrpdf::{process_file, ProcessOptions, TesseractRecognizer};
//!
//! fn main() -> ocrpdf::Result<()> {
//!     let mut engine = TesseractRecognizer::default();
//!     let report = process_file("scan.pdf", "scan-ocr.pdf", ProcessOptions::default(), &mut engine)?;
//!     println!("{} words on {} pages", report.words_placed(), report.pages.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Two output modes**: rebuilt pages or the original pages with marks cleared
//! - **Lossless re-embedding**: JPEG sources are kept byte-for-byte
//! - **Pure text companion**: optional `<name>-pure.pdf` with visible text only
//! - **Rotation aware**: pages with `/Rotate` get correctly oriented text
//! - **CJK support**: non-ASCII words use a CID font with UCS-2 encoding
//! - **Metadata**: page labels and outline are copied when they fit
//! - **Parallel batches**: Uses Rayon across files, never across pages

pub mod backend;
pub mod compose;
pub mod detect;
pub mod error;
pub mod finalize;
pub mod fonts;
pub mod geometry;
pub mod mapping;
pub mod model;
pub mod options;
pub mod pipeline;
pub mod raster;
pub mod recognize;

// Re-export commonly used types
pub use backend::{LopdfSource, LopdfTarget, PageRef, SaveOptions, SourceDocument, TargetDocument};
pub use detect::{is_pdf, parse_header, read_header, PdfHeader};
pub use error::{Error, Result};
pub use finalize::{pure_output_path, MetadataCopy, OutputReport};
pub use fonts::{FontMetrics, StandardMetrics};
pub use mapping::{SkipReason, WordMapper, CONFIDENCE_THRESHOLD};
pub use model::{
    DetectedWord, FontFamily, Outline, OutlineItem, PageLabelRange, PdfRect, PlacedText,
    RasterImage, RenderMode, Rotation, SourcePage, WordBox,
};
pub use options::{CancelToken, OutputMode, ProcessOptions, RebuildImage, DEFAULT_LANGUAGE};
pub use pipeline::{
    process_batch, process_file, PageObserver, PageOutcome, PageReport, Pipeline, ProcessReport,
};
pub use raster::Diagnostic;
pub use recognize::{Recognizer, TesseractRecognizer};

use std::path::Path;

/// Add a text layer to `input` with the `tesseract` binary on `PATH`.
///
/// # Example
///
/// ```no_run
/// use ocrpdf::add_text_layer;
///
/// let report = add_text_layer("scan.pdf", "scan-ocr.pdf").unwrap();
/// for diagnostic in &report.diagnostics {
///     eprintln!("{}", diagnostic);
/// }
/// ```
pub fn add_text_layer<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<ProcessReport> {
    let mut engine = TesseractRecognizer::default();
    process_file(input, output, ProcessOptions::default(), &mut engine)
}

/// Builder for running the pipeline on one document.
///
/// # Example
///
/// ```no_run
/// use ocrpdf::{Ocrpdf, TesseractRecognizer};
///
/// let mut engine = TesseractRecognizer::default();
/// let report = Ocrpdf::new()
///     .with_language("deu")
///     .with_pure()
///     .in_place()
///     .process("scan.pdf", "scan-ocr.pdf", &mut engine)?;
/// # Ok::<(), ocrpdf::Error>(())
/// ```
pub struct Ocrpdf {
    options: ProcessOptions,
}

impl Ocrpdf {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self {
            options: ProcessOptions::default(),
        }
    }

    /// Also write the pure text document.
    pub fn with_pure(mut self) -> Self {
        self.options = self.options.with_pure(true);
        self
    }

    /// Report normalized rasters to the observer.
    pub fn with_preview(mut self) -> Self {
        self.options = self.options.with_preview(true);
        self
    }

    /// Do not run the recognizer.
    pub fn without_recognition(mut self) -> Self {
        self.options = self.options.skip_recognition();
        self
    }

    /// Set the recognition language hint.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.options = self.options.with_language(language);
        self
    }

    /// Keep the original pages and clear their marks instead of rebuilding.
    pub fn in_place(mut self) -> Self {
        self.options = self.options.overlay();
        self
    }

    /// Embed the normalized raster even when the source is a JPEG.
    pub fn reencode(mut self) -> Self {
        self.options = self.options.with_rebuild_image(RebuildImage::Normalized);
        self
    }

    /// Keep image pages on which nothing was recognized.
    pub fn keep_empty_pages(mut self) -> Self {
        self.options = self.options.with_keep_empty_pages(true);
        self
    }

    /// Stop between pages once `token` is cancelled.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.options = self.options.with_cancel(token);
        self
    }

    /// The options built so far.
    pub fn options(&self) -> &ProcessOptions {
        &self.options
    }

    /// Process a file on disk.
    pub fn process<R, P, Q>(self, input: P, output: Q, recognizer: &mut R) -> Result<ProcessReport>
    where
        R: Recognizer + ?Sized,
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        process_file(input, output, self.options, recognizer)
    }

    /// Process an in-memory PDF.
    pub fn process_bytes<R, Q>(self, data: &[u8], output: Q, recognizer: &mut R) -> Result<ProcessReport>
    where
        R: Recognizer + ?Sized,
        Q: AsRef<Path>,
    {
        parse_header(data)?;
        let source = LopdfSource::load_bytes(data)?;
        Pipeline::new(self.options, recognizer).run(&source, output.as_ref())
    }
}

impl Default for Ocrpdf {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let builder = Ocrpdf::new()
            .with_pure()
            .with_language("jpn")
            .in_place()
            .reencode()
            .keep_empty_pages();
        let options = builder.options();
        assert!(options.pure);
        assert_eq!(options.language, "jpn");
        assert_eq!(options.mode, OutputMode::Overlay);
        assert_eq!(options.rebuild_image, RebuildImage::Normalized);
        assert!(options.keep_empty_pages);
    }

    #[test]
    fn test_defaults() {
        let options = Ocrpdf::default().options().clone();
        assert!(!options.pure);
        assert!(!options.skip_recognition);
        assert_eq!(options.language, DEFAULT_LANGUAGE);
        assert_eq!(options.mode, OutputMode::Rebuild);
    }

    #[test]
    fn test_process_bytes_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = |_: &image::RgbImage, _: &str| -> Result<Vec<DetectedWord>> { Ok(Vec::new()) };
        let result = Ocrpdf::new().process_bytes(b"not a pdf", dir.path().join("out.pdf"), &mut engine);
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }
}
