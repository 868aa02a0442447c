//! PDF document abstraction layer.
//!
//! The pipeline reads through [`SourceDocument`] and writes through
//! [`TargetDocument`], so the concrete PDF library (`lopdf`) stays behind
//! this module.

mod filters;
mod metadata;
mod objects;
mod source;
mod target;

pub use metadata::{read_outline, read_page_labels, write_outline, write_page_labels};
pub use source::LopdfSource;
pub use target::LopdfTarget;

use std::path::Path;

use crate::error::Result;
use crate::geometry::Matrix;
use crate::model::{
    EmbeddedImage, ImageHandle, ImageStream, Outline, PageLabelRange, PlacedText, SourcePage,
};

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// A page inside a [`TargetDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRef {
    /// Position in the target document (0-based)
    pub index: usize,
    pub id: PageId,
}

/// Options applied when an output document is written.
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Drop objects nothing references any more
    pub garbage_collect: bool,
    /// Flate-compress streams that have no filter yet
    pub compress: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            garbage_collect: true,
            compress: true,
        }
    }
}

/// Read access to the document being processed.
pub trait SourceDocument {
    /// Writable document type produced from this source.
    type Target: TargetDocument;

    /// Number of pages.
    fn page_count(&self) -> usize;

    /// View of one page: size, rotation and first image.
    fn source_page(&self, index: usize) -> Result<SourcePage>;

    /// Raw image XObject behind a handle, with its filters removed where
    /// possible.
    fn image_stream(&self, handle: &ImageHandle) -> Result<ImageStream>;

    /// Page label ranges; empty when the document has none.
    fn page_labels(&self) -> Result<Vec<PageLabelRange>>;

    /// Outline; empty when the document has none.
    fn outline(&self) -> Result<Outline>;

    /// A new, empty target document.
    fn new_target(&self) -> Self::Target;

    /// A writable copy of this document, page for page.
    fn overlay_target(&self) -> Result<Self::Target>;
}

/// An output document under construction.
///
/// Text coordinates in [`PlacedText`] are displayed-page coordinates with
/// the y axis pointing down; implementations convert them to the page's
/// own user space, taking its rotation into account.
pub trait TargetDocument {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Handle to a page that already exists.
    fn existing_page(&self, index: usize) -> Result<PageRef>;

    /// Append an empty, unrotated page of the given size.
    fn add_page(&mut self, width: f32, height: f32) -> Result<PageRef>;

    /// Remove text and vector marks from a page, keeping its images.
    fn clear_marks(&mut self, page: PageRef) -> Result<()>;

    /// Draw an image with the given placement matrix.
    fn place_image(&mut self, page: PageRef, image: &EmbeddedImage, matrix: &Matrix) -> Result<()>;

    /// Draw one text run.
    fn insert_text(&mut self, page: PageRef, text: &PlacedText) -> Result<()>;

    /// Replace the page labels.
    fn set_page_labels(&mut self, labels: &[PageLabelRange]) -> Result<()>;

    /// Replace the outline.
    fn set_outline(&mut self, outline: &Outline) -> Result<()>;

    /// Write the document to `path`.
    fn save(&mut self, path: &Path, options: &SaveOptions) -> Result<()>;
}
