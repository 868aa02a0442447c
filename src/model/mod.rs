//! Data model shared by the pipeline stages.
//!
//! Types flow one way: a [`SourcePage`] yields an [`ImageStream`], which is
//! normalized into a [`RasterImage`]; the recognizer turns that into
//! [`DetectedWord`]s, which are mapped into [`PlacedText`] runs.

mod outline;
mod page;
mod placed;
mod raster;
mod word;

pub use outline::{LabelStyle, Outline, OutlineItem, PageLabelRange};
pub use page::{ImageHandle, Rotation, SourcePage};
pub use placed::{FontFamily, PdfRect, PlacedText, RenderMode};
pub use raster::{
    CcittParams, ColorSpace, DecodeArray, EmbeddedImage, ImageStream, JpegSource, RasterImage,
    StreamEncoding,
};
pub use word::{DetectedWord, Point, WordBox};
