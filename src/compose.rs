//! Page composition for the three output variants.
//!
//! All runs arrive in displayed-page coordinates (y down); the target
//! document takes care of its own page rotation.

use crate::backend::{PageRef, TargetDocument};
use crate::error::Result;
use crate::geometry::{rotated_image_placement, Matrix};
use crate::model::{EmbeddedImage, PlacedText, RasterImage, RenderMode, Rotation, SourcePage};
use crate::options::RebuildImage;

/// Image payload and placement for a rebuilt page.
///
/// A kept JPEG is still in unrotated page space, so its placement carries
/// the page rotation. A re-encoded raster is already upright.
pub fn rebuilt_embedding(
    page: &SourcePage,
    raster: &RasterImage,
    mode: RebuildImage,
) -> (EmbeddedImage, Matrix) {
    match (&raster.jpeg, mode) {
        (Some(jpeg), RebuildImage::Original) => (
            EmbeddedImage::from_jpeg(jpeg),
            rotated_image_placement(
                page.rotation,
                page.media_box.width().abs(),
                page.media_box.height().abs(),
            ),
        ),
        _ => (
            EmbeddedImage::from_pixels(&raster.pixels),
            rotated_image_placement(Rotation::None, page.width, page.height),
        ),
    }
}

/// Lay invisible runs over an original page. Clearing its marks is a
/// separate step that also applies to pages without an image.
pub fn overlay_page<T: TargetDocument + ?Sized>(
    target: &mut T,
    page: PageRef,
    runs: &[PlacedText],
) -> Result<()> {
    for run in runs {
        target.insert_text(page, &run.with_render_mode(RenderMode::Invisible))?;
    }
    Ok(())
}

/// New page with the image and invisible runs.
pub fn rebuilt_page<T: TargetDocument + ?Sized>(
    target: &mut T,
    page: &SourcePage,
    raster: &RasterImage,
    runs: &[PlacedText],
    mode: RebuildImage,
) -> Result<PageRef> {
    let out = target.add_page(page.width, page.height)?;
    let (image, placement) = rebuilt_embedding(page, raster, mode);
    target.place_image(out, &image, &placement)?;
    for run in runs {
        target.insert_text(out, &run.with_render_mode(RenderMode::Invisible))?;
    }
    Ok(out)
}

/// New text-only page with visible runs.
pub fn pure_page<T: TargetDocument + ?Sized>(
    target: &mut T,
    page: &SourcePage,
    runs: &[PlacedText],
) -> Result<PageRef> {
    let out = target.add_page(page.width, page.height)?;
    for run in runs {
        target.insert_text(out, &run.with_render_mode(RenderMode::Fill))?;
    }
    Ok(out)
}
