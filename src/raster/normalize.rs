//! Color and orientation normalization.
//!
//! Samples always go through the default decode mapping. A `/Decode`
//! array is never applied; when one is present and is anything other than
//! `[0 1]` on DeviceGray, the page gets a [`Diagnostic`].

use image::{imageops, DynamicImage, GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use super::decode::{decode_stream, SampleBuffer};
use crate::error::{Error, Result};
use crate::model::{ColorSpace, ImageStream, RasterImage, Rotation, SourcePage};

/// A page whose image declares a `/Decode` array we did not honor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 0-based page index
    pub page_index: usize,
    /// Image reference, e.g. `12 0 R`
    pub image: String,
    pub decode: String,
    pub color_space: String,
    pub keys: Vec<String>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "page {}: image {} has /Decode {} with /ColorSpace {} (keys: {}); default decode used",
            self.page_index + 1,
            self.image,
            self.decode,
            self.color_space,
            self.keys.join(" ")
        )
    }
}

/// A normalized raster and any decode diagnostic raised for it.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub raster: RasterImage,
    pub diagnostic: Option<Diagnostic>,
}

/// Decode, color-convert and rotate a page's image.
pub fn normalize(stream: &ImageStream, page: &SourcePage) -> Result<Normalized> {
    let decoded = decode_stream(stream)?;

    let diagnostic = check_decode(stream, page.index);
    if let Some(d) = &diagnostic {
        log::warn!("{}", d);
    }

    let invert_cmyk = stream.decode.is_none() && stream.color_space == ColorSpace::DeviceCmyk;
    let upright = to_rgb(&decoded.samples, invert_cmyk)?;
    let pixels = rotate(upright, page.rotation);

    // JPEGs are re-embedded verbatim only when no sample mapping is involved.
    let jpeg = decoded
        .jpeg
        .filter(|j| stream.decode.is_none() && matches!(j.components, 1 | 3));

    Ok(Normalized {
        raster: RasterImage {
            pixels,
            source: stream.handle.clone(),
            color_space: stream.color_space.clone(),
            decode: stream.decode.clone(),
            decode_forced: stream.decode.is_some(),
            rotation: page.rotation,
            jpeg,
        },
        diagnostic,
    })
}

/// Diagnostic for a declared `/Decode` array, unless it is the harmless
/// `[0 1]` on DeviceGray.
pub fn check_decode(stream: &ImageStream, page_index: usize) -> Option<Diagnostic> {
    let decode = stream.decode.as_ref()?;
    if stream.color_space == ColorSpace::DeviceGray && decode.is_unit_identity() {
        return None;
    }
    Some(Diagnostic {
        page_index,
        image: stream.handle.to_string(),
        decode: decode.to_string(),
        color_space: stream.color_space.label(),
        keys: stream.keys.clone(),
    })
}

/// Expand samples to RGB. CMYK samples are inverted first when
/// `invert_cmyk` is set.
pub fn to_rgb(samples: &SampleBuffer, invert_cmyk: bool) -> Result<RgbImage> {
    let (w, h) = (samples.width, samples.height);
    let pixel_count = w as usize * h as usize;
    match samples.components {
        1 => {
            let gray = GrayImage::from_raw(w, h, samples.data[..pixel_count].to_vec())
                .ok_or_else(|| Error::ImageExtract("gray buffer size mismatch".to_string()))?;
            Ok(DynamicImage::ImageLuma8(gray).to_rgb8())
        }
        3 => RgbImage::from_raw(w, h, samples.data[..pixel_count * 3].to_vec())
            .ok_or_else(|| Error::ImageExtract("RGB buffer size mismatch".to_string())),
        4 => {
            let mut rgb = Vec::with_capacity(pixel_count * 3);
            for px in samples.data.chunks_exact(4).take(pixel_count) {
                let [c, m, y, k] = if invert_cmyk {
                    [255 - px[0], 255 - px[1], 255 - px[2], 255 - px[3]]
                } else {
                    [px[0], px[1], px[2], px[3]]
                };
                rgb.push(cmyk_channel(c, k));
                rgb.push(cmyk_channel(m, k));
                rgb.push(cmyk_channel(y, k));
            }
            RgbImage::from_raw(w, h, rgb)
                .ok_or_else(|| Error::ImageExtract("CMYK buffer size mismatch".to_string()))
        }
        n => Err(Error::UnsupportedImage(format!("{} components", n))),
    }
}

fn cmyk_channel(ink: u8, black: u8) -> u8 {
    ((255 - u32::from(ink)) * (255 - u32::from(black)) / 255) as u8
}

/// Quarter-turn code for a page rotation: `(degrees / 90 - 1) mod 3`.
///
/// 0 turns the image 90° clockwise, 1 turns it 180°, 2 turns it 90°
/// counter-clockwise. Unrotated pages have no code.
pub fn rotation_code(rotation: Rotation) -> Option<u8> {
    match rotation {
        Rotation::None => None,
        r => Some((i32::from(r.degrees() / 90) - 1).rem_euclid(3) as u8),
    }
}

/// Bring an image stored in unrotated page space into reading orientation.
pub fn rotate(image: RgbImage, rotation: Rotation) -> RgbImage {
    match rotation_code(rotation) {
        None => image,
        Some(0) => imageops::rotate90(&image),
        Some(1) => imageops::rotate180(&image),
        Some(_) => imageops::rotate270(&image),
    }
}
