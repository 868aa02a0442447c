//! Raster types: the raw image stream as stored in the PDF, the normalized
//! RGB raster handed to the recognizer, and the image form we embed back.

use super::{ImageHandle, Rotation};
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Declared color space of an image XObject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRgb,
    DeviceCmyk,
    CalGray,
    CalRgb,
    /// ICC profile based; only the component count matters to us
    IccBased { components: u8 },
    /// Palette lookup into a base space
    Indexed {
        base: Box<ColorSpace>,
        hival: u8,
        lookup: Vec<u8>,
    },
    /// Anything else (Lab, Separation, DeviceN, ...)
    Other(String),
}

impl ColorSpace {
    /// Number of color components per sample.
    pub fn components(&self) -> u8 {
        match self {
            ColorSpace::DeviceGray | ColorSpace::CalGray => 1,
            ColorSpace::DeviceRgb | ColorSpace::CalRgb => 3,
            ColorSpace::DeviceCmyk => 4,
            ColorSpace::IccBased { components } => *components,
            ColorSpace::Indexed { .. } => 1,
            ColorSpace::Other(_) => 0,
        }
    }

    /// PDF-style label used in diagnostics, e.g. `/DeviceGray`.
    pub fn label(&self) -> String {
        match self {
            ColorSpace::DeviceGray => "/DeviceGray".to_string(),
            ColorSpace::DeviceRgb => "/DeviceRGB".to_string(),
            ColorSpace::DeviceCmyk => "/DeviceCMYK".to_string(),
            ColorSpace::CalGray => "/CalGray".to_string(),
            ColorSpace::CalRgb => "/CalRGB".to_string(),
            ColorSpace::IccBased { components } => format!("[/ICCBased N={}]", components),
            ColorSpace::Indexed { base, hival, .. } => {
                format!("[/Indexed {} {}]", base.label(), hival)
            }
            ColorSpace::Other(name) => format!("/{}", name),
        }
    }
}

/// A `/Decode` array, kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeArray(pub Vec<f32>);

impl DecodeArray {
    /// Whether this is exactly `[0 1]`.
    pub fn is_unit_identity(&self) -> bool {
        self.0.len() == 2 && self.0[0] == 0.0 && self.0[1] == 1.0
    }
}

impl std::fmt::Display for DecodeArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|v| format_number(*v)).collect();
        write!(f, "[{}]", parts.join(" "))
    }
}

fn format_number(v: f32) -> String {
    if v.fract() == 0.0 && v.abs() < 1e9 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

/// CCITTFaxDecode parameters (`/DecodeParms`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CcittParams {
    /// Negative = Group 4, zero = pure 1-D Group 3, positive = mixed Group 3
    pub k: i64,
    pub columns: u32,
    pub rows: Option<u32>,
    pub black_is_1: bool,
}

impl Default for CcittParams {
    fn default() -> Self {
        Self {
            k: 0,
            columns: 1728,
            rows: None,
            black_is_1: false,
        }
    }
}

/// How the bytes of an [`ImageStream`] are encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamEncoding {
    /// Raw samples; any Flate/LZW compression has already been removed
    Samples,
    /// JPEG bitstream (DCTDecode)
    Dct,
    /// CCITT fax bitstream
    Ccitt(CcittParams),
    /// A filter we cannot decode (JPXDecode, JBIG2Decode, ...)
    Unsupported(String),
}

/// An image XObject as read from the source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageStream {
    pub handle: ImageHandle,
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
    pub color_space: ColorSpace,
    /// `None` when the dictionary has no `/Decode` entry
    pub decode: Option<DecodeArray>,
    pub image_mask: bool,
    pub encoding: StreamEncoding,
    /// Every key present in the image dictionary, for diagnostics
    pub keys: Vec<String>,
    #[serde(skip_serializing)]
    pub data: Vec<u8>,
}

/// Original JPEG bytes kept for lossless re-embedding.
#[derive(Debug, Clone)]
pub struct JpegSource {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub components: u8,
}

/// A page's image after color and rotation normalization.
///
/// `pixels` is always top-left origin, 3-channel RGB, in reading orientation.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub pixels: RgbImage,
    pub source: ImageHandle,
    pub color_space: ColorSpace,
    pub decode: Option<DecodeArray>,
    /// False when the source declared no `/Decode` array
    pub decode_forced: bool,
    /// Rotation that was applied to reach reading orientation
    pub rotation: Rotation,
    /// Set when the source was a JPEG that can be embedded as-is
    pub jpeg: Option<JpegSource>,
}

impl RasterImage {
    /// Pixel width after rotation.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Pixel height after rotation.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// (width, height) in pixels after rotation.
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// Image payload written into an output document.
#[derive(Debug, Clone)]
pub enum EmbeddedImage {
    /// JPEG bytes, embedded with DCTDecode
    Jpeg {
        width: u32,
        height: u32,
        components: u8,
        data: Vec<u8>,
    },
    /// 8-bit samples, Flate-compressed by the writer
    Samples {
        width: u32,
        height: u32,
        gray: bool,
        data: Vec<u8>,
    },
}

impl EmbeddedImage {
    /// Wrap a kept JPEG source.
    pub fn from_jpeg(jpeg: &JpegSource) -> Self {
        EmbeddedImage::Jpeg {
            width: jpeg.width,
            height: jpeg.height,
            components: jpeg.components,
            data: jpeg.data.clone(),
        }
    }

    /// Re-encode a normalized raster. Neutral rasters (every pixel has
    /// r == g == b) are stored as DeviceGray.
    pub fn from_pixels(pixels: &RgbImage) -> Self {
        let (width, height) = pixels.dimensions();
        let neutral = pixels.pixels().all(|p| p[0] == p[1] && p[1] == p[2]);
        let data = if neutral {
            pixels.pixels().map(|p| p[0]).collect()
        } else {
            pixels.as_raw().clone()
        };
        EmbeddedImage::Samples {
            width,
            height,
            gray: neutral,
            data,
        }
    }

    /// Pixel dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            EmbeddedImage::Jpeg { width, height, .. } => (*width, *height),
            EmbeddedImage::Samples { width, height, .. } => (*width, *height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_decode_array_display() {
        assert_eq!(DecodeArray(vec![0.0, 1.0]).to_string(), "[0 1]");
        assert_eq!(
            DecodeArray(vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0]).to_string(),
            "[1 0 1 0 1 0]"
        );
        assert_eq!(DecodeArray(vec![0.0, 0.5]).to_string(), "[0 0.5]");
    }

    #[test]
    fn test_decode_identity() {
        assert!(DecodeArray(vec![0.0, 1.0]).is_unit_identity());
        assert!(!DecodeArray(vec![1.0, 0.0]).is_unit_identity());
        assert!(!DecodeArray(vec![0.0, 1.0, 0.0, 1.0]).is_unit_identity());
    }

    #[test]
    fn test_color_space_components_and_labels() {
        assert_eq!(ColorSpace::DeviceCmyk.components(), 4);
        assert_eq!(ColorSpace::IccBased { components: 3 }.components(), 3);
        assert_eq!(ColorSpace::DeviceRgb.label(), "/DeviceRGB");
        let indexed = ColorSpace::Indexed {
            base: Box::new(ColorSpace::DeviceRgb),
            hival: 255,
            lookup: vec![],
        };
        assert_eq!(indexed.components(), 1);
        assert_eq!(indexed.label(), "[/Indexed /DeviceRGB 255]");
    }

    #[test]
    fn test_embedded_image_detects_neutral_raster() {
        let gray = RgbImage::from_pixel(4, 2, Rgb([128, 128, 128]));
        match EmbeddedImage::from_pixels(&gray) {
            EmbeddedImage::Samples { gray, data, .. } => {
                assert!(gray);
                assert_eq!(data.len(), 8);
            }
            other => panic!("unexpected {:?}", other),
        }

        let mut color = gray.clone();
        color.put_pixel(0, 0, Rgb([255, 0, 0]));
        match EmbeddedImage::from_pixels(&color) {
            EmbeddedImage::Samples { gray, data, .. } => {
                assert!(!gray);
                assert_eq!(data.len(), 24);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
