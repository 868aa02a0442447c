//! Sample filters for image streams.
//!
//! `lopdf` refuses to decompress streams whose `/Subtype` is `/Image`, so
//! Flate and LZW image data is undone here, predictors included.

use std::io::Read;

use flate2::read::{DeflateDecoder, ZlibDecoder};
use lopdf::{Dictionary, Document};
use weezl::{decode::Decoder as LzwDecoder, BitOrder};

use super::objects::{get, integer};
use crate::error::{Error, Result};

/// Filters decoded to raw samples by [`decode`].
pub fn is_sample_filter(filter: &str) -> bool {
    matches!(filter, "FlateDecode" | "Fl" | "LZWDecode" | "LZW")
}

/// `/DecodeParms` entries that matter for Flate and LZW.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterParams {
    /// 1 = none, 2 = TIFF, 10..=15 = PNG
    pub predictor: i64,
    pub colors: usize,
    pub bits_per_component: usize,
    pub columns: usize,
    /// LZW code width grows one code early (the PDF default)
    pub early_change: bool,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
            early_change: true,
        }
    }
}

impl FilterParams {
    pub fn from_dict(doc: &Document, parms: Option<&Dictionary>) -> Self {
        let mut params = Self::default();
        let Some(parms) = parms else {
            return params;
        };
        let value = |key: &[u8]| get(doc, parms, key).and_then(integer);
        if let Some(predictor) = value(b"Predictor") {
            params.predictor = predictor;
        }
        if let Some(colors) = value(b"Colors") {
            params.colors = colors.clamp(1, 32) as usize;
        }
        if let Some(bpc) = value(b"BitsPerComponent") {
            params.bits_per_component = bpc.clamp(1, 16) as usize;
        }
        if let Some(columns) = value(b"Columns") {
            params.columns = columns.max(1) as usize;
        }
        if let Some(early) = value(b"EarlyChange") {
            params.early_change = early != 0;
        }
        params
    }

    fn row_bytes(&self) -> usize {
        (self.columns * self.colors * self.bits_per_component).div_ceil(8)
    }

    /// Distance to the corresponding byte of the previous pixel.
    fn pixel_bytes(&self) -> usize {
        (self.colors * self.bits_per_component).div_ceil(8).max(1)
    }
}

/// Undo one Flate or LZW filter and its predictor.
pub fn decode(filter: &str, data: &[u8], params: &FilterParams) -> Result<Vec<u8>> {
    let decoded = match filter {
        "FlateDecode" | "Fl" => inflate(data)?,
        "LZWDecode" | "LZW" => lzw(data, params.early_change)?,
        other => return Err(Error::UnsupportedImage(format!("filter /{}", other))),
    };
    unpredict(decoded, params)
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match ZlibDecoder::new(data).read_to_end(&mut out) {
        Ok(_) => return Ok(out),
        Err(e) if !out.is_empty() => {
            log::warn!("FlateDecode stopped after {} bytes: {}", out.len(), e);
            return Ok(out);
        }
        Err(e) => log::debug!("zlib header rejected ({}), trying raw deflate", e),
    }

    out.clear();
    match DeflateDecoder::new(data).read_to_end(&mut out) {
        Ok(_) => Ok(out),
        Err(_) if !out.is_empty() => Ok(out),
        Err(e) => Err(Error::ImageExtract(format!("FlateDecode: {}", e))),
    }
}

fn lzw(data: &[u8], early_change: bool) -> Result<Vec<u8>> {
    let mut decoder = if early_change {
        LzwDecoder::with_tiff_size_switch(BitOrder::Msb, 8)
    } else {
        LzwDecoder::new(BitOrder::Msb, 8)
    };
    decoder
        .decode(data)
        .map_err(|e| Error::ImageExtract(format!("LZWDecode: {:?}", e)))
}

fn unpredict(data: Vec<u8>, params: &FilterParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data),
        2 => tiff_predictor(data, params),
        10..=15 => png_predictor(&data, params),
        other => Err(Error::UnsupportedImage(format!("predictor {}", other))),
    }
}

/// TIFF predictor 2: every sample is stored as a difference from the one
/// to its left.
fn tiff_predictor(mut data: Vec<u8>, params: &FilterParams) -> Result<Vec<u8>> {
    let row_bytes = params.row_bytes();
    let colors = params.colors;
    match params.bits_per_component {
        8 => {
            for row in data.chunks_mut(row_bytes) {
                for i in colors..row.len() {
                    row[i] = row[i].wrapping_add(row[i - colors]);
                }
            }
        }
        16 => {
            let step = colors * 2;
            for row in data.chunks_mut(row_bytes) {
                let mut i = step;
                while i + 1 < row.len() {
                    let left = u16::from_be_bytes([row[i - step], row[i - step + 1]]);
                    let value = u16::from_be_bytes([row[i], row[i + 1]]).wrapping_add(left);
                    row[i..i + 2].copy_from_slice(&value.to_be_bytes());
                    i += 2;
                }
            }
        }
        other => {
            return Err(Error::UnsupportedImage(format!(
                "TIFF predictor with {} bits per component",
                other
            )))
        }
    }
    Ok(data)
}

/// PNG predictors: each row carries its own filter type byte.
fn png_predictor(data: &[u8], params: &FilterParams) -> Result<Vec<u8>> {
    let row_bytes = params.row_bytes();
    let bpp = params.pixel_bytes();
    let stride = row_bytes + 1;
    let rows = data.len() / stride;
    if data.len() % stride != 0 {
        log::debug!(
            "PNG predictor: dropping {} trailing bytes",
            data.len() % stride
        );
    }

    let mut out = Vec::with_capacity(rows * row_bytes);
    let mut prev = vec![0u8; row_bytes];
    let mut row = vec![0u8; row_bytes];
    for chunk in data.chunks_exact(stride) {
        let (tag, encoded) = (chunk[0], &chunk[1..]);
        for i in 0..row_bytes {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prev[i];
            let up_left = if i >= bpp { prev[i - bpp] } else { 0 };
            let predicted = match tag {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((u16::from(left) + u16::from(up)) / 2) as u8,
                4 => paeth(left, up, up_left),
                other => {
                    return Err(Error::ImageExtract(format!(
                        "invalid PNG predictor tag {}",
                        other
                    )))
                }
            };
            row[i] = encoded[i].wrapping_add(predicted);
        }
        out.extend_from_slice(&row);
        std::mem::swap(&mut prev, &mut row);
    }
    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i16::from(a) + i16::from(b) - i16::from(c);
    let pa = (p - i16::from(a)).abs();
    let pb = (p - i16::from(b)).abs();
    let pc = (p - i16::from(c)).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use lopdf::dictionary;
    use std::io::Write;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_flate_without_predictor() {
        let samples: Vec<u8> = (0..=255).collect();
        let out = decode("FlateDecode", &zlib(&samples), &FilterParams::default()).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn test_flate_garbage_is_an_error() {
        let result = decode("Fl", &[0xFF, 0xFF, 0xFF, 0xFF], &FilterParams::default());
        assert!(matches!(result, Err(Error::ImageExtract(_))));
    }

    #[test]
    fn test_png_predictors() {
        // Two rows of three gray pixels: [10 20 30] then [15 25 35].
        let encoded = [
            1, 10, 10, 10, // Sub
            2, 5, 5, 5, // Up
        ];
        let params = FilterParams {
            predictor: 15,
            columns: 3,
            ..FilterParams::default()
        };
        let out = decode("FlateDecode", &zlib(&encoded), &params).unwrap();
        assert_eq!(out, vec![10, 20, 30, 15, 25, 35]);
    }

    #[test]
    fn test_png_average_and_paeth() {
        let params = FilterParams {
            predictor: 15,
            columns: 2,
            ..FilterParams::default()
        };
        // Row 0 raw [100 50]; row 1 average: [100/2 + 10, (60 + 50)/2 + 1] = [60, 56];
        // row 2 paeth: both bytes pick the byte above (60, then 56).
        let encoded = [0, 100, 50, 3, 10, 1, 4, 1, 2];
        let out = png_predictor(&encoded, &params).unwrap();
        assert_eq!(out, vec![100, 50, 60, 56, 61, 58]);
    }

    #[test]
    fn test_invalid_png_tag() {
        let params = FilterParams {
            predictor: 10,
            columns: 1,
            ..FilterParams::default()
        };
        assert!(png_predictor(&[7, 0], &params).is_err());
    }

    #[test]
    fn test_tiff_predictor_rgb() {
        let params = FilterParams {
            predictor: 2,
            colors: 3,
            columns: 2,
            ..FilterParams::default()
        };
        let out = unpredict(vec![10, 20, 30, 1, 2, 3], &params).unwrap();
        assert_eq!(out, vec![10, 20, 30, 11, 22, 33]);
    }

    #[test]
    fn test_lzw_with_early_change() {
        let samples: Vec<u8> = b"ABABABABABABABABCCCCCCCC".repeat(20);
        let encoded = weezl::encode::Encoder::with_tiff_size_switch(BitOrder::Msb, 8)
            .encode(&samples)
            .unwrap();
        let out = decode("LZWDecode", &encoded, &FilterParams::default()).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn test_params_from_dict() {
        let doc = Document::with_version("1.5");
        let parms = lopdf::dictionary! {
            "Predictor" => 12, "Colors" => 3, "Columns" => 640, "EarlyChange" => 0,
        };
        let params = FilterParams::from_dict(&doc, Some(&parms));
        assert_eq!(params.predictor, 12);
        assert_eq!(params.colors, 3);
        assert_eq!(params.columns, 640);
        assert!(!params.early_change);
        assert_eq!(params.row_bytes(), 1920);
        assert_eq!(FilterParams::from_dict(&doc, None), FilterParams::default());
    }
}
