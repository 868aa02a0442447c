//! Image XObject bytes to 8-bit samples.
//!
//! Output keeps the component count of the declared color space (1, 3 or
//! 4); indexed images are expanded through their palette. No `/Decode`
//! mapping is applied here.

use crate::error::{Error, Result};
use crate::model::{CcittParams, ColorSpace, ImageStream, JpegSource, StreamEncoding};

/// Interleaved 8-bit samples, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    pub width: u32,
    pub height: u32,
    /// 1 (gray), 3 (RGB) or 4 (CMYK)
    pub components: u8,
    pub data: Vec<u8>,
}

impl SampleBuffer {
    fn check(self) -> Result<Self> {
        let expected = self.width as usize * self.height as usize * self.components as usize;
        if self.width == 0 || self.height == 0 {
            return Err(Error::ImageExtract("image has zero size".to_string()));
        }
        if self.data.len() < expected {
            return Err(Error::ImageExtract(format!(
                "expected {} samples, got {}",
                expected,
                self.data.len()
            )));
        }
        Ok(self)
    }
}

/// Decoded samples plus the JPEG source when the stream was DCT-encoded.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub samples: SampleBuffer,
    pub jpeg: Option<JpegSource>,
}

/// Decode an image stream into 8-bit samples.
pub fn decode_stream(stream: &ImageStream) -> Result<Decoded> {
    match &stream.encoding {
        StreamEncoding::Dct => {
            let (samples, jpeg) = decode_jpeg(&stream.data)?;
            Ok(Decoded {
                samples,
                jpeg: Some(jpeg),
            })
        }
        StreamEncoding::Ccitt(params) => Ok(Decoded {
            samples: decode_ccitt(&stream.data, stream.width, stream.height, params)?,
            jpeg: None,
        }),
        StreamEncoding::Samples => Ok(Decoded {
            samples: decode_raw(stream)?,
            jpeg: None,
        }),
        StreamEncoding::Unsupported(filter) => Err(Error::UnsupportedImage(format!(
            "{} filter on image {}",
            filter, stream.handle
        ))),
    }
}

/// DCTDecode. Dimensions come from the JPEG header, not the dictionary.
fn decode_jpeg(data: &[u8]) -> Result<(SampleBuffer, JpegSource)> {
    let mut decoder = jpeg_decoder::Decoder::new(data);
    let pixels = decoder
        .decode()
        .map_err(|e| Error::ImageExtract(format!("JPEG: {}", e)))?;
    let info = decoder
        .info()
        .ok_or_else(|| Error::ImageExtract("JPEG: missing frame header".to_string()))?;

    let (components, data_8bit) = match info.pixel_format {
        jpeg_decoder::PixelFormat::L8 => (1, pixels),
        // Big-endian 16-bit luma; keep the high byte.
        jpeg_decoder::PixelFormat::L16 => (1, pixels.iter().step_by(2).copied().collect()),
        jpeg_decoder::PixelFormat::RGB24 => (3, pixels),
        jpeg_decoder::PixelFormat::CMYK32 => (4, pixels),
        #[allow(unreachable_patterns)]
        other => {
            return Err(Error::UnsupportedImage(format!(
                "JPEG pixel format {:?}",
                other
            )))
        }
    };

    let width = u32::from(info.width);
    let height = u32::from(info.height);
    let samples = SampleBuffer {
        width,
        height,
        components,
        data: data_8bit,
    }
    .check()?;
    let jpeg = JpegSource {
        data: data.to_vec(),
        width,
        height,
        components,
    };
    Ok((samples, jpeg))
}

/// CCITTFaxDecode to 8-bit gray (0 black, 255 white).
fn decode_ccitt(data: &[u8], width: u32, height: u32, params: &CcittParams) -> Result<SampleBuffer> {
    use fax::decoder;

    let columns = if params.columns > 0 {
        params.columns
    } else {
        width
    };
    let columns_u16 = u16::try_from(columns)
        .map_err(|_| Error::UnsupportedImage(format!("CCITT width {} too large", columns)))?;
    let rows = params.rows.or(Some(height)).and_then(|r| u16::try_from(r).ok());

    if params.k > 0 {
        return Err(Error::UnsupportedImage(format!(
            "mixed 1-D/2-D CCITT Group 3 (K={})",
            params.k
        )));
    }

    let row_len = columns as usize;
    let wanted = row_len
        .checked_mul(height as usize)
        .ok_or_else(|| Error::ImageExtract(format!("CCITT image {}x{} is too large", columns, height)))?;
    // Grows with the rows actually decoded, never from /Height alone.
    let mut out: Vec<u8> = Vec::new();
    let mut push_row = |transitions: &[u16]| {
        if out.len() >= wanted {
            return;
        }
        // Transitions alternate starting with white.
        let mut row = vec![255u8; row_len];
        let mut black = false;
        let mut start = 0usize;
        for &t in transitions {
            let end = (t as usize).min(row_len);
            if black {
                row[start.min(end)..end].fill(0);
            }
            black = !black;
            start = end;
        }
        if black && start < row_len {
            row[start..].fill(0);
        }
        out.extend_from_slice(&row);
    };

    let decoded = if params.k < 0 {
        decoder::decode_g4(data.iter().copied(), columns_u16, rows, &mut push_row)
    } else {
        decoder::decode_g3(data.iter().copied(), &mut push_row)
    };
    if decoded.is_none() && out.is_empty() {
        return Err(Error::ImageExtract("CCITT stream could not be decoded".to_string()));
    }

    if params.black_is_1 {
        for v in out.iter_mut() {
            *v = 255 - *v;
        }
    }

    // Rows beyond the declared height are dropped; missing rows stay white.
    if out.len() < wanted {
        out.try_reserve_exact(wanted - out.len()).map_err(|_| {
            Error::ImageExtract(format!(
                "CCITT image declares {} rows but only {} decoded",
                height,
                out.len() / row_len.max(1)
            ))
        })?;
        out.resize(wanted, 255);
    }

    SampleBuffer {
        width: columns,
        height,
        components: 1,
        data: out,
    }
    .check()
}

/// Uncompressed (already unfiltered) samples at 1, 2, 4, 8 or 16 bits.
fn decode_raw(stream: &ImageStream) -> Result<SampleBuffer> {
    let (bpc, components) = if stream.image_mask {
        (1u8, 1u8)
    } else {
        (stream.bits_per_component, stream.color_space.components())
    };
    if components == 0 {
        return Err(Error::UnsupportedImage(format!(
            "color space {}",
            stream.color_space.label()
        )));
    }
    if !matches!(bpc, 1 | 2 | 4 | 8 | 16) {
        return Err(Error::UnsupportedImage(format!(
            "{} bits per component",
            bpc
        )));
    }

    let width = stream.width as usize;
    let height = stream.height as usize;
    let per_row = width * components as usize;
    let stride = (per_row * bpc as usize).div_ceil(8);
    if stream.data.len() < stride * height {
        return Err(Error::ImageExtract(format!(
            "image {} is truncated: {} of {} bytes",
            stream.handle,
            stream.data.len(),
            stride * height
        )));
    }

    let mut raw = Vec::with_capacity(per_row * height);
    for row in stream.data.chunks(stride).take(height) {
        unpack_row(row, per_row, bpc, &mut raw);
    }

    match &stream.color_space {
        ColorSpace::Indexed { base, hival, lookup } if !stream.image_mask => {
            expand_palette(&raw, base, *hival, lookup, stream.width, stream.height)
        }
        _ => {
            let max = (1u32 << bpc) - 1;
            let data = raw
                .iter()
                .map(|&v| match bpc {
                    16 => (v >> 8) as u8,
                    _ => ((u32::from(v) * 255 + max / 2) / max) as u8,
                })
                .collect();
            SampleBuffer {
                width: stream.width,
                height: stream.height,
                components,
                data,
            }
            .check()
        }
    }
}

/// Read `count` samples of `bpc` bits from one padded row.
fn unpack_row(row: &[u8], count: usize, bpc: u8, out: &mut Vec<u16>) {
    match bpc {
        8 => out.extend(row.iter().take(count).map(|&b| u16::from(b))),
        16 => out.extend(
            row.chunks_exact(2)
                .take(count)
                .map(|c| u16::from_be_bytes([c[0], c[1]])),
        ),
        _ => {
            let bits = bpc as usize;
            let mask = (1u16 << bits) - 1;
            for i in 0..count {
                let bit = i * bits;
                let byte = row[bit / 8];
                let shift = 8 - bits - (bit % 8);
                out.push((u16::from(byte) >> shift) & mask);
            }
        }
    }
}

fn expand_palette(
    indices: &[u16],
    base: &ColorSpace,
    hival: u8,
    lookup: &[u8],
    width: u32,
    height: u32,
) -> Result<SampleBuffer> {
    let components = base.components();
    if components == 0 || matches!(base, ColorSpace::Indexed { .. }) {
        return Err(Error::UnsupportedImage(format!(
            "indexed base {}",
            base.label()
        )));
    }
    let n = components as usize;
    let mut data = Vec::with_capacity(indices.len() * n);
    for &index in indices {
        let entry = index.min(u16::from(hival)) as usize * n;
        for c in 0..n {
            data.push(lookup.get(entry + c).copied().unwrap_or(0));
        }
    }
    SampleBuffer {
        width,
        height,
        components,
        data,
    }
    .check()
}
