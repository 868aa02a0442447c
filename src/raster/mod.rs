//! Page image extraction and normalization.

pub mod decode;
pub mod normalize;

pub use decode::{decode_stream, Decoded, SampleBuffer};
pub use normalize::{check_decode, normalize, rotate, rotation_code, to_rgb, Diagnostic, Normalized};
