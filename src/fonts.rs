//! Font metrics used to size text runs.
//!
//! Measuring is the only font operation the pipeline needs: the size of a
//! run is solved from the width of its string at size 1.

use crate::model::FontFamily;

/// Width measurement in a named font.
pub trait FontMetrics {
    /// Width of `text` at font size 1, in text space units.
    fn unit_width(&self, text: &str, font: FontFamily) -> f32;

    /// Width of `text` at `size`.
    fn text_width(&self, text: &str, font: FontFamily, size: f32) -> f32 {
        self.unit_width(text, font) * size
    }
}

/// Metrics of the fonts the writers emit: standard-14 Helvetica and the
/// non-embedded `STSong-Light` CID font.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardMetrics;

impl FontMetrics for StandardMetrics {
    fn unit_width(&self, text: &str, font: FontFamily) -> f32 {
        let units: u32 = match font {
            FontFamily::Helvetica => text.chars().map(helvetica_width).sum(),
            FontFamily::Cjk => text.chars().map(cjk_width).sum(),
        };
        units as f32 / 1000.0
    }
}

/// Helvetica AFM advance widths for U+0020..=U+007E.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // sp ! " # $ % & ' ( ) * + , - . /
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    278, 278, 584, 584, 584, 556, 1015, // : ; < = > ? @
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    278, 278, 278, 469, 556, 333, // [ \ ] ^ _ `
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a-m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n-z
    334, 260, 334, 584, // { | } ~
];

/// Advance used for characters Helvetica has no WinAnsi glyph for.
const HELVETICA_MISSING: u32 = 556;

fn helvetica_width(c: char) -> u32 {
    match c as u32 {
        0x20..=0x7E => u32::from(HELVETICA_WIDTHS[(c as usize) - 0x20]),
        0x00..=0x1F | 0x7F => 0,
        _ => HELVETICA_MISSING,
    }
}

/// Full-width ideographs and kana take a whole em, the rest half of it.
fn cjk_width(c: char) -> u32 {
    if is_wide(c) {
        1000
    } else {
        500
    }
}

fn is_wide(c: char) -> bool {
    matches!(
        c as u32,
        0x1100..=0x115F
            | 0x2E80..=0xA4CF
            | 0xAC00..=0xD7A3
            | 0xF900..=0xFAFF
            | 0xFE30..=0xFE4F
            | 0xFF00..=0xFF60
            | 0xFFE0..=0xFFE6
            | 0x20000..=0x3FFFD
    )
}
