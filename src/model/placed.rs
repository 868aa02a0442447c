//! Text runs ready to be written into a PDF page.

use serde::{Deserialize, Serialize};

/// A rectangle in PDF user space.
///
/// For placed text the y axis points down from the top of the displayed
/// page, matching image space; backends flip it when writing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PdfRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl PdfRect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Signed width (`x1 - x0`).
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    /// Signed height (`y1 - y0`).
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Zero width or zero height.
    pub fn is_degenerate(&self) -> bool {
        self.width() == 0.0 || self.height() == 0.0
    }
}

/// Font used for a run. Pure ASCII goes to Helvetica, everything else to
/// the CJK font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontFamily {
    Helvetica,
    Cjk,
}

impl FontFamily {
    /// Pick the family for a string.
    pub fn for_text(text: &str) -> Self {
        if text.is_ascii() {
            FontFamily::Helvetica
        } else {
            FontFamily::Cjk
        }
    }
}

/// PDF text rendering mode (`Tr`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderMode {
    /// Mode 0: fill glyphs
    Fill,
    /// Mode 3: neither fill nor stroke
    Invisible,
}

impl RenderMode {
    /// Operand for the `Tr` operator.
    pub fn operand(self) -> i64 {
        match self {
            RenderMode::Fill => 0,
            RenderMode::Invisible => 3,
        }
    }
}

/// A word positioned and sized on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedText {
    pub rect: PdfRect,
    pub text: String,
    pub font: FontFamily,
    pub font_size: f32,
    pub render_mode: RenderMode,
}

impl PlacedText {
    /// Baseline origin: left edge, visual bottom of the rectangle.
    pub fn origin(&self) -> (f32, f32) {
        (self.rect.x0, self.rect.y1)
    }

    /// Same run with another render mode.
    pub fn with_render_mode(&self, render_mode: RenderMode) -> Self {
        Self {
            render_mode,
            ..self.clone()
        }
    }
}
