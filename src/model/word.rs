//! Recognizer output.

use serde::{Deserialize, Serialize};

/// A point in image-pixel space (origin top-left, y down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Region reported by the recognizer, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WordBox {
    /// Four corners, starting top-left and going clockwise
    Quad([Point; 4]),
    /// Axis-aligned box given by two opposite corners
    Rect { x0: f32, y0: f32, x1: f32, y1: f32 },
}

impl WordBox {
    /// Axis-aligned rectangle from its corners.
    pub fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        WordBox::Rect { x0, y0, x1, y1 }
    }

    /// The (top-left, bottom-right) corners as emitted.
    ///
    /// Quads use their first and third points. Winding is not checked,
    /// so a malformed quad yields an inverted or degenerate pair.
    pub fn corners(&self) -> (Point, Point) {
        match *self {
            WordBox::Quad(q) => (q[0], q[2]),
            WordBox::Rect { x0, y0, x1, y1 } => (Point::new(x0, y0), Point::new(x1, y1)),
        }
    }
}

/// One recognized word or line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedWord {
    pub bbox: WordBox,
    pub text: String,
    /// Confidence in [0, 1]
    pub confidence: f32,
}

impl DetectedWord {
    pub fn new(bbox: WordBox, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            bbox,
            text: text.into(),
            confidence,
        }
    }
}
