//! Source page view.

use super::PdfRect;
use serde::{Deserialize, Serialize};

/// Opaque reference to an image XObject inside the source document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageHandle {
    /// Object number of the image stream
    pub object: u32,
    /// Generation number of the image stream
    pub generation: u16,
    /// Resource name the page uses for it (e.g., "Im0")
    pub name: String,
}

impl ImageHandle {
    /// Create a new handle.
    pub fn new(object: u32, generation: u16, name: impl Into<String>) -> Self {
        Self {
            object,
            generation,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ImageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.object, self.generation)
    }
}

/// Page rotation as declared by `/Rotate` (clockwise, in degrees).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Normalize a `/Rotate` value. Values that are not multiples of 90
    /// are invalid per ISO 32000 and treated as no rotation.
    pub fn from_degrees(degrees: i64) -> Self {
        match degrees.rem_euclid(360) {
            90 => Rotation::Cw90,
            180 => Rotation::Cw180,
            270 => Rotation::Cw270,
            _ => Rotation::None,
        }
    }

    /// Rotation in degrees (0, 90, 180, 270).
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }

    /// Whether the displayed page swaps width and height.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Cw90 | Rotation::Cw270)
    }
}

/// Read-only view of one source page, valid for a single page's processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePage {
    /// Page index (0-based)
    pub index: usize,

    /// Displayed width in points, after applying the rotation
    pub width: f32,

    /// Displayed height in points, after applying the rotation
    pub height: f32,

    /// Page rotation
    pub rotation: Rotation,

    /// Unrotated media box in default user space
    pub media_box: PdfRect,

    /// First image XObject referenced by the page, if any
    pub image: Option<ImageHandle>,
}

impl SourcePage {
    /// Build a page view from its media box and rotation.
    pub fn new(index: usize, media_box: PdfRect, rotation: Rotation) -> Self {
        let (w, h) = (media_box.width().abs(), media_box.height().abs());
        let (width, height) = if rotation.swaps_axes() { (h, w) } else { (w, h) };
        Self {
            index,
            width,
            height,
            rotation,
            media_box,
            image: None,
        }
    }

    /// Attach the page's primary image.
    pub fn with_image(mut self, image: ImageHandle) -> Self {
        self.image = Some(image);
        self
    }

    /// 1-based page number, as shown to users.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    /// Displayed (width, height).
    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_normalization() {
        assert_eq!(Rotation::from_degrees(0), Rotation::None);
        assert_eq!(Rotation::from_degrees(90), Rotation::Cw90);
        assert_eq!(Rotation::from_degrees(-90), Rotation::Cw270);
        assert_eq!(Rotation::from_degrees(450), Rotation::Cw90);
        assert_eq!(Rotation::from_degrees(45), Rotation::None);
        assert_eq!(Rotation::Cw180.degrees(), 180);
    }

    #[test]
    fn test_rotated_page_swaps_dimensions() {
        let page = SourcePage::new(0, PdfRect::new(0.0, 0.0, 600.0, 800.0), Rotation::Cw90);
        assert_eq!(page.size(), (800.0, 600.0));

        let page = SourcePage::new(1, PdfRect::new(0.0, 0.0, 600.0, 800.0), Rotation::Cw180);
        assert_eq!(page.size(), (600.0, 800.0));
        assert_eq!(page.number(), 2);
    }

    #[test]
    fn test_image_handle_display() {
        let handle = ImageHandle::new(12, 0, "Im0");
        assert_eq!(handle.to_string(), "12 0 R");
    }
}
