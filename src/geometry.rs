//! Affine transforms between displayed page space and PDF user space.

use crate::model::{PdfRect, Rotation};

/// A PDF transformation matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix(pub [f32; 6]);

impl Matrix {
    pub const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    /// Pure translation.
    pub fn translate(tx: f32, ty: f32) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self` applied first, then `other` (PDF `cm` concatenation order).
    pub fn then(&self, other: &Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a * a2 + b * c2,
            a * b2 + b * d2,
            c * a2 + d * c2,
            c * b2 + d * d2,
            e * a2 + f * c2 + e2,
            e * b2 + f * d2 + f2,
        ])
    }

    /// Transform a point.
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }
}

/// Maps displayed page coordinates (origin bottom-left of the page as the
/// viewer shows it) back into the unrotated user space of `media_box`.
pub fn derotation(rotation: Rotation, media_box: &PdfRect) -> Matrix {
    let w = media_box.width().abs();
    let h = media_box.height().abs();
    let base = match rotation {
        Rotation::None => Matrix::IDENTITY,
        Rotation::Cw90 => Matrix([0.0, 1.0, -1.0, 0.0, w, 0.0]),
        Rotation::Cw180 => Matrix([-1.0, 0.0, 0.0, -1.0, w, h]),
        Rotation::Cw270 => Matrix([0.0, -1.0, 1.0, 0.0, 0.0, h]),
    };
    base.then(&Matrix::translate(
        media_box.x0.min(media_box.x1),
        media_box.y0.min(media_box.y1),
    ))
}

/// Placement (`cm`) for an image that fills an unrotated `width` x `height`
/// frame, shown on a page of the displayed size after `rotation`.
pub fn rotated_image_placement(rotation: Rotation, width: f32, height: f32) -> Matrix {
    match rotation {
        Rotation::None => Matrix([width, 0.0, 0.0, height, 0.0, 0.0]),
        Rotation::Cw90 => Matrix([0.0, -width, height, 0.0, 0.0, width]),
        Rotation::Cw180 => Matrix([-width, 0.0, 0.0, -height, width, height]),
        Rotation::Cw270 => Matrix([0.0, width, -height, 0.0, height, 0.0]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-4 && (a.1 - b.1).abs() < 1e-4
    }

    #[test]
    fn test_concatenation_order() {
        let scale = Matrix([2.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        let shift = Matrix::translate(10.0, 5.0);
        assert!(close(scale.then(&shift).apply(1.0, 1.0), (12.0, 7.0)));
        assert!(close(shift.then(&scale).apply(1.0, 1.0), (22.0, 12.0)));
    }

    #[test]
    fn test_derotation_cw90() {
        // Unrotated 600 x 800 page, displayed as 800 x 600.
        let m = derotation(Rotation::Cw90, &PdfRect::new(0.0, 0.0, 600.0, 800.0));
        // Displayed top-right corner is the unrotated top-left corner.
        assert!(close(m.apply(800.0, 600.0), (0.0, 800.0)));
        // Displayed bottom-left corner is the unrotated bottom-right corner.
        assert!(close(m.apply(0.0, 0.0), (600.0, 0.0)));
    }

    #[test]
    fn test_derotation_cw180_and_cw270() {
        let mb = PdfRect::new(0.0, 0.0, 600.0, 800.0);
        assert!(close(derotation(Rotation::Cw180, &mb).apply(0.0, 0.0), (600.0, 800.0)));
        // Displayed bottom-left of a 270 page is the unrotated top-left.
        assert!(close(derotation(Rotation::Cw270, &mb).apply(0.0, 0.0), (0.0, 800.0)));
    }

    #[test]
    fn test_derotation_honours_media_box_origin() {
        let m = derotation(Rotation::None, &PdfRect::new(10.0, 20.0, 610.0, 820.0));
        assert!(close(m.apply(0.0, 0.0), (10.0, 20.0)));
    }

    #[test]
    fn test_rotated_image_placement_covers_displayed_page() {
        // 600 x 800 unrotated frame rotated 90 degrees covers 800 x 600.
        let m = rotated_image_placement(Rotation::Cw90, 600.0, 800.0);
        let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)];
        for (u, v) in corners {
            let (x, y) = m.apply(u, v);
            assert!((-1e-3..=800.001).contains(&x));
            assert!((-1e-3..=600.001).contains(&y));
        }
        // Image top-left (u=0, v=1) lands at displayed top-right.
        assert!(close(m.apply(0.0, 1.0), (800.0, 600.0)));
    }
}
