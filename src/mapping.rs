//! Image-space words to PDF text runs.
//!
//! Each axis is scaled on its own (`user = pixel / raster * page`), the font
//! is picked by a plain ASCII test, and the font size is solved so that the
//! measured run width equals the rectangle width.

use serde::{Deserialize, Serialize};

use crate::fonts::FontMetrics;
use crate::model::{DetectedWord, FontFamily, PdfRect, PlacedText, Point, RenderMode};

/// Minimum recognizer confidence for a word to be placed (inclusive).
pub const CONFIDENCE_THRESHOLD: f32 = 0.9;

/// Why a word did not become a [`PlacedText`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Confidence below [`CONFIDENCE_THRESHOLD`]
    LowConfidence,
    /// Nothing to draw
    EmptyText,
    /// The string measures zero width in its font
    ZeroWidthText,
    /// The mapped rectangle has zero width or height
    DegenerateRect,
    /// Geometry came out NaN or infinite
    NonFinite,
}

/// Per-axis scale between a raster and the page it covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisScale {
    pub x: f32,
    pub y: f32,
}

impl AxisScale {
    /// Scale factors for a raster of `raster` pixels shown on a page of
    /// `page` points.
    pub fn new(raster: (u32, u32), page: (f32, f32)) -> Self {
        Self {
            x: page.0 / raster.0 as f32,
            y: page.1 / raster.1 as f32,
        }
    }

    /// Map a pixel position to page space (y down from the top).
    pub fn to_user(&self, p: Point) -> (f32, f32) {
        (p.x * self.x, p.y * self.y)
    }
}

/// Map a pixel position with the per-axis formula.
pub fn pixel_to_user(p: Point, raster: (u32, u32), page: (f32, f32)) -> (f32, f32) {
    (
        p.x / raster.0 as f32 * page.0,
        p.y / raster.1 as f32 * page.1,
    )
}

/// Places the words of one page.
pub struct WordMapper<'m, M: FontMetrics + ?Sized> {
    raster: (u32, u32),
    page: (f32, f32),
    metrics: &'m M,
}

impl<'m, M: FontMetrics + ?Sized> WordMapper<'m, M> {
    /// `raster` is the normalized pixel size, `page` the displayed page size.
    pub fn new(raster: (u32, u32), page: (f32, f32), metrics: &'m M) -> Self {
        Self {
            raster,
            page,
            metrics,
        }
    }

    /// Place a single word as an invisible run.
    pub fn place(&self, word: &DetectedWord) -> Result<PlacedText, SkipReason> {
        if !(word.confidence >= CONFIDENCE_THRESHOLD) {
            return Err(SkipReason::LowConfidence);
        }
        if word.text.is_empty() {
            return Err(SkipReason::EmptyText);
        }

        let (top_left, bottom_right) = word.bbox.corners();
        let (x0, y0) = pixel_to_user(top_left, self.raster, self.page);
        let (x1, y1) = pixel_to_user(bottom_right, self.raster, self.page);
        if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
            return Err(SkipReason::NonFinite);
        }
        let rect = PdfRect::new(x0, y0, x1, y1);
        if rect.is_degenerate() {
            return Err(SkipReason::DegenerateRect);
        }

        let font = FontFamily::for_text(&word.text);
        let unit_width = self.metrics.unit_width(&word.text, font);
        if unit_width == 0.0 {
            return Err(SkipReason::ZeroWidthText);
        }
        let font_size = rect.width() / unit_width;
        if !font_size.is_finite() {
            return Err(SkipReason::NonFinite);
        }

        Ok(PlacedText {
            rect,
            text: word.text.clone(),
            font,
            font_size,
            render_mode: RenderMode::Invisible,
        })
    }

    /// Place every word, keeping recognizer order.
    pub fn place_all(&self, words: &[DetectedWord]) -> PagePlacement {
        let mut placement = PagePlacement::default();
        for (index, word) in words.iter().enumerate() {
            match self.place(word) {
                Ok(run) => placement.placed.push(run),
                Err(reason) => {
                    log::debug!("Skipping word {} ({:?}): {:?}", index, word.text, reason);
                    placement.skipped.push((index, reason));
                }
            }
        }
        placement
    }
}

/// Result of placing one page's words.
#[derive(Debug, Clone, Default)]
pub struct PagePlacement {
    pub placed: Vec<PlacedText>,
    /// (word index, reason)
    pub skipped: Vec<(usize, SkipReason)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::StandardMetrics;
    use crate::model::WordBox;

    fn word(x0: f32, y0: f32, x1: f32, y1: f32, text: &str, confidence: f32) -> DetectedWord {
        DetectedWord::new(WordBox::rect(x0, y0, x1, y1), text, confidence)
    }

    #[test]
    fn test_reference_page() {
        let mapper = WordMapper::new((1200, 1600), (600.0, 800.0), &StandardMetrics);
        let run = mapper
            .place(&word(100.0, 100.0, 300.0, 150.0, "Hello", 0.95))
            .unwrap();

        assert_eq!(run.rect, PdfRect::new(50.0, 50.0, 150.0, 75.0));
        assert_eq!(run.font, FontFamily::Helvetica);
        assert_eq!(run.render_mode, RenderMode::Invisible);
        let measured = StandardMetrics.text_width("Hello", run.font, run.font_size);
        assert!((measured - 100.0).abs() < 1e-3);
        assert_eq!(run.origin(), (50.0, 75.0));
    }

    #[test]
    fn test_confidence_boundary_is_inclusive() {
        let mapper = WordMapper::new((100, 100), (100.0, 100.0), &StandardMetrics);
        assert!(mapper.place(&word(0.0, 0.0, 10.0, 10.0, "a", 0.9)).is_ok());
        assert_eq!(
            mapper.place(&word(0.0, 0.0, 10.0, 10.0, "a", 0.8999)),
            Err(SkipReason::LowConfidence)
        );
        assert_eq!(
            mapper.place(&word(0.0, 0.0, 10.0, 10.0, "a", f32::NAN)),
            Err(SkipReason::LowConfidence)
        );
    }

    #[test]
    fn test_place_all_counts() {
        let mapper = WordMapper::new((100, 100), (100.0, 100.0), &StandardMetrics);
        let words = vec![
            word(0.0, 0.0, 10.0, 10.0, "one", 0.95),
            word(0.0, 20.0, 10.0, 30.0, "two", 0.5),
            word(0.0, 40.0, 10.0, 50.0, "three", 0.9),
            word(0.0, 60.0, 10.0, 70.0, "four", 0.89),
            word(0.0, 80.0, 10.0, 90.0, "five", 1.0),
        ];
        let placement = mapper.place_all(&words);
        assert_eq!(placement.placed.len(), 3);
        assert_eq!(placement.skipped, vec![
            (1, SkipReason::LowConfidence),
            (3, SkipReason::LowConfidence)
        ]);
        let texts: Vec<_> = placement.placed.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "three", "five"]);
    }

    #[test]
    fn test_font_size_round_trip() {
        let mapper = WordMapper::new((2480, 3508), (595.0, 842.0), &StandardMetrics);
        for (text, x1) in [("A", 140.0), ("Rust 2021!", 900.0), ("wide WWW", 2000.0)] {
            let run = mapper.place(&word(120.0, 300.0, x1, 360.0, text, 0.99)).unwrap();
            let measured = StandardMetrics.text_width(text, run.font, run.font_size);
            assert!(
                (measured - run.rect.width()).abs() < 1e-3,
                "{}: {} vs {}",
                text,
                measured,
                run.rect.width()
            );
        }
    }

    #[test]
    fn test_cjk_font_selection() {
        let mapper = WordMapper::new((100, 100), (100.0, 100.0), &StandardMetrics);
        let run = mapper.place(&word(0.0, 0.0, 40.0, 20.0, "中文", 0.99)).unwrap();
        assert_eq!(run.font, FontFamily::Cjk);
        assert!((run.font_size - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_degenerate_words_are_skipped() {
        let mapper = WordMapper::new((100, 100), (100.0, 100.0), &StandardMetrics);
        assert_eq!(
            mapper.place(&word(0.0, 0.0, 10.0, 10.0, "", 0.99)),
            Err(SkipReason::EmptyText)
        );
        assert_eq!(
            mapper.place(&word(5.0, 0.0, 5.0, 10.0, "a", 0.99)),
            Err(SkipReason::DegenerateRect)
        );
        assert_eq!(
            mapper.place(&word(0.0, 0.0, 10.0, 10.0, "\t", 0.99)),
            Err(SkipReason::ZeroWidthText)
        );

        let empty_raster = WordMapper::new((0, 0), (100.0, 100.0), &StandardMetrics);
        assert_eq!(
            empty_raster.place(&word(0.0, 0.0, 10.0, 10.0, "a", 0.99)),
            Err(SkipReason::NonFinite)
        );
    }

    #[test]
    fn test_inverted_box_is_accepted_as_is() {
        let mapper = WordMapper::new((100, 100), (100.0, 100.0), &StandardMetrics);
        let run = mapper.place(&word(30.0, 30.0, 10.0, 10.0, "ab", 0.99)).unwrap();
        let expected = PdfRect::new(30.0, 30.0, 10.0, 10.0);
        for (got, want) in [
            (run.rect.x0, expected.x0),
            (run.rect.y0, expected.y0),
            (run.rect.x1, expected.x1),
            (run.rect.y1, expected.y1),
        ] {
            assert!((got - want).abs() < 1e-3, "{:?} != {:?}", run.rect, expected);
        }
        assert!(run.font_size < 0.0);
    }

    #[test]
    fn test_mapping_is_linear_in_raster_size() {
        let page = (600.0, 800.0);
        let p = Point::new(240.0, 360.0);
        let base = pixel_to_user(p, (1200, 1600), page);
        for k in [2u32, 3, 4] {
            let scaled = pixel_to_user(p, (1200 * k, 1600 * k), page);
            assert!((scaled.0 - base.0 / k as f32).abs() < 1e-3);
            assert!((scaled.1 - base.1 / k as f32).abs() < 1e-3);
        }
        // Page scaling is proportional, and the axes are independent.
        let wide = pixel_to_user(p, (1200, 1600), (1200.0, 800.0));
        assert!((wide.0 - base.0 * 2.0).abs() < 1e-3);
        assert!((wide.1 - base.1).abs() < 1e-3);
    }

    #[test]
    fn test_axis_scale_matches_formula() {
        let scale = AxisScale::new((1000, 500), (250.0, 500.0));
        let p = Point::new(400.0, 100.0);
        assert_eq!(scale.to_user(p), pixel_to_user(p, (1000, 500), (250.0, 500.0)));
    }
}
