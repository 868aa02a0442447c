//! Text recognition seam.
//!
//! The pipeline only talks to a [`Recognizer`]; [`RecognitionAdapter`]
//! cleans up whatever the engine returns before it reaches the mapper.

mod tesseract;

pub use tesseract::TesseractRecognizer;

use image::RgbImage;
use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};
use crate::model::DetectedWord;

/// A text recognition engine.
///
/// Implementations receive a top-left origin RGB raster in reading
/// orientation and return words in pixel coordinates of that raster, in
/// reading order. Confidence should be in [0, 1].
pub trait Recognizer {
    /// Recognize the words in one page image.
    fn recognize(&mut self, image: &RgbImage, language: &str) -> Result<Vec<DetectedWord>>;

    /// Engine name used in logs.
    fn name(&self) -> &str {
        "recognizer"
    }
}

impl<F> Recognizer for F
where
    F: FnMut(&RgbImage, &str) -> Result<Vec<DetectedWord>>,
{
    fn recognize(&mut self, image: &RgbImage, language: &str) -> Result<Vec<DetectedWord>> {
        self(image, language)
    }

    fn name(&self) -> &str {
        "closure"
    }
}

/// Wraps a recognizer with page context and output cleanup.
pub struct RecognitionAdapter<'r, R: Recognizer + ?Sized> {
    inner: &'r mut R,
    language: String,
}

impl<'r, R: Recognizer + ?Sized> RecognitionAdapter<'r, R> {
    pub fn new(inner: &'r mut R, language: impl Into<String>) -> Self {
        Self {
            inner,
            language: language.into(),
        }
    }

    /// Language hint passed to the engine.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Recognize one page. Engine failures become [`Error::Recognition`]
    /// tagged with the page index.
    pub fn recognize_page(&mut self, page_index: usize, image: &RgbImage) -> Result<Vec<DetectedWord>> {
        let raw = self
            .inner
            .recognize(image, &self.language)
            .map_err(|e| match e {
                Error::Recognition { message, .. } => Error::Recognition {
                    page: page_index,
                    message,
                },
                other => Error::Recognition {
                    page: page_index,
                    message: other.to_string(),
                },
            })?;

        let total = raw.len();
        let words: Vec<DetectedWord> = raw.into_iter().filter_map(clean_word).collect();
        log::debug!(
            "{}: page {} returned {} words ({} kept)",
            self.inner.name(),
            page_index + 1,
            total,
            words.len()
        );
        Ok(words)
    }
}

/// Trim, NFC-normalize and clamp one word. Blank words are dropped.
pub fn clean_word(word: DetectedWord) -> Option<DetectedWord> {
    let text: String = word.text.trim().nfc().collect();
    if text.is_empty() {
        return None;
    }
    let confidence = if word.confidence.is_nan() {
        0.0
    } else {
        word.confidence.clamp(0.0, 1.0)
    };
    Some(DetectedWord {
        bbox: word.bbox,
        text,
        confidence,
    })
}
