//! Recognizer backed by the `tesseract` command-line tool.

use std::path::PathBuf;
use std::process::Command;

use image::{ImageFormat, RgbImage};

use super::Recognizer;
use crate::error::{Error, Result};
use crate::model::{DetectedWord, WordBox};

/// Runs `tesseract <image> stdout -l <lang> tsv` for each page.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    program: PathBuf,
    extra_args: Vec<String>,
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl TesseractRecognizer {
    /// Use the given executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    /// Pass extra arguments (e.g. `--psm 6`) before the `tsv` config.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Whether the executable can be started at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl Recognizer for TesseractRecognizer {
    fn recognize(&mut self, image: &RgbImage, language: &str) -> Result<Vec<DetectedWord>> {
        let tmp = tempfile::Builder::new().suffix(".png").tempfile()?;
        image
            .save_with_format(tmp.path(), ImageFormat::Png)
            .map_err(|e| Error::Other(format!("failed to write recognizer input: {}", e)))?;

        let output = Command::new(&self.program)
            .arg(tmp.path())
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .args(&self.extra_args)
            .arg("tsv")
            .output()
            .map_err(|e| Error::Other(format!("failed to run {}: {}", self.program.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Other(format!("tesseract failed: {}", stderr.trim())));
        }
        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

/// Word rows (level 5) of tesseract's TSV output. Confidence is rescaled
/// from 0..100 to 0..1; rows without text or with negative confidence are
/// skipped.
pub(crate) fn parse_tsv(tsv: &str) -> Vec<DetectedWord> {
    let mut words = Vec::new();
    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0].trim() != "5" {
            continue;
        }
        let num = |i: usize| cols[i].trim().parse::<f32>().ok();
        let (Some(left), Some(top), Some(width), Some(height), Some(conf)) =
            (num(6), num(7), num(8), num(9), num(10))
        else {
            continue;
        };
        let text = cols[11].trim();
        if text.is_empty() || conf < 0.0 {
            continue;
        }
        words.push(DetectedWord::new(
            WordBox::rect(left, top, left + width, top + height),
            text,
            conf / 100.0,
        ));
    }
    words
}
