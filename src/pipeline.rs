//! Per-page driver.
//!
//! Pages are handled strictly in document order: extraction, recognition,
//! mapping and composition for one page finish before the next page
//! starts. Finalization runs once at the end.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use crate::backend::{LopdfSource, PageRef, SourceDocument, TargetDocument};
use crate::compose;
use crate::detect;
use crate::error::{Error, Result};
use crate::finalize::{self, OutputReport};
use crate::fonts::{FontMetrics, StandardMetrics};
use crate::mapping::{SkipReason, WordMapper};
use crate::model::{PlacedText, RasterImage, SourcePage};
use crate::options::{OutputMode, ProcessOptions};
use crate::raster::{self, Diagnostic};
use crate::recognize::{RecognitionAdapter, Recognizer};

/// Callbacks fired while a document is processed.
pub trait PageObserver {
    /// A page is about to be processed.
    fn page_started(&mut self, _index: usize, _total: usize) {}

    /// A page's normalized raster is ready. Only called when
    /// [`ProcessOptions::preview`] is set.
    fn raster_ready(&mut self, _index: usize, _raster: &RasterImage) {}

    /// A page is done.
    fn page_finished(&mut self, _report: &PageReport) {}
}

/// What happened to one source page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageOutcome {
    /// The page has no image XObject
    NoImage,
    /// The image could not be decoded
    ImageUnusable { reason: String },
    /// Recognition was switched off
    RecognitionSkipped,
    /// The recognizer raised an error
    RecognitionFailed { message: String },
    /// The recognizer found nothing
    NoText,
    /// Words were mapped; some may have been dropped
    Recognized { placed: usize, dropped: usize },
}

/// Per-page entry of a [`ProcessReport`].
#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    /// Source page index (0-based)
    pub index: usize,
    pub outcome: PageOutcome,
    /// Page index in the rebuilt output, if one was created
    pub rebuilt_page: Option<usize>,
    /// Page index in the pure output, if one was created
    pub pure_page: Option<usize>,
    /// (word index, reason) for every dropped word
    pub dropped: Vec<(usize, SkipReason)>,
}

impl PageReport {
    fn new(index: usize, outcome: PageOutcome) -> Self {
        Self {
            index,
            outcome,
            rebuilt_page: None,
            pure_page: None,
            dropped: Vec::new(),
        }
    }
}

/// Result of a processing run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessReport {
    pub input: Option<PathBuf>,
    pub pages: Vec<PageReport>,
    pub diagnostics: Vec<Diagnostic>,
    pub outputs: Vec<OutputReport>,
}

impl ProcessReport {
    /// Total number of text runs written.
    pub fn words_placed(&self) -> usize {
        self.pages
            .iter()
            .map(|p| match p.outcome {
                PageOutcome::Recognized { placed, .. } => placed,
                _ => 0,
            })
            .sum()
    }

    /// Number of pages that received a text layer.
    pub fn pages_with_text(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| matches!(p.outcome, PageOutcome::Recognized { placed, .. } if placed > 0))
            .count()
    }
}

/// Adds a text layer to every page of a source document.
///
/// # Example
///
/// ```no_run
/// use ocrpdf::{LopdfSource, Pipeline, ProcessOptions, TesseractRecognizer};
///
/// let source = LopdfSource::load_file("scan.pdf")?;
/// let mut engine = TesseractRecognizer::default();
/// let report = Pipeline::new(ProcessOptions::new().with_pure(true), &mut engine)
///     .run(&source, "scan-ocr.pdf".as_ref())?;
/// println!("{} words", report.words_placed());
/// # Ok::<(), ocrpdf::Error>(())
/// ```
pub struct Pipeline<'a, R: Recognizer + ?Sized> {
    options: ProcessOptions,
    recognizer: &'a mut R,
    metrics: Box<dyn FontMetrics + 'a>,
    observer: Option<&'a mut dyn PageObserver>,
}

impl<'a, R: Recognizer + ?Sized> Pipeline<'a, R> {
    pub fn new(options: ProcessOptions, recognizer: &'a mut R) -> Self {
        Self {
            options,
            recognizer,
            metrics: Box::new(StandardMetrics),
            observer: None,
        }
    }

    /// Measure text with other font metrics.
    pub fn with_metrics(mut self, metrics: impl FontMetrics + 'a) -> Self {
        self.metrics = Box::new(metrics);
        self
    }

    /// Receive progress and preview callbacks.
    pub fn with_observer(mut self, observer: &'a mut dyn PageObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn options(&self) -> &ProcessOptions {
        &self.options
    }

    /// Process `source` and write the outputs. The primary output goes to
    /// `output`; the pure document, when enabled, next to it.
    pub fn run<S: SourceDocument>(&mut self, source: &S, output: &Path) -> Result<ProcessReport> {
        let Self {
            options,
            recognizer,
            metrics,
            observer,
        } = self;
        let options: &ProcessOptions = options;

        let total = source.page_count();
        log::info!("Processing {} pages ({:?} mode)", total, options.mode);

        let mut primary = match options.mode {
            OutputMode::Rebuild => source.new_target(),
            OutputMode::Overlay => source.overlay_target()?,
        };
        let mut pure = options.pure.then(|| source.new_target());

        let mut run = PageRun {
            options,
            metrics: &**metrics,
            adapter: RecognitionAdapter::new(&mut **recognizer, options.language.clone()),
        };

        let mut report = ProcessReport::default();
        for index in 0..total {
            if options.is_cancelled() {
                log::info!("Cancelled before page {}", index + 1);
                return Err(Error::Cancelled(index));
            }
            if let Some(obs) = observer.as_mut() {
                obs.page_started(index, total);
            }

            let page = source.source_page(index)?;
            let extracted = run.extract(source, &page, &mut report.diagnostics)?;
            if let (Extracted::Raster(raster), true) = (&extracted, options.preview) {
                if let Some(obs) = observer.as_mut() {
                    obs.raster_ready(index, raster);
                }
            }
            let page_report = run.compose(&page, extracted, &mut primary, pure.as_mut())?;

            if let Some(obs) = observer.as_mut() {
                obs.page_finished(&page_report);
            }
            report.pages.push(page_report);
        }

        report.outputs.push(finalize::finalize(source, &mut primary, output)?);
        if let Some(pure) = pure.as_mut() {
            let pure_path = finalize::pure_output_path(output);
            report.outputs.push(finalize::finalize(source, pure, &pure_path)?);
        }

        log::info!(
            "{} words placed on {} of {} pages",
            report.words_placed(),
            report.pages_with_text(),
            total
        );
        Ok(report)
    }
}

/// Borrowed state for the page loop.
struct PageRun<'r, R: Recognizer + ?Sized> {
    options: &'r ProcessOptions,
    metrics: &'r dyn FontMetrics,
    adapter: RecognitionAdapter<'r, R>,
}

/// Result of the extraction step.
enum Extracted {
    Raster(RasterImage),
    Missing(PageOutcome),
}

impl<R: Recognizer + ?Sized> PageRun<'_, R> {
    fn extract<S: SourceDocument>(
        &self,
        source: &S,
        page: &SourcePage,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Extracted> {
        let Some(handle) = &page.image else {
            log::debug!("Page {}: no image", page.number());
            return Ok(Extracted::Missing(PageOutcome::NoImage));
        };
        match source
            .image_stream(handle)
            .and_then(|stream| raster::normalize(&stream, page))
        {
            Ok(normalized) => {
                diagnostics.extend(normalized.diagnostic);
                Ok(Extracted::Raster(normalized.raster))
            }
            Err(e) if !e.is_fatal() => {
                log::warn!("Page {}: image {} unusable: {}", page.number(), handle, e);
                Ok(Extracted::Missing(PageOutcome::ImageUnusable {
                    reason: e.to_string(),
                }))
            }
            Err(e) => Err(e),
        }
    }

    fn compose<T: TargetDocument>(
        &mut self,
        page: &SourcePage,
        extracted: Extracted,
        primary: &mut T,
        pure: Option<&mut T>,
    ) -> Result<PageReport> {
        let overlay = match self.options.mode {
            OutputMode::Overlay => {
                let target_page = primary.existing_page(page.index)?;
                primary.clear_marks(target_page)?;
                Some(target_page)
            }
            OutputMode::Rebuild => None,
        };

        let raster = match extracted {
            Extracted::Raster(raster) => raster,
            Extracted::Missing(outcome) => return Ok(PageReport::new(page.index, outcome)),
        };

        if self.options.skip_recognition {
            let mut report = PageReport::new(page.index, PageOutcome::RecognitionSkipped);
            report.rebuilt_page = self.rebuild(page, &raster, &[], primary, overlay)?;
            return Ok(report);
        }

        let words = match self.adapter.recognize_page(page.index, &raster.pixels) {
            Ok(words) => words,
            Err(e) => {
                log::warn!("Page {}: {}; no text layer", page.number(), e);
                let mut report = PageReport::new(
                    page.index,
                    PageOutcome::RecognitionFailed {
                        message: e.to_string(),
                    },
                );
                report.rebuilt_page = self.rebuild(page, &raster, &[], primary, overlay)?;
                return Ok(report);
            }
        };

        if words.is_empty() && !self.options.keep_empty_pages {
            log::debug!("Page {}: no text found", page.number());
            return Ok(PageReport::new(page.index, PageOutcome::NoText));
        }

        let placement =
            WordMapper::new(raster.dimensions(), page.size(), self.metrics).place_all(&words);
        let mut report = PageReport::new(
            page.index,
            PageOutcome::Recognized {
                placed: placement.placed.len(),
                dropped: placement.skipped.len(),
            },
        );
        report.dropped = placement.skipped;

        if let Some(target_page) = overlay {
            compose::overlay_page(primary, target_page, &placement.placed)?;
        }
        report.rebuilt_page = self.rebuild(page, &raster, &placement.placed, primary, overlay)?;
        if let Some(pure) = pure {
            report.pure_page = Some(compose::pure_page(pure, page, &placement.placed)?.index);
        }
        Ok(report)
    }

    /// Add the rebuilt page unless the primary output is an overlay.
    fn rebuild<T: TargetDocument>(
        &self,
        page: &SourcePage,
        raster: &RasterImage,
        runs: &[PlacedText],
        primary: &mut T,
        overlay: Option<PageRef>,
    ) -> Result<Option<usize>> {
        if overlay.is_some() {
            return Ok(None);
        }
        let out = compose::rebuilt_page(primary, page, raster, runs, self.options.rebuild_image)?;
        Ok(Some(out.index))
    }
}

/// Run the pipeline on a file with the `lopdf` backend.
pub fn process_file<R, P, Q>(
    input: P,
    output: Q,
    options: ProcessOptions,
    recognizer: &mut R,
) -> Result<ProcessReport>
where
    R: Recognizer + ?Sized,
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let input = input.as_ref();
    let header = detect::read_header(input)?;
    log::debug!("{}: {}", input.display(), header);

    let source = LopdfSource::load_file(input)?;
    let mut report = Pipeline::new(options, recognizer).run(&source, output.as_ref())?;
    report.input = Some(input.to_path_buf());
    Ok(report)
}

/// Process several files in parallel, one recognizer per file.
///
/// Pages of one file are never processed concurrently. Results come back
/// in job order.
pub fn process_batch<R, F>(
    jobs: &[(PathBuf, PathBuf)],
    options: &ProcessOptions,
    make_recognizer: F,
) -> Vec<Result<ProcessReport>>
where
    R: Recognizer,
    F: Fn() -> R + Sync,
{
    jobs.par_iter()
        .map(|(input, output)| {
            let mut recognizer = make_recognizer();
            process_file(input, output, options.clone(), &mut recognizer)
        })
        .collect()
}
