//! Run configuration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default recognizer language profile.
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Which primary output document is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Fresh pages holding the page image plus invisible text
    #[default]
    Rebuild,
    /// The original pages, cleared of marks, with invisible text on top
    Overlay,
}

/// How the page image is stored in a rebuilt page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RebuildImage {
    /// Keep JPEG sources byte for byte; other sources are re-encoded
    #[default]
    Original,
    /// Always embed the normalized raster
    Normalized,
}

/// Cooperative cancellation flag, checked between pages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The current page still completes.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options for a processing run.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Also write the visible text-only companion document
    pub pure: bool,

    /// Hand every normalized raster to the page observer
    pub preview: bool,

    /// Extract, normalize and compose pages without running recognition
    pub skip_recognition: bool,

    /// Language profile passed through to the recognizer
    pub language: String,

    /// Primary output variant
    pub mode: OutputMode,

    /// Image storage in rebuilt pages
    pub rebuild_image: RebuildImage,

    /// Keep image pages with no recognized words in rebuilt and pure outputs
    pub keep_empty_pages: bool,

    /// Cancellation flag
    pub cancel: Option<CancelToken>,
}

impl ProcessOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the pure companion document.
    pub fn with_pure(mut self, pure: bool) -> Self {
        self.pure = pure;
        self
    }

    /// Enable or disable raster previews.
    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    /// Skip the recognizer and text insertion.
    pub fn skip_recognition(mut self) -> Self {
        self.skip_recognition = true;
        self
    }

    /// Set the recognizer language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the output mode.
    pub fn with_mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    /// Write over the original pages instead of rebuilding them.
    pub fn overlay(mut self) -> Self {
        self.mode = OutputMode::Overlay;
        self
    }

    /// Set how rebuilt pages store their image.
    pub fn with_rebuild_image(mut self, rebuild_image: RebuildImage) -> Self {
        self.rebuild_image = rebuild_image;
        self
    }

    /// Keep pages whose recognition result is empty.
    pub fn with_keep_empty_pages(mut self, keep: bool) -> Self {
        self.keep_empty_pages = keep;
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            pure: false,
            preview: false,
            skip_recognition: false,
            language: DEFAULT_LANGUAGE.to_string(),
            mode: OutputMode::Rebuild,
            rebuild_image: RebuildImage::Original,
            keep_empty_pages: false,
            cancel: None,
        }
    }
}
