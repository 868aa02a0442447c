//! Document finalization: metadata copy and saving.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::backend::{SaveOptions, SourceDocument, TargetDocument};
use crate::error::Result;

/// Suffix appended to the primary output's stem for the pure document.
pub const PURE_SUFFIX: &str = "-pure";

/// `<dir>/<stem>-pure.pdf` next to the primary output.
pub fn pure_output_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    output.with_file_name(format!("{}{}.pdf", stem, PURE_SUFFIX))
}

/// What happened to one piece of copied metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum MetadataCopy {
    Copied,
    /// The source has none
    Absent,
    /// The source value could not be read or does not fit the output
    Skipped(String),
}

/// Summary of one written output document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputReport {
    pub path: PathBuf,
    pub pages: usize,
    pub page_labels: MetadataCopy,
    pub outline: MetadataCopy,
}

/// Copy page labels and outline (best effort), then save.
///
/// Only the save can fail; metadata problems are logged and recorded.
pub fn finalize<S, T>(source: &S, target: &mut T, path: &Path) -> Result<OutputReport>
where
    S: SourceDocument + ?Sized,
    T: TargetDocument + ?Sized,
{
    let page_labels = match source.page_labels() {
        Ok(labels) if labels.is_empty() => MetadataCopy::Absent,
        Ok(labels) => record(path, "page labels", target.set_page_labels(&labels)),
        Err(e) => record(path, "page labels", Err(e)),
    };
    let outline = match source.outline() {
        Ok(outline) if outline.is_empty() => MetadataCopy::Absent,
        Ok(outline) => record(path, "outline", target.set_outline(&outline)),
        Err(e) => record(path, "outline", Err(e)),
    };

    target.save(path, &SaveOptions::default())?;
    Ok(OutputReport {
        path: path.to_path_buf(),
        pages: target.page_count(),
        page_labels,
        outline,
    })
}

fn record(path: &Path, what: &str, result: Result<()>) -> MetadataCopy {
    match result {
        Ok(()) => MetadataCopy::Copied,
        Err(e) => {
            log::warn!("{}: {} not copied: {}", path.display(), what, e);
            MetadataCopy::Skipped(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pure_output_path() {
        assert_eq!(
            pure_output_path(Path::new("/tmp/out/scan.pdf")),
            PathBuf::from("/tmp/out/scan-pure.pdf")
        );
        assert_eq!(
            pure_output_path(Path::new("scan.ocr.pdf")),
            PathBuf::from("scan.ocr-pure.pdf")
        );
        assert_eq!(pure_output_path(Path::new("noext")), PathBuf::from("noext-pure.pdf"));
    }

    #[test]
    fn test_metadata_copy_serialization() {
        let json = serde_json::to_string(&MetadataCopy::Skipped("too few pages".into())).unwrap();
        assert_eq!(json, r#"{"status":"skipped","reason":"too few pages"}"#);
        let json = serde_json::to_string(&MetadataCopy::Copied).unwrap();
        assert_eq!(json, r#"{"status":"copied"}"#);
    }
}
