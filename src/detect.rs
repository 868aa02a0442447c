//! Input validation: make sure the source really is a PDF before loading it.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// The `%PDF-x.y` header found at the start of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfHeader {
    /// PDF version (e.g., "1.7", "2.0")
    pub version: String,
    /// Byte offset of the header (readers tolerate leading garbage)
    pub offset: usize,
}

impl std::fmt::Display for PdfHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}

const PDF_MAGIC: &[u8] = b"%PDF-";
const VERSION_LEN: usize = 3; // e.g., "1.7"

/// Readers accept the header anywhere in the first kilobyte.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Read the header of a file on disk.
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<PdfHeader> {
    let file = File::open(path)?;
    let mut window = Vec::with_capacity(HEADER_SEARCH_WINDOW);
    BufReader::new(file)
        .take(HEADER_SEARCH_WINDOW as u64)
        .read_to_end(&mut window)?;
    parse_header(&window)
}

/// Locate and validate the `%PDF-` header in a byte slice.
pub fn parse_header(data: &[u8]) -> Result<PdfHeader> {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    let offset = window
        .windows(PDF_MAGIC.len())
        .position(|w| w == PDF_MAGIC)
        .ok_or(Error::UnknownFormat)?;

    let start = offset + PDF_MAGIC.len();
    let version_bytes = window
        .get(start..start + VERSION_LEN)
        .ok_or(Error::UnknownFormat)?;
    let version = String::from_utf8_lossy(version_bytes).to_string();

    if !is_valid_version(&version) {
        return Err(Error::UnsupportedVersion(version));
    }

    Ok(PdfHeader { version, offset })
}

fn is_valid_version(version: &str) -> bool {
    let bytes = version.as_bytes();
    bytes.len() == VERSION_LEN
        && bytes[0].is_ascii_digit()
        && bytes[1] == b'.'
        && bytes[2].is_ascii_digit()
}

/// Check whether a file on disk looks like a PDF.
pub fn is_pdf<P: AsRef<Path>>(path: P) -> bool {
    read_header(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_at_start() {
        let header = parse_header(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3").unwrap();
        assert_eq!(header.version, "1.7");
        assert_eq!(header.offset, 0);
    }

    #[test]
    fn test_header_after_leading_garbage() {
        let header = parse_header(b"\x00\x00junk%PDF-1.4\n").unwrap();
        assert_eq!(header.version, "1.4");
        assert_eq!(header.offset, 6);
    }

    #[test]
    fn test_not_a_pdf() {
        assert!(matches!(
            parse_header(b"<!DOCTYPE html><html></html>"),
            Err(Error::UnknownFormat)
        ));
        assert!(matches!(parse_header(b""), Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_truncated_version() {
        assert!(matches!(parse_header(b"%PDF-1"), Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_bad_version() {
        assert!(matches!(
            parse_header(b"%PDF-x.y\n"),
            Err(Error::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_is_pdf_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.pdf");
        let bad = dir.path().join("bad.pdf");
        std::fs::write(&good, b"%PDF-1.5\n").unwrap();
        std::fs::write(&bad, b"hello").unwrap();
        assert!(is_pdf(&good));
        assert!(!is_pdf(&bad));
        assert!(!is_pdf(dir.path().join("missing.pdf")));
    }
}
