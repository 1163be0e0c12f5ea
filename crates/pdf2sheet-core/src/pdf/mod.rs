//! PDF processing module.

mod extractor;

pub use extractor::PdfExtractor;

use std::path::Path;

use tracing::debug;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for PDF processing implementations.
pub trait PdfProcessor {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Extract text from the entire PDF.
    fn extract_text(&self) -> Result<String>;
}

/// Decode the text layer of a PDF held in memory.
///
/// Fails with [`PdfError::NoText`] when fewer than `min_text_length`
/// non-whitespace characters come out.
pub fn read_pdf_text(data: &[u8], min_text_length: usize) -> Result<String> {
    let mut extractor = PdfExtractor::new();
    extractor.load(data)?;
    let text = extractor.extract_text()?;
    check_text_length(&text, min_text_length)?;
    Ok(text)
}

/// Reject text too short to be a real text layer.
pub fn check_text_length(text: &str, min_text_length: usize) -> Result<()> {
    let length = text.chars().filter(|c| !c.is_whitespace()).count();
    if length < min_text_length {
        return Err(PdfError::NoText(length));
    }
    Ok(())
}

/// Read a document from disk. Plain `.txt` files are taken as already decoded.
pub fn read_document(path: &Path, min_text_length: usize) -> crate::error::Result<String> {
    let is_text = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"));

    if is_text {
        debug!("Reading {} as plain text", path.display());
        return Ok(std::fs::read_to_string(path)?);
    }

    let data = std::fs::read(path)?;
    Ok(read_pdf_text(&data, min_text_length)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_text_length() {
        assert!(check_text_length("Invoice INV-1", 10).is_ok());
        assert!(matches!(
            check_text_length(" \n a b c \t", 10),
            Err(PdfError::NoText(3))
        ));
    }

    #[test]
    fn test_read_document_text_bypass() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.TXT");
        std::fs::write(&path, "Invoice No: 12345").unwrap();

        assert_eq!(read_document(&path, 10).unwrap(), "Invoice No: 12345");
    }

    #[test]
    fn test_read_document_rejects_garbage_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();

        assert!(read_document(&path, 10).is_err());
    }
}
