use thiserror::Error;

const UTF8_BOM: &str = "\u{feff}";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("document is empty")]
    Empty,
    #[error("document is not valid UTF-8 text (invalid byte at offset {0})")]
    InvalidEncoding(usize),
    #[error("document looks binary (NUL byte at offset {0})")]
    Binary(usize),
    #[error("extraction failed: {0}")]
    Other(String),
}

/// Turns uploaded document bytes into plain text.
///
/// Any error is terminal for the run that requested it.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Accepts UTF-8 text documents; a leading byte-order mark is dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        if bytes.is_empty() {
            return Err(ExtractionError::Empty);
        }
        if let Some(offset) = bytes.iter().position(|b| *b == 0) {
            return Err(ExtractionError::Binary(offset));
        }
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ExtractionError::InvalidEncoding(e.valid_up_to()))?;
        Ok(text.strip_prefix(UTF8_BOM).unwrap_or(text).to_string())
    }
}
