pub mod markdown;
pub mod text;

pub use markdown::load_markdown;
pub use text::load_text;

use anyhow::Result;
use std::path::Path;
use thiserror::Error;

use crate::core::Document;

/// Input format detection result
#[derive(Debug, Clone, PartialEq)]
pub enum InputFormat {
    Markdown,
    PlainText,
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document contains no readable words")]
    Empty,
}

/// Detect the format of an input file from its extension
pub fn detect_format(path: &Path) -> InputFormat {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
    {
        Some(ext) if ext == "md" || ext == "markdown" => InputFormat::Markdown,
        _ => InputFormat::PlainText,
    }
}

/// Split prose into display tokens.
///
/// Words are whitespace-separated and reduced to ASCII alphanumerics,
/// periods and apostrophes; tokens left empty by the filter are dropped.
/// The playback engine shows tokens verbatim and does no further cleanup.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '\'')
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect()
}

/// Load a document from a file, auto-detecting format
pub fn load_document(path: &str) -> Result<Document> {
    let file_path = Path::new(path);

    let words = match detect_format(file_path) {
        InputFormat::Markdown => load_markdown(path)?,
        InputFormat::PlainText => load_text(path)?,
    };

    if words.is_empty() {
        return Err(DocumentError::Empty.into());
    }

    let file_name = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string();

    Ok(Document::new(file_name, words))
}
