use anyhow::{Context, Result};

use super::tokenize;

/// Load and tokenize a plain-text document
pub fn load_text(path: &str) -> Result<Vec<String>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    Ok(tokenize(&content))
}
