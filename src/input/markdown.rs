use anyhow::{Context, Result};

use super::tokenize;

/// Load and tokenize a Markdown document
pub fn load_markdown(path: &str) -> Result<Vec<String>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    Ok(tokenize(&strip_markdown(&content)))
}

/// Strip Markdown syntax from a document, leaving plain prose.
///
/// Covers the constructs that matter for word extraction: code blocks are
/// dropped wholesale, link and image targets are removed (link text kept),
/// heading/emphasis/list markers and inline HTML are erased. Residual
/// punctuation is reduced further by the tokenizer's character filter.
pub fn strip_markdown(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_fence = false;

    for line in input.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        // Indented code block
        if line.starts_with("    ") || line.starts_with('\t') {
            continue;
        }

        strip_inline(strip_block_markers(trimmed), &mut out);
        out.push('\n');
    }

    out
}

/// Remove leading heading, blockquote and list markers
fn strip_block_markers(mut line: &str) -> &str {
    loop {
        let before = line.len();

        line = line.trim_start_matches('#').trim_start();
        line = line.trim_start_matches('>').trim_start();

        for marker in ["- ", "* ", "+ "] {
            if let Some(rest) = line.strip_prefix(marker) {
                line = rest.trim_start();
            }
        }

        // Ordered list marker: digits followed by a dot and a space
        let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0 {
            if let Some(rest) = line[digits..].strip_prefix(". ") {
                line = rest.trim_start();
            }
        }

        if line.len() == before {
            return line;
        }
    }
}

/// Remove inline markers, link/image targets and HTML tags
fn strip_inline(line: &str, out: &mut String) {
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' | '_' | '`' | '~' => {}
            '!' if chars.peek() == Some(&'[') => {
                // Image: drop alt text and target entirely
                chars.next();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                }
                if chars.peek() == Some(&'(') {
                    for c in chars.by_ref() {
                        if c == ')' {
                            break;
                        }
                    }
                }
            }
            '[' => {
                // Link: keep the text, drop the target
                while let Some(&next) = chars.peek() {
                    chars.next();
                    if next == ']' {
                        break;
                    }
                    if !matches!(next, '*' | '_' | '`') {
                        out.push(next);
                    }
                }
                if chars.peek() == Some(&'(') {
                    for c in chars.by_ref() {
                        if c == ')' {
                            break;
                        }
                    }
                }
            }
            '<' => {
                // Inline HTML tag
                for c in chars.by_ref() {
                    if c == '>' {
                        break;
                    }
                }
            }
            _ => out.push(c),
        }
    }
}
