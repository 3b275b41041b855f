use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SEQUENCE_ID: AtomicU64 = AtomicU64::new(1);

/// An ordered, immutable sequence of display words.
///
/// Every sequence produced by the tokenizer gets a fresh id; clones share the
/// id and the underlying words. The playback engine compares ids to decide
/// whether a start is a resume (same sequence) or a new document (cursor
/// back to zero), so re-tokenizing a file always counts as a new sequence
/// even when the words come out identical.
#[derive(Debug, Clone)]
pub struct TokenSequence {
    id: u64,
    words: Arc<Vec<String>>,
}

impl TokenSequence {
    pub fn new(words: Vec<String>) -> Self {
        Self {
            id: NEXT_SEQUENCE_ID.fetch_add(1, Ordering::Relaxed),
            words: Arc::new(words),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(String::as_str)
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }
}

/// A loaded document ready for playback
#[derive(Debug, Clone)]
pub struct Document {
    /// Display name of the source file
    pub file_name: String,

    /// Tokenized words in reading order
    pub tokens: TokenSequence,

    /// When the document was loaded
    pub loaded_at: DateTime<Utc>,
}

impl Document {
    pub fn new(file_name: String, words: Vec<String>) -> Self {
        Self {
            file_name,
            tokens: TokenSequence::new(words),
            loaded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_sequences_get_distinct_ids() {
        let a = TokenSequence::new(vec!["same".to_string()]);
        let b = TokenSequence::new(vec!["same".to_string()]);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn clones_share_the_id() {
        let a = TokenSequence::new(vec!["word".to_string()]);
        let b = a.clone();
        assert_eq!(a.id(), b.id());
        assert_eq!(b.get(0), Some("word"));
    }
}
