//! Point-in-time view of the whole word list.

use crate::model::word::Word;
use std::ops::Deref;
use std::sync::Arc;

/// Immutable, ordered view of all words at one serialization point.
///
/// Words are sorted by `text` ascending, ties broken by ascending `id`.
/// Cloning is cheap: the word list is shared, never copied or mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    revision: u64,
    words: Arc<[Word]>,
}

impl Snapshot {
    /// Creates a snapshot from an already ordered word list.
    pub fn new(revision: u64, words: Vec<Word>) -> Self {
        Self {
            revision,
            words: words.into(),
        }
    }

    /// Empty snapshot at revision 0.
    pub fn empty() -> Self {
        Self::new(0, Vec::new())
    }

    /// Publish counter; strictly increases with every published snapshot.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Word texts in snapshot order.
    pub fn texts(&self) -> Vec<&str> {
        self.words.iter().map(|word| word.text.as_str()).collect()
    }

    pub(crate) fn next(&self, words: Vec<Word>) -> Self {
        Self::new(self.revision + 1, words)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl Deref for Snapshot {
    type Target = [Word];

    fn deref(&self) -> &Self::Target {
        &self.words
    }
}

#[cfg(test)]
mod tests {
    use super::Snapshot;
    use crate::model::word::Word;

    #[test]
    fn next_bumps_revision_and_replaces_words() {
        let first = Snapshot::empty();
        let second = first.next(vec![Word::new(1, "Hello").unwrap()]);

        assert_eq!(second.revision(), 1);
        assert_eq!(second.texts(), vec!["Hello"]);
        assert!(first.is_empty());
    }
}
