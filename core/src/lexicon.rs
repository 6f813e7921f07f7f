//! Multi-keyword substring matching.
//!
//! Callers lowercase the text before matching; patterns are stored
//! lowercased. `ascii_case_insensitive` alone would not fold `É` to `é`.

use aho_corasick::{AhoCorasick, BuildError};

/// Ordered keyword list compiled into one automaton. Pattern ids are
/// positions in the list, so a lower id means registered earlier.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    patterns: Vec<String>,
    matcher: Option<AhoCorasick>,
}

impl Lexicon {
    /// Compile `patterns` as given. Blank patterns must already be removed.
    pub fn new(patterns: Vec<String>) -> Result<Self, BuildError> {
        let matcher = if patterns.is_empty() {
            None
        } else {
            Some(AhoCorasick::new(&patterns)?)
        };
        Ok(Self { patterns, matcher })
    }

    /// Trim, lowercase and deduplicate `words`, then compile.
    pub fn from_words(words: &[String]) -> Result<Self, BuildError> {
        let mut patterns: Vec<String> = Vec::with_capacity(words.len());
        for word in words {
            let w = word.trim().to_lowercase();
            if !w.is_empty() && !patterns.contains(&w) {
                patterns.push(w);
            }
        }
        Self::new(patterns)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn pattern(&self, id: usize) -> &str {
        &self.patterns[id]
    }

    /// Number of distinct patterns present in `lowered`.
    pub fn distinct_hits(&self, lowered: &str) -> usize {
        let Some(matcher) = &self.matcher else { return 0 };
        let mut seen = vec![false; self.patterns.len()];
        for m in matcher.find_overlapping_iter(lowered) {
            seen[m.pattern().as_usize()] = true;
        }
        seen.into_iter().filter(|hit| *hit).count()
    }

    /// Id of the earliest-registered pattern present in `lowered`,
    /// wherever it occurs in the text.
    pub fn first_match(&self, lowered: &str) -> Option<usize> {
        let matcher = self.matcher.as_ref()?;
        let mut best: Option<usize> = None;
        for m in matcher.find_overlapping_iter(lowered) {
            let id = m.pattern().as_usize();
            if best.map_or(true, |b| id < b) {
                best = Some(id);
                if id == 0 {
                    break;
                }
            }
        }
        best
    }
}

impl PartialEq for Lexicon {
    fn eq(&self, other: &Self) -> bool {
        self.patterns == other.patterns
    }
}
