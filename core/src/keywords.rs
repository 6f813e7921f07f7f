//! Frequency-ranked keyword extraction.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::KeywordConfig;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").expect("NON_WORD regex"));

pub struct KeywordExtractor {
    stop_words: Vec<String>,
    min_token_chars: usize,
}

impl KeywordExtractor {
    pub fn new(config: &KeywordConfig) -> Self {
        Self {
            stop_words: config.stop_words.iter().map(|w| w.to_lowercase()).collect(),
            min_token_chars: config.min_token_chars,
        }
    }

    /// Up to `top_n` tokens, most frequent first. Equal counts keep the
    /// order in which the tokens first appeared.
    pub fn extract(&self, text: &str, top_n: usize) -> Vec<String> {
        let lowered = text.to_lowercase();

        // (token, count) in first-occurrence order; the map only indexes it.
        let mut counts: Vec<(&str, usize)> = Vec::new();
        let mut slot: HashMap<&str, usize> = HashMap::new();
        for token in NON_WORD.split(&lowered) {
            if !self.keeps(token) {
                continue;
            }
            match slot.get(token) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    slot.insert(token, counts.len());
                    counts.push((token, 1));
                }
            }
        }

        // Stable sort keeps first-occurrence order among ties.
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
            .into_iter()
            .take(top_n)
            .map(|(token, _)| token.to_string())
            .collect()
    }

    fn keeps(&self, token: &str) -> bool {
        !token.is_empty()
            && token.chars().count() >= self.min_token_chars
            && !token.chars().all(char::is_numeric)
            && !self.stop_words.iter().any(|w| w == token)
    }
}
