//! Lexicon-based sentiment scoring.
//!
//! Keywords are matched as case-insensitive substrings, so a keyword
//! inside a longer word still counts. Each keyword counts once no matter
//! how often it appears.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{config::SentimentLexicon, error::ConfigError, lexicon::Lexicon};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    VeryNegative,
    Negative,
    Neutral,
    Positive,
}

impl SentimentLabel {
    /// The score paired with each label. Label and score never diverge.
    pub fn score(self) -> f64 {
        match self {
            SentimentLabel::VeryNegative => -0.8,
            SentimentLabel::Negative     => -0.4,
            SentimentLabel::Neutral      =>  0.0,
            SentimentLabel::Positive     =>  0.6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::VeryNegative => "very_negative",
            SentimentLabel::Negative     => "negative",
            SentimentLabel::Neutral      => "neutral",
            SentimentLabel::Positive     => "positive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "very_negative" => Some(SentimentLabel::VeryNegative),
            "negative"      => Some(SentimentLabel::Negative),
            "neutral"       => Some(SentimentLabel::Neutral),
            "positive"      => Some(SentimentLabel::Positive),
            _ => None,
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    pub score: f64,
}

impl From<SentimentLabel> for SentimentResult {
    fn from(label: SentimentLabel) -> Self {
        Self { label, score: label.score() }
    }
}

/// Result plus the distinct keyword hits that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentAnalysis {
    pub result: SentimentResult,
    pub negative_hits: usize,
    pub positive_hits: usize,
}

pub struct SentimentScorer {
    negative: Lexicon,
    positive: Lexicon,
}

impl SentimentScorer {
    pub fn new(lexicon: &SentimentLexicon) -> Result<Self, ConfigError> {
        let compile = |lexicon: &'static str, words: &[String]| {
            Lexicon::from_words(words).map_err(|source| ConfigError::Lexicon { lexicon, source })
        };
        Ok(Self {
            negative: compile("negative sentiment", &lexicon.negative)?,
            positive: compile("positive sentiment", &lexicon.positive)?,
        })
    }

    pub fn score(&self, text: &str) -> SentimentResult {
        self.analyze(text).result
    }

    pub fn analyze(&self, text: &str) -> SentimentAnalysis {
        let lowered = text.to_lowercase();
        let negative_hits = self.negative.distinct_hits(&lowered);
        let positive_hits = self.positive.distinct_hits(&lowered);
        SentimentAnalysis {
            result: classify(negative_hits, positive_hits).into(),
            negative_hits,
            positive_hits,
        }
    }
}

fn classify(neg: usize, pos: usize) -> SentimentLabel {
    if neg > pos + 1 {
        SentimentLabel::VeryNegative
    } else if neg > pos {
        SentimentLabel::Negative
    } else if pos > neg {
        SentimentLabel::Positive
    } else {
        SentimentLabel::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> SentimentScorer {
        SentimentScorer::new(&SentimentLexicon::default()).unwrap()
    }

    #[test]
    fn empty_text_is_neutral() {
        let s = scorer();
        for _ in 0..3 {
            assert_eq!(s.score(""), SentimentResult { label: SentimentLabel::Neutral, score: 0.0 });
        }
    }

    #[test]
    fn two_negatives_without_positives_is_very_negative() {
        let r = scorer().score("La comida estaba horrible y el baño sucio");
        assert_eq!(r.label, SentimentLabel::VeryNegative);
        assert_eq!(r.score, -0.8);
    }

    #[test]
    fn one_negative_is_negative() {
        let r = scorer().score("El café estaba horrible");
        assert_eq!(r.label, SentimentLabel::Negative);
        assert_eq!(r.score, -0.4);
    }

    #[test]
    fn negative_margin_of_one_is_negative_not_very() {
        let a = scorer().analyze("Excelente lugar pero la carne cruda y quemado el pan, terrible");
        assert_eq!(a.positive_hits, 1);
        assert_eq!(a.negative_hits, 2);
        assert_eq!(a.result.label, SentimentLabel::Negative);
    }

    #[test]
    fn positives_win_when_ahead() {
        let r = scorer().score("Todo delicioso y el mesero muy amable, gracias");
        assert_eq!(r.label, SentimentLabel::Positive);
        assert_eq!(r.score, 0.6);
    }

    #[test]
    fn tie_is_neutral() {
        let r = scorer().score("La comida buena pero el servicio lento");
        assert_eq!(r.label, SentimentLabel::Neutral);
    }

    #[test]
    fn repeated_keyword_counts_once() {
        let a = scorer().analyze("horrible horrible horrible");
        assert_eq!(a.negative_hits, 1);
        assert_eq!(a.result.label, SentimentLabel::Negative);
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let a = scorer().analyze("PÉSIMO, simplemente HORRIBLEMENTE malo");
        assert_eq!(a.negative_hits, 3);
        assert_eq!(a.result.label, SentimentLabel::VeryNegative);
    }

    #[test]
    fn label_round_trips_through_str() {
        for label in [
            SentimentLabel::VeryNegative,
            SentimentLabel::Negative,
            SentimentLabel::Neutral,
            SentimentLabel::Positive,
        ] {
            assert_eq!(SentimentLabel::parse(label.as_str()), Some(label));
        }
    }
}
