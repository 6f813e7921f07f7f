//! Urgency scoring: sentiment plus per-category bonus, with an emergency
//! keyword override.

use crate::{
    config::UrgencyConfig,
    error::ConfigError,
    lexicon::Lexicon,
    sentiment::{SentimentLabel, SentimentResult},
    types::Urgency,
};

pub const MIN_URGENCY: Urgency = 1;
pub const MAX_URGENCY: Urgency = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrgencyAssessment {
    pub level: Urgency,
    /// Set when an emergency keyword forced the maximum.
    pub emergency_keyword: Option<String>,
}

pub struct UrgencyCalculator {
    bonuses: Vec<(String, i32)>,
    emergency_keywords: Lexicon,
}

impl UrgencyCalculator {
    pub fn new(config: &UrgencyConfig) -> Result<Self, ConfigError> {
        let emergency_keywords = Lexicon::from_words(&config.emergency_keywords).map_err(|source| {
            ConfigError::Lexicon {
                lexicon: "emergency",
                source,
            }
        })?;
        Ok(Self {
            bonuses: config
                .category_bonuses
                .iter()
                .map(|b| (b.category.trim().to_lowercase(), b.bonus))
                .collect(),
            emergency_keywords,
        })
    }

    /// Additive score from sentiment and category name, clamped to 1..=5.
    pub fn calculate(&self, sentiment: &SentimentResult, category_name: &str) -> Urgency {
        let sentiment_bump = match sentiment.label {
            SentimentLabel::VeryNegative => 2,
            SentimentLabel::Negative => 1,
            SentimentLabel::Neutral | SentimentLabel::Positive => 0,
        };
        let level = 1 + sentiment_bump + self.category_bonus(category_name);
        level.clamp(MIN_URGENCY as i32, MAX_URGENCY as i32) as Urgency
    }

    /// `calculate`, unless the text holds an emergency keyword.
    pub fn assess(&self, sentiment: &SentimentResult, category_name: &str, text: &str) -> UrgencyAssessment {
        if let Some(keyword) = self.emergency_keyword(text) {
            log::debug!("emergency keyword {keyword:?} forces urgency {MAX_URGENCY}");
            return UrgencyAssessment {
                level: MAX_URGENCY,
                emergency_keyword: Some(keyword.to_string()),
            };
        }
        UrgencyAssessment {
            level: self.calculate(sentiment, category_name),
            emergency_keyword: None,
        }
    }

    pub fn category_bonus(&self, category_name: &str) -> i32 {
        let wanted = category_name.trim().to_lowercase();
        self.bonuses
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, bonus)| *bonus)
            .unwrap_or(0)
    }

    fn emergency_keyword(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.emergency_keywords
            .first_match(&lowered)
            .map(|id| self.emergency_keywords.pattern(id))
    }
}
