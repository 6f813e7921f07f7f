//! Keyword-driven topic assignment.
//!
//! Categories, then subcategories, then keywords are scanned in
//! registration order and the first keyword contained in the text wins.
//! Reordering the catalog changes results.

use serde::{Deserialize, Serialize};

use crate::{
    catalog::{Category, KeywordIndex},
    types::CategoryId,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMatch {
    /// `None` only when the default category is not in the catalog.
    pub category_id: Option<CategoryId>,
    pub category_name: String,
    pub criticality: u8,
    pub subcategory_id: Option<CategoryId>,
    pub subcategory_name: Option<String>,
    pub matched_keyword: Option<String>,
}

impl CategoryMatch {
    pub fn is_default(&self) -> bool {
        self.matched_keyword.is_none()
    }
}

pub struct Categorizer<'a> {
    index: &'a KeywordIndex,
    default_category: &'a str,
}

impl<'a> Categorizer<'a> {
    pub fn new(index: &'a KeywordIndex, default_category: &'a str) -> Self {
        Self { index, default_category }
    }

    pub fn categorize(&self, text: &str) -> CategoryMatch {
        let lowered = text.to_lowercase();
        let Some((entry, sub, keyword)) = self.index.first_keyword(&lowered) else {
            return self.default_match();
        };
        log::debug!(
            "categorized as {} / {} on keyword {keyword:?}",
            entry.category.name,
            sub.name
        );
        CategoryMatch {
            category_id: Some(entry.category.id),
            category_name: entry.category.name.clone(),
            criticality: entry.category.criticality,
            subcategory_id: Some(sub.id),
            subcategory_name: Some(sub.name.clone()),
            matched_keyword: Some(keyword.to_string()),
        }
    }

    fn default_match(&self) -> CategoryMatch {
        let known: Option<&Category> = self.index.find_by_name(self.default_category);
        CategoryMatch {
            category_id: known.map(|c| c.id),
            category_name: known
                .map(|c| c.name.clone())
                .unwrap_or_else(|| self.default_category.to_string()),
            criticality: known.map(|c| c.criticality).unwrap_or(1),
            subcategory_id: None,
            subcategory_name: None,
            matched_keyword: None,
        }
    }
}
