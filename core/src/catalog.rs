//! Branch and category catalogs, and the read-mostly cache over them.
//!
//! The catalogs are owned elsewhere; this crate only reads them through
//! `CatalogSource`. `CatalogCache` holds an immutable snapshot behind an
//! `Arc`. A reload builds the next snapshot completely, then swaps the
//! pointer, so readers see either the old catalog or the new one.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::CatalogError,
    lexicon::Lexicon,
    types::{BranchId, CategoryId},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub branch_id: BranchId,
    /// Numeric key used by upstream systems, kept as text.
    pub external_key: String,
    pub name: String,
    pub municipality: String,
    /// Two-letter state code.
    pub state_code: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// One catalog row: a category, optionally one of its subcategories and
/// that subcategory's keywords. Rows for a category may repeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRow {
    pub category_id: CategoryId,
    pub category_name: String,
    pub criticality: u8,
    pub subcategory_id: Option<CategoryId>,
    pub subcategory_name: Option<String>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// 1 (cosmetic) to 5 (critical).
    pub criticality: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subcategory {
    pub id: CategoryId,
    pub name: String,
    pub parent_category_id: CategoryId,
    /// Matched first to last.
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryEntry {
    pub category: Category,
    pub subcategories: Vec<Subcategory>,
}

/// Categories in registration order, each with its subcategories in
/// registration order. Keywords are stored lowercased.
///
/// Every keyword is compiled into one matcher in that same order, so the
/// lowest matching pattern id is the first-registered keyword.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordIndex {
    entries: Vec<CategoryEntry>,
    matcher: Lexicon,
    /// Pattern id -> (entry, subcategory) position.
    targets: Vec<(usize, usize)>,
}

impl KeywordIndex {
    /// Group rows by category, keeping first-seen order everywhere.
    pub fn from_rows(rows: Vec<CategoryRow>) -> Result<Self, CatalogError> {
        let mut entries: Vec<CategoryEntry> = Vec::new();
        for row in rows {
            let pos = match entries.iter().position(|e| e.category.id == row.category_id) {
                Some(pos) => pos,
                None => {
                    entries.push(CategoryEntry {
                        category: Category {
                            id: row.category_id,
                            name: row.category_name.clone(),
                            criticality: row.criticality.clamp(1, 5),
                        },
                        subcategories: Vec::new(),
                    });
                    entries.len() - 1
                }
            };
            let Some(sub_id) = row.subcategory_id else { continue };
            let keywords = row
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty());
            let entry = &mut entries[pos];
            match entry.subcategories.iter_mut().find(|s| s.id == sub_id) {
                Some(existing) => existing.keywords.extend(keywords),
                None => entry.subcategories.push(Subcategory {
                    id: sub_id,
                    name: row.subcategory_name.unwrap_or_default(),
                    parent_category_id: row.category_id,
                    keywords: keywords.collect(),
                }),
            }
        }

        let mut patterns = Vec::new();
        let mut targets = Vec::new();
        for (e, entry) in entries.iter().enumerate() {
            for (s, sub) in entry.subcategories.iter().enumerate() {
                for keyword in &sub.keywords {
                    patterns.push(keyword.clone());
                    targets.push((e, s));
                }
            }
        }
        Ok(Self {
            entries,
            matcher: Lexicon::new(patterns)?,
            targets,
        })
    }

    /// The first-registered keyword contained in `lowered`, with the
    /// category and subcategory it belongs to.
    pub fn first_keyword(&self, lowered: &str) -> Option<(&CategoryEntry, &Subcategory, &str)> {
        let id = self.matcher.first_match(lowered)?;
        let (e, s) = self.targets[id];
        let entry = &self.entries[e];
        Some((entry, &entry.subcategories[s], self.matcher.pattern(id)))
    }

    pub fn entries(&self) -> &[CategoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Category> {
        let wanted = name.trim().to_lowercase();
        self.entries
            .iter()
            .map(|e| &e.category)
            .find(|c| c.name.to_lowercase() == wanted)
    }
}

/// Read side of the external branch and category catalogs.
pub trait CatalogSource {
    fn active_branches(&self) -> Result<Vec<Branch>, CatalogError>;

    /// Rows in registration order.
    fn category_rows(&self) -> Result<Vec<CategoryRow>, CatalogError>;
}

#[derive(Debug, Clone, Deserialize)]
struct BranchFile {
    branches: Vec<Branch>,
}

#[derive(Debug, Clone, Deserialize)]
struct SubcategorySeed {
    subcategory_id: CategoryId,
    name: String,
    keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CategorySeed {
    category_id: CategoryId,
    name: String,
    criticality: u8,
    #[serde(default)]
    subcategories: Vec<SubcategorySeed>,
}

#[derive(Debug, Clone, Deserialize)]
struct CategoryFile {
    categories: Vec<CategorySeed>,
}

/// In-memory catalog, used for seeding a database and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    pub branches: Vec<Branch>,
    pub categories: Vec<CategoryRow>,
}

impl StaticCatalog {
    pub fn new(branches: Vec<Branch>, categories: Vec<CategoryRow>) -> Self {
        Self { branches, categories }
    }

    /// Read `catalog/branches.json` and `catalog/categories.json` under
    /// `data_dir`.
    pub fn load(data_dir: &str) -> Result<Self, CatalogError> {
        let branch_file: BranchFile = read_json(&format!("{data_dir}/catalog/branches.json"))?;
        let category_file: CategoryFile =
            read_json(&format!("{data_dir}/catalog/categories.json"))?;

        let mut categories = Vec::new();
        for cat in category_file.categories {
            if cat.subcategories.is_empty() {
                categories.push(CategoryRow {
                    category_id: cat.category_id,
                    category_name: cat.name.clone(),
                    criticality: cat.criticality,
                    subcategory_id: None,
                    subcategory_name: None,
                    keywords: Vec::new(),
                });
            }
            for sub in cat.subcategories {
                categories.push(CategoryRow {
                    category_id: cat.category_id,
                    category_name: cat.name.clone(),
                    criticality: cat.criticality,
                    subcategory_id: Some(sub.subcategory_id),
                    subcategory_name: Some(sub.name),
                    keywords: sub.keywords,
                });
            }
        }
        Ok(Self::new(branch_file.branches, categories))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, CatalogError> {
    let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

impl CatalogSource for StaticCatalog {
    fn active_branches(&self) -> Result<Vec<Branch>, CatalogError> {
        Ok(self.branches.iter().filter(|b| b.active).cloned().collect())
    }

    fn category_rows(&self) -> Result<Vec<CategoryRow>, CatalogError> {
        Ok(self.categories.clone())
    }
}

/// One immutable, fully built view of both catalogs.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub keyword_index: KeywordIndex,
    pub branches: Vec<Branch>,
    /// 0 for the never-loaded snapshot.
    pub generation: u64,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl CatalogSnapshot {
    pub fn is_loaded(&self) -> bool {
        self.generation > 0
    }
}

pub struct CatalogCache {
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl CatalogCache {
    /// A cache that has never loaded. Categorization and branch
    /// resolution degrade to their defaults until a load succeeds.
    pub fn empty() -> Self {
        Self {
            current: RwLock::new(Arc::new(CatalogSnapshot::default())),
        }
    }

    pub fn load(source: &dyn CatalogSource) -> Result<Self, CatalogError> {
        let cache = Self::empty();
        cache.reload(source)?;
        Ok(cache)
    }

    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot().is_loaded()
    }

    /// Build a new snapshot from `source` and swap it in. On failure the
    /// current snapshot stays in place.
    pub fn reload(&self, source: &dyn CatalogSource) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        let built = source
            .active_branches()
            .and_then(|branches| Ok((branches, source.category_rows()?)));
        let (branches, rows) = match built {
            Ok(parts) => parts,
            Err(e) => {
                log::warn!("catalog reload failed, keeping generation {}: {e}", self.snapshot().generation);
                return Err(e);
            }
        };

        let keyword_index = match KeywordIndex::from_rows(rows) {
            Ok(index) => index,
            Err(e) => {
                log::warn!("catalog reload failed, keeping generation {}: {e}", self.snapshot().generation);
                return Err(e);
            }
        };
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let next = Arc::new(CatalogSnapshot {
            keyword_index,
            branches,
            generation: guard.generation + 1,
            loaded_at: Some(Utc::now()),
        });
        *guard = Arc::clone(&next);
        drop(guard);

        log::info!(
            "catalog generation {} loaded: {} categories, {} branches",
            next.generation,
            next.keyword_index.entries().len(),
            next.branches.len(),
        );
        Ok(next)
    }
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::empty()
    }
}
