use super::ComplaintStore;
use crate::{
    catalog::{Branch, CatalogSource, CategoryRow},
    error::{CatalogError, StoreResult},
};
use rusqlite::params;
use std::collections::HashMap;

impl ComplaintStore {
    // ── Catalog seeding ──────────────────────────────────────────────

    /// Replace the branch and category tables with `source`'s contents,
    /// keeping its row order as registration order.
    pub fn seed_catalog(&mut self, source: &dyn CatalogSource) -> Result<(), CatalogError> {
        let branches = source.active_branches()?;
        let rows = source.category_rows()?;
        self.replace_catalog(&branches, &rows)?;
        log::info!(
            "seeded catalog: {} branches, {} category rows",
            branches.len(),
            rows.len()
        );
        Ok(())
    }

    fn replace_catalog(&mut self, branches: &[Branch], rows: &[CategoryRow]) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch("DELETE FROM subcategory; DELETE FROM category; DELETE FROM branch;")?;

        for b in branches {
            tx.execute(
                "INSERT INTO branch (branch_id, external_key, name, municipality, state_code, active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    b.branch_id,
                    &b.external_key,
                    &b.name,
                    &b.municipality,
                    &b.state_code,
                    if b.active { 1i32 } else { 0i32 },
                ],
            )?;
        }

        let mut category_pos = 0i64;
        // A subcategory split over several rows is stored once, at its
        // first position, under its first category and name.
        let mut subcategories: Vec<(&CategoryRow, Vec<&str>)> = Vec::new();
        let mut slot: HashMap<i64, usize> = HashMap::new();
        for row in rows {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO category (category_id, name, criticality, position)
                 VALUES (?1, ?2, ?3, ?4)",
                params![row.category_id, &row.category_name, row.criticality, category_pos],
            )?;
            if inserted > 0 {
                category_pos += 1;
            }
            let Some(sub_id) = row.subcategory_id else { continue };
            let keywords = row.keywords.iter().map(String::as_str);
            match slot.get(&sub_id) {
                Some(&i) => subcategories[i].1.extend(keywords),
                None => {
                    slot.insert(sub_id, subcategories.len());
                    subcategories.push((row, keywords.collect()));
                }
            }
        }

        for (position, (row, keywords)) in subcategories.iter().enumerate() {
            tx.execute(
                "INSERT INTO subcategory (subcategory_id, category_id, name, position, keywords_json)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.subcategory_id,
                    row.category_id,
                    row.subcategory_name.as_deref().unwrap_or_default(),
                    position as i64,
                    serde_json::to_string(keywords)?,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    // ── Catalog reads ────────────────────────────────────────────────

    pub fn branches(&self) -> StoreResult<Vec<Branch>> {
        let mut stmt = self.conn.prepare(
            "SELECT branch_id, external_key, name, municipality, state_code, active
             FROM branch WHERE active = 1
             ORDER BY branch_id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Branch {
                branch_id: row.get(0)?,
                external_key: row.get(1)?,
                name: row.get(2)?,
                municipality: row.get(3)?,
                state_code: row.get(4)?,
                active: row.get::<_, i32>(5)? != 0,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn categories(&self) -> StoreResult<Vec<CategoryRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.category_id, c.name, c.criticality,
                    s.subcategory_id, s.name, s.keywords_json
             FROM category c
             LEFT JOIN subcategory s ON s.category_id = c.category_id
             ORDER BY c.position ASC, s.position ASC",
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u8>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = Vec::with_capacity(raw.len());
        for (category_id, category_name, criticality, subcategory_id, subcategory_name, keywords) in raw {
            let keywords: Vec<String> = match keywords {
                Some(json) => serde_json::from_str(&json)?,
                None => Vec::new(),
            };
            rows.push(CategoryRow {
                category_id,
                category_name,
                criticality,
                subcategory_id,
                subcategory_name,
                keywords,
            });
        }
        Ok(rows)
    }
}

impl CatalogSource for ComplaintStore {
    fn active_branches(&self) -> Result<Vec<Branch>, CatalogError> {
        Ok(self.branches()?)
    }

    fn category_rows(&self) -> Result<Vec<CategoryRow>, CatalogError> {
        Ok(self.categories()?)
    }
}
