//! Catalog loading, seeding and hot reload.

mod common;

use std::{sync::Arc, thread};

use complaint_core::{
    catalog::{Branch, CatalogCache, CatalogSource, CategoryRow, StaticCatalog},
    config::PipelineConfig,
    error::CatalogError,
    ids::IdSource,
    normalizer::RawSubmission,
    pipeline::ComplaintPipeline,
    store::ComplaintStore,
};

fn shipped() -> StaticCatalog {
    common::shipped_catalog()
}

/// Same shipped catalog, with the hygiene category renamed and re-keyed.
fn renamed_hygiene() -> StaticCatalog {
    let mut catalog = shipped();
    for row in catalog.categories.iter_mut().filter(|r| r.category_id == 2) {
        row.category_name = "Sanidad".into();
        row.subcategory_name = row.subcategory_name.as_ref().map(|s| format!("{s} (sanidad)"));
    }
    catalog
}

struct Unreachable;

impl CatalogSource for Unreachable {
    fn active_branches(&self) -> Result<Vec<Branch>, CatalogError> {
        Err(CatalogError::Io {
            path: "catalog".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "catalog host down"),
        })
    }

    fn category_rows(&self) -> Result<Vec<CategoryRow>, CatalogError> {
        Ok(Vec::new())
    }
}

/// The shipped data dir loads, and inactive branches are not offered.
#[test]
fn shipped_catalog_loads_active_branches_in_order() {
    let catalog = shipped();
    let cache = CatalogCache::load(&catalog).unwrap();
    let snapshot = cache.snapshot();

    assert_eq!(snapshot.generation, 1);
    assert_eq!(snapshot.branches.len(), 7);
    assert!(snapshot.branches.iter().all(|b| b.name != "Santa Fe"));

    let names: Vec<&str> = snapshot
        .keyword_index
        .entries()
        .iter()
        .map(|e| e.category.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "Calidad del producto",
            "Higiene",
            "Atención del personal",
            "Tiempo de espera",
            "Pedido incorrecto",
            "Precio y cobro",
            "Satisfacción general",
        ]
    );
}

/// Seeding a database keeps registration order exactly.
#[test]
fn seeded_store_returns_rows_in_registration_order() {
    let catalog = shipped();
    let mut store = ComplaintStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.seed_catalog(&catalog).unwrap();

    assert_eq!(store.categories().unwrap(), catalog.categories);
    assert_eq!(store.branches().unwrap(), catalog.active_branches().unwrap());
}

/// Reseeding replaces the previous catalog instead of appending to it.
#[test]
fn reseeding_replaces_catalog() {
    let mut store = ComplaintStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.seed_catalog(&shipped()).unwrap();
    store.seed_catalog(&renamed_hygiene()).unwrap();

    let names: Vec<String> = store
        .categories()
        .unwrap()
        .into_iter()
        .filter(|r| r.category_id == 2)
        .map(|r| r.category_name)
        .collect();
    assert_eq!(names, vec!["Sanidad", "Sanidad"]);
}

/// A missing data dir is an I/O error naming the file.
#[test]
fn missing_data_dir_is_io_error() {
    match StaticCatalog::load("/nonexistent/complaint-data") {
        Err(CatalogError::Io { path, .. }) => assert!(path.ends_with("branches.json")),
        other => panic!("expected Io error, got {other:?}"),
    }
}

/// A failed reload leaves the current snapshot serving.
#[test]
fn failed_reload_keeps_previous_snapshot() {
    let cache = CatalogCache::load(&shipped()).unwrap();
    assert!(cache.reload(&Unreachable).is_err());
    let snapshot = cache.snapshot();
    assert_eq!(snapshot.generation, 1);
    assert_eq!(snapshot.branches.len(), 7);
}

/// Without a catalog, submissions still succeed with defaults.
#[test]
fn unloaded_catalog_degrades_to_defaults() {
    let store = ComplaintStore::in_memory().unwrap();
    store.migrate().unwrap();
    let mut p = ComplaintPipeline::new(
        Arc::new(PipelineConfig::default()),
        Arc::new(CatalogCache::empty()),
        store,
    )
    .unwrap();
    let c = p
        .submit(
            &RawSubmission::new()
                .with("descripcion", "Había una cucaracha")
                .with("sucursal", "Monterrey"),
        )
        .unwrap();

    assert!(c.category.is_default());
    assert_eq!(c.category.category_id, None);
    assert_eq!(c.branch.branch_id, None);
    assert!(c.branch.candidate_ids.is_empty());
}

/// A pipeline reloading from its own store picks up a reseeded catalog.
#[test]
fn reload_from_store_changes_categorization() {
    let mut p = ComplaintPipeline::build_test(&shipped(), 3).unwrap();
    let before = p.submit(&RawSubmission::new().with("descripcion", "una mosca")).unwrap();
    assert_eq!(before.category.category_name, "Higiene");

    p.store_mut().seed_catalog(&renamed_hygiene()).unwrap();
    let snapshot = p.reload_catalog().unwrap();
    assert_eq!(snapshot.generation, 2);

    let after = p.submit(&RawSubmission::new().with("descripcion", "una mosca")).unwrap();
    assert_eq!(after.category.category_name, "Sanidad");
    // Urgency bonuses are keyed by name; the renamed category has none.
    assert!(after.urgency < 3);
}

/// Readers submitting during repeated reloads only ever see one whole
/// catalog or the other, never a mix.
#[test]
fn concurrent_reload_never_tears_a_snapshot() {
    let shipped = shipped();
    let renamed = renamed_hygiene();
    let cache = Arc::new(CatalogCache::load(&shipped).unwrap());
    let config = Arc::new(PipelineConfig::default());

    let workers: Vec<_> = (0..4u64)
        .map(|worker| {
            let cache = Arc::clone(&cache);
            let config = Arc::clone(&config);
            thread::spawn(move || {
                let store = ComplaintStore::in_memory().unwrap();
                store.migrate().unwrap();
                let mut p = ComplaintPipeline::new(config, cache, store)
                    .unwrap()
                    .with_ids(IdSource::seeded(99, worker));
                let mut seen = Vec::new();
                for _ in 0..50 {
                    let c = p
                        .submit(&RawSubmission::new().with("descripcion", "cucaracha en el plato"))
                        .unwrap();
                    seen.push((c.category.category_name, c.category.subcategory_name));
                }
                seen
            })
        })
        .collect();

    for i in 0..20 {
        let source: &StaticCatalog = if i % 2 == 0 { &renamed } else { &shipped };
        cache.reload(source).unwrap();
    }

    for worker in workers {
        for (category, subcategory) in worker.join().unwrap() {
            let subcategory = subcategory.unwrap();
            match category.as_str() {
                "Higiene" => assert_eq!(subcategory, "Contaminación"),
                "Sanidad" => assert_eq!(subcategory, "Contaminación (sanidad)"),
                other => panic!("unexpected category {other}"),
            }
        }
    }
    assert_eq!(cache.snapshot().generation, 21);
}

/// A subcategory listed over several rows is stored once, with every
/// keyword, and the index built from the store matches either row's words.
#[test]
fn repeated_subcategory_rows_seed_as_one() {
    let row = |keywords: &[&str]| CategoryRow {
        category_id: 1,
        category_name: "Calidad del producto".into(),
        criticality: 3,
        subcategory_id: Some(11),
        subcategory_name: Some("Temperatura".into()),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    };
    let catalog = StaticCatalog::new(Vec::new(), vec![row(&["frío", "tibio"]), row(&["helado"])]);

    let mut store = ComplaintStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.seed_catalog(&catalog).unwrap();

    let rows = store.categories().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].subcategory_id, Some(11));
    assert_eq!(rows[0].keywords, vec!["frío", "tibio", "helado"]);

    let cache = CatalogCache::load(&store).unwrap();
    let snapshot = cache.snapshot();
    let (_, sub, keyword) = snapshot.keyword_index.first_keyword("café helado").unwrap();
    assert_eq!(sub.id, 11);
    assert_eq!(keyword, "helado");
}
