//! Shared fixtures for integration tests.
#![allow(dead_code)]

use complaint_core::{catalog::StaticCatalog, pipeline::ComplaintPipeline};

pub const DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// The catalog shipped under `data/catalog`.
pub fn shipped_catalog() -> StaticCatalog {
    StaticCatalog::load(DATA_DIR).unwrap()
}

/// In-memory pipeline over the shipped catalog, fixed clock, seeded ids.
pub fn pipeline(seed: u64) -> ComplaintPipeline {
    init_logging();
    ComplaintPipeline::build_test(&shipped_catalog(), seed).unwrap()
}
