//! complaint-runner: feed raw complaint submissions through the pipeline.
//!
//! Usage:
//!   complaint-runner --db complaints.db --data-dir ./data --seed-catalog
//!   complaint-runner --config rules.json --seed 42 < submissions.jsonl
//!
//! Reads one JSON command per line on stdin and answers with one JSON
//! line on stdout. Logs go to stderr (RUST_LOG).

use anyhow::Result;
use complaint_core::{
    catalog::{CatalogCache, StaticCatalog},
    complaint::{AnalysisMetadata, EnrichedComplaint},
    config::PipelineConfig,
    customer::CustomerRecord,
    ids::IdSource,
    insight::InsightRecord,
    normalizer::RawSubmission,
    pipeline::ComplaintPipeline,
    store::ComplaintStore,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Submit { raw: RawSubmission },
    Get { complaint_id: String },
    Reload,
    Summary,
    Quit,
}

#[derive(serde::Serialize)]
struct Submitted {
    complaint: EnrichedComplaint,
    insights: Vec<InsightRecord>,
}

#[derive(serde::Serialize)]
struct ComplaintView {
    complaint: EnrichedComplaint,
    customer: Option<CustomerRecord>,
    insights: Vec<InsightRecord>,
    analysis: Option<AnalysisMetadata>,
}

#[derive(serde::Serialize)]
struct Reloaded {
    generation: u64,
    categories: usize,
    branches: usize,
}

#[derive(serde::Serialize)]
struct Summary {
    catalog_generation: u64,
    complaints: i64,
    customers: i64,
    insights: i64,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let config_path = flag_value(&args, "--config");
    let seed: Option<u64> = flag_value(&args, "--seed").and_then(|s| s.parse().ok());
    let seed_catalog = args.iter().any(|a| a == "--seed-catalog");

    let config = match config_path {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    // A plain :memory: database would start empty, so give it a shared
    // name and always seed it.
    let in_memory = db == ":memory:";
    let db_effective: String = if in_memory {
        format!(
            "file:complaints_{}?mode=memory&cache=shared",
            chrono::Utc::now().timestamp_millis()
        )
    } else {
        db.to_string()
    };
    let mut store = ComplaintStore::open(&db_effective)?;
    store.migrate()?;

    if seed_catalog || in_memory {
        let catalog = StaticCatalog::load(data_dir)?;
        store.seed_catalog(&catalog)?;
    }

    let cache = Arc::new(CatalogCache::empty());
    if let Err(e) = cache.reload(&store) {
        log::warn!("starting without a catalog: {e}");
    }

    let mut pipeline = ComplaintPipeline::new(Arc::new(config), cache, store)?;
    if let Some(seed) = seed {
        pipeline = pipeline.with_ids(IdSource::seeded(seed, 0));
    }

    log::info!(
        "complaint-runner ready: db={db} data_dir={data_dir} seed={} catalog generation {}",
        seed.map(|s| s.to_string()).unwrap_or_else(|| "random".into()),
        pipeline.catalog().snapshot().generation,
    );

    run_ipc_loop(&mut pipeline)
}

fn run_ipc_loop(pipeline: &mut ComplaintPipeline) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let response = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Submit { raw } => handle_submit(pipeline, &raw)?,
            IpcCommand::Get { complaint_id } => handle_get(pipeline, &complaint_id)?,
            IpcCommand::Reload => match pipeline.reload_catalog() {
                Ok(snapshot) => serde_json::to_value(Reloaded {
                    generation: snapshot.generation,
                    categories: snapshot.keyword_index.entries().len(),
                    branches: snapshot.branches.len(),
                })?,
                Err(e) => serde_json::json!({ "error": e.to_string() }),
            },
            IpcCommand::Summary => serde_json::to_value(build_summary(pipeline)?)?,
        };
        writeln!(stdout, "{}", response)?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_submit(pipeline: &mut ComplaintPipeline, raw: &RawSubmission) -> Result<serde_json::Value> {
    match pipeline.submit(raw) {
        Ok(complaint) => {
            let insights = pipeline.store().insights_for_complaint(&complaint.complaint_id)?;
            Ok(serde_json::to_value(Submitted { complaint, insights })?)
        }
        Err(e) => Ok(serde_json::json!({
            "error": e.to_string(),
            "stage": e.stage().as_str(),
        })),
    }
}

fn handle_get(pipeline: &ComplaintPipeline, complaint_id: &str) -> Result<serde_json::Value> {
    let store = pipeline.store();
    let Some(complaint) = store.get_complaint(complaint_id)? else {
        return Ok(serde_json::json!({ "error": format!("unknown complaint {complaint_id}") }));
    };
    let view = ComplaintView {
        customer: store.get_customer(&complaint.customer_id)?,
        insights: store.insights_for_complaint(complaint_id)?,
        analysis: store.analysis_metadata(complaint_id)?,
        complaint,
    };
    Ok(serde_json::to_value(view)?)
}

fn build_summary(pipeline: &ComplaintPipeline) -> Result<Summary> {
    let store = pipeline.store();
    Ok(Summary {
        catalog_generation: pipeline.catalog().snapshot().generation,
        complaints: store.complaint_count()?,
        customers: store.customer_count()?,
        insights: store.insight_count()?,
    })
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
