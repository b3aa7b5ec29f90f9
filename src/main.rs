use anyhow::Context;
use clap::Parser;
use reach::{
    BatchOrchestrator, BatchReport, LmdbStore, MemoryStore, Operation, ReachConfig, RecordId,
    RecordStore, TraitKind,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Compute lineage reach statistics for records in a citation graph
#[derive(Parser, Debug)]
#[command(name = "reach")]
#[command(about = "Measure how far descendants drift from their ancestors", long_about = None)]
struct Args {
    /// JSON config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the LMDB data directory
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// JSON-lines file of records to load before the run
    #[arg(long)]
    import: Option<PathBuf>,

    /// JSON-lines file to write records to after an in-memory run
    #[arg(long)]
    output: Option<PathBuf>,

    /// Trait kind: tf-idf, w2v or lda
    #[arg(short = 't', long = "trait")]
    trait_kind: Option<TraitKind>,

    /// Generations to crawl below each root
    #[arg(short = 'n', long)]
    generations: Option<usize>,

    /// reach (sum/avg distance) or variance
    #[arg(long)]
    operation: Option<Operation>,

    /// Comma-separated root ids; default is every record carrying the trait.
    /// Prefix with `s:` to address a string id that looks numeric
    #[arg(long, value_delimiter = ',')]
    ids: Vec<RecordId>,

    /// Only include descendants with more than this many citations
    #[arg(long)]
    min_citations: Option<usize>,

    /// Stem -> index JSON file, needed for tf-idf variance
    #[arg(long)]
    vocabulary: Option<PathBuf>,

    /// Topic count of the LDA model
    #[arg(long)]
    topics: Option<usize>,

    /// Roots per store batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Log progress every N roots
    #[arg(long)]
    progress_every: Option<usize>,

    /// Worker threads (default: one per core)
    #[arg(long)]
    workers: Option<usize>,

    /// Checkpoint file for resumable store-wide runs
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> anyhow::Result<ReachConfig> {
        let mut config = match &self.config {
            Some(path) => ReachConfig::load(path)?,
            None => ReachConfig::default(),
        };
        if self.data_dir.is_some() {
            config.data_dir = self.data_dir;
        }
        if self.import.is_some() {
            config.import = self.import;
        }
        if self.output.is_some() {
            config.output = self.output;
        }
        if let Some(kind) = self.trait_kind {
            config.trait_kind = kind;
        }
        if let Some(n) = self.generations {
            config.generations = n;
        }
        if let Some(op) = self.operation {
            config.operation = op;
        }
        if !self.ids.is_empty() {
            config.ids = self.ids;
        }
        if self.min_citations.is_some() {
            config.min_citations = self.min_citations;
        }
        if self.vocabulary.is_some() {
            config.vocabulary = self.vocabulary;
        }
        if let Some(topics) = self.topics {
            config.topics = topics;
        }
        if let Some(size) = self.batch_size {
            config.batch.batch_size = size;
        }
        if let Some(every) = self.progress_every {
            config.batch.progress_every = every;
        }
        if self.workers.is_some() {
            config.batch.workers = self.workers;
        }
        if self.checkpoint.is_some() {
            config.batch.checkpoint = self.checkpoint;
        }
        Ok(config)
    }
}

fn run_with<S: RecordStore + ?Sized>(
    store: &S,
    config: &ReachConfig,
    cancel: Arc<AtomicBool>,
) -> anyhow::Result<BatchReport> {
    let registry = config.registry()?;
    let predicate = config.predicate();
    let job = config.job();
    let orchestrator =
        BatchOrchestrator::new(store, &registry, config.batch_config()).with_cancel_flag(cancel);

    let report = if config.ids.is_empty() {
        info!("Computing {} over every record with {}", job.id(), job.kind.field());
        orchestrator.run_store(&job, predicate.as_ref())?
    } else {
        orchestrator.run_family(&config.ids, &job, predicate.as_ref())?
    };
    Ok(report)
}

fn run(config: ReachConfig, cancel: Arc<AtomicBool>) -> anyhow::Result<BatchReport> {
    match &config.data_dir {
        Some(dir) => {
            info!("Data directory: {:?}", dir);
            let store = LmdbStore::open(dir)?;
            if let Some(path) = &config.import {
                let records = MemoryStore::from_json_lines(path)?.iter();
                let n = store.insert_batch(records)?;
                info!("Imported {} records into {:?}", n, dir);
            }
            if config.output.is_some() {
                warn!("--output only applies to in-memory runs; results are stored in {:?}", dir);
            }
            run_with(&store, &config, cancel)
        }
        None => {
            let path = config
                .import
                .as_ref()
                .context("either --data-dir or --import is required")?;
            let store = MemoryStore::from_json_lines(path)?;
            let report = run_with(&store, &config, cancel)?;
            match &config.output {
                Some(out) => {
                    let n = store.write_json_lines(out)?;
                    info!("Wrote {} records to {:?}", n, out);
                }
                None => warn!("In-memory run without --output; results are discarded"),
            }
            Ok(report)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting reach v{}", env!("CARGO_PKG_VERSION"));
    let config = args.into_config()?;
    info!("Job: {}", config.job().id());

    let cancel = Arc::new(AtomicBool::new(false));
    let signal_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, stopping after in-flight records");
            signal_flag.store(true, Ordering::Release);
        }
    });

    let report = tokio::task::spawn_blocking(move || run(config, cancel)).await??;

    info!(
        "Done: {} processed, {} updated, {} missing, {} failed{}",
        report.processed,
        report.updated,
        report.missing,
        report.failed,
        if report.cancelled { " (cancelled)" } else { "" }
    );
    Ok(())
}
