//! Batch orchestration: apply a [`ReachJob`] to many roots and write each
//! root's statistics back onto its own record.
//!
//! Roots are independent and every write touches only the root's own
//! result fields, so batches run on a rayon pool with no ordering between
//! roots. A failing root is logged and skipped. Re-running a job recomputes
//! and overwrites the same fields, which is how a partial run recovers.

use crate::aggregate::{Aggregator, ReachJob};
use reach_core::{Error, FilterCondition, Projection, RecordFilter, RecordId, Result, TraitRegistry};
use reach_storage::{Checkpoint, CheckpointFile, RecordStore};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Roots fetched per store page
    pub batch_size: usize,
    /// Log progress every this many processed roots
    pub progress_every: usize,
    /// Worker threads; `None` uses one per core
    pub workers: Option<usize>,
    /// Where to persist scan progress between batches
    pub checkpoint: Option<PathBuf>,
    /// Settings a checkpoint must have been written under to be resumed
    #[serde(skip)]
    pub fingerprint: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            progress_every: 500,
            workers: None,
            checkpoint: None,
            fingerprint: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub processed: usize,
    pub updated: usize,
    pub missing: usize,
    pub failed: usize,
    pub cancelled: bool,
}

#[derive(Default)]
struct Counters {
    processed: AtomicUsize,
    updated: AtomicUsize,
    missing: AtomicUsize,
    failed: AtomicUsize,
}

impl Counters {
    fn resumed(checkpoint: &Checkpoint) -> Self {
        Self {
            processed: AtomicUsize::new(checkpoint.processed),
            updated: AtomicUsize::new(checkpoint.updated),
            missing: AtomicUsize::new(checkpoint.missing),
            failed: AtomicUsize::new(checkpoint.failed),
        }
    }

    fn report(&self, cancelled: bool) -> BatchReport {
        BatchReport {
            processed: self.processed.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            missing: self.missing.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled,
        }
    }
}

pub struct BatchOrchestrator<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    registry: &'a TraitRegistry,
    config: BatchConfig,
    cancel: Arc<AtomicBool>,
}

impl<'a, S: RecordStore + ?Sized> BatchOrchestrator<'a, S> {
    pub fn new(store: &'a S, registry: &'a TraitRegistry, config: BatchConfig) -> Self {
        Self {
            store,
            registry,
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a cancellation flag, e.g. with a signal handler
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Process an explicit set of roots, one after another
    pub fn run_family(
        &self,
        roots: &[RecordId],
        job: &ReachJob,
        predicate: &dyn RecordFilter,
    ) -> Result<BatchReport> {
        job.validate(self.registry)?;
        let counters = Counters::default();
        for root in roots {
            if self.cancelled() {
                return Ok(counters.report(true));
            }
            info!(
                "Computing {} gen {} {} for record {}",
                job.generations, job.kind, job.operation, root
            );
            self.process_one(root, job, predicate, &counters);
        }
        Ok(counters.report(false))
    }

    /// Process every record carrying the job's trait field, page by page
    pub fn run_store(&self, job: &ReachJob, predicate: &dyn RecordFilter) -> Result<BatchReport> {
        job.validate(self.registry)?;
        if self.config.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be positive".to_string()));
        }

        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(workers) = self.config.workers {
            builder = builder.num_threads(workers);
        }
        let pool = builder
            .build()
            .map_err(|e| Error::InvalidConfig(format!("worker pool: {}", e)))?;

        let job_id = job.id();
        let checkpoint = self.config.checkpoint.as_ref().map(CheckpointFile::new);
        let fingerprint = self.config.fingerprint.as_str();
        let resume = match &checkpoint {
            Some(file) => match file.load()? {
                Some(c) if c.matches(&job_id, fingerprint) => Some(c),
                Some(c) => {
                    warn!(
                        "Ignoring checkpoint {} from {} [{}]; starting {} [{}] from the beginning",
                        file.path().display(),
                        c.job,
                        c.fingerprint,
                        job_id,
                        fingerprint
                    );
                    None
                }
                None => None,
            },
            None => None,
        };
        let mut after = resume.as_ref().map(|c| c.last_id.clone());
        let counters = resume.as_ref().map(Counters::resumed).unwrap_or_default();
        if let Some(c) = &resume {
            info!("Resuming {} after record {} ({} done)", job_id, c.last_id, c.processed);
        }

        let query = FilterCondition::exists(job.kind.field());
        loop {
            if self.cancelled() {
                info!("{} cancelled", job_id);
                return Ok(counters.report(true));
            }

            let page = self.store.find(
                &query,
                &Projection::id_only(),
                after.as_ref(),
                self.config.batch_size,
            )?;
            let last = match page.last() {
                Some(record) => record.id.clone(),
                None => break,
            };
            debug!("{}: batch of {} roots", job_id, page.len());

            pool.install(|| {
                page.par_iter().for_each(|record| {
                    if !self.cancelled() {
                        self.process_one(&record.id, job, predicate, &counters);
                    }
                });
            });

            if self.cancelled() {
                // The page may be partial; leave the checkpoint at the previous page
                info!("{} cancelled", job_id);
                return Ok(counters.report(true));
            }
            if let Some(file) = &checkpoint {
                let done = counters.report(false);
                let saved = Checkpoint::new(&job_id, fingerprint, last.clone())
                    .with_counts(done.processed, done.updated, done.missing, done.failed);
                file.save(&saved)?;
            }
            after = Some(last);
        }

        if let Some(file) = &checkpoint {
            file.clear()?;
        }
        let report = counters.report(false);
        info!(
            "{} finished: {} processed, {} updated, {} missing, {} failed",
            job_id, report.processed, report.updated, report.missing, report.failed
        );
        Ok(report)
    }

    fn process_one(
        &self,
        root: &RecordId,
        job: &ReachJob,
        predicate: &dyn RecordFilter,
        counters: &Counters,
    ) {
        let aggregator = Aggregator::new(self.store, self.registry);
        let outcome = aggregator
            .compute(root, job, predicate)
            .and_then(|stats| self.store.update(root, &stats.to_update()));

        match outcome {
            Ok(true) => {
                counters.updated.fetch_add(1, Ordering::Relaxed);
            }
            Ok(false) | Err(Error::NoSuchRecord(_)) => {
                counters.missing.fetch_add(1, Ordering::Relaxed);
                warn!(record = %root, operation = %job.id(), "record not found, skipped");
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(record = %root, operation = %job.id(), error = %e, "record failed, skipped");
            }
        }

        let processed = counters.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if self.config.progress_every > 0 && processed % self.config.progress_every == 0 {
            info!("{}: {} roots processed", job.id(), processed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reach_core::{IncludeAll, Record, Statistic, TraitKind, NO_DATA};
    use reach_storage::MemoryStore;
    use serde_json::json;

    fn store() -> MemoryStore {
        MemoryStore::from_records([
            Record::new(1u64).with_children([2u64, 3]).with_field("doc_vec", json!([1.0, 0.0])),
            Record::new(2u64).with_field("doc_vec", json!([1.0, 0.0])),
            Record::new(3u64).with_field("doc_vec", json!([0.0, 1.0])),
            // zero vector makes distances from 4 undefined
            Record::new(4u64).with_children([2u64]).with_field("doc_vec", json!([0.0, 0.0])),
            Record::new(5u64),
        ])
    }

    fn avg(store: &MemoryStore, id: u64) -> Option<f64> {
        store
            .get(&RecordId::Integer(id))
            .and_then(|r| r.get("1_gen_avg_dist_w2v").and_then(|v| v.as_f64()))
    }

    #[test]
    fn test_family_run_skips_failures() {
        let store = store();
        let registry = TraitRegistry::new();
        let orchestrator = BatchOrchestrator::new(&store, &registry, BatchConfig::default());
        let roots: Vec<RecordId> = vec![1u64.into(), 4u64.into(), 42u64.into(), 2u64.into()];
        let report = orchestrator
            .run_family(&roots, &ReachJob::reach(TraitKind::SemanticVector, 1), &IncludeAll)
            .unwrap();

        assert_eq!(report.processed, 4);
        assert_eq!(report.updated, 2);
        assert_eq!(report.missing, 1);
        assert_eq!(report.failed, 1);
        assert!(!report.cancelled);
        assert_eq!(avg(&store, 1), Some(0.5));
        assert_eq!(avg(&store, 2), Some(0.0));
        assert_eq!(avg(&store, 4), None);
    }

    #[test]
    fn test_store_run_covers_trait_bearing_records() {
        let store = store();
        let registry = TraitRegistry::new();
        let config = BatchConfig {
            batch_size: 2,
            progress_every: 1,
            workers: Some(2),
            ..BatchConfig::default()
        };
        let report = BatchOrchestrator::new(&store, &registry, config)
            .run_store(&ReachJob::reach(TraitKind::SemanticVector, 1), &IncludeAll)
            .unwrap();

        // record 5 has no doc_vec and is never scanned
        assert_eq!(report.processed, 4);
        assert_eq!(report.updated, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(avg(&store, 1), Some(0.5));
        assert_eq!(avg(&store, 3), Some(0.0));
        assert!(store
            .get(&RecordId::Integer(5))
            .unwrap()
            .get("1_gen_avg_dist_w2v")
            .is_none());
    }

    #[test]
    fn test_variance_job_writes_variance_field() {
        let store = store();
        let registry = TraitRegistry::new();
        BatchOrchestrator::new(&store, &registry, BatchConfig::default())
            .run_family(&[1u64.into()], &ReachJob::variance(TraitKind::SemanticVector, 2), &IncludeAll)
            .unwrap();
        let record = store.get(&RecordId::Integer(1)).unwrap();
        let field = reach_core::stat_field(2, Statistic::Variance, TraitKind::SemanticVector);
        assert!(record.get(&field).and_then(|v| v.as_f64()).unwrap() > 0.0);
    }

    #[test]
    fn test_unsupported_job_fails_up_front() {
        let store = store();
        let registry = TraitRegistry::new();
        let orchestrator = BatchOrchestrator::new(&store, &registry, BatchConfig::default());
        let job = ReachJob::variance(TraitKind::TopicMixture, 2);
        assert!(matches!(
            orchestrator.run_store(&job, &IncludeAll),
            Err(Error::UnsupportedTraitForVariance(_))
        ));
    }

    #[test]
    fn test_cancelled_run_stops_before_work() {
        let store = store();
        let registry = TraitRegistry::new();
        let orchestrator = BatchOrchestrator::new(&store, &registry, BatchConfig::default());
        orchestrator.cancel_flag().store(true, Ordering::Release);
        let report = orchestrator
            .run_store(&ReachJob::reach(TraitKind::SemanticVector, 1), &IncludeAll)
            .unwrap();
        assert!(report.cancelled);
        assert_eq!(report.processed, 0);
        assert_eq!(avg(&store, 1), None);
    }

    #[test]
    fn test_cancel_mid_run_keeps_last_completed_page() {
        // roots 1..=4 each cited by one record without a vector
        let store = MemoryStore::from_records((1..=4u64).flat_map(|i| {
            [
                Record::new(i).with_children([100 + i]).with_field("doc_vec", json!([1.0, 0.0])),
                Record::new(100 + i),
            ]
        }));
        let registry = TraitRegistry::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let config = BatchConfig {
            batch_size: 2,
            workers: Some(1),
            checkpoint: Some(path.clone()),
            ..BatchConfig::default()
        };
        let orchestrator = BatchOrchestrator::new(&store, &registry, config);
        let cancel = orchestrator.cancel_flag();
        let stop_at_103 = move |record: &Record| {
            if record.id == RecordId::Integer(103) {
                cancel.store(true, Ordering::Release);
            }
            true
        };

        let report = orchestrator
            .run_store(&ReachJob::reach(TraitKind::SemanticVector, 1), &stop_at_103)
            .unwrap();
        assert!(report.cancelled);
        assert_eq!(report.processed, 3);

        let checkpoint = CheckpointFile::new(&path).load().unwrap().unwrap();
        assert_eq!(checkpoint.last_id, RecordId::Integer(2));
        assert_eq!(checkpoint.processed, 2);
        assert_eq!(checkpoint.updated, 2);

        let written: Vec<bool> = (1..=4u64).map(|i| avg(&store, i).is_some()).collect();
        assert_eq!(written, vec![true, true, true, false]);
        assert_eq!(avg(&store, 1), Some(NO_DATA));
    }

    #[test]
    fn test_checkpoint_resume_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let job = ReachJob::reach(TraitKind::SemanticVector, 1);

        // a previous run finished the page ending at record 2
        CheckpointFile::new(&path)
            .save(&Checkpoint::new(&job.id(), "", RecordId::Integer(2)).with_counts(2, 2, 0, 0))
            .unwrap();

        let store = store();
        let registry = TraitRegistry::new();
        let config = BatchConfig {
            checkpoint: Some(path.clone()),
            ..BatchConfig::default()
        };
        let report = BatchOrchestrator::new(&store, &registry, config)
            .run_store(&job, &IncludeAll)
            .unwrap();

        // counts carry over, so the totals cover the whole scan
        assert_eq!(report.processed, 4);
        assert_eq!(report.updated, 3);
        assert_eq!(report.missing, 0);
        assert_eq!(report.failed, 1);
        assert_eq!(report.processed, report.updated + report.missing + report.failed);
        assert_eq!(avg(&store, 1), None);
        assert_eq!(avg(&store, 3), Some(0.0));
        assert!(!path.exists());
    }

    #[test]
    fn test_checkpoint_from_other_settings_is_not_resumed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let job = ReachJob::reach(TraitKind::SemanticVector, 1);
        let store = store();
        let registry = TraitRegistry::new();

        // record 1 computed under a rule that rejects every descendant
        let reject_all = |_: &Record| false;
        BatchOrchestrator::new(&store, &registry, BatchConfig::default())
            .run_family(&[1u64.into()], &job, &reject_all)
            .unwrap();
        assert_eq!(avg(&store, 1), Some(NO_DATA));
        CheckpointFile::new(&path)
            .save(
                &Checkpoint::new(&job.id(), "min_citations=100", RecordId::Integer(1))
                    .with_counts(1, 1, 0, 0),
            )
            .unwrap();

        let config = BatchConfig {
            checkpoint: Some(path.clone()),
            fingerprint: "min_citations=none".to_string(),
            ..BatchConfig::default()
        };
        let report = BatchOrchestrator::new(&store, &registry, config)
            .run_store(&job, &IncludeAll)
            .unwrap();

        assert_eq!(report.processed, 4);
        assert_eq!(report.updated, 3);
        assert_eq!(avg(&store, 1), Some(0.5));
        assert!(!path.exists());
    }
}
