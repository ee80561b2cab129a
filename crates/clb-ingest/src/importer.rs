//! Checklist import pipeline
//!
//! 1. Load records into the store
//! 2. Clear old relations and resolve references into edges and labels
//! 3. Walk the forest once, assigning intervals and usage metrics
//! 4. Optionally verify the interval index

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clb_common::fingerprint::Fingerprint;
use clb_common::{ClbError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::archive::CoreFileReader;
use crate::config::ImportConfig;
use crate::metrics::UsageMetricsHandler;
use crate::models::TaxonRecord;
use crate::nested_set::{verify_intervals, NestedSetHandler};
use crate::resolver::{commit_batch, ReferenceResolver, ResolutionStats, ResolutionWarning};
use crate::store::TaxonStore;
use crate::traverse::{StartEndHandler, TaxonWalker, TaxonomicPaths, WalkStats};

/// Outcome of the indexing walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub walk: WalkStats,
    /// Nodes that received an interval
    pub indexed: u64,
    /// Counter value after the last end event
    pub final_counter: u64,
    pub metrics_written: usize,
    /// Synonyms whose own subtree was left out of the walk
    pub skipped_synonyms: usize,
}

/// Summary of one import run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub source: Option<PathBuf>,
    pub fingerprint: Option<Fingerprint>,
    pub taxa: usize,
    pub parent_edges: usize,
    pub synonym_edges: usize,
    pub basionym_edges: usize,
    pub roots: usize,
    pub synonyms: usize,
    pub warnings: Vec<ResolutionWarning>,
    pub indexed: u64,
    pub final_counter: u64,
    pub skipped_synonyms: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ImportReport {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "Imported {} taxa ({} roots, {} synonyms, {} indexed) with {} parent, {} synonym and {} basionym edges; {} warnings",
            self.taxa,
            self.roots,
            self.synonyms,
            self.indexed,
            self.parent_edges,
            self.synonym_edges,
            self.basionym_edges,
            self.warnings.len()
        )
    }
}

/// Runs the import phases against a [`TaxonStore`]
#[derive(Debug, Clone, Default)]
pub struct ChecklistImporter {
    config: ImportConfig,
}

impl ChecklistImporter {
    pub fn new(config: ImportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Insert records in committed batches. Null-like values become absent
    /// first. Duplicate identifiers, null-like identifiers and reader errors
    /// abort the load and roll back the open batch.
    pub fn load<S, I>(&self, store: &mut S, records: I) -> Result<usize>
    where
        S: TaxonStore + ?Sized,
        I: IntoIterator<Item = Result<TaxonRecord>>,
    {
        info!("Loading taxa");
        let mut loaded = 0;
        store.begin();
        for record in records {
            let inserted = record
                .and_then(|record| {
                    let raw_id = record.taxon_id.clone();
                    record
                        .normalized()
                        .ok_or_else(|| ClbError::parse(format!("record {:?} has no taxon identifier", raw_id)))
                })
                .and_then(|record| store.insert(record));
            if let Err(e) = inserted {
                store.rollback();
                return Err(e);
            }
            loaded += 1;
            if loaded % self.config.batch_size.max(1) == 0 {
                commit_batch(store)?;
                debug!(loaded, "Committed taxa batch");
                store.begin();
            }
        }
        commit_batch(store)?;
        info!(loaded, "Loaded taxa");
        Ok(loaded)
    }

    /// Drop existing relations, then resolve every reference
    pub fn setup_relations<S: TaxonStore + ?Sized>(&self, store: &mut S) -> Result<ResolutionStats> {
        store.begin();
        if let Err(e) = store.clear_relations() {
            store.rollback();
            return Err(e);
        }
        commit_batch(store)?;

        ReferenceResolver::new(self.config.batch_size).resolve_all(store)
    }

    /// Walk the forest once with the nested-set and usage metrics handlers
    pub fn build_metrics<S: TaxonStore + ?Sized>(&self, store: &mut S) -> Result<IndexStats> {
        let mut nested = NestedSetHandler::new();
        let mut metrics = UsageMetricsHandler::new();
        let mut source = TaxonomicPaths::new(&*store);

        let walk = {
            let mut handlers: [&mut dyn StartEndHandler<S>; 2] = [&mut nested, &mut metrics];
            TaxonWalker::new(self.config.batch_size, self.config.progress_interval)
                .walk(store, &mut source, &mut handlers)?
        };

        let stats = IndexStats {
            walk,
            indexed: walk.starts,
            final_counter: nested.counter(),
            metrics_written: metrics.written(),
            skipped_synonyms: source.skipped_synonyms(),
        };

        if self.config.verify_intervals {
            let verified = verify_intervals(&*store)? as u64;
            if verified != stats.indexed {
                return Err(ClbError::malformed(format!(
                    "{} nodes carry intervals but the walk indexed {}",
                    verified, stats.indexed
                )));
            }
        }

        if stats.skipped_synonyms > 0 {
            warn!(
                skipped_synonyms = stats.skipped_synonyms,
                "Taxa below synonyms were not indexed"
            );
        }
        info!(
            indexed = stats.indexed,
            final_counter = stats.final_counter,
            "Nested-set index built"
        );
        Ok(stats)
    }

    /// Relations and index over records already in the store
    pub fn run<S: TaxonStore + ?Sized>(&self, store: &mut S) -> Result<ImportReport> {
        let started_at = Utc::now();
        let resolution = self.setup_relations(store)?;
        let index = self.build_metrics(store).inspect_err(|e| {
            if e.is_fatal_for_index() {
                error!(error = %e, "Interval index is unusable");
            }
        })?;

        Ok(ImportReport {
            source: None,
            fingerprint: None,
            taxa: store.len(),
            parent_edges: resolution.parent_edges,
            synonym_edges: resolution.synonym_edges,
            basionym_edges: resolution.basionym_edges,
            roots: resolution.roots,
            synonyms: resolution.synonyms,
            warnings: resolution.warnings,
            indexed: index.indexed,
            final_counter: index.final_counter,
            skipped_synonyms: index.skipped_synonyms,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Load records, then run every phase
    pub fn import<S, I>(&self, store: &mut S, records: I) -> Result<ImportReport>
    where
        S: TaxonStore + ?Sized,
        I: IntoIterator<Item = Result<TaxonRecord>>,
    {
        let started_at = Utc::now();
        self.load(store, records)?;
        let mut report = self.run(store)?;
        report.started_at = started_at;
        Ok(report)
    }

    /// Import a delimited core file
    pub fn import_file<S>(&self, store: &mut S, path: impl AsRef<Path>) -> Result<ImportReport>
    where
        S: TaxonStore + ?Sized,
    {
        let path = path.as_ref();
        let fingerprint = Fingerprint::of_file(path)?;
        info!(source = %path.display(), %fingerprint, "Importing core file");

        let reader = CoreFileReader::open(path, self.config.delimiter_byte())?;
        let mut report = self.import(store, reader)?;
        report.source = Some(path.to_path_buf());
        report.fingerprint = Some(fingerprint);
        Ok(report)
    }
}
