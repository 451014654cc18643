//! End-to-end flow: documents → canonical set → derived tables.
//!
//! [`Ingest`] extracts and deduplicates documents one at a time, tallying
//! what was read and dropped in an [`ExtractReport`]. [`Precomputed`] then
//! runs the three independent aggregation passes over the finished set.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    cube::{FinalizedCube, StatsCube},
    dedup::{CanonicalDeathSet, MergeOutcome},
    distribution::{FitConfig, LevelDistributionFitter, LogNormalTable},
    extract::{Layout, extract_document},
    record::AreaId,
    skull::{SkullLocation, SkullLocationCollector},
};

/// Extraction counters of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractReport {
    pub documents: usize,
    /// Documents with no content.
    pub empty: usize,
    /// Documents with content but no known layout marker.
    pub unrecognized: usize,
    pub layouts: BTreeMap<Layout, usize>,
    /// Entries parsed into records, before deduplication.
    pub records: usize,
    /// Records that replaced an earlier report of the same death.
    pub duplicates: usize,
    /// Dropped entries per reason, see [`EntryError::counter_key`](crate::extract::EntryError::counter_key).
    pub drops: BTreeMap<String, usize>,
}

impl ExtractReport {
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.drops.values().sum()
    }
}

/// Accumulates documents into a canonical set.
#[derive(Debug, Clone, Default)]
pub struct Ingest {
    canonical: CanonicalDeathSet,
    report: ExtractReport,
}

impl Ingest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts every entry of `text` and merges the valid ones.
    ///
    /// Returns the number of records extracted from this document.
    pub fn add_document(&mut self, text: &str) -> usize {
        self.report.documents += 1;
        if text.is_empty() {
            self.report.empty += 1;
            tracing::debug!("empty document");
            return 0;
        }

        let mut entries = extract_document(text);
        let Some(layout) = entries.layout() else {
            self.report.unrecognized += 1;
            tracing::debug!("no known layout marker");
            return 0;
        };
        *self.report.layouts.entry(layout).or_default() += 1;

        let mut extracted = 0;
        for result in entries.by_ref() {
            match result {
                Ok(record) => {
                    extracted += 1;
                    if self.canonical.merge(record) == MergeOutcome::Replaced {
                        self.report.duplicates += 1;
                    }
                }
                Err(err) => {
                    tracing::debug!(?layout, %err, "dropped entry");
                    *self.report.drops.entry(err.counter_key()).or_default() += 1;
                }
            }
        }
        self.report.records += extracted;
        tracing::debug!(
            ?layout,
            extracted,
            canonical = self.canonical.len(),
            "document ingested"
        );
        extracted
    }

    #[must_use]
    pub fn canonical(&self) -> &CanonicalDeathSet {
        &self.canonical
    }

    #[must_use]
    pub fn report(&self) -> &ExtractReport {
        &self.report
    }

    #[must_use]
    pub fn into_parts(self) -> (CanonicalDeathSet, ExtractReport) {
        (self.canonical, self.report)
    }
}

/// The three derived tables written to the artifact.
#[derive(Debug, Clone)]
pub struct Precomputed {
    pub cube: FinalizedCube,
    pub skulls: BTreeMap<AreaId, Vec<SkullLocation>>,
    pub distributions: LogNormalTable,
}

impl Precomputed {
    #[must_use]
    pub fn from_canonical(canonical: &CanonicalDeathSet, config: &FitConfig) -> Self {
        let mut cube = StatsCube::new();
        cube.extend(canonical);

        let mut skulls = SkullLocationCollector::new();
        skulls.extend(canonical);

        let mut fitter = LevelDistributionFitter::new();
        fitter.extend(canonical);

        Self {
            cube: cube.finalize(),
            skulls: skulls.into_locations(),
            distributions: fitter.fit(config),
        }
    }
}
