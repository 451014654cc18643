//! JSON report of one ingestion run.

use std::{collections::BTreeMap, path::PathBuf};

use clap::Args;
use deathlog_analysis::{
    cube::{FinalizedCell, Slot},
    dedup::CanonicalDeathSet,
    distribution::{DEFAULT_TRUNCATION_LEVEL, FitConfig, LevelFit},
    pipeline::{ExtractReport, Precomputed},
    record::ClassId,
};
use deathlog_stats::descriptive::DescriptiveStats;
use serde::Serialize;

use crate::util::{self, Output};

#[derive(Debug, Clone, Args)]
pub(crate) struct SummaryArg {
    /// Directory containing saved-variable dumps
    #[arg(default_value = ".")]
    input_dir: PathBuf,
    /// Output file path (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Levels at or above this are excluded from the all-areas fits
    #[arg(long, default_value_t = DEFAULT_TRUNCATION_LEVEL)]
    truncate: u32,
}

#[derive(Debug, Serialize)]
struct SummaryReport<'a> {
    extraction: &'a ExtractReport,
    canonical_size: usize,
    global: Option<FinalizedCell>,
    classes: BTreeMap<ClassId, ClassSummary>,
}

#[derive(Debug, Serialize)]
struct ClassSummary {
    levels: LevelStats,
    /// All-areas log-normal fit.
    log_normal: Option<LevelFit>,
}

#[derive(Debug, Serialize)]
struct LevelStats {
    count: usize,
    min: f64,
    max: f64,
    mean: f64,
    median: f64,
    std_dev: f64,
}

impl From<DescriptiveStats> for LevelStats {
    fn from(stats: DescriptiveStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean,
            median: stats.median,
            std_dev: stats.std_dev,
        }
    }
}

pub(crate) fn run(arg: &SummaryArg) -> anyhow::Result<()> {
    let ingest = util::ingest_dir(&arg.input_dir)?;
    let config = FitConfig {
        truncation_level: arg.truncate,
    };
    let precomputed = Precomputed::from_canonical(ingest.canonical(), &config);

    let report = SummaryReport {
        extraction: ingest.report(),
        canonical_size: ingest.canonical().len(),
        global: precomputed.cube.global().copied(),
        classes: class_summaries(ingest.canonical(), &precomputed),
    };
    Output::save_json(&report, arg.output.clone())
}

fn class_summaries(
    canonical: &CanonicalDeathSet,
    precomputed: &Precomputed,
) -> BTreeMap<ClassId, ClassSummary> {
    let mut levels = BTreeMap::<ClassId, Vec<f64>>::new();
    for record in canonical {
        levels
            .entry(record.class_id)
            .or_default()
            .push(f64::from(record.level));
    }

    levels
        .into_iter()
        .filter_map(|(class, values)| {
            let stats = DescriptiveStats::new(values)?;
            let summary = ClassSummary {
                levels: stats.into(),
                log_normal: precomputed.distributions.get(Slot::All, class).copied(),
            };
            Some((class, summary))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use deathlog_analysis::record::{Area, DeathRecord};

    use super::*;

    fn record(name: &str, level: u32, class_id: ClassId) -> DeathRecord {
        DeathRecord {
            name: name.to_owned(),
            guild: String::new(),
            level,
            source_id: 1,
            class_id,
            area: Area::Instance { instance_id: 3 },
        }
    }

    #[test]
    fn test_class_summaries() {
        let canonical = [record("a", 10, 1), record("b", 30, 1), record("c", 70, 2)]
            .into_iter()
            .collect::<CanonicalDeathSet>();
        let precomputed = Precomputed::from_canonical(&canonical, &FitConfig::default());
        let classes = class_summaries(&canonical, &precomputed);

        assert_eq!(classes.len(), 2);
        let class_1 = &classes[&1];
        assert_eq!(class_1.levels.count, 2);
        assert!((class_1.levels.mean - 20.0).abs() < 1e-12);
        assert!(class_1.log_normal.unwrap().truncated);

        // Every level of class 2 is above the truncation point.
        let class_2 = &classes[&2];
        assert!(!class_2.log_normal.unwrap().truncated);

        let json = serde_json::to_value(&classes).unwrap();
        assert_eq!(json["1"]["levels"]["max"], 30.0);
    }
}
