//! Per-(area, class) log-normal fits of character level.
//!
//! Every record contributes its level to two groups: its own area (Unknown
//! areas fold into the all-areas group) and the all-areas group of its class.
//! Area groups get the plain moment estimate of `ln(level)`. All-areas groups
//! are right-truncated at [`FitConfig::truncation_level`], since high-level
//! deaths are under-represented upstream, and get the truncated
//! maximum-likelihood estimate instead.

use std::collections::BTreeMap;

use deathlog_stats::{
    lognormal::LogNormalParams,
    truncated::{FitMethod, TruncatedLogNormal},
};
use serde::Serialize;

use crate::{
    cube::Slot,
    record::{AreaId, ClassId, DeathRecord},
};

pub const DEFAULT_TRUNCATION_LEVEL: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitConfig {
    /// Levels at or above this are excluded from the all-areas fits.
    pub truncation_level: u32,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            truncation_level: DEFAULT_TRUNCATION_LEVEL,
        }
    }
}

/// Group key: area (or all areas) and class.
pub type GroupKey = (Slot<AreaId>, ClassId);

/// Collects levels per group.
#[derive(Debug, Clone, Default)]
pub struct LevelDistributionFitter {
    groups: BTreeMap<GroupKey, Vec<u32>>,
}

impl LevelDistributionFitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, record: &DeathRecord) {
        let class = record.class_id;
        if let Some(area) = record.area.id() {
            self.groups
                .entry((Slot::Only(area), class))
                .or_default()
                .push(record.level);
        }
        self.groups
            .entry((Slot::All, class))
            .or_default()
            .push(record.level);
    }

    #[must_use]
    pub fn levels(&self, key: &GroupKey) -> Option<&[u32]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// Fits every group.
    ///
    /// Groups are never empty, so every group gets an entry. An all-areas
    /// group with no level below the truncation point keeps its moment
    /// estimate.
    #[must_use]
    pub fn fit(&self, config: &FitConfig) -> LogNormalTable {
        let truncated = TruncatedLogNormal::new(f64::from(config.truncation_level));
        let fits = self
            .groups
            .iter()
            .filter_map(|(key, levels)| {
                let values = levels.iter().copied().map(f64::from);
                let fit = match key.0 {
                    Slot::Only(_) => LevelFit::moments(values),
                    Slot::All => fit_truncated(&truncated, key, values),
                };
                fit.map(|fit| (*key, fit))
            })
            .collect();
        LogNormalTable { fits }
    }
}

impl<'a> Extend<&'a DeathRecord> for LevelDistributionFitter {
    fn extend<T: IntoIterator<Item = &'a DeathRecord>>(&mut self, iter: T) {
        for record in iter {
            self.ingest(record);
        }
    }
}

fn fit_truncated<I>(truncated: &TruncatedLogNormal, key: &GroupKey, values: I) -> Option<LevelFit>
where
    I: IntoIterator<Item = f64> + Clone,
{
    let Some(fit) = truncated.fit(values.clone()) else {
        tracing::warn!(
            class_id = key.1,
            truncation = truncated.truncation(),
            "no level below truncation point, keeping moment estimate"
        );
        return LevelFit::moments(values);
    };
    if fit.method == FitMethod::MomentsFallback {
        tracing::warn!(
            class_id = key.1,
            sample_size = fit.params.sample_size,
            excluded = fit.excluded,
            "truncated fit did not converge, using moments of retained levels"
        );
    }
    Some(LevelFit {
        log_mean: fit.params.log_mean,
        log_variance: fit.params.log_variance,
        sample_size: fit.params.sample_size,
        excluded: fit.excluded,
        truncated: true,
    })
}

/// Fitted log-normal parameters of one group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelFit {
    pub log_mean: f64,
    pub log_variance: f64,
    /// Levels the estimate was computed from.
    pub sample_size: usize,
    /// Levels excluded by truncation.
    pub excluded: usize,
    pub truncated: bool,
}

impl LevelFit {
    fn moments<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let params = LogNormalParams::from_values(values)?;
        Some(Self {
            log_mean: params.log_mean,
            log_variance: params.log_variance,
            sample_size: params.sample_size,
            excluded: 0,
            truncated: false,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogNormalTable {
    fits: BTreeMap<GroupKey, LevelFit>,
}

impl LogNormalTable {
    #[must_use]
    pub fn get(&self, area: Slot<AreaId>, class: ClassId) -> Option<&LevelFit> {
        self.fits.get(&(area, class))
    }

    /// Fits in key order, all-areas groups first.
    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &LevelFit)> {
        self.fits.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fits.is_empty()
    }
}
