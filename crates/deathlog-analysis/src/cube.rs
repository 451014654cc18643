//! Sparse hierarchical level statistics.
//!
//! Cells are keyed by `(area, class, source)`, each dimension either a
//! concrete value or the [`Slot::All`] wildcard. A record updates exactly
//! eight cells (see [`CubeKey::marginals`]):
//!
//! ```text
//! (all,  all,   all)     (area, all,   all)
//! (all,  class, all)     (area, class, all)
//! (all,  all,   source)  (area, all,   source)
//! (all,  class, source)  (area, class, source)
//! ```
//!
//! Accumulation and averaging are separate phases: [`StatsCube`] only
//! accumulates, and [`StatsCube::finalize`] consumes it into a
//! [`FinalizedCube`] that carries the averages.

use std::{collections::BTreeMap, fmt};

use serde::Serialize;

use crate::record::{AreaId, ClassId, DeathRecord, SourceId};

/// A cube dimension: wildcard or a concrete value.
///
/// `All` orders before every concrete value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot<T> {
    All,
    Only(T),
}

impl<T: fmt::Display> fmt::Display for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::All => f.write_str("all"),
            Slot::Only(value) => value.fmt(f),
        }
    }
}

/// Area dimension value. Records without an area get their own bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaKey {
    Known(AreaId),
    Unknown,
}

impl From<Option<AreaId>> for AreaKey {
    fn from(id: Option<AreaId>) -> Self {
        id.map_or(AreaKey::Unknown, AreaKey::Known)
    }
}

impl fmt::Display for AreaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AreaKey::Known(id) => id.fmt(f),
            AreaKey::Unknown => f.write_str("unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CubeKey {
    pub area: Slot<AreaKey>,
    pub class: Slot<ClassId>,
    pub source: Slot<SourceId>,
}

impl CubeKey {
    /// The global cell.
    pub const ALL: Self = Self {
        area: Slot::All,
        class: Slot::All,
        source: Slot::All,
    };

    /// The eight cells a record contributes to.
    #[must_use]
    pub fn marginals(record: &DeathRecord) -> [Self; 8] {
        let area = Slot::Only(AreaKey::from(record.area.id()));
        let class = Slot::Only(record.class_id);
        let source = Slot::Only(record.source_id);
        let key = |area, class, source| Self {
            area,
            class,
            source,
        };
        [
            key(Slot::All, Slot::All, Slot::All),
            key(area, Slot::All, Slot::All),
            key(Slot::All, class, Slot::All),
            key(area, class, Slot::All),
            key(Slot::All, Slot::All, source),
            key(area, Slot::All, source),
            key(Slot::All, class, source),
            key(area, class, source),
        ]
    }
}

/// Running totals of one cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsCell {
    pub entry_count: u64,
    pub level_sum: u64,
}

impl StatsCell {
    fn add(&mut self, level: u32) {
        self.entry_count += 1;
        self.level_sum += u64::from(level);
    }
}

/// Accumulating phase of the cube.
#[derive(Debug, Clone, Default)]
pub struct StatsCube {
    cells: BTreeMap<CubeKey, StatsCell>,
}

impl StatsCube {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, record: &DeathRecord) {
        for key in CubeKey::marginals(record) {
            self.cells.entry(key).or_default().add(record.level);
        }
    }

    #[must_use]
    pub fn cell(&self, key: &CubeKey) -> Option<&StatsCell> {
        self.cells.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Ends accumulation and computes the average level of every cell.
    #[must_use]
    pub fn finalize(self) -> FinalizedCube {
        let cells = self
            .cells
            .into_iter()
            .map(|(key, cell)| (key, FinalizedCell::from(cell)))
            .collect();
        FinalizedCube { cells }
    }
}

impl<'a> Extend<&'a DeathRecord> for StatsCube {
    fn extend<T: IntoIterator<Item = &'a DeathRecord>>(&mut self, iter: T) {
        for record in iter {
            self.ingest(record);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FinalizedCell {
    pub entry_count: u64,
    pub level_sum: u64,
    pub average_level: f64,
}

impl From<StatsCell> for FinalizedCell {
    #[expect(clippy::cast_precision_loss)]
    fn from(cell: StatsCell) -> Self {
        // Cells only exist once touched, so `entry_count >= 1`.
        Self {
            entry_count: cell.entry_count,
            level_sum: cell.level_sum,
            average_level: cell.level_sum as f64 / cell.entry_count as f64,
        }
    }
}

/// Read-only cube with averages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinalizedCube {
    cells: BTreeMap<CubeKey, FinalizedCell>,
}

impl FinalizedCube {
    #[must_use]
    pub fn cell(&self, key: &CubeKey) -> Option<&FinalizedCell> {
        self.cells.get(key)
    }

    /// The global cell, absent when nothing was ingested.
    #[must_use]
    pub fn global(&self) -> Option<&FinalizedCell> {
        self.cell(&CubeKey::ALL)
    }

    /// Cells in key order: wildcards first, then ascending values.
    pub fn iter(&self) -> impl Iterator<Item = (&CubeKey, &FinalizedCell)> {
        self.cells.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Area, MapPosition};

    fn record(level: u32, class_id: ClassId, source_id: SourceId, area: Area) -> DeathRecord {
        DeathRecord {
            name: format!("n{level}{class_id}{source_id}"),
            guild: String::new(),
            level,
            source_id,
            class_id,
            area,
        }
    }

    fn map(map_id: AreaId) -> Area {
        Area::Map {
            map_id,
            position: MapPosition::from_fraction(0.5, 0.5),
        }
    }

    fn sample() -> Vec<DeathRecord> {
        vec![
            record(10, 1, 100, map(1)),
            record(20, 1, 100, map(1)),
            record(30, 2, 100, map(2)),
            record(40, 2, 200, Area::Instance { instance_id: 1 }),
            record(50, 1, 200, Area::Unknown),
        ]
    }

    fn key(area: Slot<AreaKey>, class: Slot<ClassId>, source: Slot<SourceId>) -> CubeKey {
        CubeKey {
            area,
            class,
            source,
        }
    }

    #[test]
    fn test_marginals_are_distinct() {
        let keys = CubeKey::marginals(&record(10, 1, 100, map(1)));
        let unique = keys.iter().collect::<std::collections::BTreeSet<_>>();
        assert_eq!(unique.len(), 8);
        assert_eq!(keys[0], CubeKey::ALL);
    }

    #[test]
    fn test_global_cell_counts_every_record_once() {
        let records = sample();
        let mut cube = StatsCube::new();
        cube.extend(&records);
        let cube = cube.finalize();

        let global = cube.global().unwrap();
        assert_eq!(global.entry_count, 5);
        assert_eq!(global.level_sum, 150);
        assert!((global.average_level - 30.0).abs() < 1e-12);

        let per_area = cube
            .iter()
            .filter(|(k, _)| k.area != Slot::All && k.class == Slot::All && k.source == Slot::All)
            .map(|(_, c)| c.entry_count)
            .sum::<u64>();
        assert_eq!(per_area, 5);
    }

    #[test]
    fn test_map_and_instance_ids_share_a_key_space() {
        let records = sample();
        let mut cube = StatsCube::new();
        cube.extend(&records);
        let cube = cube.finalize();

        let area1 = cube
            .cell(&key(Slot::Only(AreaKey::Known(1)), Slot::All, Slot::All))
            .unwrap();
        assert_eq!(area1.entry_count, 3);
        assert_eq!(area1.level_sum, 70);

        let unknown = cube
            .cell(&key(Slot::Only(AreaKey::Unknown), Slot::All, Slot::All))
            .unwrap();
        assert_eq!(unknown.entry_count, 1);
    }

    #[test]
    fn test_averages_match_filtered_means() {
        let records = sample();
        let mut cube = StatsCube::new();
        cube.extend(&records);
        let cube = cube.finalize();

        for (key, cell) in cube.iter() {
            let matching = records
                .iter()
                .filter(|r| {
                    let area = AreaKey::from(r.area.id());
                    (key.area == Slot::All || key.area == Slot::Only(area))
                        && (key.class == Slot::All || key.class == Slot::Only(r.class_id))
                        && (key.source == Slot::All || key.source == Slot::Only(r.source_id))
                })
                .map(|r| f64::from(r.level))
                .collect::<Vec<_>>();
            assert_eq!(cell.entry_count as usize, matching.len(), "{key:?}");
            let mean = matching.iter().sum::<f64>() / matching.len() as f64;
            assert!((cell.average_level - mean).abs() < 1e-12, "{key:?}");
        }
    }

    #[test]
    fn test_untouched_cells_are_absent() {
        let records = sample();
        let mut cube = StatsCube::new();
        cube.extend(&records);
        assert!(cube
            .cell(&key(Slot::Only(AreaKey::Known(2)), Slot::Only(1), Slot::All))
            .is_none());
        assert!(StatsCube::new().finalize().global().is_none());
    }

    #[test]
    fn test_wildcards_order_first() {
        assert!(Slot::All < Slot::Only(i64::MIN));
        assert!(Slot::Only(AreaKey::Known(i64::MAX)) < Slot::Only(AreaKey::Unknown));
        assert_eq!(Slot::<AreaKey>::All.to_string(), "all");
        assert_eq!(Slot::Only(AreaKey::Unknown).to_string(), "unknown");
    }
}
