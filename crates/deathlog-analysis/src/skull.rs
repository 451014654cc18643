//! Per-map death positions for the world-map overlay.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::record::{Area, AreaId, DeathRecord, SourceId};

/// A death marker on a world map, in display units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SkullLocation {
    pub x: f64,
    pub y: f64,
    pub source_id: SourceId,
}

/// Groups map positions by map. Instance and unknown areas are ignored.
#[derive(Debug, Clone, Default)]
pub struct SkullLocationCollector {
    locations: BTreeMap<AreaId, Vec<SkullLocation>>,
}

impl SkullLocationCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, record: &DeathRecord) {
        if let Area::Map { map_id, position } = record.area {
            self.locations.entry(map_id).or_default().push(SkullLocation {
                x: position.x,
                y: position.y,
                source_id: record.source_id,
            });
        }
    }

    /// Locations per map, each in ingestion order.
    #[must_use]
    pub fn into_locations(self) -> BTreeMap<AreaId, Vec<SkullLocation>> {
        self.locations
    }
}

impl<'a> Extend<&'a DeathRecord> for SkullLocationCollector {
    fn extend<T: IntoIterator<Item = &'a DeathRecord>>(&mut self, iter: T) {
        for record in iter {
            self.ingest(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MapPosition;

    fn record(source_id: SourceId, area: Area) -> DeathRecord {
        DeathRecord {
            name: "Foo".to_owned(),
            guild: String::new(),
            level: 10,
            source_id,
            class_id: 1,
            area,
        }
    }

    #[test]
    fn test_only_map_areas_are_collected() {
        let records = [
            record(
                3,
                Area::Map {
                    map_id: 7,
                    position: MapPosition::from_fraction(0.1234, 0.5678),
                },
            ),
            record(4, Area::Instance { instance_id: 7 }),
            record(5, Area::Unknown),
            record(
                6,
                Area::Map {
                    map_id: 7,
                    position: MapPosition::from_fraction(0.0, 1.0),
                },
            ),
        ];
        let mut collector = SkullLocationCollector::new();
        collector.extend(&records);
        let locations = collector.into_locations();

        assert_eq!(locations.len(), 1);
        let skulls = &locations[&7];
        assert_eq!(skulls.len(), 2);
        assert!((skulls[0].x - 123.4).abs() < 1e-9);
        assert!((skulls[0].y - 567.8).abs() < 1e-9);
        assert_eq!(skulls[0].source_id, 3);
        assert_eq!(skulls[1].source_id, 6);
    }
}
