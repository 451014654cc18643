//! Typed death events.
//!
//! A [`DeathRecord`] is one death reported by the addon: who died (name,
//! guild, class, level), what killed them (source), and where ([`Area`]).

use serde::Serialize;

/// Identifier of a world map or an instance. Both share one key space.
pub type AreaId = i64;
pub type ClassId = i64;
pub type SourceId = i64;

/// Upstream map positions are fractions of the map; consumers expect them
/// scaled to display resolution.
pub const MAP_POSITION_SCALE: f64 = 1000.0;

/// Position on a world map in display units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapPosition {
    pub x: f64,
    pub y: f64,
}

impl MapPosition {
    /// Converts fractional map coordinates to display units.
    #[must_use]
    pub fn from_fraction(x: f64, y: f64) -> Self {
        Self {
            x: x * MAP_POSITION_SCALE,
            y: y * MAP_POSITION_SCALE,
        }
    }
}

/// Where a death happened.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Area {
    Map {
        map_id: AreaId,
        position: MapPosition,
    },
    Instance {
        instance_id: AreaId,
    },
    Unknown,
}

impl Area {
    /// The map or instance identifier, if known.
    #[must_use]
    pub fn id(&self) -> Option<AreaId> {
        match self {
            Area::Map { map_id, .. } => Some(*map_id),
            Area::Instance { instance_id } => Some(*instance_id),
            Area::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeathRecord {
    pub name: String,
    pub guild: String,
    pub level: u32,
    pub source_id: SourceId,
    pub class_id: ClassId,
    pub area: Area,
}

/// Identity of a death: repeated reports of the same key are the same event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeathKey {
    pub name: String,
    pub guild: String,
    pub level: u32,
    pub source_id: SourceId,
}

impl DeathRecord {
    #[must_use]
    pub fn key(&self) -> DeathKey {
        DeathKey {
            name: self.name.clone(),
            guild: self.guild.clone(),
            level: self.level,
            source_id: self.source_id,
        }
    }
}
