//! Lua artifact consumed by the addon.
//!
//! Three top-level assignments, each readable on its own:
//!
//! ```text
//! precomputed_general_stats = {
//!     ["all"] = {                      -- all servers
//!         [area] = { [class] = { [source] = {
//!             ["avg_lvl"] = ..., ["num_entries"] = ..., ["sum_lvl"] = ...,
//!         } } },
//!     },
//! }
//! precomputed_skull_locs = { [map] = { { x, y, source }, ... } }
//! precomputed_log_normal_params = { [area] = { [class] = { mean, variance, n } } }
//! ```
//!
//! Wildcard dimensions are written as `["all"]`, areas of unknown location
//! as `["unknown"]`.

use std::io::{self, Write};

use crate::{
    cube::{AreaKey, FinalizedCell, FinalizedCube, Slot},
    distribution::LogNormalTable,
    lua::{self, Key, Table},
    pipeline::Precomputed,
    record::AreaId,
    skull::SkullLocation,
};

pub const GENERAL_STATS: &str = "precomputed_general_stats";
pub const SKULL_LOCATIONS: &str = "precomputed_skull_locs";
pub const LOG_NORMAL_PARAMS: &str = "precomputed_log_normal_params";

const ALL: &str = "all";
const UNKNOWN: &str = "unknown";

/// Writes the three assignments of `precomputed` to `out`.
pub fn write_artifact<W>(precomputed: &Precomputed, mut out: W) -> io::Result<()>
where
    W: Write,
{
    lua::write_assignment(&mut out, GENERAL_STATS, &general_stats(&precomputed.cube).into())?;
    lua::write_assignment(
        &mut out,
        SKULL_LOCATIONS,
        &skull_locations(precomputed.skulls.iter()).into(),
    )?;
    lua::write_assignment(
        &mut out,
        LOG_NORMAL_PARAMS,
        &log_normal_params(&precomputed.distributions).into(),
    )?;
    out.flush()
}

fn general_stats(cube: &FinalizedCube) -> Table {
    let cells = cube
        .iter()
        .map(|(key, cell)| (key.area, (key.class, (key.source, cell))));

    let mut areas = Table::new();
    for (area, classes) in group_consecutive(cells) {
        let mut class_table = Table::new();
        for (class, sources) in group_consecutive(classes) {
            let mut source_table = Table::new();
            for (source, cell) in sources {
                source_table.insert(slot_key(source), cell_fields(cell));
            }
            class_table.insert(slot_key(class), source_table);
        }
        areas.insert(area_key(area), class_table);
    }

    let mut servers = Table::new();
    servers.insert(ALL, areas);
    servers
}

fn cell_fields(cell: &FinalizedCell) -> Table {
    let mut fields = Table::new();
    fields.insert("avg_lvl", cell.average_level);
    fields.insert("num_entries", cell.entry_count);
    fields.insert("sum_lvl", cell.level_sum);
    fields
}

fn skull_locations<'a, I>(maps: I) -> Table
where
    I: IntoIterator<Item = (&'a AreaId, &'a Vec<SkullLocation>)>,
{
    let mut table = Table::new();
    for (map_id, skulls) in maps {
        let mut list = Table::new();
        for skull in skulls {
            let mut triple = Table::new();
            triple.push(skull.x);
            triple.push(skull.y);
            triple.push(skull.source_id);
            list.push(triple);
        }
        table.insert(*map_id, list);
    }
    table
}

fn log_normal_params(fits: &LogNormalTable) -> Table {
    let groups = fits.iter().map(|((area, class), fit)| (*area, (*class, fit)));

    let mut areas = Table::new();
    for (area, classes) in group_consecutive(groups) {
        let mut class_table = Table::new();
        for (class, fit) in classes {
            let mut params = Table::new();
            params.push(fit.log_mean);
            params.push(fit.log_variance);
            params.push(u64::try_from(fit.sample_size).unwrap_or(u64::MAX));
            class_table.insert(class, params);
        }
        areas.insert(slot_key(area), class_table);
    }
    areas
}

fn slot_key(slot: Slot<i64>) -> Key {
    match slot {
        Slot::All => Key::from(ALL),
        Slot::Only(id) => Key::Int(id),
    }
}

fn area_key(slot: Slot<AreaKey>) -> Key {
    match slot {
        Slot::All => Key::from(ALL),
        Slot::Only(AreaKey::Known(id)) => Key::Int(id),
        Slot::Only(AreaKey::Unknown) => Key::from(UNKNOWN),
    }
}

/// Groups runs of equal keys, keeping the order of `items`.
fn group_consecutive<K, V, I>(items: I) -> Vec<(K, Vec<V>)>
where
    K: PartialEq,
    I: IntoIterator<Item = (K, V)>,
{
    let mut groups: Vec<(K, Vec<V>)> = Vec::new();
    for (key, value) in items {
        match groups.last_mut() {
            Some((last, values)) if *last == key => values.push(value),
            _ => groups.push((key, vec![value])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dedup::CanonicalDeathSet,
        distribution::FitConfig,
        lua::{Value, parse_assignments},
        record::{Area, DeathRecord, MapPosition},
    };

    fn precomputed() -> Precomputed {
        let records = [
            DeathRecord {
                name: "Foo".to_owned(),
                guild: "Bar".to_owned(),
                level: 30,
                source_id: 99,
                class_id: 1,
                area: Area::Instance { instance_id: 5 },
            },
            DeathRecord {
                name: "Baz".to_owned(),
                guild: "Qux".to_owned(),
                level: 45,
                source_id: 99,
                class_id: 1,
                area: Area::Map {
                    map_id: 2,
                    position: MapPosition::from_fraction(0.5, 0.5),
                },
            },
            DeathRecord {
                name: "Nowhere".to_owned(),
                guild: String::new(),
                level: 10,
                source_id: 7,
                class_id: 3,
                area: Area::Unknown,
            },
        ];
        let canonical = records.into_iter().collect::<CanonicalDeathSet>();
        Precomputed::from_canonical(&canonical, &FitConfig::default())
    }

    fn render(precomputed: &Precomputed) -> String {
        let mut buf = Vec::new();
        write_artifact(precomputed, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn path<'a>(table: &'a Table, keys: &[Key]) -> &'a Value {
        let (first, rest) = keys.split_first().unwrap();
        let value = table.get(first).unwrap();
        if rest.is_empty() {
            value
        } else {
            path(value.as_table().unwrap(), rest)
        }
    }

    fn all() -> Key {
        Key::from(ALL)
    }

    #[test]
    fn test_three_assignments_read_back() {
        let text = render(&precomputed());
        let parsed = parse_assignments(&text).unwrap();
        let names = parsed.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>();
        assert_eq!(names, [GENERAL_STATS, SKULL_LOCATIONS, LOG_NORMAL_PARAMS]);
    }

    #[test]
    fn test_general_stats_shape() {
        let text = render(&precomputed());
        let parsed = parse_assignments(&text).unwrap();
        let stats = parsed[0].1.as_table().unwrap();

        let global = path(stats, &[all(), all(), all(), all()]).as_table().unwrap();
        assert_eq!(global.field("num_entries"), Some(&Value::Int(3)));
        assert_eq!(global.field("sum_lvl"), Some(&Value::Int(85)));
        let avg = global.field("avg_lvl").unwrap().as_f64().unwrap();
        assert!((avg - 85.0 / 3.0).abs() < 1e-12);

        let detail = path(stats, &[all(), Key::Int(2), Key::Int(1), Key::Int(99)])
            .as_table()
            .unwrap();
        assert_eq!(detail.field("num_entries"), Some(&Value::Int(1)));
        assert_eq!(detail.field("avg_lvl"), Some(&Value::Float(45.0)));

        let unknown = path(stats, &[all(), Key::from(UNKNOWN), Key::Int(3), all()])
            .as_table()
            .unwrap();
        assert_eq!(unknown.field("sum_lvl"), Some(&Value::Int(10)));
    }

    #[test]
    fn test_skull_locations_shape() {
        let text = render(&precomputed());
        let parsed = parse_assignments(&text).unwrap();
        let skulls = parsed[1].1.as_table().unwrap();
        assert_eq!(skulls.len(), 1);

        let list = skulls.get(&Key::Int(2)).unwrap().as_table().unwrap();
        assert_eq!(list.len(), 1);
        let triple = list.get(&Key::Int(1)).unwrap().as_table().unwrap();
        let values = triple.iter().map(|(_, v)| v.clone()).collect::<Vec<_>>();
        assert_eq!(
            values,
            [Value::Float(500.0), Value::Float(500.0), Value::Int(99)]
        );
    }

    #[test]
    fn test_log_normal_params_shape() {
        let text = render(&precomputed());
        let parsed = parse_assignments(&text).unwrap();
        let params = parsed[2].1.as_table().unwrap();

        let keys = params.iter().map(|(k, _)| k.clone()).collect::<Vec<_>>();
        assert_eq!(keys, [all(), Key::Int(2), Key::Int(5)]);

        let fit = path(params, &[Key::Int(5), Key::Int(1)]).as_table().unwrap();
        let mean = fit.get(&Key::Int(1)).unwrap().as_f64().unwrap();
        assert!((mean - 30_f64.ln()).abs() < 1e-12);
        assert_eq!(fit.get(&Key::Int(2)), Some(&Value::Float(0.0)));
        assert_eq!(fit.get(&Key::Int(3)), Some(&Value::Int(1)));

        let all_class3 = path(params, &[all(), Key::Int(3)]).as_table().unwrap();
        assert_eq!(all_class3.get(&Key::Int(3)), Some(&Value::Int(1)));
    }

    #[test]
    fn test_group_consecutive() {
        let groups = group_consecutive([(1, 'a'), (1, 'b'), (2, 'c'), (1, 'd')]);
        assert_eq!(
            groups,
            vec![(1, vec!['a', 'b']), (2, vec!['c']), (1, vec!['d'])]
        );
    }
}
