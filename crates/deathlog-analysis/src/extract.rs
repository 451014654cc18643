//! Extraction of death records from saved-variable dumps.
//!
//! Two layouts exist upstream. Both hold one table per death, but they are
//! located differently:
//!
//! - [`Layout::DeathLogEntries`]: an array under `death_log_entries`, each
//!   element followed by a `-- [n]` index comment.
//! - [`Layout::DeathlogData`]: a realm-keyed map under `deathlog_data`, each
//!   entry keyed at the second nesting level (`\n\t\t[`).
//!
//! The layout is detected by its marker, `death_log_entries` first. The text
//! after the marker is cut at the layout's entry separator, ignoring
//! separators inside string literals and comments (see
//! [`lua::split_outside_strings`]), and each fragment is scanned for its
//! `["key"] = value` fields (see [`lua::scan_fields`]).
//! Fragments without fields (container openers, trailers) are not entries.
//! A fragment whose fields do not form a valid record yields an
//! [`EntryError`] and the remaining fragments are still processed.

use serde::Serialize;

use crate::{
    lua::{self, LuaSyntaxError, Table, Value},
    record::{Area, DeathRecord, MapPosition},
};

/// Upstream container layout of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    DeathLogEntries,
    DeathlogData,
}

impl Layout {
    /// Detection order.
    pub const ALL: [Layout; 2] = [Layout::DeathLogEntries, Layout::DeathlogData];

    #[must_use]
    pub fn marker(self) -> &'static str {
        match self {
            Layout::DeathLogEntries => "death_log_entries",
            Layout::DeathlogData => "deathlog_data",
        }
    }

    #[must_use]
    pub fn separator(self) -> &'static str {
        match self {
            Layout::DeathLogEntries => "-- [",
            Layout::DeathlogData => "\n\t\t[",
        }
    }

    /// Finds the first layout whose marker occurs in `text`.
    ///
    /// Returns the layout and the text following the marker. When the marker
    /// is a quoted key (`["death_log_entries"]`), the closing quote and
    /// bracket are skipped as well.
    #[must_use]
    pub fn detect(text: &str) -> Option<(Self, &str)> {
        Self::ALL.into_iter().find_map(|layout| {
            let start = text.find(layout.marker())? + layout.marker().len();
            let body = &text[start..];
            let body = body
                .strip_prefix("\"]")
                .or_else(|| body.strip_prefix("']"))
                .unwrap_or(body);
            Some((layout, body))
        })
    }
}

/// Why a single entry was dropped.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum EntryError {
    #[display("missing field '{field}'")]
    MissingField { field: &'static str },
    #[display("invalid value {value} for field '{field}'")]
    InvalidField { field: &'static str, value: String },
    #[display("{_0}")]
    Syntax(LuaSyntaxError),
}

impl EntryError {
    /// Stable key for drop counters, e.g. `missing:level`.
    #[must_use]
    pub fn counter_key(&self) -> String {
        match self {
            EntryError::MissingField { field } => format!("missing:{field}"),
            EntryError::InvalidField { field, .. } => format!("invalid:{field}"),
            EntryError::Syntax(_) => "syntax".to_owned(),
        }
    }
}

/// Lazy sequence of entries of one document.
///
/// Consumed once; yields one item per entry fragment.
#[derive(Debug, Clone)]
pub struct Entries<'a> {
    layout: Option<Layout>,
    fragments: Option<lua::SplitOutsideStrings<'a>>,
}

impl Entries<'_> {
    /// The detected layout, or `None` if the document has no known marker.
    #[must_use]
    pub fn layout(&self) -> Option<Layout> {
        self.layout
    }
}

impl Iterator for Entries<'_> {
    type Item = Result<DeathRecord, EntryError>;

    fn next(&mut self) -> Option<Self::Item> {
        let fragments = self.fragments.as_mut()?;
        for fragment in fragments.by_ref() {
            match lua::scan_fields(fragment) {
                Ok(fields) if fields.is_empty() => {}
                Ok(fields) => return Some(parse_entry(&fields)),
                Err(err) => return Some(Err(EntryError::Syntax(err))),
            }
        }
        None
    }
}

/// Splits one document into its entries.
///
/// A document without either marker (including an empty one) yields nothing.
#[must_use]
pub fn extract_document(text: &str) -> Entries<'_> {
    match Layout::detect(text) {
        Some((layout, body)) => Entries {
            layout: Some(layout),
            fragments: Some(lua::split_outside_strings(body, layout.separator())),
        },
        None => Entries {
            layout: None,
            fragments: None,
        },
    }
}

/// Builds a record from the fields of one entry.
///
/// Required: `class_id`, `source_id`, `guild`, `level` (>= 1), `name`.
/// The area is taken from `map_id` + `map_pos` if `map_id` is present,
/// otherwise from `instance_id`, otherwise it is unknown.
pub fn parse_entry(fields: &Table) -> Result<DeathRecord, EntryError> {
    let class_id = required(fields, "class_id", as_int)?;
    let source_id = required(fields, "source_id", as_int)?;
    let guild = required(fields, "guild", as_text)?;
    let level = required(fields, "level", |v| {
        as_int(v)
            .and_then(|l| u32::try_from(l).ok())
            .filter(|l| *l >= 1)
    })?;
    let name = required(fields, "name", as_text)?;

    let area = if let Some(map_id) = optional(fields, "map_id", as_int)? {
        let (x, y) = required(fields, "map_pos", as_position)?;
        Area::Map {
            map_id,
            position: MapPosition::from_fraction(x, y),
        }
    } else if let Some(instance_id) = optional(fields, "instance_id", as_int)? {
        Area::Instance { instance_id }
    } else {
        Area::Unknown
    };

    Ok(DeathRecord {
        name,
        guild,
        level,
        source_id,
        class_id,
        area,
    })
}

fn optional<T>(
    fields: &Table,
    field: &'static str,
    convert: impl FnOnce(&Value) -> Option<T>,
) -> Result<Option<T>, EntryError> {
    match fields.field(field) {
        None | Some(Value::Nil) => Ok(None),
        Some(value) => convert(value)
            .map(Some)
            .ok_or_else(|| EntryError::InvalidField {
                field,
                value: value.describe(),
            }),
    }
}

fn required<T>(
    fields: &Table,
    field: &'static str,
    convert: impl FnOnce(&Value) -> Option<T>,
) -> Result<T, EntryError> {
    optional(fields, field, convert)?.ok_or(EntryError::MissingField { field })
}

/// Integer literal, or a string holding one.
fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Str(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Str(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        _ => None,
    }
}

/// `"x,y"` in map fractions, or a two-element sequence.
fn as_position(value: &Value) -> Option<(f64, f64)> {
    match value {
        Value::Str(s) => {
            let mut parts = s.split(',').map(|p| p.trim().parse::<f64>().ok());
            Some((parts.next()??, parts.next()??))
        }
        Value::Table(t) => {
            let mut items = t.iter().map(|(_, v)| v.as_f64());
            Some((items.next()??, items.next()??))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT_A: &str = "DeathLogSavedVars = {\n\
        \t[\"death_log_entries\"] = {\n\
        \t\t{\n\
        \t\t\t[\"name\"] = \"Foo\",\n\
        \t\t\t[\"guild\"] = \"Bar\",\n\
        \t\t\t[\"level\"] = 30,\n\
        \t\t\t[\"class_id\"] = \"1\",\n\
        \t\t\t[\"source_id\"] = 99,\n\
        \t\t\t[\"instance_id\"] = 5,\n\
        \t\t}, -- [1]\n\
        \t\t{\n\
        \t\t\t[\"name\"] = \"Quux\",\n\
        \t\t\t[\"guild\"] = \"\",\n\
        \t\t\t[\"level\"] = 12,\n\
        \t\t\t[\"class_id\"] = 4,\n\
        \t\t\t[\"source_id\"] = -1,\n\
        \t\t}, -- [2]\n\
        \t},\n\
        }\n";

    const LAYOUT_B: &str = "deathlog_data = {\n\
        \t[\"Realm\"] = {\n\
        \t\t[\"Broken-1\"] = {\n\
        \t\t\t[\"name\"] = \"Broken\",\n\
        \t\t\t[\"guild\"] = \"Qux\",\n\
        \t\t\t[\"class_id\"] = 1,\n\
        \t\t\t[\"source_id\"] = 99,\n\
        \t\t},\n\
        \t\t[\"Baz-1\"] = {\n\
        \t\t\t[\"name\"] = \"Baz\",\n\
        \t\t\t[\"guild\"] = \"Qux\",\n\
        \t\t\t[\"level\"] = 45,\n\
        \t\t\t[\"class_id\"] = 1,\n\
        \t\t\t[\"source_id\"] = 99,\n\
        \t\t\t[\"map_id\"] = 2,\n\
        \t\t\t[\"map_pos\"] = \"0.5,0.5\",\n\
        \t\t},\n\
        \t},\n\
        }\n";

    fn fields(src: &str) -> Table {
        lua::scan_fields(src).unwrap()
    }

    #[test]
    fn test_layout_a() {
        let entries = extract_document(LAYOUT_A);
        assert_eq!(entries.layout(), Some(Layout::DeathLogEntries));
        let records = entries.collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Foo");
        assert_eq!(records[0].class_id, 1);
        assert_eq!(records[0].area, Area::Instance { instance_id: 5 });
        assert_eq!(records[1].guild, "");
        assert_eq!(records[1].source_id, -1);
        assert_eq!(records[1].area, Area::Unknown);
    }

    #[test]
    fn test_layout_b_drops_malformed_entry_only() {
        let entries = extract_document(LAYOUT_B);
        assert_eq!(entries.layout(), Some(Layout::DeathlogData));
        let results = entries.collect::<Vec<_>>();
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0],
            Err(EntryError::MissingField { field: "level" })
        );
        let record = results[1].as_ref().unwrap();
        assert_eq!(record.name, "Baz");
        assert_eq!(record.level, 45);
        let Area::Map { map_id, position } = record.area else {
            panic!("expected map area, got {:?}", record.area);
        };
        assert_eq!(map_id, 2);
        assert_eq!(position, MapPosition { x: 500.0, y: 500.0 });
    }

    #[test]
    fn test_layout_a_takes_precedence() {
        let text = format!("{LAYOUT_B}\n{LAYOUT_A}");
        assert_eq!(
            extract_document(&text).layout(),
            Some(Layout::DeathLogEntries)
        );
    }

    #[test]
    fn test_unrecognized_documents_yield_nothing() {
        assert_eq!(extract_document("").count(), 0);
        let entries = extract_document("SomeOtherAddon = { [\"level\"] = 3 }");
        assert_eq!(entries.layout(), None);
        assert_eq!(entries.count(), 0);
    }

    #[test]
    fn test_reparse_is_stable() {
        let keys = |text| {
            extract_document(text)
                .map(|r| r.map(|r| r.key()))
                .collect::<Vec<_>>()
        };
        for text in [LAYOUT_A, LAYOUT_B] {
            let first = keys(text);
            assert!(!first.is_empty());
            assert_eq!(first, keys(text));
        }
    }

    #[test]
    fn test_separator_inside_string_value() {
        let text = LAYOUT_A.replace("[\"guild\"] = \"Bar\"", "[\"guild\"] = \"Bar -- [x]\"");
        let records = extract_document(&text).collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Foo");
        assert_eq!(records[0].guild, "Bar -- [x]");
        assert_eq!(records[0].level, 30);

        let text = LAYOUT_B.replace(
            "[\"guild\"] = \"Qux\",\n\t\t\t[\"level\"]",
            // Backslash-newline escape puts a raw separator inside the string.
            "[\"guild\"] = \"Qux\\\n\t\t[x]\",\n\t\t\t[\"level\"]",
        );
        let results = extract_document(&text).collect::<Vec<_>>();
        assert_eq!(results.len(), 2);
        let record = results[1].as_ref().unwrap();
        assert_eq!(record.name, "Baz");
        assert_eq!(record.guild, "Qux\n\t\t[x]");
    }

    #[test]
    fn test_field_value_containing_marker_text() {
        let record = parse_entry(&fields(
            r#"["name"] = "x[\"level\"] = 99", ["guild"] = "g", ["level"] = 7, ["class_id"] = 2, ["source_id"] = 3"#,
        ))
        .unwrap();
        assert_eq!(record.name, r#"x["level"] = 99"#);
        assert_eq!(record.level, 7);
    }

    #[test]
    fn test_invalid_fields() {
        let base = r#"["name"] = "n", ["guild"] = "g", ["class_id"] = 2, ["source_id"] = 3, "#;
        let parse = |extra: &str| parse_entry(&fields(&format!("{base}{extra}")));

        assert!(matches!(
            parse(r#"["level"] = 0"#),
            Err(EntryError::InvalidField { field: "level", .. })
        ));
        assert!(matches!(
            parse(r#"["level"] = "high""#),
            Err(EntryError::InvalidField { field: "level", .. })
        ));
        assert_eq!(
            parse(r#"["level"] = 3, ["map_id"] = 4"#),
            Err(EntryError::MissingField { field: "map_pos" })
        );
        assert!(matches!(
            parse(r#"["level"] = 3, ["map_id"] = 4, ["map_pos"] = "0.5""#),
            Err(EntryError::InvalidField { field: "map_pos", .. })
        ));
        assert_eq!(
            parse(r#"["level"] = 3, ["instance_id"] = nil"#).map(|r| r.area),
            Ok(Area::Unknown)
        );
    }

    #[test]
    fn test_map_area_wins_over_instance() {
        let record = parse_entry(&fields(
            r#"["name"] = "n", ["guild"] = "g", ["level"] = 3, ["class_id"] = 2, ["source_id"] = 3,
               ["instance_id"] = 9, ["map_id"] = 7, ["map_pos"] = "0.1234,0.5678""#,
        ))
        .unwrap();
        let Area::Map { map_id, position } = record.area else {
            panic!("expected map area");
        };
        assert_eq!(map_id, 7);
        assert!((position.x - 123.4).abs() < 1e-9);
        assert!((position.y - 567.8).abs() < 1e-9);
    }

    #[test]
    fn test_counter_keys() {
        assert_eq!(
            EntryError::MissingField { field: "level" }.counter_key(),
            "missing:level"
        );
        assert_eq!(
            EntryError::InvalidField {
                field: "map_pos",
                value: "1".to_owned()
            }
            .counter_key(),
            "invalid:map_pos"
        );
    }
}
