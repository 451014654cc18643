//! Death log ingestion and precomputation.
//!
//! This crate turns saved-variable dumps of the death log addon into the
//! precomputed tables the addon ships with.
//!
//! # Overview
//!
//! Data flows in one direction:
//!
//! 1. **Extract** ([`extract::extract_document`]): Detect the container layout
//!    of a document and parse each entry into a [`record::DeathRecord`].
//!    Malformed entries are reported as [`extract::EntryError`] and skipped.
//! 2. **Deduplicate** ([`dedup::CanonicalDeathSet`]): Collapse repeated reports
//!    of the same death, last write wins.
//! 3. **Aggregate**, three independent passes over the canonical set:
//!    - [`cube::StatsCube`]: count, level sum and average level per
//!      (area, class, source) combination, with `all` rollups
//!    - [`distribution::LevelDistributionFitter`]: log-normal level
//!      distribution per (area, class), truncated fit for all areas
//!    - [`skull::SkullLocationCollector`]: map positions per map
//! 4. **Write** ([`artifact::write_artifact`]): Serialize the three tables as
//!    Lua assignments.
//!
//! [`pipeline`] ties the steps together.
//!
//! # Examples
//!
//! ```
//! use deathlog_analysis::{
//!     artifact::write_artifact,
//!     distribution::FitConfig,
//!     pipeline::{Ingest, Precomputed},
//! };
//!
//! let doc = r#"deathlog_data = {
//! 		["Foo-1"] = { ["name"] = "Foo", ["guild"] = "", ["level"] = 30,
//! 			["class_id"] = 1, ["source_id"] = 99, ["instance_id"] = 5 },
//! }"#;
//!
//! let mut ingest = Ingest::new();
//! ingest.add_document(doc);
//! let precomputed = Precomputed::from_canonical(ingest.canonical(), &FitConfig::default());
//! assert_eq!(precomputed.cube.global().unwrap().entry_count, 1);
//!
//! let mut out = Vec::new();
//! write_artifact(&precomputed, &mut out)?;
//! assert!(String::from_utf8(out)?.starts_with("precomputed_general_stats = {"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod artifact;
pub mod cube;
pub mod dedup;
pub mod distribution;
pub mod extract;
pub mod lua;
pub mod pipeline;
pub mod record;
pub mod skull;
