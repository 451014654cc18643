use std::{
    fs::OpenOptions,
    io::{BufWriter, Write as _},
    path::PathBuf,
};

use anyhow::Context;
use chrono::Utc;
use clap::Args;
use deathlog_analysis::{
    artifact::write_artifact,
    distribution::{DEFAULT_TRUNCATION_LEVEL, FitConfig},
    pipeline::Precomputed,
};

use crate::util;

#[derive(Debug, Clone, Args)]
pub(crate) struct PrecomputeArg {
    /// Directory containing saved-variable dumps
    #[arg(default_value = ".")]
    input_dir: PathBuf,
    /// Lua artifact path
    #[arg(long, default_value = "out.lua")]
    output: PathBuf,
    /// Levels at or above this are excluded from the all-areas fits
    #[arg(long, default_value_t = DEFAULT_TRUNCATION_LEVEL)]
    truncate: u32,
    /// Replace the artifact instead of appending to it
    #[arg(long)]
    overwrite: bool,
}

impl Default for PrecomputeArg {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output: PathBuf::from("out.lua"),
            truncate: DEFAULT_TRUNCATION_LEVEL,
            overwrite: false,
        }
    }
}

pub(crate) fn run(arg: &PrecomputeArg) -> anyhow::Result<()> {
    let ingest = util::ingest_dir(&arg.input_dir)?;
    let config = FitConfig {
        truncation_level: arg.truncate,
    };
    let precomputed = Precomputed::from_canonical(ingest.canonical(), &config);

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(!arg.overwrite)
        .truncate(arg.overwrite)
        .open(&arg.output)
        .with_context(|| format!("Failed to open artifact: {}", arg.output.display()))?;
    let mut writer = BufWriter::new(file);
    writeln!(
        writer,
        "-- generated by deathlog {} at {}",
        env!("CARGO_PKG_VERSION"),
        Utc::now().to_rfc3339()
    )
    .and_then(|()| write_artifact(&precomputed, &mut writer))
    .with_context(|| format!("Failed to write artifact: {}", arg.output.display()))?;

    tracing::info!(
        cells = precomputed.cube.len(),
        maps = precomputed.skulls.len(),
        fits = precomputed.distributions.len(),
        output = %arg.output.display(),
        appended = !arg.overwrite,
        "artifact written"
    );
    Ok(())
}
