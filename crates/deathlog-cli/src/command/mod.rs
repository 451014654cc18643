use clap::{Parser, Subcommand};

use self::{precompute::PrecomputeArg, summary::SummaryArg};

mod precompute;
mod summary;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What to do with the input directory (defaults to `precompute`)
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Append the precomputed Lua tables to the artifact
    Precompute(#[clap(flatten)] PrecomputeArg),
    /// Print extraction counters and level statistics as JSON
    Summary(#[clap(flatten)] SummaryArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args
        .mode
        .unwrap_or(Mode::Precompute(PrecomputeArg::default()))
    {
        Mode::Precompute(arg) => precompute::run(&arg)?,
        Mode::Summary(arg) => summary::run(&arg)?,
    }
    Ok(())
}
