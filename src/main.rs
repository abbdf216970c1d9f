//! Runs RSU selection over a scripted scenario and writes one CSV row per
//! vehicle per tick.

use clap::Parser;
use rsu_handover::{
    Config, CsvRecordWriter, DecisionLoop, DurationModel, Roster, ScriptedSimulator, StrategyKind,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rsu-handover")]
#[command(about = "Select a roadside unit for every vehicle at every tick", long_about = None)]
struct Cli {
    /// RSU roster CSV file (id,x,y)
    #[arg(long)]
    roster: PathBuf,

    /// Scenario JSON file listing the scripted vehicles
    #[arg(long)]
    scenario: PathBuf,

    /// Configuration JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Selection strategy (greedy-current, greedy-lookahead, horizon-optimal)
    #[arg(long)]
    strategy: Option<StrategyKind>,

    /// Maximum number of ticks to run
    #[arg(long)]
    tick_budget: Option<usize>,

    /// Connection duration model (rollout, naive_eta)
    #[arg(long)]
    duration_model: Option<DurationModel>,

    /// Output CSV file; records go to stdout when omitted
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> rsu_handover::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rsu_handover=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(strategy) = cli.strategy {
        config.strategy = strategy;
    }
    if let Some(tick_budget) = cli.tick_budget {
        config.tick_budget = tick_budget;
    }
    if let Some(duration_model) = cli.duration_model {
        config.duration_model = duration_model;
    }
    config.validate()?;

    let roster = Roster::load(&cli.roster)?;
    let mut sim = ScriptedSimulator::load(&cli.scenario)?;

    let output: Box<dyn Write> = match &cli.out {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = CsvRecordWriter::new(output);

    let decision_loop = DecisionLoop::new(&config, &roster)?;
    decision_loop.run(&mut sim, &mut writer)?;
    writer.into_inner()?.flush()?;
    Ok(())
}
