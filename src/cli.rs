//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::pip_backtester::PipBacktester;
use crate::domain::dataset::DataSet;
use crate::domain::error::GeneratorError;
use crate::domain::indicator::registry;
use crate::domain::optimizer::worker::spawn_optimizer;
use crate::domain::optimizer::{OptimizationOutcome, Optimizer, OptimizerEvent};
use crate::domain::param::SlotRole;
use crate::domain::strategy_config::{
    build_data_settings, build_strategy, load_run_config, DataSettings,
};
use crate::ports::data_port::DataPort;

/// Histories shorter than this are refused.
pub const MIN_BARS: usize = 50;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "stratgen", about = "Indicator strategy optimizer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Optimize the configured strategy
    Optimize {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        rounds: Option<usize>,
        /// Stop after this many seconds, keeping the best strategy so far
        #[arg(long)]
        time_limit: Option<u64>,
        /// Also write the final description to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List the indicator catalog with default parameters
    Indicators {
        /// Only indicators usable in this slot role (e.g. entry_filter)
        #[arg(long)]
        slot: Option<String>,
    },
    /// Print the configured strategy in plain language
    Describe {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in the data directory
    Symbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Installs the stderr log subscriber; `RUST_LOG` overrides the default level.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Optimize {
            config,
            seed,
            rounds,
            time_limit,
            output,
        } => run_optimize(&config, seed, rounds, time_limit, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Indicators { slot } => run_indicators(slot.as_deref()),
        Command::Describe { config } => run_describe(&config),
        Command::Symbols { config } => run_symbols(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(&err)
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, GeneratorError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

/// Reads the configured symbol's history through the CSV adapter.
pub fn load_dataset(settings: &DataSettings) -> Result<DataSet, GeneratorError> {
    let adapter = CsvAdapter::new(settings.dir.clone());
    let bars = adapter.fetch_bars(&settings.instrument.symbol)?;
    DataSet::with_minimum(settings.instrument.clone(), bars, MIN_BARS)
}

fn run_optimize(
    config_path: &Path,
    seed: Option<u64>,
    rounds: Option<usize>,
    time_limit: Option<u64>,
    output: Option<&Path>,
) -> Result<(), GeneratorError> {
    let config = load_config(config_path)?;
    let mut run = load_run_config(&config)?;
    if let Some(seed) = seed {
        run.options.seed = seed;
    }
    if let Some(rounds) = rounds {
        run.options.rounds = rounds.max(1);
    }
    if let Some(secs) = time_limit {
        run.time_limit = (secs > 0).then(|| Duration::from_secs(secs));
    }

    let data = load_dataset(&run.data)?;
    eprintln!(
        "Optimizing '{}' on {} ({} bars, seed {}, {} round(s))",
        run.strategy.name,
        run.data.instrument.symbol,
        data.all_bars().len(),
        run.options.seed,
        run.options.rounds,
    );

    let optimizer = Optimizer::new(
        run.strategy,
        Arc::new(data),
        Arc::new(PipBacktester::new()),
        run.options,
    )?;
    eprintln!("  Initial score: {:.2}", optimizer.best_score());

    let handle = spawn_optimizer(optimizer)?;
    let deadline = run.time_limit.map(|limit| Instant::now() + limit);
    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) && !handle.cancellation().is_cancelled() {
            eprintln!("  Time limit reached, stopping");
            handle.cancel();
        }
        match handle.events.recv_timeout(POLL_INTERVAL) {
            Ok(OptimizerEvent::PhaseStarted(phase)) => eprintln!("  Phase: {phase}"),
            Ok(OptimizerEvent::Improved { phase, score }) => {
                eprintln!("    improved to {score:.2} ({phase})");
            }
            Ok(OptimizerEvent::Checkpoint { .. }) => {}
            Ok(OptimizerEvent::Finished { .. }) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    let mut outcome = handle.join()?;
    print_outcome(&outcome);

    if let Some(path) = output {
        fs::write(path, outcome.best.describe())?;
        eprintln!("\nDescription written to: {}", path.display());
    }
    match outcome.failure.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn print_outcome(outcome: &OptimizationOutcome) {
    eprintln!("\n=== Optimization Results ===");
    eprintln!("Initial score:    {:.2}", outcome.initial_score);
    eprintln!("Best score:       {:.2}", outcome.best_score);
    eprintln!("Evaluations:      {}", outcome.evaluations);
    eprintln!("Rounds run:       {}", outcome.rounds_run);
    if outcome.cancelled {
        eprintln!("Stopped early:    yes");
    }
    if let Some(err) = &outcome.failure {
        eprintln!("Aborted:          {err}");
    }
    println!("{}", outcome.best.describe());
    for (i, slot) in outcome.best.slots.iter().enumerate() {
        println!("[slot{i}] {} ({})", slot.label(), slot.role.label());
        for line in slot.param.to_string().lines() {
            println!("  {line}");
        }
    }
}

fn run_validate(config_path: &Path) -> Result<(), GeneratorError> {
    let config = load_config(config_path)?;
    let run = load_run_config(&config)?;
    eprintln!("Config validated successfully");
    eprintln!("  symbol:   {}", run.data.instrument.symbol);
    eprintln!("  strategy: {} ({} slots)", run.strategy.name, run.strategy.slots.len());
    for slot in &run.strategy.slots {
        eprintln!("    {}: {}", slot.role.label(), slot.label());
    }
    Ok(())
}

fn run_indicators(slot: Option<&str>) -> Result<(), GeneratorError> {
    let names = match slot {
        Some(raw) => {
            let role = SlotRole::parse(raw).ok_or_else(|| GeneratorError::ConfigInvalid {
                section: "cli".to_string(),
                key: "slot".to_string(),
                reason: format!("unknown slot role '{raw}'"),
            })?;
            registry::names_for(role)
        }
        None => registry::names().to_vec(),
    };

    for name in names {
        let indicator = registry::construct(name)?;
        let roles: Vec<&str> = indicator.possible_slots().iter().map(|r| r.label()).collect();
        let role = slot
            .and_then(SlotRole::parse)
            .or_else(|| indicator.possible_slots().first().copied())
            .unwrap_or(SlotRole::NotDefined);
        let initialized = registry::construct_for(name, role)?;
        println!("{name} [{}]", roles.join(", "));
        for line in initialized.param().to_string().lines() {
            println!("  {line}");
        }
    }
    Ok(())
}

fn run_describe(config_path: &Path) -> Result<(), GeneratorError> {
    let config = load_config(config_path)?;
    let strategy = build_strategy(&config)?;
    print!("{}", strategy.describe());
    Ok(())
}

fn run_symbols(config_path: &Path) -> Result<(), GeneratorError> {
    let config = load_config(config_path)?;
    let settings = build_data_settings(&config)?;
    let symbols = CsvAdapter::new(settings.dir).list_symbols()?;
    if symbols.is_empty() {
        eprintln!("No symbols found");
    }
    for symbol in symbols {
        println!("{symbol}");
    }
    Ok(())
}
