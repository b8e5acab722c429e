use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use stallwatch::{analyze, swlog, swlog_error, AnalysisConfig, Result, Task, TaskRegistry};

/// Stallwatch - workflow bottleneck detection and deadline risk forecasting
#[derive(Parser, Debug)]
#[command(name = "stallwatch")]
#[command(version, about, long_about = None)]
#[command(
    after_help = "ENVIRONMENT:\n    STALLWATCH_DEBUG=1     Enable debug logging (alternative to --debug)"
)]
pub struct Cli {
    /// Enable debug logging (writes to ~/.stallwatch/stallwatch.log)
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Analyze a JSON array of normalized task records
    Analyze {
        /// Path to the task records
        tasks: PathBuf,

        /// Reference date for all date arithmetic (defaults to today)
        #[arg(long)]
        as_of: Option<NaiveDate>,

        /// Config file to use instead of ~/.stallwatch/config.toml
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Run detector passes on separate threads
        #[arg(long)]
        parallel: bool,

        /// Print single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show the effective configuration
    Config {
        /// Write the default configuration to ~/.stallwatch/config.toml
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    stallwatch::log::init_with_debug(cli.debug);

    match cli.command {
        Command::Analyze {
            tasks,
            as_of,
            config,
            parallel,
            compact,
        } => run_analyze(tasks, as_of, config, parallel, compact),
        Command::Config { init } => run_config(init),
    }
}

fn run_analyze(
    tasks_path: PathBuf,
    as_of: Option<NaiveDate>,
    config_path: Option<PathBuf>,
    parallel: bool,
    compact: bool,
) -> Result<()> {
    swlog!(
        "Analyze command: tasks={} config={:?} parallel={}",
        tasks_path.display(),
        config_path,
        parallel
    );

    let mut config = match config_path {
        Some(path) => AnalysisConfig::load_from(&path)?,
        None => AnalysisConfig::load()?,
    };
    if parallel {
        config.parallel_passes = true;
    }

    let tasks: Vec<Task> = serde_json::from_str(&fs::read_to_string(&tasks_path)?)?;
    let registry = TaskRegistry::from_tasks(tasks)?;
    let as_of = as_of.unwrap_or_else(|| chrono::Local::now().date_naive());

    let result = analyze(&registry, &config, as_of).map_err(|e| {
        swlog_error!("Analysis failed: {}", e);
        e
    })?;
    if compact {
        println!("{}", result.to_json()?);
    } else {
        println!("{}", result.to_json_pretty()?);
    }
    Ok(())
}

fn run_config(init: bool) -> Result<()> {
    swlog!("Config command: init={}", init);
    if init {
        let path = AnalysisConfig::config_path()?;
        if path.exists() {
            println!("Config already exists at {}", path.display());
            return Ok(());
        }
        AnalysisConfig::default().save()?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let config = AnalysisConfig::load()?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
