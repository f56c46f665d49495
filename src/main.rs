use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use deft::config::Config;
use deft::entry;
use deft::loader::FsLoader;
use deft::paths::PathRules;
use deft::runtime::{Engine, EngineConfig, RunReport};
use deft::{dlog, dlog_error, Result};

/// Deft - asynchronous module loader and dependency resolver
#[derive(Parser, Debug)]
#[command(name = "deft")]
#[command(version, about, long_about = None)]
#[command(
    after_help = "ENVIRONMENT:\n    DEFT_DEBUG=1     Enable debug logging (alternative to --debug)\n    DEFT_MAIN=NAME   Entry module when none is given"
)]
pub struct Cli {
    /// Enable debug logging (writes to ~/.deft/deft.log)
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    /// Config file (defaults to ~/.deft/deft.toml)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Load an entry module and run until every reachable unit settles
    Run {
        /// Entry module name or locator
        entry: Option<String>,

        /// Directory module locators are resolved against
        #[arg(long)]
        root: Option<PathBuf>,

        /// Allow cyclic definitions (they stall instead of failing)
        #[arg(long)]
        no_cycle_check: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default config file (to --config, or ~/.deft/deft.toml)
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Print the locator a bare module name maps to
    Locate {
        name: String,
    },

    /// Print the module name a locator maps to
    Name {
        locator: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    deft::log::init(cli.debug, config.effective_log_level()?);
    dlog!("Deft starting: {:?}", cli.command);

    let result = match cli.command {
        Command::Run {
            entry,
            root,
            no_cycle_check,
            json,
        } => run(config, entry, root, no_cycle_check, json),
        Command::Init { force } => init(&config, cli.config.as_deref(), force),
        Command::Locate { name } => {
            let rules = PathRules::new(config.effective_suffix())?;
            println!("{}", rules.to_locator(&name));
            Ok(())
        }
        Command::Name { locator } => {
            let rules = PathRules::new(config.effective_suffix())?;
            println!("{}", rules.to_name(&locator));
            Ok(())
        }
    };

    if let Err(e) = &result {
        dlog_error!("Deft exiting with error: {}", e);
    }
    result
}

fn run(
    mut config: Config,
    entry: Option<String>,
    root: Option<PathBuf>,
    no_cycle_check: bool,
    json: bool,
) -> Result<()> {
    if no_cycle_check {
        config.detect_cycles = false;
    }
    let entry = entry::discover(entry.as_deref(), &config)?;
    let root = match root {
        Some(root) => root,
        None => config.effective_root()?,
    };
    dlog!("Run: entry={}, root={}", entry, root.display());

    let engine_config = EngineConfig::from_config(&config)?;
    let mut engine = Engine::with_config(FsLoader::new(root), engine_config);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let report = rt.block_on(async {
        engine.load_entry(&entry)?;
        engine.run().await
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&engine, &entry, &report);
    }
    Ok(())
}

fn init(config: &Config, path: Option<&Path>, force: bool) -> Result<()> {
    let target = match path {
        Some(path) => path.to_path_buf(),
        None => Config::config_path()?,
    };
    if target.exists() && !force {
        println!(
            "{} already exists (use --force to overwrite)",
            target.display()
        );
        return Ok(());
    }

    match path {
        Some(path) => config.save_to(path)?,
        None => config.save()?,
    }
    dlog!("Wrote config to {}", target.display());
    println!("Wrote {}", target.display());
    Ok(())
}

fn print_report(engine: &Engine, entry: &str, report: &RunReport) {
    let name = engine.config().rules.to_name(entry);
    match engine.export(&name) {
        Some(export) => println!("{} = {}", name, export),
        None => println!("{} did not execute", name),
    }
    for task in &report.task_exports {
        println!("{} = {}", task.id, task.export);
    }
    println!();
    print!("{}", report);
}
