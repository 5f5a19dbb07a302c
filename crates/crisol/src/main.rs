use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use crisol::config::Config;
use crisol::discovery::discover_entry_points;
use crisol::orchestrator::convert_project_to_single_file;
use crisol::resolver::ModuleResolver;

#[derive(Parser)]
#[command(name = "crisol")]
#[command(about = "Merge a multi-module Python program into a single file")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the program rooted at an entry file into one output file
    Merge {
        /// Entry source file
        entry: PathBuf,

        /// Destination path (defaults to <project-root>/output.py)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration file (defaults to crisol.toml in the project root)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Scan a directory for runnable entry points and import structure
    Discover {
        /// Project directory
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Merge {
            entry,
            output,
            config,
        } => {
            let config = match config {
                Some(path) => Config::load(&path)?,
                None => {
                    let probe = ModuleResolver::new(Config::default(), &entry);
                    Config::load_or_default(probe.project_root())?
                }
            };
            let written = convert_project_to_single_file(&entry, output.as_deref(), config)?;
            println!("{}", written.display());
        }
        Commands::Discover { dir } => {
            let report = discover_entry_points(&dir)?;
            println!("scanned {} modules", report.modules.len());
            if report.entry_files.is_empty() {
                println!("no runnable entry markers found");
            }
            for path in &report.entry_files {
                println!("entry: {}", path.display());
            }
            if let Some(central) = &report.central_leaf {
                println!("central leaf: {}", central.display());
            }
        }
    }
    Ok(())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_module("crisol", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();
}
