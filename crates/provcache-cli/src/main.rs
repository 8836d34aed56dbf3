mod config;
mod install;
mod link;

use config::ProvcacheConfig;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "provcache")]
#[command(about = "Install provider packages into a local plugin cache")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install a package from a URL, a zip archive or a directory
    Install(install::InstallArgs),

    /// Link a package from one cache directory into another
    Link(link::LinkArgs),
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn run() -> Result<u8> {
    let args = Args::parse();
    init_logging(args.verbose);

    // Load provcache.toml config if present
    let config = ProvcacheConfig::load_from_cwd()?.unwrap_or_default();

    match args.command {
        Commands::Install(install_args) => {
            let rt = tokio::runtime::Runtime::new()
                .map_err(|e| anyhow::anyhow!("Failed to create async runtime: {}", e))?;
            rt.block_on(install::execute(install_args, &config))
        }
        Commands::Link(link_args) => link::execute(link_args, &config),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}
