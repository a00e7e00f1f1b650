//! pcdgen — generates the PEI and DXE Platform Configuration Databases.

mod commands;
mod manifest;

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;

use manifest::Project;

#[derive(Parser)]
#[command(name = "pcdgen", version, about = "Platform Configuration Database generator")]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the platform's PCDs and write the PEI/DXE database sources
    Generate {
        /// Platform description (default: from pcdgen.toml, else platform.toml)
        #[arg(long)]
        platform: Option<PathBuf>,
        /// Output directory (default: from pcdgen.toml, else out/)
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Lay out non-dynamic tokens (FixedAtBuild, PatchableInModule, ...) as well;
        /// by default only dynamic tokens enter the database
        #[arg(long)]
        include_static: bool,
    },
    /// Merge and validate the platform's PCDs without writing anything
    Check {
        /// Platform description
        #[arg(long)]
        platform: Option<PathBuf>,
    },
    /// Print the merged token set
    Inspect {
        /// Platform description
        #[arg(long)]
        platform: Option<PathBuf>,
        /// Phase to show (pei, dxe); both if omitted
        #[arg(long)]
        phase: Option<String>,
        /// Output format (text, json)
        #[arg(long)]
        format: Option<String>,
        /// Include non-dynamic tokens
        #[arg(long)]
        include_static: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

/// `RUST_LOG` takes precedence over `-v`/`-q`.
fn init_logging(verbose: u8, quiet: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var("RUST_LOG").is_err() {
        builder.filter_level(log_level(verbose, quiet));
    }
    builder.format_timestamp(None);
    builder.init();
}

fn log_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let project = Project::discover(&cwd)?;

    match cli.command {
        Commands::Generate {
            platform,
            out_dir,
            include_static,
        } => commands::generate::run(
            &project,
            platform.as_deref(),
            out_dir.as_deref(),
            include_static,
        )
        .map(|_| ()),

        Commands::Check { platform } => {
            commands::check::run(&project, platform.as_deref()).map(|_| ())
        }

        Commands::Inspect {
            platform,
            phase,
            format,
            include_static,
        } => commands::inspect::run(
            &project,
            platform.as_deref(),
            phase.as_deref(),
            format.as_deref(),
            include_static,
        )
        .map(|_| ()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_generate_flags() {
        let cli = Cli::try_parse_from([
            "pcdgen",
            "-vv",
            "generate",
            "--platform",
            "Nt32.toml",
            "--out-dir",
            "build",
            "--include-static",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Generate {
                platform,
                out_dir,
                include_static,
            } => {
                assert_eq!(platform, Some(PathBuf::from("Nt32.toml")));
                assert_eq!(out_dir, Some(PathBuf::from("build")));
                assert!(include_static);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(log_level(0, false), LevelFilter::Warn);
        assert_eq!(log_level(1, false), LevelFilter::Info);
        assert_eq!(log_level(5, false), LevelFilter::Trace);
        assert_eq!(log_level(3, true), LevelFilter::Error);
    }
}
