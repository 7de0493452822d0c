use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

mod completion;
mod config;
mod render;
mod run;

use completion::{write_completions_script, CliCompletionShell};
use config::{load_config_file, resolve_run_config, CliOverrides, RunModeRequest};
use render::{current_output_style, OutputFormat};
use run::run_analysis;

#[derive(Parser, Debug)]
#[command(name = "upgradepath")]
#[command(
    about = "Find catalog bundles that older catalog snapshots can upgrade into",
    long_about = None
)]
struct Cli {
    /// TOML configuration file (defaults to ./upgradepath.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report new bundles of the target catalog reachable from each older catalog
    Reach(ReachArgs),
    /// Report problem bundles and the current channels offering an edge away from them
    Incident(IncidentArgs),
    /// Print a shell completion script
    Completions { shell: CliCompletionShell },
}

#[derive(Args, Debug, Clone, Default)]
struct ReachArgs {
    /// Older catalog versions to evaluate (comma separated or repeated)
    #[arg(long, value_delimiter = ',', value_name = "VERSION")]
    from: Vec<String>,
    /// Catalog version providing the upgrade edges
    #[arg(long, value_name = "VERSION")]
    to: Option<String>,
    /// Directory holding one catalog directory per version
    #[arg(long, value_name = "DIR")]
    catalogs_dir: Option<PathBuf>,
    #[arg(long, value_enum)]
    output: Option<OutputFormat>,
}

#[derive(Args, Debug, Clone, Default)]
struct IncidentArgs {
    #[command(flatten)]
    reach: ReachArgs,
    /// Directory holding the current catalog directory per older version
    #[arg(long, value_name = "DIR")]
    current_catalogs_dir: Option<PathBuf>,
}

impl ReachArgs {
    fn into_overrides(self, current_catalogs_dir: Option<PathBuf>) -> CliOverrides {
        CliOverrides {
            from: self.from,
            to: self.to,
            catalogs_dir: self.catalogs_dir,
            current_catalogs_dir,
            output: self.output,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    run_cli(cli)
}

fn run_cli(cli: Cli) -> Result<()> {
    let (overrides, request) = match cli.command {
        Commands::Reach(args) => (args.into_overrides(None), RunModeRequest::Reach),
        Commands::Incident(args) => (
            args.reach.into_overrides(args.current_catalogs_dir),
            RunModeRequest::Incident,
        ),
        Commands::Completions { shell } => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            write_completions_script(shell, &mut writer)?;
            return writer.flush().context("failed flushing completion script");
        }
    };

    let file = load_config_file(cli.config.as_deref())?;
    let config = resolve_run_config(file, overrides, request)?;
    log::debug!("resolved run configuration: {config:?}");

    let stdout = std::io::stdout();
    let mut writer = stdout.lock();
    run_analysis(&config, current_output_style(), &mut writer)?;
    writer.flush().context("failed flushing report output")
}
