#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the volcano risk pipeline.
//!
//! Uses `indicatif-log-bridge` (via [`volcano_risk_cli_utils::init_logger`])
//! so log lines and the per-volcano progress bar never fight for the
//! terminal.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use volcano_risk_cli_utils::IndicatifProgress;
use volcano_risk_osm::OverpassSource;
use volcano_risk_pipeline::config::DEFAULT_CONFIG_TOML;
use volcano_risk_pipeline::store::parse_list;
use volcano_risk_pipeline::{PipelineConfig, PipelineInputs, run_buffers, run_pipeline};

#[derive(Parser)]
#[command(name = "volcano_risk", about = "Volcano hazard exposure and evacuation analysis")]
struct Cli {
    /// TOML configuration file (defaults apply to anything it leaves out)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Volcano list (`id,name,longitude,latitude,status,region,subregion`)
    #[arg(long, default_value = "data/volcanoes.csv")]
    volcanoes: PathBuf,
    /// Population centroids (`id,longitude,latitude,population`)
    #[arg(long, default_value = "data/population.csv")]
    population: PathBuf,
    /// Directory for the exported files
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,
    /// Comma-separated volcano ids or names to analyse (default: all
    /// erupting and restless volcanoes)
    #[arg(long)]
    volcanoes_filter: Option<String>,
}

impl InputArgs {
    fn into_inputs(self) -> PipelineInputs {
        PipelineInputs {
            volcanoes: self.volcanoes,
            population: self.population,
            output_dir: self.output_dir,
            volcano_filter: self.volcanoes_filter.as_deref().map(parse_list),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: exposure, road scoring, services and exports
    Run {
        #[command(flatten)]
        inputs: InputArgs,
        /// Volcanoes analysed at once (overrides `run.concurrency`)
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Compute buffers and population at risk only (no network access)
    Buffers {
        #[command(flatten)]
        inputs: InputArgs,
    },
    /// Print the effective configuration as TOML
    Config {
        /// Print the annotated default file instead
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = volcano_risk_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            inputs,
            concurrency,
        } => {
            if let Some(concurrency) = concurrency {
                config.run.concurrency = concurrency;
            }
            let source = OverpassSource::new(config.overpass.clone())?;
            let progress = IndicatifProgress::volcanoes_bar(&multi);
            let summary =
                run_pipeline(&source, &inputs.into_inputs(), &config, progress).await?;

            for failure in &summary.failures {
                log::warn!(
                    "Not in output: {} ({}): {}",
                    failure.volcano_name,
                    failure.volcano_id,
                    failure.error
                );
            }
            log::info!(
                "{} people within reach of {} volcanoes",
                summary.total_affected().round(),
                summary.analyses.len()
            );
        }
        Commands::Buffers { inputs } => {
            let summary = run_buffers(&inputs.into_inputs(), &config)?;
            log::info!(
                "{} people within reach of {} volcanoes",
                summary.total_affected().round(),
                summary.analyses.len()
            );
        }
        Commands::Config { default } => {
            if default {
                print!("{DEFAULT_CONFIG_TOML}");
            } else {
                print!("{}", config.to_toml()?);
            }
        }
    }

    Ok(())
}
