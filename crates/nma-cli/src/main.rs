//! nma CLI

mod config;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use nma_inference::connected_components;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nma")]
#[command(about = "nma - Network meta-analysis of arm-level study data")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit the network and write the full report
    Run {
        /// Analysis config (YAML, or JSON by `.json` extension)
        #[arg(short, long)]
        config: PathBuf,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force random effects regardless of the config.
        #[arg(long)]
        random_effects: bool,

        /// Override the config's confidence-interval width.
        #[arg(long)]
        width: Option<f64>,
    },

    /// Connected components of the config's evidence network
    Components {
        /// Analysis config (YAML, or JSON by `.json` extension)
        #[arg(short, long)]
        config: PathBuf,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Reports go to stdout; keep logs out of them.
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { config, output, random_effects, width } => {
            cmd_run(&config, output.as_ref(), random_effects, width)
        }
        Commands::Components { config, output } => cmd_components(&config, output.as_ref()),
        Commands::Version => {
            println!("nma {}", nma_core::VERSION);
            Ok(())
        }
    }
}

fn cmd_run(
    path: &PathBuf,
    output: Option<&PathBuf>,
    random_effects: bool,
    width: Option<f64>,
) -> Result<()> {
    let mut cfg = config::read_analysis_config(path)?;
    if random_effects {
        cfg.random_effects = true;
    }
    if let Some(w) = width {
        cfg.width = w;
    }
    if !(cfg.width > 0.0 && cfg.width < 1.0) {
        bail!("width must be in (0, 1), got {}", cfg.width);
    }
    tracing::info!(
        path = %path.display(),
        arms = cfg.arms.len(),
        measure = cfg.measure.label(),
        random_effects = cfg.random_effects,
        "analysis config loaded"
    );

    let nma = cfg.analyze()?;
    tracing::info!(
        treatments = nma.treatments().len(),
        components = nma.components().len(),
        q = nma.q(),
        df = nma.df(),
        "network fitted"
    );

    let reference = match &cfg.reference {
        Some(treatment) => Some(serde_json::json!({
            "treatment": treatment,
            "study_level_effects": nma.study_level_effects(treatment, cfg.width)?,
            "funnel": nma.comparison_adjusted_effects(treatment, cfg.width)?,
        })),
        None => None,
    };

    let output_json = serde_json::json!({
        "measure": cfg.measure,
        "null_value": cfg.measure.null_value(),
        "random_effects": nma.random_effects(),
        "width": cfg.width,
        "treatments": nma.treatments(),
        "components": nma.components(),
        "q": nma.q(),
        "df": nma.df(),
        "tau": nma.tau(),
        "i_squared": nma.i_squared(cfg.width)?,
        "p_scores": nma.p_scores(cfg.smaller_better),
        "league_table": nma.league_table(cfg.width)?,
        "contrasts": nma.contrasts(),
        "reference": reference,
    });

    write_json(output, output_json)
}

fn cmd_components(path: &PathBuf, output: Option<&PathBuf>) -> Result<()> {
    let cfg = config::read_analysis_config(path)?;
    let components = connected_components(&cfg.studies(), &cfg.treatments());
    tracing::info!(components = components.len(), "network partitioned");
    write_json(
        output,
        serde_json::json!({
            "n_components": components.len(),
            "components": components,
        }),
    )
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
