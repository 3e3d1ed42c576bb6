use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{CommandFactory, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use waypoint_core::{AppConfig, Blueprint, ExecutionContext};
use waypoint_engine::{ActionRegistry, Engine, Metrics, RunOutcome};

#[derive(Parser)]
#[command(name = "waypoint", version, about = "Declarative step-workflow engine")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "waypoint.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a blueprint against the configured actions
    Validate {
        /// Blueprint file (.json, otherwise TOML)
        blueprint: PathBuf,
    },
    /// Execute a blueprint
    Run {
        /// Blueprint file (.json, otherwise TOML)
        blueprint: PathBuf,
        /// Initial context as a JSON object
        #[arg(long, default_value = "{}")]
        context: String,
        /// Step to start from (defaults to the blueprint's start)
        #[arg(long)]
        start: Option<String>,
        /// Write the saved state at the step the run ended on
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Continue a run from a saved state file
    Resume {
        /// Saved state produced by `run --save`
        state: PathBuf,
        /// Blueprint file (.json, otherwise TOML)
        blueprint: PathBuf,
    },
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("waypoint=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Handle completions before config loading
    let command = match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "waypoint", &mut std::io::stdout());
            return Ok(());
        }
        command => command,
    };

    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match command {
        Commands::Validate { blueprint } => {
            let engine = build_engine(&config, &blueprint)?;
            println!(
                "{}: {} steps, start at {}",
                blueprint.display(),
                engine.blueprint().steps.len(),
                engine.blueprint().start
            );
        }
        Commands::Run {
            blueprint,
            context,
            start,
            save,
        } => {
            let engine = build_engine(&config, &blueprint)?;
            let value: serde_json::Value =
                serde_json::from_str(&context).context("--context is not valid JSON")?;
            let mut ctx = ExecutionContext::from_json(value)
                .ok_or_else(|| anyhow::anyhow!("--context must be a JSON object"))?;

            let start = start.unwrap_or_else(|| engine.blueprint().start.clone());
            let outcome = engine.execute_from(&mut ctx, &start).await?;
            report(&outcome, &ctx, &engine.metrics())?;

            if let Some(path) = save {
                let blob = engine.save_state(&ctx, outcome.step())?;
                std::fs::write(&path, blob)
                    .with_context(|| format!("writing {}", path.display()))?;
                info!(path = %path.display(), step = outcome.step(), "Saved execution state");
            }
        }
        Commands::Resume { state, blueprint } => {
            let engine = build_engine(&config, &blueprint)?;
            let blob = std::fs::read_to_string(&state)
                .with_context(|| format!("reading {}", state.display()))?;
            let mut saved = engine.load_state(&blob)?;

            let outcome = engine.resume(&mut saved).await?;
            report(&outcome, &saved.context, &engine.metrics())?;
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

fn build_engine(config: &AppConfig, blueprint: &Path) -> anyhow::Result<Engine> {
    let blueprint = Blueprint::load(blueprint)?;
    let actions = ActionRegistry::from_config(&config.actions);
    if actions.is_empty() {
        warn!("No actions configured; every blueprint step will fail validation");
    }
    Ok(Engine::new(blueprint, actions, config.engine.clone())?)
}

fn report(outcome: &RunOutcome, ctx: &ExecutionContext, metrics: &Metrics) -> anyhow::Result<()> {
    match outcome {
        RunOutcome::Completed { last_step } => println!("completed at {}", last_step),
        RunOutcome::Halted { step, reason } => println!("halted at {} ({:?})", step, reason),
    }

    let times: serde_json::Map<String, serde_json::Value> = metrics
        .execution_times
        .iter()
        .map(|(step, d)| (step.clone(), format!("{}ms", d.as_millis()).into()))
        .collect();
    let summary = serde_json::json!({
        "context": ctx.to_json(),
        "metrics": {
            "stepsExecuted": metrics.steps_executed,
            "errors": metrics.errors,
            "executionTimes": times,
        }
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
