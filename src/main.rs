//! TrialCenter - GenAI privacy pipeline
//!
//! Scores prompts with the semantic guardrail and discovers, protects or
//! redacts sensitive data before the prompt reaches a model.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trialcenter::{
    config::{Credentials, TrialCenterConfig, API_KEY_ENV, EMAIL_ENV, PASSWORD_ENV},
    pipeline::{ExecutionMode, PipelineOrchestrator, PipelineResult, StepPayload, StepStatus},
    report::write_report,
};

#[derive(Parser)]
#[command(name = "trialcenter")]
#[command(version)]
#[command(about = "GenAI privacy pipeline: guardrail, discovery, protection and redaction")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "TRIALCENTER_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline over a prompt file
    Run {
        /// Prompt file to process
        prompt_file: PathBuf,

        /// Steps to execute
        #[arg(short, long, value_enum, default_value_t = ExecutionMode::Full)]
        mode: ExecutionMode,

        /// Directory for the sanitized text and JSON report
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// Do not write any files
        #[arg(long)]
        no_write: bool,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },

    /// Run diagnostics
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("trialcenter={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Run {
            prompt_file,
            mode,
            output_dir,
            no_write,
        } => {
            let config = load_config(cli.config.as_deref())?;
            run_pipeline(config, &prompt_file, mode, &output_dir, no_write).await?;
        }
        Commands::Config { default } => {
            let config = if default {
                TrialCenterConfig::default()
            } else {
                load_config(cli.config.as_deref())?
            };
            show_config(&config)?;
        }
        Commands::Doctor => {
            run_doctor(cli.config.as_deref());
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<TrialCenterConfig> {
    match path {
        Some(path) => TrialCenterConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(TrialCenterConfig::default()),
    }
}

async fn run_pipeline(
    config: TrialCenterConfig,
    prompt_file: &Path,
    mode: ExecutionMode,
    output_dir: &Path,
    no_write: bool,
) -> Result<()> {
    let prompt = tokio::fs::read_to_string(prompt_file)
        .await
        .with_context(|| format!("Failed to read prompt file {}", prompt_file.display()))?;

    let credentials = Credentials::from_env();
    let orchestrator = PipelineOrchestrator::from_config(&config, credentials)?;

    println!("{}", mode);
    println!();
    let result = orchestrator.run(mode, &prompt).await;
    print_summary(&result, config.guardrail.rejection_threshold);

    if !no_write {
        let stem = prompt_file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("prompt");
        let paths = write_report(&result, output_dir, stem).await?;
        println!();
        if let Some(sanitized) = &paths.sanitized {
            println!("Sanitized text: {}", sanitized.display());
        }
        println!("Report: {}", paths.report.display());
    }

    if !result.is_success() {
        anyhow::bail!("pipeline finished with failed steps");
    }
    Ok(())
}

fn print_summary(result: &PipelineResult, rejection_threshold: f64) {
    for step in &result.steps {
        println!(
            "Step {} · {}: {}",
            step.step_number, step.step_name, step.status
        );

        match step.status {
            StepStatus::Success => match &step.payload {
                Some(StepPayload::Guardrail(score)) => {
                    let verdict = if score.is_rejected(rejection_threshold) {
                        "rejected"
                    } else {
                        "accepted"
                    };
                    println!(
                        "  outcome {} · score {:.2} · {}",
                        score.outcome, score.score, verdict
                    );
                    if let Some(explanation) = &score.explanation {
                        println!("  {}", explanation);
                    }
                }
                Some(StepPayload::Entities(entities)) => {
                    println!("  {} entities", entities.len());
                    for entity in entities {
                        println!(
                            "  - {} ({}) {:.2}",
                            entity.label, entity.entity_type, entity.confidence
                        );
                    }
                }
                Some(StepPayload::Text(text)) => {
                    for line in text.lines() {
                        println!("  | {}", line);
                    }
                }
                None => {}
            },
            StepStatus::Failed | StepStatus::Skipped => {
                if let Some(error) = &step.error {
                    println!("  {}: {}", error.kind, error.message);
                    if let Some(hint) = &error.hint {
                        println!("  hint: {}", hint);
                    }
                }
            }
        }
    }
}

fn run_doctor(config_path: Option<&Path>) {
    println!("TrialCenter Doctor");
    println!();

    println!("Checking configuration...");
    let config = match config_path {
        Some(path) => match TrialCenterConfig::load(path) {
            Ok(config) => {
                println!("  ✓ Configuration valid: {}", path.display());
                config
            }
            Err(e) => {
                println!("  ✗ {}", e);
                if let Some(hint) = e.hint() {
                    println!("    hint: {}", hint);
                }
                return;
            }
        },
        None => {
            println!("  ℹ No configuration file given (using defaults)");
            TrialCenterConfig::default()
        }
    };

    println!();
    println!("Checking credentials...");
    for var in [EMAIL_ENV, PASSWORD_ENV, API_KEY_ENV] {
        let present = std::env::var(var)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);
        println!("  {} {}", if present { "✓" } else { "✗" }, var);
    }
    if Credentials::from_env().is_none() {
        println!("  ℹ Protect and unprotect steps are disabled");
    }

    println!();
    println!("Endpoints:");
    println!("  guardrail:  {}", config.guardrail.url);
    println!("  discovery:  {}", config.discovery.url);
    println!("  protection: {}", config.protection.url);

    println!();
    println!("Doctor check complete!");
}

fn show_config(config: &TrialCenterConfig) -> Result<()> {
    let toml = toml::to_string_pretty(config)?;
    println!("{}", toml);
    Ok(())
}
