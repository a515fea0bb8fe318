use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings, Settings, DEFAULT_CONFIG_FILE},
    AnalysisOutcome, Controller, HttpClassifier,
};
use dataset::source_from_location;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod render;

use render::TerminalPresenter;

#[derive(Parser, Debug)]
#[command(name = "review-sentiment", about = "Classify random reviews from a TSV dataset")]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Dataset file path or http(s) URL
    #[arg(long)]
    dataset: Option<String>,
    #[arg(long)]
    endpoint: Option<String>,
    /// Bearer token for the classification API
    #[arg(long)]
    token: Option<String>,
    /// Seed for reproducible review selection
    #[arg(long)]
    seed: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the dataset and report how many reviews are usable
    Load,
    /// Load the dataset and analyze random reviews
    Analyze {
        #[arg(long, default_value_t = 1)]
        times: usize,
    },
    /// Prompt loop: Enter/a analyze, r reload, t <token> set token, q quit
    Interactive,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let settings = resolve_settings(&cli);
    settings.validate()?;

    let mut controller = Controller::new(
        source_from_location(&settings.dataset),
        Arc::new(HttpClassifier::new(settings.classifier_url.clone())),
    )
    .with_presenter(Box::new(TerminalPresenter));
    if let Some(seed) = cli.seed {
        controller = controller.with_seed(seed);
    }

    match cli.command {
        Command::Load => {
            load_dataset(&mut controller).await?;
        }
        Command::Analyze { times } => {
            load_dataset(&mut controller).await?;
            let mut failures = 0;
            for _ in 0..times {
                if let AnalysisOutcome::Failed(_) = controller.analyze(settings.token()).await {
                    failures += 1;
                }
            }
            if failures > 0 {
                bail!("{failures} of {times} analyses failed");
            }
        }
        Command::Interactive => run_interactive(&mut controller, settings.token()).await?,
    }

    Ok(())
}

/// The presenter has already printed the failure; the returned error only
/// sets the exit status.
async fn load_dataset(controller: &mut Controller) -> Result<usize> {
    match controller.load().await {
        Ok(count) => Ok(count),
        Err(_) => bail!("dataset load failed"),
    }
}

fn resolve_settings(cli: &Cli) -> Settings {
    let mut settings = load_settings(&cli.config);
    if let Some(v) = &cli.dataset {
        settings.dataset = v.clone();
    }
    if let Some(v) = &cli.endpoint {
        settings.classifier_url = v.clone();
    }
    if let Some(v) = &cli.token {
        settings.api_token = Some(v.clone());
    }
    settings
}

#[derive(Debug, PartialEq, Eq)]
enum Action {
    Analyze,
    Reload,
    SetToken(Option<String>),
    Quit,
    Help,
}

fn parse_action(line: &str) -> Action {
    let line = line.trim();
    match line {
        "" | "a" | "analyze" => Action::Analyze,
        "r" | "reload" => Action::Reload,
        "q" | "quit" | "exit" => Action::Quit,
        _ => match line.strip_prefix("t ").or(line.strip_prefix("token ")) {
            Some(token) => Action::SetToken(Some(token.trim().to_string())),
            None if line == "t" || line == "token" => Action::SetToken(None),
            None => Action::Help,
        },
    }
}

async fn run_interactive(controller: &mut Controller, initial_token: Option<&str>) -> Result<()> {
    let mut token = initial_token.map(str::to_string);
    // Failures are rendered; the prompt stays usable.
    let _ = controller.load().await;
    println!("Enter: analyze | r: reload | t <token>: set token | q: quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_action(&line) {
            Action::Analyze => {
                controller.analyze(token.as_deref()).await;
            }
            Action::Reload => {
                let _ = controller.load().await;
            }
            Action::SetToken(next) => {
                info!(set = next.is_some(), "cli: token updated");
                token = next;
            }
            Action::Quit => break,
            Action::Help => {
                println!("Enter: analyze | r: reload | t <token>: set token | q: quit");
            }
        }
    }
    Ok(())
}
