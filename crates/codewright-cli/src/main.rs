//! Thin CLI driver: build an [`Agent`] from flags and/or a TOML config file,
//! run the given task (or an interactive loop), print the outcome.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use codewright_agent::config::ModelProviderConfig;
use codewright_agent::{Agent, AgentConfig, TaskOptions, Verdict};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codewright", about = "Autonomous code-editing agent", version)]
struct Cli {
    /// Workspace directory the agent is allowed to edit.
    #[arg(long, short = 'w')]
    workspace: Option<PathBuf>,

    /// TOML configuration file. Flags override file values.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Single fixed model for every call (disables multi-model routing).
    #[arg(long, conflicts_with_all = ["simple_model", "complex_model"])]
    model: Option<String>,

    /// Model for simple tool turns (default: gpt-4o-mini).
    #[arg(long)]
    simple_model: Option<String>,

    /// Model for planning, validation, and complex turns (default: gpt-4o).
    #[arg(long)]
    complex_model: Option<String>,

    /// Enable planning, validation, and complexity-based routing.
    #[arg(long)]
    multi_model: bool,

    /// Per-task LLM-call budget (1-1000).
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Append the full session log to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Suppress progress output.
    #[arg(long, short = 'q')]
    quiet: bool,

    /// Skip the planning phase for this run.
    #[arg(long)]
    skip_planning: bool,

    /// Skip the validation phase for this run.
    #[arg(long)]
    skip_validation: bool,

    /// The task to execute. Without one, an interactive loop starts.
    task: Vec<String>,
}

fn build_config(cli: &Cli) -> Result<AgentConfig> {
    let mut builder = match &cli.config {
        Some(path) => AgentConfig::from_file(path)?,
        None => AgentConfig::builder(),
    };

    if let Some(workspace) = &cli.workspace {
        builder = builder.workspace(workspace);
    } else if cli.config.is_none() {
        builder = builder.workspace(".");
    }

    if let Some(model) = &cli.model {
        builder = builder.provider(ModelProviderConfig::single(model));
    } else if cli.simple_model.is_some() || cli.complex_model.is_some() {
        builder = builder.provider(ModelProviderConfig::from_model_names(
            cli.simple_model.as_deref().unwrap_or("gpt-4o-mini"),
            cli.complex_model.as_deref().unwrap_or("gpt-4o"),
        ));
    } else if cli.config.is_none() {
        builder = builder.provider(ModelProviderConfig::from_model_names("gpt-4o-mini", "gpt-4o"));
    }

    if cli.multi_model {
        builder = builder.use_multi_model(true);
    }
    if let Some(n) = cli.max_iterations {
        builder = builder.max_iterations(n);
    }
    if let Some(path) = &cli.log_file {
        builder = builder.log_file(path);
    }
    if cli.quiet {
        builder = builder.verbose(false);
    }

    Ok(builder.build()?)
}

fn print_outcome(outcome: &codewright_agent::TaskOutcome) {
    println!("\n{}", outcome.response);
    if let Some(validation) = &outcome.validation {
        let verdict = match validation.verdict {
            Verdict::Passed => "passed",
            Verdict::Failed => "failed",
            Verdict::Partial => "partial",
        };
        println!("\n── validation: {verdict} ──\n{}", validation.reasoning);
    }
    if let Some(review) = &outcome.git_review {
        println!("\n{review}");
    }
    eprintln!(
        "\n[{} | {} iterations | {} actions | {} tokens]",
        if outcome.success { "ok" } else { "incomplete" },
        outcome.iterations,
        outcome.actions_count,
        outcome.usage.total_tokens
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(if cli.quiet { "warn" } else { "info" })
        }))
        .with_target(false)
        .init();

    let config = build_config(&cli)?;
    let mut agent = Agent::new(config).context("failed to construct the agent")?;

    let opts = TaskOptions {
        skip_planning: cli.skip_planning,
        skip_validation: cli.skip_validation,
        ..TaskOptions::default()
    };

    let task = cli.task.join(" ");
    if !task.trim().is_empty() {
        let outcome = agent.execute_task(&task, opts).await;
        let success = outcome.success;
        print_outcome(&outcome);
        agent.shutdown();
        if !success {
            bail!("task did not complete");
        }
        return Ok(());
    }

    // Interactive loop: one task per line until exit.
    let stdin = std::io::stdin();
    loop {
        print!("task> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit" | "q") {
            break;
        }
        let outcome = agent.execute_task(line, opts.clone()).await;
        print_outcome(&outcome);
    }
    agent.shutdown();
    Ok(())
}
