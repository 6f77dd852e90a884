use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stack_orchestrator::config::Config;
use stack_orchestrator::workflow::executors::SimulatedExecutor;
use stack_orchestrator::workflow::{
    ExecutionResult, Orchestrator, PlanNode, PlanParser, WorkflowEvent,
};

#[derive(Parser)]
#[command(name = "stack-orchestrator")]
#[command(about = "Run hierarchical plans of long-running stack operations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dry-run a plan document against the simulated executor
    Run {
        /// Path to the plan JSON
        plan: PathBuf,
        /// Bound for parallel groups without MaxConcurrency
        #[arg(long)]
        max_concurrency: Option<usize>,
        /// Deadline for the whole plan, in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Stack to report as failed (repeatable)
        #[arg(long = "fail")]
        fail: Vec<String>,
        /// Simulated duration of each operation
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Print the full result tree as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },
    /// Parse and validate a plan document
    Validate {
        /// Path to the plan JSON
        plan: PathBuf,
    },
    /// Configure stack-orchestrator
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
        /// Set the default parallel bound
        #[arg(long)]
        max_concurrency: Option<usize>,
        /// Set the plan deadline in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stack_orchestrator=info".into()),
        )
        // stdout is reserved for results
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            plan,
            max_concurrency,
            timeout,
            fail,
            delay_ms,
            json,
        } => {
            let succeeded =
                run_plan(&plan, max_concurrency, timeout, fail, delay_ms, json).await?;
            if !succeeded {
                std::process::exit(1);
            }
        }
        Commands::Validate { plan } => {
            validate_plan(&plan)?;
        }
        Commands::Config {
            show,
            max_concurrency,
            timeout,
        } => {
            handle_config(show, max_concurrency, timeout)?;
        }
    }

    Ok(())
}

fn load_plan(path: &Path, default_max_concurrency: usize) -> Result<PlanNode> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read plan {}", path.display()))?;
    let plan = PlanParser::new(default_max_concurrency).parse_str(&content)?;
    Ok(plan)
}

async fn run_plan(
    path: &Path,
    max_concurrency: Option<usize>,
    timeout: Option<u64>,
    fail: Vec<String>,
    delay_ms: Option<u64>,
    json: bool,
) -> Result<bool> {
    let mut config = Config::load()?;
    if let Some(n) = max_concurrency {
        config.workflow.default_max_concurrency = n;
    }
    if let Some(secs) = timeout {
        config.workflow.execution_timeout_secs = secs;
    }
    if let Some(ms) = delay_ms {
        config.simulator.completion_delay_ms = ms;
    }
    config.simulator.fail_stacks.extend(fail);

    let plan = load_plan(path, config.workflow.default_max_concurrency)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(log_events(rx));

    let executor = SimulatedExecutor::from_config(&config.simulator);
    let orchestrator = Orchestrator::new(Arc::new(executor)).with_events(tx);

    let result = orchestrator
        .execute_with_deadline(&plan, config.workflow.execution_timeout())
        .await?;

    // Closing the channel lets the printer drain and exit
    drop(orchestrator);
    let _ = printer.await;

    print_result(&result, json)?;
    Ok(result.is_success())
}

async fn log_events(mut rx: mpsc::UnboundedReceiver<WorkflowEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            WorkflowEvent::WorkflowStarted { total_actions, .. } => {
                tracing::info!("workflow started with {} actions", total_actions);
            }
            WorkflowEvent::GroupStarted {
                path,
                kind,
                child_count,
                max_concurrency,
                ..
            } => {
                tracing::info!(
                    "{} {} group: {} children, bound {}",
                    path,
                    kind,
                    child_count,
                    max_concurrency
                );
            }
            WorkflowEvent::ActionSubmitted {
                path, stack_name, ..
            } => {
                tracing::info!("{} submitted {}", path, stack_name);
            }
            WorkflowEvent::ActionCompleted {
                path,
                stack_name,
                status,
                duration_ms,
                ..
            } => {
                tracing::info!(
                    "{} {} {} {} in {}ms",
                    path,
                    status.icon(),
                    stack_name,
                    status,
                    duration_ms
                );
            }
            WorkflowEvent::GroupCompleted {
                path, kind, status, ..
            } => {
                tracing::info!("{} {} group {}", path, kind, status);
            }
            WorkflowEvent::WorkflowCompleted { summary, .. } => {
                tracing::info!("workflow completed: {}", summary);
            }
        }
    }
}

fn print_result(result: &ExecutionResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!("{}", result.summary());
    for action in result.actions() {
        let label = action.label.as_deref().unwrap_or("-");
        match &action.error {
            Some(error) => println!("  {} {}: {}", action.status.icon(), label, error),
            None => println!("  {} {}", action.status.icon(), label),
        }
    }
    if result.actions().is_empty() {
        if let Some(error) = &result.error {
            println!("  {}", error);
        }
    }

    Ok(())
}

fn validate_plan(path: &Path) -> Result<()> {
    let config = Config::load()?;
    let plan = load_plan(path, config.workflow.default_max_concurrency)?;

    println!("✓ Plan is valid: {}", path.display());
    println!("  root:    {}", plan.kind());
    println!("  actions: {}", plan.action_count());
    println!("  depth:   {}", plan.depth());

    Ok(())
}

fn handle_config(show: bool, max_concurrency: Option<usize>, timeout: Option<u64>) -> Result<()> {
    let mut config = Config::load()?;

    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let mut changed = false;

    if let Some(n) = max_concurrency {
        config.workflow.default_max_concurrency = n.max(1);
        changed = true;
        println!("Default max concurrency updated");
    }

    if let Some(secs) = timeout {
        config.workflow.execution_timeout_secs = secs;
        changed = true;
        println!("Execution timeout updated");
    }

    if changed {
        config.save()?;
        println!("Configuration saved to: {:?}", Config::config_path()?);
    } else {
        println!("No changes made. Use --show to view current configuration.");
    }

    Ok(())
}
