use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio::time::{Duration, sleep};
use tracing::info;
use tracing_subscriber::EnvFilter;

use errand_core::impls::ManualLifecycle;
use errand_core::queue::FailureRecord;
use errand_core::{
    ActionError, AppState, ConfigPatch, Priority, SchedulerBuilder, SchedulerConfig, TaskAction,
    TaskDescriptor, TaskId, TaskKind, TaskStats,
};

#[derive(Debug, Parser)]
#[command(name = "errand", version, about = "Background task scheduler demo")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a simulated workload and print the final stats as JSON.
    Demo(DemoArgs),

    /// Print the effective scheduler config as JSON.
    Config {
        /// JSON file with config overrides.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
struct DemoArgs {
    /// JSON file with config overrides.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of tasks to enqueue.
    #[arg(long, default_value_t = 12)]
    tasks: usize,

    /// Every N-th task fails once before succeeding (0 disables).
    #[arg(long, default_value_t = 4)]
    fail_every: usize,

    /// Simulated work per attempt.
    #[arg(long, default_value_t = 50)]
    work_ms: u64,

    /// Send the app to the background after this long.
    #[arg(long, default_value_t = 300)]
    background_after_ms: u64,

    /// Bring it back to the foreground after this long.
    #[arg(long, default_value_t = 800)]
    foreground_after_ms: u64,

    /// Total run time before printing the summary.
    #[arg(long, default_value_t = 3_000)]
    run_ms: u64,
}

/// Simulated job: sleeps, then fails `remaining_failures` times before succeeding.
struct FlakyJob {
    name: String,
    work: Duration,
    remaining_failures: AtomicU32,
}

impl FlakyJob {
    fn new(name: impl Into<String>, work: Duration, failures: u32) -> Self {
        Self {
            name: name.into(),
            work,
            remaining_failures: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl TaskAction for FlakyJob {
    async fn run(&self) -> Result<(), ActionError> {
        sleep(self.work).await;

        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(ActionError::new(format!("simulated outage (left={left})")));
        }

        info!(job = %self.name, "job done");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    stats: TaskStats,
    failures: Vec<FailureRecord>,
}

const PRIORITIES: [Priority; 4] = [
    Priority::Normal,
    Priority::Low,
    Priority::High,
    Priority::Critical,
];

fn demo_defaults() -> SchedulerConfig {
    SchedulerConfig {
        retry_delay_ms: 200,
        batch_timeout_ms: 100,
        ..SchedulerConfig::default()
    }
}

fn load_overrides(path: Option<&Path>) -> Result<ConfigPatch> {
    let Some(path) = path else {
        return Ok(ConfigPatch::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

async fn run_demo(args: DemoArgs) -> Result<()> {
    let overrides = load_overrides(args.config.as_deref())?;
    let lifecycle = ManualLifecycle::default();
    let scheduler = SchedulerBuilder::new()
        .config(demo_defaults())
        .overrides(overrides)
        .lifecycle(&lifecycle)
        .build()
        .context("building scheduler")?;

    let work = Duration::from_millis(args.work_ms);
    for n in 0..args.tasks {
        let kind = TaskKind::ALL[n % TaskKind::ALL.len()];
        let priority = PRIORITIES[(n / TaskKind::ALL.len()) % PRIORITIES.len()];
        let failures = u32::from(args.fail_every > 0 && (n + 1) % args.fail_every == 0);

        let id = TaskId::new(format!("{kind}-{n}"))?;
        let job = FlakyJob::new(id.as_str(), work, failures);
        let descriptor = TaskDescriptor::new(id, kind, Arc::new(job)).priority(priority);
        scheduler.add_task(descriptor).await?;
    }
    info!(tasks = args.tasks, "workload enqueued");

    let background_at = Duration::from_millis(args.background_after_ms);
    let foreground_at = Duration::from_millis(args.foreground_after_ms.max(args.background_after_ms));
    let run_for = Duration::from_millis(args.run_ms.max(args.foreground_after_ms));

    sleep(background_at).await;
    lifecycle.set_state(AppState::Background);
    sleep(foreground_at - background_at).await;
    lifecycle.set_state(AppState::Active);
    sleep(run_for - foreground_at).await;

    let summary = Summary {
        stats: scheduler.task_stats().await,
        failures: scheduler.recent_failures().await,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    scheduler.cleanup().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Demo(args) => run_demo(args).await,
        Command::Config { config } => {
            let overrides = load_overrides(config.as_deref())?;
            let effective = demo_defaults().merged(&overrides)?;
            println!("{}", serde_json::to_string_pretty(&effective)?);
            Ok(())
        }
    }
}
