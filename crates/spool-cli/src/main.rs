//! spool: run a dispatcher, enqueue tasks, or inspect a namespace.
//!
//! Connection settings come from `SPOOL_*` variables (a `.env` file is read
//! when present).

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use spool_core::config::parse_queue_names;
use spool_core::{DispatchOptions, Dispatcher, HandlerError, Task};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "spool", about = "Redis-backed background task queue")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run workers with the demo handlers (echo, sleep, fail) until Ctrl-C
    Work {
        /// Number of workers (overrides SPOOL_CONCURRENCY)
        #[arg(long)]
        concurrency: Option<usize>,
        /// Comma-separated queue names, polled in this order (overrides SPOOL_QUEUES)
        #[arg(long)]
        queues: Option<String>,
    },
    /// Push one task onto a queue
    Enqueue {
        /// Registered function name
        func: String,
        #[arg(long, default_value = "default")]
        queue: String,
        /// JSON array of arguments
        #[arg(long, default_value = "[]")]
        args: String,
    },
    /// Show known queues with their lengths and the latest error-log entries
    Status {
        /// How many error-log entries to show
        #[arg(long, default_value = "10")]
        errors: usize,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spool=info,spool_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut options = DispatchOptions::from_env().context("loading SPOOL_* configuration")?;

    match cli.command {
        Commands::Work {
            concurrency,
            queues,
        } => {
            if let Some(n) = concurrency {
                options.concurrency = n;
            }
            if let Some(raw) = queues {
                options.queues = parse_queue_names(&raw);
            }

            let mut dispatcher = Dispatcher::connect(options)
                .await
                .context("connecting to redis")?;
            register_demo_handlers(&mut dispatcher);
            dispatcher.worker().await;
            tracing::info!("worker shutdown complete");
        }
        Commands::Enqueue { func, queue, args } => {
            let args: Vec<Value> =
                serde_json::from_str(&args).context("--args must be a JSON array")?;
            let dispatcher = Dispatcher::connect(options)
                .await
                .context("connecting to redis")?;
            dispatcher
                .add_task(&Task::new(func, queue, args))
                .await
                .context("enqueueing task")?;
        }
        Commands::Status { errors, json } => {
            let dispatcher = Dispatcher::connect(options)
                .await
                .context("connecting to redis")?;
            let status = dispatcher.status(errors).await.context("reading status")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("namespace {}", status.namespace);
                for queue in &status.queues {
                    println!("  {:<24} {}", queue.name, queue.pending);
                }
                if !status.recent_errors.is_empty() {
                    println!("recent errors:");
                    for entry in &status.recent_errors {
                        println!("  {entry}");
                    }
                }
            }
        }
    }

    Ok(())
}

fn register_demo_handlers(dispatcher: &mut Dispatcher) {
    dispatcher.register_fn("echo", |args| async move {
        let args = Value::Array(args);
        tracing::info!(args = %args, "echo");
        Ok::<(), HandlerError>(())
    });

    dispatcher.register_fn("sleep", |args| async move {
        let ms = args
            .first()
            .and_then(Value::as_u64)
            .ok_or_else(|| HandlerError::new("sleep expects a millisecond count as its first arg"))?;
        tokio::time::sleep(Duration::from_millis(ms)).await;
        tracing::info!(ms, "slept");
        Ok::<(), HandlerError>(())
    });

    dispatcher.register_fn("fail", |args| async move {
        let args = Value::Array(args);
        Err::<(), HandlerError>(HandlerError::new(format!("fail called with {args}")))
    });
}
