//! dirqueue CLI - persistent filesystem work queue

mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dirqueue_core::application::{
    stop_channel, ClearConfirmation, ClearOutcome, QueueService, RecoveryTarget,
};
use dirqueue_core::domain::ItemId;
use dirqueue_core::port::time_provider::SystemTimeProvider;
use dirqueue_core::AppError;
use dirqueue_infra_fs::FsItemStore;
use dirqueue_infra_system::ShellCommandAction;

use crate::config::Settings;
use crate::output::ConsoleObserver;

#[derive(Parser)]
#[command(name = "dirqueue")]
#[command(about = "Persistent filesystem work queue", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Queue root directory (default: ~/.dirqueue)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the queue directories
    Init,

    /// Copy a file into the queue
    Push {
        /// File to enqueue (left untouched)
        file: PathBuf,
    },

    /// Claim the next item and move it to processing
    Pop,

    /// Show the next item without claiming it
    Peek,

    /// Count items per state
    Count {
        #[arg(long)]
        json: bool,
    },

    /// List items per state
    List {
        #[arg(long)]
        json: bool,
    },

    /// Remove every item in every state
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Run a command on each pending item until the queue is empty
    Process {
        /// Shell command; the item path is appended as its last argument
        command: String,

        /// Kill the command after this many seconds and mark the item failed
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Mark a claimed item as done
    Done {
        /// Item id as printed by `pop`
        id: String,
    },

    /// Mark a claimed item as failed
    Fail {
        /// Item id as printed by `pop`
        id: String,
    },

    /// Move items stuck in processing after a crash
    Recover {
        #[arg(long, value_enum, default_value_t = RecoverTo::Pending)]
        to: RecoverTo,
    },

    /// Move every failed item back to the queue
    RequeueFailed,
}

#[derive(Clone, Copy, ValueEnum)]
enum RecoverTo {
    Pending,
    Failed,
}

impl From<RecoverTo> for RecoveryTarget {
    fn from(value: RecoverTo) -> Self {
        match value {
            RecoverTo::Pending => RecoveryTarget::Pending,
            RecoverTo::Failed => RecoveryTarget::Failed,
        }
    }
}

fn init_logging(format: &str, verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    // stderr so stdout stays parseable
    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn parse_id(raw: &str) -> Result<ItemId> {
    ItemId::parse(raw).with_context(|| format!("Invalid item id '{}'", raw))
}

fn prompt_clear() -> Result<ClearConfirmation> {
    print!("Are you sure you want to clear all queues? [y/N] ");
    std::io::stdout().flush()?;
    let mut reply = String::new();
    std::io::stdin().lock().read_line(&mut reply)?;
    Ok(ClearConfirmation::from_reply(&reply))
}

fn queue_empty() -> ExitCode {
    println!("Queue is empty");
    ExitCode::from(1)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // 1. Configuration, then logging
    let settings = Settings::load(cli.config.as_deref(), cli.root.as_deref())?;
    init_logging(&settings.log_format, cli.verbose);

    let queue_config = settings.queue_config();
    debug!(root = %queue_config.root().display(), "Using queue root");

    // 2. DI wiring
    let time_provider = Arc::new(SystemTimeProvider);
    let store = Arc::new(FsItemStore::new(&queue_config));
    let service = QueueService::new(store, time_provider.clone());

    match cli.command {
        Commands::Init => {
            service.init().await?;
            println!("Queue initialized in {}", queue_config.root().display());
        }

        Commands::Push { file } => {
            let id = match service.enqueue(&file).await {
                Ok(id) => id,
                Err(e @ (AppError::SourceNotFound(_) | AppError::Domain(_))) => {
                    eprintln!("{} {}", "Error:".red(), e);
                    return Ok(ExitCode::from(1));
                }
                Err(e) => return Err(e).context("Failed to push"),
            };
            for line in output::push_lines(&id) {
                println!("{line}");
            }
            info!(item_id = %id, "Item pushed");
        }

        Commands::Pop => match service.pop().await {
            Ok(item) => println!("{}", item.id),
            Err(AppError::QueueEmpty) => return Ok(queue_empty()),
            Err(e) => return Err(e).context("Failed to pop"),
        },

        Commands::Peek => match service.peek_next().await? {
            Some(item) => println!("{}", item.id),
            None => return Ok(queue_empty()),
        },

        Commands::Count { json } => {
            let counts = service.counts().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&counts)?);
            } else {
                for line in output::count_lines(&counts) {
                    println!("{}", line);
                }
            }
        }

        Commands::List { json } => {
            let listing = service.list_all().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                output::print_listing(&listing);
            }
        }

        Commands::Clear { yes } => {
            let confirmation = if yes {
                ClearConfirmation::Confirmed
            } else {
                prompt_clear()?
            };
            match service.clear(confirmation).await? {
                ClearOutcome::Cleared { removed } => {
                    println!("All queues cleared");
                    debug!(removed, "Clear complete");
                }
                ClearOutcome::Aborted => {}
            }
        }

        Commands::Process { command, timeout } => {
            let limit = timeout.map(Duration::from_secs).or(settings.action_timeout());
            let action = Arc::new(ShellCommandAction::new(command, time_provider, limit));
            let processing = service
                .processing_loop(action)
                .with_observer(Arc::new(ConsoleObserver));

            // Ctrl-C finishes the current item, then stops
            let (stop_handle, stop_token) = stop_channel();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, stopping after current item");
                    stop_handle.stop();
                }
            });

            let summary = processing.run(stop_token).await?;
            info!(
                processed = summary.processed,
                succeeded = summary.succeeded,
                failed = summary.failed,
                stopped = summary.stopped,
                "Processing finished"
            );
        }

        Commands::Done { id } => {
            let item = service.complete_success(&parse_id(&id)?).await?;
            println!("{} {}", "Success:".green(), item.id);
        }

        Commands::Fail { id } => {
            let item = service.complete_failure(&parse_id(&id)?).await?;
            println!("{} {}", "Failed:".red(), item.id);
        }

        Commands::Recover { to } => {
            let moved = service.recover_processing(to.into()).await?;
            let label = match to {
                RecoverTo::Pending => "queue",
                RecoverTo::Failed => "failed",
            };
            println!("Recovered {} item(s) to {}", moved.len(), label);
        }

        Commands::RequeueFailed => {
            let moved = service.requeue_failed().await?;
            println!("Requeued {} failed item(s)", moved.len());
        }
    }

    Ok(ExitCode::SUCCESS)
}
