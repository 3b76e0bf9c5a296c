//! Command-line entry points: `run`, `history`, and `watch`.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use flowrelay_core::{ExecutionRecord, RunStatus};
use flowrelay_telemetry::{
    GlobalContextGuard, LogFormat, LoggingConfig, init_logging, log_format_from_env,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::bootstrap::{AppEnv, Services, build_services};
use crate::error::AppError;

const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Parser)]
#[command(name = "flowrelay", about = "Relay message attachments into storage destinations")]
struct Cli {
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormatArg>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute one run of a flow and print its record.
    Run(RunArgs),
    /// Print recent records of a flow, newest first.
    History(HistoryArgs),
    /// Run every enabled flow on the poll interval until interrupted.
    Watch,
}

#[derive(Args)]
struct RunArgs {
    #[arg(long)]
    flow: Uuid,
}

#[derive(Args)]
struct HistoryArgs {
    #[arg(long)]
    flow: Uuid,
    #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
    limit: usize,
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
enum LogFormatArg {
    Json,
    Pretty,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Json => Self::Json,
            LogFormatArg::Pretty => Self::Pretty,
        }
    }
}

#[derive(Debug)]
enum CliError {
    RunFailed,
    Failure(anyhow::Error),
}

impl CliError {
    fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    const fn exit_code(&self) -> i32 {
        match self {
            Self::RunFailed => 1,
            Self::Failure(_) => 3,
        }
    }
}

type CliResult<T> = Result<T, CliError>;

/// Parse arguments, execute the command, and return the process exit code.
///
/// A failed run exits with 1; configuration or infrastructure errors with 3.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let format = match cli.log_format {
        Some(arg) => LogFormat::from(arg),
        None => match log_format_from_env() {
            Ok(format) => format.unwrap_or_else(LogFormat::infer),
            Err(err) => {
                return report(&CliError::failure(AppError::telemetry("telemetry.log_format", err)));
            }
        },
    };
    let logging = LoggingConfig {
        format,
        ..LoggingConfig::default()
    };
    if let Err(err) = init_logging(&logging) {
        return report(&CliError::failure(AppError::telemetry("telemetry.init", err)));
    }
    let _context = GlobalContextGuard::new(command_label(&cli.command));

    match dispatch(cli.command).await {
        Ok(()) => 0,
        Err(err) => report(&err),
    }
}

fn report(err: &CliError) -> i32 {
    if let CliError::Failure(cause) = err {
        eprintln!("error: {cause:#}");
    }
    err.exit_code()
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Run(_) => "run",
        Command::History(_) => "history",
        Command::Watch => "watch",
    }
}

async fn dispatch(command: Command) -> CliResult<()> {
    let env = AppEnv::from_env()
        .context("failed to read environment")
        .map_err(CliError::failure)?;
    let services = build_services(&env)
        .await
        .context("failed to initialise services")
        .map_err(CliError::failure)?;

    match command {
        Command::Run(args) => handle_run(&services, args).await,
        Command::History(args) => handle_history(&services, args).await,
        Command::Watch => {
            handle_watch(&services).await;
            Ok(())
        }
    }
}

async fn handle_run(services: &Services, args: RunArgs) -> CliResult<()> {
    let cancel = CancellationToken::new();
    let _interrupt = cancel_on_interrupt(cancel.clone());
    let record = services
        .engine
        .spawn_with_token(args.flow, cancel)
        .join()
        .await
        .map_err(|source| AppError::Engine {
            operation: "run.join",
            source,
        })
        .map_err(CliError::failure)?;
    print_json(&record)?;
    if record.status == RunStatus::Completed {
        Ok(())
    } else {
        Err(CliError::RunFailed)
    }
}

async fn handle_history(services: &Services, args: HistoryArgs) -> CliResult<()> {
    let records: Vec<ExecutionRecord> = services
        .store
        .list_by_flow(args.flow, args.limit)
        .await
        .map_err(|err| AppError::store("execution_store.list_by_flow", err))
        .map_err(CliError::failure)?;
    print_json(&records)
}

async fn handle_watch(services: &Services) {
    let shutdown = CancellationToken::new();
    let _interrupt = cancel_on_interrupt(shutdown.clone());
    info!("watching flows; press Ctrl-C to stop");
    services.scheduler().run(shutdown).await;
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::output("print_json", err))
        .map_err(CliError::failure)?;
    println!("{rendered}");
    Ok(())
}

/// Cancel `token` on the first Ctrl-C; the returned guard stops listening when dropped.
fn cancel_on_interrupt(token: CancellationToken) -> tokio_util::sync::DropGuard {
    let listener = CancellationToken::new();
    let guard = listener.clone().drop_guard();
    tokio::spawn(async move {
        tokio::select! {
            () = listener.cancelled() => {}
            signal = tokio::signal::ctrl_c() => {
                match signal {
                    Ok(()) => {
                        info!("interrupt received; cancelling");
                        token.cancel();
                    }
                    Err(err) => warn!(error = %err, "failed to listen for interrupt"),
                }
            }
        }
    });
    guard
}
