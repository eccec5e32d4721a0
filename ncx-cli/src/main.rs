// ncx-cli/src/main.rs
mod report;

use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use ncx_core::{
    CapturedRun, Interpreter, OpenAiInterpreter, ProxyConfig, ProxyError, ResolvedBinary, Resolver,
    Transcript, proxy, transcript,
};

use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, time::LocalTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const APP_DIR_NAME: &str = "ncx";
const LOG_FILE_NAME: &str = "ncx.log";
const LOG_ENV_VAR: &str = "NCX_LOG";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Loads `<config_dir>/ncx/.env` without overriding variables already set.
///
/// The working directory's `.env` is never read, so a directory cannot
/// redirect `NC_REAL`.
fn load_dotenv() -> Result<Option<PathBuf>> {
    let Some(path) = dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(".env")) else {
        return Ok(None);
    };
    if !path.is_file() {
        return Ok(None);
    }
    dotenvy::from_path(&path).with_context(|| format!("Failed to load {}", path.display()))?;
    Ok(Some(path))
}

/// File-only logging. stderr belongs to the wrapped tool, so nothing is logged there.
fn init_logging() -> Result<(WorkerGuard, PathBuf)> {
    let log_dir = dirs::cache_dir()
        .or_else(dirs::runtime_dir)
        .unwrap_or_else(env::temp_dir)
        .join(APP_DIR_NAME);
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let env_filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_NAME)
        .build(&log_dir)
        .with_context(|| format!("Failed to open log file in {}", log_dir.display()))?;
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let time_format_desc = time::format_description::parse(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]",
    )
    .map_err(|e| anyhow!("Failed to parse log time format: {}", e))?;

    let file_layer = fmt::layer()
        .with_writer(non_blocking_writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_timer(LocalTime::new(time_format_desc));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok((guard, log_dir.join(LOG_FILE_NAME)))
}

/// Runs the child off the async runtime and waits for it.
async fn run_child(binary: ResolvedBinary, args: Vec<OsString>) -> Result<CapturedRun, ProxyError> {
    match tokio::task::spawn_blocking(move || proxy::run(&binary, &args)).await {
        Ok(result) => result,
        Err(join_error) => std::panic::resume_unwind(join_error.into_panic()),
    }
}

async fn explain_with_spinner(interpreter: &dyn Interpreter, transcript: &Transcript) -> Result<String> {
    let pb = ProgressBar::new_spinner();
    if !io::stderr().is_terminal() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")?
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "-"]),
    );
    pb.set_message("Asking for an explanation...");
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = interpreter.explain(transcript).await;

    pb.finish_and_clear();
    result
}

// No SIGINT handler is installed anywhere in this binary. Ctrl-C while the
// child runs keeps its default action and ends ncx before any explanation.
#[tokio::main]
async fn main() -> ExitCode {
    let dotenv_result = load_dotenv();

    // Logging is best effort: it must never change the proxied exit code.
    let _guard = match init_logging() {
        Ok((guard, log_path)) => {
            debug!(path = %log_path.display(), "Logging initialized");
            Some(guard)
        }
        Err(_) => None,
    };
    match dotenv_result {
        Ok(Some(path)) => debug!(path = %path.display(), "Loaded environment file"),
        Ok(None) => {}
        Err(e) => warn!("{:#}", e),
    }

    let args: Vec<OsString> = env::args_os().skip(1).collect();
    let config = ProxyConfig::from_env();

    let resolver = Resolver::new(config.override_path.clone());
    let binary = match resolver.resolve() {
        Ok(binary) => binary,
        Err(e) => {
            error!(error = %e, "Could not resolve the real binary");
            let _ = report::print_proxy_failure(&mut io::stderr(), &e, resolver.override_var());
            return ExitCode::from(e.exit_code());
        }
    };

    let command_line = transcript::command_line(&binary, &args);
    info!(command = %command_line, "Proxying invocation");

    let run = match run_child(binary, args).await {
        Ok(run) => run,
        Err(e) => {
            error!(error = %e, "Could not run the real binary");
            let _ = report::print_proxy_failure(&mut io::stderr(), &e, resolver.override_var());
            return ExitCode::from(e.exit_code());
        }
    };

    report::echo_captured(&run);

    let transcript = Transcript::assemble(command_line, &run);
    let interpreter = OpenAiInterpreter::new(config.backend);
    match explain_with_spinner(&interpreter, &transcript).await {
        Ok(explanation) => {
            let render_markdown = io::stdout().is_terminal();
            if let Err(e) = report::print_explanation(
                &mut io::stdout().lock(),
                interpreter.name(),
                &explanation,
                render_markdown,
            ) {
                warn!(error = %e, "Failed to print explanation");
            }
        }
        Err(e) => {
            warn!("AI explanation failed: {:#}", e);
            let _ = report::print_explanation_failure(&mut io::stderr(), &e);
        }
    }

    info!(exit_code = run.exit_code, "Exiting with child status");
    ExitCode::from(report::child_exit_status(&run))
}
