//! Binary entry point for the ngrename CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Rename a symbol (applies changes by default)
//! ngrename rename --at src/app/foo.component.ts:8:14 --to BarComponent
//!
//! # Preview without writing (unified diff)
//! ngrename rename --at src/app/foo.component.html:2:8 --to heading --dry-run
//!
//! # List references as JSON
//! ngrename refs --at src/app/foo.component.ts:10:3
//! ```

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use ngrename::angular::{ConfirmationHandler, ConfirmationReason};
use ngrename::cli::{
    format_rename_text, run_refs, run_rename, PromptConfirmation, RenameRequest, Workspace,
};
use ngrename::error::CliError;
use ngrename::output::{emit_response, ErrorResponse};

// ============================================================================
// CLI Structure
// ============================================================================

/// Cross-file symbol rename for Angular-style projects.
#[derive(Parser, Debug)]
#[command(name = "ngrename", version, about = "Cross-file symbol rename for Angular projects")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Workspace root directory (default: current directory).
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Configuration file (default: .ngrename.toml in the workspace).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Log line format on stderr.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,
}

/// Log line format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Output format for the rename command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum RenameFormat {
    /// Human-readable summary (default).
    #[default]
    Text,
    /// Full JSON response.
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rename a symbol across the workspace (apply-by-default).
    Rename {
        /// Location of the symbol to rename (path:line:col).
        #[arg(long)]
        at: String,
        /// New name for the symbol.
        #[arg(long)]
        to: String,
        /// Leave occurrences in comments and string literals alone.
        #[arg(long)]
        no_search_text: bool,
        /// Preview changes without writing files.
        #[arg(long)]
        dry_run: bool,
        /// Confirm file moves and naming-convention warnings without asking.
        #[arg(long)]
        yes: bool,
        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: RenameFormat,
    },
    /// List every reference of a symbol as JSON.
    Refs {
        /// Location of the symbol (path:line:col).
        #[arg(long)]
        at: String,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_format);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let response = ErrorResponse::from_error(&err);
            // Errors go to stdout as JSON, like every other response.
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();
            ExitCode::from(err.error_code().code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, format: LogFormat) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn execute(cli: Cli) -> Result<(), CliError> {
    let root = match &cli.global.workspace {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };
    let workspace = Workspace::open(&root, cli.global.config.as_deref())?;

    match cli.command {
        Command::Rename {
            at,
            to,
            no_search_text,
            dry_run,
            yes,
            format,
        } => {
            let request = RenameRequest {
                at: &at,
                to: &to,
                search: no_search_text.then_some(false),
                dry_run,
            };
            let mut confirm = confirmation(yes);
            let response = run_rename(&workspace, &request, confirm.as_mut())?;
            match format {
                RenameFormat::Json => emit_response(&response, &mut io::stdout())?,
                RenameFormat::Text => print!("{}", format_rename_text(&response)),
            }
        }
        Command::Refs { at } => {
            let response = run_refs(&workspace, &at)?;
            emit_response(&response, &mut io::stdout())?;
        }
    }
    Ok(())
}

/// `--yes` confirms everything; otherwise ask on an interactive terminal and
/// decline when there is nobody to ask.
fn confirmation(yes: bool) -> Box<dyn ConfirmationHandler> {
    if yes {
        Box::new(|_: &ConfirmationReason| true)
    } else if io::stdin().is_terminal() {
        Box::new(PromptConfirmation::new(io::stdin().lock(), io::stderr()))
    } else {
        Box::new(|_: &ConfirmationReason| false)
    }
}
