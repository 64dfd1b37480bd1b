//! Command-line arguments.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use cmdtree_engine::{BasicSender, Sender, ValueType};

/// Value type of senders created from the command line.
pub const USER_TYPE: &str = "user";

/// Log verbosity level for CLI output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Only show errors
    Error,
    /// Show warnings and errors (default)
    #[default]
    Warn,
    Info,
    /// Pipeline stages and candidate trials
    Debug,
    /// Per-token conversion as well
    Trace,
}

impl LogLevel {
    /// Convert to tracing filter string.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<LogLevel> {
        match s.to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

/// Run, complete and explore commands of the demo tree.
///
/// Without a subcommand an interactive shell is started.
#[derive(Debug, Parser)]
#[command(name = "cmdtree", version, about, long_about = None)]
pub struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Command prefix, overriding the configuration file
    #[arg(long, global = true)]
    pub prefix: Option<String>,

    /// Identity the commands are run as
    #[arg(long, default_value = "console", global = true)]
    pub sender: String,

    /// Permission granted to the sender (repeatable)
    #[arg(long = "grant", value_name = "PERMISSION", global = true)]
    pub grants: Vec<String>,

    /// Set log verbosity level
    #[arg(long = "log-level", short = 'L', value_enum, default_value = "warn", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Invoke one command line, e.g. `cmdtree run /math add 2 3`
    Run {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        input: Vec<String>,
    },
    /// Print completions for a partial command line, one per line
    Complete {
        /// Partial input; quote it to keep trailing whitespace
        input: String,
    },
    /// Start the interactive shell
    Repl,
}

impl Cli {
    /// Log level from `CMDTREE_LOG_LEVEL`, falling back to `--log-level`.
    pub fn effective_log_level(&self) -> LogLevel {
        std::env::var("CMDTREE_LOG_LEVEL")
            .ok()
            .and_then(|level| LogLevel::from_str_loose(&level))
            .unwrap_or(self.log_level)
    }

    /// Filter directives: a non-empty `rust_log` is used as is, otherwise the
    /// effective level applies to every target.
    pub fn log_directives(&self, rust_log: Option<&str>) -> String {
        match rust_log.map(str::trim) {
            Some(directives) if !directives.is_empty() => directives.to_string(),
            _ => self.effective_log_level().as_filter_str().to_string(),
        }
    }

    pub fn build_sender(&self) -> Arc<dyn Sender> {
        let sender = self
            .grants
            .iter()
            .fold(BasicSender::new(&self.sender, ValueType::new(USER_TYPE)), |sender, grant| {
                sender.with_permission(grant)
            });
        Arc::new(sender)
    }
}
