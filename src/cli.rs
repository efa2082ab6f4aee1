//! Command-line interface.
//!
//! One-shot subcommands for each alert action plus a `top`-like `watch` view.

use alertwatch::config::Config;
use alertwatch::export::ExportFormat;
use alertwatch::models::{Alert, AlertId, Direction, UserId};
use alertwatch::validator::AlertForm;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// A terminal client for managing and watching stock price alerts.
///
/// Alerts fire when a ticker's price crosses a limit in a given direction.
/// Fired alerts stay dormant until you reset them.
#[derive(Parser, Debug, Clone)]
#[command(name = "alertwatch")]
#[command(version)]
#[command(about = "A terminal client for managing stock price alerts", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "ALERTWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the alerts REST API
    #[arg(long, env = "ALERTWATCH_API_URL", global = true)]
    pub api_url: Option<String>,

    /// User whose alerts to manage
    #[arg(short = 'u', long, env = "ALERTWATCH_USER", global = true)]
    pub user: Option<i64>,

    /// API timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Verbose logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List your alerts
    List {
        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a single alert
    Show {
        /// Alert id
        id: AlertId,
    },

    /// Create a new alert
    Create {
        /// Ticker symbol, e.g. AAPL
        #[arg(short = 't', long)]
        ticker: String,

        /// Limit price
        #[arg(short = 'p', long, allow_hyphen_values = true)]
        price: String,

        /// Fire when the price goes up to or down to the limit
        #[arg(short = 'd', long, value_enum)]
        direction: Option<DirectionArg>,
    },

    /// Edit an alert. Omitted fields keep their current values.
    Edit {
        /// Alert id
        id: AlertId,

        #[arg(short = 't', long)]
        ticker: Option<String>,

        #[arg(short = 'p', long, allow_hyphen_values = true)]
        price: Option<String>,

        #[arg(short = 'd', long, value_enum)]
        direction: Option<DirectionArg>,

        /// Override the notified flag
        #[arg(long, action = clap::ArgAction::Set)]
        notified: Option<bool>,
    },

    /// Delete an alert
    Delete {
        /// Alert id
        id: AlertId,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Re-arm a notified alert
    Reset {
        /// Alert id
        id: AlertId,
    },

    /// List active tickers
    Tickers,

    /// Print the dashboard route for the ticker in row INDEX (1-based)
    Open { index: usize },

    /// Watch your alerts (default)
    Watch(WatchArgs),

    /// Write a starter config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Default for Command {
    fn default() -> Self {
        Command::Watch(WatchArgs::default())
    }
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct WatchArgs {
    /// Refresh delay in seconds (like top -d)
    #[arg(short = 'd', long)]
    pub delay: Option<f64>,

    /// Number of refreshes before exiting (like top -n), 0 means infinite
    #[arg(short = 'n', long, default_value = "0")]
    pub iterations: u64,

    /// Batch mode: print to stdout instead of the interactive view (like top -b)
    #[arg(short = 'b', long)]
    pub batch: bool,

    /// Ring the terminal bell when an alert fires
    #[arg(long)]
    pub audio_alerts: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum DirectionArg {
    Up,
    Down,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Up => Direction::Up,
            DirectionArg::Down => Direction::Down,
        }
    }
}

/// Output format for `list`.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text table
    Text,
    /// Comma-separated values
    Csv,
    /// JSON array
    Json,
}

impl From<OutputFormat> for ExportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ExportFormat::Text,
            OutputFormat::Csv => ExportFormat::Csv,
            OutputFormat::Json => ExportFormat::Json,
        }
    }
}

impl Args {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Args::parse()
    }

    pub fn user_id(&self, config: &Config) -> Option<UserId> {
        self.user.or(config.user.id).map(UserId)
    }

    pub fn api_url<'a>(&'a self, config: &'a Config) -> &'a str {
        self.api_url.as_deref().unwrap_or(&config.api.base_url)
    }

    pub fn timeout(&self, config: &Config) -> u64 {
        self.timeout.unwrap_or(config.api.timeout)
    }
}

/// Build the create form from flags.
pub fn create_form(ticker: &str, price: &str, direction: Option<DirectionArg>) -> AlertForm {
    AlertForm {
        ticker: ticker.to_string(),
        limit_price: price.to_string(),
        direction: direction.map(Into::into),
    }
}

/// Ask on stdin whether to delete `alert`. Anything but y/yes declines.
pub fn prompt_delete(alert: &Alert) -> bool {
    print!(
        "Are you sure you want to delete the alert for {}? [y/N] ",
        alert.ticker
    );
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => is_yes(&answer),
        Err(_) => false,
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
