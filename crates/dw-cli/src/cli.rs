//! CLI argument definitions for the warehouse builder.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use dw_model::CalendarLocale;

#[derive(Parser)]
#[command(
    name = "dw-cli",
    version,
    about = "Retail warehouse builder - star schema and one-big-table from a raw CSV extract",
    long_about = "Build a dimensional model from a raw CSV extract.\n\n\
                  Produces surrogate-keyed dimensions, a date dimension, event facts\n\
                  and a denormalized one-big-table, written as CSV files."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub run: RunArgs,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

/// Options shared by every step. Flags override the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// JSON configuration file.
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the raw CSV extract (default: raw).
    #[arg(long = "raw-dir", value_name = "DIR", global = true)]
    pub raw_dir: Option<PathBuf>,

    /// Directory the warehouse tables are written to (default: DW).
    #[arg(long = "output-dir", value_name = "DIR", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Order status counted as a valid sale. Repeat for several.
    #[arg(long = "accepted-status", value_name = "STATUS", global = true)]
    pub accepted_status: Vec<String>,

    /// Language of calendar day and month names.
    #[arg(long = "locale", value_enum, global = true)]
    pub locale: Option<LocaleArg>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Build and write every dimension, including dim_date.
    Dims,

    /// Build and write every fact.
    Facts {
        /// Resolve facts against an empty dimension set (all foreign keys null).
        #[arg(long = "empty-dims")]
        empty_dims: bool,
    },

    /// Build dimensions and facts, then write the one-big-table.
    Obt,

    /// Run dims, facts and obt in sequence, reusing built tables.
    All,

    /// List the tables the warehouse produces.
    Tables,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LocaleArg {
    English,
    Spanish,
}

impl From<LocaleArg> for CalendarLocale {
    fn from(value: LocaleArg) -> Self {
        match value {
            LocaleArg::English => CalendarLocale::English,
            LocaleArg::Spanish => CalendarLocale::Spanish,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
