//! # Cli
//!
//! This module contains everything needed for parsing the CLI arguments for Uguisu.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Struct containing the CLI configuration for Uguisu.
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Specify the log level of the interpreter.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    pub verbosity: LogLevel,
}

impl Cli {
    pub fn init() -> Self {
        Cli::parse()
    }
}

/// Enum for specifying the log level of Uguisu.
#[derive(ValueEnum, Clone, Default, Debug)]
pub enum LogLevel {
    /// The default log level. Only critical errors will be logged.
    #[default]
    #[value(alias("0"))]
    Error,

    /// A log level, where also warnings (like the any-type escape hatch being used) are logged.
    #[value(alias("1"))]
    Warn,

    /// Also log information about the general state of the interpreter, e.g., which file is run.
    #[value(alias("2"))]
    Info,

    /// Log everything which happens internally in the interpreter.
    /// Note: This output can be quite clunky, since _very much_ will be logged.
    #[value(alias("3"))]
    Debug,

    /// Log extra information. This can include more precise debug output or even non-important
    /// errors.
    #[value(alias("4"))]
    Trace,
}

impl From<&LogLevel> for log::Level {
    fn from(value: &LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a Uguisu source file.
    Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// The path to the uguisu source file.
    #[arg(index = 1)]
    pub file: std::path::PathBuf,

    /// Dump the token stream as JSON instead of running the program.
    #[arg(long)]
    pub dump_tokens: bool,

    /// Dump the parsed AST as JSON instead of running the program.
    #[arg(long)]
    pub dump_ast: bool,
}
