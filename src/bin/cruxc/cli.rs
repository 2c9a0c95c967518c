//! # Cli
//!
//! This module contains everything needed for parsing the CLI arguments of
//! cruxc.
use clap::{Parser, ValueEnum};

/// Struct containing the CLI configuration for cruxc.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// The path to the Crux source file.
    #[arg(index = 1)]
    pub file: std::path::PathBuf,

    /// Whether to dump the resolved AST (for debugging).
    #[arg(long)]
    pub dump_parsed: bool,

    /// Whether to dump the type checked AST (for debugging).
    #[arg(long)]
    pub dump_typed: bool,

    /// Whether to dump the lowered IR (for debugging).
    #[arg(long)]
    pub dump_ir: bool,

    /// Specify the log level of the compiler.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    pub verbosity: LogLevel,
}

impl Cli {
    pub fn init() -> Self {
        Cli::parse()
    }
}

/// Enum for specifying the log level of cruxc.
#[derive(ValueEnum, Clone, Default, Debug)]
pub enum LogLevel {
    /// The default log level. Only critical errors will be logged.
    #[default]
    #[value(alias("0"))]
    Error,

    /// A log level, where also warnings are logged.
    #[value(alias("1"))]
    Warn,

    /// Also log information about the general state of the compiler, e.g.,
    /// which stage is running.
    #[value(alias("2"))]
    Info,

    /// Log everything which happens internally in the compiler.
    #[value(alias("3"))]
    Debug,

    /// Log extra information, including intermediate artifacts.
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
