//! CLI Adapter
//!
//! Command-line interface for the pairs analysis tool.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{
    analyze_command, apply_overrides, check_config_command, hedge_command, init_logging,
    load_or_default, AnalyzeCmd, CheckConfigCmd, CliApp, Command, HedgeCmd,
};

use anyhow::Result;

/// Initialize the CLI application
pub fn init() -> CliApp {
    use clap::Parser;
    CliApp::parse()
}

/// Execute the CLI command
pub fn execute(app: CliApp) -> Result<()> {
    commands::execute(app)
}
