use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use idf_core::DOT_IDF_SETTINGS_CONFIG;

#[derive(Parser)]
#[command(verbatim_doc_comment)]
///     ____ ____  ______
///    /  _// __ \/ ____/
///    / / / / / / /_
///  _/ / / /_/ / __/
/// /___//_____/_/
/// ESP-IDF installer
pub struct Cli {
    /// Settings file
    #[arg(long, short = 'c', default_value = DOT_IDF_SETTINGS_CONFIG)]
    pub config: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the published ESP-IDF versions
    Versions,
    /// Download a release or clone `master`
    Install {
        /// ESP-IDF version, e.g. `v5.1` or `master`
        version: String,
        /// Directory that receives the installation
        #[arg(long, short)]
        destination: PathBuf,
        /// Archive URL overriding the release URL template
        #[arg(long, short)]
        url: Option<String>,
        #[command(flatten)]
        tools: ToolsPrompt,
    },
    /// Configure an installation that is already on disk
    UseExisting {
        path: PathBuf,
        #[command(flatten)]
        tools: ToolsPrompt,
    },
}

/// Answer to the "install tools" question.
#[derive(Args, Clone, Copy)]
pub struct ToolsPrompt {
    /// Install the tools without asking
    #[arg(long, short = 'y', conflicts_with = "no_tools")]
    pub yes: bool,
    /// Never install the tools
    #[arg(long)]
    pub no_tools: bool,
}
