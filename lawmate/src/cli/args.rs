//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::ConfigOverrides;

/// LawMate - ask a legal question-answering service and follow the answer as it streams
#[derive(Parser, Debug)]
#[command(name = "lawmate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Ask endpoint of the answering service [env: LAWMATE_ENDPOINT]
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Fail an answer when the stream is silent this long (0 disables) [env: LAWMATE_IDLE_TIMEOUT_SECS]
    #[arg(long, global = true)]
    pub idle_timeout_secs: Option<u64>,

    /// Directory transcripts are exported to [env: LAWMATE_EXPORT_DIR]
    #[arg(long, global = true)]
    pub export_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl From<&GlobalArgs> for ConfigOverrides {
    fn from(args: &GlobalArgs) -> Self {
        Self {
            endpoint: args.endpoint.clone(),
            idle_timeout_secs: args.idle_timeout_secs,
            export_dir: args.export_dir.clone(),
        }
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a single question and print the streamed answer
    Ask {
        /// Question to ask
        #[arg(trailing_var_arg = true, required = true)]
        question: Vec<String>,

        /// Write the transcript to the export directory afterwards
        #[arg(long)]
        export: bool,
    },

    /// Start an interactive multi-turn conversation
    Chat,

    /// Check that the answering service is up
    Health,
}
