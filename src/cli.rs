//! CLI definitions for jobsched.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use jobsched_config::default_config_path;

/// jobsched CLI.
#[derive(Parser)]
#[command(name = "jobsched")]
#[command(about = "Cluster-aware job scheduling daemon")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value_os_t = default_config_path(), global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the scheduler in foreground (default)
    Run {
        /// Override the node id from the configuration
        #[arg(long, env = "JOBSCHED_NODE_ID")]
        node_id: Option<String>,
    },

    /// Validate the configuration file and print the result
    Validate,

    /// Print the next execution time of a cron expression or a configured job
    Next {
        /// Cron expression (6 fields, seconds first)
        #[arg(long, conflicts_with = "uid", required_unless_present = "uid")]
        cron: Option<String>,

        /// Uid of a configured job
        #[arg(long)]
        uid: Option<String>,

        /// Number of upcoming fire times to print for a cron expression
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },
}
