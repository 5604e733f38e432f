use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    version = env!("CARGO_PKG_VERSION"),
    about = "hotstring - expand typed triggers into text anywhere",
    long_about = "hotstring watches what you type and replaces trigger strings with their expansions."
)]
pub struct Hotstring {
    /// Log at debug level (RUST_LOG overrides this)
    #[clap(long, short, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub commands: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Add a new trigger
    Add {
        #[clap(long, short = 't', help = "Text that fires the expansion")]
        trigger: String,

        #[clap(long, short = 'o', help = "Expansion text; may contain placeholders")]
        output: String,

        #[clap(long, short = 'c', help = "Category used to group triggers")]
        category: Option<String>,
    },
    /// Update the expansion of an existing trigger
    Update {
        #[clap(long, short = 't', help = "Trigger to update")]
        trigger: String,

        #[clap(long, short = 'o', help = "New expansion text")]
        output: String,

        #[clap(long, short = 'c', help = "New category")]
        category: Option<String>,
    },
    /// Delete a trigger
    Delete {
        #[clap(long, short = 't', help = "Trigger to delete")]
        trigger: String,
    },
    /// List all triggers
    List {
        #[clap(long, short = 'c', help = "Only show triggers in this category")]
        category: Option<String>,
    },
    /// Import triggers from a JSON file
    Import {
        path: PathBuf,

        #[clap(long, help = "Replace all existing triggers instead of merging")]
        replace: bool,
    },
    /// Export all triggers to a JSON file
    Export { path: PathBuf },
    /// Show the placeholders an expansion may contain
    Placeholders,
    /// Expand a template now and print the result
    Preview { template: String },
    /// Turn expansion on
    Enable,
    /// Turn expansion off
    Disable,
    /// Show or set the trigger speed (1 = slowest, 10 = fastest)
    Speed {
        #[clap(value_parser = clap::value_parser!(u8).range(1..=10))]
        value: Option<u8>,
    },
    /// Run the expander in the foreground
    Run,
    /// Start the expander daemon in the background
    Start,
    /// Stop the expander daemon
    Stop,
    /// Check the status of the expander daemon
    Status,
}
