pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "longbox")]
#[command(about = "A comic pull-list tracker", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the weekly release list and reclassify it
    Refresh,
    /// List this week's comics
    List {
        /// Only show one publisher's comics
        #[arg(long)]
        publisher: Option<String>,
        /// Only show pulled comics
        #[arg(long)]
        pulled: bool,
        /// Only show watched comics
        #[arg(long)]
        watched: bool,
    },
    /// List the publishers in this week's list
    Publishers,
    /// Mark a comic as pulled (by grouping key or catalog title)
    Pull {
        title: String,
        /// Clear the flag instead
        #[arg(long)]
        off: bool,
    },
    /// Mark a comic as watched (by grouping key or catalog title)
    Watch {
        title: String,
        /// Clear the flag instead
        #[arg(long)]
        off: bool,
    },
    /// List the release dates kept in the store
    Dates,
}
