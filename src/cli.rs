//! CLI definitions for feedfold.
//!
//! Uses clap for argument parsing with derive macros.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// feedfold - incremental feed harvester
#[derive(Parser, Debug)]
#[command(name = "feedfold")]
#[command(version)]
#[command(about = "Incrementally harvest an infinitely-scrolling media feed into a folder-tagged gallery")]
#[command(long_about = r#"
feedfold scrolls a newest-first feed until it meets a post it already has,
prepends the new posts to a local collection, and regenerates a browsable
gallery where every card carries an ordinal number you can file into folders.

Quick start:
  1. Save successive page captures into a directory, or point at a feed URL
  2. Run: feedfold extract ./captures
  3. Open collection_master.html from the output directory
  4. Group items: feedfold folder create travel && feedfold folder toggle 3-7 --in travel
"#)]
pub struct Cli {
    /// Path to the collection store
    #[arg(long, env = "FEEDFOLD_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Directory for the gallery and JSON backup
    #[arg(long, env = "FEEDFOLD_OUTPUT", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Path to the folder file
    #[arg(long, env = "FEEDFOLD_TAGS", global = true)]
    pub tags: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Be verbose (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Be quiet (suppress non-error output)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Also append logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one extraction pass and merge new posts
    Extract(ExtractArgs),

    /// Delete the stored collection (folders and artifacts are kept)
    Clear(ClearArgs),

    /// Regenerate the gallery and backup from the stored collection
    Render(RenderArgs),

    /// Show collection statistics
    Stats,

    /// List items with their ordinals
    List(ListArgs),

    /// Manage folders
    Folder(FolderArgs),

    /// Show or manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Capture directory or http(s):// feed URL
    pub source: String,

    /// Base URL for resolving relative links in captures
    #[arg(long)]
    pub base: Option<String>,

    /// Stop after this many scroll rounds (0 = unbounded)
    #[arg(long)]
    pub max_rounds: Option<usize>,

    /// Wait after each scroll, in milliseconds
    #[arg(long)]
    pub settle_ms: Option<u64>,

    /// Wait before the final scan, in milliseconds
    #[arg(long)]
    pub final_settle_ms: Option<u64>,

    /// Unchanged rounds treated as end of feed
    #[arg(long)]
    pub stability_rounds: Option<u32>,

    /// Gallery title
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Args, Debug)]
pub struct ClearArgs {
    /// Confirm deletion
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Gallery title
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// First ordinal to show (inclusive)
    #[arg(long, requires = "to", conflicts_with = "folder")]
    pub from: Option<usize>,

    /// Last ordinal to show (inclusive)
    #[arg(long, requires = "from", conflicts_with = "folder")]
    pub to: Option<usize>,

    /// Only items whose ordinal is in this folder
    #[arg(long)]
    pub folder: Option<String>,

    /// Limit number of items
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct FolderArgs {
    #[command(subcommand)]
    pub action: FolderCommand,
}

#[derive(Subcommand, Debug)]
pub enum FolderCommand {
    /// Create an empty folder
    Create {
        name: String,
    },

    /// Delete a folder and its memberships
    Delete {
        name: String,
    },

    /// Flip membership of ordinals in one or more folders
    Toggle {
        /// Ordinals, e.g. 3 5 9-12 or 1,2,3
        #[arg(required = true)]
        ordinals: Vec<String>,

        /// Folder to toggle in (repeatable)
        #[arg(long = "in", required = true)]
        folders: Vec<String>,
    },

    /// Show a folder's ordinals and the items they currently label
    Show {
        name: String,
    },

    /// List folders
    List,

    /// Show whether each folder holds all, some, or none of a selection
    Coverage {
        #[arg(required = true)]
        ordinals: Vec<String>,
    },
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show current configuration
    #[arg(long)]
    pub show: bool,

    /// Write a default config file
    #[arg(long)]
    pub init: bool,

    /// Overwrite an existing file with --init
    #[arg(long, requires = "init")]
    pub force: bool,

    /// Set a configuration value (KEY=VALUE)
    #[arg(long)]
    pub set: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
}

impl OutputFormat {
    /// Parse a config-file format name, falling back to text.
    #[must_use]
    pub fn from_config(value: &str) -> Self {
        <Self as ValueEnum>::from_str(value, true).unwrap_or_default()
    }

    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json | Self::JsonPretty)
    }
}
