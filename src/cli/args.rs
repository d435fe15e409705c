use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::model::{ItemPatch, NewItem};

#[derive(Parser)]
#[command(name = "shoplist")]
#[command(about = "Offline-first shopping lists with undo and redo")]
#[command(long_about = "shoplist - Offline-first shopping lists

Keeps shopping lists in a local database and synchronizes them with a
backend. Edits made while offline are queued and sent, in order, once the
backend is reachable again. Every edit can be undone and redone.

QUICK START:
  shoplist list new Weekly            Create a list
  shoplist item add Weekly Milk -q 2  Add an item
  shoplist item check Weekly Milk     Check it off
  shoplist undo                       Take that back
  shoplist sync status                See what is waiting to sync

OUTPUT FORMATS:
  --output pretty    Human-readable colored output (default)
  --output json      Machine-readable JSON for scripting

For more information on a specific command, run:
  shoplist <command> --help")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Output format for command results
    ///
    /// Use 'pretty' for human-readable colored output, or 'json' for
    /// machine-readable output suitable for scripting. Defaults to the
    /// configured format.
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Work offline: queue every change instead of contacting the backend
    #[arg(long, global = true)]
    pub offline: bool,

    /// Data directory (defaults to ~/.shoplist)
    #[arg(long, global = true, env = "SHOPLIST_HOME")]
    pub home: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for command results.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable colored output.
    #[default]
    Pretty,
    /// Machine-readable JSON output.
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage shopping lists
    ///
    /// # Examples
    ///
    ///   shoplist list all
    ///   shoplist list new "Weekly groceries"
    ///   shoplist list show Weekly
    #[command(alias = "l")]
    List(ListArgs),

    /// Manage items on a list
    ///
    /// Lists and items can be given by id or by name.
    ///
    /// # Examples
    ///
    ///   shoplist item add Weekly Milk --quantity 2 --category Dairy
    ///   shoplist item check Weekly Milk
    ///   shoplist item rm Weekly Milk
    #[command(alias = "i")]
    Item(ItemArgs),

    /// Undo the most recent change
    ///
    /// The reverse change is sent to the backend, or queued when offline.
    #[command(alias = "u")]
    Undo,

    /// Redo the most recently undone change
    #[command(alias = "r")]
    Redo,

    /// Show the undo/redo history
    History {
        /// Forget every recorded action
        #[arg(long)]
        clear: bool,
    },

    /// Inspect and drain the pending-change queue
    ///
    /// # Examples
    ///
    ///   shoplist sync status
    ///   shoplist sync run
    ///   shoplist sync queue
    Sync(SyncArgs),

    /// Show connectivity and synchronization status
    #[command(alias = "st")]
    Status,
}

#[derive(Args)]
pub struct ListArgs {
    #[command(subcommand)]
    pub command: ListCommands,
}

/// List subcommands.
#[derive(Subcommand)]
pub enum ListCommands {
    /// Show every list
    #[command(alias = "ls")]
    All,

    /// Show a list and its items
    Show {
        /// List id or name
        list: String,
    },

    /// Create a list
    New {
        /// List name
        name: String,

        /// Optional description
        #[arg(long, short = 'd')]
        description: Option<String>,
    },

    /// Rename a list or change its description
    Rename {
        /// List id or name
        list: String,

        /// New name
        name: Option<String>,

        /// New description
        #[arg(long, short = 'd')]
        description: Option<String>,
    },

    /// Delete a list and its items
    Rm {
        /// List id or name
        list: String,
    },

    /// Open a list someone shared with you
    ///
    /// Needs the backend to be reachable.
    Shared {
        /// Share code
        code: String,
    },
}

#[derive(Args)]
pub struct ItemArgs {
    #[command(subcommand)]
    pub command: ItemCommands,
}

/// Item fields shared by `item add` and `item edit`.
#[derive(Args, Debug, Clone, Default)]
pub struct ItemFields {
    /// Quantity (at least 1)
    #[arg(long, short = 'q')]
    pub quantity: Option<u32>,

    /// Category, e.g. Dairy
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Free-form notes
    #[arg(long, short = 'n')]
    pub notes: Option<String>,
}

/// Item subcommands.
#[derive(Subcommand)]
pub enum ItemCommands {
    /// Add an item to a list
    Add {
        /// List id or name
        list: String,

        /// Item name
        name: String,

        #[command(flatten)]
        fields: ItemFields,
    },

    /// Check an item off
    Check {
        /// List id or name
        list: String,

        /// Item id or name
        item: String,
    },

    /// Uncheck an item
    Uncheck {
        /// List id or name
        list: String,

        /// Item id or name
        item: String,
    },

    /// Change an item
    Edit {
        /// List id or name
        list: String,

        /// Item id or name
        item: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        fields: ItemFields,
    },

    /// Remove an item
    Rm {
        /// List id or name
        list: String,

        /// Item id or name
        item: String,
    },
}

impl ItemFields {
    /// Creation fields for an item called `name`.
    #[must_use]
    pub fn to_new(&self, name: &str) -> NewItem {
        NewItem {
            quantity: self.quantity.unwrap_or(1),
            category: self.category.clone(),
            notes: self.notes.clone(),
            ..NewItem::named(name)
        }
    }

    /// Patch setting these fields and, if given, a new name.
    #[must_use]
    pub fn to_patch(&self, name: Option<&String>) -> ItemPatch {
        ItemPatch {
            name: name.cloned(),
            quantity: self.quantity,
            category: self.category.clone(),
            notes: self.notes.clone(),
            checked: None,
        }
    }
}

#[derive(Args)]
pub struct SyncArgs {
    #[command(subcommand)]
    pub command: SyncCommands,
}

/// Sync queue subcommands.
#[derive(Subcommand)]
pub enum SyncCommands {
    /// Show sync queue status
    Status,

    /// Send queued changes to the backend now
    Run,

    /// List queued changes
    Queue {
        /// Maximum changes to show
        #[arg(long, short = 'n', default_value = "20")]
        limit: usize,
    },

    /// Drop every queued change
    ///
    /// Local copies keep the dropped edits; the backend never sees them.
    Clear {
        /// Skip confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },
}
