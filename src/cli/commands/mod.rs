//! Command implementations for shoplist.
//!
//! Each command takes the session and returns the text to print.

mod history;
mod item;
mod list;
mod sync;

pub use history::{history, redo, undo, ConsoleNotifier};
pub use item::item;
pub use list::list;
pub use sync::{status, sync};

use crate::cli::args::{Commands, OutputFormat};
use crate::error::ShopError;
use crate::session::ShoppingSession;

/// Dispatch a parsed command.
///
/// # Errors
///
/// Returns whatever error the command produced.
pub async fn run(
    session: &ShoppingSession,
    command: Commands,
    format: OutputFormat,
) -> Result<String, ShopError> {
    match command {
        Commands::List(args) => list(session, args.command, format).await,
        Commands::Item(args) => item(session, args.command, format).await,
        Commands::Undo => undo(session, format).await,
        Commands::Redo => redo(session, format).await,
        Commands::History { clear } => history(session, clear, format),
        Commands::Sync(args) => sync(session, args.command, format).await,
        Commands::Status => status(session, format),
    }
}
