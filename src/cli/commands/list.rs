//! List command implementation.

use crate::cli::args::{ListCommands, OutputFormat};
use crate::error::ShopError;
use crate::model::{ListPatch, NewList};
use crate::output::{format_edit, format_list, format_lists};
use crate::session::ShoppingSession;

/// Execute list subcommands.
///
/// # Errors
///
/// Returns an error if the list cannot be found, the edit is invalid or
/// local storage fails.
pub async fn list(
    session: &ShoppingSession,
    cmd: ListCommands,
    format: OutputFormat,
) -> Result<String, ShopError> {
    match cmd {
        ListCommands::All => format_lists(&session.lists()?, format),
        ListCommands::Show { list } => {
            let list = session.find_list(&list)?;
            let items = session.items(list.id)?;
            format_list(&list, &items, format)
        },
        ListCommands::New { name, description } => {
            let edit = session.create_list(NewList { name, description }).await?;
            let message = format!("Created list {}", edit.value.name);
            format_edit(&message, &edit.value, &edit.submission, format)
        },
        ListCommands::Rename {
            list,
            name,
            description,
        } => {
            let current = session.find_list(&list)?;
            let edit = session
                .update_list(current.id, ListPatch { name, description })
                .await?;
            let message = if edit.value.name == current.name {
                format!("Updated list {}", edit.value.name)
            } else {
                format!("Renamed list {} to {}", current.name, edit.value.name)
            };
            format_edit(&message, &edit.value, &edit.submission, format)
        },
        ListCommands::Rm { list } => {
            let list = session.find_list(&list)?;
            let edit = session.delete_list(list.id).await?;
            let message = format!("Deleted list {}", edit.value.name);
            format_edit(&message, &edit.value, &edit.submission, format)
        },
        ListCommands::Shared { code } => {
            let shared = session
                .open_shared(&code)
                .await?
                .ok_or_else(|| ShopError::NotFound(format!("shared list '{code}'")))?;
            format_list(&shared.list, &shared.items, format)
        },
    }
}
