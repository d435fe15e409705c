//! Item command implementation.

use crate::cli::args::{ItemCommands, OutputFormat};
use crate::error::ShopError;
use crate::output::format_edit;
use crate::session::ShoppingSession;

/// Execute item subcommands.
///
/// # Errors
///
/// Returns an error if the list or item cannot be found, the edit is
/// invalid or local storage fails.
pub async fn item(
    session: &ShoppingSession,
    cmd: ItemCommands,
    format: OutputFormat,
) -> Result<String, ShopError> {
    match cmd {
        ItemCommands::Add { list, name, fields } => {
            let list = session.find_list(&list)?;
            let edit = session.add_item(list.id, fields.to_new(&name)).await?;
            let message = format!("Added {} to {}", edit.value.name, list.name);
            format_edit(&message, &edit.value, &edit.submission, format)
        },
        ItemCommands::Check { list, item } => set_checked(session, &list, &item, true, format).await,
        ItemCommands::Uncheck { list, item } => {
            set_checked(session, &list, &item, false, format).await
        },
        ItemCommands::Edit {
            list,
            item,
            name,
            fields,
        } => {
            let list = session.find_list(&list)?;
            let current = session.find_item(list.id, &item)?;
            let edit = session
                .update_item(current.id, fields.to_patch(name.as_ref()))
                .await?;
            let message = format!("Updated {}", edit.value.name);
            format_edit(&message, &edit.value, &edit.submission, format)
        },
        ItemCommands::Rm { list, item } => {
            let list = session.find_list(&list)?;
            let current = session.find_item(list.id, &item)?;
            let edit = session.delete_item(current.id).await?;
            let message = format!("Removed {} from {}", edit.value.name, list.name);
            format_edit(&message, &edit.value, &edit.submission, format)
        },
    }
}

async fn set_checked(
    session: &ShoppingSession,
    list: &str,
    item: &str,
    checked: bool,
    format: OutputFormat,
) -> Result<String, ShopError> {
    let list = session.find_list(list)?;
    let current = session.find_item(list.id, item)?;
    let edit = session.set_checked(current.id, checked).await?;
    let verb = if checked { "Checked" } else { "Unchecked" };
    let message = format!("{verb} {}", edit.value.name);
    format_edit(&message, &edit.value, &edit.submission, format)
}
