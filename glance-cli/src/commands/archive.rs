use anyhow::Result;
use glance_common::notices;
use glance_session::{ArchiveError, ListTarget};

use super::parse_id;
use crate::app::App;
use crate::output::print_sessions;
use crate::ArchiveCommands;

pub async fn run(app: &App, command: ArchiveCommands) -> Result<()> {
    let sync = app.sync().await?;

    match command {
        ArchiveCommands::List => {
            print_sessions(&sync.archive().await, "Archive is empty.");
        }
        ArchiveCommands::Pair { index } => match sync.archive_pair(index).await {
            Ok(()) => println!("{}", notices::QA_ARCHIVED),
            Err(ArchiveError::NoMatchingQuestion { .. }) => {
                println!("{}", notices::ARCHIVE_FAILED_NO_QUESTION)
            }
            Err(e) => return Err(e.into()),
        },
        ArchiveCommands::Split => {
            if sync.split_session().await? {
                println!("{}", notices::CHAT_SPLIT_ARCHIVED);
            } else {
                println!("Nothing to archive.");
            }
        }
        ArchiveCommands::Clear => {
            sync.clear_all(ListTarget::Archive).await?;
            println!("Archive cleared.");
        }
        ArchiveCommands::Delete { id } => {
            let id = parse_id(&id)?;
            sync.delete_archive_entry(id).await?;
            println!("Deleted {}", id);
        }
    }
    Ok(())
}
