use anyhow::{Context, Result};

use super::parse_id;
use crate::app::App;
use crate::output::{print_messages_from, print_sessions};
use crate::HistoryCommands;

pub async fn run(app: &App, command: HistoryCommands) -> Result<()> {
    let sync = app.sync().await?;

    match command {
        HistoryCommands::List => {
            print_sessions(&sync.snapshot().await.history, "No chat history.");
        }
        HistoryCommands::Show { id } => {
            let id = parse_id(&id)?;
            let history = sync.snapshot().await.history;
            let session = history
                .iter()
                .find(|s| s.id == id)
                .with_context(|| format!("No history entry {}", id))?;
            print_messages_from(&session.messages, 0);
        }
        HistoryCommands::Resume { id } => {
            sync.resume(parse_id(&id)?).await?;
            let active = sync.active().await;
            println!("Resumed {}", active.id);
            print_messages_from(&active.messages, 0);
        }
        HistoryCommands::Clear => {
            sync.clear_history().await?;
            println!("{}", glance_common::notices::ALL_HISTORY_CLEARED);
        }
        HistoryCommands::Delete { id } => {
            let id = parse_id(&id)?;
            sync.delete_history_entry(id).await?;
            println!("Deleted {}", id);
        }
    }
    Ok(())
}
