use anyhow::{Context, Result};
use glance_common::PromptTemplate;
use glance_session::{templates, UserInput};

use crate::app::App;
use crate::output::print_messages_from;
use crate::TemplateCommands;

pub async fn run(app: &App, command: TemplateCommands) -> Result<()> {
    let sync = app.sync().await?;
    let mut list = sync.snapshot().await.templates;

    match command {
        TemplateCommands::List => {
            PromptTemplate::sort(&mut list);
            for template in &list {
                let builtin = if template.is_builtin { " (builtin)" } else { "" };
                println!("{:<20} {}{}", template.id, template.name, builtin);
            }
        }
        TemplateCommands::Apply { id, selection } => {
            let template = templates::find(&list, &id)
                .with_context(|| format!("No template with id {}", id))?;
            let before = sync.active().await.len();
            sync.send(UserInput::text(template.body.clone()).with_selection(selection))
                .await?;
            print_messages_from(&sync.active().await.messages, before);
        }
    }
    Ok(())
}
