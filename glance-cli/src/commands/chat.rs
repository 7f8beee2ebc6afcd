use anyhow::Result;
use glance_session::UserInput;

use crate::app::App;
use crate::output::print_messages_from;

pub async fn run(
    app: &App,
    message: String,
    image: Option<String>,
    selection: Option<String>,
) -> Result<()> {
    let sync = app.sync().await?;
    let before = sync.active().await.len();

    let mut input = UserInput::text(message);
    if let Some(selected) = selection {
        input = input.with_selection(selected);
    }
    if let Some(locator) = image {
        input = input.with_image(locator);
    }
    sync.send(input).await?;

    let active = sync.active().await;
    print_messages_from(&active.messages, before);

    if let Some(notice) = active.messages.iter().skip(before).rev().find(|m| m.transient) {
        println!("{}", notice.text());
    }
    Ok(())
}
