//! Terminal formatting.

use glance_common::{Message, Role, Session};

pub fn print_message(index: usize, message: &Message) {
    let who = match message.role {
        Role::User => "you",
        Role::Model => "ai",
    };
    let mut flags = String::new();
    if message.archived {
        flags.push_str(" [archived]");
    }
    if message.transient {
        flags.push_str(" [status]");
    }
    println!("[{:>3}] {:>3}{}: {}", index, who, flags, message.text());
    let images = message.images().count();
    if images > 0 {
        println!("        ({} image{})", images, if images == 1 { "" } else { "s" });
    }
}

/// Print durable messages starting at `from`, keeping their buffer indices.
pub fn print_messages_from(messages: &[Message], from: usize) {
    for (index, message) in messages.iter().enumerate().skip(from) {
        if !message.transient {
            print_message(index, message);
        }
    }
}

pub fn print_session_line(position: usize, session: &Session) {
    println!(
        "{}  {:<60}  ({} messages)",
        session.id,
        session.title(position),
        session.len()
    );
}

pub fn print_sessions(sessions: &[Session], empty: &str) {
    if sessions.is_empty() {
        println!("{}", empty);
        return;
    }
    for (i, session) in sessions.iter().enumerate() {
        print_session_line(i + 1, session);
    }
}
