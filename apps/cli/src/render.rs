use std::collections::HashSet;

use client_core::SessionSnapshot;
use shared::domain::{MessageId, Role};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Update {
    pub lines: Vec<String>,
    pub downloads: Vec<String>,
}

#[derive(Debug, Default)]
pub struct TranscriptView {
    connected: bool,
    progress_printed: usize,
    turn: Option<MessageId>,
    messages_printed: HashSet<MessageId>,
    last_error: Option<String>,
}

impl TranscriptView {
    pub fn update(&mut self, snapshot: &SessionSnapshot) -> Update {
        let mut update = Update::default();

        if snapshot.connected != self.connected {
            self.connected = snapshot.connected;
            update.lines.push(if snapshot.connected {
                "[connected]".to_string()
            } else {
                "[disconnected]".to_string()
            });
        }

        // every user message starts a turn with a cleared progress log
        let turn = snapshot
            .messages
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(|message| message.id);
        if turn != self.turn || snapshot.progress.len() < self.progress_printed {
            self.turn = turn;
            self.progress_printed = 0;
        }
        for line in &snapshot.progress[self.progress_printed..] {
            update.lines.push(format!("  ... {line}"));
        }
        self.progress_printed = snapshot.progress.len();

        for message in &snapshot.messages {
            if !self.messages_printed.insert(message.id) {
                continue;
            }
            let speaker = match message.role {
                Role::User => "you",
                Role::Agent => "agent",
            };
            update.lines.push(format!("{speaker}> {}", message.text));
            if let Some(url) = &message.download_url {
                update.lines.push(format!("  download: {url}"));
                update.downloads.push(url.clone());
            }
        }

        if snapshot.error != self.last_error {
            self.last_error = snapshot.error.clone();
            if let Some(error) = &snapshot.error {
                update.lines.push(format!("error: {error}"));
            }
        }

        update
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
