use serde_json::Value;
use shared::{
    domain::{ChatMessage, Stage},
    protocol::{
        ChatPayload, ChatResponsePayload, ClientRequest, ErrorPayload, ModReadyPayload,
        ProgressPayload, ServerEvent, StartRunPayload,
    },
};

use crate::{state::SessionState, transport::ChannelEvent};

pub const UNKNOWN_ERROR: &str = "Unknown error";
pub const PROGRESS_FALLBACK: &str = "Working...";
const NODE_PREFIX: &str = "node:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIntent {
    StartRun {
        prompt: String,
        mc_version: Option<String>,
        author: Option<String>,
    },
    SendChat {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Channel(ChannelEvent),
    User(UserIntent),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: SessionState,
    pub request: Option<ClientRequest>,
}

impl Transition {
    fn unchanged(state: &SessionState) -> Self {
        Self {
            state: state.clone(),
            request: None,
        }
    }
}

pub fn reduce(state: &SessionState, action: Action) -> Transition {
    match action {
        Action::Channel(event) => Transition {
            state: reduce_channel(state, event),
            request: None,
        },
        Action::User(UserIntent::StartRun {
            prompt,
            mc_version,
            author,
        }) => start_run(state, prompt, mc_version, author),
        Action::User(UserIntent::SendChat { message }) => send_chat(state, &message),
    }
}

fn reduce_channel(state: &SessionState, event: ChannelEvent) -> SessionState {
    let mut next = state.clone();
    match event {
        ChannelEvent::Connected { sid } => {
            next.connected = true;
            if sid.is_some() {
                next.session_sid = sid;
            }
        }
        ChannelEvent::Disconnected { .. } => next.connected = false,
        ChannelEvent::Server(event) => apply_server_event(&mut next, event),
    }
    next
}

fn apply_server_event(state: &mut SessionState, event: ServerEvent) {
    match event {
        ServerEvent::Connected(payload) => {
            state.connected = true;
            if payload.sid.is_some() {
                state.session_sid = payload.sid;
            }
        }
        ServerEvent::Error(ErrorPayload { message, .. }) => {
            state.last_error = Some(error_text(message));
        }
        ServerEvent::RunStarted(payload) => state.run_id = payload.run_id,
        ServerEvent::Progress(payload) => {
            state.awaiting_user = false;
            state.progress.push(progress_line(&payload));
        }
        ServerEvent::ModReady(ModReadyPayload {
            summary,
            download_url,
            ..
        }) => {
            let summary = summary_text(summary.as_ref());
            let download_url = full_download_url(&state.backend_url, download_url.as_deref());
            let id = state.next_message_id();
            state
                .messages
                .push(ChatMessage::agent(id, summary.clone(), download_url.clone()));
            state.summary = Some(summary);
            state.download_url = download_url;
            state.stage = Stage::Result;
            state.awaiting_user = true;
        }
        ServerEvent::ChatResponse(ChatResponsePayload { message, .. }) => {
            if let Some(text) = message.filter(|text| !text.is_empty()) {
                let id = state.next_message_id();
                state.messages.push(ChatMessage::agent(id, text, None));
            }
            state.awaiting_user = true;
        }
    }
}

fn start_run(
    state: &SessionState,
    prompt: String,
    mc_version: Option<String>,
    author: Option<String>,
) -> Transition {
    if prompt.trim().is_empty() {
        return Transition::unchanged(state);
    }

    let mut next = state.clone();
    next.progress.clear();
    next.summary = None;
    next.download_url = None;
    next.messages.clear();
    let id = next.next_message_id();
    next.messages.push(ChatMessage::user(id, prompt.clone()));
    next.last_error = None;
    next.stage = Stage::Result;
    next.awaiting_user = false;

    Transition {
        state: next,
        request: Some(ClientRequest::StartRun(StartRunPayload {
            prompt,
            author,
            mc_version,
        })),
    }
}

fn send_chat(state: &SessionState, message: &str) -> Transition {
    let message = message.trim();
    if message.is_empty() {
        return Transition::unchanged(state);
    }

    let mut next = state.clone();
    let id = next.next_message_id();
    next.messages.push(ChatMessage::user(id, message));
    next.progress.clear();
    next.awaiting_user = false;

    let request = next.run_id.clone().map(|run_id| {
        ClientRequest::Chat(ChatPayload {
            run_id,
            message: message.to_string(),
        })
    });

    Transition {
        state: next,
        request,
    }
}

fn error_text(message: Option<String>) -> String {
    message
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
}

/// Picks exactly one display line for a progress event.
pub fn progress_line(payload: &ProgressPayload) -> String {
    if let Some(message) = payload.message.as_deref().map(str::trim) {
        if !message.is_empty() {
            return message.to_string();
        }
    }
    if let Some(node) = payload.node.as_deref().filter(|node| !node.is_empty()) {
        return node.to_string();
    }
    if let Some(snapshot) = &payload.snapshot {
        if let Some(entry) = snapshot.iter().find(|entry| entry.starts_with(NODE_PREFIX)) {
            return entry.clone();
        }
        if let Some(first) = snapshot.first().filter(|first| !first.is_empty()) {
            return first.clone();
        }
    }
    PROGRESS_FALLBACK.to_string()
}

pub fn summary_text(summary: Option<&Value>) -> String {
    match summary {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn full_download_url(backend_url: &str, path: Option<&str>) -> Option<String> {
    path.filter(|path| !path.is_empty())
        .map(|path| format!("{backend_url}{path}"))
}

#[cfg(test)]
#[path = "tests/reducer_tests.rs"]
mod tests;
