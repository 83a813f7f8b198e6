use shared::domain::{ChatMessage, MessageId, RunId, Stage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub backend_url: String,
    pub stage: Stage,
    pub run_id: Option<RunId>,
    pub connected: bool,
    pub awaiting_user: bool,
    pub last_error: Option<String>,
    pub progress: Vec<String>,
    pub messages: Vec<ChatMessage>,
    pub summary: Option<String>,
    pub download_url: Option<String>,
    pub session_sid: Option<String>,
    next_message_seq: u64,
}

impl SessionState {
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into(),
            stage: Stage::Prompt,
            run_id: None,
            connected: false,
            awaiting_user: false,
            last_error: None,
            progress: Vec::new(),
            messages: Vec::new(),
            summary: None,
            download_url: None,
            session_sid: None,
            next_message_seq: 1,
        }
    }

    pub(crate) fn next_message_id(&mut self) -> MessageId {
        let id = MessageId(self.next_message_seq);
        self.next_message_seq += 1;
        id
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            connected: self.connected,
            stage: self.stage,
            run_id: self.run_id.clone(),
            progress: self.progress.clone(),
            messages: self.messages.clone(),
            summary: self.summary.clone(),
            download_url: self.download_url.clone(),
            error: self.last_error.clone(),
            awaiting_user: self.awaiting_user,
            session_sid: self.session_sid.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub connected: bool,
    pub stage: Stage,
    pub run_id: Option<RunId>,
    pub progress: Vec<String>,
    pub messages: Vec<ChatMessage>,
    pub summary: Option<String>,
    pub download_url: Option<String>,
    pub error: Option<String>,
    pub awaiting_user: bool,
    pub session_sid: Option<String>,
}

impl SessionSnapshot {
    pub fn accepts_user_turn(&self) -> bool {
        self.awaiting_user
    }
}
