use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    config::ClientSettings,
    error::SessionError,
    reducer::{reduce, Action, Transition, UserIntent},
    state::{SessionSnapshot, SessionState},
    transport::{ChannelEvent, Connection, Connector},
};

enum Command {
    Intent(UserIntent),
    Shutdown(oneshot::Sender<()>),
}

pub struct SessionController {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    actor: Option<JoinHandle<()>>,
}

impl SessionController {
    /// Opens the channel and starts the actor. Must be called within a Tokio runtime.
    pub fn spawn<C>(connector: &C, settings: &ClientSettings) -> Result<Self, SessionError>
    where
        C: Connector + ?Sized,
    {
        let connection = connector.open(&settings.backend_url)?;
        let state = SessionState::new(settings.backend_url.clone());
        let (snapshot_tx, snapshot_rx) = watch::channel(state.snapshot());
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let actor = SessionActor {
            state,
            connection,
            commands: command_rx,
            snapshots: snapshot_tx,
        };
        info!(backend_url = %settings.backend_url, "session: controller started");

        Ok(Self {
            commands: command_tx,
            snapshots: snapshot_rx,
            actor: Some(tokio::spawn(actor.run())),
        })
    }

    pub fn start_run(
        &self,
        prompt: impl Into<String>,
        mc_version: Option<String>,
        author: Option<String>,
    ) -> Result<(), SessionError> {
        self.dispatch(UserIntent::StartRun {
            prompt: prompt.into(),
            mc_version,
            author,
        })
    }

    pub fn send_chat(&self, message: impl Into<String>) -> Result<(), SessionError> {
        self.dispatch(UserIntent::SendChat {
            message: message.into(),
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub async fn shutdown(&mut self) {
        let Some(actor) = self.actor.take() else {
            return;
        };
        let (done_tx, done_rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
        if let Err(err) = actor.await {
            if !err.is_cancelled() {
                warn!(%err, "session: actor ended abnormally");
            }
        }
        info!("session: controller stopped");
    }

    pub fn is_closed(&self) -> bool {
        self.actor.is_none() || self.commands.is_closed()
    }

    fn dispatch(&self, intent: UserIntent) -> Result<(), SessionError> {
        if self.actor.is_none() {
            return Err(SessionError::Closed);
        }
        self.commands
            .send(Command::Intent(intent))
            .map_err(|_| SessionError::Closed)
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(actor) = self.actor.take() {
            actor.abort();
        }
    }
}

struct SessionActor {
    state: SessionState,
    connection: Connection,
    commands: mpsc::UnboundedReceiver<Command>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl SessionActor {
    async fn run(mut self) {
        let mut inbound_open = true;
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Intent(intent)) => self.apply(Action::User(intent)),
                    Some(Command::Shutdown(done)) => {
                        self.connection.close().await;
                        let _ = done.send(());
                        return;
                    }
                    None => break,
                },
                event = self.connection.recv(), if inbound_open => match event {
                    Some(event) => self.apply(Action::Channel(event)),
                    None => {
                        inbound_open = false;
                        warn!("session: channel ended; no further events will arrive");
                        self.apply(Action::Channel(ChannelEvent::Disconnected {
                            reason: "channel ended".to_string(),
                        }));
                    }
                },
            }
        }
        self.connection.close().await;
    }

    fn apply(&mut self, action: Action) {
        let label = action_label(&action);
        let Transition { state, request } = reduce(&self.state, action);

        if state != self.state {
            self.state = state;
            self.snapshots.send_replace(self.state.snapshot());
            debug!(action = label, "session: state updated");
        } else {
            debug!(action = label, "session: no state change");
        }

        match request {
            Some(request) => {
                let name = request.name();
                if let Err(err) = self.connection.emit(request) {
                    warn!(event = name, %err, "session: outbound event not queued");
                }
            }
            None if label == "send_chat" && self.state.run_id.is_none() => {
                debug!("session: chat kept local; no run has started yet");
            }
            None => {}
        }
    }
}

fn action_label(action: &Action) -> &'static str {
    match action {
        Action::Channel(ChannelEvent::Connected { .. }) => "channel_connected",
        Action::Channel(ChannelEvent::Disconnected { .. }) => "channel_disconnected",
        Action::Channel(ChannelEvent::Server(event)) => event.name(),
        Action::User(UserIntent::StartRun { .. }) => "start_run",
        Action::User(UserIntent::SendChat { .. }) => "send_chat",
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
