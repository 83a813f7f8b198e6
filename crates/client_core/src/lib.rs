pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod reducer;
pub mod state;
pub mod transport;

pub use config::{load_settings, ClientSettings, DEFAULT_BACKEND_URL};
pub use controller::SessionController;
pub use error::{CodecError, SessionError, TransportError};
pub use http::BackendHttp;
pub use reducer::{progress_line, reduce, Action, Transition, UserIntent};
pub use state::{SessionSnapshot, SessionState};
pub use transport::{
    ChannelEvent, Connection, Connector, MemoryConnector, MemoryPeer, ReconnectPolicy,
    SocketIoConnector,
};
