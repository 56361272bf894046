//! Twinspeak Core
//!
//! Domain types shared by the gateway: the session entity with its
//! append-only log, the lifecycle state machine, and the registry that owns
//! every live session for the lifetime of the process.

pub mod error;
pub mod registry;
pub mod session;
pub mod state;

pub use error::SessionError;
pub use registry::SessionRegistry;
pub use session::{LogEntry, Session, SessionId, SessionSnapshot};
pub use state::SessionState;
