//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerConfig (network, address, umask)
//!     → listener.rs (resolve, unlink stale socket, bind under umask)
//!     → Listener::Tcp | Listener::Unix
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - tcp4/tcp6 pick the first resolved address of that family
//! - The umask is only changed around the unix bind call

pub mod listener;

pub use listener::{resolve_tcp, Listener, ListenerError};
