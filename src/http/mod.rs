//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP / unix socket connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → error_pages (intercept error responses)
//!     → upstream.rs (forward to backend over TCP, or connector.rs for a unix socket)
//!     → Send to client
//! ```

#[cfg(unix)]
pub mod connector;
pub mod request;
pub mod server;
pub mod upstream;

pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{HttpServer, ServerError};
pub use upstream::Upstream;
