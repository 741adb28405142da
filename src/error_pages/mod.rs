//! Static error page override subsystem.
//!
//! # Data Flow
//! ```text
//! Request
//!     → layer.rs (ErrorPageService wraps the downstream handler)
//!     → downstream handler produces a response head
//!     → status >= 400 && enabled?
//!         → resolver.rs (read <dir>/<status>.html)
//!         → found: replace body, keep status
//!     → otherwise: pass through unchanged
//! ```
//!
//! # Design Decisions
//! - Disabled means fully transparent (development mode)
//! - A missing or unreadable page is never an error
//! - Every status >= 400 is eligible, no curated list

pub mod layer;
pub mod resolver;

pub use layer::{handle_error_pages, ErrorPageLayer, ErrorPageService, Interception};
pub use resolver::read_error_page;
