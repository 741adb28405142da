//! workhorse: request shim in front of an application backend and Git.

pub mod cli;
pub mod config;
pub mod error_pages;
pub mod git;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::schema::WorkhorseConfig;
pub use error_pages::ErrorPageLayer;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
