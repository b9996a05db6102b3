//! Burrow - Embeddable HTTP Server
//!
//! An async HTTP/1.1 server library: bind a TCP or unix-socket endpoint,
//! route requests to handlers, keep connections alive, and upgrade to
//! WebSocket in place.

pub mod config;
pub mod endpoint;
pub mod files;
pub mod handler;
pub mod http;
pub mod logger;
pub mod router;
pub mod server;
pub mod ws;

pub use endpoint::Endpoint;
pub use handler::{Handler, HandlerError};
pub use http::request::{Method, Request};
pub use http::response::{Response, ResponseBuilder, StatusCode};
pub use server::{Server, ServerConfig};
