//! HTTP protocol implementation.
//!
//! This module implements the HTTP/1.0 and HTTP/1.1 server side with
//! support for keep-alive connections and in-place protocol upgrade.
//!
//! # Architecture
//!
//! - **`connection`**: The per-connection request-response state machine
//! - **`parser`**: Parses incoming HTTP requests from byte buffers
//! - **`headers`**: Ordered, case-insensitive header map
//! - **`request`**: HTTP request representation and keep-alive rules
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: Serializes and writes HTTP responses to the client
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! Each client connection steps through a state machine:
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for incoming request data
//!        └──────┬──────┘
//!               │ Request received
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← Route to a handler, under the deadline
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send response to client
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → Reading (same connection)
//!               ├─ Upgrade → switched protocol owns the socket
//!               └─ Close → Closed
//! ```

pub mod connection;
pub mod headers;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
