//! Server lifecycle: socket bring-up, the accept loop, and the
//! supervisor that ties routing, timeouts, and shutdown together.

pub mod listener;
pub mod supervisor;

pub use listener::{AsyncStream, BoxedSocket};
pub use supervisor::{Server, ServerConfig, DEFAULT_TIMEOUT};
