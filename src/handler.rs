use std::future::Future;
use std::pin::Pin;

use crate::http::request::Request;
use crate::http::response::Response;

/// Why a dispatch produced no response.
///
/// `Unhandled` is the router's "no route matched" condition and maps to
/// 404; everything else a handler reports maps to 500.
#[derive(Debug)]
pub enum HandlerError {
    /// No handler accepted the request
    Unhandled,
    /// The handler failed
    Failed(anyhow::Error),
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unhandled => write!(f, "no route matched the request"),
            Self::Failed(e) => write!(f, "handler failed: {e}"),
        }
    }
}

impl std::error::Error for HandlerError {}

impl From<anyhow::Error> for HandlerError {
    fn from(e: anyhow::Error) -> Self {
        Self::Failed(e)
    }
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response, HandlerError>> + Send>>;

/// A request handler: an async `Request -> Response` that may fail.
///
/// Handlers may suspend, and may not retain the connection socket except
/// through the upgrade payload of the response they return. Plain async
/// closures implement this trait via the blanket impl:
///
/// ```ignore
/// server.append_route("GET /hello", |_req| async {
///     Ok(Response::ok("hello"))
/// });
/// ```
pub trait Handler: Send + Sync {
    fn handle(&self, request: Request) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, HandlerError>> + Send + 'static,
{
    fn handle(&self, request: Request) -> HandlerFuture {
        Box::pin(self(request))
    }
}
