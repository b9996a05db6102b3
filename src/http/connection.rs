use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use parking_lot::RwLock;
use tokio::io::AsyncReadExt;

use crate::handler::HandlerError;
use crate::http::parser::{parse_http_request, ParseError};
use crate::http::request::Request;
use crate::http::response::{Response, Upgrade};
use crate::http::writer::write_response;
use crate::logger::{connection_message, Logger};
use crate::router::Router;
use crate::server::listener::BoxedSocket;

/// Handles a single accepted connection.
///
/// The `Connection` owns its socket exclusively and runs a state machine
/// over it: read one request, dispatch it through the route table under
/// the server's deadline, write the response, then either loop for the
/// next request (keep-alive), hand the socket to an upgrade payload, or
/// close.
///
/// # State Machine
///
/// ```text
/// Reading ── request ──▶ Dispatching ──▶ Writing ──┬─ keep-alive ─▶ Reading
///    │                                             ├─ upgrade ────▶ Upgraded
///    └─ EOF / parse error ─▶ Closed ◀──────────────┘  (then Closed)
/// ```
///
/// Reads happen strictly after the prior response is written, so requests
/// are served one at a time per connection; pipelined requests queue in
/// the read buffer.
pub struct Connection {
    socket: BoxedSocket,
    id: String,
    buffer: BytesMut,
    state: ConnectionState,
    router: Arc<RwLock<Router>>,
    timeout: Duration,
    logger: Arc<dyn Logger>,
}

/// Position of a connection in its request/response lifecycle.
#[derive(Debug)]
enum ConnectionState {
    /// Waiting for a complete request from the peer
    Reading,
    /// A parsed request needs a response
    Dispatching(Request),
    /// A response is ready to be sent (response, keep_alive flag)
    Writing(Response, bool),
    /// The socket now belongs to a switched protocol
    Upgraded(Upgrade),
    /// Connection is done
    Closed,
}

impl Connection {
    pub fn new(
        socket: BoxedSocket,
        id: String,
        router: Arc<RwLock<Router>>,
        timeout: Duration,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            socket,
            id,
            buffer: BytesMut::with_capacity(4096),
            state: ConnectionState::Reading,
            router,
            timeout,
            logger,
        }
    }

    /// Runs the connection until it closes.
    ///
    /// All failure modes end here: I/O and parse errors are logged against
    /// this connection's id and close only this connection. The matching
    /// `open connection` / `close connection` log pair brackets every run.
    pub async fn run(mut self) {
        self.logger
            .log_info(&connection_message(&self.id, "open connection"));

        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Reading) {
                ConnectionState::Reading => match self.read_request().await {
                    Ok(Some(request)) => {
                        self.state = ConnectionState::Dispatching(request);
                    }
                    Ok(None) => {
                        self.state = ConnectionState::Closed;
                    }
                    Err(e) => {
                        self.logger
                            .log_error(&connection_message(&self.id, &format!("error: {e}")));
                        self.state = ConnectionState::Closed;
                    }
                },

                ConnectionState::Dispatching(request) => {
                    self.logger.log_info(&connection_message(
                        &self.id,
                        &format!("request: {} {}", request.method, request.path),
                    ));

                    let keep_alive = request.keep_alive();
                    let connection_header = request.headers.get("Connection").map(str::to_owned);

                    let mut response = self.dispatch(request).await;

                    // A kept-alive response echoes the request's Connection
                    // header so the client sees the reuse confirmed.
                    if keep_alive {
                        if let Some(value) = connection_header {
                            response.headers.set("Connection", value);
                        }
                    }

                    self.state = ConnectionState::Writing(response, keep_alive);
                }

                ConnectionState::Writing(mut response, keep_alive) => {
                    let upgrade = response.upgrade.take();
                    if let Err(e) = write_response(&mut self.socket, &response).await {
                        self.logger
                            .log_error(&connection_message(&self.id, &format!("error: {e}")));
                        self.state = ConnectionState::Closed;
                    } else if let Some(upgrade) = upgrade {
                        self.state = ConnectionState::Upgraded(upgrade);
                    } else if keep_alive {
                        self.state = ConnectionState::Reading;
                    } else {
                        self.state = ConnectionState::Closed;
                    }
                }

                ConnectionState::Upgraded(upgrade) => {
                    upgrade.run(self.socket).await;
                    self.logger
                        .log_info(&connection_message(&self.id, "close connection"));
                    return;
                }

                ConnectionState::Closed => break,
            }
        }

        self.logger
            .log_info(&connection_message(&self.id, "close connection"));
    }

    /// Reads and parses one complete HTTP request.
    ///
    /// Buffers partial reads until the parser has a full request; bytes
    /// beyond the request (pipelined data) stay in the buffer for the next
    /// call.
    ///
    /// Returns `Ok(None)` when the peer closes cleanly between requests.
    async fn read_request(&mut self) -> anyhow::Result<Option<Request>> {
        loop {
            // Try parsing whatever we already have
            match parse_http_request(&self.buffer) {
                Ok((request, consumed)) => {
                    self.buffer.advance(consumed);
                    return Ok(Some(request));
                }

                Err(ParseError::Incomplete) => {
                    // Need more data → fall through to read
                }

                Err(e) => {
                    return Err(anyhow::anyhow!("HTTP parse error: {e}"));
                }
            }

            let n = self.socket.read_buf(&mut self.buffer).await?;

            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(anyhow::anyhow!("connection closed mid-request"));
            }
        }
    }

    /// Routes one request to its handler under the server's deadline and
    /// maps every failure to a well-formed response: no matching route is
    /// 404, a handler error or an expired deadline is 500. The deadline
    /// cancels only the handler future, never this connection.
    async fn dispatch(&self, request: Request) -> Response {
        let handler = {
            let router = self.router.read();
            router.find(&request.method, &request.path)
        };

        let Some(handler) = handler else {
            return Response::not_found();
        };

        match tokio::time::timeout(self.timeout, handler.handle(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(HandlerError::Unhandled)) => Response::not_found(),
            Ok(Err(HandlerError::Failed(e))) => {
                self.logger
                    .log_error(&connection_message(&self.id, &format!("error: {e}")));
                Response::internal_error()
            }
            Err(_) => {
                self.logger.log_error(&connection_message(
                    &self.id,
                    "error: request handler timed out",
                ));
                Response::internal_error()
            }
        }
    }
}
