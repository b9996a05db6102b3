//! WebSocket support: the RFC 6455 upgrade handshake, the frame codec,
//! and a route handler that switches an HTTP connection over to a frame
//! loop.

pub mod frame;
pub mod handshake;

use crate::handler::{Handler, HandlerFuture};
use crate::http::request::Request;
use crate::http::response::{ResponseBuilder, StatusCode};
use crate::server::listener::BoxedSocket;

use crate::ws::frame::{read_frame, write_frame, Frame, Opcode};

/// Route handler performing the WebSocket upgrade.
///
/// Selected like any other handler. On a valid upgrade request it returns
/// a `101 Switching Protocols` response whose upgrade payload takes over
/// the socket and runs an echo frame loop; on an invalid one it returns a
/// 400 naming the failed requirement.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketHandler;

impl WebSocketHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Handler for WebSocketHandler {
    fn handle(&self, request: Request) -> HandlerFuture {
        Box::pin(async move {
            let client_key = match handshake::validate_upgrade(&request) {
                Ok(key) => key,
                Err(reason) => {
                    let body = format!("Bad Request: {reason}");
                    return Ok(ResponseBuilder::new(StatusCode::BadRequest)
                        .header("Content-Type", "text/plain")
                        .body(body.into_bytes())
                        .build());
                }
            };

            let accept = handshake::accept_key(client_key);

            Ok(ResponseBuilder::new(StatusCode::SwitchingProtocols)
                .header("Upgrade", "websocket")
                .header("Connection", "upgrade")
                .header("Sec-WebSocket-Accept", accept)
                .upgrade(echo_loop)
                .build())
        })
    }
}

/// Default frame exchange: echo every frame back unmasked until the peer
/// sends a close frame or the socket fails. A close frame is answered
/// with a close frame before the loop ends.
async fn echo_loop(mut socket: BoxedSocket) {
    loop {
        let frame = match read_frame(&mut socket).await {
            Ok(frame) => frame,
            Err(_) => return,
        };

        if frame.opcode == Opcode::Close {
            let _ = write_frame(&mut socket, &Frame::close()).await;
            return;
        }

        if write_frame(&mut socket, &frame).await.is_err() {
            return;
        }
    }
}
