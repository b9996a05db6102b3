//! WebSocket upgrade handshake (RFC 6455 section 4.2).

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sha1::{Digest, Sha1};

use crate::http::headers::value_has_token;
use crate::http::request::Request;

/// RFC 6455 magic GUID appended to the client key for Sec-WebSocket-Accept.
const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Computes the `Sec-WebSocket-Accept` value for a client key:
/// `base64(SHA1(key + GUID))`.
pub fn accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Validates an upgrade request per RFC 6455 section 4.2.1.
///
/// Returns the client's `Sec-WebSocket-Key` on success, or the first
/// failed requirement.
pub fn validate_upgrade(request: &Request) -> Result<&str, &'static str> {
    match request.headers.get("Upgrade") {
        Some(v) if v.eq_ignore_ascii_case("websocket") => {}
        _ => return Err("missing or invalid Upgrade header"),
    }

    match request.headers.get("Connection") {
        Some(v) if value_has_token(v, "upgrade") => {}
        _ => return Err("missing or invalid Connection header"),
    }

    match request.headers.get("Sec-WebSocket-Version") {
        Some("13") => {}
        _ => return Err("missing or invalid Sec-WebSocket-Version (must be 13)"),
    }

    request
        .headers
        .get("Sec-WebSocket-Key")
        .ok_or("missing Sec-WebSocket-Key header")
}
