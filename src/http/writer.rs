use anyhow::Context;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::Response;

/// Serializes a response into one buffer: status line, headers in
/// insertion order, blank line, body.
pub fn serialize_response(response: &Response) -> Vec<u8> {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\n",
        response.status.as_u16(),
        response.status.reason_phrase()
    );
    for (name, value) in response.headers.iter() {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");

    let mut bytes = head.into_bytes();
    bytes.extend_from_slice(&response.body);
    bytes
}

/// Writes one serialized response to the stream in full and flushes it.
pub async fn write_response<W>(stream: &mut W, response: &Response) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    stream
        .write_all(&serialize_response(response))
        .await
        .context("failed to write response")?;
    stream.flush().await.context("failed to flush response")?;
    Ok(())
}
