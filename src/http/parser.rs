use crate::http::headers::Headers;
use crate::http::request::{Method, Request};

/// Errors that can occur during HTTP request parsing.
#[derive(Debug)]
pub enum ParseError {
    /// The request line is malformed
    InvalidRequest,
    /// The HTTP method is not recognized
    InvalidMethod,
    /// The HTTP version token is malformed
    InvalidVersion,
    /// A header line is malformed
    InvalidHeader,
    /// Content-Length header value is not a valid number
    InvalidContentLength,
    /// The request is incomplete and more data is needed
    Incomplete,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "malformed request line"),
            Self::InvalidMethod => write!(f, "unrecognized HTTP method"),
            Self::InvalidVersion => write!(f, "malformed HTTP version"),
            Self::InvalidHeader => write!(f, "malformed header line"),
            Self::InvalidContentLength => write!(f, "invalid Content-Length"),
            Self::Incomplete => write!(f, "incomplete request"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parses one HTTP request from the front of a byte buffer.
///
/// Consumes CRLF-terminated lines one at a time: the request line, then
/// header lines until a blank line, then a body of `Content-Length`
/// bytes. The request target is split into path and query at the first
/// `?`.
///
/// On success returns the request and the number of bytes it occupied,
/// so a caller holding pipelined data can resume at that offset.
/// `ParseError::Incomplete` means the buffer holds a valid prefix and
/// more bytes are needed before a verdict is possible.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    let mut lines = LineScanner::new(buf);

    let (method, target, version) = split_request_line(lines.next_line()?)?;
    let (path, query) = split_target(target);

    let mut headers = Headers::new();
    loop {
        let line = lines.next_line()?;
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;
        headers.append(name.trim(), value.trim());
    }

    let body_start = lines.offset();
    let body_len = declared_body_length(&headers)?;
    if buf.len() - body_start < body_len {
        return Err(ParseError::Incomplete);
    }

    let request = Request {
        method,
        path: path.to_string(),
        query: query.to_string(),
        version: version.to_string(),
        headers,
        body: buf[body_start..body_start + body_len].to_vec(),
    };

    Ok((request, body_start + body_len))
}

/// CRLF-delimited cursor over the front of a byte buffer.
struct LineScanner<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> LineScanner<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Consumes one line, not including its CRLF terminator. Fails with
    /// `Incomplete` until the terminator has arrived.
    fn next_line(&mut self) -> Result<&'a str, ParseError> {
        let rest = &self.buf[self.pos..];
        let len = rest
            .windows(2)
            .position(|sep| sep == b"\r\n")
            .ok_or(ParseError::Incomplete)?;
        self.pos += len + 2;
        std::str::from_utf8(&rest[..len]).map_err(|_| ParseError::InvalidRequest)
    }

    /// Bytes consumed so far.
    fn offset(&self) -> usize {
        self.pos
    }
}

fn split_request_line(line: &str) -> Result<(Method, &str, &str), ParseError> {
    let mut tokens = line.splitn(3, ' ');

    let method = match tokens.next() {
        Some(token) if !token.is_empty() => {
            Method::from_str(token).ok_or(ParseError::InvalidMethod)?
        }
        _ => return Err(ParseError::InvalidRequest),
    };
    let target = tokens.next().ok_or(ParseError::InvalidRequest)?;
    let version = tokens.next().ok_or(ParseError::InvalidRequest)?;

    if !version.starts_with("HTTP/") {
        return Err(ParseError::InvalidVersion);
    }

    Ok((method, target, version))
}

fn split_target(target: &str) -> (&str, &str) {
    match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (target, ""),
    }
}

fn declared_body_length(headers: &Headers) -> Result<usize, ParseError> {
    match headers.get("Content-Length") {
        Some(value) => value.parse().map_err(|_| ParseError::InvalidContentLength),
        None => Ok(0),
    }
}
