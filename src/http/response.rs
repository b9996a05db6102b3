use std::future::Future;
use std::pin::Pin;

use crate::http::headers::Headers;
use crate::server::listener::BoxedSocket;

/// HTTP status codes produced by the server and its handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 101 Switching Protocols
    SwitchingProtocols,
    /// 200 OK
    Ok,
    /// 201 Created
    Created,
    /// 202 Accepted
    Accepted,
    /// 204 No Content
    NoContent,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 410 Gone
    Gone,
    /// 500 Internal Server Error
    InternalServerError,
    /// 503 Service Unavailable
    ServiceUnavailable,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use burrow::http::response::StatusCode;
    /// let status = StatusCode::Gone;
    /// assert_eq!((status.as_u16(), status.reason_phrase()), (410, "Gone"));
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::SwitchingProtocols => 101,
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::Accepted => 202,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::Gone => 410,
            StatusCode::InternalServerError => 500,
            StatusCode::ServiceUnavailable => 503,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::SwitchingProtocols => "Switching Protocols",
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::Accepted => "Accepted",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::Gone => "Gone",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// 1xx and 204 responses carry no body, so no `Content-Length` is
    /// synthesized for them.
    fn allows_content_length(&self) -> bool {
        !matches!(self, StatusCode::SwitchingProtocols | StatusCode::NoContent)
    }
}

type UpgradeFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Protocol-switch payload attached to a 101 response.
///
/// When the connection loop sees a response carrying an `Upgrade`, it
/// writes the response and then hands the socket to this callback instead
/// of returning to the request loop. The callback owns the socket for the
/// rest of the connection's life.
pub struct Upgrade(Box<dyn FnOnce(BoxedSocket) -> UpgradeFuture + Send + Sync>);

impl Upgrade {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce(BoxedSocket) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self(Box::new(move |socket| Box::pin(f(socket))))
    }

    /// Consumes the socket and runs the switched protocol to completion.
    pub async fn run(self, socket: BoxedSocket) {
        (self.0)(socket).await;
    }
}

impl std::fmt::Debug for Upgrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Upgrade")
    }
}

/// A complete HTTP response ready to be sent to a client.
#[derive(Debug)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// HTTP headers, in write order
    pub headers: Headers,
    /// Response body as bytes
    pub body: Vec<u8>,
    /// Protocol switch to run after this response is written
    pub upgrade: Option<Upgrade>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let created = ResponseBuilder::new(StatusCode::Created)
///     .header("Location", "/fish/42")
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Headers,
    body: Vec<u8>,
    upgrade: Option<Upgrade>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
            upgrade: None,
        }
    }

    /// Adds a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(key, value);
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Attaches a protocol switch to run once the response is written.
    pub fn upgrade<F, Fut>(mut self, f: F) -> Self
    where
        F: FnOnce(BoxedSocket) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.upgrade = Some(Upgrade::new(f));
        self
    }

    /// Builds the final Response.
    ///
    /// Adds a `Content-Length` header based on body size if the status
    /// permits one and none is present.
    pub fn build(self) -> Response {
        let mut response = Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
            upgrade: self.upgrade,
        };

        let needs_length = response.status.allows_content_length()
            && response.headers.get("Content-Length").is_none();
        if needs_length {
            let length = response.body.len().to_string();
            response.headers.append("Content-Length", length);
        }

        response
    }
}

impl Response {
    /// Creates a simple 200 OK response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .body(body.into())
            .build()
    }

    /// Creates a 404 Not Found response.
    pub fn not_found() -> Self {
        Self::canned(StatusCode::NotFound)
    }

    /// Creates a 500 Internal Server Error response.
    pub fn internal_error() -> Self {
        Self::canned(StatusCode::InternalServerError)
    }

    /// A synthesized response whose body repeats the status line, e.g.
    /// `404 Not Found`.
    fn canned(status: StatusCode) -> Self {
        let body = format!("{} {}", status.as_u16(), status.reason_phrase());
        ResponseBuilder::new(status).body(body.into_bytes()).build()
    }
}
