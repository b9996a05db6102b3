use crate::http::headers::{value_has_token, Headers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    HEAD,
    OPTIONS,
    PATCH,
}

impl Method {
    /// Every method the server recognizes.
    pub const ALL: [Method; 7] = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::HEAD,
        Method::OPTIONS,
        Method::PATCH,
    ];

    pub fn from_str(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|method| method.as_str() == token)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub version: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Request {
    /// Starts building a request from the two fields every request has;
    /// everything else defaults (HTTP/1.1, no query, no headers, empty
    /// body).
    pub fn builder(method: Method, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder {
            request: Request {
                method,
                path: path.into(),
                query: String::new(),
                version: "HTTP/1.1".to_string(),
                headers: Headers::new(),
                body: Vec::new(),
            },
        }
    }

    /// Whether the connection may be reused after this request.
    ///
    /// HTTP/1.1 defaults to keep-alive unless the request carries
    /// `Connection: close`; HTTP/1.0 requires an explicit
    /// `Connection: keep-alive`.
    pub fn keep_alive(&self) -> bool {
        let connection = self.headers.get("Connection");
        if self.version == "HTTP/1.0" {
            connection.is_some_and(|v| value_has_token(v, "keep-alive"))
        } else {
            !connection.is_some_and(|v| value_has_token(v, "close"))
        }
    }
}

/// Assembles a [`Request`] field by field, mainly for tests and embedders
/// that construct requests without going through the parser.
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.request.query = query.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.request.version = version.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.append(name, value);
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.request.body = body;
        self
    }

    pub fn build(self) -> Request {
        self.request
    }
}
