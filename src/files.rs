//! Static file serving as an ordinary route handler.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::handler::{Handler, HandlerError, HandlerFuture};
use crate::http::mime::content_type;
use crate::http::request::{Method, Request};
use crate::http::response::{ResponseBuilder, StatusCode};

/// Serves files from a root directory.
///
/// - only GET is accepted (405 for other methods)
/// - `/` is rewritten to the index file
/// - paths containing `..` are rejected (400)
/// - `Content-Type` is derived from the file extension
/// - a missing file reports `Unhandled`, which the server maps to 404,
///   so a later route can still claim the path
pub struct FileHandler {
    root: PathBuf,
    index: String,
}

impl FileHandler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index: "index.html".to_string(),
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }
}

impl Handler for FileHandler {
    fn handle(&self, request: Request) -> HandlerFuture {
        let root = self.root.clone();
        let index = self.index.clone();

        Box::pin(async move {
            if request.method != Method::GET {
                return Ok(ResponseBuilder::new(StatusCode::MethodNotAllowed)
                    .body(b"405 Method Not Allowed".to_vec())
                    .build());
            }

            let mut path = request.path.clone();
            if path == "/" {
                path = format!("/{index}");
            }

            // Prevent path traversal
            if path.contains("..") {
                return Ok(ResponseBuilder::new(StatusCode::BadRequest)
                    .body(b"400 Bad Request".to_vec())
                    .build());
            }

            let full_path: PathBuf = Path::new(&root).join(path.trim_start_matches('/'));

            match fs::read(&full_path).await {
                Ok(contents) => Ok(ResponseBuilder::new(StatusCode::Ok)
                    .header("Content-Type", content_type(&path))
                    .body(contents)
                    .build()),
                Err(_) => Err(HandlerError::Unhandled),
            }
        })
    }
}
