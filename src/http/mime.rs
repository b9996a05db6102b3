/// Maps a path's extension to a `Content-Type` value.
///
/// Unknown extensions fall back to `application/octet-stream`.
pub fn content_type(path: &str) -> &'static str {
    let extension = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");

    match extension {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "wasm" => "application/wasm",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(content_type("/index.html"), "text/html; charset=utf-8");
        assert_eq!(content_type("/app.js"), "application/javascript");
        assert_eq!(content_type("/logo.svg"), "image/svg+xml");
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        assert_eq!(content_type("/data.bin"), "application/octet-stream");
        assert_eq!(content_type("/no-extension"), "application/octet-stream");
    }
}
