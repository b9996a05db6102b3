//! End-to-end tests driving the server over real sockets.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UnixStream};
use tokio::task::JoinHandle;

use burrow::handler::HandlerError;
use burrow::http::response::ResponseBuilder;
use burrow::logger::Logger;
use burrow::ws::frame::{apply_mask, read_frame, Opcode};
use burrow::{Endpoint, Request, Response, Server, ServerConfig, StatusCode};

fn loopback_config() -> ServerConfig {
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    ServerConfig::new(addr)
}

/// Runs `start()` in its own task and waits for the listener to come up.
async fn start_server(server: &Server) -> (SocketAddr, JoinHandle<anyhow::Result<()>>) {
    let serving = tokio::spawn({
        let server = server.clone();
        async move { server.start().await }
    });
    server.wait_until_listening().await.unwrap();

    let Some(Endpoint::Tcp(addr)) = server.listening_endpoint() else {
        panic!("expected a bound TCP endpoint");
    };
    (addr, serving)
}

/// Reads exactly one response: headers plus a `Content-Length` body.
async fn read_response<S>(stream: &mut S) -> String
where
    S: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];

    loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..pos]).to_string();
            let total = pos + 4 + content_length(&head);
            while buf.len() < total {
                let n = stream.read(&mut tmp).await.unwrap();
                assert!(n > 0, "connection closed mid-response");
                buf.extend_from_slice(&tmp[..n]);
            }
            return String::from_utf8_lossy(&buf[..total]).to_string();
        }

        let n = stream.read(&mut tmp).await.unwrap();
        assert!(n > 0, "connection closed before response");
        buf.extend_from_slice(&tmp[..n]);
    }
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

fn status_of(response: &str) -> u16 {
    response
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .expect("malformed status line")
}

async fn get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    read_response(&mut stream).await
}

fn accepted_handler() -> impl burrow::Handler + 'static {
    |_req: Request| async {
        Ok::<Response, HandlerError>(ResponseBuilder::new(StatusCode::Accepted).build())
    }
}

#[tokio::test]
async fn test_routes_match_and_fall_through_to_404() {
    let server = Server::new(loopback_config());
    server.append_route("GET /accepted", |_req: Request| async {
        Ok::<Response, HandlerError>(ResponseBuilder::new(StatusCode::Accepted).build())
    });
    server.append_route("GET /gone", |_req: Request| async {
        Ok::<Response, HandlerError>(ResponseBuilder::new(StatusCode::Gone).build())
    });

    let (addr, serving) = start_server(&server).await;

    assert_eq!(status_of(&get(addr, "/accepted").await), 202);
    assert_eq!(status_of(&get(addr, "/gone").await), 410);
    assert_eq!(status_of(&get(addr, "/missing").await), 404);

    server.stop();
    serving.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_failing_handler_is_500() {
    let server = Server::new(loopback_config());
    server.append_route("GET /x", |_req: Request| async {
        Err::<Response, HandlerError>(HandlerError::Failed(anyhow::anyhow!("handler blew up")))
    });

    let (addr, serving) = start_server(&server).await;
    assert_eq!(status_of(&get(addr, "/x").await), 500);

    server.stop();
    serving.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_slow_handler_times_out_as_500() {
    let server = Server::new(
        loopback_config().with_timeout(Duration::from_millis(100)),
    );
    server.append_route("GET /x", |_req: Request| async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok::<Response, HandlerError>(Response::ok("too late"))
    });

    let (addr, serving) = start_server(&server).await;

    let started = Instant::now();
    let response = get(addr, "/x").await;
    assert_eq!(status_of(&response), 500);
    assert!(
        started.elapsed() < Duration::from_millis(900),
        "timeout did not cut the handler short"
    );

    server.stop();
    serving.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_unix_socket_end_to_end() {
    let path = std::env::temp_dir().join("foxsocks");
    let _ = std::fs::remove_file(&path);

    let logger = RecordingLogger::default();
    let server = Server::new(
        ServerConfig::new(Endpoint::unix(&path))
            .with_handler(accepted_handler())
            .with_logger(logger.clone()),
    );

    let serving = tokio::spawn({
        let server = server.clone();
        async move { server.start().await }
    });
    server.wait_until_listening().await.unwrap();

    let mut stream = UnixStream::connect(&path).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let response = read_response(&mut stream).await;
    assert_eq!(status_of(&response), 202);

    server.stop();
    serving.await.unwrap().unwrap();

    // Connection log lines are tagged with the socket path.
    let id = format!("<{}>", path.display());
    let lines = logger.lines.lock().unwrap().clone();
    assert!(
        lines.contains(&format!("{id} open connection")),
        "missing tagged open line: {lines:?}"
    );
    assert!(
        lines.contains(&format!("{id} close connection")),
        "missing tagged close line: {lines:?}"
    );
    assert!(lines.contains(&format!("starting server path: {}", path.display())));

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_keep_alive_serves_second_request() {
    let server = Server::new(loopback_config());
    server.append_route("GET /ping", |_req: Request| async {
        Ok::<Response, HandlerError>(Response::ok("pong"))
    });

    let (addr, serving) = start_server(&server).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();

    // HTTP/1.0 with an explicit keep-alive: the response must echo the
    // request's Connection header, and the socket stays usable.
    stream
        .write_all(b"GET /ping HTTP/1.0\r\nConnection: keep-alive\r\n\r\n")
        .await
        .unwrap();
    let first = read_response(&mut stream).await;
    assert_eq!(status_of(&first), 200);
    assert!(
        first.to_ascii_lowercase().contains("connection: keep-alive"),
        "response did not echo the Connection header: {first}"
    );

    stream
        .write_all(b"GET /ping HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let second = read_response(&mut stream).await;
    assert_eq!(status_of(&second), 200);

    server.stop();
    serving.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_listening_state_tracks_lifecycle() {
    let server = Server::new(loopback_config());
    assert!(!server.is_listening());
    assert!(server.listening_endpoint().is_none());

    let (_, serving) = start_server(&server).await;
    assert!(server.is_listening());

    server.stop();
    serving.await.unwrap().unwrap();
    assert!(!server.is_listening());
    assert!(server.listening_endpoint().is_none());
}

#[tokio::test]
async fn test_second_start_fails_while_listening() {
    let server = Server::new(loopback_config());
    let (_, serving) = start_server(&server).await;

    assert!(server.start().await.is_err());

    server.stop();
    serving.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_wait_until_listening_wakes_early_waiter() {
    let server = Server::new(loopback_config());

    let waiter = tokio::spawn({
        let server = server.clone();
        async move { server.wait_until_listening().await }
    });

    // Give the waiter time to register before the gate flips.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    let (_, serving) = start_server(&server).await;
    waiter.await.unwrap().unwrap();

    server.stop();
    serving.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_wait_until_listening_times_out_without_start() {
    let server = Server::new(loopback_config());
    let result = server
        .wait_until_listening_timeout(Duration::from_secs(1))
        .await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("timed out"), "got: {err}");
}

#[tokio::test]
async fn test_wait_until_listening_observes_cancellation() {
    let server = Server::new(loopback_config());

    let waiter = tokio::spawn({
        let server = server.clone();
        async move { server.wait_until_listening().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    waiter.abort();
    let err = waiter.await.unwrap_err();
    assert!(err.is_cancelled());
}

/// Collects log lines so the open/close pairing can be asserted.
#[derive(Clone, Default)]
struct RecordingLogger {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Logger for RecordingLogger {
    fn log_info(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }

    fn log_error(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }

    fn log_critical(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }
}

#[tokio::test]
async fn test_connection_log_lines_pair_up() {
    let logger = RecordingLogger::default();
    let server = Server::new(loopback_config().with_logger(logger.clone()));
    server.append_route("GET /hello", |_req: Request| async {
        Ok::<Response, HandlerError>(Response::ok("hi"))
    });

    let (addr, serving) = start_server(&server).await;
    get(addr, "/hello").await;

    server.stop();
    serving.await.unwrap().unwrap();

    let lines = logger.lines.lock().unwrap().clone();
    let opens = lines.iter().filter(|l| l.ends_with("open connection")).count();
    let closes = lines
        .iter()
        .filter(|l| l.ends_with("close connection"))
        .count();
    assert_eq!(opens, 1);
    assert_eq!(closes, 1);
    assert!(
        lines
            .iter()
            .any(|l| l.contains("request: GET /hello") && l.starts_with('<')),
        "missing request log line: {lines:?}"
    );
    assert!(lines.iter().any(|l| l.starts_with("starting server")));
}

#[test]
fn test_startup_log_strings() {
    let wildcard: SocketAddr = "0.0.0.0:1234".parse().unwrap();
    assert_eq!(
        Endpoint::Tcp(wildcard).startup_message(),
        "starting server port: 1234"
    );

    let specific: SocketAddr = "8.8.8.8:1234".parse().unwrap();
    assert_eq!(
        Endpoint::Tcp(specific).startup_message(),
        "starting server 8.8.8.8:1234"
    );

    assert_eq!(
        Endpoint::unix("/var/fox/xyz").startup_message(),
        "starting server path: /var/fox/xyz"
    );
}

#[tokio::test]
async fn test_websocket_upgrade_over_tcp() {
    let server = Server::new(loopback_config());
    server.append_route("GET /ws", burrow::ws::WebSocketHandler::new());

    let (addr, serving) = start_server(&server).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(
            b"GET /ws HTTP/1.1\r\n\
              Host: test\r\n\
              Upgrade: websocket\r\n\
              Connection: Upgrade\r\n\
              Sec-WebSocket-Key: QUJDREVGR0hJSktMTU5PUA==\r\n\
              Sec-WebSocket-Version: 13\r\n\
              \r\n",
        )
        .await
        .unwrap();

    let response = read_response(&mut stream).await;
    assert_eq!(status_of(&response), 101);
    assert!(response.contains("9twnCz4Oi2Q3EuDqLAETCuip07c="));

    // Frame echo through the upgraded socket
    let key = [1, 2, 3, 4];
    let mut payload = b"FlyingFox".to_vec();
    apply_mask(&mut payload, &key);
    let mut frame = vec![0x81, 0x89];
    frame.extend_from_slice(&key);
    frame.extend_from_slice(&payload);
    stream.write_all(&frame).await.unwrap();

    let echoed = read_frame(&mut stream).await.unwrap();
    assert_eq!(echoed.opcode, Opcode::Text);
    assert_eq!(echoed.payload, b"FlyingFox");

    // Closing the socket ends the frame loop so the drain can finish.
    drop(stream);
    server.stop();
    serving.await.unwrap().unwrap();
}
