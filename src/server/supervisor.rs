use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::endpoint::Endpoint;
use crate::handler::Handler;
use crate::http::connection::Connection;
use crate::logger::{Logger, TracingLogger};
use crate::router::Router;
use crate::server::listener::{self, Listener};

/// Default per-request handler deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Server configuration.
pub struct ServerConfig {
    endpoint: Endpoint,
    timeout: Duration,
    logger: Arc<dyn Logger>,
    handler: Option<Arc<dyn Handler>>,
}

impl ServerConfig {
    /// Creates a configuration listening on the given endpoint.
    pub fn new(endpoint: impl Into<Endpoint>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: DEFAULT_TIMEOUT,
            logger: Arc::new(TracingLogger),
            handler: None,
        }
    }

    /// Creates a configuration listening on the wildcard address.
    pub fn port(port: u16) -> Self {
        Self::new(Endpoint::port(port))
    }

    /// Sets the per-request handler deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the log sink.
    pub fn with_logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// Installs a catch-all handler as route `"*"`.
    pub fn with_handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }
}

/// The HTTP server supervisor.
///
/// Owns the route table, the per-request timeout, the logger, and, while
/// serving, the listening socket. Cheap to clone; clones share all state,
/// which is how `stop()` reaches a server whose `start()` another task is
/// awaiting.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(ServerConfig::port(8080));
/// server.append_route("GET /hello", |_req| async {
///     Ok(Response::ok("hello"))
/// });
/// server.start().await?;
/// ```
#[derive(Clone)]
pub struct Server {
    inner: Arc<Inner>,
}

struct Inner {
    endpoint: Endpoint,
    timeout: Duration,
    router: Arc<RwLock<Router>>,
    logger: Arc<dyn Logger>,
    /// Guards against concurrent `start()` calls
    active: AtomicBool,
    /// Readiness gate: set on bind+listen, cleared on stop or teardown
    listening_tx: watch::Sender<bool>,
    stop_tx: watch::Sender<bool>,
    bound: Mutex<Option<Endpoint>>,
}

/// Clears the readiness state however `start()` ends, including
/// cancellation of the task awaiting it.
struct ListeningGuard<'a> {
    inner: &'a Inner,
}

impl Drop for ListeningGuard<'_> {
    fn drop(&mut self) {
        self.inner.listening_tx.send_replace(false);
        *self.inner.bound.lock() = None;
        self.inner.active.store(false, Ordering::SeqCst);
    }
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        let mut router = Router::new();
        if let Some(handler) = config.handler {
            router.append("*", handler);
        }

        Self {
            inner: Arc::new(Inner {
                endpoint: config.endpoint,
                timeout: config.timeout,
                router: Arc::new(RwLock::new(router)),
                logger: config.logger,
                active: AtomicBool::new(false),
                listening_tx: watch::channel(false).0,
                stop_tx: watch::channel(false).0,
                bound: Mutex::new(None),
            }),
        }
    }

    /// Appends a route; permitted before and while serving. The route is
    /// visible to every request dispatched after this call returns.
    pub fn append_route<H>(&self, pattern: &str, handler: H)
    where
        H: Handler + 'static,
    {
        self.inner.router.write().append(pattern, Arc::new(handler));
    }

    pub fn is_listening(&self) -> bool {
        *self.inner.listening_tx.borrow()
    }

    /// The bound endpoint while listening, carrying the OS-assigned port
    /// for port-0 binds.
    pub fn listening_endpoint(&self) -> Option<Endpoint> {
        self.inner.bound.lock().clone()
    }

    /// Binds the endpoint and serves until [`stop`](Self::stop) or a
    /// fatal error.
    ///
    /// Fails if the server is already listening. On a graceful stop,
    /// in-flight connections drain before this returns; cancelling the
    /// task awaiting `start()` instead closes the listener and aborts
    /// them.
    pub async fn start(&self) -> anyhow::Result<()> {
        if self.inner.active.swap(true, Ordering::SeqCst) {
            anyhow::bail!("server is already listening");
        }
        let guard = ListeningGuard { inner: &self.inner };
        self.inner.stop_tx.send_replace(false);

        let listener = match listener::bind(&self.inner.endpoint).await {
            Ok(listener) => listener,
            Err(e) => {
                self.inner
                    .logger
                    .log_critical(&format!("failed to bind {}: {e}", self.inner.endpoint));
                return Err(e.into());
            }
        };
        let bound = listener.local_endpoint()?;
        self.inner.logger.log_info(&bound.startup_message());

        *self.inner.bound.lock() = Some(bound);
        self.inner.listening_tx.send_replace(true);

        let result = self.accept_loop(listener).await;
        drop(guard);

        if let Err(e) = &result {
            self.inner.logger.log_critical(&format!("server failed: {e}"));
        }
        result
    }

    /// Stops accepting connections. Idempotent; a no-op when not
    /// listening.
    ///
    /// This is the graceful path: the readiness gate clears, the accept
    /// loop closes the listening socket, and in-flight connections run to
    /// completion before `start()` returns.
    pub fn stop(&self) {
        if *self.inner.listening_tx.borrow() {
            self.inner.listening_tx.send_replace(false);
        }
        self.inner.stop_tx.send_replace(true);
    }

    /// Returns once the server is listening; immediately if it already
    /// is. Fails if the server is torn down first. Dropping the returned
    /// future (task cancellation) detaches this waiter and nobody else.
    pub async fn wait_until_listening(&self) -> anyhow::Result<()> {
        let mut rx = self.inner.listening_tx.subscribe();
        rx.wait_for(|listening| *listening)
            .await
            .map(|_| ())
            .map_err(|_| anyhow::anyhow!("server was shut down"))
    }

    /// [`wait_until_listening`](Self::wait_until_listening) with a
    /// deadline; fails with a timeout error when it expires.
    pub async fn wait_until_listening_timeout(&self, timeout: Duration) -> anyhow::Result<()> {
        tokio::time::timeout(timeout, self.wait_until_listening())
            .await
            .map_err(|_| anyhow::anyhow!("timed out waiting for the server to listen"))?
    }

    /// Accepts connections until stopped, spawning one task per
    /// connection.
    ///
    /// A stop signal or a closed listener exits the loop and drains the
    /// in-flight connection tasks; any other accept error aborts them and
    /// propagates.
    async fn accept_loop(&self, listener: Listener) -> anyhow::Result<()> {
        let mut stop_rx = self.inner.stop_tx.subscribe();
        let mut connections: JoinSet<()> = JoinSet::new();

        // The fatal-error and stop paths both need an `.await` (shutdown or
        // drain) that can't live inside a `select!` arm without defeating
        // the futures' `Send`-ness, so the loop only records which exit
        // happened and the awaiting happens once, after the loop.
        let exit = loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer)) => {
                        let connection = Connection::new(
                            socket,
                            peer,
                            Arc::clone(&self.inner.router),
                            self.inner.timeout,
                            Arc::clone(&self.inner.logger),
                        );
                        connections.spawn(connection.run());
                    }
                    // Listening socket closed under us: graceful shutdown
                    Err(e) if e.kind() == io::ErrorKind::NotConnected => break AcceptLoopExit::Stopped,
                    // The peer vanished between connect and accept
                    Err(e) if is_transient_accept_error(&e) => {
                        self.inner.logger.log_error(&format!("accept failed: {e}"));
                    }
                    Err(e) => break AcceptLoopExit::Fatal(e),
                },

                _ = stop_rx.wait_for(|stopped| *stopped) => break AcceptLoopExit::Stopped,

                // Reap finished connection tasks as we go
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        };

        match exit {
            AcceptLoopExit::Fatal(e) => {
                connections.shutdown().await;
                Err(e.into())
            }
            AcceptLoopExit::Stopped => {
                // Stop accepting, then drain whatever is still in flight.
                drop(listener);
                while connections.join_next().await.is_some() {}
                Ok(())
            }
        }
    }
}

/// Why [`Supervisor::accept_loop`] stopped accepting connections.
enum AcceptLoopExit {
    Stopped,
    Fatal(io::Error),
}

fn is_transient_accept_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted | io::ErrorKind::ConnectionReset
    )
}
