use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpSocket, UnixListener};

use crate::endpoint::Endpoint;

/// Object-safe alias for the byte streams the server reads and writes.
///
/// Accepted TCP and unix sockets are boxed behind this trait so the
/// connection loop and upgrade handlers are independent of the address
/// family.
pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Sync + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Sync + Unpin> AsyncStream for T {}

pub type BoxedSocket = Box<dyn AsyncStream>;

/// A bound, listening socket for one of the supported address families.
/// The unix variant keeps its bound path so accepted connections can be
/// tagged with it.
pub enum Listener {
    Tcp(TcpListener),
    Unix(UnixListener, PathBuf),
}

/// Creates a socket matching the endpoint's family, enables address reuse
/// so a rapid restart can rebind, binds, and listens.
///
/// Errors are returned to the caller undecorated; logging a fatal bind
/// failure is the supervisor's call. Stale unix socket paths are the
/// caller's responsibility to unlink.
pub async fn bind(endpoint: &Endpoint) -> io::Result<Listener> {
    match endpoint {
        Endpoint::Tcp(addr) => {
            let socket = match addr {
                SocketAddr::V4(_) => TcpSocket::new_v4()?,
                SocketAddr::V6(_) => TcpSocket::new_v6()?,
            };
            socket.set_reuseaddr(true)?;
            socket.bind(*addr)?;
            Ok(Listener::Tcp(socket.listen(1024)?))
        }
        Endpoint::Unix(path) => Ok(Listener::Unix(UnixListener::bind(path)?, path.clone())),
    }
}

impl Listener {
    /// Accepts one connection, returning the socket and a peer id used to
    /// tag that connection's log lines: the peer IP for TCP, the bound
    /// socket path for unix (unix peers have no address of their own).
    pub async fn accept(&self) -> io::Result<(BoxedSocket, String)> {
        match self {
            Listener::Tcp(listener) => {
                let (socket, peer) = listener.accept().await?;
                Ok((Box::new(socket), peer.ip().to_string()))
            }
            Listener::Unix(listener, path) => {
                let (socket, _) = listener.accept().await?;
                Ok((Box::new(socket), path.display().to_string()))
            }
        }
    }

    /// The endpoint actually bound, with the OS-assigned port for port-0
    /// binds.
    pub fn local_endpoint(&self) -> io::Result<Endpoint> {
        match self {
            Listener::Tcp(listener) => Ok(Endpoint::Tcp(listener.local_addr()?)),
            Listener::Unix(_, path) => Ok(Endpoint::Unix(path.clone())),
        }
    }
}
