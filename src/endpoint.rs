use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;

/// A stream-oriented listening endpoint.
///
/// The server binds one of three address families: IPv4 or IPv6 (both via
/// `Tcp`) or a unix-domain socket path. For unix paths the caller is
/// responsible for unlinking a stale socket file before binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

impl Endpoint {
    /// Convenience constructor binding the wildcard address on `port`.
    ///
    /// Uses the IPv6 unspecified address, which on dual-stack hosts also
    /// accepts IPv4 connections.
    pub fn port(port: u16) -> Self {
        Endpoint::Tcp(SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port))
    }

    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Endpoint::Unix(path.into())
    }

    /// The log line emitted when the server starts listening.
    ///
    /// `starting server` followed by ` port: <p>` for a wildcard address,
    /// ` <addr>:<port>` for a specific address, or ` path: <p>` for a unix
    /// socket.
    pub fn startup_message(&self) -> String {
        let mut message = String::from("starting server");
        match self {
            Endpoint::Tcp(addr) if addr.ip().is_unspecified() => {
                message.push_str(&format!(" port: {}", addr.port()));
            }
            Endpoint::Tcp(addr) => {
                message.push_str(&format!(" {}:{}", addr.ip(), addr.port()));
            }
            Endpoint::Unix(path) => {
                message.push_str(&format!(" path: {}", path.display()));
            }
        }
        message
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Endpoint::Tcp(addr)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "{addr}"),
            Endpoint::Unix(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_port_endpoint() {
        let Endpoint::Tcp(addr) = Endpoint::port(8080) else {
            panic!("expected a TCP endpoint");
        };
        assert!(addr.ip().is_unspecified());
        assert_eq!(addr.port(), 8080);
    }
}
