//! DogStatsD client over a Unix datagram socket or UDP.

use std::fmt;
use std::net::{ToSocketAddrs, UdpSocket};
#[cfg(unix)]
use std::os::unix::net::UnixDatagram;
use std::path::PathBuf;

use tracing::debug;

use crate::check::ServiceCheck;
use crate::error::{Result, StatsdError};

/// Agent socket mounted into pods by the Datadog agent.
pub const DEFAULT_ADDRESS: &str = "unix:///var/run/datadog/dsd.socket";

const UNIX_SCHEME: &str = "unix://";
const UDP_SCHEME: &str = "udp://";

/// Where the DogStatsD agent listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsdAddress {
    /// A Unix datagram socket path.
    Unix(PathBuf),
    /// A UDP `host:port`.
    Udp(String),
}

impl StatsdAddress {
    /// Parses `unix://<path>`, `udp://<host:port>` or a bare `host:port`.
    ///
    /// # Errors
    ///
    /// Returns `StatsdError::InvalidAddress` for empty values, unknown
    /// schemes, or UDP addresses without a port.
    pub fn parse(address: &str) -> Result<Self> {
        let invalid = |reason: &str| StatsdError::InvalidAddress {
            address: address.to_string(),
            reason: reason.to_string(),
        };

        let address = address.trim();
        if address.is_empty() {
            return Err(invalid("address cannot be empty"));
        }

        if let Some(path) = address.strip_prefix(UNIX_SCHEME) {
            if path.is_empty() {
                return Err(invalid("socket path cannot be empty"));
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }

        let host_port = address.strip_prefix(UDP_SCHEME).unwrap_or(address);
        if host_port.contains("://") {
            return Err(invalid("unsupported scheme"));
        }
        match host_port.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                Ok(Self::Udp(host_port.to_string()))
            }
            _ => Err(invalid("expected host:port")),
        }
    }
}

impl fmt::Display for StatsdAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix(path) => write!(f, "{UNIX_SCHEME}{}", path.display()),
            Self::Udp(host_port) => write!(f, "{UDP_SCHEME}{host_port}"),
        }
    }
}

/// Destination for encoded service checks.
pub trait ServiceCheckSink: Send + Sync {
    /// Emits one service check.
    ///
    /// # Errors
    ///
    /// Returns an error if the check cannot be encoded or sent.
    fn service_check(&self, check: &ServiceCheck) -> Result<()>;
}

enum Socket {
    #[cfg(unix)]
    Unix { socket: UnixDatagram, path: PathBuf },
    Udp(UdpSocket),
}

impl Socket {
    fn open(address: &StatsdAddress) -> Result<Self> {
        match address {
            #[cfg(unix)]
            StatsdAddress::Unix(path) => {
                let socket = UnixDatagram::unbound()?;
                socket.set_nonblocking(true)?;
                Ok(Self::Unix {
                    socket,
                    path: path.clone(),
                })
            }
            #[cfg(not(unix))]
            StatsdAddress::Unix(_) => Err(StatsdError::InvalidAddress {
                address: address.to_string(),
                reason: "unix sockets are not supported on this platform".to_string(),
            }),
            StatsdAddress::Udp(host_port) => {
                let target = host_port
                    .to_socket_addrs()
                    .map_err(|e| StatsdError::InvalidAddress {
                        address: address.to_string(),
                        reason: e.to_string(),
                    })?
                    .next()
                    .ok_or_else(|| StatsdError::InvalidAddress {
                        address: address.to_string(),
                        reason: "host did not resolve".to_string(),
                    })?;
                let bind = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
                let socket = UdpSocket::bind(bind)?;
                socket.connect(target)?;
                socket.set_nonblocking(true)?;
                Ok(Self::Udp(socket))
            }
        }
    }

    fn send(&self, datagram: &[u8]) -> std::io::Result<usize> {
        match self {
            #[cfg(unix)]
            Self::Unix { socket, path } => socket.send_to(datagram, path),
            Self::Udp(socket) => socket.send(datagram),
        }
    }
}

/// A DogStatsD client.
///
/// The Unix socket is addressed per send, so the agent may come up after
/// the client is built.
pub struct StatsdClient {
    socket: Socket,
    address: StatsdAddress,
    namespace: String,
    tags: Vec<String>,
}

impl StatsdClient {
    /// Opens a client for `address`.
    ///
    /// # Errors
    ///
    /// Returns `StatsdError::InvalidAddress` if the address cannot be parsed
    /// or resolved, or `StatsdError::Io` if the socket cannot be created.
    pub fn new(address: &str) -> Result<Self> {
        let address = StatsdAddress::parse(address)?;
        let socket = Socket::open(&address)?;
        Ok(Self {
            socket,
            address,
            namespace: String::new(),
            tags: Vec::new(),
        })
    }

    /// Sets a prefix for every check name. A trailing `.` is added if missing.
    #[must_use]
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = match namespace.trim() {
            "" => String::new(),
            ns if ns.ends_with('.') => ns.to_string(),
            ns => format!("{ns}."),
        };
        self
    }

    /// Sets tags added to every check.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Returns the agent address.
    #[must_use]
    pub const fn address(&self) -> &StatsdAddress {
        &self.address
    }

    /// Returns the name prefix.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the global tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl ServiceCheckSink for StatsdClient {
    fn service_check(&self, check: &ServiceCheck) -> Result<()> {
        let datagram = check.encode(&self.namespace, &self.tags)?;
        debug!(address = %self.address, datagram = %datagram, "sending service check");
        self.socket.send(datagram.as_bytes())?;
        Ok(())
    }
}

impl fmt::Debug for StatsdClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatsdClient")
            .field("address", &self.address)
            .field("namespace", &self.namespace)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}
