//! Socket lifecycle for a single backend.
//!
//! A [`Connector`] knows where the backend lives ([`Endpoint`]) and how long
//! to wait for it. It opens one [`Socket`] per call and never retries.
use std::{
    fmt, fs,
    io::{self, Read, Write},
    net::{Shutdown, TcpStream, ToSocketAddrs},
    os::unix::{fs::FileTypeExt, net::UnixStream},
    path::{Path, PathBuf},
    time::Duration,
};

use log::{debug, trace};

use crate::{error::Error, protocol::HalfClose};

/// Where the backend listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// UNIX domain socket path.
    Unix(PathBuf),
    /// `host:port` address.
    Tcp(String),
}

impl Endpoint {
    /// `host:port` strings that do not name an existing file are TCP
    /// addresses, everything else is a socket path.
    pub fn detect(peer: &str) -> Self {
        let looks_tcp = peer
            .rsplit_once(':')
            .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());

        if looks_tcp && !Path::new(peer).exists() {
            Endpoint::Tcp(peer.to_string())
        } else {
            Endpoint::Unix(PathBuf::from(peer))
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "{}", path.display()),
            Endpoint::Tcp(address) => write!(f, "{address}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Connector {
    endpoint: Endpoint,
    pub(crate) timeout: Option<Duration>,
    pub(crate) query_timeout: Option<Duration>,
}

impl Connector {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            timeout: None,
            query_timeout: None,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Opens a fresh connection to the backend.
    pub fn open(&self) -> Result<Socket, Error> {
        let socket = match &self.endpoint {
            Endpoint::Unix(path) => self.open_unix(path)?,
            Endpoint::Tcp(address) => self.open_tcp(address)?,
        };

        socket
            .set_timeouts(self.query_timeout)
            .map_err(|e| self.connect_error(e))?;

        debug!("connected to {}", self.endpoint);
        Ok(socket)
    }

    /// Closes both directions of `socket`.
    pub fn close(&self, socket: Socket) -> Result<(), Error> {
        trace!("closing connection to {}", self.endpoint);
        match socket.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(Error::Io(e)),
            _ => Ok(()),
        }
    }

    fn open_unix(&self, path: &Path) -> Result<Socket, Error> {
        let metadata = fs::metadata(path).map_err(|e| self.connect_error(e))?;
        if !metadata.file_type().is_socket() {
            return Err(self.connect_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a socket",
            )));
        }

        let stream = UnixStream::connect(path).map_err(|e| self.connect_error(e))?;
        Ok(Socket::Unix(stream))
    }

    fn open_tcp(&self, address: &str) -> Result<Socket, Error> {
        let addrs = address
            .to_socket_addrs()
            .map_err(|e| self.connect_error(e))?;

        let mut last_err = None;
        for addr in addrs {
            trace!("trying {addr}");
            let attempt = match self.timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => return Ok(Socket::Tcp(stream)),
                Err(e) => last_err = Some(e),
            }
        }

        Err(self.connect_error(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "address resolved to nothing")
        })))
    }

    fn connect_error(&self, source: io::Error) -> Error {
        Error::Connect {
            peer: self.endpoint.to_string(),
            source,
        }
    }
}

/// A connected backend socket.
#[derive(Debug)]
pub enum Socket {
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl Socket {
    fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        match self {
            Socket::Unix(s) => s.shutdown(how),
            Socket::Tcp(s) => s.shutdown(how),
        }
    }

    fn set_timeouts(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Socket::Unix(s) => {
                s.set_read_timeout(timeout)?;
                s.set_write_timeout(timeout)
            }
            Socket::Tcp(s) => {
                s.set_read_timeout(timeout)?;
                s.set_write_timeout(timeout)
            }
        }
    }

    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        match self {
            Socket::Unix(s) => s.set_nonblocking(nonblocking),
            Socket::Tcp(s) => s.set_nonblocking(nonblocking),
        }
    }

    /// Non-blocking liveness check.
    ///
    /// An idle backend connection has nothing to read. EOF, pending bytes or
    /// any error mean the socket can't carry another request. TCP sockets are
    /// peeked. UNIX sockets have no stable peek, so one byte is read; a
    /// socket with pending bytes is discarded anyway.
    pub fn is_connected(&mut self) -> bool {
        if self.set_nonblocking(true).is_err() {
            return false;
        }

        let mut buf = [0u8; 1];
        let pending = match self {
            Socket::Unix(s) => s.read(&mut buf),
            Socket::Tcp(s) => s.peek(&mut buf),
        };
        let alive = match pending {
            Err(e) => e.kind() == io::ErrorKind::WouldBlock,
            Ok(_) => false,
        };

        self.set_nonblocking(false).is_ok() && alive
    }
}

impl Read for Socket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Socket::Unix(s) => s.read(buf),
            Socket::Tcp(s) => s.read(buf),
        }
    }
}

impl Write for Socket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Socket::Unix(s) => s.write(buf),
            Socket::Tcp(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Socket::Unix(s) => s.flush(),
            Socket::Tcp(s) => s.flush(),
        }
    }
}

impl HalfClose for Socket {
    fn shutdown_write(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Write)
    }
}
