//! Request/response sessions against one backend.
//!
//! A [`Session`] owns its [`Config`], the optional keepalive connection and
//! the last error it observed. Every query runs synchronously:
//!
//! ```text
//! build request -> open -> write -> (half-close) -> read -> close -> decode
//! ```
//!
//! Without keepalive each query owns a fresh connection. With keepalive the
//! connection is cached after a successful exchange and reused as long as it
//! still looks alive. Any connection-level failure discards it, so the next
//! query reconnects.
//!
//! # Example
//! ```no_run
//! use livestatus::{Config, Session};
//!
//! let mut session = Session::new(Config::unix("/var/run/naemon/live").with_keepalive(true));
//!
//! let hosts = session
//!     .query("GET hosts\nColumns: name state")
//!     .unwrap()
//!     .unwrap();
//! for row in hosts.rows {
//!     println!("{} is in state {}", row[0], row[1]);
//! }
//! ```
use log::{debug, trace, warn};

use crate::{
    config::Config,
    connector::Socket,
    error::{Error, LastError},
    protocol::{ProtocolTransport, QueryResult, Request},
};

#[derive(Debug)]
pub struct Session {
    config: Config,
    socket: Option<Socket>,
    last_error: Option<LastError>,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            socket: None,
            last_error: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Display name of the backend.
    pub fn peer_name(&self) -> String {
        self.config.name()
    }

    /// Socket path or `host:port` of the backend.
    pub fn peer_addr(&self) -> String {
        self.config.connector().endpoint().to_string()
    }

    pub fn errors_are_fatal(&self) -> bool {
        self.config.errors_are_fatal()
    }

    /// Chooses between returning failures as `Err` or recording them as
    /// [`last_error`](Self::last_error) and returning `Ok(None)`.
    pub fn set_errors_are_fatal(&mut self, fatal: bool) {
        self.config.set_errors_are_fatal(fatal);
    }

    /// Failure of the most recent query, if it failed.
    pub fn last_error(&self) -> Option<&LastError> {
        self.last_error.as_ref()
    }

    /// Drops the cached keepalive connection, if any.
    pub fn disconnect(&mut self) {
        if let Some(socket) = self.socket.take() {
            if let Err(e) = self.config.connector().close(socket) {
                debug!("closing cached connection: {e}");
            }
        }
    }

    /// Sends `statement` and decodes the answer.
    ///
    /// Returns `Ok(None)` only for failures when errors are not fatal.
    /// Commands succeed with an empty result.
    pub fn query(&mut self, statement: &str) -> Result<Option<QueryResult>, Error> {
        self.last_error = None;

        match self.execute(statement) {
            Ok(result) => Ok(Some(result)),
            Err(err) => {
                self.record(err)?;
                Ok(None)
            }
        }
    }

    /// Sends a statement whose result is not needed, typically a command.
    pub fn do_command(&mut self, statement: &str) -> Result<bool, Error> {
        Ok(self.query(statement)?.is_some())
    }

    fn record(&mut self, err: Error) -> Result<(), Error> {
        let last = LastError::from(&err);
        if err.is_remote() {
            debug!("{} answered {last}", self.peer_name());
        } else {
            warn!("query to {} failed: {last}", self.peer_name());
        }

        self.last_error = Some(last);
        if self.config.errors_are_fatal() {
            Err(err)
        } else {
            Ok(())
        }
    }

    fn execute(&mut self, statement: &str) -> Result<QueryResult, Error> {
        let separators = self.config.separators();
        let request = Request::build(statement, &separators, self.config.keepalive())?;

        let socket = self.open()?;
        let mut transport = ProtocolTransport::new(socket).verbose(self.config.verbose());
        let exchanged = transport
            .write_request(&request)
            .and_then(|_| transport.read_response(&request));
        let socket = transport.into_inner();

        let response = match exchanged {
            Ok(response) => response,
            Err(err) => {
                debug!("dropping connection to {}: {err}", self.peer_addr());
                return Err(err);
            }
        };

        if let Err(e) = self.close(socket) {
            warn!("failed to close connection to {}: {e}", self.peer_addr());
        }

        let body = response.into_body()?;
        Ok(QueryResult::decode(
            body.as_deref(),
            &separators,
            request.heading(),
        ))
    }

    fn open(&mut self) -> Result<Socket, Error> {
        if self.config.keepalive() {
            if let Some(mut socket) = self.socket.take() {
                if socket.is_connected() {
                    trace!("reusing connection to {}", self.peer_addr());
                    return Ok(socket);
                }
                debug!("cached connection to {} is gone, reconnecting", self.peer_addr());
            }
        }

        self.config.connector().open()
    }

    fn close(&mut self, socket: Socket) -> Result<(), Error> {
        if self.config.keepalive() {
            self.socket = Some(socket);
            return Ok(());
        }
        self.config.connector().close(socket)
    }
}
