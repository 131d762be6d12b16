//! Construction-time configuration for a [`Session`](crate::Session).
//!
//! A [`Config`] is either built with the typed `with_*` setters or parsed from
//! the recognized key/value option surface with [`Config::from_options`].
//!
//! # Example
//! ```rust
//! use livestatus::Config;
//!
//! let config = Config::from_options([
//!     ("socket", "/var/run/naemon/live"),
//!     ("keepalive", "on"),
//!     ("column_separator", "59"),
//! ])
//! .unwrap();
//!
//! assert!(config.keepalive());
//! assert_eq!(config.separators().column, b';');
//! ```
use std::{path::PathBuf, time::Duration};

use crate::{
    connector::{Connector, Endpoint},
    error::Error,
};

pub const DEFAULT_LINE_SEPARATOR: u8 = b'\n';
pub const DEFAULT_COLUMN_SEPARATOR: u8 = 0;
pub const DEFAULT_LIST_SEPARATOR: u8 = b',';
pub const DEFAULT_HOST_SERVICE_SEPARATOR: u8 = b'|';

/// Byte values delimiting the tabular body.
///
/// Only `line` and `column` are interpreted by the client; `list` and
/// `host_service` are forwarded to the backend and appear verbatim inside
/// field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Separators {
    pub line: u8,
    pub column: u8,
    pub list: u8,
    pub host_service: u8,
}

impl Default for Separators {
    fn default() -> Self {
        Self {
            line: DEFAULT_LINE_SEPARATOR,
            column: DEFAULT_COLUMN_SEPARATOR,
            list: DEFAULT_LIST_SEPARATOR,
            host_service: DEFAULT_HOST_SERVICE_SEPARATOR,
        }
    }
}

impl Separators {
    /// The `Separators:` request header carrying these byte codes.
    pub fn header_line(&self) -> String {
        format!(
            "Separators: {} {} {} {}",
            self.line, self.column, self.list, self.host_service
        )
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    connector: Connector,
    separators: Separators,
    keepalive: bool,
    errors_are_fatal: bool,
    verbose: bool,
    name: Option<String>,
}

impl Config {
    fn new(endpoint: Endpoint) -> Self {
        Self {
            connector: Connector::new(endpoint),
            separators: Separators::default(),
            keepalive: false,
            errors_are_fatal: true,
            verbose: false,
            name: None,
        }
    }

    /// Connects through the UNIX socket at `path`.
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Self::new(Endpoint::Unix(path.into()))
    }

    /// Connects through TCP to `address` (`host:port`).
    pub fn tcp(address: impl Into<String>) -> Self {
        Self::new(Endpoint::Tcp(address.into()))
    }

    /// Detects the transport from `peer`: TCP when it looks like
    /// `host:port` and is not an existing path, UNIX socket otherwise.
    pub fn peer(peer: &str) -> Self {
        Self::new(Endpoint::detect(peer))
    }

    /// Parses the recognized option surface.
    ///
    /// Exactly one of `socket`, `server` or `peer` must be present, unknown
    /// keys are rejected.
    pub fn from_options<I, K, V>(options: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut endpoint = None;
        let mut separators = Separators::default();
        let mut keepalive = false;
        let mut errors_are_fatal = true;
        let mut verbose = false;
        let mut name = None;
        let mut timeout = None;
        let mut query_timeout = None;

        for (key, value) in options {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "socket" | "server" | "peer" => {
                    if endpoint.is_some() {
                        return Err(Error::Config(
                            "only one of 'socket', 'server' or 'peer' may be given".into(),
                        ));
                    }
                    endpoint = Some(match key {
                        "socket" => Endpoint::Unix(PathBuf::from(value)),
                        "server" => Endpoint::Tcp(value.to_string()),
                        _ => Endpoint::detect(value),
                    });
                }
                "verbose" => verbose = parse_bool(key, value)?,
                "keepalive" => keepalive = parse_bool(key, value)?,
                "errors_are_fatal" => errors_are_fatal = parse_bool(key, value)?,
                "line_separator" => separators.line = parse_byte(key, value)?,
                "column_separator" => separators.column = parse_byte(key, value)?,
                "list_separator" => separators.list = parse_byte(key, value)?,
                "host_service_separator" => separators.host_service = parse_byte(key, value)?,
                "name" => name = Some(value.to_string()),
                "timeout" => timeout = Some(parse_seconds(key, value)?),
                "query_timeout" => query_timeout = Some(parse_seconds(key, value)?),
                unknown => return Err(Error::Config(format!("unknown option '{unknown}'"))),
            }
        }

        let endpoint = endpoint.ok_or_else(|| {
            Error::Config("one of 'socket', 'server' or 'peer' is required".into())
        })?;

        let mut config = Self::new(endpoint)
            .with_separators(separators)
            .with_keepalive(keepalive)
            .with_errors_are_fatal(errors_are_fatal)
            .with_verbose(verbose);
        config.name = name;
        config.connector.timeout = timeout;
        config.connector.query_timeout = query_timeout;
        Ok(config)
    }

    pub fn with_separators(mut self, separators: Separators) -> Self {
        self.separators = separators;
        self
    }

    pub fn with_keepalive(mut self, keepalive: bool) -> Self {
        self.keepalive = keepalive;
        self
    }

    pub fn with_errors_are_fatal(mut self, fatal: bool) -> Self {
        self.errors_are_fatal = fatal;
        self
    }

    pub(crate) fn set_errors_are_fatal(&mut self, fatal: bool) {
        self.errors_are_fatal = fatal;
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Bounds each connect attempt.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connector.timeout = Some(timeout);
        self
    }

    /// Socket read/write timeout applied after connecting.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.connector.query_timeout = Some(timeout);
        self
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    pub fn separators(&self) -> Separators {
        self.separators
    }

    pub fn keepalive(&self) -> bool {
        self.keepalive
    }

    pub fn errors_are_fatal(&self) -> bool {
        self.errors_are_fatal
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Display name, defaulting to the peer address.
    pub fn name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.connector.endpoint().to_string())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, Error> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" | "" => Ok(false),
        other => Err(Error::Config(format!(
            "'{key}' expects a boolean, got '{other}'"
        ))),
    }
}

fn parse_byte(key: &str, value: &str) -> Result<u8, Error> {
    value.trim().parse::<u8>().map_err(|_| {
        Error::Config(format!(
            "'{key}' expects a byte value between 0 and 255, got '{value}'"
        ))
    })
}

fn parse_seconds(key: &str, value: &str) -> Result<Duration, Error> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .map(Duration::from_secs_f64)
        .ok_or_else(|| Error::Config(format!("'{key}' expects a positive number of seconds")))
}
