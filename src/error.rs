//! Error taxonomy for the livestatus client.
//!
//! Failures come in three families, all sharing the numeric [`Error::code`]
//! convention borrowed from the backend's own status codes:
//!
//! - **Remote**: the backend answered with a non-200 status in its header.
//! - **Local**: the client detected a problem before or during I/O
//!   (reserved header lines, connect failures, broken framing).
//! - **Caller misuse**: configuration mistakes and result-shaping mismatches.
//!   These carry code `0` and are never recorded as a session's last error.
use std::{fmt, io};

use thiserror::Error;

/// Header lines the client emits itself and therefore refuses to forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedHeader {
    Separators,
    OutputFormat,
    ColumnHeaders,
    ResponseHeader,
    KeepAlive,
}

impl ReservedHeader {
    pub const ALL: [ReservedHeader; 5] = [
        ReservedHeader::Separators,
        ReservedHeader::OutputFormat,
        ReservedHeader::ColumnHeaders,
        ReservedHeader::ResponseHeader,
        ReservedHeader::KeepAlive,
    ];

    /// Line prefix, including the trailing colon.
    pub fn prefix(self) -> &'static str {
        match self {
            ReservedHeader::Separators => "Separators:",
            ReservedHeader::OutputFormat => "OutputFormat:",
            ReservedHeader::ColumnHeaders => "ColumnHeaders:",
            ReservedHeader::ResponseHeader => "ResponseHeader:",
            ReservedHeader::KeepAlive => "KeepAlive:",
        }
    }

    pub fn code(self) -> u16 {
        match self {
            ReservedHeader::Separators => 492,
            ReservedHeader::OutputFormat => 493,
            ReservedHeader::ColumnHeaders => 494,
            ReservedHeader::ResponseHeader => 495,
            ReservedHeader::KeepAlive => 496,
        }
    }

    fn hint(self) -> &'static str {
        match self {
            ReservedHeader::Separators => "please use the separator options of the session",
            ReservedHeader::KeepAlive => "please use the keepalive option of the session",
            _ => "the header is set automatically",
        }
    }
}

impl fmt::Display for ReservedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} not allowed in statement, {}", self.prefix(), self.hint())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("no query")]
    EmptyStatement,

    #[error("{0}")]
    Reserved(ReservedHeader),

    #[error("failed to connect to '{peer}': {source}")]
    Connect {
        peer: String,
        #[source]
        source: io::Error,
    },

    #[error("got no header")]
    NoHeader,

    #[error("header is not exactly 16 bytes long, got {len}")]
    ShortHeader { len: usize },

    #[error("not a valid header, no status or content-length in '{raw}'")]
    InvalidHeader { raw: String },

    #[error("backend connection broken, expected {expected} body bytes, got {received}")]
    ShortBody { expected: usize, received: usize },

    #[error("socket error: {0}")]
    Io(#[from] io::Error),

    #[error("{code}: {message}")]
    Remote { code: u16, message: String },

    #[error("invalid configuration, {0}")]
    Config(String),

    #[error("key '{key}' not found in result set, available keys: {available:?}")]
    MissingKey { key: String, available: Vec<String> },

    #[error("invalid column index {0}, columns are numbered from 1")]
    InvalidColumn(usize),
}

impl Error {
    /// Numeric status code of this failure. Caller misuse reports `0`.
    pub fn code(&self) -> u16 {
        match self {
            Error::EmptyStatement => 490,
            Error::Connect { .. } => 491,
            Error::Reserved(header) => header.code(),
            Error::NoHeader => 497,
            Error::ShortHeader { .. } => 498,
            Error::InvalidHeader { .. } => 499,
            Error::Io(_) => 500,
            Error::ShortBody { .. } => 502,
            Error::Remote { code, .. } => *code,
            Error::Config(_) | Error::MissingKey { .. } | Error::InvalidColumn(_) => 0,
        }
    }

    /// Whether the failure came from the backend's status header.
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::Remote { .. })
    }

    /// Whether the failure leaves the connection in an unknown state, so a
    /// cached keepalive socket must not be reused.
    pub(crate) fn breaks_connection(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::NoHeader
                | Error::ShortHeader { .. }
                | Error::InvalidHeader { .. }
                | Error::ShortBody { .. }
        )
    }
}

/// Latest failure observed by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    pub code: u16,
    pub message: String,
}

impl From<&Error> for LastError {
    fn from(err: &Error) -> Self {
        let message = match err {
            Error::Remote { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Self {
            code: err.code(),
            message,
        }
    }
}

impl fmt::Display for LastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
