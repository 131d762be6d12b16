//! Livestatus wire protocol.
//!
//! This module frames outbound statements and decodes the backend's fixed16
//! answers. It knows nothing about sockets beyond [`HalfClose`]; connecting
//! is the job of the [`connector`](crate::connector).
//!
//! # Request
//!
//! A request is the caller's statement followed by the headers the client
//! controls itself, one per line:
//!
//! ```text
//! GET hosts
//! Columns: name alias
//! Separators: 10 0 44 124
//! ResponseHeader: fixed16
//! KeepAlive: on
//! ```
//!
//! `Separators:` and `ResponseHeader:` are only added to `GET` requests,
//! `KeepAlive:` only when the session keeps its connection open. The request
//! ends with a blank line in keepalive mode and with a write half-close
//! otherwise. Statements that already carry one of these headers, or
//! `OutputFormat:` / `ColumnHeaders:`, are rejected before anything is sent.
//!
//! # Response
//!
//! ```text
//!  status   pad        content length      newline
//! +-------+-----+---------------------------+----+
//! |  200  | ' ' |            1234           | \n |
//! +-------+-----+---------------------------+----+
//!  0..3    3     4..15, space padded         15
//! ```
//!
//! The 16-byte header is followed by exactly `content length` body bytes.
//! The body is split into lines on the line separator and into fields on the
//! column separator. Commands get no response at all.
//!
//! # Column keys
//!
//! Keys come from the statement, in this order of precedence:
//!
//! 1. a `Columns:` line names them and every row is data;
//! 2. `Stats:` lines name one key each and every row is data;
//! 3. otherwise the first body row holds the keys.
mod request;
mod response;
mod transport;

pub use request::{Heading, Request, RequestKind, check_reserved};
pub use response::{
    HEADER_LENGTH, Header, QueryResult, Response, Row, STATUS_OK, decode_body, status_message,
};
pub use transport::{HalfClose, ProtocolTransport};

#[cfg(test)]
pub(crate) use transport::tests::fixed16;
