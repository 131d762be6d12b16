use log::trace;

use crate::{config::Separators, error::Error};

use super::request::Heading;

pub const HEADER_LENGTH: usize = 16;
pub const STATUS_OK: u16 = 200;

// The content length field starts after the 3 digit status and one padding
// byte. The padding is not validated.
const CONTENT_LENGTH_OFFSET: usize = 4;

/// One decoded body row.
pub type Row = Vec<String>;

/// The fixed16 response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub status: u16,
    pub content_length: usize,
}

impl Header {
    /// Parses exactly [`HEADER_LENGTH`] bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        match bytes.len() {
            0 => return Err(Error::NoHeader),
            HEADER_LENGTH => {}
            len => return Err(Error::ShortHeader { len }),
        }

        let invalid = || Error::InvalidHeader {
            raw: String::from_utf8_lossy(bytes).trim_end().to_string(),
        };

        let status = std::str::from_utf8(&bytes[..3])
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .ok_or_else(invalid)?;
        let content_length = std::str::from_utf8(&bytes[CONTENT_LENGTH_OFFSET..])
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .ok_or_else(invalid)?;

        Ok(Self {
            status,
            content_length,
        })
    }
}

/// Fixed descriptions of the statuses the backend documents.
pub fn status_message(status: u16) -> &'static str {
    match status {
        200 => "OK, response contains the queried data.",
        400 | 401 => "The request contains an invalid header.",
        402 => "The request is completely invalid.",
        403 => "The request is incomplete.",
        404 => "The target of the GET has not been found (e.g. the table).",
        405 => "A non-existing column was being referred to.",
        413 => "Maximum response size reached.",
        452 => "Internal backend error.",
        _ => "Unknown status code.",
    }
}

/// A raw response as read off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Option<Vec<u8>>,
}

impl Response {
    /// The response a command gets without anything being read.
    pub fn synthetic() -> Self {
        Self {
            status: STATUS_OK,
            body: None,
        }
    }

    /// Turns any non-200 status into a remote error carrying the body as
    /// diagnostic text.
    pub fn into_body(self) -> Result<Option<Vec<u8>>, Error> {
        if self.status == STATUS_OK {
            return Ok(self.body);
        }

        let mut message = status_message(self.status).to_string();
        if let Some(body) = &self.body {
            let detail = String::from_utf8_lossy(body);
            let detail = detail.trim();
            if !detail.is_empty() {
                message.push(' ');
                message.push_str(detail);
            }
        }

        Err(Error::Remote {
            code: self.status,
            message,
        })
    }
}

/// Splits a body into rows of fields.
///
/// One trailing line separator terminates the last line. Consecutive column
/// separators yield empty fields.
pub fn decode_body(body: &[u8], separators: &Separators) -> Vec<Row> {
    let body = body.strip_suffix(&[separators.line]).unwrap_or(body);
    if body.is_empty() {
        return Vec::new();
    }

    body.split(|b| *b == separators.line)
        .map(|line| {
            line.split(|b| *b == separators.column)
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect()
        })
        .collect()
}

/// Column keys and data rows of one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub keys: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    /// Decodes `body` and applies the heading rule of the request.
    pub fn decode(body: Option<&[u8]>, separators: &Separators, heading: &Heading) -> Self {
        let mut rows = body
            .map(|body| decode_body(body, separators))
            .unwrap_or_default();

        let keys = match heading {
            Heading::Columns(keys) | Heading::Stats(keys) => keys.clone(),
            Heading::FirstRow if rows.is_empty() => Vec::new(),
            Heading::FirstRow => rows.remove(0),
        };

        trace!("decoded {} rows with keys {keys:?}", rows.len());
        Self { keys, rows }
    }
}
