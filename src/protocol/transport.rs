use std::io::{self, Read, Write};

use log::{Level, log, trace};

use crate::error::Error;

use super::{
    Request,
    response::{HEADER_LENGTH, Header, Response},
};

const MAX_BODY_PREALLOC: usize = 64 * 1024;

/// Streams that can signal end-of-request by closing only their write half.
pub trait HalfClose {
    fn shutdown_write(&mut self) -> io::Result<()>;
}

pub struct ProtocolTransport<T: Read + Write + HalfClose> {
    stream: T,
    level: Level,
}

impl<T: Read + Write + HalfClose> ProtocolTransport<T> {
    pub fn new(stream: T) -> Self {
        Self {
            stream,
            level: Level::Debug,
        }
    }

    /// Logs requests and headers at `info` instead of `debug`.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.level = if verbose { Level::Info } else { Level::Debug };
        self
    }

    pub fn into_inner(self) -> T {
        self.stream
    }

    /// Sends `request` and marks its end.
    ///
    /// Keepalive requests end with a blank line so the connection stays
    /// usable, all others half-close the connection.
    pub fn write_request(&mut self, request: &Request) -> Result<(), Error> {
        log!(self.level, "> {}", request.message().trim_end());

        self.stream.write_all(request.message().as_bytes())?;
        if request.keepalive() {
            self.stream.write_all(b"\n")?;
            self.stream.flush()?;
        } else {
            self.stream.flush()?;
            self.stream.shutdown_write()?;
        }
        Ok(())
    }

    /// Reads the answer to `request`.
    ///
    /// Commands get no answer from the backend, nothing is read for them.
    pub fn read_response(&mut self, request: &Request) -> Result<Response, Error> {
        if !request.expects_response() {
            trace!("command sent, not waiting for a response");
            return Ok(Response::synthetic());
        }

        let header = self.read_header()?;
        log!(
            self.level,
            "< status {} content-length {}",
            header.status,
            header.content_length
        );

        let body = match header.content_length {
            0 => None,
            len => Some(self.read_body(len)?),
        };

        Ok(Response {
            status: header.status,
            body,
        })
    }

    fn read_header(&mut self) -> Result<Header, Error> {
        let mut buf = [0u8; HEADER_LENGTH];
        let read = self.read_full(&mut buf)?;
        Header::parse(&buf[..read])
    }

    // The declared length is untrusted, the buffer only grows with what
    // actually arrives.
    fn read_body(&mut self, len: usize) -> Result<Vec<u8>, Error> {
        let mut body = Vec::with_capacity(len.min(MAX_BODY_PREALLOC));
        (&mut self.stream).take(len as u64).read_to_end(&mut body)?;
        if body.len() < len {
            return Err(Error::ShortBody {
                expected: len,
                received: body.len(),
            });
        }
        Ok(body)
    }

    // Like `read_exact`, but reports how much arrived before EOF.
    fn read_full(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.stream.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Cursor;

    use crate::config::Separators;

    use super::*;

    /// In-memory stream replaying a canned backend answer.
    #[derive(Debug, Default)]
    pub(crate) struct Scripted {
        pub input: Cursor<Vec<u8>>,
        pub output: Vec<u8>,
        pub write_closed: bool,
        pub reads: usize,
    }

    impl Scripted {
        pub fn answering(bytes: &[u8]) -> Self {
            Self {
                input: Cursor::new(bytes.to_vec()),
                ..Self::default()
            }
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads += 1;
            self.input.read(buf)
        }
    }

    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.write_closed {
                return Err(io::ErrorKind::BrokenPipe.into());
            }
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl HalfClose for Scripted {
        fn shutdown_write(&mut self) -> io::Result<()> {
            self.write_closed = true;
            Ok(())
        }
    }

    pub(crate) fn fixed16(status: u16, body: &[u8]) -> Vec<u8> {
        let mut out = format!("{status:03} {:>11}\n", body.len()).into_bytes();
        out.extend_from_slice(body);
        out
    }

    fn request(statement: &str, keepalive: bool) -> Request {
        Request::build(statement, &Separators::default(), keepalive).unwrap()
    }

    #[test]
    fn write_request_half_closes() {
        let mut transport = ProtocolTransport::new(Scripted::default());
        transport.write_request(&request("GET hosts", false)).unwrap();

        let stream = transport.into_inner();
        assert!(stream.write_closed);
        assert_eq!(
            String::from_utf8(stream.output).unwrap(),
            "GET hosts\nSeparators: 10 0 44 124\nResponseHeader: fixed16\n"
        );
    }

    #[test]
    fn write_request_keepalive_ends_with_blank_line() {
        let mut transport = ProtocolTransport::new(Scripted::default());
        transport.write_request(&request("GET hosts", true)).unwrap();

        let stream = transport.into_inner();
        assert!(!stream.write_closed);
        assert!(stream.output.ends_with(b"KeepAlive: on\n\n"));
    }

    #[test]
    fn read_response_with_body() {
        let answer = fixed16(200, b"name\0alias\nlocalhost\0Local host\n");
        let mut transport = ProtocolTransport::new(Scripted::answering(&answer));

        let response = transport.read_response(&request("GET hosts", false)).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(
            response.body.as_deref(),
            Some(&b"name\0alias\nlocalhost\0Local host\n"[..])
        );
    }

    #[test]
    fn read_response_empty_body() {
        let mut answer = fixed16(200, b"");
        answer.extend_from_slice(b"trailing garbage");
        let mut transport = ProtocolTransport::new(Scripted::answering(&answer));

        let response = transport.read_response(&request("GET hosts", false)).unwrap();
        assert_eq!(response.body, None);

        let stream = transport.into_inner();
        assert_eq!(stream.input.position(), HEADER_LENGTH as u64);
    }

    #[test]
    fn command_reads_nothing() {
        let mut transport = ProtocolTransport::new(Scripted::answering(b"unexpected"));
        let response = transport
            .read_response(&request("COMMAND [0] DISABLE_HOST_CHECK;foo", false))
            .unwrap();

        assert_eq!(response, Response::synthetic());
        assert_eq!(transport.into_inner().reads, 0);
    }

    #[test]
    fn short_and_missing_headers() {
        let get = request("GET hosts", false);

        let mut transport = ProtocolTransport::new(Scripted::answering(b""));
        assert!(matches!(
            transport.read_response(&get),
            Err(Error::NoHeader)
        ));

        let mut transport = ProtocolTransport::new(Scripted::answering(b"200       "));
        let err = transport.read_response(&get).unwrap_err();
        assert!(matches!(err, Error::ShortHeader { len: 10 }));
        assert_eq!(err.code(), 498);

        let mut transport = ProtocolTransport::new(Scripted::answering(b"200     abcdefg\n"));
        assert_eq!(transport.read_response(&get).unwrap_err().code(), 499);
    }

    #[test]
    fn huge_declared_length_is_short_body() {
        let mut transport = ProtocolTransport::new(Scripted::answering(b"200 99999999999\nabc"));

        let err = transport
            .read_response(&request("GET hosts", false))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ShortBody {
                expected: 99_999_999_999,
                received: 3
            }
        ));
        assert_eq!(err.code(), 502);
    }

    #[test]
    fn short_body() {
        let mut answer = fixed16(200, b"0123456789");
        answer.truncate(answer.len() - 4);
        let mut transport = ProtocolTransport::new(Scripted::answering(&answer));

        let err = transport
            .read_response(&request("GET hosts", false))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ShortBody {
                expected: 10,
                received: 6
            }
        ));
    }
}
