//! Fake livestatus backend for tests.
use std::{
    collections::VecDeque,
    io::{BufRead, BufReader, Read, Write},
    net::TcpListener,
    os::unix::net::UnixListener,
    path::PathBuf,
    thread::{self, JoinHandle},
};

use tempdir::TempDir;

use crate::Config;

pub(crate) const UNLIMITED: usize = usize::MAX;

/// Serves canned answers, one per `GET`, over real sockets.
///
/// The backend handles `connections` connections one after another and hangs
/// up each one after `per_connection` requests. Commands get no answer.
pub(crate) struct FakeBackend {
    config: Config,
    handle: JoinHandle<Vec<String>>,
    _temp: Option<TempDir>,
}

impl FakeBackend {
    pub fn unix(connections: usize, per_connection: usize, answers: Vec<Vec<u8>>) -> Self {
        let temp = TempDir::new("livestatus").unwrap();
        let path: PathBuf = temp.path().join("live");
        let listener = UnixListener::bind(&path).unwrap();

        let handle = thread::spawn(move || {
            let mut answers = VecDeque::from(answers);
            let mut requests = Vec::new();
            for _ in 0..connections {
                let (stream, _) = listener.accept().unwrap();
                serve(&stream, per_connection, &mut answers, &mut requests);
            }
            requests
        });

        Self {
            config: Config::unix(path),
            handle,
            _temp: Some(temp),
        }
    }

    pub fn tcp(connections: usize, per_connection: usize, answers: Vec<Vec<u8>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let handle = thread::spawn(move || {
            let mut answers = VecDeque::from(answers);
            let mut requests = Vec::new();
            for _ in 0..connections {
                let (stream, _) = listener.accept().unwrap();
                serve(&stream, per_connection, &mut answers, &mut requests);
            }
            requests
        });

        Self {
            config: Config::tcp(address),
            handle,
            _temp: None,
        }
    }

    pub fn config(&self) -> Config {
        self.config.clone()
    }

    /// Waits for the backend to finish and returns the requests it saw,
    /// without their terminating blank lines.
    pub fn requests(self) -> Vec<String> {
        self.handle.join().unwrap()
    }
}

fn serve<S>(
    stream: &S,
    per_connection: usize,
    answers: &mut VecDeque<Vec<u8>>,
    requests: &mut Vec<String>,
) where
    for<'a> &'a S: Read + Write,
{
    let mut reader = BufReader::new(stream);
    let mut writer = stream;

    for _ in 0..per_connection {
        let mut request = String::new();
        let mut eof = false;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap_or(0) == 0 {
                eof = true;
                break;
            }
            if line == "\n" {
                break;
            }
            request.push_str(&line);
        }

        if request.is_empty() {
            return;
        }

        if request.starts_with("GET") {
            if let Some(answer) = answers.pop_front() {
                let _ = writer.write_all(&answer);
                let _ = writer.flush();
            }
        }

        let keepalive = request.contains("KeepAlive: on\n");
        requests.push(request);
        if eof || !keepalive {
            return;
        }
    }
}
