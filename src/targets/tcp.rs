//! TCP stream for remote logging
//!
//! Feeds a [`WriterTarget`](super::WriterTarget) so rendered records reach a
//! central collector over TCP.

use std::io::{self, Write};
use std::net::TcpStream;
use std::time::Duration;

const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// `io::Write` over a TCP connection that reconnects and resends once when
/// a write fails.
pub struct TcpStreamWriter {
    stream: Option<TcpStream>,
    address: String,
    reconnect_on_error: bool,
}

impl TcpStreamWriter {
    /// Connect to `address`, e.g. `"localhost:8080"`.
    pub fn connect(address: impl Into<String>) -> io::Result<Self> {
        let address = address.into();
        let stream = Self::open(&address)?;
        Ok(Self {
            stream: Some(stream),
            address,
            reconnect_on_error: true,
        })
    }

    /// Default: enabled
    #[must_use]
    pub fn with_reconnect(mut self, enable: bool) -> Self {
        self.reconnect_on_error = enable;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn open(address: &str) -> io::Result<TcpStream> {
        let stream = TcpStream::connect(address)?;
        // Timeouts keep a stalled peer from wedging the worker forever
        stream.set_write_timeout(Some(IO_TIMEOUT))?;
        stream.set_read_timeout(Some(IO_TIMEOUT))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn stream(&mut self) -> io::Result<&mut TcpStream> {
        if self.stream.is_none() {
            if !self.reconnect_on_error {
                return Err(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "log server stream not connected",
                ));
            }
            self.stream = Some(Self::open(&self.address)?);
        }
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))
    }
}

impl Write for TcpStreamWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let result = self.stream()?.write(buf);
        if result.is_err() {
            self.stream = None;
        }
        result
    }

    /// Sends the whole buffer, reconnecting and resending it once on error.
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self.stream()?.write_all(buf) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.stream = None;
                if !self.reconnect_on_error {
                    return Err(e);
                }
                self.stream()
                    .and_then(|stream| stream.write_all(buf))
                    .map_err(|reconnect_err| {
                        self.stream = None;
                        io::Error::new(
                            e.kind(),
                            format!(
                                "failed to send log and reconnect: {} (reconnect: {})",
                                e, reconnect_err
                            ),
                        )
                    })
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stream {
            Some(ref mut stream) => stream.flush(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_sends_lines_to_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let server = thread::spawn(move || {
            let (socket, _) = listener.accept().unwrap();
            BufReader::new(socket)
                .lines()
                .map_while(|line| line.ok())
                .collect::<Vec<_>>()
        });

        let mut writer = TcpStreamWriter::connect(addr.clone()).unwrap();
        assert_eq!(writer.address(), addr);
        assert!(writer.is_connected());
        writer.write_all(b"first\n").unwrap();
        writer.write_all(b"second\n").unwrap();
        writer.flush().unwrap();
        drop(writer);

        assert_eq!(server.join().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_connect_to_closed_port_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        assert!(TcpStreamWriter::connect(addr).is_err());
    }
}
