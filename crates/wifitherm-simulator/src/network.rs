use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use log::{debug, error};
use wifitherm_core::constants::TRANSPORT_TIMEOUT;
use wifitherm_core::reporter::{Connector, HttpConnection, ReportError};

/// Blocking std TCP transport with the same 10 s timeouts as the firmware.
pub struct StdConnector;

impl Connector for StdConnector {
    type Connection<'a> = StdConnection;

    async fn connect(&mut self, host: &str, port: u16) -> Result<StdConnection, ReportError> {
        let timeout = std::time::Duration::from_millis(TRANSPORT_TIMEOUT.as_millis());

        let address = (host, port)
            .to_socket_addrs()
            .map_err(|e| {
                error!("Resolving {} failed: {}", host, e);
                ReportError::Resolve
            })?
            .next()
            .ok_or(ReportError::Resolve)?;

        debug!("Connecting to {}", address);
        let stream = TcpStream::connect_timeout(&address, timeout).map_err(|e| {
            error!("Connection to {} failed: {}", address, e);
            ReportError::Connect
        })?;

        let configured = stream
            .set_read_timeout(Some(timeout))
            .and_then(|()| stream.set_write_timeout(Some(timeout)));
        if let Err(e) = configured {
            error!("Setting socket timeouts failed: {}", e);
            return Err(ReportError::Connect);
        }

        Ok(StdConnection { stream })
    }
}

pub struct StdConnection {
    stream: TcpStream,
}

impl HttpConnection for StdConnection {
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), ReportError> {
        self.stream.write_all(bytes).map_err(|e| {
            error!("Socket write failed: {}", e);
            ReportError::Io { operation: "write" }
        })
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ReportError> {
        self.stream.read(buf).map_err(|e| {
            error!("Socket read failed: {}", e);
            ReportError::Io { operation: "read" }
        })
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            debug!("Socket shutdown failed: {}", e);
        }
    }
}
