//! Minimal HTTP/1.1 client framing over an abstract TCP connection
//!
//! Only what the report needs: one `POST` with a JSON body, and the status
//! code of the response. The response body is never read.

use alloc::string::String;
use core::fmt::Write;
use core::future::Future;

use super::ReportError;

/// Longest status line accepted before giving up on the response.
const MAX_STATUS_LINE: usize = 128;

/// An open transport connection to the report server.
pub trait HttpConnection {
    fn write_all(&mut self, bytes: &[u8]) -> impl Future<Output = Result<(), ReportError>>;

    /// Read into `buf`, returning 0 once the peer closed the connection.
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize, ReportError>>;

    /// Flush and close the connection. Errors while closing are ignored.
    fn close(&mut self) -> impl Future<Output = ()>;
}

/// Opens a fresh transport connection per report.
pub trait Connector {
    type Connection<'a>: HttpConnection
    where
        Self: 'a;

    /// Connect to `host:port`, resolving `host` if it is not an address.
    fn connect(
        &mut self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<Self::Connection<'_>, ReportError>>;
}

/// Build the head of a JSON `POST` request for `body_len` bytes of body.
pub fn request_head(host: &str, port: u16, path: &str, body_len: usize) -> String {
    let mut head = String::new();
    // Writing into a String cannot fail.
    let _ = write!(
        head,
        "POST {path} HTTP/1.1\r\n\
         Host: {host}:{port}\r\n\
         User-Agent: wifitherm/{version}\r\n\
         Connection: close\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {body_len}\r\n\
         \r\n",
        version = env!("CARGO_PKG_VERSION"),
    );
    head
}

/// Parse the status code out of a line like `HTTP/1.1 200 OK`.
pub fn parse_status_line(line: &[u8]) -> Option<u16> {
    let line = core::str::from_utf8(line).ok()?;
    let mut parts = line.split_whitespace();

    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }

    let code = parts.next()?;
    if code.len() != 3 {
        return None;
    }
    code.parse().ok()
}

/// Send a `POST` of `body` and return the response status code.
pub async fn post_json<C: HttpConnection>(
    connection: &mut C,
    host: &str,
    port: u16,
    path: &str,
    body: &[u8],
) -> Result<u16, ReportError> {
    let head = request_head(host, port, path, body.len());
    connection.write_all(head.as_bytes()).await?;
    connection.write_all(body).await?;
    read_status(connection).await
}

/// Read until the end of the status line and parse its code.
pub async fn read_status<C: HttpConnection>(connection: &mut C) -> Result<u16, ReportError> {
    let mut buf = [0u8; MAX_STATUS_LINE];
    let mut total = 0usize;

    loop {
        let n = connection.read(&mut buf[total..]).await?;
        if n == 0 {
            break;
        }
        total += n;
        if buf[..total].windows(2).any(|w| w == b"\r\n") || total == buf.len() {
            break;
        }
    }

    let end = buf[..total]
        .windows(2)
        .position(|w| w == b"\r\n")
        .ok_or(ReportError::MalformedResponse)?;
    parse_status_line(&buf[..end]).ok_or(ReportError::MalformedResponse)
}
