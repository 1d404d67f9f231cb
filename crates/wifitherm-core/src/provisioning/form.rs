//! The captive portal's web form
//!
//! A portal serves the form at `/` and receives it back as
//! `GET /save?server=...&port=...`. Everything here is transport-free so any
//! portal implementation can share it.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use super::{PortalParameter, PortalValues};

/// Path the form submits to.
pub const SAVE_PATH: &str = "/save";

/// What a portal client asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalRequest<'a> {
    /// The configuration form
    Form,
    /// A form submission with its raw query string
    Save(&'a str),
    /// Anything else
    NotFound,
}

/// Classify an HTTP request from its request line, e.g. `GET /save?port=1 HTTP/1.1`.
///
/// Returns `None` for anything that is not a `GET` request line.
pub fn parse_request_line(line: &str) -> Option<PortalRequest<'_>> {
    let mut parts = line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let target = parts.next()?;
    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    Some(match path {
        "/" => PortalRequest::Form,
        SAVE_PATH => PortalRequest::Save(query),
        _ => PortalRequest::NotFound,
    })
}

/// Decode `application/x-www-form-urlencoded` text.
///
/// Malformed escapes are kept verbatim.
pub fn url_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(high), Some(low)) => {
                        out.push(high << 4 | low);
                        i += 2;
                    }
                    _ => out.push(b'%'),
                }
            }
            byte => out.push(byte),
        }
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Pick the known parameters out of a submitted query string.
///
/// Unknown keys are ignored; a repeated key keeps its last value.
pub fn parse_submission(query: &str, parameters: &[PortalParameter]) -> PortalValues {
    let mut values = PortalValues::new();
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = url_decode(key);
        if let Some(parameter) = parameters.iter().find(|p| p.id == key) {
            values.insert(parameter.id, url_decode(value));
        }
    }
    values
}

/// The configuration form, one text field per parameter.
pub fn render_form(ap_name: &str, parameters: &[PortalParameter]) -> String {
    let mut page = String::new();
    let _ = write!(
        page,
        "<!DOCTYPE html><html><head><meta name=\"viewport\" content=\"width=device-width\">\
         <title>{ap_name}</title></head><body><h1>{ap_name}</h1>\
         <form action=\"{SAVE_PATH}\" method=\"get\">"
    );
    for parameter in parameters {
        let _ = write!(
            page,
            "<p><input name=\"{id}\" placeholder=\"{label}\" value=\"{default}\" maxlength=\"{max}\"></p>",
            id = parameter.id,
            label = parameter.label,
            default = parameter.default,
            max = parameter.max_len,
        );
    }
    page.push_str("<p><button type=\"submit\">Save</button></p></form></body></html>");
    page
}

/// Page shown after a successful submission.
pub fn render_saved(ap_name: &str) -> String {
    let mut page = String::new();
    let _ = write!(
        page,
        "<!DOCTYPE html><html><body><h1>{ap_name}</h1>\
         <p>Saved. The device is starting to report.</p></body></html>"
    );
    page
}

/// Head of an HTML response carrying `body_len` bytes.
pub fn response_head(status: &str, body_len: usize) -> String {
    let mut head = String::new();
    let _ = write!(
        head,
        "HTTP/1.1 {status}\r\n\
         Content-Type: text/html; charset=utf-8\r\n\
         Connection: close\r\n\
         Content-Length: {body_len}\r\n\
         \r\n"
    );
    head
}
