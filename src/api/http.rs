//! Minimal HTTP/1.1 request parsing and response writing
//!
//! Enough for a JSON API behind a dashboard: request line, headers,
//! `Content-Length` bodies and keep-alive. Chunked bodies are refused.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest accepted request body
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

const MAX_HEADER_LINES: usize = 100;
const MAX_LINE_LEN: usize = 8 * 1024;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("malformed request: {0}")]
    Malformed(&'static str),

    #[error("request body too large: {0} bytes")]
    BodyTooLarge(usize),

    #[error("not implemented: {0}")]
    Unsupported(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    /// Header names lowercased
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    http10: bool,
}

impl HttpError {
    /// Status sent back before the connection is closed
    pub fn status_code(&self) -> u16 {
        match self {
            HttpError::BodyTooLarge(_) => 413,
            HttpError::Unsupported(_) => 501,
            HttpError::Malformed(_) | HttpError::Io(_) => 400,
        }
    }
}

impl Request {
    pub fn keep_alive(&self) -> bool {
        match self.headers.get("connection").map(|v| v.to_ascii_lowercase()) {
            Some(v) if v == "close" => false,
            Some(v) if v == "keep-alive" => true,
            _ => !self.http10,
        }
    }
}

async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Option<String>, HttpError> {
    let mut raw = Vec::new();
    let n = (&mut *reader)
        .take(MAX_LINE_LEN as u64)
        .read_until(b'\n', &mut raw)
        .await?;
    if n == 0 {
        return Ok(None);
    }
    if raw.last() != Some(&b'\n') {
        return Err(HttpError::Malformed("line too long or truncated"));
    }
    let line = String::from_utf8(raw).map_err(|_| HttpError::Malformed("line is not UTF-8"))?;
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Read the next request; `Ok(None)` once the peer closed the connection
pub async fn read_request<R: AsyncBufRead + Unpin>(
    reader: &mut R,
) -> Result<Option<Request>, HttpError> {
    let request_line = loop {
        match read_line(reader).await? {
            None => return Ok(None),
            // Tolerate stray blank lines between pipelined requests
            Some(line) if line.is_empty() => continue,
            Some(line) => break line,
        }
    };

    let mut parts = request_line.split_whitespace();
    let (method, target, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(t), Some(v), None) if v.starts_with("HTTP/1.") => (m, t, v),
        _ => return Err(HttpError::Malformed("bad request line")),
    };

    let mut headers = HashMap::new();
    loop {
        let line = read_line(reader)
            .await?
            .ok_or(HttpError::Malformed("connection closed in headers"))?;
        if line.is_empty() {
            break;
        }
        if headers.len() == MAX_HEADER_LINES {
            return Err(HttpError::Malformed("too many headers"));
        }
        let (name, value) = line
            .split_once(':')
            .ok_or(HttpError::Malformed("bad header line"))?;
        headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    if headers.contains_key("transfer-encoding") {
        return Err(HttpError::Unsupported("transfer-encoding"));
    }

    let length = match headers.get("content-length") {
        Some(v) => v
            .parse::<usize>()
            .map_err(|_| HttpError::Malformed("bad content-length"))?,
        None => 0,
    };
    if length > MAX_BODY_SIZE {
        return Err(HttpError::BodyTooLarge(length));
    }
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, parse_query(query)),
        None => (target, HashMap::new()),
    };

    Ok(Some(Request {
        method: method.to_ascii_uppercase(),
        path: percent_decode(path),
        query,
        headers,
        body,
        http10: version == "HTTP/1.0",
    }))
}

/// `a=1&b=two` with `+` as space and `%XX` escapes; later keys win
pub fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (
                percent_decode(&key.replace('+', " ")),
                percent_decode(&value.replace('+', " ")),
            )
        })
        .collect()
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            out.push((hex_value(bytes[i + 1]) << 4) | hex_value(bytes[i + 2]));
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    content_type: &'static str,
    allow: Option<&'static str>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            allow: None,
            body: body.into().into_bytes(),
        }
    }

    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                content_type: "application/json",
                allow: None,
                body,
            },
            Err(e) => Self::text(500, format!("Failed to encode response: {}", e)),
        }
    }

    pub fn ok() -> Self {
        Self::text(200, "OK")
    }

    pub fn no_content() -> Self {
        Self::text(204, "")
    }

    pub fn with_allow(mut self, methods: &'static str) -> Self {
        self.allow = Some(methods);
        self
    }

    pub async fn write_to<W: AsyncWrite + Unpin>(
        &self,
        writer: &mut W,
        keep_alive: bool,
    ) -> std::io::Result<()> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Access-Control-Allow-Headers: Content-Type\r\n",
            self.status,
            reason_phrase(self.status),
            self.content_type,
            self.body.len(),
        );
        if let Some(methods) = self.allow {
            head.push_str(&format!(
                "Allow: {0}\r\nAccess-Control-Allow-Methods: {0}\r\n",
                methods
            ));
        }
        head.push_str(if keep_alive {
            "Connection: keep-alive\r\n\r\n"
        } else {
            "Connection: close\r\n\r\n"
        });

        writer.write_all(head.as_bytes()).await?;
        writer.write_all(&self.body).await?;
        writer.flush().await
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        _ => "Unknown",
    }
}
