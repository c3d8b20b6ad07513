//! Line-oriented HTTP/1.x framing over a byte stream.
//!
//! # Responsibilities
//! - Parse the request line and headers
//! - Frame the request body (Content-Length, chunked, or read-to-EOF)
//! - Write status lines and raw response bodies
//! - Close the write side exactly once
//!
//! # Design Decisions
//! - The whole request body is buffered on first access; callers consume it
//!   from the front and later calls return the unread remainder
//! - A peer that disconnects before sending a single byte is reported as
//!   `ConnectionClosed`, anything cut short later is `Truncated`

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::status::Status;

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer closed the connection before sending anything.
    #[error("connection closed before a request was received")]
    ConnectionClosed,

    /// The stream ended in the middle of a request.
    #[error("connection closed while reading {0}")]
    Truncated(&'static str),

    #[error("malformed request head: {0}")]
    MalformedHead(String),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("request body read before request headers")]
    NoRequest,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Request method as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other(String),
}

impl Method {
    fn parse(raw: &str) -> Self {
        match raw {
            "GET" => Method::Get,
            "POST" => Method::Post,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Other(raw) => raw,
        }
    }
}

/// Parsed request line and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: Method,
    pub path: String,
    pub version: String,
    /// Header names are stored lower-cased.
    pub headers: Vec<(String, String)>,
}

impl RequestHead {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Request/response framing consumed by the connection dispatcher.
#[async_trait]
pub trait Transport: Send {
    /// Read the request line and headers.
    ///
    /// Fails with [`TransportError::ConnectionClosed`] only when no byte at all
    /// was received.
    async fn recv_headers(&mut self) -> Result<RequestHead, TransportError>;

    /// Write a status line with a single `Content-Type` header.
    async fn send_headers(&mut self, status: Status, content_type: &str) -> Result<(), TransportError>;

    /// The unread remainder of the request body.
    ///
    /// Consumers advance the returned buffer; whatever they leave behind is
    /// returned by the next call.
    async fn recv_body(&mut self) -> Result<&mut Bytes, TransportError>;

    async fn send_body(&mut self, body: &[u8]) -> Result<(), TransportError>;

    /// Close the connection. Calling it more than once is a no-op.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// [`Transport`] over any async byte stream (a `TcpStream` in production).
pub struct HttpTransport<S> {
    stream: BufReader<S>,
    head: Option<RequestHead>,
    body: Option<Bytes>,
    closed: bool,
}

impl<S> HttpTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
            head: None,
            body: None,
            closed: false,
        }
    }

    /// Read one CRLF/LF terminated line, without the terminator.
    /// Returns `None` on EOF before any byte.
    async fn read_line(&mut self, what: &'static str) -> Result<Option<String>, TransportError> {
        let mut raw = Vec::new();
        let n = self.stream.read_until(b'\n', &mut raw).await?;
        if n == 0 {
            return Ok(None);
        }
        if !raw.ends_with(b"\n") {
            return Err(TransportError::Truncated(what));
        }
        raw.pop();
        if raw.ends_with(b"\r") {
            raw.pop();
        }
        String::from_utf8(raw)
            .map(Some)
            .map_err(|_| TransportError::MalformedHead(format!("{what} is not valid UTF-8")))
    }

    async fn load_body(&mut self) -> Result<Bytes, TransportError> {
        let head = self.head.as_ref().ok_or(TransportError::NoRequest)?;

        let chunked = head
            .header("transfer-encoding")
            .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"));
        let content_length = match head.header("content-length") {
            Some(raw) => Some(raw.trim().parse::<usize>().map_err(|_| {
                TransportError::MalformedBody(format!("bad Content-Length {raw:?}"))
            })?),
            None => None,
        };

        if chunked {
            return self.read_chunked().await;
        }

        match content_length {
            Some(len) => {
                let mut body = Vec::new();
                self.read_counted(&mut body, len, "body").await?;
                Ok(Bytes::from(body))
            }
            None => {
                let mut body = Vec::new();
                self.stream.read_to_end(&mut body).await?;
                Ok(Bytes::from(body))
            }
        }
    }

    /// Append exactly `len` bytes to `body`.
    ///
    /// The buffer grows with the data actually received; a declared length is
    /// never allocated up front.
    async fn read_counted(
        &mut self,
        body: &mut Vec<u8>,
        len: usize,
        what: &'static str,
    ) -> Result<(), TransportError> {
        let end = body
            .len()
            .checked_add(len)
            .ok_or_else(|| TransportError::MalformedBody(format!("{what} length overflows")))?;
        (&mut self.stream).take(len as u64).read_to_end(body).await?;
        if body.len() != end {
            return Err(TransportError::Truncated(what));
        }
        Ok(())
    }

    async fn read_chunked(&mut self) -> Result<Bytes, TransportError> {
        let mut body = Vec::new();
        loop {
            let line = self
                .read_line("chunk size")
                .await?
                .ok_or(TransportError::Truncated("chunk size"))?;
            let size_field = line.split(';').next().unwrap_or_default().trim();
            let size = usize::from_str_radix(size_field, 16)
                .map_err(|_| TransportError::MalformedBody(format!("bad chunk size {size_field:?}")))?;

            if size == 0 {
                // Trailers are read and discarded.
                loop {
                    match self.read_line("trailer").await? {
                        Some(trailer) if !trailer.is_empty() => continue,
                        _ => return Ok(Bytes::from(body)),
                    }
                }
            }

            self.read_counted(&mut body, size, "chunk").await?;

            let terminator = self
                .read_line("chunk terminator")
                .await?
                .ok_or(TransportError::Truncated("chunk terminator"))?;
            if !terminator.is_empty() {
                return Err(TransportError::MalformedBody("chunk not followed by CRLF".into()));
            }
        }
    }
}

#[async_trait]
impl<S> Transport for HttpTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn recv_headers(&mut self) -> Result<RequestHead, TransportError> {
        let request_line = self
            .read_line("request line")
            .await?
            .ok_or(TransportError::ConnectionClosed)?;

        let mut parts = request_line.split_whitespace();
        let (method, path, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(method), Some(path), Some(version), None) => (method, path, version),
            _ => {
                return Err(TransportError::MalformedHead(format!(
                    "bad request line {request_line:?}"
                )))
            }
        };

        let mut headers = Vec::new();
        loop {
            let line = self
                .read_line("headers")
                .await?
                .ok_or(TransportError::Truncated("headers"))?;
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| TransportError::MalformedHead(format!("bad header line {line:?}")))?;
            headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }

        let head = RequestHead {
            method: Method::parse(method),
            path: path.to_string(),
            version: version.to_string(),
            headers,
        };
        self.head = Some(head.clone());
        self.body = None;
        Ok(head)
    }

    async fn send_headers(&mut self, status: Status, content_type: &str) -> Result<(), TransportError> {
        let head = format!("HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\n\r\n");
        self.stream.write_all(head.as_bytes()).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn recv_body(&mut self) -> Result<&mut Bytes, TransportError> {
        if self.body.is_none() {
            let loaded = self.load_body().await?;
            self.body = Some(loaded);
        }
        Ok(self.body.get_or_insert_with(Bytes::new))
    }

    async fn send_body(&mut self, body: &[u8]) -> Result<(), TransportError> {
        self.stream.write_all(body).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream.flush().await?;
        self.stream.shutdown().await?;
        Ok(())
    }
}
