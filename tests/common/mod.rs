//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use ipp_server::behaviour::{Behaviour, Printer, RejectAll, SaveToDisk, StatelessPrinter};
use ipp_server::config::{ListenerConfig, PrinterConfig};
use ipp_server::ipp::{values, Attribute, GroupTag, IppMessage, Operation, ValueTag};
use ipp_server::Server;

pub fn printer() -> Printer {
    let listener = ListenerConfig {
        host: "127.0.0.1".into(),
        port: 631,
    };
    Printer::new(&PrinterConfig::default(), &listener)
}

pub fn reject_all() -> Arc<dyn Behaviour> {
    Arc::new(RejectAll::new(printer()))
}

pub fn save_to(directory: &Path) -> Arc<dyn Behaviour> {
    Arc::new(StatelessPrinter::new(printer(), SaveToDisk::new(directory)))
}

/// Start a server on an ephemeral localhost port.
pub async fn start_server(behaviour: Arc<dyn Behaviour>) -> Server {
    Server::start("127.0.0.1:0", behaviour).await.unwrap()
}

/// Encoded IPP request for `operation` with the mandatory attributes.
pub fn ipp_request(operation: Operation) -> Bytes {
    let mut request = IppMessage {
        version: (1, 1),
        code: operation.0,
        request_id: 7,
        attributes: Vec::new(),
    };
    let text = |name: &str, tag: ValueTag, value: &str| {
        Attribute::new(GroupTag::OPERATION, name, tag, vec![values::text(value)])
    };
    request.push(text("attributes-charset", ValueTag::CHARSET, "utf-8"));
    request.push(text("attributes-natural-language", ValueTag::NATURAL_LANGUAGE, "en"));
    request.push(text("printer-uri", ValueTag::URI, "ipp://127.0.0.1:631/printer"));
    request.push(text("job-name", ValueTag::NAME_WITHOUT_LANGUAGE, "integration"));
    request.encode()
}

/// A complete `POST /` with a Content-Length body.
pub fn post(body: &[u8]) -> Vec<u8> {
    let mut raw = format!(
        "POST / HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/ipp\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    raw.extend_from_slice(body);
    raw
}

/// Send `request` and read until the server closes the connection.
pub async fn exchange(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    response
}

/// Send `request`, close the write side, and read until the server closes.
pub async fn exchange_then_hang_up(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    stream.shutdown().await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    response
}

/// Split a raw response into its head and body.
pub fn split_response(response: &[u8]) -> (String, Vec<u8>) {
    let end = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has no header terminator");
    let head = String::from_utf8(response[..end].to_vec()).unwrap();
    (head, response[end + 4..].to_vec())
}
