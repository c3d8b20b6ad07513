//! Per-connection request dispatch.
//!
//! # Responsibilities
//! - Read one request and route it: GET to the web surface, POST to IPP
//! - Negotiate the interim `100 Continue` when a request carries page data
//! - Contain every failure (including a panicking behaviour) inside the
//!   connection and answer it with a 500 when nothing was sent yet
//! - Close the transport exactly once, on every path
//!
//! # Design Decisions
//! - The first status line written is the only one; when page data is
//!   expected that line is `100 Continue` and the IPP response follows it
//!   directly
//! - Failures flow back as `DispatchError` and are consumed once in `run`
//! - The dispatcher never caches the PPD and never locks around the behaviour

use futures_util::FutureExt;
use std::borrow::Cow;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use super::resources::{HOMEPAGE, NOT_FOUND, PPD_SUFFIX, SERVER_ERROR};
use super::status::{Status, CONTENT_TYPE_IPP, CONTENT_TYPE_TEXT};
use super::transport::{Method, Transport, TransportError};
use crate::behaviour::{Behaviour, BehaviourError};
use crate::ipp::{CodecError, IppMessage};
use crate::net::ConnectionId;
use crate::observability::metrics;
use crate::panic::format_panic;

/// Coarse classification of a contained failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The client sent something this server cannot handle.
    ProtocolViolation,
    /// The behaviour failed or panicked.
    BehaviourFailure,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::ProtocolViolation => "protocol_violation",
            FailureKind::BehaviourFailure => "behaviour_failure",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that can go wrong while serving one request.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unsupported request method {0:?}")]
    UnsupportedMethod(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("malformed IPP request: {0}")]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Behaviour(#[from] BehaviourError),

    #[error("behaviour panicked: {0}")]
    BehaviourPanic(String),
}

impl DispatchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            DispatchError::UnsupportedMethod(_)
            | DispatchError::Transport(_)
            | DispatchError::Codec(_) => FailureKind::ProtocolViolation,
            DispatchError::Behaviour(_) | DispatchError::BehaviourPanic(_) => {
                FailureKind::BehaviourFailure
            }
        }
    }
}

/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The peer disconnected before sending a byte.
    PeerClosedEarly,
    /// A response was written; carries the status line that was sent.
    Responded(Status),
    /// The request failed.
    Failed {
        kind: FailureKind,
        /// Whether the 500 page reached the transport.
        error_page_sent: bool,
    },
}

/// Serves exactly one request on a transport, then closes it.
pub struct ConnectionDispatcher<T> {
    transport: T,
    behaviour: Arc<dyn Behaviour>,
    connection_id: ConnectionId,
    headers_sent: bool,
}

impl<T: Transport> ConnectionDispatcher<T> {
    pub fn new(transport: T, behaviour: Arc<dyn Behaviour>, connection_id: ConnectionId) -> Self {
        Self {
            transport,
            behaviour,
            connection_id,
            headers_sent: false,
        }
    }

    /// Serve the connection to completion.
    ///
    /// Never fails: errors are logged, answered where possible and reported
    /// through the returned [`Outcome`]. The transport is closed before this
    /// returns.
    pub async fn run(mut self) -> Outcome {
        let started = Instant::now();

        let result = AssertUnwindSafe(self.dispatch())
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(DispatchError::BehaviourPanic(format_panic(panic).to_string()))
            });

        let outcome = match result {
            Ok(Some(status)) => Outcome::Responded(status),
            Ok(None) => Outcome::PeerClosedEarly,
            Err(error) => self.contain(error).await,
        };

        if let Err(e) = self.transport.close().await {
            tracing::debug!(
                connection_id = %self.connection_id,
                error = %e,
                "Close failed"
            );
        }
        metrics::record_duration(started);

        outcome
    }

    /// Returns the status line sent, or `None` when the peer left without a
    /// request.
    async fn dispatch(&mut self) -> Result<Option<Status>, DispatchError> {
        let head = match self.transport.recv_headers().await {
            Ok(head) => head,
            Err(TransportError::ConnectionClosed) => {
                tracing::debug!(
                    connection_id = %self.connection_id,
                    "Peer closed before sending a request"
                );
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            connection_id = %self.connection_id,
            method = head.method.as_str(),
            path = %head.path,
            "Request received"
        );

        let status = match &head.method {
            Method::Get => self.web_surface(&head.path).await?,
            Method::Post => self.printing_protocol().await?,
            Method::Other(method) => return Err(DispatchError::UnsupportedMethod(method.clone())),
        };
        Ok(Some(status))
    }

    async fn web_surface(&mut self, path: &str) -> Result<Status, DispatchError> {
        let (status, body): (Status, Cow<'static, str>) = if path == "/" {
            (Status::Ok, Cow::Borrowed(HOMEPAGE))
        } else if path.ends_with(PPD_SUFFIX) {
            (Status::Ok, Cow::Owned(self.behaviour.ppd_document()))
        } else {
            (Status::NotFound, Cow::Borrowed(NOT_FOUND))
        };

        self.send_headers(status, CONTENT_TYPE_TEXT).await?;
        self.transport.send_body(body.as_bytes()).await?;
        Ok(status)
    }

    async fn printing_protocol(&mut self) -> Result<Status, DispatchError> {
        let request = IppMessage::decode(self.transport.recv_body().await?)?;
        let operation = request.operation();
        metrics::record_operation(operation.name());

        let (status, page_data) = if self.behaviour.expects_page_data(&request) {
            self.send_headers(Status::Continue, CONTENT_TYPE_IPP).await?;
            let page_data = std::mem::take(self.transport.recv_body().await?);
            (Status::Continue, Some(page_data))
        } else {
            self.send_headers(Status::Ok, CONTENT_TYPE_IPP).await?;
            (Status::Ok, None)
        };

        tracing::debug!(
            connection_id = %self.connection_id,
            operation = %operation,
            request_id = request.request_id,
            page_data_bytes = page_data.as_ref().map(|d| d.len()),
            "Handling IPP request"
        );

        let response = self.behaviour.handle(&request, page_data).await?;
        self.transport.send_body(&response.encode()).await?;
        Ok(status)
    }

    /// Marks the headers as sent before writing, so a failed write is never
    /// followed by a second status line.
    async fn send_headers(&mut self, status: Status, content_type: &str) -> Result<(), DispatchError> {
        self.headers_sent = true;
        metrics::record_response(status.code());
        self.transport.send_headers(status, content_type).await?;
        Ok(())
    }

    async fn contain(&mut self, error: DispatchError) -> Outcome {
        let kind = error.kind();
        metrics::record_failure(kind.as_str());
        tracing::error!(
            connection_id = %self.connection_id,
            kind = %kind,
            error = %error,
            headers_sent = self.headers_sent,
            "Request failed"
        );

        if self.headers_sent {
            return Outcome::Failed {
                kind,
                error_page_sent: false,
            };
        }

        let error_page_sent = match self.send_error_page().await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(
                    connection_id = %self.connection_id,
                    error = %e,
                    "Could not send error page"
                );
                false
            }
        };
        Outcome::Failed {
            kind,
            error_page_sent,
        }
    }

    async fn send_error_page(&mut self) -> Result<(), DispatchError> {
        self.send_headers(Status::ServerError, CONTENT_TYPE_TEXT).await?;
        self.transport.send_body(SERVER_ERROR.as_bytes()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviour::printer::tests::{request, test_printer, RecordingSink};
    use crate::behaviour::{RejectAll, StatelessPrinter};
    use crate::http::transport::RequestHead;
    use crate::ipp::{GroupTag, JobState, Operation, StatusCode};
    use crate::ppd::DocumentFormat;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    /// What the dispatcher did to a [`ScriptedTransport`].
    #[derive(Debug, Default)]
    struct Record {
        statuses: Vec<(Status, String)>,
        body: Vec<u8>,
        body_reads: usize,
        closes: usize,
    }

    struct ScriptedTransport {
        head: Option<Result<RequestHead, TransportError>>,
        body: Bytes,
        fail_body_writes: bool,
        record: Arc<Mutex<Record>>,
    }

    impl ScriptedTransport {
        fn new(method: Method, path: &str, body: impl Into<Bytes>) -> (Self, Arc<Mutex<Record>>) {
            let head = RequestHead {
                method,
                path: path.to_string(),
                version: "HTTP/1.1".to_string(),
                headers: Vec::new(),
            };
            Self::scripted(Ok(head), body.into())
        }

        fn scripted(
            head: Result<RequestHead, TransportError>,
            body: Bytes,
        ) -> (Self, Arc<Mutex<Record>>) {
            let record = Arc::new(Mutex::new(Record::default()));
            let transport = Self {
                head: Some(head),
                body,
                fail_body_writes: false,
                record: Arc::clone(&record),
            };
            (transport, record)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn recv_headers(&mut self) -> Result<RequestHead, TransportError> {
            self.head.take().unwrap_or(Err(TransportError::NoRequest))
        }

        async fn send_headers(
            &mut self,
            status: Status,
            content_type: &str,
        ) -> Result<(), TransportError> {
            self.record
                .lock()
                .unwrap()
                .statuses
                .push((status, content_type.to_string()));
            Ok(())
        }

        async fn recv_body(&mut self) -> Result<&mut Bytes, TransportError> {
            self.record.lock().unwrap().body_reads += 1;
            Ok(&mut self.body)
        }

        async fn send_body(&mut self, body: &[u8]) -> Result<(), TransportError> {
            if self.fail_body_writes {
                return Err(TransportError::Io(std::io::ErrorKind::BrokenPipe.into()));
            }
            self.record.lock().unwrap().body.extend_from_slice(body);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            self.record.lock().unwrap().closes += 1;
            Ok(())
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mode {
        Answer,
        Fail,
        Panic,
    }

    /// Behaviour with a switchable PPD that records the page data it sees.
    struct TestBehaviour {
        expects_page_data: bool,
        mode: Mode,
        ppd: Mutex<String>,
        page_data: Mutex<Vec<Option<Bytes>>>,
    }

    impl TestBehaviour {
        fn new(expects_page_data: bool, mode: Mode) -> Arc<Self> {
            Arc::new(Self {
                expects_page_data,
                mode,
                ppd: Mutex::new("*PPD-Adobe: \"4.3\"\n".to_string()),
                page_data: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Behaviour for TestBehaviour {
        fn expects_page_data(&self, _request: &IppMessage) -> bool {
            self.expects_page_data
        }

        async fn handle(
            &self,
            request: &IppMessage,
            page_data: Option<Bytes>,
        ) -> Result<IppMessage, BehaviourError> {
            self.page_data.lock().unwrap().push(page_data);
            match self.mode {
                Mode::Answer => Ok(IppMessage::response(request, (1, 1), StatusCode::OK)),
                Mode::Fail => Err(BehaviourError::RemoteService("out of stamps".into())),
                Mode::Panic => panic!("boom"),
            }
        }

        fn ppd_document(&self) -> String {
            self.ppd.lock().unwrap().clone()
        }
    }

    fn ipp_body(operation: Operation) -> Bytes {
        request(operation).encode()
    }

    async fn serve(transport: ScriptedTransport, behaviour: Arc<dyn Behaviour>) -> Outcome {
        ConnectionDispatcher::new(transport, behaviour, ConnectionId::new())
            .run()
            .await
    }

    #[tokio::test]
    async fn homepage_is_served_verbatim() {
        let (transport, record) = ScriptedTransport::new(Method::Get, "/", Bytes::new());

        let outcome = serve(transport, TestBehaviour::new(false, Mode::Answer)).await;

        assert_eq!(outcome, Outcome::Responded(Status::Ok));
        let record = record.lock().unwrap();
        assert_eq!(record.statuses, [(Status::Ok, CONTENT_TYPE_TEXT.to_string())]);
        assert_eq!(record.body, HOMEPAGE.as_bytes());
        assert_eq!(record.closes, 1);
    }

    #[tokio::test]
    async fn unknown_paths_are_not_found() {
        for path in ["/index.html", "/printer", "/ppd", "/x.ppd.bak", ""] {
            let (transport, record) = ScriptedTransport::new(Method::Get, path, Bytes::new());

            let outcome = serve(transport, TestBehaviour::new(false, Mode::Answer)).await;

            assert_eq!(outcome, Outcome::Responded(Status::NotFound), "path {path:?}");
            let record = record.lock().unwrap();
            assert_eq!(record.statuses, [(Status::NotFound, CONTENT_TYPE_TEXT.to_string())]);
            assert_eq!(record.body, NOT_FOUND.as_bytes());
            assert_eq!(record.closes, 1);
        }
    }

    #[tokio::test]
    async fn ppd_is_fetched_for_every_request() {
        let behaviour = TestBehaviour::new(false, Mode::Answer);

        let (transport, first) = ScriptedTransport::new(Method::Get, "/printers/x.ppd", Bytes::new());
        serve(transport, behaviour.clone()).await;

        *behaviour.ppd.lock().unwrap() = "*ModelName: \"changed\"\n".to_string();
        let (transport, second) = ScriptedTransport::new(Method::Get, "/printers/x.ppd", Bytes::new());
        serve(transport, behaviour.clone()).await;

        assert_eq!(first.lock().unwrap().body, b"*PPD-Adobe: \"4.3\"\n");
        assert_eq!(second.lock().unwrap().body, b"*ModelName: \"changed\"\n");
        assert_eq!(
            second.lock().unwrap().statuses,
            [(Status::Ok, CONTENT_TYPE_TEXT.to_string())]
        );
    }

    #[tokio::test]
    async fn page_data_is_read_after_a_single_continue() {
        let mut body = ipp_body(Operation::PRINT_JOB).to_vec();
        body.extend_from_slice(b"%!PS-Adobe-3.0\nshowpage\n");
        let (transport, record) = ScriptedTransport::new(Method::Post, "/", body);
        let behaviour = TestBehaviour::new(true, Mode::Answer);

        let outcome = serve(transport, behaviour.clone()).await;

        assert_eq!(outcome, Outcome::Responded(Status::Continue));
        let record = record.lock().unwrap();
        assert_eq!(
            record.statuses,
            [(Status::Continue, CONTENT_TYPE_IPP.to_string())]
        );
        assert_eq!(record.body_reads, 2);
        assert_eq!(record.closes, 1);
        assert_eq!(
            *behaviour.page_data.lock().unwrap(),
            [Some(Bytes::from_static(b"%!PS-Adobe-3.0\nshowpage\n"))]
        );

        let mut sent = Bytes::from(record.body.clone());
        let response = IppMessage::decode(&mut sent).unwrap();
        assert_eq!(response.request_id, 99);
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn requests_without_page_data_get_an_immediate_ok() {
        let (transport, record) =
            ScriptedTransport::new(Method::Post, "/", ipp_body(Operation::GET_PRINTER_ATTRIBUTES));
        let behaviour = TestBehaviour::new(false, Mode::Answer);

        let outcome = serve(transport, behaviour.clone()).await;

        assert_eq!(outcome, Outcome::Responded(Status::Ok));
        let record = record.lock().unwrap();
        assert_eq!(record.statuses, [(Status::Ok, CONTENT_TYPE_IPP.to_string())]);
        assert_eq!(record.body_reads, 1);
        assert_eq!(*behaviour.page_data.lock().unwrap(), [None]);
    }

    #[tokio::test]
    async fn other_methods_get_the_error_page() {
        let (transport, record) =
            ScriptedTransport::new(Method::Other("PUT".into()), "/", Bytes::new());

        let outcome = serve(transport, TestBehaviour::new(false, Mode::Answer)).await;

        assert_eq!(
            outcome,
            Outcome::Failed {
                kind: FailureKind::ProtocolViolation,
                error_page_sent: true,
            }
        );
        let record = record.lock().unwrap();
        assert_eq!(record.statuses, [(Status::ServerError, CONTENT_TYPE_TEXT.to_string())]);
        assert_eq!(record.body, SERVER_ERROR.as_bytes());
        assert_eq!(record.closes, 1);
    }

    #[tokio::test]
    async fn malformed_ipp_gets_the_error_page() {
        let (transport, record) =
            ScriptedTransport::new(Method::Post, "/", Bytes::from_static(b"\x01\x01\x00"));
        let behaviour = TestBehaviour::new(true, Mode::Answer);

        let outcome = serve(transport, behaviour.clone()).await;

        assert_eq!(
            outcome,
            Outcome::Failed {
                kind: FailureKind::ProtocolViolation,
                error_page_sent: true,
            }
        );
        assert_eq!(
            record.lock().unwrap().statuses,
            [(Status::ServerError, CONTENT_TYPE_TEXT.to_string())]
        );
        assert!(behaviour.page_data.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn truncated_headers_get_the_error_page() {
        let (transport, record) =
            ScriptedTransport::scripted(Err(TransportError::Truncated("headers")), Bytes::new());

        let outcome = serve(transport, TestBehaviour::new(false, Mode::Answer)).await;

        assert!(matches!(
            outcome,
            Outcome::Failed {
                kind: FailureKind::ProtocolViolation,
                error_page_sent: true
            }
        ));
        assert_eq!(record.lock().unwrap().closes, 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn behaviour_failure_after_ok_sends_no_second_status() {
        let (transport, record) =
            ScriptedTransport::new(Method::Post, "/", ipp_body(Operation::GET_JOBS));

        let outcome = serve(transport, TestBehaviour::new(false, Mode::Fail)).await;

        assert_eq!(
            outcome,
            Outcome::Failed {
                kind: FailureKind::BehaviourFailure,
                error_page_sent: false,
            }
        );
        let record = record.lock().unwrap();
        assert_eq!(record.statuses, [(Status::Ok, CONTENT_TYPE_IPP.to_string())]);
        assert!(record.body.is_empty());
        assert_eq!(record.closes, 1);
        assert!(logs_contain("out of stamps"));
    }

    #[tokio::test]
    async fn behaviour_failure_after_continue_sends_no_second_status() {
        let (transport, record) =
            ScriptedTransport::new(Method::Post, "/", ipp_body(Operation::PRINT_JOB));

        serve(transport, TestBehaviour::new(true, Mode::Fail)).await;

        let record = record.lock().unwrap();
        assert_eq!(
            record.statuses,
            [(Status::Continue, CONTENT_TYPE_IPP.to_string())]
        );
        assert_eq!(record.closes, 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn panicking_behaviour_is_contained() {
        let (transport, record) =
            ScriptedTransport::new(Method::Post, "/", ipp_body(Operation::GET_JOBS));

        let outcome = serve(transport, TestBehaviour::new(false, Mode::Panic)).await;

        assert_eq!(
            outcome,
            Outcome::Failed {
                kind: FailureKind::BehaviourFailure,
                error_page_sent: false,
            }
        );
        assert_eq!(record.lock().unwrap().closes, 1);
        assert!(logs_contain("behaviour panicked: boom"));
    }

    #[tokio::test]
    async fn failed_response_write_is_not_answered_twice() {
        let (mut transport, record) = ScriptedTransport::new(Method::Get, "/", Bytes::new());
        transport.fail_body_writes = true;

        let outcome = serve(transport, TestBehaviour::new(false, Mode::Answer)).await;

        assert!(matches!(
            outcome,
            Outcome::Failed {
                error_page_sent: false,
                ..
            }
        ));
        let record = record.lock().unwrap();
        assert_eq!(record.statuses.len(), 1);
        assert_eq!(record.closes, 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn empty_connection_is_closed_quietly() {
        let (transport, record) =
            ScriptedTransport::scripted(Err(TransportError::ConnectionClosed), Bytes::new());

        let outcome = serve(transport, TestBehaviour::new(false, Mode::Answer)).await;

        assert_eq!(outcome, Outcome::PeerClosedEarly);
        let record = record.lock().unwrap();
        assert!(record.statuses.is_empty());
        assert_eq!(record.closes, 1);
        assert!(!logs_contain("ERROR"));
    }

    #[tokio::test]
    async fn reject_all_answers_print_jobs_without_page_data() {
        let (transport, record) =
            ScriptedTransport::new(Method::Post, "/", ipp_body(Operation::PRINT_JOB));
        let behaviour = Arc::new(RejectAll::new(test_printer(DocumentFormat::Postscript)));

        let outcome = serve(transport, behaviour).await;

        assert_eq!(outcome, Outcome::Responded(Status::Ok));
        let record = record.lock().unwrap();
        assert_eq!(record.statuses, [(Status::Ok, CONTENT_TYPE_IPP.to_string())]);
        assert_eq!(record.body_reads, 1);

        let mut sent = Bytes::from(record.body.clone());
        let response = IppMessage::decode(&mut sent).unwrap();
        let state = response
            .get(GroupTag::JOB, "job-state")
            .and_then(|a| a.integer());
        assert_eq!(state, Some(JobState::Aborted as i32));
    }

    #[tokio::test]
    async fn misidentified_http_fails_after_the_ok_line() {
        let (transport, record) =
            ScriptedTransport::new(Method::Post, "/", ipp_body(Operation::MISIDENTIFIED_HTTP));
        let behaviour = Arc::new(StatelessPrinter::new(
            test_printer(DocumentFormat::Postscript),
            RecordingSink::default(),
        ));

        let outcome = serve(transport, behaviour).await;

        assert_eq!(
            outcome,
            Outcome::Failed {
                kind: FailureKind::BehaviourFailure,
                error_page_sent: false,
            }
        );
        let record = record.lock().unwrap();
        assert_eq!(record.statuses, [(Status::Ok, CONTENT_TYPE_IPP.to_string())]);
        assert!(record.body.is_empty());
        assert_eq!(record.closes, 1);
    }

    #[tokio::test]
    async fn print_job_hands_page_data_to_the_sink() {
        let mut body = ipp_body(Operation::PRINT_JOB).to_vec();
        body.extend_from_slice(&[0x25; 4096]);
        let (transport, record) = ScriptedTransport::new(Method::Post, "/", body);
        let behaviour = Arc::new(StatelessPrinter::new(
            test_printer(DocumentFormat::Postscript),
            RecordingSink::default(),
        ));

        serve(transport, behaviour.clone()).await;

        assert_eq!(
            record.lock().unwrap().statuses,
            [(Status::Continue, CONTENT_TYPE_IPP.to_string())]
        );
        let jobs = behaviour.sink().jobs.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].1.len(), 4096);
    }
}
