//! IPP operations answered by every printer.
//!
//! # Responsibilities
//! - Build the printer, job and minimal operation attribute sets
//! - Answer the read-only operations CUPS issues while adding a printer
//! - Allocate job ids and hand accepted documents to a `DocumentSink`
//!
//! # Design Decisions
//! - Stateless: no job is remembered, so Get-Jobs is always empty and
//!   Get-Job-Attributes reports any job id as completed
//! - Unknown operations get `server-error-operation-not-supported` rather
//!   than failing the connection

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use super::{Behaviour, BehaviourError, DocumentSink, Job};
use crate::config::{ListenerConfig, PrinterConfig};
use crate::ipp::constants::PRINTER_STATE_IDLE;
use crate::ipp::values;
use crate::ipp::{Attribute, GroupTag, IppMessage, JobState, Operation, StatusCode, ValueTag};
use crate::ppd::{DocumentFormat, Ppd};

/// IPP version used in responses.
pub const IPP_VERSION: (u8, u8) = (1, 1);

const SUPPORTED_OPERATIONS: [Operation; 5] = [
    Operation::PRINT_JOB,
    Operation::VALIDATE_JOB,
    Operation::CANCEL_JOB,
    Operation::GET_JOB_ATTRIBUTES,
    Operation::GET_PRINTER_ATTRIBUTES,
];

/// Identity and attribute sets of the advertised printer.
#[derive(Debug)]
pub struct Printer {
    name: String,
    info: String,
    make_and_model: String,
    base_uri: String,
    format: DocumentFormat,
    started: Instant,
    next_job_id: AtomicU32,
}

impl Printer {
    pub fn new(config: &PrinterConfig, listener: &ListenerConfig) -> Self {
        Self {
            name: config.name.clone(),
            info: config.info.clone(),
            make_and_model: config.make_and_model.clone(),
            base_uri: format!("ipp://{}:{}/", listener.host, listener.port),
            format: config.format,
            started: Instant::now(),
            next_job_id: AtomicU32::new(1),
        }
    }

    pub fn printer_uri(&self) -> String {
        format!("{}printer", self.base_uri)
    }

    pub fn job_uri(&self, job_id: u32) -> String {
        format!("{}job/{}", self.base_uri, job_id)
    }

    pub fn ppd(&self) -> Ppd {
        Ppd::new(self.make_and_model.clone(), self.format)
    }

    /// Seconds since startup, starting at 1.
    pub fn uptime(&self) -> i32 {
        let secs = self.started.elapsed().as_secs().saturating_add(1);
        i32::try_from(secs).unwrap_or(i32::MAX)
    }

    /// Allocate a job for a Print-Job request.
    pub fn create_job(&self, request: &IppMessage) -> Job {
        let text = |name: &str| {
            request
                .operation_attribute(name)
                .and_then(Attribute::text)
                .map(str::to_string)
        };
        Job {
            id: self.next_job_id.fetch_add(1, Ordering::Relaxed),
            name: text("job-name"),
            user: text("requesting-user-name"),
            document_format: text("document-format"),
            extension: self.format.extension(),
        }
    }

    /// Response carrying only the mandatory operation attributes.
    pub fn minimal_response(&self, request: &IppMessage, status: StatusCode) -> IppMessage {
        let mut response = IppMessage::response(request, IPP_VERSION, status);
        response.push(operation_attr("attributes-charset", ValueTag::CHARSET, "utf-8"));
        response.push(operation_attr(
            "attributes-natural-language",
            ValueTag::NATURAL_LANGUAGE,
            "en",
        ));
        response
    }

    pub fn printer_attributes_response(&self, request: &IppMessage) -> IppMessage {
        let mut response = self.minimal_response(request, StatusCode::OK);
        let text = |name: &str, tag: ValueTag, value: &str| {
            Attribute::new(GroupTag::PRINTER, name, tag, vec![values::text(value)])
        };
        let mime = self.format.mime_type();

        response.push(text("printer-uri-supported", ValueTag::URI, &self.printer_uri()));
        response.push(text("uri-authentication-supported", ValueTag::KEYWORD, "none"));
        response.push(text("uri-security-supported", ValueTag::KEYWORD, "none"));
        response.push(text("printer-name", ValueTag::NAME_WITHOUT_LANGUAGE, &self.name));
        response.push(text("printer-info", ValueTag::TEXT_WITHOUT_LANGUAGE, &self.info));
        response.push(text(
            "printer-make-and-model",
            ValueTag::TEXT_WITHOUT_LANGUAGE,
            &self.make_and_model,
        ));
        response.push(Attribute::new(
            GroupTag::PRINTER,
            "printer-state",
            ValueTag::ENUM,
            vec![values::enumeration(PRINTER_STATE_IDLE)],
        ));
        response.push(text("printer-state-reasons", ValueTag::KEYWORD, "none"));
        response.push(text("ipp-versions-supported", ValueTag::KEYWORD, "1.1"));
        response.push(Attribute::new(
            GroupTag::PRINTER,
            "operations-supported",
            ValueTag::ENUM,
            SUPPORTED_OPERATIONS
                .iter()
                .map(|op| values::enumeration(i32::from(op.0)))
                .collect(),
        ));
        response.push(Attribute::new(
            GroupTag::PRINTER,
            "multiple-document-jobs-supported",
            ValueTag::BOOLEAN,
            vec![values::boolean(false)],
        ));
        response.push(text("charset-configured", ValueTag::CHARSET, "utf-8"));
        response.push(text("charset-supported", ValueTag::CHARSET, "utf-8"));
        response.push(text("natural-language-configured", ValueTag::NATURAL_LANGUAGE, "en"));
        response.push(text(
            "generated-natural-language-supported",
            ValueTag::NATURAL_LANGUAGE,
            "en",
        ));
        response.push(text("document-format-default", ValueTag::MIME_MEDIA_TYPE, mime));
        response.push(text("document-format-supported", ValueTag::MIME_MEDIA_TYPE, mime));
        response.push(Attribute::new(
            GroupTag::PRINTER,
            "printer-is-accepting-jobs",
            ValueTag::BOOLEAN,
            vec![values::boolean(true)],
        ));
        response.push(Attribute::new(
            GroupTag::PRINTER,
            "queued-job-count",
            ValueTag::INTEGER,
            vec![values::integer(0)],
        ));
        response.push(text("pdl-override-supported", ValueTag::KEYWORD, "not-attempted"));
        response.push(Attribute::new(
            GroupTag::PRINTER,
            "printer-up-time",
            ValueTag::INTEGER,
            vec![values::integer(self.uptime())],
        ));
        response.push(text("compression-supported", ValueTag::KEYWORD, "none"));
        response
    }

    /// Job description for `job_id` in `state` with the given state reasons.
    pub fn job_response(
        &self,
        request: &IppMessage,
        job_id: u32,
        state: JobState,
        reasons: &[&str],
    ) -> IppMessage {
        let mut response = self.minimal_response(request, StatusCode::OK);
        let id = i32::try_from(job_id).unwrap_or(i32::MAX);
        let integer = |name: &str, value: i32| {
            Attribute::new(GroupTag::JOB, name, ValueTag::INTEGER, vec![values::integer(value)])
        };
        let text = |name: &str, tag: ValueTag, value: &str| {
            Attribute::new(GroupTag::JOB, name, tag, vec![values::text(value)])
        };

        response.push(text("job-uri", ValueTag::URI, &self.job_uri(job_id)));
        response.push(integer("job-id", id));
        response.push(Attribute::new(
            GroupTag::JOB,
            "job-state",
            ValueTag::ENUM,
            vec![values::enumeration(state as i32)],
        ));
        response.push(Attribute::new(
            GroupTag::JOB,
            "job-state-reasons",
            ValueTag::KEYWORD,
            reasons.iter().map(|r| values::text(*r)).collect(),
        ));
        response.push(text("job-printer-uri", ValueTag::URI, &self.printer_uri()));
        response.push(text(
            "job-name",
            ValueTag::NAME_WITHOUT_LANGUAGE,
            &format!("Print job {job_id}"),
        ));
        response.push(text(
            "job-originating-user-name",
            ValueTag::NAME_WITHOUT_LANGUAGE,
            "job-originating-user-name",
        ));
        response.push(integer("time-at-creation", 0));
        response.push(integer("time-at-processing", 0));
        response.push(integer("time-at-completed", 0));
        response.push(integer("job-printer-up-time", self.uptime()));
        response
    }

    /// Answer every operation except Print-Job.
    pub fn answer(&self, request: &IppMessage) -> Result<IppMessage, BehaviourError> {
        let operation = request.operation();
        let response = match operation {
            Operation::GET_PRINTER_ATTRIBUTES
            | Operation::CUPS_GET_DEFAULT
            | Operation::CUPS_GET_PRINTERS => self.printer_attributes_response(request),
            Operation::VALIDATE_JOB | Operation::GET_JOBS | Operation::CANCEL_JOB => {
                self.minimal_response(request, StatusCode::OK)
            }
            Operation::GET_JOB_ATTRIBUTES => {
                let job_id = requested_job_id(request).unwrap_or(0);
                self.job_response(request, job_id, JobState::Completed, &["none"])
            }
            Operation::MISIDENTIFIED_HTTP => return Err(BehaviourError::MisidentifiedHttp),
            _ => {
                tracing::warn!(operation = %operation, "Operation not supported");
                self.minimal_response(request, StatusCode::SERVER_ERROR_OPERATION_NOT_SUPPORTED)
            }
        };
        Ok(response)
    }
}

fn operation_attr(name: &str, tag: ValueTag, value: &str) -> Attribute {
    Attribute::new(GroupTag::OPERATION, name, tag, vec![values::text(value)])
}

fn requested_job_id(request: &IppMessage) -> Option<u32> {
    request
        .operation_attribute("job-id")
        .and_then(Attribute::integer)
        .and_then(|id| u32::try_from(id).ok())
}

/// A printer that accepts every job and passes its document to `S`.
pub struct StatelessPrinter<S> {
    printer: Printer,
    sink: S,
}

impl<S: DocumentSink> StatelessPrinter<S> {
    pub fn new(printer: Printer, sink: S) -> Self {
        Self { printer, sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[async_trait]
impl<S: DocumentSink> Behaviour for StatelessPrinter<S> {
    fn expects_page_data(&self, request: &IppMessage) -> bool {
        request.operation() == Operation::PRINT_JOB
    }

    async fn handle(
        &self,
        request: &IppMessage,
        page_data: Option<Bytes>,
    ) -> Result<IppMessage, BehaviourError> {
        if request.operation() != Operation::PRINT_JOB {
            return self.printer.answer(request);
        }

        let document = page_data.ok_or(BehaviourError::MissingPageData(Operation::PRINT_JOB))?;
        let job = self.printer.create_job(request);
        tracing::info!(
            job_id = job.id,
            job_name = job.name.as_deref().unwrap_or(""),
            bytes = document.len(),
            "Print job received"
        );
        self.sink.accept(&job, document).await?;
        Ok(self
            .printer
            .job_response(request, job.id, JobState::Pending, &["none"]))
    }

    fn ppd_document(&self) -> String {
        self.printer.ppd().text()
    }
}
