//! Printer that cancels every job at the device.

use async_trait::async_trait;
use bytes::Bytes;

use super::{Behaviour, BehaviourError, Printer};
use crate::ipp::{IppMessage, JobState, Operation};

/// Answers Print-Job with job state `aborted` and reason
/// `job-canceled-at-device`, without ever asking for the document.
pub struct RejectAll {
    printer: Printer,
}

impl RejectAll {
    pub fn new(printer: Printer) -> Self {
        Self { printer }
    }
}

#[async_trait]
impl Behaviour for RejectAll {
    fn expects_page_data(&self, _request: &IppMessage) -> bool {
        false
    }

    async fn handle(
        &self,
        request: &IppMessage,
        _page_data: Option<Bytes>,
    ) -> Result<IppMessage, BehaviourError> {
        if request.operation() != Operation::PRINT_JOB {
            return self.printer.answer(request);
        }
        let job = self.printer.create_job(request);
        tracing::info!(job_id = job.id, "Rejecting print job");
        Ok(self.printer.job_response(
            request,
            job.id,
            JobState::Aborted,
            &["job-canceled-at-device"],
        ))
    }

    fn ppd_document(&self) -> String {
        self.printer.ppd().text()
    }
}
