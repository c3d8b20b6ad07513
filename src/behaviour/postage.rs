//! Forwards print jobs to a postal letter API.
//!
//! # Responsibilities
//! - Upload the document to the service
//! - Submit a letter for posting to the configured recipient
//! - Surface service-reported errors as `BehaviourError::RemoteService`
//!
//! # Design Decisions
//! - One `reqwest::Client` per process; it pools connections internally and
//!   is safe to share between concurrent jobs
//! - Only PDF documents are meaningful to the service; the printer should be
//!   started with the PDF format

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{BehaviourError, DocumentSink, Job};
use crate::config::PostageConfig;

#[derive(Serialize)]
struct UploadRequest<'a> {
    username: &'a str,
    password: &'a str,
    filename: &'a str,
    #[serde(rename = "fileContent")]
    file_content: &'a [u8],
}

#[derive(Deserialize)]
struct Envelope<T> {
    d: T,
}

#[derive(Deserialize)]
struct UploadResult {
    #[serde(rename = "ErrorMessages", default)]
    error_messages: Option<Vec<String>>,
    #[serde(rename = "FileCreatedGUID", default)]
    file_guid: Option<String>,
}

#[derive(Deserialize)]
struct SubmitResult {
    #[serde(rename = "ErrorMessages", default)]
    error_messages: Option<Vec<String>>,
}

/// Client for the remote letter posting API.
#[derive(Debug, Clone)]
pub struct PostageClient {
    http: reqwest::Client,
    config: PostageConfig,
}

impl PostageClient {
    pub fn new(config: PostageConfig) -> Self {
        Self::with_http_client(config, reqwest::Client::new())
    }

    pub fn with_http_client(config: PostageConfig, http: reqwest::Client) -> Self {
        Self { http, config }
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), name)
    }

    /// Upload `document` and post it as a letter.
    pub async fn post_letter(&self, filename: &str, document: &[u8]) -> Result<(), BehaviourError> {
        let guid = self.upload(filename, document).await?;
        tracing::debug!(filename, guid = %guid, "Document uploaded");
        self.submit(&guid).await?;
        tracing::info!(filename, recipient = %self.config.recipient.name, "Letter submitted for posting");
        Ok(())
    }

    async fn upload(&self, filename: &str, document: &[u8]) -> Result<String, BehaviourError> {
        let request = UploadRequest {
            username: &self.config.username,
            password: &self.config.password,
            filename,
            file_content: document,
        };
        let result: Envelope<UploadResult> = self
            .http
            .post(self.endpoint("UploadDocument"))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        check_errors(result.d.error_messages)?;
        result
            .d
            .file_guid
            .ok_or_else(|| BehaviourError::RemoteService("upload returned no document id".into()))
    }

    async fn submit(&self, guid: &str) -> Result<(), BehaviourError> {
        let recipient = &self.config.recipient;
        let line = |i: usize| recipient.address_lines.get(i).cloned().unwrap_or_default();
        let body = json!({
            "userName": self.config.username,
            "password": self.config.password,
            "letterForPosting": {
                "SourceClient": "ipp-server",
                "Addresses": [{
                    "ReceiverName": recipient.name,
                    "ReceiverAddressLine1": line(0),
                    "ReceiverAddressLine2": line(1),
                    "ReceiverAddressTownCityOrLine3": line(2),
                    "ReceiverAddressCountyStateOrLine4": line(3),
                    "ReceiverAddressPostCode": recipient.postcode,
                }],
                "ReceiverCountryCode": recipient.country,
                "Postage": self.config.postage,
                "Paper": self.config.paper,
                "Envelope": self.config.envelope,
                "Extras": self.config.extras,
                "FileAttachementGUIDs": [guid],
            }
        });

        let result: Envelope<SubmitResult> = self
            .http
            .post(self.endpoint("SendSubmitLetterForPosting"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        check_errors(result.d.error_messages)
    }
}

fn check_errors(messages: Option<Vec<String>>) -> Result<(), BehaviourError> {
    match messages {
        Some(messages) if !messages.is_empty() => {
            Err(BehaviourError::RemoteService(messages.join("; ")))
        }
        _ => Ok(()),
    }
}

/// Posts every print job as a letter through [`PostageClient`].
#[derive(Debug, Clone)]
pub struct PostToRemoteService {
    client: PostageClient,
}

impl PostToRemoteService {
    pub fn new(client: PostageClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentSink for PostToRemoteService {
    async fn accept(&self, job: &Job, document: Bytes) -> Result<(), BehaviourError> {
        let filename = format!("ipp-server-print-job-{}.{}", job.id, job.extension);
        self.client.post_letter(&filename, &document).await
    }
}
