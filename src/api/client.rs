// src/api/client.rs
// HTTP client for upload, status, results, and document endpoints

use super::types::{
    DocumentFormat, HydrationError, Job, PollError, ResultsPayload, StatusSnapshot,
    SubmissionError, UploadResponse,
};
use super::{ResultSource, StatusSource};
use crate::config::ClientConfig;
use crate::options::ProcessingOptions;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart;
use std::path::Path;
use std::time::Duration;

/// Accepted video containers and the MIME type sent for each.
const ALLOWED_CONTAINERS: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("mov", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("mkv", "video/x-matroska"),
    ("webm", "video/webm"),
    ("m4v", "video/x-m4v"),
];

pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    upload_timeout: Duration,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        tracing::info!("API client initialized: {}", config.base_url);

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            upload_timeout: config.upload_timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Reads a local video file and submits it for processing.
    ///
    /// Options must already be normalized; see
    /// [`ProcessingOptions::normalize`].
    pub async fn submit_file(
        &self,
        path: &Path,
        options: &ProcessingOptions,
    ) -> Result<Job, SubmissionError> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| SubmissionError::Input(format!("no file name in {}", path.display())))?
            .to_string();

        // Reject before reading the payload into memory.
        mime_for(&filename)?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| SubmissionError::Input(e.to_string()))?;

        self.submit_bytes(&filename, bytes, options).await
    }

    /// Submits an in-memory video as one multipart upload.
    pub async fn submit_bytes(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        options: &ProcessingOptions,
    ) -> Result<Job, SubmissionError> {
        let mime = mime_for(filename)?;

        if bytes.is_empty() {
            return Err(SubmissionError::Input("empty video file".to_string()));
        }

        tracing::info!(
            "Uploading {} ({} bytes, dedup={})",
            filename,
            bytes.len(),
            options.deduplication_method.as_str()
        );

        let file_part = multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime)
            .map_err(|e| SubmissionError::Input(e.to_string()))?;

        // The backend reads booleans as literal "true"/"false" form fields.
        let form = multipart::Form::new()
            .text("enable_transcription", flag(options.enable_transcription))
            .text(
                "enable_slide_detection",
                flag(options.enable_slide_detection),
            )
            .text("enable_summarization", flag(options.enable_summarization))
            .text(
                "enable_slide_summaries",
                flag(options.enable_slide_summaries),
            )
            .text("return_transcript", flag(options.return_transcript))
            .text("return_slides", flag(options.return_slides))
            .text(
                "deduplication_method",
                options.deduplication_method.as_str(),
            )
            .part("file", file_part);

        let response = self
            .client
            .post(self.url("/api/upload"))
            .timeout(self.upload_timeout)
            .multipart(form)
            .send()
            .await;

        self.handle_submission_response(response).await
    }

    /// Re-queues an interrupted job from its last server-side checkpoint.
    ///
    /// The returned handle refers to the same job id; attach a fresh
    /// session to it, since a terminal reconciler is never reused.
    pub async fn resume(&self, job_id: &str) -> Result<Job, SubmissionError> {
        tracing::info!("Resuming job {}", job_id);

        let response = self
            .client
            .post(self.url(&format!("/api/resume/{}", job_id)))
            .send()
            .await;

        self.handle_submission_response(response).await
    }

    async fn handle_submission_response(
        &self,
        response: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<Job, SubmissionError> {
        match response {
            Ok(resp) => {
                let status = resp.status();

                if status.is_success() {
                    let upload: UploadResponse = resp
                        .json()
                        .await
                        .map_err(|e| SubmissionError::Malformed(e.to_string()))?;

                    tracing::info!(
                        "Job {} accepted: {:?} ({})",
                        upload.job_id,
                        upload.status,
                        upload.message
                    );

                    let now = Utc::now();
                    Ok(Job {
                        id: upload.job_id,
                        created_at: now,
                        updated_at: now,
                    })
                } else {
                    let reason = resp.text().await.unwrap_or_default();
                    Err(SubmissionError::Rejected {
                        status: status.as_u16(),
                        reason,
                    })
                }
            }
            Err(e) => {
                if e.is_timeout() {
                    Err(SubmissionError::Timeout)
                } else {
                    Err(SubmissionError::Transport(e.to_string()))
                }
            }
        }
    }

    /// Resource reference for a slide image. Fetching and rendering the
    /// image belongs to the presentation layer.
    pub fn slide_image_url(&self, job_id: &str, slide_id: &str) -> String {
        self.url(&format!("/api/results/{}/slide/{}", job_id, slide_id))
    }

    /// Fetches a slide image as raw bytes.
    pub async fn fetch_slide_image(
        &self,
        job_id: &str,
        slide_id: &str,
    ) -> Result<Vec<u8>, HydrationError> {
        self.fetch_binary(&self.slide_image_url(job_id, slide_id))
            .await
    }

    /// Downloads the rendered summary document. Plain passthrough.
    pub async fn download_document(
        &self,
        job_id: &str,
        format: DocumentFormat,
    ) -> Result<Vec<u8>, HydrationError> {
        let url = self.url(&format!(
            "/api/results/{}/download/{}",
            job_id,
            format.as_str()
        ));
        self.fetch_binary(&url).await
    }

    async fn fetch_binary(&self, url: &str) -> Result<Vec<u8>, HydrationError> {
        let response = self.client.get(url).send().await;

        match response {
            Ok(resp) => {
                let status = resp.status();

                if status.is_success() {
                    let bytes = resp
                        .bytes()
                        .await
                        .map_err(|e| HydrationError::Transport(e.to_string()))?;
                    Ok(bytes.to_vec())
                } else {
                    let message = resp.text().await.unwrap_or_default();
                    Err(HydrationError::Backend {
                        status: status.as_u16(),
                        message,
                    })
                }
            }
            Err(e) => {
                if e.is_timeout() {
                    Err(HydrationError::Timeout)
                } else {
                    Err(HydrationError::Transport(e.to_string()))
                }
            }
        }
    }
}

#[async_trait]
impl StatusSource for ApiClient {
    async fn fetch_status(&self, job_id: &str) -> Result<StatusSnapshot, PollError> {
        let response = self
            .client
            .get(self.url(&format!("/api/status/{}", job_id)))
            .send()
            .await;

        match response {
            Ok(resp) => {
                let status = resp.status();

                if status.is_success() {
                    resp.json::<StatusSnapshot>()
                        .await
                        .map_err(|e| PollError::Malformed(e.to_string()))
                } else {
                    let message = resp.text().await.unwrap_or_default();
                    Err(PollError::Backend {
                        status: status.as_u16(),
                        message,
                    })
                }
            }
            Err(e) => {
                if e.is_timeout() {
                    Err(PollError::Timeout)
                } else {
                    Err(PollError::Transport(e.to_string()))
                }
            }
        }
    }
}

#[async_trait]
impl ResultSource for ApiClient {
    async fn fetch_results(&self, job_id: &str) -> Result<ResultsPayload, HydrationError> {
        tracing::info!("Fetching results for job {}", job_id);

        let response = self
            .client
            .get(self.url(&format!("/api/results/{}", job_id)))
            .send()
            .await;

        match response {
            Ok(resp) => {
                let status = resp.status();

                if status.is_success() {
                    resp.json::<ResultsPayload>()
                        .await
                        .map_err(|e| HydrationError::Malformed(e.to_string()))
                } else {
                    let message = resp.text().await.unwrap_or_default();
                    Err(HydrationError::Backend {
                        status: status.as_u16(),
                        message,
                    })
                }
            }
            Err(e) => {
                if e.is_timeout() {
                    Err(HydrationError::Timeout)
                } else {
                    Err(HydrationError::Transport(e.to_string()))
                }
            }
        }
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Maps a filename to its upload MIME type, rejecting anything outside
/// the backend's container whitelist.
fn mime_for(filename: &str) -> Result<&'static str, SubmissionError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    ALLOWED_CONTAINERS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
        .ok_or_else(|| SubmissionError::UnsupportedFormat(filename.to_string()))
}
