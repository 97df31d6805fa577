use std::future::Future;
use std::time::Duration;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use thiserror::Error;

use crate::prediction::PredictionResult;
use crate::selection::{Slot, StagedImage};

/// Longest slice of an error body kept for diagnostics.
const MAX_DIAGNOSTIC_BODY: usize = 2048;

#[derive(Debug, Error)]
pub enum PredictError {
    /// The service answered with a non-success status.
    #[error("prediction service returned HTTP {status}")]
    Status { status: u16, body: String },
    #[error("request to prediction service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed prediction response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("no response from prediction service within {0:?}")]
    TimedOut(Duration),
    #[error("submission cancelled")]
    Cancelled,
    /// The background task running the request panicked or was aborted.
    #[error("submission task failed: {0}")]
    Worker(String),
}

impl PredictError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            PredictError::Status { status, .. } => Some(*status),
            PredictError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Full detail for the operator log: status and raw body, or the error chain.
    pub fn diagnostic(&self) -> String {
        if let PredictError::Status { status, body } = self {
            let body = truncate_chars(body, MAX_DIAGNOSTIC_BODY);
            return if body.is_empty() {
                format!("HTTP {} (empty body)", status)
            } else {
                format!("HTTP {}: {}", status, body)
            };
        }

        let mut detail = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            let text = cause.to_string();
            if !detail.contains(&text) {
                detail.push_str(": ");
                detail.push_str(&text);
            }
            source = cause.source();
        }
        detail
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Both images of one submission, copied out of the input stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub past: StagedImage,
    pub recent: StagedImage,
}

impl SubmitRequest {
    fn into_form(self) -> Result<Form, reqwest::Error> {
        let mut form = Form::new();
        for (slot, image) in [(Slot::Past, self.past), (Slot::Recent, self.recent)] {
            let mime = image.mime_type();
            let part = Part::bytes(image.bytes)
                .file_name(image.name)
                .mime_str(mime)?;
            form = form.part(slot.part_name(), part);
        }
        Ok(form)
    }
}

/// Anything that can turn a pair of staged images into a prediction.
pub trait PredictionService {
    fn predict(
        &self,
        request: SubmitRequest,
    ) -> impl Future<Output = Result<PredictionResult, PredictError>> + Send;
}

#[derive(Clone)]
pub struct PredictClient {
    client: Client,
    endpoint: String,
}

impl PredictClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn predict(&self, request: SubmitRequest) -> Result<PredictionResult, PredictError> {
        let form = request.into_form()?;

        tracing::debug!(endpoint = %self.endpoint, "posting prediction request");

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PredictError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        PredictionResult::from_json(&body).map_err(PredictError::Decode)
    }
}

impl PredictionService for PredictClient {
    fn predict(
        &self,
        request: SubmitRequest,
    ) -> impl Future<Output = Result<PredictionResult, PredictError>> + Send {
        PredictClient::predict(self, request)
    }
}
