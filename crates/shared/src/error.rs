use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    DatasetEmpty,
    DatasetUnavailable,
    NotLoaded,
    Network,
    Unauthorized,
    RateLimited,
    ModelLoading,
    Upstream,
    InvalidResponse,
    Validation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Failures while fetching or parsing the review dataset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestionError {
    #[error("No reviews found in the dataset.")]
    Empty,
    #[error("Dataset has no \"text\" column.")]
    MissingColumn,
    #[error("Failed to load dataset: {0}")]
    Transport(String),
    #[error("Failed to parse dataset: {0}")]
    Parse(String),
}

impl IngestionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            IngestionError::Empty | IngestionError::MissingColumn => ErrorCode::DatasetEmpty,
            IngestionError::Transport(_) | IngestionError::Parse(_) => {
                ErrorCode::DatasetUnavailable
            }
        }
    }
}

impl From<&IngestionError> for ApiError {
    fn from(value: &IngestionError) -> Self {
        ApiError::new(value.code(), value.to_string())
    }
}

/// Failures of a single analyze action. None of them are fatal; the next
/// action starts from a clean attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("Reviews are not loaded yet. Reload the dataset and try again.")]
    NotLoaded,
    #[error("Network error: {0}")]
    Network(String),
    #[error("{}", api_status_message(*status, detail.as_deref()))]
    Api { status: u16, detail: Option<String> },
    #[error("Invalid response from the sentiment API: {0}")]
    InvalidResponse(String),
}

impl AnalysisError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AnalysisError::NotLoaded => ErrorCode::NotLoaded,
            AnalysisError::Network(_) => ErrorCode::Network,
            AnalysisError::Api { status: 401, .. } => ErrorCode::Unauthorized,
            AnalysisError::Api { status: 429, .. } => ErrorCode::RateLimited,
            AnalysisError::Api { status: 503, .. } => ErrorCode::ModelLoading,
            AnalysisError::Api { .. } => ErrorCode::Upstream,
            AnalysisError::InvalidResponse(_) => ErrorCode::InvalidResponse,
        }
    }
}

impl From<&AnalysisError> for ApiError {
    fn from(value: &AnalysisError) -> Self {
        ApiError::new(value.code(), value.to_string())
    }
}

fn api_status_message(status: u16, detail: Option<&str>) -> String {
    let guidance = match status {
        401 => "API error 401: invalid or missing API token. Check the token and try again."
            .to_string(),
        429 => "API error 429: rate limited. Wait a moment and retry; adding an API token may help."
            .to_string(),
        503 => "API error 503: the model is still loading. Retry in a few seconds.".to_string(),
        other => format!("API error {other}."),
    };
    match detail {
        Some(detail) => format!("{guidance} Details: {detail}"),
        None => guidance,
    }
}
