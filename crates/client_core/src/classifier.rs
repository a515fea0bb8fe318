use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::{error::AnalysisError, protocol::ClassifyRequest};
use tracing::{debug, warn};

pub const DEFAULT_CLASSIFIER_URL: &str =
    "https://api-inference.huggingface.co/models/distilbert-base-uncased-finetuned-sst-2-english";

/// Remote sentiment classifier. Returns the raw JSON body so that shape
/// handling stays in [`crate::normalize`].
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str, token: Option<&str>) -> Result<Value, AnalysisError>;
}

pub struct HttpClassifier {
    http: Client,
    endpoint: String,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, text: &str, token: Option<&str>) -> Result<Value, AnalysisError> {
        let mut request = self.http.post(&self.endpoint).json(&ClassifyRequest {
            inputs: text.to_string(),
        });
        if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            warn!(endpoint = %self.endpoint, error = %e, "classifier: request failed");
            AnalysisError::Network(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .ok()
                .and_then(|body| error_detail(&body));
            warn!(
                endpoint = %self.endpoint,
                status = status.as_u16(),
                detail = detail.as_deref().unwrap_or(""),
                "classifier: non-success status"
            );
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::Network(e.to_string()))?;
        let value = serde_json::from_str::<Value>(&body)
            .map_err(|e| AnalysisError::InvalidResponse(e.to_string()))?;
        debug!(status = status.as_u16(), "classifier: response received");
        Ok(value)
    }
}

/// Best-effort extraction of a textual `error` field from an error body.
fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
#[path = "tests/classifier_tests.rs"]
mod tests;
