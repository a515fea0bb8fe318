//! Display-ready state and the pure decisions that produce it.

use dataset::DatasetStore;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{InteractionState, SentimentResult, StatusMode},
    error::{AnalysisError, IngestionError},
};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusView {
    pub mode: StatusMode,
    pub message: String,
}

impl StatusView {
    pub fn neutral(message: impl Into<String>) -> Self {
        Self {
            mode: StatusMode::Neutral,
            message: message.into(),
        }
    }
}

/// Everything a rendering surface needs after each transition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewState {
    pub state: InteractionState,
    pub status: StatusView,
    pub count: usize,
    pub review: Option<String>,
    pub result: Option<SentimentResult>,
    pub error: Option<String>,
    pub busy: bool,
}

pub trait Presenter: Send {
    fn render(&mut self, view: &ViewState);
}

pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn render(&mut self, _view: &ViewState) {}
}

pub fn status_for_load(outcome: &Result<usize, IngestionError>) -> StatusView {
    match outcome {
        Ok(count) => StatusView {
            mode: StatusMode::Ready,
            message: format!("{count} reviews loaded"),
        },
        Err(err) => StatusView {
            mode: StatusMode::Error,
            message: err.to_string(),
        },
    }
}

pub fn status_for_analysis(error: Option<&AnalysisError>, count: usize) -> StatusView {
    match error {
        None => StatusView {
            mode: StatusMode::Ready,
            message: format!("{count} reviews loaded"),
        },
        Some(err) => StatusView {
            mode: StatusMode::Error,
            message: err.to_string(),
        },
    }
}

/// Analysis needs a loaded, non-empty store.
pub fn check_ready(store: &DatasetStore) -> Result<(), AnalysisError> {
    if store.is_loaded() && !store.is_empty() {
        Ok(())
    } else {
        Err(AnalysisError::NotLoaded)
    }
}
