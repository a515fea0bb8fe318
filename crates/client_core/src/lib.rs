use std::sync::Arc;

use dataset::{DatasetSource, DatasetStore};
use rand::{rngs::StdRng, SeedableRng};
use shared::{
    domain::{InteractionState, Review, SentimentResult},
    error::{AnalysisError, IngestionError},
};
use tracing::{info, warn};

pub mod classifier;
pub mod config;
pub mod normalize;
pub mod view;

pub use classifier::{Classifier, HttpClassifier, DEFAULT_CLASSIFIER_URL};
pub use normalize::normalize;
pub use view::{NullPresenter, Presenter, StatusView, ViewState};

use view::{check_ready, status_for_analysis, status_for_load};

/// Result of one analyze action: a review was rendered (with or without a
/// recognizable sentiment) or the action failed. Never both.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Rendered {
        review: Review,
        result: Option<SentimentResult>,
    },
    Failed(AnalysisError),
}

impl AnalysisOutcome {
    pub fn error(&self) -> Option<&AnalysisError> {
        match self {
            AnalysisOutcome::Rendered { .. } => None,
            AnalysisOutcome::Failed(err) => Some(err),
        }
    }
}

/// Owns the dataset store and drives load/analyze, pushing a [`ViewState`]
/// to the presenter at every transition.
///
/// Methods take `&mut self`; callers that share a controller must
/// serialize access.
pub struct Controller {
    store: DatasetStore,
    source: Arc<dyn DatasetSource>,
    classifier: Arc<dyn Classifier>,
    rng: StdRng,
    view: ViewState,
    presenter: Box<dyn Presenter>,
}

impl Controller {
    pub fn new(source: Arc<dyn DatasetSource>, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            store: DatasetStore::new(),
            source,
            classifier,
            rng: StdRng::from_os_rng(),
            view: ViewState {
                status: StatusView::neutral("Dataset not loaded"),
                ..ViewState::default()
            },
            presenter: Box::new(NullPresenter),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_presenter(mut self, presenter: Box<dyn Presenter>) -> Self {
        self.presenter = presenter;
        self
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    /// (Re)ingests the dataset. The previous reviews are dropped before the
    /// fetch starts, whatever the outcome.
    pub async fn load(&mut self) -> Result<usize, IngestionError> {
        self.view.state = InteractionState::LoadingDataset;
        self.view.status = StatusView::neutral(format!("Loading {}", self.source.describe()));
        self.view.count = 0;
        self.view.error = None;
        self.view.busy = true;
        self.render();

        let outcome = dataset::ingest(self.source.as_ref(), &mut self.store).await;

        self.view.busy = false;
        self.view.count = self.store.len();
        self.view.status = status_for_load(&outcome);
        match &outcome {
            Ok(_) => {
                self.view.state = InteractionState::Idle;
            }
            Err(err) => {
                self.view.state = InteractionState::Error;
                self.view.error = Some(err.to_string());
            }
        }
        self.render();
        outcome
    }

    /// Picks a random review, classifies it and renders the verdict.
    pub async fn analyze(&mut self, token: Option<&str>) -> AnalysisOutcome {
        let picked = check_ready(&self.store).and_then(|()| {
            self.store
                .pick(&mut self.rng)
                .cloned()
                .ok_or(AnalysisError::NotLoaded)
        });
        let review = match picked {
            Ok(review) => review,
            Err(err) => {
                warn!("analyze: dataset not loaded");
                self.view.review = None;
                return self.finish(AnalysisOutcome::Failed(err));
            }
        };
        let token = token.map(str::trim).filter(|t| !t.is_empty());

        self.view.state = InteractionState::Analyzing;
        self.view.review = Some(review.as_str().to_string());
        self.view.result = None;
        self.view.error = None;
        self.view.busy = true;
        self.view.status = StatusView::neutral("Analyzing review");
        self.render();

        info!(
            chars = review.as_str().chars().count(),
            authenticated = token.is_some(),
            "analyze: classifying review"
        );
        let outcome = match self.classifier.classify(review.as_str(), token).await {
            Ok(raw) => {
                let result = normalize(&raw);
                if result.is_none() {
                    warn!("analyze: unrecognized classifier response shape");
                }
                AnalysisOutcome::Rendered { review, result }
            }
            Err(err) => AnalysisOutcome::Failed(err),
        };
        self.finish(outcome)
    }

    fn finish(&mut self, outcome: AnalysisOutcome) -> AnalysisOutcome {
        self.view.busy = false;
        self.view.status = status_for_analysis(outcome.error(), self.store.len());
        match &outcome {
            AnalysisOutcome::Rendered { result, .. } => {
                self.view.state = InteractionState::ResultShown;
                self.view.result = result.clone();
                self.view.error = None;
                if let Some(result) = result {
                    info!(
                        label = %result.label,
                        score = result.score,
                        verdict = result.verdict.as_str(),
                        "analyze: result rendered"
                    );
                }
            }
            AnalysisOutcome::Failed(err) => {
                self.view.state = InteractionState::Error;
                self.view.result = None;
                self.view.error = Some(err.to_string());
                warn!(code = ?err.code(), error = %err, "analyze: failed");
            }
        }
        self.render();
        outcome
    }

    fn render(&mut self) {
        self.presenter.render(&self.view);
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
