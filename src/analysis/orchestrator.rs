//! Drives the analysis state machine against the backend.
//!
//! The orchestrator owns the single current [`AnalysisSession`] behind a
//! `watch` channel. Every mutation goes through [`AnalysisSession::step`];
//! subscribers observe each published snapshot.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::session::{AnalysisEvent, AnalysisPhase, AnalysisSession, Effect, Outcome};
use crate::api::{ApiClient, DeepToken, DetailToken, LiteToken};
use crate::config::AnalysisConfig;
use crate::error::ApiResult;

/// Backend operations the analysis protocol needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Create a document and return its id.
    async fn create_document(&self, text: &str, title: &str) -> ApiResult<i64>;
    /// Lexical tokenization.
    async fn lite_analysis(&self, document_id: i64, limit: u32) -> ApiResult<Vec<LiteToken>>;
    /// Grammatical analysis.
    async fn deep_analysis(&self, document_id: i64, limit: u32) -> ApiResult<Vec<DeepToken>>;
    /// Token-to-word mapping from the legacy detail route.
    async fn document_detail(&self, document_id: i64) -> ApiResult<Vec<DetailToken>>;
}

#[async_trait]
impl AnalysisBackend for ApiClient {
    async fn create_document(&self, text: &str, title: &str) -> ApiResult<i64> {
        ApiClient::create_document(self, text, title).await
    }

    async fn lite_analysis(&self, document_id: i64, limit: u32) -> ApiResult<Vec<LiteToken>> {
        ApiClient::lite_analysis(self, document_id, limit).await
    }

    async fn deep_analysis(&self, document_id: i64, limit: u32) -> ApiResult<Vec<DeepToken>> {
        ApiClient::deep_analysis(self, document_id, limit).await
    }

    async fn document_detail(&self, document_id: i64) -> ApiResult<Vec<DetailToken>> {
        ApiClient::document_detail(self, document_id)
            .await
            .map(|detail| detail.tokens)
    }
}

/// Owner of the current analysis session.
pub struct AnalysisOrchestrator<B: AnalysisBackend> {
    backend: Arc<B>,
    config: AnalysisConfig,
    state: watch::Sender<AnalysisSession>,
}

impl<B: AnalysisBackend> AnalysisOrchestrator<B> {
    /// Create an orchestrator with an idle session.
    pub fn new(backend: Arc<B>, config: AnalysisConfig) -> Self {
        let (state, _) = watch::channel(AnalysisSession::new());
        Self {
            backend,
            config,
            state,
        }
    }

    /// Current session snapshot.
    pub fn snapshot(&self) -> AnalysisSession {
        self.state.borrow().clone()
    }

    /// Receive every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<AnalysisSession> {
        self.state.subscribe()
    }

    /// Record an edit of the input text.
    ///
    /// A change to the trimmed text invalidates the session: results still in
    /// flight for the old text will be discarded when they arrive.
    pub fn edit_phrase(&self, phrase: impl Into<String>) -> Outcome {
        let (outcome, _) = self.dispatch(AnalysisEvent::PhraseEdited {
            phrase: phrase.into(),
        });
        outcome
    }

    /// Run the full two-phase analysis of `phrase`.
    ///
    /// Returns the session as it stands once this run's requests have settled.
    /// If the session was superseded meanwhile, the returned snapshot belongs to
    /// the newer session.
    pub async fn analyze(&self, phrase: impl Into<String>) -> AnalysisSession {
        let (outcome, effects) = self.dispatch(AnalysisEvent::Trigger {
            phrase: phrase.into(),
        });
        if outcome == Outcome::Ignored {
            debug!("Analysis trigger ignored");
        }

        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            let event = self.perform(effect).await;
            let (_, follow_ups) = self.dispatch(event);
            queue.extend(follow_ups);
        }

        self.snapshot()
    }

    async fn perform(&self, effect: Effect) -> AnalysisEvent {
        match effect {
            Effect::CreateDocument { fence, text } => {
                match self
                    .backend
                    .create_document(&text, &self.config.document_title)
                    .await
                {
                    Ok(document_id) => AnalysisEvent::DocumentCreated { fence, document_id },
                    Err(error) => AnalysisEvent::RequestFailed { fence, error },
                }
            }
            Effect::RunLite { fence, document_id } => {
                match self
                    .backend
                    .lite_analysis(document_id, self.config.token_limit)
                    .await
                {
                    Ok(tokens) => AnalysisEvent::LiteCompleted { fence, tokens },
                    Err(error) => AnalysisEvent::RequestFailed { fence, error },
                }
            }
            Effect::RunDeepAndDetail { fence, document_id } => {
                self.dispatch(AnalysisEvent::DeepDispatched { fence });

                let (deep, detail) = tokio::join!(
                    self.backend
                        .deep_analysis(document_id, self.config.token_limit),
                    self.backend.document_detail(document_id),
                );
                if let Err(e) = &detail {
                    warn!(document_id, error = %e, "Detail lookup failed");
                }
                AnalysisEvent::DeepSettled {
                    fence,
                    deep,
                    detail,
                }
            }
        }
    }

    /// Apply one event and publish the result if it changed anything.
    fn dispatch(&self, event: AnalysisEvent) -> (Outcome, Vec<Effect>) {
        let mut result = (Outcome::Ignored, Vec::new());

        self.state.send_if_modified(|state| {
            let transition = std::mem::take(state).step(event);
            *state = transition.state;
            let changed = transition.outcome == Outcome::Applied;
            result = (transition.outcome, transition.effects);
            changed
        });

        match result.0 {
            Outcome::Applied => {
                let session = self.state.borrow();
                debug!(
                    generation = %session.generation(),
                    phase = %session.phase(),
                    tokens = session.tokens().len(),
                    "Session updated"
                );
                if session.phase() == AnalysisPhase::LiteReady {
                    info!(tokens = session.tokens().len(), "Lite analysis ready");
                }
            }
            Outcome::Stale => debug!("Stale result dropped"),
            Outcome::Ignored => {}
        }
        result
    }
}
