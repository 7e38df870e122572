//! Two-phase analysis state machine.
//!
//! The session is a plain value: [`AnalysisSession::step`] consumes the
//! current snapshot and one [`AnalysisEvent`] and returns the next snapshot
//! plus the side effects the driver must perform. No I/O happens here.
//!
//! # Phases
//!
//! ```text
//! idle -> analyzing_lite -> lite_ready -> analyzing_deep -> deep_ready
//!              |                                 |
//!              +------------> error <------------+
//! ```
//!
//! Every result event carries the [`Fence`] its request was issued under.
//! A result is applied only if that fence equals the session's current fence;
//! otherwise it is dropped. Superseded requests are never cancelled.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::hash::PhraseHash;
use super::merge::TokenTable;
use crate::api::{DeepToken, DetailToken, LiteToken};
use crate::error::{ApiError, ApiResult, ErrorKind};

/// Monotonically increasing session counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Fencing token presented by every asynchronous result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fence {
    pub generation: Generation,
    pub phrase_hash: PhraseHash,
}

impl std::fmt::Display for Fence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.generation, self.phrase_hash)
    }
}

/// Lifecycle phase of the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPhase {
    #[default]
    Idle,
    AnalyzingLite,
    LiteReady,
    AnalyzingDeep,
    DeepReady,
    Error,
}

impl AnalysisPhase {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisPhase::Idle => "idle",
            AnalysisPhase::AnalyzingLite => "analyzing_lite",
            AnalysisPhase::LiteReady => "lite_ready",
            AnalysisPhase::AnalyzingDeep => "analyzing_deep",
            AnalysisPhase::DeepReady => "deep_ready",
            AnalysisPhase::Error => "error",
        }
    }

    /// Lite tokens are published and grammar is still pending.
    pub fn is_partial(&self) -> bool {
        matches!(self, AnalysisPhase::LiteReady | AnalysisPhase::AnalyzingDeep)
    }
}

impl std::fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AnalysisPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(AnalysisPhase::Idle),
            "analyzing_lite" => Ok(AnalysisPhase::AnalyzingLite),
            "lite_ready" => Ok(AnalysisPhase::LiteReady),
            "analyzing_deep" => Ok(AnalysisPhase::AnalyzingDeep),
            "deep_ready" => Ok(AnalysisPhase::DeepReady),
            "error" => Ok(AnalysisPhase::Error),
            _ => Err(format!("Unknown analysis phase: {}", s)),
        }
    }
}

/// Error surfaced to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionError {
    pub kind: ErrorKind,
    /// Short localized message.
    pub message: String,
    /// Technical description for logs.
    pub detail: String,
}

impl SessionError {
    fn from_api(err: &ApiError) -> Self {
        Self {
            kind: err.kind(),
            message: err.user_message(),
            detail: err.to_string(),
        }
    }
}

/// Input to the state machine.
#[derive(Debug)]
pub enum AnalysisEvent {
    /// User asked for an analysis of `phrase`.
    Trigger { phrase: String },
    /// User changed the input text.
    PhraseEdited { phrase: String },
    DocumentCreated { fence: Fence, document_id: i64 },
    LiteCompleted { fence: Fence, tokens: Vec<LiteToken> },
    /// The driver has sent the deep and detail calls.
    DeepDispatched { fence: Fence },
    /// Both deep-phase calls have settled, each on its own.
    DeepSettled {
        fence: Fence,
        deep: ApiResult<Vec<DeepToken>>,
        detail: ApiResult<Vec<DetailToken>>,
    },
    /// Create-document or lite analysis failed.
    RequestFailed { fence: Fence, error: ApiError },
}

/// Side effect requested by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CreateDocument { fence: Fence, text: String },
    RunLite { fence: Fence, document_id: i64 },
    /// Deep analysis and legacy detail, concurrently.
    RunDeepAndDetail { fence: Fence, document_id: i64 },
}

impl Effect {
    /// Fence the effect was issued under.
    pub fn fence(&self) -> Fence {
        match self {
            Effect::CreateDocument { fence, .. }
            | Effect::RunLite { fence, .. }
            | Effect::RunDeepAndDetail { fence, .. } => *fence,
        }
    }
}

/// How an event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The session changed.
    Applied,
    /// Valid fence but nothing to do in the current phase.
    Ignored,
    /// Result from a superseded request; dropped.
    Stale,
}

/// Result of one step.
#[derive(Debug)]
pub struct Transition {
    pub state: AnalysisSession,
    pub effects: Vec<Effect>,
    pub outcome: Outcome,
}

impl Transition {
    fn applied(state: AnalysisSession, effects: Vec<Effect>) -> Self {
        Self {
            state,
            effects,
            outcome: Outcome::Applied,
        }
    }

    fn unchanged(state: AnalysisSession, outcome: Outcome) -> Self {
        Self {
            state,
            effects: Vec::new(),
            outcome,
        }
    }
}

/// Snapshot of the current analysis session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisSession {
    generation: Generation,
    phrase: String,
    phrase_hash: Option<PhraseHash>,
    phase: AnalysisPhase,
    document_id: Option<i64>,
    tokens: TokenTable,
    error: Option<SessionError>,
    warning: Option<SessionError>,
}

impl AnalysisSession {
    /// Fresh idle session.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn phrase_hash(&self) -> Option<PhraseHash> {
        self.phrase_hash
    }

    pub fn phase(&self) -> AnalysisPhase {
        self.phase
    }

    pub fn document_id(&self) -> Option<i64> {
        self.document_id
    }

    /// Published tokens.
    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    /// Failure that moved the session to `error`.
    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    /// Non-fatal failure (legacy detail call) while deep analysis succeeded.
    pub fn warning(&self) -> Option<&SessionError> {
        self.warning.as_ref()
    }

    /// Fence results must present to be applied.
    pub fn fence(&self) -> Option<Fence> {
        self.phrase_hash.map(|phrase_hash| Fence {
            generation: self.generation,
            phrase_hash,
        })
    }

    fn is_current(&self, fence: Fence) -> bool {
        self.fence() == Some(fence)
    }

    /// Advance the state machine by one event.
    pub fn step(self, event: AnalysisEvent) -> Transition {
        match event {
            AnalysisEvent::Trigger { phrase } => self.on_trigger(phrase),
            AnalysisEvent::PhraseEdited { phrase } => self.on_phrase_edited(phrase),
            AnalysisEvent::DocumentCreated { fence, document_id } => {
                self.on_document_created(fence, document_id)
            }
            AnalysisEvent::LiteCompleted { fence, tokens } => self.on_lite_completed(fence, tokens),
            AnalysisEvent::DeepDispatched { fence } => self.on_deep_dispatched(fence),
            AnalysisEvent::DeepSettled {
                fence,
                deep,
                detail,
            } => self.on_deep_settled(fence, deep, detail),
            AnalysisEvent::RequestFailed { fence, error } => self.on_request_failed(fence, error),
        }
    }

    fn on_trigger(mut self, phrase: String) -> Transition {
        if self.phase == AnalysisPhase::AnalyzingLite {
            debug!(generation = %self.generation, "Analysis already running, trigger ignored");
            return Transition::unchanged(self, Outcome::Ignored);
        }

        let text = phrase.trim().to_string();
        self.reset_for(phrase);

        if text.is_empty() {
            self.phase = AnalysisPhase::Error;
            self.error = Some(SessionError {
                kind: ErrorKind::Validation,
                message: "Informe um texto em alemão.".to_string(),
                detail: "empty phrase".to_string(),
            });
            return Transition::applied(self, Vec::new());
        }

        self.phase = AnalysisPhase::AnalyzingLite;
        let Some(fence) = self.fence() else {
            return Transition::unchanged(self, Outcome::Ignored);
        };
        debug!(fence = %fence, "Analysis started");
        Transition::applied(self, vec![Effect::CreateDocument { fence, text }])
    }

    fn on_phrase_edited(mut self, phrase: String) -> Transition {
        if self.phrase_hash == Some(PhraseHash::of(&phrase)) {
            self.phrase = phrase;
            return Transition::unchanged(self, Outcome::Ignored);
        }

        debug!(generation = %self.generation, phase = %self.phase, "Phrase edited, session invalidated");
        self.reset_for(phrase);
        Transition::applied(self, Vec::new())
    }

    fn on_document_created(mut self, fence: Fence, document_id: i64) -> Transition {
        if !self.is_current(fence) {
            return self.discard(fence, "create document");
        }
        if self.phase != AnalysisPhase::AnalyzingLite {
            return Transition::unchanged(self, Outcome::Ignored);
        }

        self.document_id = Some(document_id);
        Transition::applied(self, vec![Effect::RunLite { fence, document_id }])
    }

    fn on_lite_completed(mut self, fence: Fence, tokens: Vec<LiteToken>) -> Transition {
        if !self.is_current(fence) {
            return self.discard(fence, "lite analysis");
        }
        let (AnalysisPhase::AnalyzingLite, Some(document_id)) = (self.phase, self.document_id) else {
            return Transition::unchanged(self, Outcome::Ignored);
        };

        self.tokens = TokenTable::from_lite(tokens);
        self.phase = AnalysisPhase::LiteReady;
        debug!(fence = %fence, tokens = self.tokens.len(), "Lite analysis ready");
        Transition::applied(self, vec![Effect::RunDeepAndDetail { fence, document_id }])
    }

    fn on_deep_dispatched(mut self, fence: Fence) -> Transition {
        if !self.is_current(fence) {
            return self.discard(fence, "deep dispatch");
        }
        if self.phase != AnalysisPhase::LiteReady {
            return Transition::unchanged(self, Outcome::Ignored);
        }

        self.phase = AnalysisPhase::AnalyzingDeep;
        Transition::applied(self, Vec::new())
    }

    fn on_deep_settled(
        mut self,
        fence: Fence,
        deep: ApiResult<Vec<DeepToken>>,
        detail: ApiResult<Vec<DetailToken>>,
    ) -> Transition {
        if !self.is_current(fence) {
            return self.discard(fence, "deep analysis");
        }
        if !matches!(
            self.phase,
            AnalysisPhase::LiteReady | AnalysisPhase::AnalyzingDeep
        ) {
            return Transition::unchanged(self, Outcome::Ignored);
        }

        let detail_error = match detail {
            Ok(detail_tokens) => {
                let touched = self.tokens.upsert(&detail_tokens);
                debug!(fence = %fence, touched, "Detail tokens merged");
                None
            }
            Err(e) => Some(SessionError::from_api(&e)),
        };

        match deep {
            Ok(deep_tokens) => {
                let touched = self.tokens.upsert(&deep_tokens);
                debug!(fence = %fence, touched, "Deep tokens merged");
                self.phase = AnalysisPhase::DeepReady;
                self.error = None;
                self.warning = detail_error;
            }
            Err(e) => {
                self.phase = AnalysisPhase::Error;
                self.error = Some(SessionError::from_api(&e));
                self.warning = detail_error;
            }
        }

        Transition::applied(self, Vec::new())
    }

    fn on_request_failed(mut self, fence: Fence, error: ApiError) -> Transition {
        if !self.is_current(fence) {
            return self.discard(fence, "request failure");
        }
        if self.phase != AnalysisPhase::AnalyzingLite {
            return Transition::unchanged(self, Outcome::Ignored);
        }

        self.phase = AnalysisPhase::Error;
        self.document_id = None;
        self.tokens = TokenTable::default();
        self.error = Some(SessionError::from_api(&error));
        Transition::applied(self, Vec::new())
    }

    /// Start a new generation for `phrase` with nothing published.
    fn reset_for(&mut self, phrase: String) {
        self.generation = self.generation.next();
        self.phrase_hash = Some(PhraseHash::of(&phrase));
        self.phrase = phrase;
        self.phase = AnalysisPhase::Idle;
        self.document_id = None;
        self.tokens = TokenTable::default();
        self.error = None;
        self.warning = None;
    }

    fn discard(self, fence: Fence, source: &str) -> Transition {
        debug!(
            source,
            result_fence = %fence,
            current_fence = ?self.fence().map(|f| f.to_string()),
            "Stale result discarded"
        );
        Transition::unchanged(self, Outcome::Stale)
    }
}
