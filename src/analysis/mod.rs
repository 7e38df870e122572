//! Two-phase grammatical analysis.
//!
//! This module provides:
//! - A merged token model fed by lite, deep and legacy detail responses
//! - A pure state machine that fences every asynchronous result by
//!   generation and phrase hash
//! - An orchestrator that runs the protocol against an [`AnalysisBackend`]

mod hash;
mod merge;
mod orchestrator;
mod session;
mod token;

pub use hash::PhraseHash;
pub use merge::{merge, TokenPatch, TokenTable};
pub use orchestrator::{AnalysisBackend, AnalysisOrchestrator};
pub use session::{
    AnalysisEvent, AnalysisPhase, AnalysisSession, Effect, Fence, Generation, Outcome,
    SessionError, Transition,
};
pub use token::{GrammaticalCase, SyntacticRole, Token, TokenId};

#[cfg(test)]
pub use orchestrator::MockAnalysisBackend;
