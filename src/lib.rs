//! # KlinikDeutsch client
//!
//! Client-side orchestration for KlinikDeutsch, a medical German trainer for
//! Portuguese speakers. The backend tokenizes clinical texts, builds LLM
//! flashcards and schedules reviews; this crate drives it.
//!
//! ## Features
//!
//! - **Two-phase analysis**: a fast lexical pass is published first, a slower
//!   grammatical pass is merged in when it arrives
//! - **Stale-result fencing**: results for an edited or re-triggered phrase are
//!   discarded, never applied
//! - **Resilient transport**: idempotent-only retry with linear backoff and a
//!   single-flight CSRF bootstrap
//! - **Review queue**: due cards are rated in order; failed submissions keep the
//!   card current
//! - **Local history**: finished analyses and accepted ratings in SQLite
//!
//! ## Architecture
//!
//! ```text
//! CLI → AnalysisOrchestrator ─┐
//!     → ReviewQueue ──────────┼→ ApiClient (HTTP, cookies, CSRF) → backend
//!                             │
//!       SqliteStorage ←───────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use klinik_deutsch::{AnalysisOrchestrator, ApiClient, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let client = ApiClient::new(&config.api, config.request.clone())?;
//!     client.login("anna", "secret").await?;
//!
//!     let orchestrator = AnalysisOrchestrator::new(Arc::new(client), config.analysis.clone());
//!     let session = orchestrator.analyze("Der Patient ist bewusstlos.").await;
//!     println!("{} tokens, phase {}", session.tokens().len(), session.phase());
//!     Ok(())
//! }
//! ```

/// Two-phase analysis: token model, state machine and orchestrator.
pub mod analysis;
/// Backend client, CSRF bootstrap and wire types.
pub mod api;
/// Command-line subcommands.
pub mod cli;
/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Review queue and scoring.
pub mod review;
/// Local SQLite history.
pub mod storage;

pub use analysis::{AnalysisOrchestrator, AnalysisPhase, AnalysisSession, TokenTable};
pub use api::ApiClient;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use review::{ReviewQueue, ReviewScore};
pub use storage::{SqliteStorage, Storage};
