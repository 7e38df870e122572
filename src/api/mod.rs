//! KlinikDeutsch backend client.
//!
//! This module provides:
//! - A reqwest transport with per-attempt timeout, idempotent-only retry and
//!   linear backoff
//! - One-shot CSRF bootstrap shared across client clones
//! - Typed request/response shapes for every backend route

mod client;
mod csrf;
mod endpoints;
mod types;

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;

pub use client::{
    backoff_delay, is_idempotent, is_mutating, is_retryable, ApiClient, CSRF_COOKIE, CSRF_HEADER,
    CSRF_PATH, RETRYABLE_STATUSES,
};
pub use csrf::CsrfBootstrap;
pub use types::*;
