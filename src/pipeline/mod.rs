//! The OCR submission pipeline.
//!
//! Each submodule implements exactly one concern, so every stage is
//! independently testable and the transport can be swapped (e.g. for a
//! scripted mock) without touching retry or state logic.
//!
//! ## Data Flow
//!
//! ```text
//! document ──▶ validate ──▶ transport ──▶ result
//! (bytes)     (pre-flight)  (multipart    (trimmed text)
//!                            POST + retry)
//! ```
//!
//! 1. [`validate`]  — synchronous pre-flight checks; failures never reach
//!    the network and are never retried
//! 2. [`transport`] — one multipart POST per attempt; classifies every
//!    failure into the error taxonomy
//! 3. [`processor`] — drives the attempt loop, owns the retry timer and the
//!    cancellation token, and publishes [`state::ProcessingState`] snapshots

pub mod processor;
pub mod state;
pub mod transport;
pub mod validate;
