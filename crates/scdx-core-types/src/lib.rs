//! Core types shared across SCDX facilities
//!
//! This crate provides foundational types used by the error, logging and
//! run-orchestration layers:
//!
//! - **Correlation types**: RunId, TraceId
//! - **Sensitive data**: Sensitive<T> marker for automatic redaction
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;
pub mod sensitive;

pub use correlation::{RunId, TraceId};
pub use sensitive::Sensitive;
