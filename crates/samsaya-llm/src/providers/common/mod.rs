//! Shared helpers for provider implementations.

pub mod sse;
