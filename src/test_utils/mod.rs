//! Test utilities for exercising storage backends
//!
//! Provides a recording wrapper that counts backend calls and injects failures,
//! so behavior can be asserted against any [`BackendAdapter`](crate::storage::backend::BackendAdapter).

pub mod mocks;

pub use mocks::RecordingBackend;
