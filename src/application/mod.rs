//! Client services: sync, build orchestration and artifact retrieval.

pub mod api;
pub mod artifact;
pub mod build;
pub mod error;
pub mod sync;
