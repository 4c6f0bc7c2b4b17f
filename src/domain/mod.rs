//! Template definitions, variable schemas and build results.

pub mod build;
pub mod error;
pub mod fingerprint;
pub mod schema;
pub mod template;
