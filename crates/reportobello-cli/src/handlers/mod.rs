#![deny(clippy::all, clippy::pedantic)]

pub mod builds;
pub mod env;
pub mod templates;
