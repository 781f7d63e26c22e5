//! Extension contracts the UI layer plugs into the pipeline.

pub mod auth_failure;

pub use auth_failure::*;
