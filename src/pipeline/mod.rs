//! Pipelines built from JSON configuration.

pub(crate) mod config;
pub(crate) mod session;
