//! HTTP handlers for scribe-api.

pub mod health;
pub mod jobs;
pub mod results;
