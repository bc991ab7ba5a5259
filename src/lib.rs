//! Load paired LLM comparison results and compute the dashboard metrics.
//!
//! The wide CSV (one row per question, model A vs model B) is reshaped into
//! a long table of [`types::Observation`]s by [`loader`], filtered by
//! [`filter`], and summarized by [`metrics`], [`ranking`] and [`reports`].
pub mod cache;
pub mod error;
pub mod filter;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod ranking;
pub mod reports;
pub mod types;
pub mod util;

pub use error::LoadError;
pub use filter::{filter, FilterSpec};
pub use loader::{load, LoadReport};
pub use types::{ModelPosition, Observation};
