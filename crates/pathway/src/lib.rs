//! Skillpath pathway planning.
//!
//! Generates learning pathways from the skill graph, post-processes them
//! into bounded steps and serves them through a TTL cache.

#![warn(missing_docs)]

pub mod adapter;
pub mod cache;
pub mod enhance;
pub mod error;
pub mod estimator;
pub mod generator;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod fixtures;

pub use adapter::ContentAdapter;
pub use cache::PathwayCache;
pub use enhance::{align_to_style, group_by_level, split_oversized, Leveled, PathwayEnhancements};
pub use error::{PathwayError, Result};
pub use estimator::TimeEstimator;
pub use generator::{PathwayGenerator, PathwayRequest};
pub use scoring::score_progression;
pub use service::PathwayService;
