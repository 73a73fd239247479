//! Skill graph (Layer 1)
//!
//! Directed acyclic graph of skills and prerequisite edges: cycle-safe
//! mutation, neighbour lookups, shortest paths and topological ordering.

#![warn(missing_docs)]

pub mod error;
pub mod graph;
mod traversal;

pub use error::{GraphError, Result};
pub use graph::SkillGraph;
