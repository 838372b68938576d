//! Hybrid Adaptive Large Neighborhood Search for the pickup-and-delivery
//! vehicle routing problem with time windows.

pub mod config;
pub mod domain;
pub mod error;
pub mod solver;

pub use config::SolverConfig;
pub use domain::instance::{Instance, RawInstance};
pub use domain::solution::Solution;
pub use error::SolverError;
pub use solver::Solver;
