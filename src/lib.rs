//! Constraint-based weekly timetable solver.
//!
//! Expands curriculum demand into atomic sessions, allocates default home
//! rooms to class groups, compiles every hard rule into a boolean ILP model,
//! and searches for an optimized assignment under a wall-clock budget. A
//! dependency-free backtracking engine covers the hard-constraints-only
//! case behind the same contract.

pub mod backtrack;
pub mod config;
pub mod data;
pub mod error;
pub mod expand;
pub mod homeroom;
pub mod model;
pub mod report;
pub mod server;
pub mod solver;
