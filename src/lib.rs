//! EXP Scanner: multi-symbol relative performance monitor.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod cli;
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod exchange;
pub mod presentation;
pub mod types;
