//! Core engine: EXP metric computation and the scan loop.

pub mod metric;
pub mod scanner;
