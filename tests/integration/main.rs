//! Integration test target.

mod mock_exchange;
mod scan_pipeline;
