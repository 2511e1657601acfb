//! fundwatch — polls fund valuations until every holding reports a fresh
//! date, then mails each owner a daily investments report.
//!
//! Library crate exposing all modules for use by integration tests and
//! the binary entry point.

pub mod config;
pub mod engine;
pub mod report;
pub mod source;
pub mod storage;
pub mod types;
