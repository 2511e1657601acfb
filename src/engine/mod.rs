//! Core engine — the poll-until-complete scheduler and the aggregation
//! of collected quotes into per-owner reports.

pub mod aggregator;
pub mod poller;
