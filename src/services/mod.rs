//! Service layer for revlens
//!
//! The pipeline pieces live here: upload parsing, the analysis backend
//! client, the single-job gate, the background worker, and the cached
//! recommendation report.

pub mod analysis_client;
pub mod batch_parser;
pub mod batch_processor;
pub mod busy_gate;
pub mod job_runner;
pub mod recommendation_cache;
pub mod recommendations;
