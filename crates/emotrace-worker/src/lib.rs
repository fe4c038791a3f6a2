//! Background analysis surface for the EmoTrace pipeline.
//!
//! This crate provides:
//! - Worker configuration from environment variables
//! - Tracing setup and per-video structured logging
//! - The aggregation engine (video summaries, daily rollups)
//! - An async `Analyzer` that drives the blocking pipeline off the
//!   request path
//!
//! Persistence and HTTP routing live in the service layer; the worker
//! hands back plain data.

pub mod aggregate;
pub mod analyzer;
pub mod config;
pub mod error;
pub mod logging;

pub use aggregate::{build_daily_report, plan_report_write, summarize_events, ReportWrite};
pub use analyzer::{AnalysisOutcome, Analyzer};
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::{init_logging, VideoLogger};
