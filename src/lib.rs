//! Converts search-cluster security audit events into time-series metrics.
//!
//! Records flow one way: [`processor::MetricProcessor`] routes each audit
//! record to the generator of its [`metric::AuditCategory`], the generators
//! classify the operation and resolve target indices, and
//! [`accumulator::MetricAccumulator`] sums metrics sharing every dimension.
//! [`emitter::MetricEmitter`] is the host-side wrapper that chunks and sends
//! the result, and [`server`] exposes it over HTTP.

pub mod accumulator;
pub mod classify;
pub mod config;
pub mod emitter;
pub mod error;
pub mod index;
pub mod metric;
pub mod model;
pub mod processor;
pub mod request;
pub mod server;
pub mod timestamp;

pub use config::{MetricConfig, ProcessorConfig};
pub use emitter::{EmitReport, MetricChunk, MetricEmitter};
pub use error::{ConfigError, MetricError};
pub use metric::AuditCategory;
pub use model::{MetricRecord, RawAuditRecord};
pub use processor::{AccumulatedBatch, EventTime, MetricProcessor, ProcessedBatch};
