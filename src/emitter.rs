use crate::config::MetricConfig;
use crate::error::ConfigError;
use crate::model::RawAuditRecord;
use crate::processor::{EventTime, MetricProcessor};
use anyhow::{Context, Result};
use chrono::Utc;
use crossbeam_channel::Sender;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

/// A group of rendered metrics emitted together under one tag and time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricChunk {
    pub tag: String,
    pub time: EventTime,
    pub records: Vec<Map<String, Value>>,
}

/// What one call to [`MetricEmitter::emit`] produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EmitReport {
    pub chunks: usize,
    pub metrics: usize,
    pub skipped: usize,
}

/// Turns batches of audit records into metric chunks on a channel.
pub struct MetricEmitter {
    tag: String,
    processor: MetricProcessor,
    sender: Sender<MetricChunk>,
}

impl MetricEmitter {
    /// Fails when the tag is missing or the configuration does not compile.
    pub fn new(config: &MetricConfig, sender: Sender<MetricChunk>) -> std::result::Result<Self, ConfigError> {
        let tag = config
            .tag
            .as_deref()
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .ok_or(ConfigError::MissingTag)?
            .to_string();
        Ok(Self {
            tag,
            processor: MetricProcessor::new(config.compile()?),
            sender,
        })
    }

    /// Processes one batch and sends its accumulated metrics.
    ///
    /// All chunks of a batch share the emission time. Chunks hold at most
    /// `event_stream_size` metrics.
    pub fn emit<I>(&self, records: I) -> Result<EmitReport>
    where
        I: IntoIterator<Item = (EventTime, RawAuditRecord)>,
    {
        let batch = self.processor.accumulate(records);
        let config = self.processor.config();
        let time = Utc::now();

        let mut report = EmitReport {
            metrics: batch.metrics.len(),
            skipped: batch.skipped.len(),
            ..Default::default()
        };
        for chunk in batch.metrics.chunks(config.event_stream_size) {
            let records = chunk
                .iter()
                .map(|metric| metric.to_fields(&config.metadata_prefix))
                .collect();
            self.sender
                .send(MetricChunk {
                    tag: self.tag.clone(),
                    time,
                    records,
                })
                .context("Metric receiver dropped")?;
            report.chunks += 1;
        }

        info!(
            tag = %self.tag,
            chunks = report.chunks,
            metrics = report.metrics,
            skipped = report.skipped,
            "emitted metric batch"
        );
        Ok(report)
    }
}
