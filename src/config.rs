use crate::error::ConfigError;
use crate::index::IndexAggregator;
use crate::metric::AuditCategory;
use crate::timestamp::{TimestampFormat, TimestampNormalizer};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Names of the audit record fields the generators read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldKeys {
    pub category_key: String,
    pub layer_key: String,
    pub request_type_key: String,
    pub cluster_key: String,
    pub user_key: String,
    pub indices_key: String,
    pub r_indices_key: String,
    pub timestamp_key: String,
    pub privilege_key: String,
    pub rest_request_path_key: String,
    pub request_body_key: String,
}

impl Default for FieldKeys {
    fn default() -> Self {
        Self {
            category_key: "audit_category".to_string(),
            layer_key: "audit_request_layer".to_string(),
            request_type_key: "audit_transport_request_type".to_string(),
            cluster_key: "audit_cluster_name".to_string(),
            user_key: "audit_request_effective_user".to_string(),
            indices_key: "audit_trace_indices".to_string(),
            r_indices_key: "audit_trace_resolved_indices".to_string(),
            timestamp_key: "@timestamp".to_string(),
            privilege_key: "audit_request_privilege".to_string(),
            rest_request_path_key: "audit_rest_request_path".to_string(),
            request_body_key: "audit_request_body".to_string(),
        }
    }
}

/// Settings as supplied by the host, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricConfig {
    /// Tag metric chunks are emitted on. Required by the emitter.
    pub tag: Option<String>,
    /// Accepted audit categories, e.g. `GRANTED_PRIVILEGES`.
    pub categories: Vec<String>,
    #[serde(flatten)]
    pub keys: FieldKeys,
    pub timestamp_format: TimestampFormat,
    /// Prefix for the `user`, `cluster`, `query_type` and `index` fields.
    pub metadata_prefix: String,
    /// Fold index names with the built-in rules when no explicit rules exist.
    pub aggregate_index: bool,
    /// Explicit index folding rules, applied in order.
    pub aggregate_index_clean_suffix: Vec<String>,
    /// Bucket width for metric timestamps, in seconds.
    pub aggregate_interval: Option<i64>,
    /// Maximum number of metrics per emitted chunk.
    pub event_stream_size: usize,
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self {
            tag: None,
            categories: vec![AuditCategory::GrantedPrivileges.as_str().to_string()],
            keys: FieldKeys::default(),
            timestamp_format: TimestampFormat::Iso,
            metadata_prefix: String::new(),
            aggregate_index: false,
            aggregate_index_clean_suffix: Vec::new(),
            aggregate_interval: None,
            event_stream_size: 1000,
        }
    }
}

impl MetricConfig {
    /// Validates the settings and builds the runtime configuration.
    ///
    /// Accepted category names are kept as written. Names without a
    /// generator are dropped with a warning rather than failing, so a
    /// dispatcher only ever sees categories it can handle.
    pub fn compile(&self) -> Result<ProcessorConfig, ConfigError> {
        if self.event_stream_size == 0 {
            return Err(ConfigError::EmptyEventStream);
        }

        let mut categories: Vec<String> = Vec::new();
        for name in &self.categories {
            match name.parse::<AuditCategory>() {
                Ok(_) if !categories.contains(name) => categories.push(name.clone()),
                Ok(_) => {}
                Err(err) => warn!(error = %err, "ignoring configured category"),
            }
        }

        let aggregator = if !self.aggregate_index_clean_suffix.is_empty() {
            IndexAggregator::new(self.aggregate_index_clean_suffix.as_slice())?
        } else if self.aggregate_index {
            IndexAggregator::with_default_rules()?
        } else {
            IndexAggregator::disabled()
        };

        Ok(ProcessorConfig {
            categories,
            keys: self.keys.clone(),
            timestamps: TimestampNormalizer::new(self.timestamp_format, self.aggregate_interval),
            aggregator,
            metadata_prefix: self.metadata_prefix.clone(),
            event_stream_size: self.event_stream_size,
        })
    }
}

/// Validated configuration consumed by the processor and the generators.
///
/// Only [`MetricConfig::compile`] builds one.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Category values a record must carry verbatim to be processed.
    pub(crate) categories: Vec<String>,
    pub(crate) keys: FieldKeys,
    pub(crate) timestamps: TimestampNormalizer,
    pub(crate) aggregator: IndexAggregator,
    pub(crate) metadata_prefix: String,
    /// Never zero.
    pub(crate) event_stream_size: usize,
}

impl ProcessorConfig {
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn event_stream_size(&self) -> usize {
        self.event_stream_size
    }
}
