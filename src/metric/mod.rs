use crate::config::ProcessorConfig;
use crate::error::{ConfigError, Result};
use crate::model::{MetricKey, MetricName, MetricRecord, MetricTimestamp, QueryType, RawAuditRecord, Scope};
use std::fmt;
use std::str::FromStr;

pub mod failed_login;
pub mod granted_privileges;

/// Audit categories that have a metric generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditCategory {
    GrantedPrivileges,
    FailedLogin,
}

impl AuditCategory {
    pub const ALL: [AuditCategory; 2] = [AuditCategory::GrantedPrivileges, AuditCategory::FailedLogin];

    /// Name of the category as written in audit records.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditCategory::GrantedPrivileges => "GRANTED_PRIVILEGES",
            AuditCategory::FailedLogin => "FAILED_LOGIN",
        }
    }

    /// Runs this category's generator over one record.
    pub fn generate(&self, record: &RawAuditRecord, config: &ProcessorConfig) -> Result<Vec<MetricRecord>> {
        match self {
            AuditCategory::GrantedPrivileges => Ok(granted_privileges::generate(record, config)),
            AuditCategory::FailedLogin => failed_login::generate(record, config),
        }
    }
}

impl FromStr for AuditCategory {
    type Err = ConfigError;

    /// Case-insensitive.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        AuditCategory::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnsupportedCategory(s.to_string()))
    }
}

impl fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dimensions shared by all metrics generated from one record.
#[derive(Debug, Clone)]
struct MetricBase {
    timestamp: Option<MetricTimestamp>,
    user: Option<String>,
    cluster: Option<String>,
    query_type: QueryType,
}

impl MetricBase {
    fn new(record: &RawAuditRecord, config: &ProcessorConfig, query_type: QueryType) -> Self {
        let keys = &config.keys;
        Self {
            timestamp: config.timestamps.normalize(record.get_str(&keys.timestamp_key)),
            user: record.get_str(&keys.user_key).map(str::to_string),
            cluster: record.get_str(&keys.cluster_key).map(str::to_string),
            query_type,
        }
    }

    fn metric(&self, metric_name: MetricName, scope: Scope) -> MetricRecord {
        MetricRecord::new(MetricKey {
            timestamp: self.timestamp.clone(),
            metric_name,
            user: self.user.clone(),
            cluster: self.cluster.clone(),
            query_type: self.query_type,
            scope,
        })
    }
}

/// Drops repeated items, keeping first-seen order.
fn unique<T: PartialEq>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut out = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::config::{MetricConfig, ProcessorConfig};
    use crate::model::RawAuditRecord;
    use serde_json::{json, Value};

    pub fn config(aggregate_index: bool) -> ProcessorConfig {
        MetricConfig {
            categories: vec!["GRANTED_PRIVILEGES".into(), "FAILED_LOGIN".into()],
            aggregate_index,
            ..Default::default()
        }
        .compile()
        .unwrap()
    }

    pub fn granted_privileges() -> RawAuditRecord {
        record(json!({
            "@timestamp": "2023-02-03T04:05:06.777Z",
            "audit_category": "GRANTED_PRIVILEGES",
            "audit_request_privilege": "indices:data/read/search",
            "audit_request_effective_user": "test_user",
            "audit_cluster_name": "TEST_CLUSTER",
            "audit_trace_indices": "test_index_1",
            "audit_trace_resolved_indices": [
                "test_index_1-000001",
                "test_index_1-000002",
                "test_index_1-000003"
            ],
            "audit_request_layer": "TRANSPORT",
            "audit_transport_request_type": "SearchRequest"
        }))
    }

    pub fn failed_login() -> RawAuditRecord {
        record(json!({
            "@timestamp": "2023-02-03T04:05:06.777Z",
            "audit_category": "FAILED_LOGIN",
            "audit_request_effective_user": "test_user",
            "audit_cluster_name": "TEST_CLUSTER",
            "audit_request_layer": "REST",
            "audit_rest_request_path": "/",
            "audit_request_body": "{}"
        }))
    }

    pub fn record(value: Value) -> RawAuditRecord {
        RawAuditRecord::from_value(value).unwrap()
    }

    /// Applies `fields` on top of `base`.
    pub fn with(mut base: RawAuditRecord, fields: Value) -> RawAuditRecord {
        if let Value::Object(fields) = fields {
            for (key, value) in fields {
                base.insert(key, value);
            }
        }
        base
    }
}
