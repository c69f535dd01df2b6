use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One audit event as received from the search cluster's audit trail.
///
/// Field names are not fixed: the configured `*_key` settings decide which
/// entry holds the user, cluster, privilege and so on. Values that are not
/// strings (or lists of strings) read as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawAuditRecord {
    fields: Map<String, Value>,
}

impl RawAuditRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a JSON value; anything but an object yields `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the string stored under `key`, if any.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Returns the value under `key` as a list of names.
    ///
    /// A single string becomes a one-element list; non-string array items are
    /// ignored. `None` means the field is absent or null.
    pub fn get_list(&self, key: &str) -> Option<Vec<&str>> {
        match self.fields.get(key)? {
            Value::String(s) => Some(vec![s.as_str()]),
            Value::Array(items) => Some(items.iter().filter_map(Value::as_str).collect()),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for RawAuditRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Operation class attached to every metric as `query_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Admin,
    Monitor,
    Destroy,
    Read,
    Delete,
    Write,
    Unknown,
    Msearch,
    Bulk,
    Search,
    Other,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Admin => "admin",
            QueryType::Monitor => "monitor",
            QueryType::Destroy => "destroy",
            QueryType::Read => "read",
            QueryType::Delete => "delete",
            QueryType::Write => "write",
            QueryType::Unknown => "unknown",
            QueryType::Msearch => "msearch",
            QueryType::Bulk => "bulk",
            QueryType::Search => "search",
            QueryType::Other => "other",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    UserQueryCount,
    IndexQueryCount,
    FailedLoginCount,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::UserQueryCount => "user_query_count",
            MetricName::IndexQueryCount => "index_query_count",
            MetricName::FailedLoginCount => "failed_login_count",
        }
    }
}

/// A formatted metric timestamp. Which variant is produced depends on the
/// configured `TimestampFormat`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum MetricTimestamp {
    Iso(String),
    EpochMillis(i64),
    EpochMillisString(String),
}

impl From<MetricTimestamp> for Value {
    fn from(ts: MetricTimestamp) -> Self {
        match ts {
            MetricTimestamp::Iso(s) | MetricTimestamp::EpochMillisString(s) => Value::String(s),
            MetricTimestamp::EpochMillis(ms) => Value::from(ms),
        }
    }
}

/// Whether a metric counts a user's activity or activity on a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// No `index` field is rendered.
    User,
    /// An `index` field is rendered, null when the resource is unknown.
    Index(Option<String>),
}

/// Every dimension of a metric: all fields except the value.
///
/// Two metrics with equal keys are the same series point and get summed by
/// the accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricKey {
    pub timestamp: Option<MetricTimestamp>,
    pub metric_name: MetricName,
    pub user: Option<String>,
    pub cluster: Option<String>,
    pub query_type: QueryType,
    pub scope: Scope,
}

/// A flat metric record ready for time-series storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRecord {
    pub key: MetricKey,
    pub value: u64,
}

impl MetricRecord {
    pub fn new(key: MetricKey) -> Self {
        Self { key, value: 1 }
    }

    pub fn index(&self) -> Option<&str> {
        match &self.key.scope {
            Scope::Index(index) => index.as_deref(),
            Scope::User => None,
        }
    }

    /// Renders the record as ordered fields. Dimension names carry `prefix`;
    /// `timestamp`, `metric_name` and `metric_value` never do.
    pub fn to_fields(&self, prefix: &str) -> Map<String, Value> {
        let key = &self.key;
        let mut fields = Map::new();
        fields.insert(
            "timestamp".to_string(),
            key.timestamp.clone().map(Value::from).unwrap_or(Value::Null),
        );
        fields.insert("metric_name".to_string(), key.metric_name.as_str().into());
        fields.insert("metric_value".to_string(), self.value.into());
        fields.insert(format!("{prefix}user"), optional(&key.user));
        fields.insert(format!("{prefix}cluster"), optional(&key.cluster));
        fields.insert(format!("{prefix}query_type"), key.query_type.as_str().into());
        if let Scope::Index(index) = &key.scope {
            fields.insert(format!("{prefix}index"), optional(index));
        }
        fields
    }
}

fn optional(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}
