//! Metrics for `GRANTED_PRIVILEGES` audit events.
//!
//! Every granted request counts once for the user, and once per index it
//! resolved to.

use super::{unique, MetricBase};
use crate::classify::classify_privilege;
use crate::config::ProcessorConfig;
use crate::model::{MetricName, MetricRecord, RawAuditRecord, Scope};

/// Records without a privilege produce nothing.
pub fn generate(record: &RawAuditRecord, config: &ProcessorConfig) -> Vec<MetricRecord> {
    let Some(privilege) = record.get_str(&config.keys.privilege_key) else {
        return Vec::new();
    };

    let base = MetricBase::new(record, config, classify_privilege(privilege));
    let mut metrics = vec![base.metric(MetricName::UserQueryCount, Scope::User)];
    metrics.extend(
        indices(record, config)
            .into_iter()
            .map(|index| base.metric(MetricName::IndexQueryCount, Scope::Index(index))),
    );
    metrics
}

/// Resolved indices win over requested ones. With neither present a single
/// unknown index is reported.
fn indices(record: &RawAuditRecord, config: &ProcessorConfig) -> Vec<Option<String>> {
    let keys = &config.keys;
    let names: Vec<Option<&str>> = match record
        .get_list(&keys.r_indices_key)
        .or_else(|| record.get_list(&keys.indices_key))
    {
        Some(names) => names.into_iter().map(Some).collect(),
        None => vec![None],
    };

    let aggregator = &config.aggregator;
    if !aggregator.is_enabled() {
        return names.into_iter().map(|name| name.map(str::to_string)).collect();
    }
    unique(names.into_iter().map(|name| aggregator.aggregate_opt(name)))
}
