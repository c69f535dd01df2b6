//! Metrics for `FAILED_LOGIN` audit events.
//!
//! The REST path gives the kind of request. For `_bulk` and `_msearch` the
//! body is read as well, since it names the indices the request would have
//! touched.

use super::{unique, MetricBase};
use crate::config::ProcessorConfig;
use crate::error::Result;
use crate::model::{MetricName, MetricRecord, QueryType, RawAuditRecord, Scope};
use crate::request::{bulk_indices, msearch_indices, parse_rest_path};

/// Emits one metric per index named by the request, or a single metric with
/// no index when none is named. Fails only on an unreadable request body.
pub fn generate(record: &RawAuditRecord, config: &ProcessorConfig) -> Result<Vec<MetricRecord>> {
    let keys = &config.keys;
    let request = parse_rest_path(record.get_str(&keys.rest_request_path_key));
    let body = record
        .get_str(&keys.request_body_key)
        .filter(|body| !body.trim().is_empty());

    let mut names = match (request.query_type, body) {
        (QueryType::Bulk, Some(body)) => bulk_indices(body)?,
        (QueryType::Msearch, Some(body)) => msearch_indices(body)?,
        _ => Vec::new(),
    };
    // The path target is the default index for body lines that omit one.
    names.extend(request.target.map(str::to_string));

    let base = MetricBase::new(record, config, request.query_type);
    let indices = unique(names.iter().map(|name| config.aggregator.aggregate(name)));
    if indices.is_empty() {
        return Ok(vec![base.metric(MetricName::FailedLoginCount, Scope::Index(None))]);
    }
    Ok(indices
        .into_iter()
        .map(|index| base.metric(MetricName::FailedLoginCount, Scope::Index(Some(index))))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricError;
    use crate::metric::fixtures::{self, with};
    use crate::model::MetricTimestamp;
    use serde_json::json;

    fn run(fields: serde_json::Value, aggregate_index: bool) -> Vec<MetricRecord> {
        let record = with(fixtures::failed_login(), fields);
        generate(&record, &fixtures::config(aggregate_index)).unwrap()
    }

    fn summary(metrics: &[MetricRecord]) -> Vec<(QueryType, Option<&str>)> {
        metrics.iter().map(|m| (m.key.query_type, m.index())).collect()
    }

    #[test]
    fn test_plain_request_is_other_without_index() {
        let metrics = run(json!({}), false);

        assert_eq!(metrics.len(), 1);
        let metric = &metrics[0];
        assert_eq!(metric.key.metric_name, MetricName::FailedLoginCount);
        assert_eq!(metric.key.scope, Scope::Index(None));
        assert_eq!(metric.key.query_type, QueryType::Other);
        assert_eq!(metric.key.user.as_deref(), Some("test_user"));
        assert_eq!(
            metric.key.timestamp,
            Some(MetricTimestamp::Iso("2023-02-03T04:05:06.777Z".into()))
        );
    }

    #[test]
    fn test_bulk_indices_from_body() {
        let metrics = run(
            json!({
                "audit_rest_request_path": "/_bulk",
                "audit_request_body": "{\"index\": {\"_index\":\"test_index1\",\"_type\":\"_doc\"}}\n{}\n\
                                       {\"index\": {\"_index\":\"test_index2\",\"_type\":\"_doc\"}}\n{}\n"
            }),
            false,
        );
        assert_eq!(
            summary(&metrics),
            vec![
                (QueryType::Bulk, Some("test_index1")),
                (QueryType::Bulk, Some("test_index2"))
            ]
        );
    }

    #[test]
    fn test_write_uses_path_target() {
        let metrics = run(json!({ "audit_rest_request_path": "/test_index_write/_doc" }), false);
        assert_eq!(summary(&metrics), vec![(QueryType::Write, Some("test_index_write"))]);
    }

    #[test]
    fn test_search_uses_path_target() {
        let metrics = run(json!({ "audit_rest_request_path": "/test_index_read/_search" }), false);
        assert_eq!(summary(&metrics), vec![(QueryType::Search, Some("test_index_read"))]);
    }

    #[test]
    fn test_msearch_body_then_path_target() {
        let metrics = run(
            json!({
                "audit_rest_request_path": "/test_index_search/_msearch",
                "audit_request_body": "{\"ignore_unavailable\": true,\"index\":\"test_index_pattern*\",\
                                       \"search_type\":\"query_then_fetch\"}\n{}\n"
            }),
            true,
        );
        assert_eq!(
            summary(&metrics),
            vec![
                (QueryType::Msearch, Some("test_index_pattern")),
                (QueryType::Msearch, Some("test_index_search"))
            ]
        );
    }

    #[test]
    fn test_msearch_index_list_collapses_with_target() {
        let metrics = run(
            json!({
                "audit_rest_request_path": "/test_index_pattern_list1*/_msearch",
                "audit_request_body": "{\"index\":[\"test_index_pattern_list1*\",\"test_index_pattern_list2*\"]}\n{}\n"
            }),
            true,
        );
        assert_eq!(
            summary(&metrics),
            vec![
                (QueryType::Msearch, Some("test_index_pattern_list1")),
                (QueryType::Msearch, Some("test_index_pattern_list2"))
            ]
        );
    }

    #[test]
    fn test_empty_bulk_body_reports_no_index() {
        let metrics = run(json!({ "audit_rest_request_path": "/_bulk", "audit_request_body": "" }), false);
        assert_eq!(summary(&metrics), vec![(QueryType::Bulk, None)]);

        let metrics = run(json!({ "audit_rest_request_path": "/_bulk", "audit_request_body": null }), false);
        assert_eq!(summary(&metrics), vec![(QueryType::Bulk, None)]);
    }

    #[test]
    fn test_malformed_body_is_an_error() {
        let record = with(
            fixtures::failed_login(),
            json!({ "audit_rest_request_path": "/_bulk", "audit_request_body": "{oops\n{}\n" }),
        );
        let err = generate(&record, &fixtures::config(false)).unwrap_err();
        assert!(matches!(err, MetricError::RequestBody { line: 1, .. }));
    }

    #[test]
    fn test_body_ignored_for_other_actions() {
        let metrics = run(
            json!({ "audit_rest_request_path": "/idx/_search", "audit_request_body": "{not json" }),
            false,
        );
        assert_eq!(summary(&metrics), vec![(QueryType::Search, Some("idx"))]);
    }
}
