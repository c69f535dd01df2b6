use crate::accumulator::MetricAccumulator;
use crate::config::ProcessorConfig;
use crate::error::{MetricError, Result};
use crate::metric::AuditCategory;
use crate::model::{MetricRecord, RawAuditRecord};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Time attached to an event by the host pipeline.
pub type EventTime = DateTime<Utc>;

/// A record that matched an accepted category but could not be turned into
/// metrics.
#[derive(Debug)]
pub struct SkippedRecord {
    /// Position of the record in its batch, starting at 0.
    pub position: usize,
    pub category: AuditCategory,
    pub error: MetricError,
}

/// Metrics of one batch, each paired with the time of its source event.
#[derive(Debug, Default)]
pub struct ProcessedBatch {
    pub metrics: Vec<(EventTime, MetricRecord)>,
    pub skipped: Vec<SkippedRecord>,
}

/// Metrics of one batch after grouping identical ones.
#[derive(Debug, Default)]
pub struct AccumulatedBatch {
    pub metrics: Vec<MetricRecord>,
    pub skipped: Vec<SkippedRecord>,
}

/// Routes audit records to the generator of their category.
#[derive(Debug, Clone)]
pub struct MetricProcessor {
    config: ProcessorConfig,
}

impl MetricProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Converts a batch of audit records into metrics, in input order.
    ///
    /// Empty records and records whose category is missing or not accepted
    /// produce nothing. A category is accepted when it equals a configured
    /// name exactly; its generator is then looked up ignoring case. A record whose request body cannot be read is left
    /// out and reported in [`ProcessedBatch::skipped`]; the rest of the batch
    /// is still processed.
    pub fn process<I>(&self, records: I) -> ProcessedBatch
    where
        I: IntoIterator<Item = (EventTime, RawAuditRecord)>,
    {
        let mut batch = ProcessedBatch::default();
        for (position, (time, record)) in records.into_iter().enumerate() {
            let Some((category, generated)) = self.dispatch(&record) else {
                continue;
            };
            match generated {
                Ok(metrics) => batch.metrics.extend(metrics.into_iter().map(|metric| (time, metric))),
                Err(error) => {
                    warn!(position, %category, %error, "skipping audit record");
                    batch.skipped.push(SkippedRecord {
                        position,
                        category,
                        error,
                    });
                }
            }
        }
        batch
    }

    /// Like [`process`](Self::process), with identical metrics summed.
    /// Event times are dropped; each metric carries its own timestamp field.
    pub fn accumulate<I>(&self, records: I) -> AccumulatedBatch
    where
        I: IntoIterator<Item = (EventTime, RawAuditRecord)>,
    {
        let ProcessedBatch { metrics, skipped } = self.process(records);
        let accumulator: MetricAccumulator = metrics.into_iter().map(|(_, metric)| metric).collect();
        AccumulatedBatch {
            metrics: accumulator.into_records(),
            skipped,
        }
    }

    fn dispatch(&self, record: &RawAuditRecord) -> Option<(AuditCategory, Result<Vec<MetricRecord>>)> {
        if record.is_empty() {
            return None;
        }
        let Some(name) = record.get_str(&self.config.keys.category_key) else {
            debug!("audit record without category");
            return None;
        };
        if !self.config.categories.iter().any(|accepted| accepted == name) {
            debug!(category = name, "audit category not accepted");
            return None;
        }
        let category = match name.parse::<AuditCategory>() {
            Ok(category) => category,
            Err(err) => {
                debug!(error = %err, "no generator for audit category");
                return None;
            }
        };
        Some((category, category.generate(record, &self.config)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::fixtures::{self, with};
    use crate::model::{MetricName, QueryType, Scope};
    use chrono::TimeZone;
    use serde_json::json;

    fn at(second: u32) -> EventTime {
        Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, second).unwrap()
    }

    fn processor() -> MetricProcessor {
        MetricProcessor::new(fixtures::config(true))
    }

    #[test]
    fn test_granted_privileges_record() {
        let batch = processor().process(vec![(at(5), fixtures::granted_privileges())]);

        assert!(batch.skipped.is_empty());
        assert_eq!(batch.metrics.len(), 2);
        assert!(batch.metrics.iter().all(|(time, _)| *time == at(5)));
        assert_eq!(batch.metrics[0].1.key.metric_name, MetricName::UserQueryCount);
        assert_eq!(batch.metrics[1].1.index(), Some("test_index_1"));
    }

    #[test]
    fn test_output_follows_input_order() {
        let delete = with(
            fixtures::granted_privileges(),
            json!({
                "audit_request_privilege": "indices:data/write/delete",
                "audit_trace_resolved_indices": ["test_index_2"]
            }),
        );
        let batch = processor().process(vec![
            (at(1), fixtures::granted_privileges()),
            (at(2), fixtures::failed_login()),
            (at(3), delete),
        ]);

        let summary: Vec<(EventTime, MetricName, QueryType)> = batch
            .metrics
            .iter()
            .map(|(time, m)| (*time, m.key.metric_name, m.key.query_type))
            .collect();
        assert_eq!(
            summary,
            vec![
                (at(1), MetricName::UserQueryCount, QueryType::Read),
                (at(1), MetricName::IndexQueryCount, QueryType::Read),
                (at(2), MetricName::FailedLoginCount, QueryType::Other),
                (at(3), MetricName::UserQueryCount, QueryType::Delete),
                (at(3), MetricName::IndexQueryCount, QueryType::Delete),
            ]
        );
    }

    #[test]
    fn test_unaccepted_and_uncategorized_records_are_dropped() {
        let processor = MetricProcessor::new(
            crate::config::MetricConfig::default().compile().unwrap(),
        );
        let no_category = with(fixtures::granted_privileges(), json!({ "audit_category": null }));
        let wrong_case = with(
            fixtures::granted_privileges(),
            json!({ "audit_category": "granted_privileges" }),
        );

        let batch = processor.process(vec![
            (at(1), fixtures::failed_login()),
            (at(2), RawAuditRecord::new()),
            (at(3), no_category),
            (at(4), wrong_case),
            (at(5), fixtures::granted_privileges()),
        ]);

        assert!(batch.skipped.is_empty());
        assert_eq!(batch.metrics.len(), 4);
        assert!(batch.metrics.iter().all(|(time, _)| *time == at(5)));
    }

    #[test]
    fn test_category_must_match_as_configured() {
        let processor = MetricProcessor::new(
            crate::config::MetricConfig {
                categories: vec!["failed_login".into()],
                ..Default::default()
            }
            .compile()
            .unwrap(),
        );
        let lower = with(fixtures::failed_login(), json!({ "audit_category": "failed_login" }));

        let batch = processor.process(vec![(at(1), lower), (at(2), fixtures::failed_login())]);

        assert!(batch.skipped.is_empty());
        assert_eq!(batch.metrics.len(), 1);
        assert_eq!(batch.metrics[0].0, at(1));
        assert_eq!(batch.metrics[0].1.key.metric_name, MetricName::FailedLoginCount);
    }

    #[test]
    fn test_unreadable_body_skips_only_that_record() {
        let broken = with(
            fixtures::failed_login(),
            json!({ "audit_rest_request_path": "/_bulk", "audit_request_body": "{\n{}\n" }),
        );
        let batch = processor().process(vec![
            (at(1), fixtures::failed_login()),
            (at(2), broken),
            (at(3), fixtures::failed_login()),
        ]);

        assert_eq!(batch.metrics.len(), 2);
        assert_eq!(batch.skipped.len(), 1);
        let skipped = &batch.skipped[0];
        assert_eq!(skipped.position, 1);
        assert_eq!(skipped.category, AuditCategory::FailedLogin);
        assert!(matches!(skipped.error, MetricError::RequestBody { line: 1, .. }));
    }

    #[test]
    fn test_accumulate_sums_identical_metrics() {
        let batch = processor().accumulate(vec![
            (at(1), fixtures::granted_privileges()),
            (at(2), fixtures::granted_privileges()),
            (at(3), fixtures::failed_login()),
        ]);

        let summary: Vec<(MetricName, Scope, u64)> = batch
            .metrics
            .into_iter()
            .map(|m| (m.key.metric_name, m.key.scope, m.value))
            .collect();
        assert_eq!(
            summary,
            vec![
                (MetricName::UserQueryCount, Scope::User, 2),
                (MetricName::IndexQueryCount, Scope::Index(Some("test_index_1".into())), 2),
                (MetricName::FailedLoginCount, Scope::Index(None), 1),
            ]
        );
    }
}
