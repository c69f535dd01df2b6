use crate::model::{MetricKey, MetricRecord};
use std::collections::HashMap;

/// Sums metrics that share every dimension, keeping first-seen order.
///
/// One accumulator covers one batch; it is never shared between batches.
#[derive(Debug, Default)]
pub struct MetricAccumulator {
    groups: Vec<MetricRecord>,
    positions: HashMap<MetricKey, usize>,
}

impl MetricAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, metric: MetricRecord) {
        match self.positions.get(&metric.key) {
            Some(&position) => self.groups[position].value += metric.value,
            None => {
                self.positions.insert(metric.key.clone(), self.groups.len());
                self.groups.push(metric);
            }
        }
    }

    /// Number of distinct groups so far.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn into_records(self) -> Vec<MetricRecord> {
        self.groups
    }
}

impl Extend<MetricRecord> for MetricAccumulator {
    fn extend<I: IntoIterator<Item = MetricRecord>>(&mut self, iter: I) {
        for metric in iter {
            self.push(metric);
        }
    }
}

impl FromIterator<MetricRecord> for MetricAccumulator {
    fn from_iter<I: IntoIterator<Item = MetricRecord>>(iter: I) -> Self {
        let mut accumulator = Self::new();
        accumulator.extend(iter);
        accumulator
    }
}
