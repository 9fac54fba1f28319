//! Per-page detection timings.

use std::collections::BTreeMap;

use serde::Serialize;

/// Elapsed detection time in milliseconds, keyed by page index.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct TimingTable {
    entries: BTreeMap<usize, f64>,
}

/// Aggregate over every recorded page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingSummary {
    pub pages: usize,
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
}

impl TimingTable {
    /// Records the time for `page_index`, replacing any earlier value.
    pub fn record(&mut self, page_index: usize, elapsed_ms: f64) {
        self.entries.insert(page_index, elapsed_ms);
    }

    pub fn get(&self, page_index: usize) -> Option<f64> {
        self.entries.get(&page_index).copied()
    }

    /// Entries in page order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().map(|(&index, &ms)| (index, ms))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> Option<TimingSummary> {
        if self.entries.is_empty() {
            return None;
        }
        let (min_ms, max_ms, total) = self.entries.values().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, total), &ms| (min.min(ms), max.max(ms), total + ms),
        );
        Some(TimingSummary {
            pages: self.entries.len(),
            min_ms,
            max_ms,
            mean_ms: total / self.entries.len() as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let mut table = TimingTable::default();
        assert!(table.summary().is_none());

        table.record(2, 30.0);
        table.record(0, 10.0);
        table.record(1, 20.0);
        let summary = table.summary().unwrap();
        assert_eq!(summary.pages, 3);
        assert_eq!(summary.min_ms, 10.0);
        assert_eq!(summary.max_ms, 30.0);
        assert_eq!(summary.mean_ms, 20.0);

        let order: Vec<_> = table.iter().map(|(index, _)| index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_record_overwrites() {
        let mut table = TimingTable::default();
        table.record(4, 1.0);
        table.record(4, 2.5);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(4), Some(2.5));
    }
}
