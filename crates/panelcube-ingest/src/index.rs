//! Key and time axis indexes.

use std::collections::BTreeSet;

use ahash::AHashMap;

use crate::config::TimeOrder;
use crate::error::{IngestError, IngestResult};

/// Keys in first-seen order. Positions never change once assigned.
#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    positions: AHashMap<String, usize>,
    labels: Vec<String>,
}

impl KeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of `key`, assigning the next one if it is new.
    pub fn observe(&mut self, key: &str) -> usize {
        if let Some(&pos) = self.positions.get(key) {
            return pos;
        }
        let pos = self.labels.len();
        self.positions.insert(key.to_string(), pos);
        self.labels.push(key.to_string());
        pos
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn label(&self, position: usize) -> Option<&str> {
        self.labels.get(position).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Distinct time labels, positioned by sorted rank.
#[derive(Debug, Clone, Default)]
pub struct TimeIndex {
    positions: AHashMap<String, usize>,
    labels: Vec<String>,
}

impl TimeIndex {
    pub fn build(distinct: BTreeSet<String>, order: TimeOrder) -> IngestResult<Self> {
        // BTreeSet iterates in byte order, which is the lexicographic order.
        let mut labels: Vec<String> = distinct.into_iter().collect();
        if order == TimeOrder::Numeric {
            let mut keyed = labels
                .into_iter()
                .map(|label| {
                    let parsed = label.trim().parse::<f64>();
                    match parsed {
                        Ok(value) => Ok((value, label)),
                        Err(_) => Err(IngestError::NonNumericTime { label }),
                    }
                })
                .collect::<IngestResult<Vec<_>>>()?;
            keyed.sort_by(|(a, la), (b, lb)| a.total_cmp(b).then_with(|| la.cmp(lb)));
            labels = keyed.into_iter().map(|(_, label)| label).collect();
        }
        let positions = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect();
        Ok(Self { positions, labels })
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.positions.get(label).copied()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(labels: &[&str]) -> BTreeSet<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn keys_keep_first_seen_order() {
        let mut keys = KeyIndex::new();
        assert_eq!(keys.observe("b"), 0);
        assert_eq!(keys.observe("a"), 1);
        assert_eq!(keys.observe("b"), 0);
        assert_eq!(keys.observe("c"), 2);
        assert_eq!(keys.labels(), &["b", "a", "c"]);
        assert_eq!(keys.position("a"), Some(1));
        assert_eq!(keys.position("z"), None);
        assert_eq!(keys.label(2), Some("c"));
    }

    #[test]
    fn lexicographic_order_is_string_order() {
        let times = TimeIndex::build(set(&["9", "10", "2015", "2"]), TimeOrder::Lexicographic).unwrap();
        assert_eq!(times.labels(), &["10", "2", "2015", "9"]);
        assert_eq!(times.position("9"), Some(3));
    }

    #[test]
    fn numeric_order_parses_labels() {
        let times = TimeIndex::build(set(&["9", "10", "2015", "2"]), TimeOrder::Numeric).unwrap();
        assert_eq!(times.labels(), &["2", "9", "10", "2015"]);
        assert_eq!(times.position("10"), Some(2));
    }

    #[test]
    fn numeric_order_breaks_ties_by_string() {
        let times = TimeIndex::build(set(&["1.0", "1", "0"]), TimeOrder::Numeric).unwrap();
        assert_eq!(times.labels(), &["0", "1", "1.0"]);
    }

    #[test]
    fn numeric_order_rejects_words() {
        let err = TimeIndex::build(set(&["2015", "FY16"]), TimeOrder::Numeric).unwrap_err();
        assert!(matches!(err, IngestError::NonNumericTime { label } if label == "FY16"));
    }
}
