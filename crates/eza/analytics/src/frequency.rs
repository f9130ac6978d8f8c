//! Frequency tables with stable tie-breaking

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub value: String,
    pub count: usize,
}

/// Counts values; sorts by count descending, ties by first appearance.
#[derive(Debug, Default)]
pub struct FrequencyTable {
    entries: Vec<FrequencyEntry>,
    index: HashMap<String, usize>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, value: &str) {
        match self.index.get(value) {
            Some(&i) => self.entries[i].count += 1,
            None => {
                self.index.insert(value.to_string(), self.entries.len());
                self.entries.push(FrequencyEntry {
                    value: value.to_string(),
                    count: 1,
                });
            }
        }
    }

    /// Number of distinct values (exact, case-sensitive match).
    pub fn distinct(&self) -> usize {
        self.entries.len()
    }

    pub fn into_sorted(self) -> Vec<FrequencyEntry> {
        let mut entries = self.entries;
        // Stable sort keeps first-seen order among equal counts.
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        entries
    }
}
