use serde::{Deserialize, Serialize};

/// Counters summarizing a mutation plan
///
/// Accumulated during reconciliation and reported identically for dry-run
/// and committing runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub insert: usize,
    pub update: usize,
    pub delete: usize,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_insert(&mut self) {
        self.insert += 1;
    }

    pub fn record_update(&mut self) {
        self.update += 1;
    }

    pub fn record_deletes(&mut self, count: usize) {
        self.delete += count;
    }

    /// Total number of mutations; equals the plan length
    pub fn total(&self) -> usize {
        self.insert + self.update + self.delete
    }
}

impl std::fmt::Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "insert={} update={} delete={}",
            self.insert, self.update, self.delete
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_sums_counters() {
        let mut stats = Stats::new();
        stats.record_insert();
        stats.record_update();
        stats.record_deletes(3);
        assert_eq!(stats.total(), 5);
        assert_eq!(stats.to_string(), "insert=1 update=1 delete=3");
    }
}
