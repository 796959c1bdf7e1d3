//! Bounded per-pattern history and trend classification.

use std::collections::{BTreeMap, VecDeque};

use crate::quality::types::{QualityHistoryEntry, Trend};

/// Entries kept per pattern unless configured otherwise.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Scores compared when classifying a trend.
pub const TREND_WINDOW: usize = 3;

/// Append-only, bounded assessment log keyed by pattern name.
pub trait HistoryStore: Send {
    /// Append an entry, evicting the oldest once the log is full.
    fn append(&mut self, pattern: &str, entry: QualityHistoryEntry);

    /// Up to `n` most recent entries, oldest first.
    fn last_n(&self, pattern: &str, n: usize) -> Vec<QualityHistoryEntry>;

    fn len(&self, pattern: &str) -> usize;

    fn entries(&self, pattern: &str) -> Vec<QualityHistoryEntry> {
        self.last_n(pattern, self.len(pattern))
    }

    /// Every pattern's log, for export.
    fn snapshot(&self) -> BTreeMap<String, Vec<QualityHistoryEntry>>;

    /// Replace all logs.
    fn restore(&mut self, logs: BTreeMap<String, Vec<QualityHistoryEntry>>);

    /// Change the per-pattern limit, evicting the oldest entries that no
    /// longer fit.
    fn set_capacity(&mut self, capacity: usize);
}

#[derive(Debug, Clone)]
pub struct InMemoryHistory {
    capacity: usize,
    logs: BTreeMap<String, VecDeque<QualityHistoryEntry>>,
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl InMemoryHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            logs: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl HistoryStore for InMemoryHistory {
    fn append(&mut self, pattern: &str, entry: QualityHistoryEntry) {
        let log = self.logs.entry(pattern.to_string()).or_default();
        log.push_back(entry);
        while log.len() > self.capacity {
            log.pop_front();
        }
    }

    fn last_n(&self, pattern: &str, n: usize) -> Vec<QualityHistoryEntry> {
        match self.logs.get(pattern) {
            Some(log) => log.iter().skip(log.len().saturating_sub(n)).cloned().collect(),
            None => Vec::new(),
        }
    }

    fn len(&self, pattern: &str) -> usize {
        self.logs.get(pattern).map_or(0, VecDeque::len)
    }

    fn snapshot(&self) -> BTreeMap<String, Vec<QualityHistoryEntry>> {
        self.logs
            .iter()
            .map(|(pattern, log)| (pattern.clone(), log.iter().cloned().collect()))
            .collect()
    }

    fn restore(&mut self, logs: BTreeMap<String, Vec<QualityHistoryEntry>>) {
        self.logs = logs
            .into_iter()
            .map(|(pattern, entries)| {
                let skip = entries.len().saturating_sub(self.capacity);
                (pattern, entries.into_iter().skip(skip).collect())
            })
            .collect();
    }

    fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        for log in self.logs.values_mut() {
            while log.len() > self.capacity {
                log.pop_front();
            }
        }
    }
}

/// Classify the last [`TREND_WINDOW`] scores by counting rises and falls
/// between neighbours. Ties and short histories are stable.
pub fn classify(scores: &[u8]) -> Trend {
    let window = &scores[scores.len().saturating_sub(TREND_WINDOW)..];
    if window.len() < 2 {
        return Trend::Stable;
    }

    let (mut increases, mut decreases) = (0, 0);
    for pair in window.windows(2) {
        if pair[1] > pair[0] {
            increases += 1;
        } else if pair[1] < pair[0] {
            decreases += 1;
        }
    }

    if increases > decreases {
        Trend::Improving
    } else if decreases > increases {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Trend over a pattern's stored history. Simulated runs are skipped.
pub fn trend_for(history: &dyn HistoryStore, pattern: &str) -> Trend {
    let scores: Vec<u8> = history
        .entries(pattern)
        .iter()
        .filter(|entry| !entry.simulated)
        .map(|entry| entry.overall_score)
        .collect();
    classify(&scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::category::CategoryMap;
    use chrono::{TimeZone, Utc};

    fn entry(score: u8) -> QualityHistoryEntry {
        QualityHistoryEntry {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, score as u32 % 60).unwrap(),
            overall_score: score,
            scores: CategoryMap::from_fn(|_| score as f64),
            simulated: false,
        }
    }

    #[test]
    fn short_histories_are_stable() {
        assert_eq!(classify(&[]), Trend::Stable);
        assert_eq!(classify(&[90]), Trend::Stable);
    }

    #[test]
    fn flat_scores_are_stable() {
        assert_eq!(classify(&[70, 70, 70]), Trend::Stable);
    }

    #[test]
    fn monotonic_runs() {
        assert_eq!(classify(&[60, 70, 80]), Trend::Improving);
        assert_eq!(classify(&[80, 70, 60]), Trend::Declining);
    }

    #[test]
    fn mixed_window_ties_to_stable() {
        assert_eq!(classify(&[60, 80, 70]), Trend::Stable);
    }

    #[test]
    fn only_the_last_three_count() {
        // older decline is outside the window
        assert_eq!(classify(&[95, 90, 85, 60, 70, 80]), Trend::Improving);
    }

    #[test]
    fn history_is_capped_fifo() {
        let mut history = InMemoryHistory::default();
        for score in 1..=15u8 {
            history.append("p", entry(score));
        }

        assert_eq!(history.len("p"), 10);
        let scores: Vec<u8> = history.entries("p").iter().map(|e| e.overall_score).collect();
        assert_eq!(scores, (6..=15).collect::<Vec<u8>>());
    }

    #[test]
    fn histories_are_independent() {
        let mut history = InMemoryHistory::new(2);
        history.append("a", entry(1));
        history.append("b", entry(2));
        history.append("a", entry(3));
        history.append("a", entry(4));

        assert_eq!(history.len("a"), 2);
        assert_eq!(history.len("b"), 1);
        assert_eq!(history.len("missing"), 0);
    }

    #[test]
    fn last_n_returns_oldest_first() {
        let mut history = InMemoryHistory::default();
        for score in [50, 60, 70, 80] {
            history.append("p", entry(score));
        }
        let scores: Vec<u8> = history.last_n("p", 3).iter().map(|e| e.overall_score).collect();
        assert_eq!(scores, vec![60, 70, 80]);
        assert_eq!(trend_for(&history, "p"), Trend::Improving);
    }

    #[test]
    fn simulated_entries_do_not_move_the_trend() {
        let mut history = InMemoryHistory::default();
        for score in [60, 70, 80] {
            history.append("p", entry(score));
        }
        history.append(
            "p",
            QualityHistoryEntry {
                simulated: true,
                ..entry(20)
            },
        );

        assert_eq!(history.len("p"), 4);
        assert_eq!(trend_for(&history, "p"), Trend::Improving);
    }

    #[test]
    fn shrinking_capacity_evicts_oldest() {
        let mut history = InMemoryHistory::default();
        for score in 1..=6u8 {
            history.append("p", entry(score));
        }
        history.set_capacity(2);
        history.append("p", entry(7));

        assert_eq!(history.capacity(), 2);
        let scores: Vec<u8> = history.entries("p").iter().map(|e| e.overall_score).collect();
        assert_eq!(scores, vec![6, 7]);
    }

    #[test]
    fn restore_truncates_to_capacity() {
        let mut logs = BTreeMap::new();
        logs.insert("p".to_string(), (1..=5u8).map(entry).collect());

        let mut history = InMemoryHistory::new(3);
        history.restore(logs);
        let scores: Vec<u8> = history.entries("p").iter().map(|e| e.overall_score).collect();
        assert_eq!(scores, vec![3, 4, 5]);
    }
}
