use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;

use vllmscope_types::{LogRecord, Severity};

/// Level and search filter over buffered log records
///
/// Both predicates are ANDed. An empty level set or a blank search
/// matches everything.
#[derive(Clone, Default)]
pub struct LogFilter {
    /// Severities to include (empty = all)
    levels: BTreeSet<Severity>,

    /// Search text as typed
    search: String,

    /// Case-insensitive literal matcher for `search` (None when blank)
    matcher: Option<Regex>,
}

impl LogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the selected severities
    pub fn with_levels<I: IntoIterator<Item = Severity>>(mut self, levels: I) -> Self {
        self.levels = levels.into_iter().collect();
        self
    }

    /// Set the search text
    pub fn with_search(mut self, search: &str) -> Self {
        self.set_search(search);
        self
    }

    /// Add a severity if absent, remove it if present
    pub fn toggle_level(&mut self, level: Severity) {
        if !self.levels.remove(&level) {
            self.levels.insert(level);
        }
    }

    pub fn set_search(&mut self, search: &str) {
        self.search = search.to_string();
        self.matcher = if search.trim().is_empty() {
            None
        } else {
            RegexBuilder::new(&regex::escape(search))
                .case_insensitive(true)
                .build()
                .ok()
        };
    }

    /// Reset both the level set and the search text
    pub fn clear(&mut self) {
        self.levels.clear();
        self.set_search("");
    }

    pub fn levels(&self) -> &BTreeSet<Severity> {
        &self.levels
    }

    pub fn is_level_selected(&self, level: Severity) -> bool {
        self.levels.contains(&level)
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn has_active_filters(&self) -> bool {
        !self.levels.is_empty() || self.matcher.is_some()
    }

    /// Check if a record passes both predicates
    pub fn matches(&self, record: &LogRecord) -> bool {
        if !self.levels.is_empty() && !self.levels.contains(&record.level) {
            return false;
        }

        match &self.matcher {
            Some(re) => re.is_match(&record.message) || re.is_match(&record.timestamp),
            None => true,
        }
    }

    /// The matching subsequence, in buffer order
    pub fn apply(&self, records: &[LogRecord]) -> Vec<LogRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }

    /// Byte ranges of search matches in `text` (for highlighting)
    pub fn find_matches(&self, text: &str) -> Vec<(usize, usize)> {
        match &self.matcher {
            Some(re) => re.find_iter(text).map(|m| (m.start(), m.end())).collect(),
            None => Vec::new(),
        }
    }
}

impl PartialEq for LogFilter {
    fn eq(&self, other: &Self) -> bool {
        self.levels == other.levels && self.search == other.search
    }
}

impl std::fmt::Debug for LogFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogFilter")
            .field("levels", &self.levels)
            .field("search", &self.search)
            .finish()
    }
}

/// Counts per severity
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LevelCounts {
    pub debug: usize,
    pub info: usize,
    pub warning: usize,
    pub error: usize,
    pub critical: usize,
    pub unknown: usize,
}

impl LevelCounts {
    pub fn from_records(records: &[LogRecord]) -> Self {
        let mut counts = Self::default();
        for record in records {
            match record.level {
                Severity::Debug => counts.debug += 1,
                Severity::Info => counts.info += 1,
                Severity::Warning => counts.warning += 1,
                Severity::Error => counts.error += 1,
                Severity::Critical => counts.critical += 1,
                Severity::Unknown => counts.unknown += 1,
            }
        }
        counts
    }

    pub fn get(&self, level: Severity) -> usize {
        match level {
            Severity::Debug => self.debug,
            Severity::Info => self.info,
            Severity::Warning => self.warning,
            Severity::Error => self.error,
            Severity::Critical => self.critical,
            Severity::Unknown => self.unknown,
        }
    }

    pub fn total(&self) -> usize {
        self.debug + self.info + self.warning + self.error + self.critical + self.unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<LogRecord> {
        vec![
            LogRecord::new("2024-05-01 10:00:00", Severity::Info, "Started server"),
            LogRecord::new("2024-05-01 10:00:01", Severity::Warning, "KV cache almost full"),
            LogRecord::new("2024-05-01 10:00:02", Severity::Error, "CUDA out of memory"),
            LogRecord::new("2024-05-01 10:01:00", Severity::Info, "Request finished"),
            LogRecord::new("2024-05-01 10:01:01", Severity::Unknown, "something odd"),
        ]
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = LogFilter::new();
        assert_eq!(filter.apply(&records()).len(), 5);
        assert!(!filter.has_active_filters());
    }

    #[test]
    fn test_level_filter() {
        let filter = LogFilter::new().with_levels([Severity::Error, Severity::Warning]);
        let result = filter.apply(&records());
        let levels: Vec<Severity> = result.iter().map(|r| r.level).collect();
        assert_eq!(levels, vec![Severity::Warning, Severity::Error]);
    }

    #[test]
    fn test_search_is_case_insensitive_over_message_and_timestamp() {
        let filter = LogFilter::new().with_search("cuda");
        assert_eq!(filter.apply(&records()).len(), 1);

        let filter = LogFilter::new().with_search("10:01");
        assert_eq!(filter.apply(&records()).len(), 2);
    }

    #[test]
    fn test_predicates_are_anded() {
        let filter = LogFilter::new()
            .with_levels([Severity::Info])
            .with_search("request");
        let result = filter.apply(&records());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].message, "Request finished");
    }

    #[test]
    fn test_search_is_literal() {
        let filter = LogFilter::new().with_search("(");
        assert!(filter.apply(&records()).is_empty());
        assert!(filter.has_active_filters());
    }

    #[test]
    fn test_blank_search_matches_all() {
        let filter = LogFilter::new().with_search("   ");
        assert_eq!(filter.apply(&records()).len(), 5);
        assert!(!filter.has_active_filters());
    }

    #[test]
    fn test_apply_is_idempotent() {
        let filter = LogFilter::new()
            .with_levels([Severity::Info, Severity::Error])
            .with_search("e");
        let once = filter.apply(&records());
        let twice = filter.apply(&records());
        assert_eq!(once, twice);
        assert_eq!(filter.apply(&once), once);
    }

    #[test]
    fn test_toggle_twice_restores_filter() {
        let original = LogFilter::new().with_levels([Severity::Debug]);
        let mut filter = original.clone();

        filter.toggle_level(Severity::Error);
        assert!(filter.is_level_selected(Severity::Error));
        filter.toggle_level(Severity::Error);
        assert_eq!(filter, original);

        filter.toggle_level(Severity::Debug);
        assert!(filter.levels().is_empty());
    }

    #[test]
    fn test_unknown_level_excluded_by_level_selection() {
        let filter = LogFilter::new().with_levels(Severity::ALL);
        assert_eq!(filter.apply(&records()).len(), 4);
    }

    #[test]
    fn test_find_matches() {
        let filter = LogFilter::new().with_search("error");
        let matches = filter.find_matches("an Error occurred, another error here");
        assert_eq!(matches, vec![(3, 8), (27, 32)]);
    }

    #[test]
    fn test_level_counts() {
        let counts = LevelCounts::from_records(&records());
        assert_eq!(counts.info, 2);
        assert_eq!(counts.get(Severity::Error), 1);
        assert_eq!(counts.unknown, 1);
        assert_eq!(counts.total(), 5);
    }
}
