//! Batch run summary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one orchestrator run over a source's entity list
///
/// `fetched + skipped + errors.len() == total` unless the run was aborted on
/// a rate-limit signal, in which case the shortfall is the unattempted tail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    /// Source name
    pub source: String,
    /// Number of entities in the configured list
    pub total: usize,
    /// Entities for which a result was obtained (cache hit or live fetch)
    pub fetched: usize,
    /// Rows the content store reports as persisted
    pub stored: usize,
    /// Entities not found upstream or short-circuited by an open breaker
    pub skipped: usize,
    /// One entry per failed entity, in entity-list order
    pub errors: Vec<String>,
    /// True when the loop stopped early on a rate-limit signal
    pub aborted: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchSummary {
    /// Empty summary for a run that is about to start
    pub fn start(source: impl Into<String>, total: usize) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            source: source.into(),
            total,
            fetched: 0,
            stored: 0,
            skipped: 0,
            errors: Vec::new(),
            aborted: false,
            started_at: now,
            finished_at: now,
        }
    }

    /// Entities never attempted because the run aborted early
    pub fn unattempted(&self) -> usize {
        self.total
            .saturating_sub(self.fetched + self.skipped + self.errors.len())
    }

    /// Wall-clock duration of the run in milliseconds
    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unattempted_counts_tail_after_abort() {
        let mut summary = BatchSummary::start("github", 5);
        summary.fetched = 1;
        summary.errors.push("github nasa/fprime: rate limited".to_string());
        summary.aborted = true;

        assert_eq!(summary.unattempted(), 3);
    }

    #[test]
    fn test_complete_run_has_no_unattempted() {
        let mut summary = BatchSummary::start("patents", 3);
        summary.fetched = 2;
        summary.skipped = 1;

        assert_eq!(summary.unattempted(), 0);
    }
}
