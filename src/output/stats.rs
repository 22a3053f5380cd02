//! Run statistics
//!
//! Counters accumulated while a run is in progress, plus the console
//! summary printed when it ends.

use crate::crawler::CandidateOutcome;
use std::collections::BTreeMap;
use std::time::Duration;

/// Counters for one harvesting run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    /// Sources in the registry
    pub sources_total: u64,

    /// Sources whose listing page could not be obtained
    pub sources_failed: u64,

    /// Candidate links handed to extraction
    pub candidates: u64,

    /// Records written to the store
    pub persisted: u64,

    /// Skips keyed by reason label
    pub skipped: BTreeMap<&'static str, u64>,

    /// Fetch, extraction or storage failures
    pub failed: u64,

    /// Wall-clock duration, set when the run finishes
    pub elapsed: Option<Duration>,
}

impl RunStats {
    pub fn new(sources_total: usize) -> Self {
        Self {
            sources_total: sources_total as u64,
            ..Self::default()
        }
    }

    pub fn record_listing_failure(&mut self) {
        self.sources_failed += 1;
    }

    /// Counts one candidate's outcome
    pub fn record(&mut self, outcome: &CandidateOutcome) {
        self.candidates += 1;
        match outcome {
            CandidateOutcome::Persisted { .. } => self.persisted += 1,
            CandidateOutcome::Skipped { reason, .. } => {
                *self.skipped.entry(reason.as_str()).or_insert(0) += 1
            }
            CandidateOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Folds another source's counters into this one
    pub fn merge(&mut self, other: &RunStats) {
        self.sources_failed += other.sources_failed;
        self.candidates += other.candidates;
        self.persisted += other.persisted;
        self.failed += other.failed;
        for (reason, count) in &other.skipped {
            *self.skipped.entry(reason).or_insert(0) += count;
        }
    }

    pub fn skipped_total(&self) -> u64 {
        self.skipped.values().sum()
    }
}

/// Prints a run summary to stdout
pub fn print_run_summary(stats: &RunStats) {
    println!("=== Run Summary ===\n");

    println!("Sources:");
    println!("  Total: {}", stats.sources_total);
    println!("  Listing failures: {}", stats.sources_failed);
    println!();

    println!("Candidates: {}", stats.candidates);
    println!("  Persisted: {}", stats.persisted);
    println!("  Skipped: {}", stats.skipped_total());
    for (reason, count) in &stats.skipped {
        println!("    {}: {}", reason, count);
    }
    println!("  Failed: {}", stats.failed);

    if let Some(elapsed) = stats.elapsed {
        println!();
        println!("Finished in {:.1}s", elapsed.as_secs_f64());
    }
}
