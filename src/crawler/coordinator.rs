//! Run orchestration
//!
//! This module fans a run out over every source and candidate:
//! - All sources run concurrently
//! - Each source's candidates run concurrently, bounded by one global
//!   extraction limit shared across sources (and by the host throttle below it)
//! - Every candidate resolves to a `CandidateOutcome`; none can cancel another
//! - Records are written to the store as soon as they are ready

use crate::config::{Registry, SourceConfig, Tunables};
use crate::crawler::fetcher::Transport;
use crate::crawler::listing::{discover_listing, extract_candidates};
use crate::extract::{ArticleOutcome, ExtractSettings, Extractor, PdfTextExtractor, SkipReason};
use crate::output::RunStats;
use crate::storage::{ArticleStore, RunStatus};
use crate::RegwatchError;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use url::Url;

/// What happened to one candidate link
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOutcome {
    /// Extracted and written to the store
    Persisted { url: String },

    /// Fetched but filtered out
    Skipped { url: String, reason: SkipReason },

    /// Fetch, extraction or storage failed
    Failed { url: String, error: String },
}

impl CandidateOutcome {
    pub fn url(&self) -> &str {
        match self {
            Self::Persisted { url } | Self::Skipped { url, .. } | Self::Failed { url, .. } => url,
        }
    }
}

/// Main run coordinator
pub struct Coordinator<S: ArticleStore> {
    transport: Arc<Transport>,
    extractor: Extractor,
    store: Arc<S>,
    extraction_limit: Arc<Semaphore>,
}

impl<S: ArticleStore> Coordinator<S> {
    /// Creates a coordinator with a fresh transport and host throttle
    pub fn new(tunables: &Tunables, store: Arc<S>) -> Result<Self, RegwatchError> {
        let transport = Arc::new(Transport::new(tunables)?);
        Ok(Self::with_transport(tunables, transport, store))
    }

    /// Creates a coordinator over an existing transport
    ///
    /// Coordinators built from one transport share its client and host
    /// throttle, so per-host limits hold across all of them.
    pub fn with_transport(tunables: &Tunables, transport: Arc<Transport>, store: Arc<S>) -> Self {
        let extractor = Extractor::new(transport.clone(), ExtractSettings::from(tunables));

        Self {
            transport,
            extractor,
            store,
            extraction_limit: Arc::new(Semaphore::new(tunables.fetch_concurrency.max(1))),
        }
    }

    /// Replaces the PDF text backend
    pub fn with_pdf_extractor(mut self, pdf: Arc<dyn PdfTextExtractor>) -> Self {
        self.extractor = self.extractor.with_pdf_extractor(pdf);
        self
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Runs every source in the registry, bracketed by a run record
    ///
    /// Only storage failures on the run record abort; everything else is
    /// counted in the returned stats. A run where no listing could be
    /// fetched is recorded as failed.
    pub async fn run(
        &self,
        registry: &Registry,
        registry_hash: &str,
    ) -> Result<RunStats, RegwatchError> {
        let run_id = self.store.create_run(registry_hash)?;
        tracing::info!(
            "Starting run {} over {} sources",
            run_id,
            registry.sources.len()
        );

        let started = Instant::now();
        let mut stats = self.run_sources(&registry.sources).await;
        stats.elapsed = Some(started.elapsed());

        let status = if stats.sources_total > 0 && stats.sources_failed == stats.sources_total {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };
        self.store.complete_run(run_id, status, &stats)?;

        tracing::info!(
            "Run {} finished: {} persisted, {} skipped, {} failed, {} listing failures",
            run_id,
            stats.persisted,
            stats.skipped_total(),
            stats.failed,
            stats.sources_failed
        );

        Ok(stats)
    }

    /// Processes all sources concurrently and merges their stats
    pub async fn run_sources(&self, sources: &[SourceConfig]) -> RunStats {
        let per_source = join_all(sources.iter().map(|source| self.process_source(source))).await;

        let mut stats = RunStats::new(sources.len());
        for source_stats in &per_source {
            stats.merge(source_stats);
        }
        stats
    }

    /// Discovers one source's candidates and extracts them
    pub async fn process_source(&self, source: &SourceConfig) -> RunStats {
        let mut stats = RunStats::default();

        let listing = match discover_listing(&self.transport, source).await {
            Ok(listing) => listing,
            Err(e) => {
                tracing::error!("{}", e);
                stats.record_listing_failure();
                return stats;
            }
        };

        let candidates = extract_candidates(&listing.html, &listing.base_url, source);
        tracing::info!(
            "{}: {} candidates from {}",
            source.name,
            candidates.len(),
            listing.base_url
        );

        let outcomes = join_all(
            candidates
                .into_iter()
                .map(|url| self.process_candidate(url, source)),
        )
        .await;

        for outcome in &outcomes {
            stats.record(outcome);
        }
        stats
    }

    /// Extracts and persists one candidate under the global extraction limit
    pub async fn process_candidate(&self, url: Url, source: &SourceConfig) -> CandidateOutcome {
        let _permit = match self.extraction_limit.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                return CandidateOutcome::Failed {
                    url: url.to_string(),
                    error: format!("extraction limiter closed: {}", e),
                }
            }
        };

        match self.extractor.extract(&url, source).await {
            ArticleOutcome::Ready(record) => match self.store.upsert_article(&record) {
                Ok(stored) => {
                    tracing::info!(
                        "Stored {} ({} chars, published {})",
                        stored.url,
                        record.text_chars(),
                        stored.published_at.format("%Y-%m-%d")
                    );
                    CandidateOutcome::Persisted { url: stored.url }
                }
                Err(e) => {
                    tracing::error!("Storing {} failed: {}", url, e);
                    CandidateOutcome::Failed {
                        url: url.to_string(),
                        error: e.to_string(),
                    }
                }
            },
            ArticleOutcome::Skipped(reason) => {
                tracing::info!("Skip {}: {}", url, reason);
                CandidateOutcome::Skipped {
                    url: url.to_string(),
                    reason,
                }
            }
            ArticleOutcome::Failed(e) => {
                tracing::error!("Fetch article failed {}: {}", url, e);
                CandidateOutcome::Failed {
                    url: url.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }
}
