//! Resolution of many queries against one shared catalog.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::store::SpacerCatalog;
use crate::catalog::{CatalogError, MetadataSource};
use crate::core::hit::QueryHits;
use crate::core::record::HitRecord;
use crate::matching::candidates::{join_hits, CandidateSet, FilterConfig, NoCandidates};
use crate::matching::cascade::resolve;
use crate::matching::report::ResolutionResult;

/// What happened to one query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QueryOutcome {
    /// A host was called
    Resolved(ResolutionResult),

    /// Hits existed but none survived the gap and mismatch filters
    NoCandidates {
        query_id: String,
        mismatch_tolerance: u32,
        joined_records: usize,
    },

    /// The aligner reported no hit for this query
    NoHits { query_id: String },
}

impl QueryOutcome {
    pub fn query_id(&self) -> &str {
        match self {
            Self::Resolved(result) => result.query_id(),
            Self::NoCandidates { query_id, .. } | Self::NoHits { query_id } => query_id,
        }
    }

    pub fn result(&self) -> Option<&ResolutionResult> {
        match self {
            Self::Resolved(result) => Some(result),
            _ => None,
        }
    }
}

impl From<NoCandidates> for QueryOutcome {
    fn from(err: NoCandidates) -> Self {
        Self::NoCandidates {
            query_id: err.query_id,
            mismatch_tolerance: err.mismatch_tolerance,
            joined_records: err.joined_records,
        }
    }
}

/// Outcomes of a batch, in query order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub outcomes: Vec<QueryOutcome>,
}

impl BatchSummary {
    pub fn resolved(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result().is_some()).count()
    }

    pub fn no_candidates(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, QueryOutcome::NoCandidates { .. }))
            .count()
    }

    pub fn no_hits(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, QueryOutcome::NoHits { .. }))
            .count()
    }
}

/// Fetch metadata for every spacer hit by any query, in one batched lookup
///
/// # Errors
///
/// Returns a `CatalogError` if the source cannot be queried.
pub fn fetch_catalog(
    source: &dyn MetadataSource,
    queries: &[QueryHits],
) -> Result<SpacerCatalog, CatalogError> {
    let mut seen = HashSet::new();
    let spacer_ids: Vec<String> = queries
        .iter()
        .flat_map(|q| q.hits.iter())
        .filter(|hit| seen.insert(hit.spacer_id.as_str()))
        .map(|hit| hit.spacer_id.clone())
        .collect();

    let catalog = source.fetch(&spacer_ids)?;
    if catalog.len() < spacer_ids.len() {
        warn!(
            "{} of {} hit spacer(s) have no metadata and will be ignored",
            spacer_ids.len() - catalog.len(),
            spacer_ids.len()
        );
    }
    Ok(catalog)
}

/// Resolves queries independently, optionally on a dedicated thread pool
pub struct BatchResolver<'a> {
    catalog: &'a SpacerCatalog,
    config: FilterConfig,
    pool: Option<rayon::ThreadPool>,
}

impl<'a> BatchResolver<'a> {
    pub fn new(catalog: &'a SpacerCatalog, config: FilterConfig) -> Self {
        Self {
            catalog,
            config,
            pool: None,
        }
    }

    /// Resolve on `threads` worker threads; 0 uses rayon's default
    ///
    /// # Errors
    ///
    /// Returns an error if the thread pool cannot be created.
    pub fn with_threads(mut self, threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        self.pool = Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()?,
        );
        Ok(self)
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Resolve a single query
    pub fn resolve_query(&self, query: &QueryHits) -> QueryOutcome {
        if query.hits.is_empty() {
            return QueryOutcome::NoHits {
                query_id: query.query_id.clone(),
            };
        }
        match CandidateSet::build(&query.query_id, &query.hits, self.catalog, &self.config) {
            Ok(candidates) => QueryOutcome::Resolved(resolve(&candidates)),
            Err(err) => {
                debug!("{err}");
                err.into()
            }
        }
    }

    /// Resolve every query.
    ///
    /// With `all_query_ids` (e.g. the ids of the input FASTA), outcomes follow
    /// that order and queries without hits are reported as `NoHits`.
    /// Otherwise outcomes follow `queries`.
    pub fn resolve_all(&self, queries: &[QueryHits], all_query_ids: Option<&[String]>) -> BatchSummary {
        let resolved: Vec<QueryOutcome> = match &self.pool {
            Some(pool) => pool.install(|| queries.par_iter().map(|q| self.resolve_query(q)).collect()),
            None => queries.par_iter().map(|q| self.resolve_query(q)).collect(),
        };

        let outcomes = match all_query_ids {
            None => resolved,
            Some(ids) => {
                let mut by_id: HashMap<String, QueryOutcome> = resolved
                    .into_iter()
                    .map(|o| (o.query_id().to_string(), o))
                    .collect();
                let mut ordered: Vec<QueryOutcome> = ids
                    .iter()
                    .map(|id| {
                        by_id.remove(id).unwrap_or_else(|| QueryOutcome::NoHits {
                            query_id: id.clone(),
                        })
                    })
                    .collect();
                // Hits for ids the FASTA does not name are still reported
                ordered.extend(
                    queries
                        .iter()
                        .filter_map(|q| by_id.remove(&q.query_id)),
                );
                ordered
            }
        };

        let summary = BatchSummary { outcomes };
        info!(
            "Resolved {} of {} queries ({} without candidates, {} without hits)",
            summary.resolved(),
            summary.outcomes.len(),
            summary.no_candidates(),
            summary.no_hits()
        );
        summary
    }

    /// The joined table of one query before gap and mismatch filtering
    pub fn joined_table(&self, query: &QueryHits) -> Vec<HitRecord> {
        join_hits(&query.hits, self.catalog, self.config.keep_unknown_genus)
    }
}
