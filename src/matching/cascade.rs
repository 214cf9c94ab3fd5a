use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::core::record::HitRecord;
use crate::core::types::{Criterion, TaxonRank, UNRESOLVED_HOST};
use crate::matching::candidates::CandidateSet;
use crate::matching::report::{
    GenusVote, HostCall, Lineage, Observation, RelativePosition, ResolutionReport,
    ResolutionResult, StageTrace, SupportingSpacer,
};

/// Outcome of a criterion that may pass the query on to the next one
enum Step<'a> {
    Resolved {
        call: HostCall,
        support: Vec<&'a HitRecord>,
    },
    Narrowed(Vec<&'a HitRecord>),
}

type NarrowingCriterion = for<'a> fn(Vec<&'a HitRecord>) -> (StageTrace, Step<'a>);

/// Resolve the host of one query.
///
/// Criteria are evaluated in order; each either resolves the query or hands
/// a narrower view of the candidates to the next. The last common ancestor
/// criterion always resolves, so at most four stages run.
///
/// # Panics
///
/// Panics if `candidates` is empty. A [`CandidateSet`] built through its
/// constructors never is.
pub fn resolve(candidates: &CandidateSet) -> ResolutionResult {
    assert!(
        !candidates.is_empty(),
        "host resolution of {} requires at least one candidate",
        candidates.query_id()
    );

    let narrowing: [NarrowingCriterion; 3] =
        [unanimous_genus, distinct_position_vote, five_prime_position];

    let mut stages = Vec::with_capacity(4);
    let mut live: Vec<&HitRecord> = candidates.records().iter().collect();

    for criterion in narrowing {
        let (trace, step) = criterion(live);
        stages.push(trace);
        match step {
            Step::Resolved { call, support } => return finish(candidates, stages, call, &support),
            Step::Narrowed(next) => {
                debug!(
                    "{}: {} candidate(s) left after {}",
                    candidates.query_id(),
                    next.len(),
                    stages.last().map_or(Criterion::UnanimousGenus, |s| s.criterion)
                );
                live = next;
            }
        }
    }

    let (trace, call) = last_common_ancestor(&live);
    stages.push(trace);
    finish(candidates, stages, call, &live)
}

fn finish(
    candidates: &CandidateSet,
    stages: Vec<StageTrace>,
    call: HostCall,
    support: &[&HitRecord],
) -> ResolutionResult {
    let criterion = stages
        .last()
        .map_or(Criterion::LastCommonAncestor, |s| s.criterion);
    info!(
        "{}: host is {} ({}, {criterion})",
        candidates.query_id(),
        call.label,
        call.rank
    );

    let supporting = support.iter().map(|r| SupportingSpacer::from(*r)).collect();
    let report = ResolutionReport::new(candidates.len(), stages, supporting);
    ResolutionResult::new(candidates.query_id(), criterion, call, report)
}

/// Distinct values in first-seen order
fn distinct<'a>(records: &[&'a HitRecord], field: fn(&'a HitRecord) -> &'a str) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .map(|r| field(*r))
        .filter(|value| seen.insert(*value))
        .map(str::to_string)
        .collect()
}

fn spacer_ids(records: &[&HitRecord]) -> Vec<String> {
    records.iter().map(|r| r.spacer_id().to_string()).collect()
}

/// Criterion 1: a single genus among all candidates is the host.
fn unanimous_genus(live: Vec<&HitRecord>) -> (StageTrace, Step<'_>) {
    let genera = distinct(&live, HitRecord::genus);

    let mut trace = StageTrace {
        criterion: Criterion::UnanimousGenus,
        observation: Observation::Genera {
            genera: genera.clone(),
        },
        eliminated: Vec::new(),
        retained_genera: Vec::new(),
        resolved: None,
    };

    if let [genus] = genera.as_slice() {
        let call = HostCall::new(genus.clone(), TaxonRank::Genus);
        trace.resolved = Some(call.clone());
        return (trace, Step::Resolved { call, support: live });
    }

    trace.retained_genera = genera;
    (trace, Step::Narrowed(live))
}

/// Criterion 2: the genus hitting the most distinct positions on the phage
/// genome is the host, if it is strictly ahead of every other genus.
///
/// Repeated hits of one genus at the same mean position count once. Genera
/// with equal counts keep the order in which they first appear among the
/// candidates.
fn distinct_position_vote(live: Vec<&HitRecord>) -> (StageTrace, Step<'_>) {
    let mut seen_positions: HashSet<(&str, u64)> = HashSet::new();
    let mut vote_index: HashMap<&str, usize> = HashMap::new();
    let mut votes: Vec<GenusVote> = Vec::new();

    for record in &live {
        if !seen_positions.insert((record.genus(), record.mean_position())) {
            continue;
        }
        let idx = *vote_index.entry(record.genus()).or_insert_with(|| {
            votes.push(GenusVote {
                genus: record.genus().to_string(),
                distinct_positions: 0,
            });
            votes.len() - 1
        });
        votes[idx].distinct_positions += 1;
    }

    // Stable: ties stay in first-seen order
    votes.sort_by(|a, b| b.distinct_positions.cmp(&a.distinct_positions));

    let top = votes.first().map_or(0, |v| v.distinct_positions);
    let runner_up = votes.get(1).map(|v| v.distinct_positions);
    let retained: Vec<String> = votes
        .iter()
        .filter(|v| v.distinct_positions == top)
        .map(|v| v.genus.clone())
        .collect();

    let (kept, dropped): (Vec<&HitRecord>, Vec<&HitRecord>) = live
        .into_iter()
        .partition(|r| retained.iter().any(|g| g == r.genus()));

    let mut trace = StageTrace {
        criterion: Criterion::DistinctPositionVote,
        observation: Observation::PositionVotes { votes },
        eliminated: spacer_ids(&dropped),
        retained_genera: Vec::new(),
        resolved: None,
    };

    if runner_up.map_or(true, |count| top > count) {
        let call = HostCall::new(retained[0].clone(), TaxonRank::Genus);
        trace.resolved = Some(call.clone());
        return (trace, Step::Resolved { call, support: kept });
    }

    trace.retained_genera = retained;
    (trace, Step::Narrowed(kept))
}

/// Criterion 3: the genus owning the spacer(s) closest to the 5' end of
/// their CRISPR array is the host.
///
/// Only records whose relative position equals the observed minimum exactly
/// are kept; both sides of the comparison come from the same computation.
#[allow(clippy::float_cmp)]
fn five_prime_position(live: Vec<&HitRecord>) -> (StageTrace, Step<'_>) {
    let mut ranked: Vec<(&HitRecord, f64)> = live
        .into_iter()
        .map(|r| (r, r.five_prime_relative_position()))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

    let minimum = ranked.first().map_or(0.0, |(_, value)| *value);
    let positions = ranked
        .iter()
        .map(|(r, value)| RelativePosition {
            spacer_id: r.spacer_id().to_string(),
            genus: r.genus().to_string(),
            value: *value,
        })
        .collect();

    let (subset, rest): (Vec<_>, Vec<_>) = ranked
        .into_iter()
        .partition(|(_, value)| *value == minimum);
    let subset: Vec<&HitRecord> = subset.into_iter().map(|(r, _)| r).collect();
    let rest: Vec<&HitRecord> = rest.into_iter().map(|(r, _)| r).collect();

    let genera = distinct(&subset, HitRecord::genus);
    let mut trace = StageTrace {
        criterion: Criterion::FivePrimePosition,
        observation: Observation::RelativePositions { positions },
        eliminated: spacer_ids(&rest),
        retained_genera: Vec::new(),
        resolved: None,
    };

    if let [genus] = genera.as_slice() {
        let call = HostCall::new(genus.clone(), TaxonRank::Genus);
        trace.resolved = Some(call.clone());
        return (
            trace,
            Step::Resolved {
                call,
                support: subset,
            },
        );
    }

    trace.retained_genera = genera;
    (trace, Step::Narrowed(subset))
}

/// Criterion 4: the family, else the order, shared by all remaining
/// candidates. Without a shared rank the host is `"UNKNOWN"`.
fn last_common_ancestor(live: &[&HitRecord]) -> (StageTrace, HostCall) {
    let families = distinct(live, HitRecord::family);
    let orders = distinct(live, HitRecord::order);

    let call = match (families.as_slice(), orders.as_slice()) {
        ([family], _) => HostCall::new(family.clone(), TaxonRank::Family),
        (_, [order]) => HostCall::new(order.clone(), TaxonRank::Order),
        _ => HostCall::new(UNRESOLVED_HOST, TaxonRank::Unresolved),
    };

    let lineages = live
        .iter()
        .map(|r| Lineage {
            spacer_id: r.spacer_id().to_string(),
            genus: r.genus().to_string(),
            family: r.family().to_string(),
            order: r.order().to_string(),
        })
        .collect();

    let trace = StageTrace {
        criterion: Criterion::LastCommonAncestor,
        observation: Observation::Lineages { lineages },
        eliminated: Vec::new(),
        retained_genera: Vec::new(),
        resolved: Some(call.clone()),
    };
    (trace, call)
}
