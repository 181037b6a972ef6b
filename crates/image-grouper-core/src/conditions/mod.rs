//! Pluggable similarity conditions.
//!
//! A [`Criterion`] is the pairwise predicate plus its tunable parameters. A
//! [`ConditionModule`] wraps one criterion with the activation and must-match
//! flags, runs the predicate over every pair of a universe of identities and
//! memoizes the resulting [`MatchGroupMap`] against a snapshot of the
//! universe and the parameters.
//!
//! The engine in this module is single threaded; expensive attribute work
//! happens in [`Criterion::prepare`] through the attribute provider's batch
//! operations.

mod exif;
mod hashing;
mod set;
mod shape;

pub use exif::{CameraCriterion, CameraSense, TimeCriterion, TimeWindow};
pub use hashing::{HashCriterion, HashFamily, LIMIT_RANGE};
pub use set::ConditionSet;
pub use shape::{ShapeCriterion, ShapeTolerance};

use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::attributes::AttributeProvider;
use crate::error::{Error, Result};
use crate::types::{Identity, MatchGroupMap};

static NO_GROUPS: MatchGroupMap = BTreeMap::new();

/// Outcome of comparing one ordered pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Judgement {
    pub matched: bool,
    /// Distance measured along the way, reported in the [`MatchSummary`]
    pub distance: Option<f64>,
}

impl Judgement {
    pub fn from_bool(matched: bool) -> Self {
        Self {
            matched,
            distance: None,
        }
    }

    /// Never matches; used when an attribute is unavailable
    pub fn no_match() -> Self {
        Self::from_bool(false)
    }

    /// Matches when `distance` is known and at most `limit`
    pub fn within(distance: Option<f64>, limit: f64) -> Self {
        Self {
            matched: distance.map_or(false, |d| d <= limit),
            distance,
        }
    }
}

/// A pairwise similarity predicate with tunable parameters
pub trait Criterion {
    /// Snapshot of every parameter that influences [`Criterion::judge`]
    type Params: Clone + PartialEq + fmt::Debug;

    /// Stable machine name, e.g. `"cameramodel"`
    fn name(&self) -> &'static str;

    /// Human readable description of the current settings
    fn label(&self) -> String;

    fn params(&self) -> Self::Params;

    /// Make sure the attributes `judge` reads are available
    fn prepare(&self, _provider: &mut AttributeProvider) -> Result<()> {
        Ok(())
    }

    /// Compare `a` (the reference) with `b`. Missing attributes never match.
    fn judge(&self, provider: &AttributeProvider, a: &Identity, b: &Identity) -> Judgement;

    /// Whether `judge(a, b)` always equals `judge(b, a)`
    fn is_symmetric(&self) -> bool {
        true
    }
}

/// Distances observed in the last recomputation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchSummary {
    /// Pairs that produced a distance
    pub pairs: usize,
    pub minimum: f64,
    /// Only reported once ten or more pairs were measured
    pub tenth_smallest: Option<f64>,
}

impl MatchSummary {
    pub fn from_distances(mut distances: Vec<f64>) -> Option<Self> {
        if distances.is_empty() {
            return None;
        }
        distances.sort_by(f64::total_cmp);
        Some(Self {
            pairs: distances.len(),
            minimum: distances[0],
            tenth_smallest: distances.get(9).copied(),
        })
    }
}

impl fmt::Display for MatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "min={}", self.minimum.ceil())?;
        if let Some(tenth) = self.tenth_smallest {
            write!(f, "; >10 pairs={}", tenth.ceil())?;
        }
        Ok(())
    }
}

/// Object-safe view of a condition module, as the controller sees it
pub trait Condition {
    fn name(&self) -> &'static str;
    fn label(&self) -> String;
    fn is_active(&self) -> bool;
    fn set_active(&mut self, active: bool);
    fn must_match(&self) -> bool;
    fn set_must_match(&mut self, must_match: bool);

    /// Match groups over `universe`, served from the memo when neither the
    /// universe nor the parameters changed since the last call.
    ///
    /// Fails with [`Error::UnknownIdentity`] when `universe` holds an identity
    /// the provider does not know.
    fn compute_match_groups(
        &mut self,
        universe: &BTreeSet<Identity>,
        provider: &mut AttributeProvider,
    ) -> Result<&MatchGroupMap>;

    fn summary(&self) -> Option<MatchSummary>;
}

struct Memo<P> {
    universe: BTreeSet<Identity>,
    params: P,
    groups: MatchGroupMap,
}

/// One criterion plus its activation state and memoized result
pub struct ConditionModule<C: Criterion> {
    criterion: C,
    active: bool,
    must_match: bool,
    memo: Option<Memo<C::Params>>,
    summary: Option<MatchSummary>,
}

impl<C: Criterion> ConditionModule<C> {
    /// Inactive, optional module
    pub fn new(criterion: C) -> Self {
        Self {
            criterion,
            active: false,
            must_match: false,
            memo: None,
            summary: None,
        }
    }

    pub fn criterion(&self) -> &C {
        &self.criterion
    }

    /// Parameter changes take effect on the next `compute_match_groups`
    pub fn criterion_mut(&mut self) -> &mut C {
        &mut self.criterion
    }

    fn is_fresh(&self, universe: &BTreeSet<Identity>, params: &C::Params) -> bool {
        match &self.memo {
            Some(memo) => memo.universe == *universe && memo.params == *params,
            None => false,
        }
    }
}

impl<C: Criterion> Condition for ConditionModule<C> {
    fn name(&self) -> &'static str {
        self.criterion.name()
    }

    fn label(&self) -> String {
        self.criterion.label()
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn must_match(&self) -> bool {
        self.must_match
    }

    fn set_must_match(&mut self, must_match: bool) {
        self.must_match = must_match;
    }

    fn compute_match_groups(
        &mut self,
        universe: &BTreeSet<Identity>,
        provider: &mut AttributeProvider,
    ) -> Result<&MatchGroupMap> {
        let params = self.criterion.params();
        if !self.is_fresh(universe, &params) {
            if let Some(unknown) = universe.iter().find(|id| !provider.contains(id)) {
                return Err(Error::UnknownIdentity(*unknown));
            }

            self.criterion.prepare(provider)?;
            let (groups, summary) = evaluate_pairs(&self.criterion, universe, provider);
            debug!(
                "{}: {} of {} identities matched ({:?})",
                self.criterion.name(),
                groups.len(),
                universe.len(),
                params
            );

            self.summary = summary;
            self.memo = Some(Memo {
                universe: universe.clone(),
                params,
                groups,
            });
        }

        Ok(self.memo.as_ref().map_or(&NO_GROUPS, |memo| &memo.groups))
    }

    fn summary(&self) -> Option<MatchSummary> {
        self.summary
    }
}

/// Judge every unordered pair of `universe` once and record matches in both
/// directions. Asymmetric criteria get a second look with the roles swapped.
fn evaluate_pairs<C: Criterion>(
    criterion: &C,
    universe: &BTreeSet<Identity>,
    provider: &AttributeProvider,
) -> (MatchGroupMap, Option<MatchSummary>) {
    let ids: Vec<&Identity> = universe.iter().collect();
    let symmetric = criterion.is_symmetric();
    let mut groups = MatchGroupMap::new();
    let mut distances = Vec::new();

    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            let judgement = criterion.judge(provider, a, b);
            if let Some(distance) = judgement.distance {
                distances.push(distance);
            }
            let matched = judgement.matched
                || (!symmetric && criterion.judge(provider, b, a).matched);
            if matched {
                link(&mut groups, **a, **b);
                link(&mut groups, **b, **a);
            }
        }
    }

    (groups, MatchSummary::from_distances(distances))
}

/// Add `other` to the group of `key`; a new group always contains its key
fn link(groups: &mut MatchGroupMap, key: Identity, other: Identity) {
    groups
        .entry(key)
        .or_insert_with(|| BTreeSet::from([key]))
        .insert(other);
}
