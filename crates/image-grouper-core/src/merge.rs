//! Combining the match groups of several conditions into display groups.
//!
//! 1. Union per key over every active condition (any condition may match).
//! 2. Intersection per key with every must-match condition; a key the
//!    must-match condition did not report loses all its members.
//! 3. Groups of one member or fewer are dropped.
//! 4. Groups contained in a larger kept group are dropped. Larger groups are
//!    visited first; equal sizes are visited in identity order.

use log::debug;
use std::cmp::Reverse;
use std::collections::BTreeSet;

use crate::types::{FinalGroups, Identity, MatchGroupMap};

/// Match groups of one active condition
#[derive(Debug, Clone, Copy)]
pub struct Contribution<'a> {
    pub groups: &'a MatchGroupMap,
    pub must_match: bool,
}

/// Per-key union of all maps
pub fn union_groups<'a, I>(maps: I) -> MatchGroupMap
where
    I: IntoIterator<Item = &'a MatchGroupMap>,
{
    let mut merged = MatchGroupMap::new();
    for map in maps {
        for (key, members) in map {
            merged
                .entry(*key)
                .or_default()
                .extend(members.iter().copied());
        }
    }
    merged
}

/// Narrow every group to what each must-match map reports for the same key
pub fn intersect_must_match(mut groups: MatchGroupMap, must_match: &[&MatchGroupMap]) -> MatchGroupMap {
    for (key, members) in groups.iter_mut() {
        for required in must_match {
            match required.get(key) {
                Some(allowed) => members.retain(|member| allowed.contains(member)),
                None => members.clear(),
            }
        }
    }
    groups
}

/// Remove groups that cannot show a match (one member or fewer)
pub fn drop_degenerate(mut groups: MatchGroupMap) -> MatchGroupMap {
    groups.retain(|_, members| members.len() > 1);
    groups
}

/// Keep only groups that are not a subset of a larger (or earlier) kept group
pub fn remove_redundant_subgroups(groups: MatchGroupMap) -> FinalGroups {
    // BTreeMap order plus a stable sort: ties stay in identity order
    let mut ordered: Vec<(Identity, BTreeSet<Identity>)> = groups.into_iter().collect();
    ordered.sort_by_key(|(_, members)| Reverse(members.len()));

    let mut kept = FinalGroups::new();
    for (key, members) in ordered {
        if kept.values().any(|group| members.is_subset(group)) {
            continue;
        }
        kept.insert(key, members);
    }
    kept
}

/// Full merge of the active conditions' results.
///
/// Returns an empty map for an empty slice; the caller decides what an
/// unfiltered view looks like.
pub fn merge_groups(contributions: &[Contribution<'_>]) -> FinalGroups {
    let unioned = union_groups(contributions.iter().map(|c| c.groups));

    let must_match: Vec<&MatchGroupMap> = contributions
        .iter()
        .filter(|c| c.must_match)
        .map(|c| c.groups)
        .collect();
    let narrowed = if must_match.is_empty() {
        unioned
    } else {
        intersect_must_match(unioned, &must_match)
    };

    let candidates = drop_degenerate(narrowed);
    let candidate_count = candidates.len();
    let groups = remove_redundant_subgroups(candidates);
    debug!(
        "Merged {} conditions: {} candidate groups, {} kept",
        contributions.len(),
        candidate_count,
        groups.len()
    );
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::identity;

    fn set(ids: &[u8]) -> BTreeSet<Identity> {
        ids.iter().map(|n| identity(*n)).collect()
    }

    fn map(entries: &[(u8, &[u8])]) -> MatchGroupMap {
        entries
            .iter()
            .map(|(key, members)| (identity(*key), set(members)))
            .collect()
    }

    fn optional(groups: &MatchGroupMap) -> Contribution<'_> {
        Contribution {
            groups,
            must_match: false,
        }
    }

    fn required(groups: &MatchGroupMap) -> Contribution<'_> {
        Contribution {
            groups,
            must_match: true,
        }
    }

    #[test]
    fn test_union_per_key() {
        let first = map(&[(1, &[2, 3])]);
        let second = map(&[(2, &[3, 4])]);

        let merged = union_groups([&first, &second]);
        assert_eq!(merged, map(&[(1, &[2, 3]), (2, &[3, 4])]));
    }

    #[test]
    fn test_union_combines_shared_keys() {
        let date = map(&[(1, &[1, 2, 3]), (2, &[2, 3, 6]), (5, &[5, 6])]);
        let hash = map(&[(2, &[2, 3, 4]), (5, &[5, 6]), (6, &[6, 7])]);

        let merged = union_groups([&date, &hash]);
        assert_eq!(
            merged,
            map(&[(1, &[1, 2, 3]), (2, &[2, 3, 4, 6]), (5, &[5, 6]), (6, &[6, 7])])
        );
    }

    #[test]
    fn test_must_match_without_key_removes_group() {
        let first = map(&[(1, &[2, 3])]);
        let must = map(&[(2, &[3, 4])]);
        let third = map(&[(1, &[2, 3, 4])]);

        let unioned = union_groups([&first, &must, &third]);
        assert_eq!(unioned[&identity(1)], set(&[2, 3, 4]));

        let narrowed = intersect_must_match(unioned, &[&must]);
        assert!(narrowed[&identity(1)].is_empty());

        let merged = merge_groups(&[optional(&first), required(&must), optional(&third)]);
        assert!(!merged.contains_key(&identity(1)));
        assert_eq!(merged, map(&[(2, &[3, 4])]));
    }

    #[test]
    fn test_must_match_narrows_members() {
        let hash = map(&[(1, &[1, 2, 3]), (2, &[1, 2, 3]), (3, &[1, 2, 3])]);
        let camera = map(&[(1, &[1, 2]), (2, &[1, 2])]);

        let merged = merge_groups(&[optional(&hash), required(&camera)]);
        assert_eq!(merged, map(&[(1, &[1, 2])]));
    }

    #[test]
    fn test_must_match_alone() {
        let camera = map(&[(1, &[1, 2]), (2, &[1, 2])]);
        let merged = merge_groups(&[required(&camera)]);
        assert_eq!(merged, map(&[(1, &[1, 2])]));
    }

    #[test]
    fn test_subgroups_are_removed() {
        let groups = map(&[(1, &[1, 2, 3]), (2, &[2, 3])]);
        let reduced = remove_redundant_subgroups(groups);
        assert_eq!(reduced, map(&[(1, &[1, 2, 3])]));
    }

    #[test]
    fn test_equal_groups_keep_lowest_key() {
        let groups = map(&[(3, &[1, 2, 3]), (1, &[1, 2, 3]), (2, &[1, 2, 3])]);
        let reduced = remove_redundant_subgroups(groups);
        assert_eq!(reduced, map(&[(1, &[1, 2, 3])]));
    }

    #[test]
    fn test_overlapping_groups_both_survive() {
        let groups = map(&[(1, &[1, 2]), (2, &[1, 2, 3]), (3, &[2, 3, 4])]);
        let reduced = remove_redundant_subgroups(groups);
        assert_eq!(reduced, map(&[(2, &[1, 2, 3]), (3, &[2, 3, 4])]));
    }

    #[test]
    fn test_degenerate_groups_never_survive() {
        let single = map(&[(1, &[1]), (2, &[]), (3, &[3, 4])]);
        let merged = merge_groups(&[optional(&single)]);
        assert_eq!(merged, map(&[(3, &[3, 4])]));
    }

    #[test]
    fn test_no_contributions() {
        assert!(merge_groups(&[]).is_empty());
    }

    #[test]
    fn test_no_final_group_is_a_subset_of_another() {
        let first = map(&[(1, &[1, 2]), (2, &[1, 2, 5]), (5, &[2, 5])]);
        let second = map(&[(3, &[3, 4]), (4, &[3, 4, 1])]);
        let merged = merge_groups(&[optional(&first), optional(&second)]);

        for (a, group_a) in &merged {
            assert!(group_a.len() > 1);
            for (b, group_b) in &merged {
                if a != b {
                    assert!(!group_a.is_subset(group_b));
                }
            }
        }
    }
}
