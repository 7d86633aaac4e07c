//! Line diff between rendered marks and a fresh listing

use std::collections::BTreeSet;

/// Outcome of comparing rendered lines against a fresh lens listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiff {
    /// Lines holding a decoration with no current lens; must be cleared.
    pub invalid: BTreeSet<u32>,
    /// Lines with lenses but no decoration yet; must be rendered fresh.
    pub fresh: BTreeSet<u32>,
}

/// Pure set difference. Lines present on both sides are left alone here;
/// the resolver re-renders them later only if their content changes.
pub fn diff(cached: &BTreeSet<u32>, incoming: &BTreeSet<u32>) -> LineDiff {
    LineDiff {
        invalid: cached.difference(incoming).copied().collect(),
        fresh: incoming.difference(cached).copied().collect(),
    }
}
