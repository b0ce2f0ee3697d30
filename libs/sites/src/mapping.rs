//! Overflow site-mapping aggregation.
//!
//! The policy supplies a reverse mapping `destination → [sources]`: jobs
//! whitelisted at any source may also run at the destination because the
//! destination can read the source's data. Tasks opt into overflow with an
//! additive whitelist; tasks sharing the same whitelist set are grouped so a
//! single rule covers them all.
//!
//! # Invariants
//!
//! - Whitelist keys are canonical (trimmed, sorted, deduplicated), so input
//!   order never splits a group
//! - A task belongs to at most one group
//! - Group iteration order is the canonical key order

use std::collections::{BTreeMap, BTreeSet};

use crate::sitelist;

/// Canonical form of a whitelist: sorted, deduplicated, comma-joined.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WhitelistKey(String);

impl WhitelistKey {
    /// Builds the canonical key for a set of sites.
    ///
    /// Returns `None` when no non-blank site remains.
    pub fn canonical<I, S>(sites: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = sites
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if set.is_empty() {
            return None;
        }

        Some(Self(sitelist::join(&set)))
    }

    /// Returns the canonical string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates the sites of this whitelist in canonical order.
    pub fn sites(&self) -> impl Iterator<Item = &str> {
        self.0.split(',')
    }

    /// Returns true if the whitelist contains `site`.
    pub fn contains(&self, site: &str) -> bool {
        self.sites().any(|s| s == site)
    }
}

impl std::fmt::Display for WhitelistKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source site → every destination that may take its overflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceToDests(BTreeMap<String, BTreeSet<String>>);

impl SourceToDests {
    /// Inverts a reverse `destination → [sources]` mapping.
    pub fn invert(reversed: &BTreeMap<String, Vec<String>>) -> Self {
        let mut inner: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (dest, sources) in reversed {
            for source in sources {
                inner
                    .entry(source.clone())
                    .or_default()
                    .insert(dest.clone());
            }
        }
        Self(inner)
    }

    /// Destinations reachable from `source`.
    pub fn destinations(&self, source: &str) -> Option<&BTreeSet<String>> {
        self.0.get(source)
    }

    /// Number of sources with at least one destination.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no source has a destination.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Restricts every destination set to `whitelist`.
    ///
    /// Sources left without a destination are dropped.
    pub fn scoped(&self, whitelist: &WhitelistKey) -> ScopedMapping {
        let inner = self
            .0
            .iter()
            .filter_map(|(source, dests)| {
                let kept: Vec<String> = dests
                    .iter()
                    .filter(|d| whitelist.contains(d))
                    .cloned()
                    .collect();
                (!kept.is_empty()).then(|| (source.clone(), kept))
            })
            .collect();
        ScopedMapping(inner)
    }
}

/// A source → destinations map restricted to one whitelist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopedMapping(BTreeMap<String, Vec<String>>);

impl ScopedMapping {
    /// Destinations for `source`, if any survived scoping.
    pub fn get(&self, source: &str) -> Option<&[String]> {
        self.0.get(source).map(Vec::as_slice)
    }

    /// Number of sources in the mapping.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates `(source, destinations)` in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Expands a comma-separated whitelist with this mapping.
    pub fn expand(&self, whitelist: &str) -> String {
        sitelist::expand(whitelist, |site| {
            self.get(site).map(<[String]>::to_vec).unwrap_or_default()
        })
    }
}

impl FromIterator<(String, Vec<String>)> for ScopedMapping {
    fn from_iter<T: IntoIterator<Item = (String, Vec<String>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Outcome of adding a task to [`WhitelistGroups`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupInsert {
    /// The task joined (or created) the group for its whitelist.
    Added(WhitelistKey),

    /// The task already belongs to a group; the new whitelist was ignored.
    Duplicate { existing: WhitelistKey },

    /// The whitelist had no usable site.
    EmptyWhitelist,
}

/// Tasks grouped by canonical additive whitelist.
#[derive(Debug, Clone, Default)]
pub struct WhitelistGroups {
    groups: BTreeMap<WhitelistKey, BTreeSet<String>>,
    claimed: BTreeMap<String, WhitelistKey>,
}

impl WhitelistGroups {
    /// Create an empty grouping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `task` under the canonical form of `sites`.
    ///
    /// The first whitelist seen for a task wins.
    pub fn insert<I, S>(&mut self, task: &str, sites: I) -> GroupInsert
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if let Some(existing) = self.claimed.get(task) {
            return GroupInsert::Duplicate {
                existing: existing.clone(),
            };
        }

        let Some(key) = WhitelistKey::canonical(sites) else {
            return GroupInsert::EmptyWhitelist;
        };

        self.groups
            .entry(key.clone())
            .or_default()
            .insert(task.to_string());
        self.claimed.insert(task.to_string(), key.clone());

        GroupInsert::Added(key)
    }

    /// Number of distinct whitelists.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if no task was grouped.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterates groups in canonical key order.
    pub fn iter(&self) -> impl Iterator<Item = (&WhitelistKey, &BTreeSet<String>)> {
        self.groups.iter()
    }

    /// Pairs every group with its scoped mapping.
    pub fn into_site_map_groups(self, mapping: &SourceToDests) -> Vec<SiteMapGroup> {
        self.groups
            .into_iter()
            .map(|(whitelist, tasks)| {
                let scoped = mapping.scoped(&whitelist);
                SiteMapGroup {
                    whitelist,
                    tasks,
                    mapping: scoped,
                }
            })
            .collect()
    }
}

/// Tasks sharing one additive whitelist, with the mapping scoped to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteMapGroup {
    /// Canonical whitelist shared by the tasks.
    pub whitelist: WhitelistKey,

    /// Tasks covered by the group.
    pub tasks: BTreeSet<String>,

    /// Source → destinations restricted to `whitelist`.
    pub mapping: ScopedMapping,
}
