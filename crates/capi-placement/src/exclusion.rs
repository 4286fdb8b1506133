//! Exclusion set — host ids disqualified for one scheduling run.

use std::collections::BTreeSet;

/// Insert-only set of excluded host ids.
///
/// There is no removal: once a host is excluded it stays excluded for
/// the lifetime of the run that owns the set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    hosts: BTreeSet<String>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude `host_id`. Returns `false` if it was already excluded.
    pub fn exclude(&mut self, host_id: impl Into<String>) -> bool {
        self.hosts.insert(host_id.into())
    }

    pub fn contains(&self, host_id: &str) -> bool {
        self.hosts.contains(host_id)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let set = ExclusionSet::new();
        assert!(set.is_empty());
        assert!(!set.contains("h1"));
    }

    #[test]
    fn exclude_is_idempotent() {
        let mut set = ExclusionSet::new();
        assert!(set.exclude("h1"));
        assert!(!set.exclude("h1"));
        assert_eq!(set.len(), 1);
        assert!(set.contains("h1"));
    }

    #[test]
    fn iterates_in_sorted_order() {
        let mut set = ExclusionSet::new();
        set.exclude("b");
        set.exclude("a");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
