//! Cluster node range notation.
//!
//! A [`NodeSet`] is an ordered, deduplicated set of node names with a compact string form:
//! `cpn-k[01-04],login1` stands for `cpn-k01`, `cpn-k02`, `cpn-k03`, `cpn-k04` and `login1`.
//! See [`grammar`] for the accepted syntax.
//!
//! # Ordering
//!
//! Names are grouped by their pattern key (the text before and after their last run of
//! digits). Groups appear in the order their first member was declared, and members keep their
//! declaration order within a group. This is the order [`NodeSet::iter`] yields and the order
//! the [`Display`][std::fmt::Display] form expands back to, so `node[3,1-2]` iterates as
//! `node3`, `node1`, `node2`.
//!
//! Equality is set equality: `node[1-3]` and `node3,node1,node2` are equal.

pub mod grammar;

mod fold;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

pub use grammar::GrammarError;

#[derive(Debug, Clone, Default)]
pub struct NodeSet {
    names: Vec<String>,
    members: HashSet<String>,
}

impl NodeSet {
    /// Parse a node range expression. An empty (or all whitespace) expression is the empty set.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] for unbalanced or nested brackets, non-numeric bounds,
    /// inverted ranges, empty patterns, or expressions that expand past
    /// [`grammar::MAX_EXPANSION`] names.
    pub fn parse(expr: &str) -> Result<Self, GrammarError> {
        Ok(Self::from_names(grammar::expand(expr)?))
    }

    /// Build the set holding `names`. Duplicates are dropped; the [`Display`][fmt::Display]
    /// form of the result is the folded range notation.
    pub fn contract<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_names(names.into_iter().map(Into::into).collect())
    }

    fn from_names(mut names: Vec<String>) -> Self {
        let mut members = HashSet::with_capacity(names.len());
        names.retain(|name| members.insert(name.clone()));
        NodeSet {
            names: fold::group_by_pattern(names),
            members,
        }
    }

    /// The expanded names, in set order.
    #[must_use]
    pub fn expand(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.names.iter()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.members.contains(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Members of `self` followed by members of `other` not already in `self`.
    #[must_use]
    pub fn union(&self, other: &NodeSet) -> NodeSet {
        Self::from_names(self.names.iter().chain(other.iter()).cloned().collect())
    }

    #[must_use]
    pub fn intersect(&self, other: &NodeSet) -> NodeSet {
        self.filter(|name| other.contains(name))
    }

    #[must_use]
    pub fn difference(&self, other: &NodeSet) -> NodeSet {
        self.filter(|name| !other.contains(name))
    }

    fn filter(&self, keep: impl Fn(&str) -> bool) -> NodeSet {
        Self::from_names(
            self.names
                .iter()
                .filter(|name| keep(name.as_str()))
                .cloned()
                .collect(),
        )
    }
}

impl fmt::Display for NodeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&fold::fold(&self.names))
    }
}

impl FromStr for NodeSet {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq for NodeSet {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl Eq for NodeSet {}

impl<S: Into<String>> FromIterator<S> for NodeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::contract(iter)
    }
}

impl<'a> IntoIterator for &'a NodeSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns(expr: &str) -> NodeSet {
        NodeSet::parse(expr).unwrap()
    }

    #[test]
    fn test_expand_scenario() {
        assert_eq!(ns("node[1-3]").expand(), ["node1", "node2", "node3"]);
    }

    #[test]
    fn test_empty_expression() {
        let empty = ns("");
        assert!(empty.is_empty());
        assert_eq!(empty.len(), 0);
        assert_eq!(empty.to_string(), "");
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let set = ns("node[1-3],node2,node[3-4]");
        assert_eq!(set.expand(), ["node1", "node2", "node3", "node4"]);
        assert_eq!(set.to_string(), "node[1-4]");
    }

    #[test]
    fn test_multiple_prefix_groups() {
        let set = ns("nodeA[1-2],nodeB[1-2]");
        assert_eq!(set.len(), 4);
        assert_eq!(set.to_string(), "nodeA[1-2],nodeB[1-2]");
        assert!(set.contains("nodeB2"));
        assert!(!set.contains("nodeC1"));
    }

    #[test]
    fn test_round_trip() {
        for expr in [
            "node[1-20,25,30-35]",
            "cpn-k[01-16]-ib,login[1-2]",
            "r[1-2]n[1-3]",
            "n[9-11],n[08-09]",
            "node[5,3,1-2]",
            "a1,b1,a2,head",
            "",
        ] {
            let set = ns(expr);
            let reparsed = ns(&set.to_string());
            assert_eq!(reparsed, set, "round trip of {expr:?}");
            assert_eq!(reparsed.expand(), set.expand(), "order of {expr:?}");
            assert_eq!(reparsed.to_string(), set.to_string());
        }
    }

    #[test]
    fn test_contract() {
        let set = NodeSet::contract(["node3", "node1", "node2", "node1", "gpu01", "gpu02"]);
        assert_eq!(set.to_string(), "node[3,1-2],gpu[01-02]");
        assert_eq!(set.len(), 5);

        let expanded: HashSet<&str> = set.iter().map(String::as_str).collect();
        assert_eq!(
            expanded,
            HashSet::from(["node1", "node2", "node3", "gpu01", "gpu02"])
        );
    }

    #[test]
    fn test_contract_sorted_input_is_minimal() {
        let names: Vec<String> = (1..=100).map(|i| format!("c{i:03}")).collect();
        assert_eq!(NodeSet::contract(names).to_string(), "c[001-100]");
    }

    #[test]
    fn test_set_algebra() {
        let a = ns("node[1-5]");
        let b = ns("node[4-8]");

        assert_eq!(a.union(&b), ns("node[1-8]"));
        assert_eq!(a.union(&b).to_string(), "node[1-8]");
        assert_eq!(a.intersect(&b), ns("node[4-5]"));
        assert_eq!(a.difference(&b), ns("node[1-3]"));
        assert_eq!(b.difference(&a).to_string(), "node[6-8]");
        assert!(a.intersect(&ns("login1")).is_empty());
    }

    #[test]
    fn test_algebra_ignores_notation() {
        let a = ns("node[01-03]");
        let b: NodeSet = ["node01", "node02", "node03"].into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(a.intersect(&ns("node[1-3]")).len(), 0);
    }

    #[test]
    fn test_from_str() {
        let set: NodeSet = "node[1-2]".parse().unwrap();
        assert_eq!(set.len(), 2);
        assert!("node[2-1]".parse::<NodeSet>().is_err());
    }

    #[test]
    fn test_into_iter_ref() {
        let set = ns("x[1-3]");
        let collected: Vec<&String> = (&set).into_iter().collect();
        assert_eq!(collected.len(), 3);
    }
}
