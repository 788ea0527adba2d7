//! Edge table: unconditional and conditional edges, and next-node resolution.
//!
//! Conditional edges are keyed by a closed enumeration (`RouteKey`) rather than free
//! strings, so the compiler can check that every variant has an outcome.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;

use crate::error::RoutingError;
use crate::state::State;

use super::next::{Destination, Resolved};

/// Closed set of outcomes a routing function can produce.
///
/// Implement for a plain fieldless enum; `variants` must list every value so outcome
/// maps can be checked for completeness at compile time.
pub trait RouteKey: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Every value of the key type.
    fn variants() -> &'static [Self];

    /// Stable name, recorded in checkpoints.
    fn as_str(&self) -> &'static str;
}

type RouteFn = Box<dyn Fn(&State) -> Option<&'static str> + Send + Sync>;

/// Routing function plus its outcome map, with the key type erased to names.
pub struct ConditionalEdge {
    route: RouteFn,
    outcomes: BTreeMap<&'static str, Destination>,
    keys: Vec<&'static str>,
    /// Keys given more than once; the first entry is kept.
    duplicates: Vec<&'static str>,
}

impl ConditionalEdge {
    fn new<K, F, I, D>(route: F, outcomes: I) -> Self
    where
        K: RouteKey,
        F: Fn(&State) -> Option<K> + Send + Sync + 'static,
        I: IntoIterator<Item = (K, D)>,
        D: Into<String>,
    {
        let mut map = BTreeMap::new();
        let mut duplicates = Vec::new();
        for (k, d) in outcomes {
            let key = k.as_str();
            if map.contains_key(key) {
                if !duplicates.contains(&key) {
                    duplicates.push(key);
                }
                continue;
            }
            map.insert(key, Destination::from_name(d));
        }
        Self {
            route: Box::new(move |state: &State| route(state).map(|k| k.as_str())),
            outcomes: map,
            keys: K::variants().iter().map(|k| k.as_str()).collect(),
            duplicates,
        }
    }

    /// Outcome map entries (route key name → destination).
    pub fn outcomes(&self) -> impl Iterator<Item = (&'static str, &Destination)> {
        self.outcomes.iter().map(|(k, d)| (*k, d))
    }

    /// Key variants that have no outcome.
    pub fn missing_outcomes(&self) -> Vec<&'static str> {
        self.keys
            .iter()
            .copied()
            .filter(|k| !self.outcomes.contains_key(k))
            .collect()
    }

    /// Keys that appeared more than once in the outcome map.
    pub fn duplicate_outcomes(&self) -> &[&'static str] {
        &self.duplicates
    }
}

/// Outgoing edge set of one node: exactly one of the two kinds.
pub enum Edge {
    Unconditional(Destination),
    Conditional(ConditionalEdge),
}

impl Edge {
    /// Every destination this edge can lead to.
    pub fn targets(&self) -> Vec<&Destination> {
        match self {
            Edge::Unconditional(d) => vec![d],
            Edge::Conditional(c) => c.outcomes.values().collect(),
        }
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Unconditional(d) => f.debug_tuple("Unconditional").field(d).finish(),
            Edge::Conditional(c) => f
                .debug_struct("Conditional")
                .field("outcomes", &c.outcomes)
                .finish_non_exhaustive(),
        }
    }
}

/// Source node name → outgoing edge set.
///
/// A second edge set for the same source is not stored; the source is recorded in
/// `conflicts` and reported by `StateGraph::compile`.
#[derive(Debug, Default)]
pub struct EdgeTable {
    edges: BTreeMap<String, Edge>,
    conflicts: Vec<String>,
}

impl EdgeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `from → to`; `to` may be `END`.
    pub fn add_unconditional(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.insert(from.into(), Edge::Unconditional(Destination::from_name(to)));
    }

    /// `from → route(state) → outcomes[key]`; outcome targets may be `END`.
    pub fn add_conditional<K, F, I, D>(&mut self, from: impl Into<String>, route: F, outcomes: I)
    where
        K: RouteKey,
        F: Fn(&State) -> Option<K> + Send + Sync + 'static,
        I: IntoIterator<Item = (K, D)>,
        D: Into<String>,
    {
        self.insert(
            from.into(),
            Edge::Conditional(ConditionalEdge::new(route, outcomes)),
        );
    }

    fn insert(&mut self, from: String, edge: Edge) {
        if self.edges.contains_key(&from) {
            if !self.conflicts.contains(&from) {
                self.conflicts.push(from);
            }
            return;
        }
        self.edges.insert(from, edge);
    }

    pub fn get(&self, from: &str) -> Option<&Edge> {
        self.edges.get(from)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Edge)> {
        self.edges.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Sources that were given more than one edge set.
    pub fn conflicts(&self) -> &[String] {
        &self.conflicts
    }

    /// Next destination after `from` ran and produced `state`.
    ///
    /// Unconditional edges return their target. Conditional edges invoke the routing
    /// function and look its key up in the outcome map.
    pub fn resolve_next(&self, from: &str, state: &State) -> Result<Resolved, RoutingError> {
        match self.edges.get(from) {
            Some(Edge::Unconditional(d)) => Ok(Resolved {
                destination: d.clone(),
                route: None,
            }),
            Some(Edge::Conditional(c)) => {
                let key = (c.route)(state).ok_or_else(|| RoutingError::NoRouteKey {
                    node: from.to_string(),
                })?;
                let destination = c
                    .outcomes
                    .get(key)
                    .cloned()
                    .ok_or_else(|| RoutingError::Unmapped {
                        node: from.to_string(),
                        key: key.to_string(),
                    })?;
                Ok(Resolved {
                    destination,
                    route: Some(key),
                })
            }
            None => Err(RoutingError::Dangling {
                node: from.to_string(),
            }),
        }
    }
}
