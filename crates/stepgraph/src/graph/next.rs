//! Where control goes after a node: another node or the terminal sentinel.
//!
//! `START` and `END` are the sentinel names used by the definition API
//! (`add_edge(START, "a")`, `add_edge("a", END)`); internally an edge target is a
//! `Destination`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel source name: `add_edge(START, name)` sets the start node.
pub const START: &str = "__start__";

/// Terminal sentinel: not a real node; reaching it ends the run.
pub const END: &str = "__end__";

/// Target of an edge or outcome-map entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// Run the named node next.
    Node(String),
    /// Terminal sentinel.
    End,
}

impl Destination {
    /// Maps `END` to `Destination::End`, anything else to a node name.
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into();
        if name == END {
            Destination::End
        } else {
            Destination::Node(name)
        }
    }

    /// Node name, or `None` for the terminal sentinel.
    pub fn node(&self) -> Option<&str> {
        match self {
            Destination::Node(n) => Some(n),
            Destination::End => None,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Node(n) => f.write_str(n),
            Destination::End => f.write_str(END),
        }
    }
}

/// Result of `EdgeTable::resolve_next`: the destination plus the route key taken,
/// when the edge was conditional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub destination: Destination,
    pub route: Option<&'static str>,
}
