//! Integration tests for StateGraph: compile validation and warnings.

use stepgraph::{
    node_fn, CompileWarning, PartialState, RegistryError, RouteKey, State, StateGraph,
    StateSchema, Violation, END, START,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Review {
    Approved,
    Rejected,
    Escalated,
}

impl RouteKey for Review {
    fn variants() -> &'static [Self] {
        &[Review::Approved, Review::Rejected, Review::Escalated]
    }

    fn as_str(&self) -> &'static str {
        match self {
            Review::Approved => "approved",
            Review::Rejected => "rejected",
            Review::Escalated => "escalated",
        }
    }
}

fn review(_state: &State) -> Option<Review> {
    Some(Review::Approved)
}

fn graph_with(names: &[&str]) -> StateGraph {
    let mut graph = StateGraph::new(StateSchema::builder().text("topic").build());
    for name in names {
        graph
            .add_node(*name, node_fn(|_state| async { Ok(PartialState::new()) }))
            .unwrap();
    }
    graph
}

#[test]
fn compile_fails_when_edge_refers_to_unknown_node() {
    let mut graph = graph_with(&["write"]);
    graph.add_edge(START, "write").add_edge("write", "missing");

    let err = graph.compile().err().unwrap();
    assert_eq!(
        err.violations,
        vec![Violation::UnknownTarget {
            from: "write".into(),
            to: "missing".into()
        }]
    );
    assert!(err.to_string().contains("`write` -> `missing`"));
}

#[test]
fn compile_reports_all_violations_at_once() {
    let mut graph = graph_with(&["write", "review"]);
    graph
        .set_start("nobody")
        .add_edge("write", "review")
        .add_edge("write", END)
        .add_conditional_edges(
            "review",
            review,
            [(Review::Approved, END), (Review::Rejected, "ghost")],
        );

    let err = graph.compile().err().unwrap();
    let v = &err.violations;
    assert!(v.contains(&Violation::UnknownStart("nobody".into())));
    assert!(v.contains(&Violation::ConflictingEdges("write".into())));
    assert!(v.contains(&Violation::UnknownOutcomeTarget {
        from: "review".into(),
        key: "rejected".into(),
        to: "ghost".into()
    }));
    assert!(v.contains(&Violation::MissingOutcome {
        from: "review".into(),
        key: "escalated".into()
    }));
    assert_eq!(v.len(), 4);
}

#[test]
fn conditional_source_must_be_registered() {
    let mut graph = graph_with(&["write"]);
    graph
        .add_edge(START, "write")
        .add_edge("write", END)
        .add_conditional_edges(
            "phantom",
            review,
            [
                (Review::Approved, END),
                (Review::Rejected, "write"),
                (Review::Escalated, END),
            ],
        );
    let err = graph.compile().err().unwrap();
    assert_eq!(err.violations, vec![Violation::UnknownSource("phantom".into())]);
}

#[test]
fn repeated_outcome_key_is_a_violation() {
    let mut graph = graph_with(&["write", "review"]);
    graph
        .add_edge(START, "write")
        .add_edge("write", "review")
        .add_conditional_edges(
            "review",
            review,
            [
                (Review::Approved, END),
                (Review::Approved, "write"),
                (Review::Rejected, "write"),
                (Review::Escalated, "nowhere"),
            ],
        );
    let err = graph.compile().err().unwrap();
    assert_eq!(
        err.violations,
        vec![
            Violation::UnknownOutcomeTarget {
                from: "review".into(),
                key: "escalated".into(),
                to: "nowhere".into()
            },
            Violation::DuplicateOutcome {
                from: "review".into(),
                key: "approved".into()
            },
        ]
    );
    assert!(err.to_string().contains("`approved` is given more than once"));
}

#[test]
fn cycles_compile() {
    let mut graph = graph_with(&["write", "review"]);
    graph
        .add_edge(START, "write")
        .add_edge("write", "review")
        .add_conditional_edges(
            "review",
            review,
            [
                (Review::Approved, END),
                (Review::Rejected, "write"),
                (Review::Escalated, "review"),
            ],
        );
    let compiled = graph.compile().unwrap();
    assert!(compiled.warnings().is_empty());
    assert!(!compiled.has_checkpointer());
}

#[test]
fn unreachable_nodes_are_warnings_not_errors() {
    let mut graph = graph_with(&["write", "orphan"]);
    graph.add_edge(START, "write").add_edge("write", END).add_edge("orphan", "write");
    let compiled = graph.compile().unwrap();
    assert_eq!(
        compiled.warnings(),
        [CompileWarning::Unreachable("orphan".into())]
    );
}

#[test]
fn sentinel_names_cannot_be_nodes() {
    let mut graph = graph_with(&[]);
    let err = graph
        .add_node(END, node_fn(|_state| async { Ok(PartialState::new()) }))
        .err()
        .unwrap();
    assert_eq!(err, RegistryError::ReservedName(END.into()));
}
