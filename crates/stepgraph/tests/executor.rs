//! Integration tests for CompiledStateGraph: runs, cycles, step limit, failures,
//! resume, cancellation and concurrent runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use stepgraph::{
    node_fn, CheckpointSource, Checkpointer, CompiledStateGraph, MemorySaver, PartialState,
    RouteKey, RoutingError, RunConfig, RunError, RunStatus, State, StateGraph, StateSchema,
    StepError, END, START,
};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Verdict {
    Pass,
    Fail,
}

impl RouteKey for Verdict {
    fn variants() -> &'static [Self] {
        &[Verdict::Pass, Verdict::Fail]
    }

    fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "pass",
            Verdict::Fail => "fail",
        }
    }
}

fn verdict(state: &State) -> Option<Verdict> {
    match state.get_str("verdict")? {
        "pass" => Some(Verdict::Pass),
        "fail" => Some(Verdict::Fail),
        _ => None,
    }
}

fn schema() -> StateSchema {
    StateSchema::builder()
        .text("topic")
        .text("draft")
        .enumeration("verdict", ["pass", "fail"])
        .any("count")
        .build()
}

fn count(state: &State) -> u64 {
    state.get("count").and_then(Value::as_u64).unwrap_or(0)
}

/// writer bumps `count`; reviewer passes once `count` reaches `rounds`.
fn review_loop(rounds: u64) -> StateGraph {
    let mut graph = StateGraph::new(schema());
    graph
        .add_node(
            "writer",
            node_fn(|state: State| async move {
                let n = count(&state) + 1;
                let topic = state.get_str("topic").unwrap_or_default().to_string();
                Ok(PartialState::new()
                    .set("count", n)
                    .set("draft", format!("{topic} v{n}")))
            }),
        )
        .unwrap()
        .add_node(
            "reviewer",
            node_fn(move |state: State| async move {
                let v = if count(&state) >= rounds { "pass" } else { "fail" };
                Ok(PartialState::new().set("verdict", v))
            }),
        )
        .unwrap();
    graph
        .add_edge(START, "writer")
        .add_edge("writer", "reviewer")
        .add_conditional_edges(
            "reviewer",
            verdict,
            [(Verdict::Pass, END), (Verdict::Fail, "writer")],
        );
    graph
}

fn topic(t: &str) -> PartialState {
    PartialState::new().set("topic", t)
}

#[tokio::test]
async fn linear_run_checkpoints_every_step() {
    let saver = Arc::new(MemorySaver::new());
    let mut graph = StateGraph::new(schema());
    graph
        .add_node(
            "draft",
            node_fn(|_state| async { Ok(PartialState::new().set("draft", "hello")) }),
        )
        .unwrap()
        .add_node(
            "noop",
            node_fn(|_state| async { Ok(PartialState::new()) }),
        )
        .unwrap();
    graph
        .add_edge(START, "draft")
        .add_edge("draft", "noop")
        .add_edge("noop", END);
    let compiled = graph.compile_with_checkpointer(saver.clone()).unwrap();

    let config = RunConfig::new("linear");
    let state = compiled.invoke(topic("greeting"), &config).await.unwrap();
    assert_eq!(state.get_str("draft"), Some("hello"));
    assert_eq!(state.get_str("topic"), Some("greeting"));

    let history = compiled.state_history("linear").await.unwrap();
    let seqs: Vec<u64> = history.iter().map(|c| c.seq).collect();
    assert_eq!(seqs, vec![0, 1, 2]);
    assert_eq!(history[0].metadata.source, CheckpointSource::Input);
    assert_eq!(history[1].node.as_deref(), Some("draft"));
    assert_eq!(history[2].next, Some(stepgraph::Destination::End));
    assert!(!history[1].state.contains("verdict"));
}

#[tokio::test]
async fn cycle_runs_until_reviewer_passes() {
    let saver = Arc::new(MemorySaver::new());
    let compiled = review_loop(3)
        .compile_with_checkpointer(saver.clone())
        .unwrap();
    let state = compiled
        .invoke(topic("sort"), &RunConfig::new("cycle"))
        .await
        .unwrap();
    assert_eq!(count(&state), 3);
    assert_eq!(state.get_str("draft"), Some("sort v3"));
    assert_eq!(state.get_str("verdict"), Some("pass"));

    let history = saver.list("cycle").await.unwrap();
    assert_eq!(history.len(), 7);
    let routes: Vec<_> = history.iter().filter_map(|c| c.route.as_deref()).collect();
    assert_eq!(routes, vec!["fail", "fail", "pass"]);
}

#[tokio::test]
async fn works_without_checkpointer() {
    let compiled = review_loop(2).compile().unwrap();
    let state = compiled
        .invoke(topic("t"), &RunConfig::generated())
        .await
        .unwrap();
    assert_eq!(count(&state), 2);

    let err = compiled.resume(&RunConfig::new("any")).await.unwrap_err();
    assert!(matches!(err.error, RunError::NoCheckpointer));
    assert!(matches!(
        compiled.state_history("any").await,
        Err(RunError::NoCheckpointer)
    ));
}

#[tokio::test]
async fn self_loop_stops_at_step_limit() {
    let saver = Arc::new(MemorySaver::new());
    let mut graph = StateGraph::new(schema());
    graph
        .add_node(
            "spin",
            node_fn(|state: State| async move { Ok(PartialState::new().set("count", count(&state) + 1)) }),
        )
        .unwrap();
    graph.add_edge(START, "spin").add_edge("spin", "spin");
    let compiled = graph.compile_with_checkpointer(saver.clone()).unwrap();

    for limit in [1u64, 4, 9] {
        let run_id = format!("spin-{limit}");
        let config = RunConfig::new(&run_id).with_max_steps(limit);
        let failure = compiled.invoke(PartialState::new(), &config).await.unwrap_err();
        assert!(matches!(failure.error, RunError::StepLimitExceeded(n) if n == limit));
        assert_eq!(failure.last_checkpoint, Some(limit));
        assert_eq!(failure.node.as_deref(), Some("spin"));
        assert_eq!(count(&failure.state), limit);

        let latest = compiled.get_state(&run_id).await.unwrap().unwrap();
        assert_eq!(latest.seq, limit);
    }
}

#[tokio::test]
async fn resume_after_step_failure_matches_uninterrupted_run() {
    let build = |fail_once: Arc<AtomicBool>| {
        let mut graph = StateGraph::new(schema());
        graph
            .add_node(
                "draft",
                node_fn(|state: State| async move {
                    let topic = state.get_str("topic").unwrap_or_default().to_string();
                    Ok(PartialState::new().set("draft", format!("draft of {topic}")))
                }),
            )
            .unwrap()
            .add_node(
                "review",
                node_fn(move |state: State| {
                    let fail_once = fail_once.clone();
                    async move {
                        if fail_once.swap(false, Ordering::SeqCst) {
                            let timeout =
                                std::io::Error::new(std::io::ErrorKind::TimedOut, "llm timed out");
                            return Err(StepError::collaborator(timeout));
                        }
                        let v = if state.contains("draft") { "pass" } else { "fail" };
                        Ok(PartialState::new().set("verdict", v).set("count", 1))
                    }
                }),
            )
            .unwrap();
        graph
            .add_edge(START, "draft")
            .add_edge("draft", "review")
            .add_conditional_edges(
                "review",
                verdict,
                [(Verdict::Pass, END), (Verdict::Fail, "draft")],
            );
        graph
    };

    let clean = build(Arc::new(AtomicBool::new(false)))
        .compile_with_checkpointer(Arc::new(MemorySaver::new()))
        .unwrap();
    let expected = clean
        .invoke(topic("parser"), &RunConfig::new("clean"))
        .await
        .unwrap();

    let saver = Arc::new(MemorySaver::new());
    let flaky = build(Arc::new(AtomicBool::new(true)))
        .compile_with_checkpointer(saver.clone())
        .unwrap();
    let config = RunConfig::new("flaky");
    let failure = flaky.invoke(topic("parser"), &config).await.unwrap_err();
    assert_eq!(failure.node.as_deref(), Some("review"));
    assert_eq!(failure.error.kind(), "step_failure");
    assert_eq!(failure.last_checkpoint, Some(1));
    assert!(failure.to_string().contains("llm timed out"));

    let resumed = flaky.resume(&config).await.unwrap();
    assert_eq!(resumed, expected);

    let seqs: Vec<u64> = saver.list("flaky").await.unwrap().iter().map(|c| c.seq).collect();
    assert_eq!(seqs, vec![0, 1, 2]);
}

#[tokio::test]
async fn first_step_failure_resumes_from_input_checkpoint() {
    let saver = Arc::new(MemorySaver::new());
    let fail_once = Arc::new(AtomicBool::new(true));
    let mut graph = StateGraph::new(schema());
    let flag = fail_once.clone();
    graph
        .add_node(
            "only",
            node_fn(move |_state| {
                let flag = flag.clone();
                async move {
                    if flag.swap(false, Ordering::SeqCst) {
                        return Err(StepError::failed("not yet"));
                    }
                    Ok(PartialState::new().set("draft", "done"))
                }
            }),
        )
        .unwrap();
    graph.add_edge(START, "only").add_edge("only", END);
    let compiled = graph.compile_with_checkpointer(saver).unwrap();

    let config = RunConfig::new("first");
    let failure = compiled.invoke(topic("x"), &config).await.unwrap_err();
    assert_eq!(failure.last_checkpoint, Some(0));
    assert_eq!(failure.state.get_str("topic"), Some("x"));

    let state = compiled.resume(&config).await.unwrap();
    assert_eq!(state.get_str("draft"), Some("done"));
    assert_eq!(state.get_str("topic"), Some("x"));
}

#[tokio::test]
async fn routing_failure_resumes_once_graph_is_fixed() {
    let saver = Arc::new(MemorySaver::new());
    let build = |route: fn(&State) -> Option<Verdict>| {
        let mut graph = StateGraph::new(schema());
        graph
            .add_node(
                "draft",
                node_fn(|_state| async { Ok(PartialState::new().set("draft", "d")) }),
            )
            .unwrap()
            .add_node(
                "publish",
                node_fn(|_state| async { Ok(PartialState::new().set("count", 1)) }),
            )
            .unwrap();
        graph
            .add_edge(START, "draft")
            .add_conditional_edges(
                "draft",
                route,
                [(Verdict::Pass, "publish"), (Verdict::Fail, "draft")],
            )
            .add_edge("publish", END);
        graph
    };

    // draft never sets `verdict`, so the strict router yields no key.
    let broken = build(verdict).compile_with_checkpointer(saver.clone()).unwrap();
    let config = RunConfig::new("routing");
    let failure = broken.invoke(topic("t"), &config).await.unwrap_err();
    assert!(matches!(
        &failure.error,
        RunError::Routing(RoutingError::NoRouteKey { node }) if node == "draft"
    ));
    assert_eq!(failure.last_checkpoint, Some(1));
    assert_eq!(failure.state.get_str("draft"), Some("d"));

    let latest = saver.get_latest("routing").await.unwrap().unwrap();
    assert_eq!(latest.next, None);

    let fixed = build(|state| verdict(state).or(Some(Verdict::Pass)))
        .compile_with_checkpointer(saver.clone())
        .unwrap();
    let state = fixed.resume(&config).await.unwrap();
    assert_eq!(count(&state), 1);

    let history = saver.list("routing").await.unwrap();
    assert_eq!(history.last().map(|c| c.seq), Some(2));
    assert_eq!(history.last().and_then(|c| c.node.clone()).as_deref(), Some("publish"));
}

#[tokio::test]
async fn cancellation_lets_in_flight_step_finish() {
    let saver = Arc::new(MemorySaver::new());
    let token = CancellationToken::new();
    let mut graph = StateGraph::new(schema());
    let cancel = token.clone();
    graph
        .add_node(
            "first",
            node_fn(move |_state| {
                let cancel = cancel.clone();
                async move {
                    cancel.cancel();
                    Ok(PartialState::new().set("draft", "finished anyway"))
                }
            }),
        )
        .unwrap()
        .add_node(
            "second",
            node_fn(|_state| async { Ok(PartialState::new().set("verdict", "pass")) }),
        )
        .unwrap();
    graph
        .add_edge(START, "first")
        .add_edge("first", "second")
        .add_edge("second", END);
    let compiled = graph.compile_with_checkpointer(saver).unwrap();

    let config = RunConfig::new("cancel").with_cancellation(token);
    let failure = compiled.invoke(PartialState::new(), &config).await.unwrap_err();
    assert!(matches!(failure.error, RunError::Cancelled));
    assert_eq!(failure.node.as_deref(), Some("second"));
    assert_eq!(failure.last_checkpoint, Some(1));
    assert_eq!(failure.state.get_str("draft"), Some("finished anyway"));

    let state = compiled.resume(&RunConfig::new("cancel")).await.unwrap();
    assert_eq!(state.get_str("verdict"), Some("pass"));
}

#[tokio::test]
async fn invalid_update_fails_with_last_good_state() {
    let saver = Arc::new(MemorySaver::new());
    let mut graph = StateGraph::new(schema());
    graph
        .add_node(
            "bad",
            node_fn(|_state| async { Ok(PartialState::new().set("verdict", "maybe")) }),
        )
        .unwrap();
    graph.add_edge(START, "bad").add_edge("bad", END);
    let compiled = graph.compile_with_checkpointer(saver.clone()).unwrap();

    let failure = compiled
        .invoke(topic("t"), &RunConfig::new("bad"))
        .await
        .unwrap_err();
    assert_eq!(failure.error.kind(), "state_error");
    assert_eq!(failure.state.get_str("topic"), Some("t"));
    assert!(!failure.state.contains("verdict"));
    assert_eq!(saver.list("bad").await.unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_initial_state_is_rejected() {
    let compiled = review_loop(1).compile().unwrap();
    let failure = compiled
        .invoke(PartialState::new().set("unknown", "x"), &RunConfig::new("init"))
        .await
        .unwrap_err();
    assert_eq!(failure.error.kind(), "state_error");
    assert_eq!(failure.node, None);
    assert_eq!(failure.last_checkpoint, None);
}

#[tokio::test]
async fn reused_run_id_is_a_checkpoint_conflict() {
    let compiled = review_loop(1)
        .compile_with_checkpointer(Arc::new(MemorySaver::new()))
        .unwrap();
    let config = RunConfig::new("once");
    compiled.invoke(topic("t"), &config).await.unwrap();
    let failure = compiled.invoke(topic("t"), &config).await.unwrap_err();
    assert_eq!(failure.error.kind(), "checkpoint_error");
}

#[tokio::test]
async fn resume_unknown_run_has_no_checkpoint() {
    let compiled = review_loop(1)
        .compile_with_checkpointer(Arc::new(MemorySaver::new()))
        .unwrap();
    let failure = compiled.resume(&RunConfig::new("ghost")).await.unwrap_err();
    assert!(matches!(failure.error, RunError::NoCheckpoint(ref id) if id == "ghost"));
}

#[tokio::test]
async fn resume_of_finished_run_returns_final_state() {
    let compiled = review_loop(2)
        .compile_with_checkpointer(Arc::new(MemorySaver::new()))
        .unwrap();
    let config = RunConfig::new("done");
    let first = compiled.invoke(topic("t"), &config).await.unwrap();
    let again = compiled.resume(&config).await.unwrap();
    assert_eq!(first, again);
    let history = compiled.state_history("done").await.unwrap();
    assert_eq!(history.len(), 5);
}

#[tokio::test]
async fn step_drives_one_transition_at_a_time() {
    let compiled = review_loop(1)
        .compile_with_checkpointer(Arc::new(MemorySaver::new()))
        .unwrap();
    let config = RunConfig::new("manual");
    let status = compiled.start_run(topic("t"), &config).await;
    assert!(matches!(&status, RunStatus::Running { node, seq: 0, .. } if node == "writer"));

    let status = compiled.step(&config, status).await;
    assert!(matches!(&status, RunStatus::Running { node, seq: 1, .. } if node == "reviewer"));

    let status = compiled.step(&config, status).await;
    assert!(matches!(status, RunStatus::Terminated { seq: 2, .. }));
    assert!(status.is_terminal());

    let status = compiled.step(&config, status).await;
    assert!(matches!(status, RunStatus::Terminated { seq: 2, .. }));
}

#[tokio::test]
async fn concurrent_runs_keep_independent_histories() {
    let saver = Arc::new(MemorySaver::new());
    let compiled: Arc<CompiledStateGraph> =
        Arc::new(review_loop(3).compile_with_checkpointer(saver.clone()).unwrap());

    let mut handles = Vec::new();
    for i in 0..16 {
        let compiled = compiled.clone();
        handles.push(tokio::spawn(async move {
            let config = RunConfig::new(format!("run-{i}"));
            compiled.invoke(topic(&format!("topic {i}")), &config).await
        }));
    }
    for handle in handles {
        let state = handle.await.unwrap().unwrap();
        assert_eq!(count(&state), 3);
    }

    for i in 0..16 {
        let history = saver.list(&format!("run-{i}")).await.unwrap();
        let seqs: Vec<u64> = history.iter().map(|c| c.seq).collect();
        assert_eq!(seqs, (0..=6).collect::<Vec<_>>());
        let expected_topic = format!("topic {i}");
        assert!(history
            .iter()
            .all(|c| c.state.get_str("topic") == Some(expected_topic.as_str())));
    }
    assert_eq!(saver.run_ids().await.len(), 16);
}

#[tokio::test]
async fn compiled_conditional_edges_never_hit_unmapped_keys() {
    let mut graph = StateGraph::new(schema());
    graph
        .add_node("gate", node_fn(|_state| async { Ok(PartialState::new()) }))
        .unwrap()
        .add_node("retry", node_fn(|_state| async { Ok(PartialState::new()) }))
        .unwrap();
    graph
        .add_edge(START, "gate")
        .add_conditional_edges("gate", verdict, [(Verdict::Pass, END), (Verdict::Fail, "retry")])
        .add_edge("retry", END);
    let compiled = graph.compile().unwrap();

    let mut rng = StdRng::seed_from_u64(11);
    for i in 0..100 {
        let mut initial = PartialState::new();
        if rng.random_bool(0.8) {
            initial.insert("verdict", if rng.random_bool(0.5) { "pass" } else { "fail" });
        }
        if rng.random_bool(0.5) {
            initial.insert("count", rng.random_range(0..10u32));
        }
        let result = compiled.invoke(initial, &RunConfig::new(format!("r{i}"))).await;
        if let Err(failure) = result {
            assert!(
                matches!(failure.error, RunError::Routing(RoutingError::NoRouteKey { .. })),
                "unexpected failure: {failure}"
            );
        }
    }
}
