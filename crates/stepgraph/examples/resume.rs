//! Checkpoint and resume example: a two-node loop that fails once, then resumes.
//!
//! Run: `cargo run -p stepgraph --example resume`
//! Shows the checkpoint history left by the failed run and the resumed final state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use stepgraph::{
    node_fn, MemorySaver, PartialState, RouteKey, RunConfig, State, StateGraph, StateSchema,
    StepError, END, START,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Check {
    Ok,
    Retry,
}

impl RouteKey for Check {
    fn variants() -> &'static [Self] {
        &[Check::Ok, Check::Retry]
    }

    fn as_str(&self) -> &'static str {
        match self {
            Check::Ok => "ok",
            Check::Retry => "retry",
        }
    }
}

fn check(state: &State) -> Option<Check> {
    match state.get_str("status")? {
        "ok" => Some(Check::Ok),
        _ => Some(Check::Retry),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let schema = StateSchema::builder()
        .text("text")
        .enumeration("status", ["ok", "retry"])
        .build();

    let outage = Arc::new(AtomicBool::new(true));
    let flag = outage.clone();

    let mut graph = StateGraph::new(schema);
    graph
        .add_node(
            "shout",
            node_fn(|state: State| async move {
                let text = state.get_str("text").unwrap_or_default().to_uppercase();
                Ok(PartialState::new().set("text", text))
            }),
        )?
        .add_node(
            "check",
            node_fn(move |state: State| {
                let flag = flag.clone();
                async move {
                    if flag.swap(false, Ordering::SeqCst) {
                        return Err(StepError::failed("checker offline"));
                    }
                    let loud = state.get_str("text").is_some_and(|t| t.ends_with('!'));
                    Ok(PartialState::new().set("status", if loud { "ok" } else { "retry" }))
                }
            }),
        )?;
    graph
        .add_edge(START, "shout")
        .add_edge("shout", "check")
        .add_conditional_edges("check", check, [(Check::Ok, END), (Check::Retry, END)]);

    let saver = Arc::new(MemorySaver::new());
    let compiled = graph.compile_with_checkpointer(saver)?;
    let config = RunConfig::generated();

    match compiled
        .invoke(PartialState::new().set("text", "hello!"), &config)
        .await
    {
        Ok(_) => println!("unexpected: first run succeeded"),
        Err(failure) => println!("first run: {failure}"),
    }

    for cp in compiled.state_history(&config.run_id).await? {
        println!(
            "  seq={} node={:?} next={:?} state={}",
            cp.seq,
            cp.node,
            cp.next,
            cp.state.to_json()
        );
    }

    let state = compiled.resume(&config).await?;
    println!("resumed: {}", state.to_json());
    Ok(())
}
