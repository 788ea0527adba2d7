//! CLI for peer-review: run (or resume) the review workflow against a SQLite
//! checkpoint database and print the final state as JSON.
//!
//! Config comes from `peer-review.toml` (or `--config`), `.env` / environment
//! variables, then the flags below.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use stepgraph::{JsonSerializer, RunConfig, SqliteSaver};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use peer_review::{
    compile_workflow, logging, state, ApprovalSource, Config, LlmClient, Manager, ManagerMode,
    OpenAiClient, PromptApproval, StaticApproval,
};

#[derive(Parser)]
#[command(name = "peer-review")]
#[command(about = "Write code with an LLM, review it, test it, and get it approved")]
struct Args {
    /// What to build, e.g. "reverse a string". Required unless --resume.
    topic: Option<String>,

    /// Path to a TOML config file. Default: ./peer-review.toml when present
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Run id (generated when starting a new run)
    #[arg(long)]
    run_id: Option<String>,

    /// Continue --run-id from its latest checkpoint
    #[arg(long, requires = "run_id")]
    resume: bool,

    /// Manager behaviour: passthrough or gate
    #[arg(long)]
    manager: Option<ManagerMode>,

    /// Gate mode: approve automatically instead of asking on the terminal
    #[arg(long)]
    approve: bool,

    /// Fail the run after this many steps
    #[arg(long)]
    max_steps: Option<u64>,

    /// SQLite checkpoint database
    #[arg(long)]
    db: Option<PathBuf>,

    /// Also append logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn manager_for(mode: ManagerMode, auto_approve: bool) -> Manager {
    match mode {
        ManagerMode::Passthrough => Manager::Passthrough,
        ManagerMode::Gate => {
            let source: Arc<dyn ApprovalSource> = if auto_approve {
                Arc::new(StaticApproval::approve())
            } else {
                Arc::new(PromptApproval::new())
            };
            Manager::Gate(source)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    logging::init_logging(args.log_file.as_deref())?;

    let mut cfg = Config::load_or_default(args.config.as_deref())?;
    cfg.apply_env();
    if let Some(mode) = args.manager {
        cfg.workflow.manager = mode;
    }
    if args.approve {
        cfg.workflow.auto_approve = true;
    }
    if let Some(max) = args.max_steps {
        cfg.workflow.max_steps = Some(max);
    }
    if let Some(db) = args.db {
        cfg.checkpoint.path = db;
    }

    let llm: Arc<dyn LlmClient> = Arc::new(OpenAiClient::new(cfg.llm_config()?)?);
    let saver = SqliteSaver::new(&cfg.checkpoint.path, Arc::new(JsonSerializer))
        .with_context(|| format!("open checkpoint db {}", cfg.checkpoint.path.display()))?;
    let manager = manager_for(cfg.workflow.manager, cfg.workflow.auto_approve);
    let graph = compile_workflow(llm, manager, Some(Arc::new(saver)))?;

    let cancel = CancellationToken::new();
    let mut run = match args.run_id {
        Some(id) => RunConfig::new(id),
        None => RunConfig::generated(),
    }
    .with_cancellation(cancel.clone());
    if let Some(max) = cfg.workflow.max_steps {
        run = run.with_max_steps(max);
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping after the current step");
            cancel.cancel();
        }
    });

    info!(run_id = %run.run_id, manager = %cfg.workflow.manager, db = %cfg.checkpoint.path.display(), "peer review");
    let result = if args.resume {
        graph.resume(&run).await
    } else {
        let Some(topic) = args.topic else {
            bail!("a TOPIC is required to start a run (or pass --resume --run-id ID)");
        };
        graph.invoke(state::initial(topic), &run).await
    };

    match result {
        Ok(final_state) => {
            println!("{}", serde_json::to_string_pretty(&final_state.to_json())?);
            Ok(())
        }
        Err(failure) => {
            eprintln!(
                "resume with: peer-review --resume --run-id {}",
                failure.run_id
            );
            Err(failure.into())
        }
    }
}
