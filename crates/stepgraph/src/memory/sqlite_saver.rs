//! SQLite-backed checkpointer (SqliteSaver). Durable across process restarts.
//!
//! One row per checkpoint, primary key `(run_id, seq)`. State is stored through a
//! `Serializer`; `next` is stored as JSON text.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::memory::checkpoint::{Checkpoint, CheckpointMetadata, CheckpointSource};
use crate::memory::checkpointer::{ensure_appends, CheckpointError, Checkpointer};
use crate::memory::serializer::Serializer;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str =
    "SELECT run_id, seq, node, state, next, route, source, created_at FROM checkpoints";

fn storage(e: impl std::fmt::Display) -> CheckpointError {
    CheckpointError::Storage(e.to_string())
}

fn open(db_path: &Path) -> Result<Connection, CheckpointError> {
    let conn = Connection::open(db_path).map_err(storage)?;
    conn.busy_timeout(BUSY_TIMEOUT).map_err(storage)?;
    Ok(conn)
}

fn to_sql_seq(seq: u64) -> Result<i64, CheckpointError> {
    i64::try_from(seq).map_err(|_| storage(format!("seq {seq} out of range")))
}

/// Row as stored, before the state is deserialized.
struct RawCheckpoint {
    run_id: String,
    seq: i64,
    node: Option<String>,
    state: Vec<u8>,
    next: Option<String>,
    route: Option<String>,
    source: String,
    created_at: String,
}

impl RawCheckpoint {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            run_id: row.get(0)?,
            seq: row.get(1)?,
            node: row.get(2)?,
            state: row.get(3)?,
            next: row.get(4)?,
            route: row.get(5)?,
            source: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn decode(self, serializer: &dyn Serializer) -> Result<Checkpoint, CheckpointError> {
        let source = CheckpointSource::parse(&self.source).ok_or_else(|| {
            CheckpointError::Serialization(format!("unknown checkpoint source {:?}", self.source))
        })?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?
            .with_timezone(&Utc);
        let next = self
            .next
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(Checkpoint {
            run_id: self.run_id,
            seq: u64::try_from(self.seq).map_err(storage)?,
            node: self.node,
            state: serializer.deserialize(&self.state)?,
            next,
            route: self.route,
            metadata: CheckpointMetadata { source, created_at },
        })
    }
}

/// SQLite-backed checkpointer for single-node deployments.
///
/// Each operation opens its own connection on a blocking thread, so concurrent runs
/// never share a connection; SQLite's locking (plus a busy timeout) serializes writes.
///
/// **Interaction**: Used as `Arc<dyn Checkpointer>` in `StateGraph::compile_with_checkpointer`.
pub struct SqliteSaver {
    db_path: PathBuf,
    serializer: Arc<dyn Serializer>,
}

impl SqliteSaver {
    /// Opens (or creates) the database at `path` and ensures the table exists.
    pub fn new(
        path: impl AsRef<Path>,
        serializer: Arc<dyn Serializer>,
    ) -> Result<Self, CheckpointError> {
        let db_path = path.as_ref().to_path_buf();
        let conn = open(&db_path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                run_id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                node TEXT,
                state BLOB NOT NULL,
                next TEXT,
                route TEXT,
                source TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (run_id, seq)
            );
            "#,
        )
        .map_err(storage)?;
        Ok(Self {
            db_path,
            serializer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    async fn query(
        &self,
        sql: String,
        run_id: &str,
    ) -> Result<Vec<Checkpoint>, CheckpointError> {
        let run_id = run_id.to_string();
        let db_path = self.db_path.clone();

        let rows = tokio::task::spawn_blocking(move || {
            let conn = open(&db_path)?;
            let mut stmt = conn.prepare(&sql).map_err(storage)?;
            let rows = stmt
                .query_map(params![run_id], RawCheckpoint::from_row)
                .map_err(storage)?;
            let rows: Vec<RawCheckpoint> = rows.collect::<Result<_, _>>().map_err(storage)?;
            Ok::<_, CheckpointError>(rows)
        })
        .await
        .map_err(storage)??;

        rows.into_iter()
            .map(|raw| raw.decode(self.serializer.as_ref()))
            .collect()
    }
}

#[async_trait]
impl Checkpointer for SqliteSaver {
    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let state = self.serializer.serialize(&checkpoint.state)?;
        let next = checkpoint
            .next
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let seq = to_sql_seq(checkpoint.seq)?;
        let run_id = checkpoint.run_id.clone();
        let raw_seq = checkpoint.seq;
        let node = checkpoint.node.clone();
        let route = checkpoint.route.clone();
        let source = checkpoint.metadata.source.as_str();
        let created_at = checkpoint.metadata.created_at.to_rfc3339();
        let db_path = self.db_path.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = open(&db_path)?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(storage)?;
            let latest: Option<i64> = tx
                .query_row(
                    "SELECT MAX(seq) FROM checkpoints WHERE run_id = ?1",
                    params![run_id],
                    |row| row.get(0),
                )
                .map_err(storage)?;
            let latest = latest.map(u64::try_from).transpose().map_err(storage)?;
            ensure_appends(&run_id, raw_seq, latest)?;
            tx.execute(
                "INSERT INTO checkpoints (run_id, seq, node, state, next, route, source, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![run_id, seq, node, state, next, route, source, created_at],
            )
            .map_err(storage)?;
            tx.commit().map_err(storage)
        })
        .await
        .map_err(storage)?
    }

    async fn get_latest(&self, run_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let run_id_owned = run_id.to_string();
        let db_path = self.db_path.clone();

        let raw = tokio::task::spawn_blocking(move || {
            let conn = open(&db_path)?;
            conn.query_row(
                &format!("{SELECT_COLUMNS} WHERE run_id = ?1 ORDER BY seq DESC LIMIT 1"),
                params![run_id_owned],
                RawCheckpoint::from_row,
            )
            .optional()
            .map_err(storage)
        })
        .await
        .map_err(storage)??;

        raw.map(|r| r.decode(self.serializer.as_ref())).transpose()
    }

    async fn list(&self, run_id: &str) -> Result<Vec<Checkpoint>, CheckpointError> {
        self.query(
            format!("{SELECT_COLUMNS} WHERE run_id = ?1 ORDER BY seq ASC"),
            run_id,
        )
        .await
    }
}
