use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use logsift_types::{AnalysisRecord, NewAnalysis, RunDelta, RunStats, RunStatus, StatsSummary};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

// NOTE: Storage Design Rationale
//
// Why two tables?
// - log_analysis is an append-only journal: one row per processed line,
//   written once and never touched again
// - run_stats is the only mutable surface, updated by primary key after
//   every line so an operator polling statistics is at most one line stale
//
// Why TEXT timestamps?
// - Fixed-width RFC 3339 (microsecond precision, Z suffix) makes SQL
//   string comparison equal to chronological comparison, which the
//   windowed average_time query relies on
//
// Why no deletes?
// - The journal is the audit trail; a failed run's partial records are as
//   interesting as a completed run's

/// File-backed store for analysis records and per-run statistics.
///
/// A single worker writes during a run, so access is serialized by the
/// caller; the store itself holds one connection.
pub struct ResultStore {
    conn: Connection,
}

impl ResultStore {
    /// Open (or create) the store at `db_path`.
    ///
    /// Schema initialization is idempotent. If the existing file is not a
    /// usable database, one rebuild is attempted: the file is discarded
    /// and recreated. A second failure is fatal.
    pub fn open(db_path: &Path) -> Result<Self> {
        match Self::open_and_init(db_path) {
            Ok(store) => Ok(store),
            Err(first) => {
                tracing::warn!(
                    path = %db_path.display(),
                    error = %first,
                    "store unusable, discarding and rebuilding"
                );
                if db_path.exists() {
                    std::fs::remove_file(db_path)?;
                }
                Self::open_and_init(db_path)
                    .map_err(|second| Error::Corrupt(second.to_string()))
            }
        }
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn open_and_init(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Persist one line's outcome. Returns the assigned record id.
    pub fn save_analysis(&self, analysis: &NewAnalysis) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO log_analysis
                 (agent_name, log_text, response, structured_answer, processing_time, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                analysis.agent_name,
                analysis.log_text,
                analysis.response,
                analysis.structured_answer,
                analysis.processing_time,
                now_ts(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Create a RunStats row for a new run: counters at zero, status
    /// running, `total_logs` fixed for the run's lifetime.
    pub fn create_run(&self, total_logs: u64) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO run_stats
                 (start_time, total_logs, processed_logs, successful_logs, failed_logs, status)
             VALUES (?1, ?2, 0, 0, 0, ?3)",
            params![now_ts(), total_logs as i64, RunStatus::Running.as_str()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Accumulate counter deltas onto a run, optionally moving its status.
    ///
    /// A terminal status additionally sets `end_time` and computes
    /// `average_time` from the analysis records inside the run's time
    /// window.
    pub fn update_run(
        &self,
        run_id: i64,
        delta: RunDelta,
        status: Option<RunStatus>,
    ) -> Result<()> {
        let row: Option<(String, i64, i64, i64)> = self
            .conn
            .query_row(
                "SELECT start_time, processed_logs, successful_logs, failed_logs
                 FROM run_stats WHERE id = ?1",
                params![run_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((start_time, processed, successful, failed)) = row else {
            return Err(Error::Query(format!("run {} not found", run_id)));
        };

        let processed = processed + delta.processed as i64;
        let successful = successful + delta.successful as i64;
        let failed = failed + delta.failed as i64;

        match status {
            Some(status) if status.is_terminal() => {
                let end_time = now_ts();
                let average_time: Option<f64> = self.conn.query_row(
                    "SELECT AVG(processing_time) FROM log_analysis
                     WHERE timestamp >= ?1 AND timestamp <= ?2",
                    params![start_time, end_time],
                    |row| row.get(0),
                )?;
                self.conn.execute(
                    "UPDATE run_stats
                     SET processed_logs = ?1, successful_logs = ?2, failed_logs = ?3,
                         end_time = ?4, average_time = ?5, status = ?6
                     WHERE id = ?7",
                    params![
                        processed,
                        successful,
                        failed,
                        end_time,
                        average_time,
                        status.as_str(),
                        run_id
                    ],
                )?;
            }
            Some(status) => {
                self.conn.execute(
                    "UPDATE run_stats
                     SET processed_logs = ?1, successful_logs = ?2, failed_logs = ?3,
                         status = ?4
                     WHERE id = ?5",
                    params![processed, successful, failed, status.as_str(), run_id],
                )?;
            }
            None => {
                self.conn.execute(
                    "UPDATE run_stats
                     SET processed_logs = ?1, successful_logs = ?2, failed_logs = ?3
                     WHERE id = ?4",
                    params![processed, successful, failed, run_id],
                )?;
            }
        }

        Ok(())
    }

    /// Point read of one run's statistics.
    pub fn run(&self, run_id: i64) -> Result<RunStats> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, start_time, end_time, total_logs, processed_logs,
                        successful_logs, failed_logs, average_time, status
                 FROM run_stats WHERE id = ?1",
                params![run_id],
                RawRun::from_row,
            )
            .optional()?;

        match raw {
            Some(raw) => raw.into_stats(),
            None => Err(Error::Query(format!("run {} not found", run_id))),
        }
    }

    /// Aggregate across all historical runs.
    pub fn summary(&self) -> Result<StatsSummary> {
        let (total_runs, total_logs, processed_logs, successful_logs, failed_logs, average_time): (
            i64,
            i64,
            i64,
            i64,
            i64,
            Option<f64>,
        ) = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(total_logs), 0),
                    COALESCE(SUM(processed_logs), 0),
                    COALESCE(SUM(successful_logs), 0),
                    COALESCE(SUM(failed_logs), 0),
                    AVG(average_time)
             FROM run_stats",
            [],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )?;

        Ok(StatsSummary {
            total_runs: total_runs as u64,
            total_logs: total_logs as u64,
            processed_logs: processed_logs as u64,
            successful_logs: successful_logs as u64,
            failed_logs: failed_logs as u64,
            average_time,
        })
    }

    /// The `limit` most recent analysis records, newest first, for
    /// operator inspection of what the agent actually returned.
    pub fn recent_analyses(&self, limit: usize) -> Result<Vec<AnalysisRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, agent_name, log_text, response, structured_answer,
                    processing_time, timestamp
             FROM log_analysis
             ORDER BY id DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, agent_name, log_text, response, structured_answer, processing_time, ts) =
                row?;
            records.push(AnalysisRecord {
                id,
                agent_name,
                log_text,
                response,
                structured_answer,
                processing_time,
                timestamp: parse_ts(&ts)?,
            });
        }
        Ok(records)
    }

    /// The `limit` most recent runs, newest first.
    pub fn recent_runs(&self, limit: usize) -> Result<Vec<RunStats>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, start_time, end_time, total_logs, processed_logs,
                    successful_logs, failed_logs, average_time, status
             FROM run_stats
             ORDER BY start_time DESC, id DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], RawRun::from_row)?;
        let mut runs = Vec::new();
        for raw in rows {
            runs.push(raw?.into_stats()?);
        }
        Ok(runs)
    }
}

/// Row holding still-textual timestamp/status fields.
struct RawRun {
    id: i64,
    start_time: String,
    end_time: Option<String>,
    total_logs: i64,
    processed_logs: i64,
    successful_logs: i64,
    failed_logs: i64,
    average_time: Option<f64>,
    status: String,
}

impl RawRun {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(RawRun {
            id: row.get(0)?,
            start_time: row.get(1)?,
            end_time: row.get(2)?,
            total_logs: row.get(3)?,
            processed_logs: row.get(4)?,
            successful_logs: row.get(5)?,
            failed_logs: row.get(6)?,
            average_time: row.get(7)?,
            status: row.get(8)?,
        })
    }

    fn into_stats(self) -> Result<RunStats> {
        let end_time = match self.end_time {
            Some(ts) => Some(parse_ts(&ts)?),
            None => None,
        };
        Ok(RunStats {
            id: self.id,
            start_time: parse_ts(&self.start_time)?,
            end_time,
            total_logs: self.total_logs as u64,
            processed_logs: self.processed_logs as u64,
            successful_logs: self.successful_logs as u64,
            failed_logs: self.failed_logs as u64,
            average_time: self.average_time,
            status: self
                .status
                .parse::<RunStatus>()
                .map_err(Error::Query)?,
        })
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log_analysis (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            agent_name TEXT NOT NULL,
            log_text TEXT NOT NULL,
            response TEXT NOT NULL,
            structured_answer TEXT,
            processing_time REAL NOT NULL,
            timestamp TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS run_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            start_time TEXT NOT NULL,
            end_time TEXT,
            total_logs INTEGER NOT NULL,
            processed_logs INTEGER NOT NULL,
            successful_logs INTEGER NOT NULL,
            failed_logs INTEGER NOT NULL,
            average_time REAL,
            status TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_analysis_ts ON log_analysis(timestamp);
        CREATE INDEX IF NOT EXISTS idx_runs_start ON run_stats(start_time DESC);
        "#,
    )?;
    Ok(())
}

/// Fixed-width RFC 3339 so lexicographic order matches chronological order.
fn now_ts() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(ts: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Query(format!("bad timestamp '{}': {}", ts, e)))
}
