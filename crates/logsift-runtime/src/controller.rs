use crate::config::PipelineConfig;
use crate::control::RunSignal;
use crate::error::{Error, Result};
use crate::prompt::PromptTemplate;
use crate::source::load_lines;
use crate::worker::Worker;
use logsift_gateway::{AgentGateway, AgentHandle};
use logsift_store::ResultStore;
use logsift_types::{AnalysisRecord, RunDelta, RunStats, RunStatus, StatsSummary};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Observable state of the controller, a pure read of the current flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotRunning,
    Running,
    Paused,
}

/// Aggregate statistics view for the operator console.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub summary: StatsSummary,
    /// Most recent runs, newest first.
    pub recent: Vec<RunStats>,
}

struct ActiveRun {
    run_id: i64,
    signal: RunSignal,
    handle: JoinHandle<()>,
}

/// Lifecycle wrapper around the processing worker.
///
/// Control calls return immediately; the worker runs on its own thread
/// and is the only writer to the store during its lifetime. The
/// controller writes only the final `stopped` transition, after
/// requesting worker exit. At most one run is active at a time.
pub struct RunController {
    config: PipelineConfig,
    gateway: Arc<dyn AgentGateway>,
    store: Arc<Mutex<ResultStore>>,
    active: Option<ActiveRun>,
}

impl RunController {
    /// Configuration is explicit and fixed at construction. Opens (or
    /// creates) the result store at the configured path.
    pub fn new(config: PipelineConfig, gateway: Arc<dyn AgentGateway>) -> Result<Self> {
        let store = ResultStore::open(&config.db_path)?;
        Ok(RunController {
            config,
            gateway,
            store: Arc::new(Mutex::new(store)),
            active: None,
        })
    }

    /// Start processing the configured source file against `agent`.
    ///
    /// Fails if a run is already active, the session cannot be opened, or
    /// the source file yields zero usable lines; no run row is created in
    /// any failure case. On success the worker is launched and the new
    /// run id returned immediately.
    pub fn start(&mut self, agent: &AgentHandle, template: PromptTemplate) -> Result<i64> {
        self.reap();
        if self.active.is_some() {
            return Err(Error::InvalidOperation(
                "a run is already active".to_string(),
            ));
        }

        let session = self
            .gateway
            .open_session(agent)
            .map_err(|e| Error::Gateway(e.to_string()))?;
        tracing::info!(
            agent = %agent.title,
            session_id = session.session_id(),
            "session opened for log processing"
        );

        let lines = load_lines(&self.config.log_file)?;
        if lines.is_empty() {
            return Err(Error::Config(format!(
                "no usable lines in {}",
                self.config.log_file.display()
            )));
        }

        let total = lines.len();
        let run_id = self.store().create_run(total as u64)?;

        let signal = RunSignal::new();
        let worker = Worker {
            run_id,
            queue: VecDeque::from(lines),
            session,
            template,
            store: self.store.clone(),
            signal: signal.clone(),
            line_delay: self.config.line_delay(),
            pause_poll: self.config.pause_poll(),
        };

        let handle = match worker.spawn() {
            Ok(handle) => handle,
            Err(err) => {
                // The run row exists but no worker will ever touch it.
                if let Err(store_err) =
                    self.store()
                        .update_run(run_id, RunDelta::none(), Some(RunStatus::Error))
                {
                    tracing::error!(run_id, error = %store_err, "failed to mark unstartable run");
                }
                return Err(Error::Io(err));
            }
        };

        tracing::info!(run_id, total, "run started");
        self.active = Some(ActiveRun {
            run_id,
            signal,
            handle,
        });
        Ok(run_id)
    }

    /// Request cooperative shutdown and wait up to the configured grace
    /// period for the worker to exit.
    ///
    /// Accepted race: past the grace period the worker may still be
    /// mid-line; the run is marked stopped regardless, and a late worker
    /// write can still land afterwards. A worker that already reached a
    /// terminal status (completed or error) is not regressed to stopped.
    pub fn stop(&mut self) -> Result<()> {
        let Some(active) = self.active.take() else {
            return Err(Error::InvalidOperation("no active run".to_string()));
        };

        active.signal.request_stop();
        tracing::info!(run_id = active.run_id, "stop requested");

        let deadline = Instant::now() + self.config.stop_grace();
        while !active.handle.is_finished() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }

        if active.handle.is_finished() {
            let _ = active.handle.join();
        } else {
            tracing::warn!(
                run_id = active.run_id,
                "worker did not exit within the grace period"
            );
        }

        let current = self.store().run(active.run_id)?;
        if !current.status.is_terminal() {
            self.store()
                .update_run(active.run_id, RunDelta::none(), Some(RunStatus::Stopped))?;
        }
        Ok(())
    }

    /// Pause the worker: no gateway calls, no queue drains, flags polled
    /// at the configured interval. Fails if nothing is running or the run
    /// is already paused.
    pub fn pause(&mut self) -> Result<()> {
        let active = self.require_active()?;
        if !active.signal.pause() {
            return Err(Error::InvalidOperation("run is already paused".to_string()));
        }
        tracing::info!(run_id = active.run_id, "run paused");
        Ok(())
    }

    /// Fails if nothing is running or the run is not paused.
    pub fn resume(&mut self) -> Result<()> {
        let active = self.require_active()?;
        if !active.signal.resume() {
            return Err(Error::InvalidOperation("run is not paused".to_string()));
        }
        tracing::info!(run_id = active.run_id, "run resumed");
        Ok(())
    }

    pub fn status(&self) -> RunState {
        match &self.active {
            Some(active) if !active.handle.is_finished() => {
                if active.signal.is_paused() {
                    RunState::Paused
                } else {
                    RunState::Running
                }
            }
            _ => RunState::NotRunning,
        }
    }

    /// Aggregate over all historical runs plus the most recent ones.
    /// Callable at any time, including while a run is in flight.
    pub fn statistics(&self) -> Result<PipelineStats> {
        let store = self.store();
        Ok(PipelineStats {
            summary: store.summary()?,
            recent: store.recent_runs(self.config.recent_limit)?,
        })
    }

    /// Point read of one run's statistics.
    pub fn run_stats(&self, run_id: i64) -> Result<RunStats> {
        Ok(self.store().run(run_id)?)
    }

    /// The most recent analysis records, newest first.
    pub fn recent_analyses(&self, limit: usize) -> Result<Vec<AnalysisRecord>> {
        Ok(self.store().recent_analyses(limit)?)
    }

    /// Agents the operator can pick from.
    pub fn agents(&self) -> Result<Vec<AgentHandle>> {
        self.gateway
            .list_agents()
            .map_err(|e| Error::Gateway(e.to_string()))
    }

    fn require_active(&mut self) -> Result<&ActiveRun> {
        self.reap();
        match &self.active {
            Some(active) => Ok(active),
            None => Err(Error::InvalidOperation("no active run".to_string())),
        }
    }

    /// Clear a worker that finished on its own so a new run can start.
    fn reap(&mut self) {
        if self
            .active
            .as_ref()
            .is_some_and(|active| active.handle.is_finished())
            && let Some(active) = self.active.take()
        {
            let _ = active.handle.join();
        }
    }

    fn store(&self) -> MutexGuard<'_, ResultStore> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logsift_gateway::ScriptedGateway;
    use std::fs;
    use tempfile::TempDir;

    fn controller_in(dir: &TempDir) -> RunController {
        let config = PipelineConfig {
            log_file: dir.path().join("logs.txt"),
            db_path: dir.path().join("results.db"),
            line_delay_ms: 0,
            pause_poll_ms: 10,
            stop_grace_ms: 500,
            recent_limit: 5,
        };
        RunController::new(config, Arc::new(ScriptedGateway::new())).unwrap()
    }

    #[test]
    fn control_operations_require_an_active_run() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller_in(&dir);

        assert!(matches!(controller.stop(), Err(Error::InvalidOperation(_))));
        assert!(matches!(controller.pause(), Err(Error::InvalidOperation(_))));
        assert!(matches!(controller.resume(), Err(Error::InvalidOperation(_))));
        assert_eq!(controller.status(), RunState::NotRunning);
    }

    #[test]
    fn start_rejects_an_empty_source_file() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller_in(&dir);
        fs::write(dir.path().join("logs.txt"), "\n   \n\t\n").unwrap();

        let agent = AgentHandle {
            id: "scripted-1".to_string(),
            title: "Scripted Analyzer".to_string(),
        };
        assert!(matches!(
            controller.start(&agent, PromptTemplate::Raw),
            Err(Error::Config(_))
        ));

        // No run row may be created on a failed start.
        let stats = controller.statistics().unwrap();
        assert_eq!(stats.summary.total_runs, 0);
    }

    #[test]
    fn start_rejects_a_missing_source_file() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller_in(&dir);

        let agent = AgentHandle {
            id: "scripted-1".to_string(),
            title: "Scripted Analyzer".to_string(),
        };
        assert!(controller.start(&agent, PromptTemplate::Raw).is_err());
        assert_eq!(controller.statistics().unwrap().summary.total_runs, 0);
    }

    #[test]
    fn start_rejects_an_unknown_agent() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller_in(&dir);
        fs::write(dir.path().join("logs.txt"), "ERROR a\n").unwrap();

        let stranger = AgentHandle {
            id: "nobody".to_string(),
            title: "Nobody".to_string(),
        };
        assert!(matches!(
            controller.start(&stranger, PromptTemplate::Raw),
            Err(Error::Gateway(_))
        ));
        assert_eq!(controller.statistics().unwrap().summary.total_runs, 0);
    }
}
