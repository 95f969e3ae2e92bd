use crate::control::RunSignal;
use crate::extract::extract_structured_answer;
use crate::prompt::PromptTemplate;
use logsift_gateway::AgentSession;
use logsift_store::ResultStore;
use logsift_types::{NewAnalysis, RunDelta, RunStatus};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Response field value persisted when the gateway stream closed without
/// ever yielding content.
pub const EMPTY_RESPONSE_MARKER: &str = "ERROR: empty response from agent";

/// Prefix of the response field persisted when the gateway call failed;
/// the failure description follows.
pub const ERROR_MARKER_PREFIX: &str = "ERROR: ";

pub(crate) struct Worker {
    pub run_id: i64,
    pub queue: VecDeque<String>,
    pub session: Box<dyn AgentSession>,
    pub template: PromptTemplate,
    pub store: Arc<Mutex<ResultStore>>,
    pub signal: RunSignal,
    pub line_delay: Duration,
    pub pause_poll: Duration,
}

enum DrainOutcome {
    /// Queue exhausted; the worker finalizes the run as completed.
    Drained,
    /// Stop observed mid-loop; the controller finalizes the run.
    Interrupted,
}

enum LineOutcome {
    Success,
    Failure,
}

impl Worker {
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("logsift-worker".to_string())
            .spawn(move || self.run())
    }

    fn run(mut self) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.drain()));

        match result {
            Ok(DrainOutcome::Drained) => {
                tracing::info!(run_id = self.run_id, "run complete");
                self.finalize(RunStatus::Completed);
            }
            Ok(DrainOutcome::Interrupted) => {
                tracing::info!(
                    run_id = self.run_id,
                    "stop observed, leaving finalization to the controller"
                );
            }
            Err(panic_err) => {
                let panic_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "worker panicked with unknown error".to_string()
                };
                tracing::error!(run_id = self.run_id, panic = %panic_msg, "worker loop failed");
                self.finalize(RunStatus::Error);
            }
        }
    }

    /// The processing loop: repeats until the queue is empty or stop is
    /// requested. Flags are polled once per iteration and once per
    /// pause-sleep tick; stop wins over pause.
    fn drain(&mut self) -> DrainOutcome {
        let total = self.queue.len();

        loop {
            if self.signal.stop_requested() {
                return DrainOutcome::Interrupted;
            }
            if self.signal.is_paused() {
                std::thread::sleep(self.pause_poll);
                continue;
            }

            let Some(line) = self.queue.pop_front() else {
                return DrainOutcome::Drained;
            };
            let position = total - self.queue.len();
            tracing::debug!(run_id = self.run_id, position, total, "processing line");

            let delta = match self.process_line(&line) {
                LineOutcome::Success => RunDelta::success(),
                LineOutcome::Failure => RunDelta::failure(),
            };

            // Per-line update, never batched: operator polling is at most
            // one line stale.
            if let Err(err) = self.store().update_run(self.run_id, delta, None) {
                tracing::error!(run_id = self.run_id, error = %err, "failed to update run stats");
            }

            std::thread::sleep(self.line_delay);
        }
    }

    /// One line end to end. Gateway failures are recovered here at line
    /// granularity; every classification produces a persisted record.
    fn process_line(&mut self, line: &str) -> LineOutcome {
        let prompt = self.template.render(line);
        let started = Instant::now();

        match self.collect_response(&prompt) {
            Ok(response) if !response.is_empty() => {
                let processing_time = started.elapsed().as_secs_f64();
                let structured_answer = extract_structured_answer(&response);
                if structured_answer.is_none() {
                    tracing::debug!(run_id = self.run_id, "no structured answer in response");
                }
                self.persist(line, response, structured_answer, processing_time);
                LineOutcome::Success
            }
            Ok(_) => {
                let processing_time = started.elapsed().as_secs_f64();
                tracing::warn!(run_id = self.run_id, line, "empty response from agent");
                self.persist(line, EMPTY_RESPONSE_MARKER.to_string(), None, processing_time);
                LineOutcome::Failure
            }
            Err(err) => {
                tracing::warn!(run_id = self.run_id, line, error = %err, "gateway call failed");
                self.persist(line, format!("{}{}", ERROR_MARKER_PREFIX, err), None, 0.0);
                LineOutcome::Failure
            }
        }
    }

    /// Drive the streamed response to completion. Chunks carry cumulative
    /// snapshots, so the last one holds the final text.
    fn collect_response(&mut self, prompt: &str) -> anyhow::Result<String> {
        let stream = self.session.ask(prompt)?;
        let mut content = String::new();
        for chunk in stream {
            content = chunk?.content;
        }
        Ok(content)
    }

    /// Store write failures are logged and skipped: the run continues but
    /// that line's result may be lost. Known gap, not retried.
    fn persist(
        &self,
        log_text: &str,
        response: String,
        structured_answer: Option<String>,
        processing_time: f64,
    ) {
        let record = NewAnalysis {
            agent_name: self.session.agent().title.clone(),
            log_text: log_text.to_string(),
            response,
            structured_answer,
            processing_time,
        };
        match self.store().save_analysis(&record) {
            Ok(record_id) => {
                tracing::debug!(run_id = self.run_id, record_id, "analysis record saved");
            }
            Err(err) => {
                tracing::error!(run_id = self.run_id, error = %err, "failed to persist analysis record");
            }
        }
    }

    fn finalize(&self, status: RunStatus) {
        if let Err(err) = self
            .store()
            .update_run(self.run_id, RunDelta::none(), Some(status))
        {
            tracing::error!(run_id = self.run_id, error = %err, "failed to finalize run");
        }
    }

    fn store(&self) -> MutexGuard<'_, ResultStore> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
