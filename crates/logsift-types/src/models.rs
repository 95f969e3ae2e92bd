use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// NOTE: Schema Design Goals
//
// 1. Append-only outcomes: one AnalysisRecord per processed line, written
//    exactly once and never mutated, so the analysis table is a faithful
//    journal of what the agent returned (or failed to return).
//
// 2. Incremental run accounting: RunStats rows are updated after every
//    single line via monotone counter deltas. At any observation point
//    processed_logs == successful_logs + failed_logs and
//    processed_logs <= total_logs.
//
// 3. Terminal finalization: end_time and average_time are filled in only
//    when a run reaches Completed, Stopped or Error; until then they are
//    None and the run is live.

/// Lifecycle status of one processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Stopped,
    Error,
}

impl RunStatus {
    /// Stable string form used for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Stopped => "stopped",
            RunStatus::Error => "error",
        }
    }

    /// A terminal run is never updated again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "stopped" => Ok(RunStatus::Stopped),
            "error" => Ok(RunStatus::Error),
            other => Err(format!("unknown run status: {}", other)),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted outcome of processing exactly one log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub agent_name: String,
    pub log_text: String,
    /// Full accumulated response text, or an explicit error marker.
    pub response: String,
    /// Best-effort structured answer extracted from the response.
    /// Absence is a valid outcome, not an error.
    pub structured_answer: Option<String>,
    /// Wall-clock seconds from call start to stream completion.
    pub processing_time: f64,
    pub timestamp: DateTime<Utc>,
}

/// Insert form of [`AnalysisRecord`]; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub agent_name: String,
    pub log_text: String,
    pub response: String,
    pub structured_answer: Option<String>,
    pub processing_time: f64,
}

/// Aggregate counters and timing for one processing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_logs: u64,
    pub processed_logs: u64,
    pub successful_logs: u64,
    pub failed_logs: u64,
    /// Mean processing_time over this run's records; None until the run ends.
    pub average_time: Option<f64>,
    pub status: RunStatus,
}

impl RunStats {
    /// Elapsed time of the run, or None while it is still live.
    pub fn duration(&self) -> Option<Duration> {
        self.end_time.map(|end| end - self.start_time)
    }
}

/// Monotone counter increments applied to a run after each line.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunDelta {
    pub processed: u64,
    pub successful: u64,
    pub failed: u64,
}

impl RunDelta {
    /// One line processed with a usable response.
    pub fn success() -> Self {
        RunDelta {
            processed: 1,
            successful: 1,
            failed: 0,
        }
    }

    /// One line processed with an empty response or a gateway error.
    pub fn failure() -> Self {
        RunDelta {
            processed: 1,
            successful: 0,
            failed: 1,
        }
    }

    /// Status-only update, no counter movement.
    pub fn none() -> Self {
        RunDelta::default()
    }
}

/// Aggregate over all historical runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_runs: u64,
    pub total_logs: u64,
    pub processed_logs: u64,
    pub successful_logs: u64,
    pub failed_logs: u64,
    /// Mean of the per-run average times; None when no run has finished.
    pub average_time: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_persisted_form() {
        for status in [
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::Stopped,
            RunStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<RunStatus>(), Ok(status));
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("paused".parse::<RunStatus>().is_err());
    }

    #[test]
    fn only_running_is_non_terminal() {
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Stopped.is_terminal());
        assert!(RunStatus::Error.is_terminal());
    }

    #[test]
    fn deltas_preserve_the_counter_invariant() {
        for delta in [RunDelta::success(), RunDelta::failure(), RunDelta::none()] {
            assert_eq!(delta.processed, delta.successful + delta.failed);
        }
    }

    #[test]
    fn duration_requires_a_finished_run() {
        let start = Utc::now();
        let mut run = RunStats {
            id: 1,
            start_time: start,
            end_time: None,
            total_logs: 10,
            processed_logs: 0,
            successful_logs: 0,
            failed_logs: 0,
            average_time: None,
            status: RunStatus::Running,
        };
        assert!(run.duration().is_none());

        run.end_time = Some(start + Duration::seconds(42));
        run.status = RunStatus::Completed;
        assert_eq!(run.duration(), Some(Duration::seconds(42)));
    }
}
