mod models;

pub use models::{
    AnalysisRecord, NewAnalysis, RunDelta, RunStats, RunStatus, StatsSummary,
};
