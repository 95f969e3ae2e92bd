pub mod config;
pub mod control;
pub mod controller;
pub mod error;
pub mod extract;
pub mod prompt;
pub mod source;
mod worker;

pub use config::PipelineConfig;
pub use control::RunSignal;
pub use controller::{PipelineStats, RunController, RunState};
pub use error::{Error, Result};
pub use extract::extract_structured_answer;
pub use prompt::PromptTemplate;
pub use source::load_lines;
pub use worker::{EMPTY_RESPONSE_MARKER, ERROR_MARKER_PREFIX};
