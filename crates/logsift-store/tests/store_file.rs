//! Integration tests for the file-backed store lifecycle.
//!
//! These cover what the in-memory unit tests cannot: idempotent re-open
//! of an existing file and the discard-and-rebuild path for a corrupt
//! store file.

use logsift_store::ResultStore;
use logsift_types::{NewAnalysis, RunDelta, RunStatus};
use std::fs;
use tempfile::TempDir;

#[test]
fn reopening_an_existing_store_keeps_its_data() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("results.db");

    let run_id = {
        let store = ResultStore::open(&db_path).unwrap();
        let run_id = store.create_run(4).unwrap();
        store.update_run(run_id, RunDelta::success(), None).unwrap();
        run_id
    };

    // Second open must be a no-op init, not a re-create.
    let store = ResultStore::open(&db_path).unwrap();
    let run = store.run(run_id).unwrap();
    assert_eq!(run.total_logs, 4);
    assert_eq!(run.processed_logs, 1);
    assert_eq!(run.status, RunStatus::Running);
}

#[test]
fn corrupt_store_file_is_rebuilt_once() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("results.db");

    fs::write(&db_path, b"this is not a sqlite database").unwrap();

    let store = ResultStore::open(&db_path).unwrap();
    let run_id = store.create_run(1).unwrap();
    store
        .save_analysis(&NewAnalysis {
            agent_name: "agent".to_string(),
            log_text: "INFO started".to_string(),
            response: "looks fine".to_string(),
            structured_answer: None,
            processing_time: 0.2,
        })
        .unwrap();
    store
        .update_run(run_id, RunDelta::success(), Some(RunStatus::Completed))
        .unwrap();

    let run = store.run(run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.average_time.is_some());
}

#[test]
fn unusable_path_surfaces_a_fatal_error() {
    let dir = TempDir::new().unwrap();
    // A directory can be neither opened as a database nor deleted by the
    // rebuild, so both attempts fail.
    assert!(ResultStore::open(dir.path()).is_err());
}
