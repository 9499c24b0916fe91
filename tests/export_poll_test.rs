// ABOUTME: Unit-level tests for the export job polling state machine
// ABOUTME: Drives poll_until_terminal with scripted status sequences and a zero delay
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Power BI Chat Bridge Contributors
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use powerbi_chat_bridge::{
    config::ExportPollConfig,
    errors::{BiError, BiResult},
    powerbi::{export::poll_until_terminal, ExportJob, ExportStatus},
};
use serde_json::{json, Value};
use url::Url;

fn new_job() -> ExportJob {
    ExportJob {
        id: None,
        status: ExportStatus::Running,
        status_location: Url::parse("https://example.test/exports/job-1").unwrap(),
        resource_location: None,
    }
}

const fn policy(max_attempts: u32) -> ExportPollConfig {
    ExportPollConfig {
        max_attempts,
        interval: Duration::ZERO,
    }
}

/// Run the poll loop over scripted statuses; returns the result and fetch count
async fn run_scripted(
    statuses: Vec<Value>,
    max_attempts: u32,
) -> (BiResult<Option<String>>, usize, ExportJob) {
    let queue = Arc::new(Mutex::new(VecDeque::from(statuses)));
    let fetches = Arc::new(Mutex::new(0_usize));
    let mut job = new_job();

    let result = poll_until_terminal(&mut job, &policy(max_attempts), || {
        let queue = Arc::clone(&queue);
        let fetches = Arc::clone(&fetches);
        async move {
            *fetches.lock().unwrap() += 1;
            let mut queue = queue.lock().unwrap();
            let next = if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap()
            };
            Ok::<_, BiError>(next)
        }
    })
    .await;

    let count = *fetches.lock().unwrap();
    (result, count, job)
}

#[tokio::test]
async fn test_succeeds_after_running_statuses() {
    let (result, fetches, job) = run_scripted(
        vec![
            json!({"id": "job-1", "status": "NotStarted"}),
            json!({"id": "job-1", "status": "Running"}),
            json!({"id": "job-1", "status": "Succeeded", "resourceLocation": "https://example.test/files/job-1"}),
        ],
        10,
    )
    .await;

    assert_eq!(
        result.unwrap().as_deref(),
        Some("https://example.test/files/job-1")
    );
    assert_eq!(fetches, 3);
    assert_eq!(job.status, ExportStatus::Succeeded);
    assert_eq!(job.id.as_deref(), Some("job-1"));
}

#[tokio::test]
async fn test_failed_status_stops_immediately() {
    let (result, fetches, _) = run_scripted(
        vec![json!({"status": "Failed", "error": {"code": "ExportFailed"}})],
        10,
    )
    .await;

    match result {
        Err(BiError::ExportFailure { payload }) => {
            assert_eq!(payload["error"]["code"], "ExportFailed");
        }
        other => panic!("expected export failure, got {other:?}"),
    }
    assert_eq!(fetches, 1);
}

#[tokio::test]
async fn test_cancelled_status_is_a_failure() {
    let (result, fetches, _) = run_scripted(
        vec![
            json!({"status": "Running"}),
            json!({"status": "Canceled"}),
        ],
        10,
    )
    .await;

    assert!(matches!(result, Err(BiError::ExportFailure { .. })));
    assert_eq!(fetches, 2);
}

#[tokio::test]
async fn test_exhausted_budget_is_a_soft_failure() {
    let (result, fetches, job) = run_scripted(vec![json!({"status": "Running"})], 4).await;

    assert!(result.unwrap().is_none());
    assert_eq!(fetches, 4);
    assert_eq!(job.status, ExportStatus::Running);
}

#[tokio::test]
async fn test_unknown_status_keeps_polling() {
    let (result, fetches, _) = run_scripted(
        vec![
            json!({"status": "Queued"}),
            json!({}),
            json!({"status": "Succeeded", "resourceLocation": "/files/job-1"}),
        ],
        5,
    )
    .await;

    assert_eq!(result.unwrap().as_deref(), Some("/files/job-1"));
    assert_eq!(fetches, 3);
}

#[tokio::test]
async fn test_success_without_location_yields_nothing() {
    let (result, fetches, _) = run_scripted(
        vec![json!({"status": "Succeeded", "resourceLocation": ""})],
        10,
    )
    .await;

    assert!(result.unwrap().is_none());
    assert_eq!(fetches, 1);
}

#[tokio::test]
async fn test_zero_budget_never_fetches() {
    let (result, fetches, _) = run_scripted(vec![json!({"status": "Succeeded"})], 0).await;

    assert!(result.unwrap().is_none());
    assert_eq!(fetches, 0);
}

#[tokio::test]
async fn test_fetch_error_propagates() {
    let mut job = new_job();
    let result = poll_until_terminal(&mut job, &policy(3), || async {
        Err::<Value, _>(BiError::SnapshotFailure("status endpoint unreachable".to_owned()))
    })
    .await;

    assert!(result.is_err());
}

#[test]
fn test_status_parsing_is_case_insensitive() {
    assert_eq!(ExportStatus::parse("SUCCEEDED"), ExportStatus::Succeeded);
    assert_eq!(ExportStatus::parse("running"), ExportStatus::Running);
    assert_eq!(ExportStatus::parse("NotStarted"), ExportStatus::Running);
    assert_eq!(ExportStatus::parse("Failed"), ExportStatus::Failed);
    assert_eq!(ExportStatus::parse("Cancelled"), ExportStatus::Cancelled);
    assert_eq!(ExportStatus::parse("canceled"), ExportStatus::Cancelled);
    assert_eq!(ExportStatus::parse("paused"), ExportStatus::Unknown);
}

#[test]
fn test_terminal_statuses() {
    assert!(ExportStatus::Succeeded.is_terminal());
    assert!(ExportStatus::Failed.is_terminal());
    assert!(ExportStatus::Cancelled.is_terminal());
    assert!(!ExportStatus::Running.is_terminal());
    assert!(!ExportStatus::Unknown.is_terminal());
}
