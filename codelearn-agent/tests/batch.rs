mod common;

use codelearn_agent::{BatchEvent, BatchRunner, FailurePolicy};
use codelearn_core::ErrorKind;
use common::*;

fn paths(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

const FILES: &[(&str, &str)] = &[
    ("a.py", "print('a')\n"),
    ("b.js", "console.log('b')\n"),
    ("c.go", "package c\n"),
];

#[tokio::test]
async fn test_batch_runs_in_order_with_summary() {
    let log = CallLog::default();
    let runner = BatchRunner::new(orchestrator(&log, FILES));

    let events: Vec<BatchEvent> = collect(runner.analyze_many(paths(&["a.py", "b.js", "c.go"]), "Onboarding"))
        .await
        .into_iter()
        .map(|e| e.unwrap())
        .collect();

    assert!(events.len() >= 4);
    assert_eq!(log.with_prefix("read:"), vec!["read:a.py", "read:b.js", "read:c.go"]);

    let processing: Vec<(usize, usize, String)> = events
        .iter()
        .filter_map(|e| match e {
            BatchEvent::Processing { index, total, path } => Some((*index, *total, path.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(
        processing,
        vec![
            (1, 3, "a.py".to_string()),
            (2, 3, "b.js".to_string()),
            (3, 3, "c.go".to_string())
        ]
    );
    assert_eq!(events[0].to_string(), "Processing file 1/3: a.py");

    match events.last().unwrap() {
        BatchEvent::Finished(summary) => {
            assert_eq!(summary.total, 3);
            assert_eq!(summary.succeeded, 3);
            assert_eq!(summary.failed, 0);
            assert_eq!(summary.locations, vec!["memory://1", "memory://2", "memory://3"]);
        }
        other => panic!("expected summary, got {:?}", other),
    }
    assert_eq!(events.last().unwrap().to_string(), "Completed analysis of 3 files");
    assert_eq!(runner.orchestrator().sink().len(), 3);

    for (_, input) in runner.orchestrator().generator().inputs() {
        assert!(input.contains("Task context: Onboarding"));
    }
}

#[tokio::test]
async fn test_progress_is_attributed_to_its_file() {
    let log = CallLog::default();
    let runner = BatchRunner::new(orchestrator(&log, FILES));

    let events = collect(runner.analyze_many(paths(&["a.py", "b.js"]), "")).await;

    let mut current = String::new();
    for event in events {
        match event.unwrap() {
            BatchEvent::Processing { path, .. } => current = path,
            BatchEvent::Progress { path, .. } | BatchEvent::Completed { path, .. } => {
                assert_eq!(path, current)
            }
            _ => {}
        }
    }
}

#[tokio::test]
async fn test_empty_batch_only_reports_summary() {
    let log = CallLog::default();
    let runner = BatchRunner::new(orchestrator(&log, FILES));

    let events = collect(runner.analyze_many(Vec::new(), "")).await;
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], Ok(BatchEvent::Finished(ref s)) if s.total == 0));
    assert!(log.entries().is_empty());
}

#[tokio::test]
async fn test_abort_policy_stops_at_first_failure() {
    let log = CallLog::default();
    let runner = BatchRunner::new(orchestrator(&log, FILES));
    assert_eq!(runner.policy(), FailurePolicy::Abort);

    let events = collect(runner.analyze_many(paths(&["a.py", "missing.rb", "c.go"]), "")).await;

    let err = events.last().unwrap().as_ref().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileNotFound);
    assert_eq!(err.context_value("batch_path"), Some("missing.rb"));

    assert_eq!(log.with_prefix("read:"), vec!["read:a.py", "read:missing.rb"]);
    assert!(!events.iter().any(|e| matches!(e, Ok(BatchEvent::Finished(_)))));
    assert_eq!(runner.orchestrator().sink().len(), 1);
}

#[tokio::test]
async fn test_continue_policy_isolates_failures() {
    let log = CallLog::default();
    let runner = BatchRunner::new(orchestrator(&log, FILES)).with_policy(FailurePolicy::Continue);

    let events: Vec<BatchEvent> = collect(runner.analyze_many(paths(&["a.py", "missing.rb", "c.go"]), ""))
        .await
        .into_iter()
        .map(|e| e.unwrap())
        .collect();

    assert_eq!(log.with_prefix("read:"), vec!["read:a.py", "read:missing.rb", "read:c.go"]);

    let failed: Vec<&BatchEvent> = events
        .iter()
        .filter(|e| matches!(e, BatchEvent::Failed { .. }))
        .collect();
    assert_eq!(failed.len(), 1);
    match failed[0] {
        BatchEvent::Failed { path, error } => {
            assert_eq!(path, "missing.rb");
            assert_eq!(error.kind(), ErrorKind::FileNotFound);
        }
        _ => unreachable!(),
    }

    match events.last().unwrap() {
        BatchEvent::Finished(summary) => {
            assert_eq!(summary.succeeded, 2);
            assert_eq!(summary.failed, 1);
        }
        other => panic!("expected summary, got {:?}", other),
    }
    assert_eq!(
        events.last().unwrap().to_string(),
        "Completed analysis of 3 files (1 failed)"
    );
}

#[test]
fn test_summary_serializes() {
    let summary = codelearn_agent::BatchSummary {
        total: 2,
        succeeded: 1,
        failed: 1,
        locations: vec!["learning_docs/x.md".into()],
    };
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["failed"], 1);
    assert_eq!(json["locations"][0], "learning_docs/x.md");
}
