//! Cycle registration and spec claiming.

use cycle_report_lib::error::AppError;
use cycle_report_lib::models::{
    CycleEnvironment, CycleState, SpecFile, SpecState, StartCycleRequest,
};
use cycle_report_lib::services::{self, ExecutionStore};

use super::memory_store::MemoryStore;
use super::test_helpers::*;

#[actix_rt::test]
async fn test_start_cycle_queues_specs_in_weight_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let request = StartCycleRequest {
        repo: REPO.to_string(),
        branch: BRANCH.to_string(),
        build: "1-aaa-onprem-ent".to_string(),
        files: vec![
            SpecFile {
                file: "late.js".to_string(),
                sort_weight: 5,
            },
            SpecFile {
                file: "early.js".to_string(),
                sort_weight: 1,
            },
        ],
        environment: CycleEnvironment {
            browser_name: Some("chrome".to_string()),
            ..CycleEnvironment::default()
        },
    };

    let registration = services::start_cycle(&store, &config(), dir.path(), request)
        .await
        .unwrap();
    assert_eq!(registration.cycle.state, CycleState::OnQueue);
    assert_eq!(registration.cycle.specs_registered, 2);
    assert_eq!(registration.cycle.environment.browser_name.as_deref(), Some("chrome"));
    assert!(
        registration
            .specs
            .iter()
            .all(|s| s.state == SpecState::OnQueue)
    );

    let first = claim(&store, "1-aaa-onprem-ent").await.unwrap();
    assert_eq!(first.file, "early.js");
    assert_eq!(first.state, SpecState::Started);
    assert_eq!(first.server.as_deref(), Some("worker-1"));

    let cycle = store
        .get_cycle(registration.cycle.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cycle.state, CycleState::Started);
    assert!(cycle.start_at.is_some());

    assert_eq!(claim(&store, "1-aaa-onprem-ent").await.unwrap().file, "late.js");
    let exhausted = services::start_next_spec(&store, REPO, BRANCH, "1-aaa-onprem-ent", "worker-2")
        .await
        .unwrap();
    assert!(exhausted.spec.is_none());
    assert_eq!(exhausted.message(), "no more spec");
}

#[actix_rt::test]
async fn test_start_cycle_stores_family_known_issues() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    write_known_issues(
        dir.path(),
        "cloud-ent",
        r#"[{"spec_file": "a.js", "cases": [{"title": "Suite > x", "type": "flaky"}]}]"#,
    );

    let cloud = register(&store, dir.path(), "1-aaa-cloud-ent", &["a.js"]).await;
    let onprem = register(&store, dir.path(), "1-aaa-onprem-ent", &["a.js"]).await;

    assert_eq!(store.known_issue_count(cloud.id), 1);
    assert_eq!(store.known_issue_count(onprem.id), 0);
}

#[actix_rt::test]
async fn test_start_cycle_rejects_invalid_requests() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let request = StartCycleRequest {
        repo: REPO.to_string(),
        branch: String::new(),
        build: "1-aaa-onprem-ent".to_string(),
        files: Vec::new(),
        environment: CycleEnvironment::default(),
    };

    let result = services::start_cycle(&store, &config(), dir.path(), request).await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));
}

#[actix_rt::test]
async fn test_claim_for_unknown_cycle_is_not_found() {
    let store = MemoryStore::new();
    let result = services::start_next_spec(&store, REPO, BRANCH, "missing", "worker-1").await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}
