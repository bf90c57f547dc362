//! Spec completion: classification, spec rollup and cycle rollup.

use cycle_report_lib::config::ClassificationConfig;
use cycle_report_lib::error::AppError;
use cycle_report_lib::models::{CaseState, CycleState, SpecState};
use cycle_report_lib::services::{self, ExecutionStore};
use uuid::Uuid;

use super::memory_store::MemoryStore;
use super::test_helpers::*;

#[actix_rt::test]
async fn test_failure_without_history_stays_failed() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    register(&store, dir.path(), "1-aaa-onprem-ent", &["a.js"]).await;

    let spec = claim(&store, "1-aaa-onprem-ent").await.unwrap();
    let completion = services::finish_spec_execution(
        &store,
        &config(),
        spec.id,
        &report(vec![
            case("works", CaseState::Passed),
            case("breaks", CaseState::Failed),
        ]),
    )
    .await
    .unwrap();

    assert_eq!(completion.spec.state, SpecState::Done);
    assert_eq!(completion.spec.counts.pass, 1);
    assert_eq!(completion.spec.counts.fail, 1);
    assert_eq!(completion.spec.tests, 2);

    let broken = completion
        .cases
        .iter()
        .find(|c| c.full_title == full_title("breaks"))
        .unwrap();
    assert_eq!(broken.raw_state, CaseState::Failed);
    assert_eq!(broken.state, CaseState::Failed);
    assert!(broken.last_execution.is_empty());

    assert_eq!(completion.cycle.state, CycleState::Done);
    assert_eq!(completion.cycle.specs_done, 1);
    assert_eq!(completion.cycle.counts.total(), 2);
}

#[actix_rt::test]
async fn test_consecutive_failures_become_known() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let failing = || vec![("login", CaseState::Failed)];

    run_cycle(&store, dir.path(), "1-aaa-onprem-ent", &[("a.js", failing())]).await;
    run_cycle(&store, dir.path(), "2-bbb-onprem-ent", &[("a.js", failing())]).await;
    let cycle = run_cycle(&store, dir.path(), "3-ccc-onprem-ent", &[("a.js", failing())]).await;

    let spec = store
        .list_spec_executions(cycle.id, None)
        .await
        .unwrap()
        .remove(0);
    let cases = store.cases_of_spec(spec.id);
    assert_eq!(cases[0].raw_state, CaseState::Failed);
    assert_eq!(cases[0].state, CaseState::Known);
    assert_eq!(cases[0].last_execution.len(), 2);
    assert_eq!(spec.counts.known, 1);
    assert_eq!(spec.counts.fail, 0);
    assert_eq!(cycle.counts.known, 1);
}

#[actix_rt::test]
async fn test_mixed_history_becomes_flaky() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();

    let search = |state| vec![("a.js", vec![("search", state)])];

    run_cycle(&store, dir.path(), "1-aaa-onprem-ent", &search(CaseState::Passed)).await;
    let second =
        run_cycle(&store, dir.path(), "2-bbb-onprem-ent", &search(CaseState::Failed)).await;
    let third = run_cycle(&store, dir.path(), "3-ccc-onprem-ent", &search(CaseState::Failed)).await;

    // Only passes before the second cycle: no verdict.
    assert_eq!(second.counts.fail, 1);
    // Failed then passed: not consecutive.
    assert_eq!(third.counts.flaky, 1);
    assert_eq!(third.counts.fail, 0);
}

#[actix_rt::test]
async fn test_other_build_family_is_not_history() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let failing = || vec![("login", CaseState::Failed)];

    run_cycle(&store, dir.path(), "1-aaa-cloud-ent", &[("a.js", failing())]).await;
    run_cycle(&store, dir.path(), "2-bbb-cloud-ent", &[("a.js", failing())]).await;
    let cycle = run_cycle(&store, dir.path(), "3-ccc-onprem-ent", &[("a.js", failing())]).await;

    assert_eq!(cycle.counts.fail, 1);
    assert_eq!(cycle.counts.known, 0);
}

#[actix_rt::test]
async fn test_known_issue_wins_over_history() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let failing = || vec![("broken", CaseState::Failed), ("fine", CaseState::Passed)];

    run_cycle(&store, dir.path(), "1-aaa-onprem-ent", &[("a.js", failing())]).await;
    run_cycle(&store, dir.path(), "2-bbb-onprem-ent", &[("a.js", failing())]).await;

    write_known_issues(
        dir.path(),
        "onprem-ent",
        r#"[{"spec_file": "a.js", "cases": [
            {"title": "Suite > broken", "type": "bug", "ticket": "MM-123"},
            {"title": "Suite > fine", "type": "flaky"}
        ]}]"#,
    );
    let cycle = run_cycle(&store, dir.path(), "3-ccc-onprem-ent", &[("a.js", failing())]).await;

    let spec = store
        .list_spec_executions(cycle.id, None)
        .await
        .unwrap()
        .remove(0);
    let cases = store.cases_of_spec(spec.id);
    let broken = cases
        .iter()
        .find(|c| c.full_title == full_title("broken"))
        .unwrap();
    assert_eq!(broken.state, CaseState::Bug);
    assert_eq!(broken.known_issue_ticket.as_deref(), Some("MM-123"));
    assert!(broken.last_execution.is_empty());

    // Declared cases that passed keep their state.
    let fine = cases
        .iter()
        .find(|c| c.full_title == full_title("fine"))
        .unwrap();
    assert_eq!(fine.state, CaseState::Passed);
    assert_eq!(cycle.counts.bug, 1);
    assert_eq!(cycle.counts.pass, 1);
}

#[actix_rt::test]
async fn test_cycle_enters_done_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let build = "1-aaa-onprem-ent";
    let cycle = register(&store, dir.path(), build, &["a.js", "b.js", "c.js"]).await;
    assert_eq!(cycle.state, CycleState::OnQueue);

    let mut finished = Vec::new();
    let mut end_at = None;
    for expected_done in 1..=3 {
        let spec = claim(&store, build).await.unwrap();
        let completion = services::finish_spec_execution(
            &store,
            &config(),
            spec.id,
            &report(vec![case("works", CaseState::Passed)]),
        )
        .await
        .unwrap();

        assert_eq!(completion.cycle.specs_done, expected_done);
        if expected_done < 3 {
            assert_eq!(completion.cycle.state, CycleState::Started);
            assert!(completion.cycle.end_at.is_none());
        } else {
            assert_eq!(completion.cycle.state, CycleState::Done);
            end_at = completion.cycle.end_at;
        }
        finished.push(spec.id);
    }
    assert!(end_at.is_some());
    assert!(claim(&store, build).await.is_none());

    let again = services::finish_spec_execution(
        &store,
        &config(),
        finished[0],
        &report(vec![case("works", CaseState::Failed)]),
    )
    .await;
    assert!(matches!(again, Err(AppError::Conflict(_))));

    let cycle = store.get_cycle(cycle.id).await.unwrap().unwrap();
    assert_eq!(cycle.state, CycleState::Done);
    assert_eq!(cycle.end_at, end_at);
    assert_eq!(cycle.counts.pass, 3);
    assert_eq!(cycle.counts.fail, 0);
}

#[actix_rt::test]
async fn test_history_outage_degrades_to_failed() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let failing = || vec![("login", CaseState::Failed)];

    run_cycle(&store, dir.path(), "1-aaa-onprem-ent", &[("a.js", failing())]).await;
    run_cycle(&store, dir.path(), "2-bbb-onprem-ent", &[("a.js", failing())]).await;

    store.break_history();
    let cycle = run_cycle(&store, dir.path(), "3-ccc-onprem-ent", &[("a.js", failing())]).await;

    assert_eq!(cycle.state, CycleState::Done);
    assert_eq!(cycle.counts.fail, 1);
    assert_eq!(cycle.counts.known, 0);
}

#[actix_rt::test]
async fn test_spec_history_attached() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let cases = || vec![("one", CaseState::Passed), ("two", CaseState::Skipped)];

    let first = run_cycle(&store, dir.path(), "1-aaa-onprem-ent", &[("a.js", cases())]).await;
    let second = run_cycle(&store, dir.path(), "2-bbb-onprem-ent", &[("a.js", cases())]).await;

    let spec = store
        .list_spec_executions(second.id, None)
        .await
        .unwrap()
        .remove(0);
    assert_eq!(spec.last_execution.len(), 1);
    assert_eq!(spec.last_execution[0].cycle_id, first.id);
    assert_eq!(spec.last_execution[0].counts.pass, 1);
    assert_eq!(spec.last_execution[0].counts.skipped, 1);
}

#[actix_rt::test]
async fn test_duplicate_titles_recorded_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    register(&store, dir.path(), "1-aaa-onprem-ent", &["a.js"]).await;
    let spec = claim(&store, "1-aaa-onprem-ent").await.unwrap();

    let completion = services::finish_spec_execution(
        &store,
        &config(),
        spec.id,
        &report(vec![
            case("same", CaseState::Passed),
            case("same", CaseState::Failed),
        ]),
    )
    .await
    .unwrap();

    assert_eq!(completion.cases.len(), 1);
    assert_eq!(completion.cases[0].state, CaseState::Passed);
    assert_eq!(completion.spec.tests, 1);
}

#[actix_rt::test]
async fn test_rejected_reports_write_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let cycle = register(&store, dir.path(), "1-aaa-onprem-ent", &["a.js"]).await;
    let spec = claim(&store, "1-aaa-onprem-ent").await.unwrap();

    let missing = services::finish_spec_execution(
        &store,
        &config(),
        Uuid::new_v4(),
        &report(vec![case("works", CaseState::Passed)]),
    )
    .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let mut wrong_file = report(vec![case("works", CaseState::Passed)]);
    wrong_file.file = Some("b.js".to_string());
    let mismatch = services::finish_spec_execution(&store, &config(), spec.id, &wrong_file).await;
    assert!(matches!(mismatch, Err(AppError::InvalidInput(_))));

    let runner_cannot_report_known = services::finish_spec_execution(
        &store,
        &config(),
        spec.id,
        &report(vec![case("works", CaseState::Known)]),
    )
    .await;
    assert!(matches!(
        runner_cannot_report_known,
        Err(AppError::InvalidInput(_))
    ));

    assert!(store.cases_of_spec(spec.id).is_empty());
    let cycle = store.get_cycle(cycle.id).await.unwrap().unwrap();
    assert_eq!(cycle.specs_done, 0);
    assert_eq!(cycle.state, CycleState::Started);
}

/// Runs `login` (failing) in every earlier cycle except those where `skip(i)` holds.
async fn run_with_gaps(
    store: &MemoryStore,
    dir: &std::path::Path,
    count: usize,
    skip: impl Fn(usize) -> bool,
) -> Vec<Uuid> {
    let mut ran_login = Vec::new();
    for i in 0..count {
        let cases = if skip(i) {
            vec![("other", CaseState::Passed)]
        } else {
            vec![("login", CaseState::Failed)]
        };
        let build = format!("{}-abc-onprem-ent", i);
        let cycle = run_cycle(store, dir, &build, &[("a.js", cases)]).await;
        if !skip(i) {
            ran_login.push(cycle.id);
        }
    }
    ran_login
}

#[actix_rt::test]
async fn test_case_window_skips_cycles_without_the_case() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let ran_login = run_with_gaps(&store, dir.path(), 8, |i| i % 3 == 2).await;
    assert_eq!(ran_login.len(), 6);

    let cycle = run_cycle(
        &store,
        dir.path(),
        "8-abc-onprem-ent",
        &[("a.js", vec![("login", CaseState::Failed)])],
    )
    .await;

    let spec = store
        .list_spec_executions(cycle.id, None)
        .await
        .unwrap()
        .remove(0);
    let login = store.cases_of_spec(spec.id).remove(0);
    let window: Vec<Uuid> = login.last_execution.iter().map(|e| e.cycle_id).collect();

    let expected: Vec<Uuid> = ran_login.iter().rev().take(5).copied().collect();
    assert_eq!(window.len(), 5);
    assert_eq!(window, expected);
    assert_eq!(login.state, CaseState::Known);
}

#[actix_rt::test]
async fn test_case_window_limited_to_candidate_cycles() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    // Only the oldest two and the newest earlier cycle run the case.
    let ran_login = run_with_gaps(&store, dir.path(), 6, |i| (2..5).contains(&i)).await;

    let build = "6-abc-onprem-ent";
    register(&store, dir.path(), build, &["a.js"]).await;
    let spec = claim(&store, build).await.unwrap();
    let tight = ClassificationConfig {
        last_x_run: 2,
        spec_last_x_run: 2,
        ..config()
    };
    let completion = services::finish_spec_execution(
        &store,
        &tight,
        spec.id,
        &report(vec![case("login", CaseState::Failed)]),
    )
    .await
    .unwrap();

    // Four candidate cycles: only the newest of them ran the case.
    let window: Vec<Uuid> = completion.cases[0]
        .last_execution
        .iter()
        .map(|e| e.cycle_id)
        .collect();
    assert_eq!(window, vec![ran_login[2]]);
    assert_eq!(completion.spec.last_execution.len(), 2);
}
