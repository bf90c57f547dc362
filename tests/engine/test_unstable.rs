//! Unstable test report over recent done cycles.

use cycle_report_lib::models::{BuildFamily, CaseState, UnstableCaseType};
use cycle_report_lib::services;

use super::memory_store::MemoryStore;
use super::test_helpers::*;

#[actix_rt::test]
async fn test_unstable_report_lists_failures() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();

    run_cycle(
        &store,
        dir.path(),
        "1-aaa-onprem-ent",
        &[("a.js", vec![("steady", CaseState::Passed), ("shaky", CaseState::Failed)])],
    )
    .await;
    run_cycle(
        &store,
        dir.path(),
        "2-bbb-onprem-ent",
        &[("a.js", vec![("steady", CaseState::Passed), ("shaky", CaseState::Passed)])],
    )
    .await;
    // A different family must not show up.
    run_cycle(
        &store,
        dir.path(),
        "3-ccc-cloud-ent",
        &[("a.js", vec![("steady", CaseState::Failed)])],
    )
    .await;

    write_known_issues(
        dir.path(),
        "onprem-ent",
        r#"[{"spec_file": "a.js", "cases": [{"title": "Suite > shaky", "type": "flaky"}]}]"#,
    );

    let family = BuildFamily::new(REPO, BRANCH, "onprem-ent");
    let report = services::unstable_tests(&store, dir.path(), &family, None)
        .await
        .unwrap();

    assert_eq!(report.cycles.len(), 2);
    assert_eq!(report.total, 1);
    let spec = &report.unstable_specs[0];
    assert_eq!(spec.spec_file, "a.js");
    let case = &spec.cases[0];
    assert_eq!(case.title, full_title("shaky"));
    assert_eq!(case.case_type, UnstableCaseType::Flaky);
    assert!(case.is_known);
    assert_eq!(
        case.recent_run,
        vec![Some(CaseState::Passed), Some(CaseState::Failed)]
    );
}

#[actix_rt::test]
async fn test_unstable_report_limits_cycles() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    for i in 0..7 {
        run_cycle(
            &store,
            dir.path(),
            &format!("{}-abc-onprem-ent", i),
            &[("a.js", vec![("bad", CaseState::Failed)])],
        )
        .await;
    }

    let family = BuildFamily::new(REPO, BRANCH, "onprem-ent");
    let report = services::unstable_tests(&store, dir.path(), &family, Some(50))
        .await
        .unwrap();
    assert_eq!(report.cycles.len(), 5);
    assert_eq!(report.unstable_specs[0].cases[0].recent_run.len(), 5);
    assert_eq!(
        report.unstable_specs[0].cases[0].case_type,
        UnstableCaseType::RequireVerification
    );

    let empty = services::unstable_tests(
        &store,
        dir.path(),
        &BuildFamily::new(REPO, "release-1.0", "onprem-ent"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(empty.total, 0);
    assert!(empty.cycles.is_empty());
}
