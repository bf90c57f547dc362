//! Domain models for the cycle report server.

pub mod build;
pub mod case_execution;
pub mod counts;
pub mod cycle;
pub mod known_issue;
pub mod spec_execution;
pub mod unstable;

// Re-export commonly used types
pub use build::{BuildFamily, BuildInfo, base_branch};
pub use case_execution::{
    CaseDiagnostics, CaseExecution, CaseResult, CaseState, LastCaseExecution, Screenshot,
    full_title_of,
};
pub use counts::CaseCounts;
pub use cycle::{
    Cycle, CycleEnvironment, CycleGroup, CyclePatch, CycleState, CycleSummary, NewCycle,
    StartCycleRequest,
};
pub use known_issue::{
    KnownIssueCase, KnownIssueData, KnownIssueRecord, KnownIssueType, known_issue_hash,
    validate_known_issues,
};
pub use spec_execution::{
    LastSpecExecution, SpecExecution, SpecFile, SpecGroup, SpecPatch, SpecResultReport,
    SpecState, SpecWithCases,
};
pub use unstable::{CaseOutcome, UnstableCase, UnstableCaseType, UnstableSpec};
