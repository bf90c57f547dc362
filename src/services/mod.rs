//! Classification and aggregation engine.
//!
//! `completion::finish_spec_execution` and `known_issues::apply_known_issues` are the
//! two entry points that write classifications; everything else supports them or
//! reads their results.

pub mod classifier;
pub mod completion;
pub mod cycle_aggregator;
pub mod history;
pub mod known_issue_index;
pub mod known_issue_source;
pub mod known_issues;
pub mod lifecycle;
pub mod liveness;
pub mod spec_aggregator;
pub mod store;
pub mod summary;
pub mod unstable;

pub use classifier::{
    Classification, ClassificationContext, ClassificationSource, ClassificationStrategy,
    HistoryWindowStrategy,
};
pub use completion::{SpecCompletion, finish_spec_execution};
pub use cycle_aggregator::{recompute_cycle, refresh_cycle, specs_with_cases};
pub use history::HistoryWindow;
pub use known_issue_index::{KnownIssueIndex, KnownIssueMatch};
pub use known_issue_source::load_known_issues;
pub use known_issues::{CycleSelector, apply_known_issues, save_known_issues};
pub use lifecycle::{CycleRegistration, SpecClaim, start_cycle, start_next_spec};
pub use liveness::is_live;
pub use spec_aggregator::{completion_patch, tally_cases};
pub use store::ExecutionStore;
pub use summary::{SpecGroupCounts, cycle_group, cycle_summary, spec_group, spec_group_counts};
pub use unstable::{UnstableReport, unstable_tests};
