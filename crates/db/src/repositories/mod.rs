//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod assignment_commit_repo;
pub mod assignment_event_repo;
pub mod assignment_rule_repo;
pub mod rotation_cursor_repo;
pub mod staff_repo;
pub mod work_item_repo;

pub use assignment_commit_repo::{
    AssignmentCommitRepo, CommitAssignment, CommitResult, CursorAdvance, ItemGuard,
};
pub use assignment_event_repo::AssignmentEventRepo;
pub use assignment_rule_repo::{AssignmentRuleRepo, RuleWriteError};
pub use rotation_cursor_repo::RotationCursorRepo;
pub use staff_repo::StaffRepo;
pub use work_item_repo::WorkItemRepo;
