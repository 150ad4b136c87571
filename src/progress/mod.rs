//! Progress and assignment-audience engine.
//!
//! Enrollment lookups feed the audience resolver, which feeds the
//! aggregator; `ProgressService` is the entry point the routes use.

pub mod aggregator;
pub mod audience;
pub mod lessons;
pub mod report;
pub mod roster;
pub mod service;
pub mod store;
pub mod submissions;

pub use aggregator::{ActivityReport, ActivitySnapshot, aggregate};
pub use audience::AudienceResolver;
pub use report::{
    AssignmentStatistics, AssignmentView, DetailedProgress, RecentActivity, StudentAssignment,
    StudentProgress, StudentProgressEntry,
};
pub use roster::{RosterIndex, RosterSnapshot};
pub use service::ProgressService;
pub use store::ActivityStore;
