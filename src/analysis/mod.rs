//! Workload analysis.
//!
//! Comment normalization, per-item scoring, per-assignee aggregation and
//! the team summary, tied together by [`Pipeline`].

pub mod aggregator;
pub mod comments;
pub mod pipeline;
pub mod scorer;
pub mod summarizer;

pub use aggregator::{heaviest_tasks, ranked_by_load, team_total};
pub use pipeline::Pipeline;
