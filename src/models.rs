//! Data models for the workload balancer.
//!
//! This module contains the core data structures used throughout the
//! application: work items as delivered by the tracker, per-item analyses,
//! per-assignee workload groups, the team summary and the final report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Field holding the work item title.
pub const TITLE_FIELD: &str = "System.Title";

/// Field holding the assignee identity record.
pub const ASSIGNED_TO_FIELD: &str = "System.AssignedTo";

/// Title used when a work item carries none.
pub const UNTITLED: &str = "Untitled";

/// Group name for items without a usable assignee.
pub const UNASSIGNED: &str = "Unassigned";

/// A single comment as it arrives from the tracker.
///
/// Trackers and hand-written input files disagree on the shape of comments,
/// so anything is accepted here and flattened to text by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawComment {
    /// A bare comment string.
    PlainText(String),
    /// A comment record; only its `text` field is read.
    Structured(Map<String, Value>),
    /// Numbers, booleans, nulls and nested arrays.
    Other(Value),
}

/// The `comments` payload of a work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawComments {
    /// An ordered comment thread.
    Thread(Vec<RawComment>),
    /// A single pre-joined comment string.
    Single(String),
    /// Any other shape; normalizes to no comments.
    Other(Value),
}

/// A work item as received from the tracker.
///
/// Only the title, the assignee display name and the comments are read;
/// every other field is carried through untouched into the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Tracker identifier (usually an integer).
    #[serde(default)]
    pub id: Value,
    /// Tracker fields keyed by reference name (e.g. `System.Title`).
    #[serde(default)]
    pub fields: Map<String, Value>,
    /// Raw comment payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<RawComments>,
    /// Any other top-level keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkItem {
    /// Returns the title, if the tracker supplied a string one.
    pub fn title(&self) -> Option<&str> {
        self.fields.get(TITLE_FIELD).and_then(Value::as_str)
    }

    /// Returns the title or `"Untitled"`.
    pub fn title_or_default(&self) -> &str {
        self.title().unwrap_or(UNTITLED)
    }

    /// Returns the assignee display name, if present.
    pub fn assignee(&self) -> Option<&str> {
        self.fields
            .get(ASSIGNED_TO_FIELD)
            .and_then(|assigned| assigned.get("displayName"))
            .and_then(Value::as_str)
    }

    /// Resolves the grouping name: the display name when non-empty,
    /// otherwise `"Unassigned"`.
    pub fn assignee_or_unassigned(&self) -> &str {
        match self.assignee() {
            Some(name) if !name.trim().is_empty() => name,
            _ => UNASSIGNED,
        }
    }

    /// Human-readable identifier (no quotes around string ids).
    pub fn id_label(&self) -> String {
        id_label(&self.id)
    }
}

/// Render a work item id without quotes around string ids.
pub fn id_label(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        Value::Null => "?".to_string(),
        other => other.to_string(),
    }
}

/// Result of scoring a single work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    /// Workload score in `[0, 10]`; 0 means scoring failed.
    pub score: u8,
    /// One-sentence justification (or the raw text on fallback).
    pub reason: String,
    /// The model completion before parsing.
    #[serde(default)]
    pub raw_response: String,
    /// Invocation error message, if the model could not be reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Analysis {
    /// Sentinel analysis for a failed model invocation.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            score: 0,
            reason: "model error".to_string(),
            raw_response: String::new(),
            error: Some(error.into()),
        }
    }

    /// Whether the model invocation itself failed.
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// A work item together with its analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    #[serde(flatten)]
    pub item: WorkItem,
    pub analysis: Analysis,
}

/// One task inside an assignee's workload group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskLoad {
    pub id: Value,
    pub title: String,
    pub score: u8,
    pub reason: String,
}

/// Aggregated workload of one assignee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssigneeGroup {
    /// Display name, or `"Unassigned"`.
    pub name: String,
    /// Tasks in input order.
    pub tasks: Vec<TaskLoad>,
    /// Sum of the task scores.
    pub total_score: u32,
}

impl AssigneeGroup {
    /// Creates an empty group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
            total_score: 0,
        }
    }

    /// Number of tasks in the group.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Mean score per task (0.0 for an empty group).
    pub fn average_score(&self) -> f64 {
        if self.tasks.is_empty() {
            0.0
        } else {
            self.total_score as f64 / self.tasks.len() as f64
        }
    }
}

/// A member placed in one of the team summary buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberVerdict {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub reason: String,
}

/// Team-level classification of members.
///
/// Buckets are not mutually exclusive: the model may list a member in more
/// than one of them and that is kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSummary {
    #[serde(default)]
    pub overloaded_members: Vec<MemberVerdict>,
    #[serde(default)]
    pub underutilized_members: Vec<MemberVerdict>,
    #[serde(default)]
    pub most_efficient_members: Vec<MemberVerdict>,
    /// Untouched model output when it could not be decoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    /// Invocation error message when the model could not be reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TeamSummary {
    /// Empty buckets carrying the undecodable model output.
    pub fn undecodable(raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
            ..Self::default()
        }
    }

    /// Empty buckets carrying an invocation error.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Whether the summary degraded to a sentinel.
    pub fn is_degraded(&self) -> bool {
        self.raw.is_some() || self.error.is_some()
    }

    /// Iterates the three buckets with their display labels.
    pub fn buckets(&self) -> [(Bucket, &[MemberVerdict]); 3] {
        [
            (Bucket::Overloaded, &self.overloaded_members),
            (Bucket::Underutilized, &self.underutilized_members),
            (Bucket::MostEfficient, &self.most_efficient_members),
        ]
    }
}

/// The three team summary buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Overloaded,
    Underutilized,
    MostEfficient,
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Overloaded => write!(f, "Overloaded"),
            Bucket::Underutilized => write!(f, "Can Take More"),
            Bucket::MostEfficient => write!(f, "Most Efficient"),
        }
    }
}

impl Bucket {
    /// Returns an emoji representation of the bucket.
    pub fn emoji(&self) -> &'static str {
        match self {
            Bucket::Overloaded => "🔴",
            Bucket::Underutilized => "🟡",
            Bucket::MostEfficient => "🟢",
        }
    }

    /// Placeholder shown when the bucket is empty.
    pub fn empty_text(&self) -> &'static str {
        match self {
            Bucket::Overloaded => "No overloaded members detected.",
            Bucket::Underutilized => "No clear underutilized members.",
            Bucket::MostEfficient => "No efficiency winners identified.",
        }
    }
}

/// Output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Scored items, in input order.
    pub analyzed_items: Vec<ScoredItem>,
    /// Per-assignee workload, ordered by name.
    pub workload: Vec<AssigneeGroup>,
    pub team_summary: TeamSummary,
}

/// Metadata about the workload report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Where the work items came from (tracker project or input file).
    pub source: String,
    /// Date and time of the analysis.
    pub analysis_date: DateTime<Utc>,
    /// Name of the model used.
    pub model_used: String,
    /// Number of work items analyzed.
    pub items_analyzed: usize,
    /// Number of items whose model call failed.
    pub items_failed: usize,
    /// Number of assignee groups.
    pub members: usize,
    /// Duration of the analysis in seconds.
    pub duration_seconds: f64,
}

/// The complete workload report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadReport {
    pub metadata: ReportMetadata,
    pub analyzed_items: Vec<ScoredItem>,
    pub workload: Vec<AssigneeGroup>,
    pub team_summary: TeamSummary,
}

impl WorkloadReport {
    /// Assembles a report from a pipeline run.
    pub fn new(
        source: String,
        model_used: String,
        output: PipelineOutput,
        duration_seconds: f64,
    ) -> Self {
        let metadata = ReportMetadata {
            source,
            analysis_date: Utc::now(),
            model_used,
            items_analyzed: output.analyzed_items.len(),
            items_failed: output
                .analyzed_items
                .iter()
                .filter(|s| s.analysis.is_failure())
                .count(),
            members: output.workload.len(),
            duration_seconds,
        };

        Self {
            metadata,
            analyzed_items: output.analyzed_items,
            workload: output.workload,
            team_summary: output.team_summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_work_item_accessors() {
        let item: WorkItem = serde_json::from_value(json!({
            "id": 42,
            "fields": {
                "System.Title": "Fix login",
                "System.AssignedTo": {"displayName": "Alice"}
            },
            "comments": ["first"]
        }))
        .unwrap();

        assert_eq!(item.title(), Some("Fix login"));
        assert_eq!(item.assignee_or_unassigned(), "Alice");
        assert_eq!(item.id_label(), "42");
    }

    #[test]
    fn test_missing_assignee_resolves_to_unassigned() {
        let null_assignee: WorkItem = serde_json::from_value(json!({
            "id": 1,
            "fields": {"System.AssignedTo": null}
        }))
        .unwrap();
        let empty_name: WorkItem = serde_json::from_value(json!({
            "id": 2,
            "fields": {"System.AssignedTo": {"displayName": ""}}
        }))
        .unwrap();

        assert_eq!(null_assignee.assignee_or_unassigned(), UNASSIGNED);
        assert_eq!(empty_name.assignee_or_unassigned(), UNASSIGNED);
        assert_eq!(null_assignee.title_or_default(), UNTITLED);
    }

    #[test]
    fn test_comment_shapes_deserialize() {
        let thread: RawComments =
            serde_json::from_value(json!(["a", {"text": "b"}, 3])).unwrap();
        assert_eq!(
            thread,
            RawComments::Thread(vec![
                RawComment::PlainText("a".to_string()),
                RawComment::Structured(
                    json!({"text": "b"}).as_object().cloned().unwrap()
                ),
                RawComment::Other(json!(3)),
            ])
        );

        let single: RawComments = serde_json::from_value(json!("only one")).unwrap();
        assert_eq!(single, RawComments::Single("only one".to_string()));
    }

    #[test]
    fn test_scored_item_passes_fields_through() {
        let item: WorkItem = serde_json::from_value(json!({
            "id": 7,
            "fields": {"System.Title": "T", "System.CreatedDate": "2024-01-01"},
            "url": "https://example.invalid/7"
        }))
        .unwrap();
        let scored = ScoredItem {
            item,
            analysis: Analysis::failed("boom"),
        };

        let value = serde_json::to_value(&scored).unwrap();
        assert_eq!(value["fields"]["System.CreatedDate"], "2024-01-01");
        assert_eq!(value["url"], "https://example.invalid/7");
        assert_eq!(value["analysis"]["score"], 0);
        assert_eq!(value["analysis"]["error"], "boom");
    }

    #[test]
    fn test_team_summary_sentinels() {
        let raw = TeamSummary::undecodable("not json");
        assert!(raw.is_degraded());
        assert!(raw.overloaded_members.is_empty());
        assert_eq!(raw.raw.as_deref(), Some("not json"));

        let failed = TeamSummary::failed("timeout");
        assert!(failed.is_degraded());
        assert!(!TeamSummary::default().is_degraded());
    }

    #[test]
    fn test_assignee_group_average() {
        let mut group = AssigneeGroup::new("Alice");
        assert_eq!(group.average_score(), 0.0);

        group.tasks.push(TaskLoad {
            id: json!(1),
            title: "a".to_string(),
            score: 9,
            reason: String::new(),
        });
        group.tasks.push(TaskLoad {
            id: json!(2),
            title: "b".to_string(),
            score: 8,
            reason: String::new(),
        });
        group.total_score = 17;

        assert_eq!(group.task_count(), 2);
        assert_eq!(group.average_score(), 8.5);
    }

    #[test]
    fn test_bucket_display() {
        assert_eq!(Bucket::Overloaded.to_string(), "Overloaded");
        assert_eq!(Bucket::MostEfficient.emoji(), "🟢");
    }
}
