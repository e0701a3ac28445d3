//! Team-level workload summary.
//!
//! Sends the aggregated per-member workload to the model and asks it to sort
//! members into overloaded / underutilized / most-efficient buckets.

use crate::llm::ModelClient;
use crate::models::{AssigneeGroup, TaskLoad, TeamSummary};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-member view serialized into the summary prompt.
#[derive(Debug, Serialize)]
struct MemberLoad<'a> {
    name: &'a str,
    total_score: u32,
    task_count: usize,
    tasks: &'a [TaskLoad],
}

impl<'a> From<&'a AssigneeGroup> for MemberLoad<'a> {
    fn from(group: &'a AssigneeGroup) -> Self {
        Self {
            name: &group.name,
            total_score: group.total_score,
            task_count: group.task_count(),
            tasks: &group.tasks,
        }
    }
}

/// Build the summary prompt from the aggregated groups.
pub fn build_summary_prompt<'a>(groups: impl IntoIterator<Item = &'a AssigneeGroup>) -> String {
    let team_data: Vec<MemberLoad<'_>> = groups.into_iter().map(MemberLoad::from).collect();
    let team_json = serde_json::to_string_pretty(&team_data).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"You are an AI assistant analyzing workload distribution in a development team.

You will receive JSON with each team member's:
- name
- total_score (sum of workload)
- task_count
- tasks (each has score and reason)

Your job:
Identify:
1. Overloaded members (high total_score or heavy tasks)
2. Underutilized members (low total_score or few light tasks)
3. Most efficient members (good output vs. effort or lower stress in reasoning)

Return JSON with EXACTLY this structure (no markdown, no extra keys):

{{
  "overloaded_members": [
    {{ "name": "...", "reason": "..." }}
  ],
  "underutilized_members": [
    {{ "name": "...", "reason": "..." }}
  ],
  "most_efficient_members": [
    {{ "name": "...", "reason": "..." }}
  ]
}}

Team Data:
{team_json}
"#
    )
}

/// Remove a surrounding code fence and a leading language tag.
///
/// Only applies when the text opens with a fence; otherwise the trimmed
/// text is returned unchanged. The tag may sit on its own line or run
/// straight into the payload (`json {..}`, `json{..}`).
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    let inner = trimmed.trim_matches('`').trim();
    let tag_end = inner
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(inner.len());
    let rest = &inner[tag_end..];
    let tagged = tag_end > 0
        && (rest.is_empty() || rest.starts_with(|c: char| c.is_whitespace() || c == '{' || c == '['));

    if tagged {
        rest.trim()
    } else {
        inner
    }
}

/// Decode a summary completion, degrading to empty buckets plus the
/// untouched text when it is not the expected JSON object.
pub fn decode_summary(raw: &str) -> TeamSummary {
    match serde_json::from_str::<TeamSummary>(strip_code_fence(raw)) {
        Ok(mut summary) => {
            summary.raw = None;
            summary.error = None;
            summary
        }
        Err(e) => {
            debug!("Team summary was not valid JSON: {}", e);
            TeamSummary::undecodable(raw)
        }
    }
}

/// Produces the team summary with a single model call.
#[derive(Clone)]
pub struct TeamSummarizer {
    model: Arc<dyn ModelClient>,
}

impl TeamSummarizer {
    /// Create a summarizer around a model client.
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    /// Summarize the team. Never fails; see [`TeamSummary::failed`] and
    /// [`TeamSummary::undecodable`] for the degraded shapes.
    pub async fn summarize<'a>(
        &self,
        groups: impl IntoIterator<Item = &'a AssigneeGroup>,
    ) -> TeamSummary {
        let prompt = build_summary_prompt(groups);

        match self.model.complete(&prompt).await {
            Ok(completion) => decode_summary(&completion),
            Err(e) => {
                warn!("Team summary failed: {}", e);
                TeamSummary::failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::scripted::ScriptedModel;
    use crate::models::MemberVerdict;
    use serde_json::json;

    const SUMMARY_JSON: &str = r#"{
  "overloaded_members": [{"name": "Alice", "reason": "two heavy tasks"}],
  "underutilized_members": [{"name": "Bob", "reason": "one light task"}],
  "most_efficient_members": [{"name": "Alice", "reason": "ships under pressure"}]
}"#;

    fn group(name: &str, scores: &[u8]) -> AssigneeGroup {
        let mut group = AssigneeGroup::new(name);
        for (i, score) in scores.iter().enumerate() {
            group.tasks.push(TaskLoad {
                id: json!(i),
                title: format!("{} task {}", name, i),
                score: *score,
                reason: "because".to_string(),
            });
            group.total_score += u32::from(*score);
        }
        group
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```JSON\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```{}```"), "{}");
        assert_eq!(strip_code_fence("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_code_fence_single_line_tag() {
        assert_eq!(strip_code_fence("```json {\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```json{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```JSON[1, 2]```"), "[1, 2]");
    }

    #[test]
    fn test_decode_single_line_fenced_json() {
        let compact = SUMMARY_JSON.replace('\n', " ");
        for fenced in [
            format!("```json {}```", compact),
            format!("```json{}```", compact),
        ] {
            let summary = decode_summary(&fenced);
            assert!(summary.raw.is_none(), "not decoded: {}", fenced);
            assert_eq!(summary.overloaded_members[0].name, "Alice");
            assert_eq!(summary.underutilized_members[0].name, "Bob");
        }
    }

    #[test]
    fn test_decode_plain_json() {
        let summary = decode_summary(SUMMARY_JSON);

        assert_eq!(
            summary.overloaded_members,
            vec![MemberVerdict {
                name: "Alice".to_string(),
                reason: "two heavy tasks".to_string()
            }]
        );
        assert_eq!(summary.underutilized_members[0].name, "Bob");
        assert_eq!(summary.most_efficient_members[0].name, "Alice");
        assert!(!summary.is_degraded());
    }

    #[test]
    fn test_decode_fenced_json_matches_plain() {
        let fenced = format!("```json\n{}\n```", SUMMARY_JSON);
        assert_eq!(decode_summary(&fenced), decode_summary(SUMMARY_JSON));
    }

    #[test]
    fn test_decode_non_json_keeps_raw() {
        let raw = "Alice is clearly overloaded, Bob could take more.";
        let summary = decode_summary(raw);

        assert!(summary.overloaded_members.is_empty());
        assert!(summary.underutilized_members.is_empty());
        assert!(summary.most_efficient_members.is_empty());
        assert_eq!(summary.raw.as_deref(), Some(raw));
        assert!(summary.error.is_none());
    }

    #[test]
    fn test_decode_wrong_shape_keeps_raw() {
        let raw = r#"{"overloaded_members": "Alice"}"#;
        assert_eq!(decode_summary(raw).raw.as_deref(), Some(raw));
        assert!(decode_summary("[1, 2]").raw.is_some());
    }

    #[test]
    fn test_decode_partial_object_defaults_missing_buckets() {
        let summary = decode_summary(r#"{"overloaded_members": [{"name": "Alice"}], "notes": "x"}"#);
        assert_eq!(summary.overloaded_members[0].name, "Alice");
        assert_eq!(summary.overloaded_members[0].reason, "");
        assert!(summary.underutilized_members.is_empty());
        assert!(!summary.is_degraded());
    }

    #[test]
    fn test_prompt_serializes_member_loads() {
        let groups = vec![group("Alice", &[9, 8]), group("Bob", &[2])];
        let prompt = build_summary_prompt(&groups);

        assert!(prompt.contains("\"name\": \"Alice\""));
        assert!(prompt.contains("\"total_score\": 17"));
        assert!(prompt.contains("\"task_count\": 2"));
        assert!(prompt.contains("\"total_score\": 2"));
        assert!(prompt.contains("\"reason\": \"because\""));
    }

    #[tokio::test]
    async fn test_summarize_success() {
        let model = Arc::new(ScriptedModel::new().reply(format!("```json\n{}\n```", SUMMARY_JSON)));
        let summarizer = TeamSummarizer::new(model.clone());
        let groups = vec![group("Alice", &[9, 8]), group("Bob", &[2])];

        let summary = summarizer.summarize(&groups).await;

        assert_eq!(summary.overloaded_members[0].name, "Alice");
        assert_eq!(model.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_summarize_model_failure() {
        let model = Arc::new(ScriptedModel::new().fail("service unavailable"));
        let summarizer = TeamSummarizer::new(model);

        let summary = summarizer.summarize(&[group("Alice", &[3])]).await;

        assert!(summary.overloaded_members.is_empty());
        assert!(summary.raw.is_none());
        assert!(summary.error.unwrap().contains("service unavailable"));
    }
}
