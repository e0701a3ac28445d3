//! Per-item workload scoring.
//!
//! Each work item is rated 1-10 by the model from its title and comments.
//! Model output is untrusted: it is decoded as strict JSON first, then
//! scanned for a bare score token, and finally scored 0.

use super::comments::normalize_comments;
use crate::llm::ModelClient;
use crate::models::{Analysis, WorkItem};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Highest score the model may assign.
pub const MAX_SCORE: u8 = 10;

/// Outcome of decoding a scoring completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreDecode {
    /// The completion was a JSON object with a usable score.
    Structured { score: u8, reason: String },
    /// A standalone score token was found in free text.
    Scanned { score: u8 },
    /// Nothing usable was found.
    Unscored,
}

impl ScoreDecode {
    /// Score and reason, using the whole completion as the reason unless
    /// the model supplied one in structured form.
    pub fn into_parts(self, raw: &str) -> (u8, String) {
        match self {
            ScoreDecode::Structured { score, reason } => (score, reason),
            ScoreDecode::Scanned { score } => (score, raw.to_string()),
            ScoreDecode::Unscored => (0, raw.to_string()),
        }
    }
}

/// Decode a scoring completion.
pub fn decode_score(raw: &str) -> ScoreDecode {
    if let Some(decoded) = decode_structured(raw) {
        return decoded;
    }

    match scan_score_token(raw) {
        Some(score) => ScoreDecode::Scanned { score },
        None => ScoreDecode::Unscored,
    }
}

/// Strict stage: the whole completion must be a JSON object whose `score`
/// (if present) is numeric. A missing score counts as 0.
fn decode_structured(raw: &str) -> Option<ScoreDecode> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;

    let score = match object.get("score") {
        None => 0,
        Some(score) => coerce_score(score)?,
    };

    let reason = match object.get("reason") {
        Some(Value::String(reason)) => reason.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    };

    Some(ScoreDecode::Structured { score, reason })
}

/// Integer view of a JSON score, clamped to `[0, 10]`.
///
/// Fractions are truncated and numeric strings are accepted.
fn coerce_score(value: &Value) -> Option<u8> {
    let score = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => n.as_f64()?.trunc() as i64,
        },
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };

    Some(score.clamp(0, MAX_SCORE as i64) as u8)
}

/// Find the first standalone token `1`..`10` in free text.
///
/// Tokens are maximal runs of alphanumerics and underscores, so "8/10"
/// yields 8 while "15", "a8" and "07" are skipped.
pub fn scan_score_token(text: &str) -> Option<u8> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .find_map(|token| {
            if token.starts_with('0') {
                return None;
            }
            token
                .parse::<u8>()
                .ok()
                .filter(|n| (1..=MAX_SCORE).contains(n))
        })
}

/// Build the scoring prompt for one item.
pub fn build_score_prompt(title: &str, comments: &[String]) -> String {
    let comments_json = serde_json::to_string_pretty(comments).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"You are an AI assistant helping with workload evaluation on software teams.

You will receive:
- A work item title
- A list of user comments

Your job:
1. Determine how demanding the work seems based on complexity, blockers, rework, or urgency.
2. Assign a workload score from 1 (very light) to 10 (extremely heavy).
3. Provide a short reason in 1 sentence.

Return JSON with EXACTLY this structure (no markdown, no extra keys):

{{
  "score": <1-10 number>,
  "reason": "<short explanation>"
}}

Title: {title}

Comments:
{comments_json}
"#
    )
}

/// Scores work items one model call at a time.
#[derive(Clone)]
pub struct ItemScorer {
    model: Arc<dyn ModelClient>,
}

impl ItemScorer {
    /// Create a scorer around a model client.
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    /// Score a single work item.
    ///
    /// Never fails: an unreachable model yields a score-0 analysis carrying
    /// the error message.
    pub async fn score(&self, item: &WorkItem) -> Analysis {
        let title = item.title_or_default();
        let comments = normalize_comments(item.comments.as_ref());
        let prompt = build_score_prompt(title, &comments);

        let completion = match self.model.complete(&prompt).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!("Scoring failed for work item {}: {}", item.id_label(), e);
                return Analysis::failed(e.to_string());
            }
        };

        let raw_response = completion.trim().to_string();
        let decoded = decode_score(&raw_response);
        if !matches!(decoded, ScoreDecode::Structured { .. }) {
            debug!(
                "Work item {} answered with non-JSON output, used fallback: {:?}",
                item.id_label(),
                decoded
            );
        }
        let (score, reason) = decoded.into_parts(&raw_response);

        Analysis {
            score,
            reason,
            raw_response,
            error: None,
        }
    }
}
