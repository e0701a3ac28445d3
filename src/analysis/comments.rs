//! Comment normalization.
//!
//! Trackers hand over comments as a thread of strings, a thread of records,
//! a single pre-joined string or nothing at all. Everything downstream works
//! on a plain `Vec<String>`.

use crate::models::{RawComment, RawComments};
use serde_json::Value;

/// Flatten a raw comment payload into ordered plain-text comments.
///
/// - a thread maps element-wise (records contribute their `text` field,
///   strings are kept verbatim, anything else is stringified);
/// - a single string becomes a one-element list, trimmed;
/// - any other shape, or no comments at all, yields an empty list.
pub fn normalize_comments(comments: Option<&RawComments>) -> Vec<String> {
    match comments {
        Some(RawComments::Thread(thread)) => thread.iter().map(comment_text).collect(),
        Some(RawComments::Single(text)) => vec![text.trim().to_string()],
        Some(RawComments::Other(_)) | None => Vec::new(),
    }
}

fn comment_text(comment: &RawComment) -> String {
    match comment {
        RawComment::PlainText(text) => text.clone(),
        RawComment::Structured(record) => match record.get("text") {
            Some(Value::String(text)) => text.clone(),
            None | Some(Value::Null) => String::new(),
            Some(other) => other.to_string(),
        },
        RawComment::Other(value) => value.to_string(),
    }
}
