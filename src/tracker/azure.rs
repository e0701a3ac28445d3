//! Azure DevOps work item client.
//!
//! Runs a WIQL query for recent items, fetches their fields in batches and
//! attaches each item's comment thread as plain text.

use super::WorkItemSource;
use crate::config::TrackerConfig;
use crate::models::{RawComment, RawComments, WorkItem, ASSIGNED_TO_FIELD, TITLE_FIELD};
use anyhow::{Context, Result};
use async_trait::async_trait;
use indicatif::ProgressBar;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

/// Azure DevOps caps the work items batch endpoint at this many ids.
const MAX_IDS_PER_REQUEST: usize = 200;

/// Fields copied from the tracker into each work item.
const PASSTHROUGH_FIELDS: [&str; 3] = ["System.Id", "System.TeamProject", "System.CreatedDate"];

#[derive(Debug, Deserialize)]
struct WiqlResponse {
    #[serde(default, rename = "workItems")]
    work_items: Vec<WorkItemReference>,
}

#[derive(Debug, Deserialize)]
struct WorkItemReference {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct WorkItemBatch {
    #[serde(default)]
    value: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct CommentList {
    #[serde(default)]
    comments: Vec<CommentRecord>,
}

#[derive(Debug, Deserialize)]
struct CommentRecord {
    #[serde(default)]
    text: Option<String>,
}

/// Fetches recent work items of one project.
pub struct AzureDevOpsSource {
    base_url: String,
    organization: String,
    project: String,
    pat: Option<String>,
    days: u32,
    work_item_type: String,
    api_version: String,
    http_client: reqwest::Client,
    progress: Option<ProgressBar>,
}

impl AzureDevOpsSource {
    /// Create a client; organization and project must be configured.
    pub fn new(config: &TrackerConfig, pat: Option<String>) -> Result<Self> {
        let organization = config
            .organization
            .clone()
            .filter(|o| !o.is_empty())
            .context("No Azure DevOps organization configured (--org or [tracker] organization)")?;
        let project = config
            .project
            .clone()
            .filter(|p| !p.is_empty())
            .context("No Azure DevOps project configured (--project or [tracker] project)")?;

        let http_client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: config.base_url.clone(),
            organization,
            project,
            pat: pat.filter(|p| !p.is_empty()),
            days: config.days,
            work_item_type: config.work_item_type.clone(),
            api_version: config.api_version.clone(),
            http_client,
            progress: None,
        })
    }

    /// Report comment fetching progress on the given bar.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// WIQL selecting recent items of the configured type.
    pub fn wiql_query(&self) -> String {
        format!(
            "SELECT [System.Id] FROM workitems \
             WHERE [System.CreatedDate] >= @Today - {} \
             AND [System.WorkItemType] = '{}' \
             AND [System.TeamProject] = '{}' \
             ORDER BY [System.Id] DESC",
            self.days,
            wiql_literal(&self.work_item_type),
            wiql_literal(&self.project)
        )
    }

    /// Build an API URL from path segments below the base URL.
    fn api_url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid tracker base URL: {}", self.base_url))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| anyhow::anyhow!("Tracker base URL cannot carry a path: {}", self.base_url))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.pat {
            Some(ref pat) => request.basic_auth("", Some(pat)),
            None => request,
        }
    }

    async fn run_wiql(&self) -> Result<Vec<u64>> {
        let url = self.api_url(
            &[self.organization.as_str(), self.project.as_str(), "_apis", "wit", "wiql"],
            &[("api-version", self.api_version.as_str())],
        )?;
        let query = self.wiql_query();
        debug!("WIQL: {}", query);

        let response = self
            .authorized(self.http_client.post(url))
            .json(&json!({ "query": query }))
            .send()
            .await
            .with_context(|| format!("Failed to reach Azure DevOps at {}", self.base_url))?
            .error_for_status()
            .context("WIQL query was rejected")?;

        let wiql: WiqlResponse = response
            .json()
            .await
            .context("Failed to parse WIQL response")?;

        Ok(wiql.work_items.into_iter().map(|r| r.id).collect())
    }

    async fn fetch_details(&self, ids: &[u64]) -> Result<Vec<Value>> {
        let mut details = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_IDS_PER_REQUEST) {
            let id_list = chunk
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(",");
            let url = self.api_url(
                &[self.organization.as_str(), "_apis", "wit", "workitems"],
                &[
                    ("ids", id_list.as_str()),
                    ("$expand", "fields"),
                    ("api-version", self.api_version.as_str()),
                ],
            )?;

            let batch: WorkItemBatch = self
                .authorized(self.http_client.get(url))
                .send()
                .await
                .context("Failed to fetch work item details")?
                .error_for_status()
                .context("Work item details request was rejected")?
                .json()
                .await
                .context("Failed to parse work item details")?;

            details.extend(batch.value);
        }

        Ok(details)
    }

    /// Comment texts for one item; any failure yields no comments.
    async fn fetch_comments(&self, id: u64) -> Vec<String> {
        let api_version = format!("{}-preview.3", self.api_version);
        let id = id.to_string();
        let url = match self.api_url(
            &[self.organization.as_str(), self.project.as_str(), "_apis", "wit", "workItems", id.as_str(), "comments"],
            &[("api-version", api_version.as_str())],
        ) {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping comments for work item {}: {}", id, e);
                return Vec::new();
            }
        };

        let response = match self.authorized(self.http_client.get(url)).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!("Comments for work item {} returned {}", id, response.status());
                return Vec::new();
            }
            Err(e) => {
                warn!("Failed to fetch comments for work item {}: {}", id, e);
                return Vec::new();
            }
        };

        match response.json::<CommentList>().await {
            Ok(list) => list
                .comments
                .into_iter()
                .map(|c| clean_comment_html(c.text.as_deref().unwrap_or_default()))
                .collect(),
            Err(e) => {
                warn!("Unreadable comments for work item {}: {}", id, e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl WorkItemSource for AzureDevOpsSource {
    fn describe(&self) -> String {
        format!("{}/{}", self.organization, self.project)
    }

    async fn fetch_items(&self) -> Result<Vec<WorkItem>> {
        info!(
            "Querying {} items in {} created in the last {} days",
            self.work_item_type,
            self.describe(),
            self.days
        );

        let ids = self.run_wiql().await?;
        if ids.is_empty() {
            info!("No matching work items");
            return Ok(Vec::new());
        }
        info!("WIQL matched {} work items", ids.len());

        let details = self.fetch_details(&ids).await?;

        if let Some(ref pb) = self.progress {
            pb.set_length(details.len() as u64);
        }

        let mut items = Vec::with_capacity(details.len());
        for raw in &details {
            let comments = match raw.get("id").and_then(Value::as_u64) {
                Some(id) => self.fetch_comments(id).await,
                None => Vec::new(),
            };
            match shape_work_item(raw, comments) {
                Some(item) => items.push(item),
                None => warn!("Skipping malformed work item: {}", raw),
            }
            if let Some(ref pb) = self.progress {
                pb.inc(1);
            }
        }

        if let Some(ref pb) = self.progress {
            pb.finish_with_message("Work items fetched");
        }

        Ok(items)
    }
}

/// Quote a value for use inside a WIQL string literal.
fn wiql_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Reduce a tracker work item to the fields the analysis and report use.
fn shape_work_item(raw: &Value, comments: Vec<String>) -> Option<WorkItem> {
    let id = raw.get("id")?.clone();
    let source_fields = raw.get("fields").and_then(Value::as_object);
    let field = |name: &str| {
        source_fields
            .and_then(|f| f.get(name))
            .cloned()
            .unwrap_or(Value::Null)
    };

    let mut fields = Map::new();
    for name in PASSTHROUGH_FIELDS {
        fields.insert(name.to_string(), field(name));
    }
    fields.insert(TITLE_FIELD.to_string(), field(TITLE_FIELD));

    let assigned_to = match field(ASSIGNED_TO_FIELD) {
        Value::Null => Value::Null,
        identity => json!({ "displayName": identity.get("displayName").cloned().unwrap_or(Value::Null) }),
    };
    fields.insert(ASSIGNED_TO_FIELD.to_string(), assigned_to);

    Some(WorkItem {
        id,
        fields,
        comments: Some(RawComments::Thread(
            comments.into_iter().map(RawComment::PlainText).collect(),
        )),
        extra: Map::new(),
    })
}

/// Strip HTML tags and common entities from a comment body.
pub fn clean_comment_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        match rest[open..].find('>') {
            Some(close) => {
                text.push_str(&rest[..open]);
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    text.push_str(rest);

    text.replace("&amp;nbsp;", " ")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}
