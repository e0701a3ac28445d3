//! Work item sources.
//!
//! Work items come either from Azure DevOps or from a JSON file exported
//! earlier (or written by hand).

pub mod azure;

use crate::models::WorkItem;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

pub use azure::AzureDevOpsSource;

/// Something that can deliver a batch of work items.
#[async_trait]
pub trait WorkItemSource: Send + Sync {
    /// Short description for logs and report metadata.
    fn describe(&self) -> String;

    /// Fetch all work items in scope.
    async fn fetch_items(&self) -> Result<Vec<WorkItem>>;
}

/// Accepted layouts of a work item file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WorkItemsFile {
    /// A bare array of work items.
    Items(Vec<WorkItem>),
    /// The tracker envelope: `{"count": n, "workItems": [...]}`.
    Envelope {
        #[serde(rename = "workItems")]
        work_items: Vec<WorkItem>,
    },
}

/// Reads work items from a JSON file.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Parse the contents of a work item file.
    pub fn parse(content: &str) -> Result<Vec<WorkItem>> {
        let file: WorkItemsFile = serde_json::from_str(content)
            .context("Expected a JSON array of work items or {\"workItems\": [...]}")?;

        Ok(match file {
            WorkItemsFile::Items(items) => items,
            WorkItemsFile::Envelope { work_items } => work_items,
        })
    }
}

#[async_trait]
impl WorkItemSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch_items(&self) -> Result<Vec<WorkItem>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read work items from {}", self.path.display()))?;

        let items = Self::parse(&content)
            .with_context(|| format!("Failed to parse work items in {}", self.path.display()))?;

        info!("Loaded {} work items from {}", items.len(), self.path.display());
        Ok(items)
    }
}
