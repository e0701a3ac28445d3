//! Scoring-and-aggregation pipeline.
//!
//! Scores every work item (bounded concurrency, input order preserved),
//! groups the results per assignee and asks for the team summary once all
//! items have been scored.

use super::aggregator::aggregate;
use super::scorer::ItemScorer;
use super::summarizer::TeamSummarizer;
use crate::llm::ModelClient;
use crate::models::{AssigneeGroup, PipelineOutput, ScoredItem, TeamSummary, WorkItem};
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::sync::Arc;
use tracing::{debug, info};

/// Runs scoring, aggregation and summarization for one batch of items.
pub struct Pipeline {
    scorer: ItemScorer,
    summarizer: TeamSummarizer,
    concurrency: usize,
    progress: Option<ProgressBar>,
}

impl Pipeline {
    /// Create a pipeline that scores one item at a time.
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self {
            scorer: ItemScorer::new(model.clone()),
            summarizer: TeamSummarizer::new(model),
            concurrency: 1,
            progress: None,
        }
    }

    /// Allow up to `concurrency` scoring calls in flight.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Report scoring progress on the given bar.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run the pipeline. Always returns a well-formed output; model
    /// failures surface as sentinel analyses and summaries.
    pub async fn run(&self, work_items: Vec<WorkItem>) -> PipelineOutput {
        info!(
            "Scoring {} work items (concurrency {})",
            work_items.len(),
            self.concurrency
        );

        if let Some(ref pb) = self.progress {
            pb.set_length(work_items.len() as u64);
        }

        let analyses: Vec<_> = stream::iter(work_items.iter())
            .map(|item| async move {
                let analysis = self.scorer.score(item).await;
                if let Some(ref pb) = self.progress {
                    pb.inc(1);
                }
                analysis
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        if let Some(ref pb) = self.progress {
            pb.finish_with_message("Scoring complete");
        }

        let analyzed_items: Vec<ScoredItem> = work_items
            .into_iter()
            .zip(analyses)
            .map(|(item, analysis)| ScoredItem { item, analysis })
            .collect();

        let workload: Vec<AssigneeGroup> = aggregate(&analyzed_items).into_values().collect();
        debug!("Aggregated workload for {} members", workload.len());

        let team_summary = if workload.is_empty() {
            info!("No work items to summarize");
            TeamSummary::default()
        } else {
            info!("Requesting team summary for {} members", workload.len());
            self.summarizer.summarize(&workload).await
        };

        PipelineOutput {
            analyzed_items,
            workload,
            team_summary,
        }
    }
}
