//! Markdown report generation.
//!
//! This module renders the workload report: team summary buckets, the
//! per-member workload table and the task breakdown behind it.

use crate::analysis::comments::normalize_comments;
use crate::analysis::{heaviest_tasks, ranked_by_load, team_total};
use crate::config::ReportConfig;
use crate::models::{
    id_label, AssigneeGroup, ReportMetadata, ScoredItem, TaskLoad, TeamSummary, WorkloadReport,
};
use anyhow::Result;
use std::collections::HashMap;

/// Number of tasks listed in the heaviest tasks table.
const HEAVIEST_TASK_COUNT: usize = 5;

/// Longest raw completion shown inline before it is cut off.
const MAX_RAW_CHARS: usize = 2000;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &WorkloadReport, options: &ReportConfig) -> String {
    let mut output = String::new();

    output.push_str("# Team Workload Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_team_summary_section(&report.team_summary));
    output.push_str(&generate_workload_section(&report.workload));
    output.push_str(&generate_breakdown_section(report, options));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model Used:** `{}`\n", metadata.model_used));
    section.push_str(&format!(
        "- **Work Items Analyzed:** {}\n",
        metadata.items_analyzed
    ));
    if metadata.items_failed > 0 {
        section.push_str(&format!(
            "- **Items Not Scored:** {}\n",
            metadata.items_failed
        ));
    }
    section.push_str(&format!("- **Team Members:** {}\n", metadata.members));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the team summary section with one subsection per bucket.
fn generate_team_summary_section(summary: &TeamSummary) -> String {
    let mut section = String::new();

    section.push_str("## Team Summary\n\n");

    if let Some(ref error) = summary.error {
        section.push_str(&format!(
            "> ⚠️ The team summary could not be generated: {}\n\n",
            error
        ));
    }

    for (bucket, members) in summary.buckets() {
        section.push_str(&format!("### {} {}\n\n", bucket.emoji(), bucket));

        if members.is_empty() {
            section.push_str(&format!("*{}*\n\n", bucket.empty_text()));
            continue;
        }

        for member in members {
            if member.reason.is_empty() {
                section.push_str(&format!("- **{}**\n", member.name));
            } else {
                section.push_str(&format!("- **{}**: {}\n", member.name, member.reason));
            }
        }
        section.push('\n');
    }

    if let Some(ref raw) = summary.raw {
        section.push_str("> ⚠️ The model's summary was not valid JSON. Raw output:\n\n");
        section.push_str(&fenced(raw));
    }

    section
}

/// Generate the workload table and the heaviest tasks list.
fn generate_workload_section(workload: &[AssigneeGroup]) -> String {
    let mut section = String::new();

    section.push_str("## Workload by Member\n\n");

    if workload.is_empty() {
        section.push_str("No work items were found for the selected period.\n\n");
        return section;
    }

    section.push_str("| Member | Total Score | Tasks | Average |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");
    for group in ranked_by_load(workload) {
        section.push_str(&format!(
            "| {} | {} | {} | {:.1} |\n",
            escape_cell(&group.name),
            group.total_score,
            group.task_count(),
            group.average_score()
        ));
    }
    section.push_str(&format!(
        "| **Team** | **{}** | **{}** | |\n\n",
        team_total(workload),
        workload.iter().map(AssigneeGroup::task_count).sum::<usize>()
    ));

    let heaviest = heaviest_tasks(workload, HEAVIEST_TASK_COUNT);
    if !heaviest.is_empty() {
        section.push_str("### Heaviest Tasks\n\n");
        section.push_str("| Score | Task | Member |\n");
        section.push_str("|:---:|:---|:---|\n");
        for (member, task) in heaviest {
            section.push_str(&format!(
                "| {} | {} | {} |\n",
                task.score,
                escape_cell(&task.title),
                escape_cell(member)
            ));
        }
        section.push('\n');
    }

    section
}

/// Generate the per-member task breakdown.
fn generate_breakdown_section(report: &WorkloadReport, options: &ReportConfig) -> String {
    if report.workload.is_empty() {
        return String::new();
    }

    // Groups list their tasks in input order, so the n-th task of a member
    // is that member's n-th analyzed item. Ids may repeat or be missing.
    let mut by_member: HashMap<&str, Vec<&ScoredItem>> = HashMap::new();
    for scored in &report.analyzed_items {
        by_member
            .entry(scored.item.assignee_or_unassigned())
            .or_default()
            .push(scored);
    }

    let mut section = String::new();
    section.push_str("## Task Breakdown\n\n");

    for group in ranked_by_load(&report.workload) {
        section.push_str(&format!(
            "### {} ({} points)\n\n",
            group.name, group.total_score
        ));

        let items = by_member
            .get(group.name.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();
        let mut tasks: Vec<(&TaskLoad, Option<&ScoredItem>)> = group
            .tasks
            .iter()
            .enumerate()
            .map(|(i, task)| (task, items.get(i).copied()))
            .collect();
        tasks.sort_by_key(|(task, _)| std::cmp::Reverse(task.score));

        for (task, scored) in tasks {
            section.push_str(&format!(
                "- **#{} {}**: {}/10",
                id_label(&task.id),
                task.title,
                task.score
            ));
            if !task.reason.is_empty() {
                section.push_str(&format!(" - {}", task.reason));
            }
            section.push('\n');

            let Some(scored) = scored else {
                continue;
            };

            if let Some(ref error) = scored.analysis.error {
                section.push_str(&format!("  - ⚠️ Not scored: {}\n", error));
            }

            if options.include_comments {
                for comment in normalize_comments(scored.item.comments.as_ref()) {
                    if !comment.is_empty() {
                        section.push_str(&format!("  - 💬 {}\n", single_line(&comment)));
                    }
                }
            }

            if options.include_raw_responses && !scored.analysis.raw_response.is_empty() {
                section.push_str("\n<details>\n<summary>Model output</summary>\n\n");
                section.push_str(&fenced(&scored.analysis.raw_response));
                section.push_str("</details>\n\n");
            }
        }
        section.push('\n');
    }

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by WorkBalance v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &WorkloadReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Wrap text in a code block, cutting very long output.
fn fenced(text: &str) -> String {
    let shown: String = text.chars().take(MAX_RAW_CHARS).collect();
    let ellipsis = if shown.len() < text.len() { "\n..." } else { "" };
    format!("```\n{}{}\n```\n\n", shown.replace("```", "'''"), ellipsis)
}

fn escape_cell(text: &str) -> String {
    single_line(text).replace('|', "\\|")
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
