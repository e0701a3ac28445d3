//! Workload aggregation and statistics.
//!
//! This module groups scored work items by assignee and computes the
//! per-member totals the team summary is built from.

use crate::models::{AssigneeGroup, ScoredItem, TaskLoad};
use std::collections::BTreeMap;

/// Group scored items by resolved assignee name.
///
/// Items without a non-empty display name land in `"Unassigned"`. Tasks
/// keep input order within their group; groups are keyed by name.
pub fn aggregate(scored_items: &[ScoredItem]) -> BTreeMap<String, AssigneeGroup> {
    let mut groups: BTreeMap<String, AssigneeGroup> = BTreeMap::new();

    for scored in scored_items {
        let name = scored.item.assignee_or_unassigned();
        let group = groups
            .entry(name.to_string())
            .or_insert_with(|| AssigneeGroup::new(name));

        group.tasks.push(TaskLoad {
            id: scored.item.id.clone(),
            title: scored.item.title_or_default().to_string(),
            score: scored.analysis.score,
            reason: scored.analysis.reason.clone(),
        });
        group.total_score += u32::from(scored.analysis.score);
    }

    groups
}

/// Total workload across all groups.
pub fn team_total(groups: &[AssigneeGroup]) -> u32 {
    groups.iter().map(|g| g.total_score).sum()
}

/// Members ordered by total score (heaviest first), ties by name.
pub fn ranked_by_load(groups: &[AssigneeGroup]) -> Vec<&AssigneeGroup> {
    let mut ranked: Vec<&AssigneeGroup> = groups.iter().collect();
    ranked.sort_by(|a, b| {
        b.total_score
            .cmp(&a.total_score)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked
}

/// Identify the heaviest tasks across the team.
pub fn heaviest_tasks(groups: &[AssigneeGroup], n: usize) -> Vec<(&str, &TaskLoad)> {
    let mut tasks: Vec<(&str, &TaskLoad)> = groups
        .iter()
        .flat_map(|g| g.tasks.iter().map(move |t| (g.name.as_str(), t)))
        .filter(|(_, t)| t.score > 0)
        .collect();

    tasks.sort_by_key(|(_, t)| std::cmp::Reverse(t.score));
    tasks.truncate(n);

    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Analysis, WorkItem, UNASSIGNED};
    use serde_json::json;

    fn create_scored_item(id: u64, assignee: Option<&str>, score: u8) -> ScoredItem {
        let assigned_to = match assignee {
            Some(name) => json!({"displayName": name}),
            None => json!(null),
        };
        let item: WorkItem = serde_json::from_value(json!({
            "id": id,
            "fields": {
                "System.Title": format!("Task {}", id),
                "System.AssignedTo": assigned_to,
            }
        }))
        .unwrap();

        ScoredItem {
            item,
            analysis: Analysis {
                score,
                reason: format!("reason {}", id),
                raw_response: String::new(),
                error: None,
            },
        }
    }

    #[test]
    fn test_aggregate_alice_and_bob() {
        let items = vec![
            create_scored_item(1, Some("Alice"), 9),
            create_scored_item(2, Some("Bob"), 2),
            create_scored_item(3, Some("Alice"), 8),
        ];

        let groups = aggregate(&items);

        assert_eq!(groups.len(), 2);
        let alice = &groups["Alice"];
        assert_eq!(alice.total_score, 17);
        assert_eq!(alice.task_count(), 2);
        assert_eq!(alice.tasks[0].title, "Task 1");
        assert_eq!(alice.tasks[1].title, "Task 3");
        assert_eq!(alice.tasks[1].reason, "reason 3");
        let bob = &groups["Bob"];
        assert_eq!(bob.total_score, 2);
        assert_eq!(bob.task_count(), 1);
    }

    #[test]
    fn test_missing_or_empty_assignee_is_unassigned() {
        let items = vec![
            create_scored_item(1, None, 3),
            create_scored_item(2, Some(""), 4),
            create_scored_item(3, Some("Carol"), 5),
        ];

        let groups = aggregate(&items);

        assert_eq!(groups[UNASSIGNED].task_count(), 2);
        assert_eq!(groups[UNASSIGNED].total_score, 7);
        let item_total: u32 = items.iter().map(|i| u32::from(i.analysis.score)).sum();
        let groups: Vec<AssigneeGroup> = groups.into_values().collect();
        assert_eq!(team_total(&groups), item_total);
    }

    #[test]
    fn test_aggregate_is_order_independent() {
        let items = vec![
            create_scored_item(1, Some("Alice"), 9),
            create_scored_item(2, Some("Bob"), 2),
            create_scored_item(3, Some("Alice"), 8),
            create_scored_item(4, None, 0),
        ];
        let mut reversed = items.clone();
        reversed.reverse();

        let forward = aggregate(&items);
        let backward = aggregate(&reversed);

        assert_eq!(forward.len(), backward.len());
        for (name, group) in &forward {
            let other = &backward[name];
            assert_eq!(group.total_score, other.total_score);

            let mut ids: Vec<String> = group.tasks.iter().map(|t| t.id.to_string()).collect();
            let mut other_ids: Vec<String> = other.tasks.iter().map(|t| t.id.to_string()).collect();
            ids.sort();
            other_ids.sort();
            assert_eq!(ids, other_ids);
        }
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate(&[]).is_empty());
    }

    #[test]
    fn test_ranked_by_load() {
        let items = vec![
            create_scored_item(1, Some("Bob"), 2),
            create_scored_item(2, Some("Alice"), 9),
            create_scored_item(3, Some("Carol"), 2),
        ];
        let groups: Vec<AssigneeGroup> = aggregate(&items).into_values().collect();

        let names: Vec<&str> = ranked_by_load(&groups).into_iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
    }

    #[test]
    fn test_heaviest_tasks() {
        let items = vec![
            create_scored_item(1, Some("Bob"), 2),
            create_scored_item(2, Some("Alice"), 9),
            create_scored_item(3, Some("Carol"), 0),
            create_scored_item(4, Some("Alice"), 6),
        ];
        let groups: Vec<AssigneeGroup> = aggregate(&items).into_values().collect();

        let top = heaviest_tasks(&groups, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0], ("Alice", &groups[0].tasks[0]));
        assert_eq!(top[1].1.score, 6);
    }
}
