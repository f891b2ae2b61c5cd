//! Dependency graph assembler.
//!
//! Orders intents so that every intent comes after everything it depends
//! on. Among intents with no ordering constraint between them, emission
//! order wins, which keeps plans reproducible.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use tracing::debug;

use crate::error::{PlanError, Result, StackPlanError};

use super::intent::ResourceIntent;

/// Topological sorter for resource intents.
#[derive(Debug, Default)]
pub struct DependencyAssembler;

impl DependencyAssembler {
    /// Creates a new assembler.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Orders intents topologically.
    ///
    /// Uses Kahn's algorithm with a min-heap over emission indices, so the
    /// earliest-emitted ready intent is always placed next.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate ids, on edges to unknown intents and on
    /// cycles. No partial order is ever returned.
    pub fn order(&self, intents: Vec<ResourceIntent>) -> Result<Vec<ResourceIntent>> {
        let mut index_by_id: HashMap<&str, usize> = HashMap::with_capacity(intents.len());
        for (idx, intent) in intents.iter().enumerate() {
            if index_by_id.insert(intent.id.as_str(), idx).is_some() {
                return Err(StackPlanError::Plan(PlanError::DuplicateIntent {
                    id: intent.id.clone(),
                }));
            }
        }

        let mut in_degree = vec![0usize; intents.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); intents.len()];

        for (idx, intent) in intents.iter().enumerate() {
            for dep in &intent.depends_on {
                let Some(&dep_idx) = index_by_id.get(dep.as_str()) else {
                    return Err(StackPlanError::Plan(PlanError::UnknownDependency {
                        intent: intent.id.clone(),
                        dependency: dep.clone(),
                    }));
                };
                in_degree[idx] += 1;
                dependents[dep_idx].push(idx);
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(idx, _)| Reverse(idx))
            .collect();

        let mut order = Vec::with_capacity(intents.len());
        while let Some(Reverse(idx)) = ready.pop() {
            order.push(idx);
            for &next in &dependents[idx] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() < intents.len() {
            let stuck: Vec<String> = intents
                .iter()
                .enumerate()
                .filter(|(idx, _)| in_degree[*idx] > 0)
                .map(|(_, intent)| intent.id.clone())
                .collect();
            return Err(StackPlanError::Plan(PlanError::CycleDetected { stuck }));
        }

        debug!(intents = order.len(), "Ordered intent graph");

        let mut slots: Vec<Option<ResourceIntent>> = intents.into_iter().map(Some).collect();
        Ok(order
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::intent::{IntentPayload, RemovalPolicy, TablePayload};

    fn intent(id: &str, deps: &[&str]) -> ResourceIntent {
        deps.iter().fold(
            ResourceIntent::new(
                id,
                IntentPayload::Table(TablePayload {
                    name: id.to_string(),
                    partition_key: String::from("id"),
                    ttl_attribute: None,
                    removal_policy: RemovalPolicy::Destroy,
                }),
            ),
            |acc, dep| acc.with_dependency(*dep),
        )
    }

    fn ids(intents: &[ResourceIntent]) -> Vec<&str> {
        intents.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn test_independent_intents_keep_emission_order() {
        let ordered = DependencyAssembler::new()
            .order(vec![intent("c", &[]), intent("a", &[]), intent("b", &[])])
            .unwrap();
        assert_eq!(ids(&ordered), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_dependency_moves_intent_later() {
        let ordered = DependencyAssembler::new()
            .order(vec![
                intent("deploy", &["sa"]),
                intent("ns", &[]),
                intent("sa", &["ns"]),
                intent("other", &[]),
            ])
            .unwrap();
        assert_eq!(ids(&ordered), vec!["ns", "sa", "deploy", "other"]);
    }

    #[test]
    fn test_cycle_detected() {
        let result = DependencyAssembler::new().order(vec![
            intent("root", &[]),
            intent("a", &["b"]),
            intent("b", &["a"]),
        ]);

        match result {
            Err(StackPlanError::Plan(PlanError::CycleDetected { stuck })) => {
                assert_eq!(stuck, vec!["a", "b"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let result = DependencyAssembler::new().order(vec![intent("a", &["a"])]);
        assert!(matches!(
            result,
            Err(StackPlanError::Plan(PlanError::CycleDetected { .. }))
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = DependencyAssembler::new().order(vec![intent("a", &[]), intent("a", &[])]);
        assert!(matches!(
            result,
            Err(StackPlanError::Plan(PlanError::DuplicateIntent { .. }))
        ));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let result = DependencyAssembler::new().order(vec![intent("a", &["ghost"])]);
        assert!(matches!(
            result,
            Err(StackPlanError::Plan(PlanError::UnknownDependency { .. }))
        ));
    }

    #[test]
    fn test_empty_input() {
        assert!(DependencyAssembler::new().order(Vec::new()).unwrap().is_empty());
    }
}
