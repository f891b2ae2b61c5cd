//! Deployment plan types.
//!
//! A plan is the canonical, ordered list of intents handed to a backend,
//! together with the fingerprint of the descriptor it came from.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::intent::{IntentKind, ResourceIntent};

/// A complete deployment plan.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentPlan {
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Hash of the descriptor this plan is based on.
    pub descriptor_hash: String,
    /// Target region, if configured.
    pub region: Option<String>,
    /// Intents in execution order.
    pub intents: Vec<ResourceIntent>,
}

impl DeploymentPlan {
    /// Creates a plan from already ordered intents.
    #[must_use]
    pub fn new(descriptor_hash: &str, region: Option<String>, intents: Vec<ResourceIntent>) -> Self {
        Self {
            created_at: Utc::now(),
            descriptor_hash: descriptor_hash.to_string(),
            region,
            intents,
        }
    }

    /// Returns true if the plan is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Returns the number of intents.
    #[must_use]
    pub const fn intent_count(&self) -> usize {
        self.intents.len()
    }

    /// Returns the number of intents of a kind.
    #[must_use]
    pub fn count_of(&self, kind: IntentKind) -> usize {
        self.intents.iter().filter(|i| i.kind == kind).count()
    }

    /// Returns intent counts per kind.
    #[must_use]
    pub fn counts_by_kind(&self) -> BTreeMap<IntentKind, usize> {
        let mut counts = BTreeMap::new();
        for intent in &self.intents {
            *counts.entry(intent.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Returns the ordered intent ids.
    #[must_use]
    pub fn intent_ids(&self) -> Vec<&str> {
        self.intents.iter().map(|i| i.id.as_str()).collect()
    }

    /// Finds an intent by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ResourceIntent> {
        self.intents.iter().find(|i| i.id == id)
    }

    /// Returns the plan position of an intent.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.intents.iter().position(|i| i.id == id)
    }

    /// Groups intents into waves a backend may run concurrently.
    ///
    /// Wave N only contains intents whose dependencies all sit in waves
    /// 0..N. Within a wave, plan order is kept.
    #[must_use]
    pub fn waves(&self) -> Vec<Vec<&ResourceIntent>> {
        let mut depth: HashMap<&str, usize> = HashMap::with_capacity(self.intents.len());
        let mut waves: Vec<Vec<&ResourceIntent>> = Vec::new();

        for intent in &self.intents {
            let level = intent
                .depends_on
                .iter()
                .filter_map(|dep| depth.get(dep.as_str()))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            depth.insert(intent.id.as_str(), level);

            if waves.len() <= level {
                waves.resize_with(level + 1, Vec::new);
            }
            waves[level].push(intent);
        }

        waves
    }

    /// Checks that every intent comes after all of its dependencies.
    #[must_use]
    pub fn is_topologically_ordered(&self) -> bool {
        let positions: HashMap<&str, usize> = self
            .intents
            .iter()
            .enumerate()
            .map(|(idx, i)| (i.id.as_str(), idx))
            .collect();

        self.intents.iter().enumerate().all(|(idx, intent)| {
            intent
                .depends_on
                .iter()
                .all(|dep| positions.get(dep.as_str()).is_some_and(|p| *p < idx))
        })
    }
}

impl std::fmt::Display for DeploymentPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.intents.is_empty() {
            return write!(f, "Nothing to provision");
        }

        writeln!(f, "Deployment Plan ({} intents):", self.intents.len())?;
        for (i, intent) in self.intents.iter().enumerate() {
            writeln!(f, "  {i}. {intent}")?;
        }

        Ok(())
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

    fn plan() -> DeploymentPlan {
        DeploymentPlan::new(
            "abc",
            None,
            vec![
                intent("a", &[]),
                intent("b", &[]),
                intent("c", &["a"]),
                intent("d", &["c", "b"]),
            ],
        )
    }

    #[test]
    fn test_waves() {
        let plan = plan();
        let waves: Vec<Vec<&str>> = plan
            .waves()
            .iter()
            .map(|w| w.iter().map(|i| i.id.as_str()).collect())
            .collect();
        assert_eq!(waves, vec![vec!["a", "b"], vec!["c"], vec!["d"]]);
    }

    #[test]
    fn test_topological_check() {
        assert!(plan().is_topologically_ordered());

        let reversed = DeploymentPlan::new("abc", None, vec![intent("c", &["a"]), intent("a", &[])]);
        assert!(!reversed.is_topologically_ordered());
    }

    #[test]
    fn test_counts() {
        let plan = plan();
        assert_eq!(plan.count_of(IntentKind::Table), 4);
        assert_eq!(plan.counts_by_kind().get(&IntentKind::Table), Some(&4));
        assert_eq!(plan.position("d"), Some(3));
    }
}
