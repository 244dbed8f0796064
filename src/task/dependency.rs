//! Dependency validation for a submission batch.
//!
//! Runs client-side before a batch is submitted so obviously broken
//! dependency graphs fail fast. The backend remains the final authority:
//! a batch accepted here can still be rejected remotely, and that
//! rejection is surfaced as a normal operation error.

use std::collections::{HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use super::model::TaskDraft;

/// A hard dependency-validation failure. Any of these blocks submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    #[error("task '{identifier}' depends on itself")]
    SelfReference { identifier: String },

    #[error("task '{identifier}' depends on unknown task '{reference}'")]
    UnknownReference {
        identifier: String,
        reference: String,
    },

    #[error("dependency cycle between tasks: {}", participants.join(", "))]
    Cycle { participants: Vec<String> },
}

/// Validate the dependency graph of a batch of drafts.
///
/// Every entry in `depends_on` must name another draft in the batch or
/// an identifier in `known` (tasks the store already tracks). The graph
/// formed by batch-internal edges must be acyclic.
///
/// # Errors
/// Returns the first `SelfReference` or `UnknownReference` found, or a
/// `Cycle` naming every participating identifier (sorted for stable
/// messages).
pub fn validate_batch(
    batch: &[TaskDraft],
    known: &HashSet<String>,
) -> Result<(), DependencyError> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::with_capacity(batch.len());

    for draft in batch {
        let index = graph.add_node(draft.identifier.as_str());
        nodes.insert(draft.identifier.as_str(), index);
    }

    for draft in batch {
        for reference in &draft.depends_on {
            if reference == &draft.identifier {
                return Err(DependencyError::SelfReference {
                    identifier: draft.identifier.clone(),
                });
            }
            match nodes.get(reference.as_str()) {
                // Edge direction: task -> its dependency. Only
                // batch-internal edges can form a cycle; dependencies on
                // already-known tasks point outside the graph.
                Some(&dep_index) => {
                    graph.add_edge(nodes[draft.identifier.as_str()], dep_index, ());
                }
                None if known.contains(reference) => {}
                None => {
                    return Err(DependencyError::UnknownReference {
                        identifier: draft.identifier.clone(),
                        reference: reference.clone(),
                    });
                }
            }
        }
    }

    // Tarjan: any strongly connected component with more than one node
    // is a cycle (self-loops were already rejected above).
    for component in tarjan_scc(&graph) {
        if component.len() > 1 {
            let mut participants: Vec<String> = component
                .iter()
                .map(|&index| graph[index].to_string())
                .collect();
            participants.sort();
            return Err(DependencyError::Cycle { participants });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::model::{ModelTier, TaskDraft};

    fn draft(identifier: &str, depends_on: &[&str]) -> TaskDraft {
        TaskDraft::new(identifier, "analyze the dependency fixtures", ModelTier::Haiku)
            .with_dependencies(depends_on.iter().map(|s| s.to_string()).collect())
    }

    fn known(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_batch_is_valid() {
        assert!(validate_batch(&[], &known(&[])).is_ok());
    }

    #[test]
    fn dag_over_batch_is_accepted() {
        let batch = vec![
            draft("a", &[]),
            draft("b", &["a"]),
            draft("c", &["a", "b"]),
        ];
        assert!(validate_batch(&batch, &known(&[])).is_ok());
    }

    #[test]
    fn reference_to_known_task_is_accepted() {
        let batch = vec![draft("b", &["a"])];
        assert!(validate_batch(&batch, &known(&["a"])).is_ok());
    }

    #[test]
    fn unknown_reference_is_a_hard_error() {
        let batch = vec![draft("b", &["ghost"])];
        let err = validate_batch(&batch, &known(&["a"])).unwrap_err();
        assert_eq!(
            err,
            DependencyError::UnknownReference {
                identifier: "b".to_string(),
                reference: "ghost".to_string(),
            }
        );
    }

    #[test]
    fn self_reference_is_rejected() {
        let batch = vec![draft("a", &["a"])];
        let err = validate_batch(&batch, &known(&[])).unwrap_err();
        assert_eq!(
            err,
            DependencyError::SelfReference {
                identifier: "a".to_string()
            }
        );
    }

    #[test]
    fn two_task_cycle_is_rejected_with_participants() {
        let batch = vec![draft("a", &["b"]), draft("b", &["a"])];
        let err = validate_batch(&batch, &known(&[])).unwrap_err();
        match err {
            DependencyError::Cycle { participants } => {
                assert_eq!(participants, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected Cycle, got {:?}", other),
        }
    }

    #[test]
    fn longer_cycle_is_rejected() {
        let batch = vec![
            draft("a", &["c"]),
            draft("b", &["a"]),
            draft("c", &["b"]),
            draft("d", &["a"]),
        ];
        let err = validate_batch(&batch, &known(&[])).unwrap_err();
        match err {
            DependencyError::Cycle { participants } => {
                assert_eq!(
                    participants,
                    vec!["a".to_string(), "b".to_string(), "c".to_string()]
                );
            }
            other => panic!("expected Cycle, got {:?}", other),
        }
    }

    #[test]
    fn diamond_dependencies_are_not_a_cycle() {
        let batch = vec![
            draft("base", &[]),
            draft("left", &["base"]),
            draft("right", &["base"]),
            draft("top", &["left", "right"]),
        ];
        assert!(validate_batch(&batch, &known(&[])).is_ok());
    }
}
