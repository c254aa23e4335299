//! Notification graph checks.
use std::collections::{HashMap, HashSet};

use super::ResourcePlan;
use crate::error::PlanError;

/// Validate the structural invariants of `plan`.
pub(super) fn validate(plan: &ResourcePlan) -> Result<(), PlanError> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(plan.actions.len());
    for (i, action) in plan.actions.iter().enumerate() {
        if index.insert(action.id.as_str(), i).is_some() {
            return Err(PlanError::DuplicateAction(action.id.to_string()));
        }
    }

    let mut adjacency: Vec<(usize, usize)> = Vec::with_capacity(plan.edges.len());
    for edge in &plan.edges {
        let endpoint = |id: &str| {
            index.get(id).copied().ok_or_else(|| PlanError::UnknownAction {
                source_id: edge.source.to_string(),
                target: id.to_string(),
            })
        };
        let from = endpoint(edge.source.as_str())?;
        let to = endpoint(edge.target.as_str())?;
        if to < from {
            return Err(PlanError::BackwardEdge {
                source_id: edge.source.to_string(),
                target: edge.target.to_string(),
            });
        }
        adjacency.push((from, to));
    }

    if has_cycle(plan.actions.len(), &adjacency) {
        return Err(PlanError::Cycle);
    }
    Ok(())
}

/// Detect cycles in a directed graph using Kahn's algorithm.
///
/// Nodes are `0..node_count`; edges are `(from, to)` pairs. Returns `true`
/// if at least one cycle exists (a self-loop counts).
pub(super) fn has_cycle(node_count: usize, edges: &[(usize, usize)]) -> bool {
    let unique: HashSet<(usize, usize)> = edges.iter().copied().collect();

    let mut in_degree = vec![0usize; node_count];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for &(from, to) in &unique {
        if let (Some(count), Some(next)) = (in_degree.get_mut(to), successors.get_mut(from)) {
            *count += 1;
            next.push(to);
        }
    }

    let mut queue: Vec<usize> = in_degree
        .iter()
        .enumerate()
        .filter_map(|(i, &d)| (d == 0).then_some(i))
        .collect();
    let mut processed = 0usize;

    while let Some(idx) = queue.pop() {
        processed += 1;
        if let Some(next) = successors.get(idx) {
            for &n in next {
                if let Some(count) = in_degree.get_mut(n) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push(n);
                    }
                }
            }
        }
    }

    processed != node_count
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::plan::{
        ActionId, ActionKind, ActionPayload, NotificationEdge, NotifyTiming, NotifyVerb,
        ResourceAction,
    };

    fn service(name: &str) -> ResourceAction {
        ResourceAction::new(ActionPayload::ServiceStart {
            service: name.to_string(),
        })
    }

    fn edge(source: &str, target: &str) -> NotificationEdge {
        NotificationEdge {
            source: ActionId::new(ActionKind::ServiceStart, source),
            target: ActionId::new(ActionKind::ServiceStart, target),
            verb: NotifyVerb::Restart,
            timing: NotifyTiming::Delayed,
        }
    }

    fn plan(names: &[&str], edges: Vec<NotificationEdge>) -> ResourcePlan {
        ResourcePlan {
            actions: names.iter().map(|n| service(n)).collect(),
            edges,
        }
    }

    // -----------------------------------------------------------------------
    // has_cycle
    // -----------------------------------------------------------------------

    #[test]
    fn no_cycle_without_edges() {
        assert!(!has_cycle(3, &[]));
    }

    #[test]
    fn no_cycle_diamond() {
        assert!(!has_cycle(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]));
    }

    #[test]
    fn cycle_detected() {
        assert!(has_cycle(2, &[(0, 1), (1, 0)]));
    }

    #[test]
    fn self_loop_is_a_cycle() {
        assert!(has_cycle(1, &[(0, 0)]));
    }

    #[test]
    fn duplicate_edges_are_not_a_cycle() {
        assert!(!has_cycle(2, &[(0, 1), (0, 1)]));
    }

    // -----------------------------------------------------------------------
    // validate
    // -----------------------------------------------------------------------

    #[test]
    fn forward_edges_are_valid() {
        let p = plan(&["a", "b", "c"], vec![edge("a", "c"), edge("b", "c")]);
        assert!(validate(&p).is_ok());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let p = plan(&["a", "a"], vec![]);
        assert_eq!(
            validate(&p),
            Err(PlanError::DuplicateAction("service_start[a]".to_string()))
        );
    }

    #[test]
    fn unknown_target_is_rejected() {
        let p = plan(&["a"], vec![edge("a", "ghost")]);
        assert!(matches!(
            validate(&p),
            Err(PlanError::UnknownAction { target, .. }) if target == "service_start[ghost]"
        ));
    }

    #[test]
    fn backward_edge_is_rejected() {
        let p = plan(&["a", "b"], vec![edge("b", "a")]);
        assert!(matches!(validate(&p), Err(PlanError::BackwardEdge { .. })));
    }

    #[test]
    fn self_edge_is_a_cycle() {
        let p = plan(&["a"], vec![edge("a", "a")]);
        assert_eq!(validate(&p), Err(PlanError::Cycle));
    }
}
