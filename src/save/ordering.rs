//! Load ordering for entities with `load_after` dependencies
//!
//! Entities are sorted depth-first: before an entity is emitted, every entity
//! it must load after is emitted. Traversal starts from entities in
//! registration order, so the result is deterministic. Any cycle fails the
//! whole sort; no partial order is ever returned.
//!
//! The walk uses an explicit stack instead of recursion, so very long
//! dependency chains cannot overflow the call stack.

use super::saveable::EntityHandle;
use super::types::SaveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

/// Orders node indices so every node comes after all of its predecessors
///
/// `predecessors[i]` lists the nodes that must precede node `i`. On a cycle,
/// returns `Err` with the index of the node where the cycle closed.
pub fn topological_order(predecessors: &[Vec<usize>]) -> Result<Vec<usize>, usize> {
    let count = predecessors.len();
    let mut state = vec![VisitState::Unvisited; count];
    let mut order = Vec::with_capacity(count);
    // (node, index of the next predecessor to look at)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..count {
        if state[root] != VisitState::Unvisited {
            continue;
        }
        state[root] = VisitState::InProgress;
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            if frame.1 < predecessors[node].len() {
                let next = predecessors[node][frame.1];
                frame.1 += 1;
                match state[next] {
                    VisitState::Unvisited => {
                        state[next] = VisitState::InProgress;
                        stack.push((next, 0));
                    }
                    VisitState::InProgress => return Err(next),
                    VisitState::Done => {}
                }
            } else {
                state[node] = VisitState::Done;
                order.push(node);
                stack.pop();
            }
        }
    }

    Ok(order)
}

/// Sorts entities into a safe load order
///
/// Each `load_after` type tag resolves to the first registered entity of that
/// type. Tags with no matching entity impose no constraint.
pub fn resolve_load_order(entities: &[EntityHandle]) -> Result<Vec<EntityHandle>, SaveError> {
    let type_tags: Vec<&'static str> = entities.iter().map(|e| e.borrow().type_tag()).collect();

    let predecessors: Vec<Vec<usize>> = entities
        .iter()
        .map(|entity| {
            entity
                .borrow()
                .load_after()
                .into_iter()
                .filter_map(|tag| type_tags.iter().position(|candidate| *candidate == tag))
                .collect()
        })
        .collect();

    match topological_order(&predecessors) {
        Ok(order) => Ok(order.into_iter().map(|i| entities[i].clone()).collect()),
        Err(node) => {
            let entity = entities[node].borrow().entity_id().to_string();
            log::error!("[Entity sorting] Circular dependency found ({})", entity);
            Err(SaveError::CyclicDependency { entity })
        }
    }
}
