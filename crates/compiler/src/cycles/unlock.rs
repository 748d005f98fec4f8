use packforge_domain::{Condition, ContentId, ContentKind, PackModules};

use super::{CycleNode, SemanticError};
use crate::graph::{Digraph, IdArena};

struct GatedEntity<'a> {
    kind: ContentKind,
    id: &'a ContentId,
    location: String,
    gates: Vec<&'a Condition>,
}

fn gated_entities(modules: &PackModules) -> Vec<GatedEntity<'_>> {
    fn entity<'a>(
        kind: ContentKind,
        index: usize,
        id: &'a ContentId,
        gates: Vec<&'a Condition>,
    ) -> GatedEntity<'a> {
        GatedEntity {
            kind,
            id,
            location: format!("{}[{}]", kind.module_name(), index),
            gates,
        }
    }

    let mut out = Vec::new();
    for (i, e) in modules.resources.iter().enumerate() {
        out.push(entity(ContentKind::Resource, i, &e.id, e.unlock_condition.iter().collect()));
    }
    for (i, e) in modules.generators.iter().enumerate() {
        out.push(entity(ContentKind::Generator, i, &e.id, vec![&e.base_unlock]));
    }
    for (i, e) in modules.upgrades.iter().enumerate() {
        let gates = e.prerequisites.iter().chain(e.unlock_condition.iter()).collect();
        out.push(entity(ContentKind::Upgrade, i, &e.id, gates));
    }
    for (i, e) in modules.transforms.iter().enumerate() {
        out.push(entity(ContentKind::Transform, i, &e.id, e.unlock_condition.iter().collect()));
    }
    for (i, e) in modules.achievements.iter().enumerate() {
        out.push(entity(ContentKind::Achievement, i, &e.id, e.unlock_condition.iter().collect()));
    }
    for (i, e) in modules.prestige_layers.iter().enumerate() {
        out.push(entity(ContentKind::PrestigeLayer, i, &e.id, vec![&e.unlock_condition]));
    }
    out.sort_by(|a, b| a.id.cmp(b.id));
    out
}

/// Find the first unlock cycle in a pack.
///
/// Edge `X -> Y` when `X` is a monotonic reference in one of `Y`'s unlock
/// gates. Nodes are visited in id order; the first back edge found is
/// reported, rotated to start at its smallest id.
pub fn detect_unlock_cycle(modules: &PackModules) -> Result<(), SemanticError> {
    let entities = gated_entities(modules);
    let mut arena: IdArena<&ContentId> = IdArena::new();
    let mut nodes: Vec<&GatedEntity<'_>> = Vec::new();
    for entity in &entities {
        if arena.intern(entity.id) == nodes.len() {
            nodes.push(entity);
        }
    }

    let mut graph = Digraph::new(arena.len());
    for entity in &entities {
        let Some(target) = arena.get(&entity.id) else {
            continue;
        };
        for gate in &entity.gates {
            for reference in gate.monotonic_refs() {
                if let Some(source) = arena.get(&reference.id) {
                    graph.add_edge(source, target);
                }
            }
        }
    }

    let Some(mut cycle) = first_cycle(&graph) else {
        return Ok(());
    };

    // Node indices follow id order
    let smallest = cycle
        .iter()
        .enumerate()
        .min_by_key(|&(_, &node)| node)
        .map(|(position, _)| position)
        .unwrap_or(0);
    cycle.rotate_left(smallest);
    cycle.push(cycle[0]);

    let first = nodes[cycle[0]];
    tracing::debug!(entity = %first.id, length = cycle.len() - 1, "unlock cycle detected");
    Err(SemanticError::UnlockCycle {
        cycle: cycle
            .iter()
            .map(|&node| CycleNode {
                kind: nodes[node].kind,
                id: nodes[node].id.clone(),
            })
            .collect(),
        location: first.location.clone(),
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Iterative DFS; returns the nodes of the first back-edge cycle, unclosed.
fn first_cycle(graph: &Digraph) -> Option<Vec<usize>> {
    let mut marks = vec![Mark::Unvisited; graph.len()];

    for root in 0..graph.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::OnStack;
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

        while let Some(&(node, next_child)) = stack.last() {
            match graph.successors(node).get(next_child) {
                Some(&child) => {
                    if let Some(top) = stack.last_mut() {
                        top.1 += 1;
                    }
                    match marks[child] {
                        Mark::Unvisited => {
                            marks[child] = Mark::OnStack;
                            stack.push((child, 0));
                        }
                        Mark::OnStack => {
                            let start = stack.iter().position(|&(n, _)| n == child)?;
                            return Some(stack[start..].iter().map(|&(n, _)| n).collect());
                        }
                        Mark::Done => {}
                    }
                }
                None => {
                    marks[node] = Mark::Done;
                    stack.pop();
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn modules(value: serde_json::Value) -> PackModules {
        serde_json::from_value(value).unwrap()
    }

    fn generator(id: &str, base_unlock: serde_json::Value) -> serde_json::Value {
        json!({
            "id": id,
            "name": id,
            "produces": [],
            "purchase": {
                "currencyId": "gold",
                "costCurve": { "kind": "constant", "value": 1 }
            },
            "baseUnlock": base_unlock
        })
    }

    fn owns(id: &str) -> serde_json::Value {
        json!({ "kind": "generatorLevel", "generatorId": id, "level": { "kind": "constant", "value": 1 } })
    }

    #[test]
    fn test_acyclic_pack_passes() {
        let pack = modules(json!({
            "resources": [{ "id": "gold", "name": "Gold" }],
            "generators": [
                generator("mine", json!({ "kind": "always" })),
                generator("smelter", owns("mine")),
            ]
        }));
        assert!(detect_unlock_cycle(&pack).is_ok());
    }

    #[test]
    fn test_cycle_rotated_to_smallest_id() {
        let pack = modules(json!({
            "generators": [
                generator("zinc", owns("mine")),
                generator("mine", owns("zinc")),
            ]
        }));
        let err = detect_unlock_cycle(&pack).unwrap_err();
        let SemanticError::UnlockCycle { cycle, location } = err else {
            panic!("expected unlock cycle");
        };
        let ids: Vec<&str> = cycle.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["mine", "zinc", "mine"]);
        assert!(cycle.iter().all(|n| n.kind == ContentKind::Generator));
        assert_eq!(location, "generators[1]");
    }

    #[test]
    fn test_all_of_operands_count() {
        let pack = modules(json!({
            "generators": [
                generator("a", json!({ "kind": "allOf", "conditions": [owns("b"), { "kind": "always" }] })),
                generator("b", owns("a")),
            ]
        }));
        assert!(detect_unlock_cycle(&pack).is_err());
    }

    #[test]
    fn test_any_of_and_not_are_ignored() {
        let pack = modules(json!({
            "generators": [
                generator("a", json!({ "kind": "anyOf", "conditions": [owns("b"), { "kind": "always" }] })),
                generator("b", json!({ "kind": "not", "condition": owns("a") })),
            ]
        }));
        assert!(detect_unlock_cycle(&pack).is_ok());
    }

    #[test]
    fn test_cross_kind_cycle_reports_kinds() {
        let pack = modules(json!({
            "resources": [{
                "id": "gems",
                "name": "Gems",
                "unlockCondition": { "kind": "upgradeOwned", "upgradeId": "drill" }
            }],
            "upgrades": [{
                "id": "drill",
                "name": "Drill",
                "targets": [{ "kind": "global" }],
                "cost": {
                    "currencyId": "gems",
                    "costCurve": { "kind": "constant", "value": 10 }
                },
                "prerequisites": [{
                    "kind": "resourceThreshold",
                    "resourceId": "gems",
                    "amount": { "kind": "constant", "value": 5 }
                }]
            }]
        }));
        let message = detect_unlock_cycle(&pack).unwrap_err().to_string();
        assert!(message.contains("upgrade 'drill' -> resource 'gems' -> upgrade 'drill'"));
        assert!(message.contains("(at upgrades[0])"));
    }

    #[test]
    fn test_self_gate_is_a_cycle() {
        let pack = modules(json!({
            "resources": [{
                "id": "gold",
                "name": "Gold",
                "unlockCondition": {
                    "kind": "resourceThreshold",
                    "resourceId": "gold",
                    "amount": { "kind": "constant", "value": 1 }
                }
            }]
        }));
        let err = detect_unlock_cycle(&pack).unwrap_err();
        assert!(err.to_string().contains("resource 'gold' -> resource 'gold'"));
    }
}
