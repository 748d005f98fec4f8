use packforge_domain::{ContentId, Transform};

use super::SemanticError;
use crate::graph::Digraph;

/// Loops whose ratio is within this margin of 1 are treated as break-even
pub const PROFIT_EPSILON: f64 = 1e-8;

/// A transform with one constant input and one constant output
#[derive(Debug, Clone, Copy)]
struct SimpleTransform<'a> {
    input: &'a ContentId,
    output: &'a ContentId,
    ratio: f64,
}

fn as_simple(transform: &Transform) -> Option<SimpleTransform<'_>> {
    let ([input], [output]) = (transform.inputs.as_slice(), transform.outputs.as_slice()) else {
        return None;
    };
    let spent = input.amount.as_constant()?;
    let gained = output.amount.as_constant()?;
    if !(spent > 0.0 && gained > 0.0 && spent.is_finite() && gained.is_finite()) {
        return None;
    }
    Some(SimpleTransform {
        input: &input.resource_id,
        output: &output.resource_id,
        ratio: gained / spent,
    })
}

/// Reject transform loops that create resources from nothing.
///
/// Loops that pass through a transform without a single constant
/// input/output pair cannot be priced and are rejected outright. The
/// remaining loops are found with Bellman-Ford over `-ln(ratio)` weights.
pub fn detect_profitable_transform_cycle(transforms: &[Transform]) -> Result<(), SemanticError> {
    let mut order: Vec<usize> = (0..transforms.len()).collect();
    order.sort_by(|&a, &b| transforms[a].id.cmp(&transforms[b].id));
    let sorted: Vec<&Transform> = order.iter().map(|&i| &transforms[i]).collect();
    let location = |node: usize| format!("transforms[{}]", order[node]);
    let ids = |path: &[usize]| -> Vec<ContentId> {
        path.iter().map(|&node| sorted[node].id.clone()).collect()
    };

    let simple: Vec<Option<SimpleTransform<'_>>> = sorted.iter().map(|t| as_simple(t)).collect();

    // Any output feeding any input
    let mut flow = Digraph::new(sorted.len());
    for (a, from) in sorted.iter().enumerate() {
        for (b, to) in sorted.iter().enumerate() {
            let feeds = from
                .outputs
                .iter()
                .any(|out| to.inputs.iter().any(|inp| inp.resource_id == out.resource_id));
            if feeds {
                flow.add_edge(a, b);
            }
        }
    }

    for component in flow.cyclic_components() {
        let Some(&start) = component.iter().find(|&&node| simple[node].is_none()) else {
            continue;
        };
        let path = flow
            .cycle_through(start, &component)
            .unwrap_or_else(|| vec![start, start]);
        tracing::debug!(transform = %sorted[start].id, "unevaluable transform cycle");
        return Err(SemanticError::UnevaluableTransformCycle {
            transforms: ids(&path),
            location: location(start),
        });
    }

    // Every cycle left consists of simple transforms only.
    let nodes: Vec<(usize, SimpleTransform<'_>)> = simple
        .iter()
        .enumerate()
        .filter_map(|(node, s)| s.map(|s| (node, s)))
        .collect();
    // Each edge carries a share of the break-even margin, so no simple loop
    // within rounding of ratio 1 can relax.
    let margin = (1.0 + PROFIT_EPSILON).ln() / nodes.len().max(1) as f64;
    let mut edges: Vec<(usize, usize, f64)> = Vec::new();
    for (a, from) in nodes.iter().enumerate() {
        for (b, to) in nodes.iter().enumerate() {
            if from.1.output == to.1.input {
                edges.push((a, b, -from.1.ratio.ln() + margin));
            }
        }
    }

    // A rejected loop loses its closing edge and the search runs again.
    let (cycle, ratio) = loop {
        let Some(cycle) = negative_cycle(nodes.len(), &edges) else {
            return Ok(());
        };
        let ratio: f64 = cycle.iter().map(|&n| nodes[n].1.ratio).product();
        if ratio > 1.0 + PROFIT_EPSILON {
            break (cycle, ratio);
        }
        tracing::debug!(ratio, "transform loop within rounding of break-even");
        let (Some(&last), Some(&first)) = (cycle.last(), cycle.first()) else {
            return Ok(());
        };
        edges.retain(|&(from, to, _)| !(from == last && to == first));
    };

    // Nodes are in id order, so the smallest index has the smallest id.
    let mut path: Vec<usize> = cycle.iter().map(|&n| nodes[n].0).collect();
    let smallest = path
        .iter()
        .enumerate()
        .min_by_key(|&(_, &node)| node)
        .map(|(position, _)| position)
        .unwrap_or(0);
    path.rotate_left(smallest);
    path.push(path[0]);

    Err(SemanticError::ProfitableTransformCycle {
        transforms: ids(&path),
        ratio,
        location: location(path[0]),
    })
}

/// Bellman-Ford from all-zero distances. Returns the nodes of a negative
/// cycle in edge order, unclosed.
fn negative_cycle(len: usize, edges: &[(usize, usize, f64)]) -> Option<Vec<usize>> {
    if len == 0 {
        return None;
    }
    let mut distance = vec![0.0_f64; len];
    let mut predecessor: Vec<Option<usize>> = vec![None; len];

    let mut last_relaxed = None;
    for _round in 0..len {
        let mut relaxed = None;
        for &(from, to, weight) in edges {
            let candidate = distance[from] + weight;
            if candidate < distance[to] {
                distance[to] = candidate;
                predecessor[to] = Some(from);
                relaxed = Some(to);
            }
        }
        relaxed?;
        last_relaxed = relaxed;
    }

    // Relaxed in round |V|: walk back far enough to land on the cycle.
    let mut node = last_relaxed?;
    for _ in 0..len {
        node = predecessor[node]?;
    }

    let mut cycle = vec![node];
    let mut cursor = predecessor[node]?;
    while cursor != node {
        cycle.push(cursor);
        cursor = predecessor[cursor]?;
    }
    cycle.reverse();
    Some(cycle)
}
