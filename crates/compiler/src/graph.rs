//! Index-based directed graphs
//!
//! String ids are interned once into an [`IdArena`]; traversals then work on
//! dense `usize` indices. All traversals are iterative with explicit stacks.

use std::borrow::Borrow;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Interns ids into dense indices, in insertion order
#[derive(Debug, Clone)]
pub(crate) struct IdArena<K> {
    ids: Vec<K>,
    index: HashMap<K, usize>,
}

impl<K: Clone + Eq + Hash> IdArena<K> {
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn intern(&mut self, id: K) -> usize {
        if let Some(&existing) = self.index.get(&id) {
            return existing;
        }
        let next = self.ids.len();
        self.ids.push(id.clone());
        self.index.insert(id, next);
        next
    }

    pub fn get<Q>(&self, id: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(id).copied()
    }

    pub fn id(&self, index: usize) -> &K {
        &self.ids[index]
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Adjacency-list digraph over `0..len` node indices
#[derive(Debug, Clone)]
pub(crate) struct Digraph {
    adjacency: Vec<Vec<usize>>,
}

impl Digraph {
    pub fn new(len: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); len],
        }
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// Add `from -> to`; duplicate edges are ignored
    pub fn add_edge(&mut self, from: usize, to: usize) {
        let successors = &mut self.adjacency[from];
        if let Err(position) = successors.binary_search(&to) {
            successors.insert(position, to);
        }
    }

    pub fn successors(&self, node: usize) -> &[usize] {
        &self.adjacency[node]
    }

    pub fn has_self_loop(&self, node: usize) -> bool {
        self.adjacency[node].binary_search(&node).is_ok()
    }

    fn transposed(&self) -> Digraph {
        let mut reversed = Digraph::new(self.len());
        for (from, successors) in self.adjacency.iter().enumerate() {
            for &to in successors {
                reversed.adjacency[to].push(from);
            }
        }
        reversed
    }

    /// Strongly connected components (Kosaraju), each sorted ascending.
    /// Components are returned in ascending order of their smallest member.
    pub fn strongly_connected_components(&self) -> Vec<Vec<usize>> {
        let n = self.len();

        // Pass 1: finish order
        let mut visited = vec![false; n];
        let mut finish_order = Vec::with_capacity(n);
        for root in 0..n {
            if visited[root] {
                continue;
            }
            visited[root] = true;
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            while let Some((node, next_child)) = stack.pop() {
                if let Some(&child) = self.adjacency[node].get(next_child) {
                    stack.push((node, next_child + 1));
                    if !visited[child] {
                        visited[child] = true;
                        stack.push((child, 0));
                    }
                } else {
                    finish_order.push(node);
                }
            }
        }

        // Pass 2: collect components on the transposed graph
        let reversed = self.transposed();
        let mut assigned = vec![false; n];
        let mut components = Vec::new();
        for &root in finish_order.iter().rev() {
            if assigned[root] {
                continue;
            }
            assigned[root] = true;
            let mut component = Vec::new();
            let mut stack = vec![root];
            while let Some(node) = stack.pop() {
                component.push(node);
                for &next in &reversed.adjacency[node] {
                    if !assigned[next] {
                        assigned[next] = true;
                        stack.push(next);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }

        components.sort_by_key(|component| component[0]);
        components
    }

    /// Components that contain a cycle: more than one member, or a self-loop
    pub fn cyclic_components(&self) -> Vec<Vec<usize>> {
        self.strongly_connected_components()
            .into_iter()
            .filter(|c| c.len() > 1 || self.has_self_loop(c[0]))
            .collect()
    }

    /// Shortest cycle through `start` that stays inside `members`.
    ///
    /// Returns the path `[start, ..., start]`, or `None` when `start` cannot
    /// reach itself inside the member set.
    pub fn cycle_through(&self, start: usize, members: &[usize]) -> Option<Vec<usize>> {
        let mut inside = vec![false; self.len()];
        for &m in members {
            inside[m] = true;
        }

        let mut parent: Vec<Option<usize>> = vec![None; self.len()];
        let mut seen = vec![false; self.len()];
        let mut queue = VecDeque::from([start]);
        seen[start] = true;

        while let Some(node) = queue.pop_front() {
            for &next in self.successors(node) {
                if !inside[next] {
                    continue;
                }
                if next == start {
                    let mut chain = vec![node];
                    let mut cursor = node;
                    while cursor != start {
                        cursor = parent[cursor]?;
                        chain.push(cursor);
                    }
                    chain.reverse();
                    chain.push(start);
                    return Some(chain);
                }
                if !seen[next] {
                    seen[next] = true;
                    parent[next] = Some(node);
                    queue.push_back(next);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(n: usize, edges: &[(usize, usize)]) -> Digraph {
        let mut g = Digraph::new(n);
        for &(from, to) in edges {
            g.add_edge(from, to);
        }
        g
    }

    #[test]
    fn test_arena_interns_once() {
        let mut arena: IdArena<String> = IdArena::new();
        assert_eq!(arena.intern("a".to_string()), 0);
        assert_eq!(arena.intern("b".to_string()), 1);
        assert_eq!(arena.intern("a".to_string()), 0);
        assert_eq!(arena.get("b"), Some(1));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_scc_finds_cycles() {
        let g = graph(5, &[(0, 1), (1, 2), (2, 0), (3, 4)]);
        assert_eq!(g.cyclic_components(), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_self_loop_is_cyclic() {
        let g = graph(2, &[(1, 1)]);
        assert_eq!(g.cyclic_components(), vec![vec![1]]);
    }

    #[test]
    fn test_cycle_through_start() {
        // a -> b -> c -> b, c -> a
        let g = graph(3, &[(0, 1), (1, 2), (2, 1), (2, 0)]);
        assert_eq!(g.cycle_through(0, &[0, 1, 2]), Some(vec![0, 1, 2, 0]));
        assert_eq!(g.cycle_through(1, &[0, 1, 2]), Some(vec![1, 2, 1]));
    }

    #[test]
    fn test_cycle_through_respects_members() {
        let g = graph(3, &[(0, 1), (1, 0), (1, 2), (2, 0)]);
        assert_eq!(g.cycle_through(2, &[0, 1]), None);
    }
}
