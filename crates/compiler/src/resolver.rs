//! Workspace dependency resolution.
//!
//! Orders packs so every pack comes after the packs it `requires` (and after
//! present `optional` targets), and computes the failures that can be known
//! before any pack is normalized: missing required packs, unsatisfied version
//! ranges, conflicts, and `requires` cycles. Cascading failures ("depends on a
//! pack that failed to compile") are decided later, while compiling in order.
//!
//! The resolver never parses a full pack; it only reads the declaration
//! fields via [`PackDeclaration::from_document`].

use std::collections::{BTreeMap, BTreeSet};

use packforge_domain::{DependencyCollection, PackSlug};
use serde_json::Value;
use thiserror::Error;

use crate::graph::{Digraph, IdArena};
use crate::warnings::{codes, CompilerWarning};

/// Dependency-relevant subset of a pack document
#[derive(Debug, Clone, PartialEq)]
pub struct PackDeclaration {
    pub slug: PackSlug,
    pub version: Option<String>,
    pub dependencies: DependencyCollection,
}

impl PackDeclaration {
    pub fn new(slug: PackSlug, version: Option<String>, dependencies: DependencyCollection) -> Self {
        Self {
            slug,
            version,
            dependencies: dependencies.normalized(),
        }
    }

    /// Read `metadata.version` and `metadata.dependencies` leniently.
    ///
    /// Malformed declarations fall back to "no dependencies"; the normalizer
    /// reports them as schema issues when the pack is compiled.
    pub fn from_document(slug: PackSlug, document: &Value) -> Self {
        let metadata = document.get("metadata");
        let version = metadata
            .and_then(|m| m.get("version"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let dependencies = metadata
            .and_then(|m| m.get("dependencies"))
            .and_then(|d| serde_json::from_value::<DependencyCollection>(d.clone()).ok())
            .unwrap_or_default();
        Self::new(slug, version, dependencies)
    }
}

/// Why a pack cannot be compiled because of its dependencies
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyFailure {
    #[error("Pack '{pack}' requires missing dependencies: {}", .missing.join(", "))]
    Missing { pack: PackSlug, missing: Vec<String> },

    #[error("Pack '{pack}' requires '{dependency}' {range}, but found version {actual}")]
    VersionMismatch {
        pack: PackSlug,
        dependency: PackSlug,
        range: String,
        actual: String,
    },

    #[error("Dependency cycle detected: {}", .cycle.join(" -> "))]
    Cycle { pack: PackSlug, cycle: Vec<String> },

    #[error("Pack '{pack}' depends on '{dependency}', which failed to compile")]
    DependencyFailed { pack: PackSlug, dependency: PackSlug },

    #[error("Pack '{pack}' conflicts with '{conflict}', which is present in the workspace")]
    Conflict { pack: PackSlug, conflict: PackSlug },
}

/// Output of [`resolve_workspace`]
#[derive(Debug, Clone, Default)]
pub struct ResolutionPlan {
    /// Every pack, in compile order
    pub order: Vec<PackSlug>,
    /// Failures known before normalization
    pub failures: BTreeMap<PackSlug, DependencyFailure>,
    /// Non-fatal diagnostics per pack
    pub warnings: BTreeMap<PackSlug, Vec<CompilerWarning>>,
    /// Present `requires` targets per pack, for failure cascading
    requires: BTreeMap<PackSlug, Vec<PackSlug>>,
}

impl ResolutionPlan {
    /// Required packs of `slug` that exist in the workspace
    pub fn required_dependencies(&self, slug: &PackSlug) -> &[PackSlug] {
        self.requires.get(slug).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn failure(&self, slug: &PackSlug) -> Option<&DependencyFailure> {
        self.failures.get(slug)
    }

    pub fn warnings_for(&self, slug: &PackSlug) -> &[CompilerWarning] {
        self.warnings.get(slug).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Resolve ordering and pre-normalization failures for a workspace.
pub fn resolve_workspace(declarations: &[PackDeclaration]) -> ResolutionPlan {
    let mut sorted: Vec<&PackDeclaration> = declarations.iter().collect();
    sorted.sort_by(|a, b| a.slug.cmp(&b.slug));
    sorted.dedup_by(|a, b| a.slug == b.slug);

    let mut arena: IdArena<PackSlug> = IdArena::new();
    for declaration in &sorted {
        arena.intern(declaration.slug.clone());
    }
    let n = arena.len();

    let mut plan = ResolutionPlan::default();
    // dependency -> dependent, used for ordering
    let mut order_graph = Digraph::new(n);
    // dependent -> dependency, requires edges only, used for cycles
    let mut requires_graph = Digraph::new(n);
    let mut missing: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    let mut other_failures: BTreeMap<usize, DependencyFailure> = BTreeMap::new();

    for declaration in &sorted {
        let Some(idx) = arena.get(&declaration.slug) else {
            continue;
        };
        let deps = &declaration.dependencies;

        for edge in &deps.requires {
            match arena.get(&edge.pack_id) {
                Some(dep_idx) => {
                    order_graph.add_edge(dep_idx, idx);
                    requires_graph.add_edge(idx, dep_idx);
                    plan.requires
                        .entry(declaration.slug.clone())
                        .or_default()
                        .push(edge.pack_id.clone());

                    let target = sorted[dep_idx];
                    if let (Some(range), Some(actual)) = (&edge.version, &target.version) {
                        if !version_satisfies(actual, range) {
                            other_failures.entry(idx).or_insert(
                                DependencyFailure::VersionMismatch {
                                    pack: declaration.slug.clone(),
                                    dependency: edge.pack_id.clone(),
                                    range: range.clone(),
                                    actual: actual.clone(),
                                },
                            );
                        }
                    }
                }
                None => missing
                    .entry(idx)
                    .or_default()
                    .push(edge.pack_id.to_string()),
            }
        }

        for edge in &deps.optional {
            match arena.get(&edge.pack_id) {
                Some(dep_idx) if dep_idx != idx => order_graph.add_edge(dep_idx, idx),
                Some(_) => {}
                None => plan
                    .warnings
                    .entry(declaration.slug.clone())
                    .or_default()
                    .push(
                        CompilerWarning::new(
                            codes::OPTIONAL_DEPENDENCY_MISSING,
                            format!(
                                "Optional dependency '{}' is not present in the workspace",
                                edge.pack_id
                            ),
                        )
                        .at("metadata.dependencies.optional"),
                    ),
            }
        }

        for edge in &deps.conflicts {
            if arena.get(&edge.pack_id).is_some() && edge.pack_id != declaration.slug {
                other_failures
                    .entry(idx)
                    .or_insert(DependencyFailure::Conflict {
                        pack: declaration.slug.clone(),
                        conflict: edge.pack_id.clone(),
                    });
            }
        }
    }

    // Cycles first: they win over every other failure of the member.
    let mut cyclic = vec![false; n];
    for component in requires_graph.cyclic_components() {
        let start = component[0];
        let path = requires_graph
            .cycle_through(start, &component)
            .unwrap_or_else(|| vec![start, start]);
        let cycle: Vec<String> = path.iter().map(|&i| arena.id(i).to_string()).collect();
        for &member in &component {
            cyclic[member] = true;
            plan.failures.insert(
                arena.id(member).clone(),
                DependencyFailure::Cycle {
                    pack: arena.id(member).clone(),
                    cycle: cycle.clone(),
                },
            );
        }
    }

    for (idx, names) in missing {
        plan.failures
            .entry(arena.id(idx).clone())
            .or_insert(DependencyFailure::Missing {
                pack: arena.id(idx).clone(),
                missing: names,
            });
    }
    for (idx, failure) in other_failures {
        plan.failures.entry(arena.id(idx).clone()).or_insert(failure);
    }

    plan.order = topological_order(&order_graph, &requires_graph, &cyclic)
        .into_iter()
        .map(|i| arena.id(i).clone())
        .collect();
    plan
}

/// Kahn's algorithm with a sorted ready set (ties broken by slug).
///
/// When only cycles remain, the smallest pack whose outstanding `requires`
/// come solely from cyclic packs is released; such a pack always exists
/// unless every remaining pack is itself cyclic.
fn topological_order(order_graph: &Digraph, requires_graph: &Digraph, cyclic: &[bool]) -> Vec<usize> {
    let n = order_graph.len();
    let mut in_degree = vec![0usize; n];
    for node in 0..n {
        for &next in order_graph.successors(node) {
            in_degree[next] += 1;
        }
    }

    let mut placed = vec![false; n];
    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while order.len() < n {
        let next = match ready.pop_first() {
            Some(next) => next,
            None => {
                let remaining: Vec<usize> = (0..n).filter(|&i| !placed[i]).collect();
                remaining
                    .iter()
                    .copied()
                    .find(|&i| {
                        requires_graph
                            .successors(i)
                            .iter()
                            .all(|&dep| placed[dep] || cyclic[dep])
                    })
                    .unwrap_or(remaining[0])
            }
        };
        if placed[next] {
            continue;
        }
        placed[next] = true;
        order.push(next);

        for &dependent in order_graph.successors(next) {
            if placed[dependent] {
                continue;
            }
            in_degree[dependent] = in_degree[dependent].saturating_sub(1);
            if in_degree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }
    order
}

/// True when `actual` satisfies the semver `range`. Unparseable inputs fall
/// back to string equality.
pub fn version_satisfies(actual: &str, range: &str) -> bool {
    match (semver::Version::parse(actual), semver::VersionReq::parse(range)) {
        (Ok(version), Ok(req)) => req.matches(&version),
        _ => actual == range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packforge_domain::DependencyEdge;

    fn decl(slug: &str, requires: &[&str], optional: &[&str]) -> PackDeclaration {
        PackDeclaration::new(
            PackSlug::from(slug),
            Some("1.0.0".to_string()),
            DependencyCollection {
                requires: requires.iter().map(|s| DependencyEdge::new(s)).collect(),
                optional: optional.iter().map(|s| DependencyEdge::new(s)).collect(),
                ..DependencyCollection::default()
            },
        )
    }

    fn order(plan: &ResolutionPlan) -> Vec<&str> {
        plan.order.iter().map(PackSlug::as_str).collect()
    }

    #[test]
    fn test_dependencies_come_first() {
        let plan = resolve_workspace(&[decl("beta", &["alpha"], &[]), decl("alpha", &[], &[])]);
        assert_eq!(order(&plan), vec!["alpha", "beta"]);
        assert!(plan.failures.is_empty());
        assert_eq!(
            plan.required_dependencies(&PackSlug::from("beta")),
            &[PackSlug::from("alpha")]
        );
    }

    #[test]
    fn test_ties_broken_by_slug() {
        let plan = resolve_workspace(&[
            decl("zeta", &[], &[]),
            decl("mid", &["base"], &[]),
            decl("base", &[], &[]),
            decl("alpha", &[], &[]),
        ]);
        assert_eq!(order(&plan), vec!["alpha", "base", "mid", "zeta"]);
    }

    #[test]
    fn test_missing_required_dependency() {
        let plan = resolve_workspace(&[decl("beta", &["gamma", "delta"], &[])]);
        let failure = plan.failure(&PackSlug::from("beta")).unwrap();
        assert_eq!(
            failure.to_string(),
            "Pack 'beta' requires missing dependencies: delta, gamma"
        );
    }

    #[test]
    fn test_requires_cycle_fails_all_members() {
        let plan = resolve_workspace(&[
            decl("cycle-a", &["cycle-b"], &[]),
            decl("cycle-b", &["cycle-a"], &[]),
            decl("free", &[], &[]),
        ]);
        for slug in ["cycle-a", "cycle-b"] {
            let failure = plan.failure(&PackSlug::from(slug)).unwrap();
            assert!(failure.to_string().contains("Dependency cycle detected"));
            assert_eq!(
                failure.to_string(),
                "Dependency cycle detected: cycle-a -> cycle-b -> cycle-a"
            );
        }
        assert!(plan.failure(&PackSlug::from("free")).is_none());
        assert_eq!(plan.order.len(), 3);
    }

    #[test]
    fn test_optional_edges_order_but_never_fail() {
        let plan = resolve_workspace(&[
            decl("addon", &[], &["base", "ghost"]),
            decl("base", &[], &[]),
        ]);
        assert_eq!(order(&plan), vec!["base", "addon"]);
        assert!(plan.failures.is_empty());
        let warnings = plan.warnings_for(&PackSlug::from("addon"));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, codes::OPTIONAL_DEPENDENCY_MISSING);
        assert!(warnings[0].message.contains("ghost"));
    }

    #[test]
    fn test_optional_cycle_still_orders_requires() {
        // a -opt-> b, b requires c, c -opt-> a
        let plan = resolve_workspace(&[
            decl("a", &[], &["b"]),
            decl("b", &["c"], &[]),
            decl("c", &[], &["a"]),
        ]);
        assert!(plan.failures.is_empty());
        let order = order(&plan);
        let pos = |s: &str| order.iter().position(|x| *x == s).unwrap();
        assert!(pos("c") < pos("b"));
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn test_version_range_checked() {
        let mut beta = decl("beta", &[], &[]);
        beta.dependencies.requires = vec![DependencyEdge::new("alpha").with_version("^2.0.0")];
        let plan = resolve_workspace(&[beta, decl("alpha", &[], &[])]);
        let failure = plan.failure(&PackSlug::from("beta")).unwrap();
        assert!(matches!(failure, DependencyFailure::VersionMismatch { .. }));
        assert!(failure.to_string().contains("found version 1.0.0"));
    }

    #[test]
    fn test_conflict_present_fails() {
        let mut beta = decl("beta", &[], &[]);
        beta.dependencies.conflicts = vec![DependencyEdge::new("alpha")];
        let plan = resolve_workspace(&[beta, decl("alpha", &[], &[])]);
        assert!(matches!(
            plan.failure(&PackSlug::from("beta")),
            Some(DependencyFailure::Conflict { .. })
        ));
    }

    #[test]
    fn test_from_document_is_lenient() {
        let doc = serde_json::json!({
            "metadata": {
                "version": "2.1.0",
                "dependencies": { "requires": [{ "packId": "Base" }] }
            }
        });
        let declaration = PackDeclaration::from_document(PackSlug::from("x"), &doc);
        assert_eq!(declaration.version.as_deref(), Some("2.1.0"));
        assert_eq!(declaration.dependencies.requires[0].pack_id.as_str(), "base");

        let broken = serde_json::json!({ "metadata": { "dependencies": "nope" } });
        let declaration = PackDeclaration::from_document(PackSlug::from("y"), &broken);
        assert!(declaration.dependencies.is_empty());
    }

    #[test]
    fn test_version_satisfies() {
        assert!(version_satisfies("1.4.0", "^1.2"));
        assert!(!version_satisfies("2.0.0", "^1.2"));
        assert!(version_satisfies("1.0.0", ">=1.0.0, <2.0.0"));
        assert!(version_satisfies("custom", "custom"));
    }
}
