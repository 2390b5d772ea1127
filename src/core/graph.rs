//! Dependency graph resolution
//!
//! Builds the component dependency graph and computes the build order:
//! a depth-first topological sort where dependencies always precede their
//! dependents. Ordering is deterministic because roots are visited in
//! project declaration order and children in declared dependency order,
//! so the same project always builds in the same sequence.

use std::collections::{HashMap, HashSet};

use crate::core::component::ComponentDescriptor;
use crate::error::GraphError;

/// Dependency graph over the project's components
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Component names in project declaration order
    nodes: Vec<String>,
    /// Adjacency list: component -> dependencies, declared order
    edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Build the graph from loaded descriptors.
    ///
    /// Every dependency must name another component in the set;
    /// anything else is an `UnresolvedDependency`.
    pub fn from_components(components: &[ComponentDescriptor]) -> Result<Self, GraphError> {
        let mut graph = Self::default();
        for component in components {
            graph.nodes.push(component.name.clone());
            graph
                .edges
                .insert(component.name.clone(), component.dependencies.clone());
        }

        for component in components {
            for dependency in &component.dependencies {
                if !graph.edges.contains_key(dependency) {
                    return Err(GraphError::UnresolvedDependency {
                        component: component.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        Ok(graph)
    }

    /// All component names, in declaration order
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Declared dependencies of a component
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.edges.get(name).map_or(&[], Vec::as_slice)
    }

    /// Build order for the whole project
    pub fn resolve_all(&self) -> Result<Vec<String>, GraphError> {
        let mut visited = HashSet::new();
        let mut temp_visited = HashSet::new();
        let mut result = Vec::new();
        let mut path = Vec::new();

        for node in &self.nodes {
            if !visited.contains(node) {
                self.visit(node, &mut visited, &mut temp_visited, &mut result, &mut path)?;
            }
        }

        Ok(result)
    }

    /// Build order for a single target and its transitive dependencies
    pub fn resolve(&self, target: &str) -> Result<Vec<String>, GraphError> {
        if !self.edges.contains_key(target) {
            return Err(GraphError::UnknownTarget {
                name: target.to_string(),
            });
        }

        let mut visited = HashSet::new();
        let mut temp_visited = HashSet::new();
        let mut result = Vec::new();
        let mut path = Vec::new();

        self.visit(
            target,
            &mut visited,
            &mut temp_visited,
            &mut result,
            &mut path,
        )?;
        Ok(result)
    }

    fn visit(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        temp_visited: &mut HashSet<String>,
        result: &mut Vec<String>,
        path: &mut Vec<String>,
    ) -> Result<(), GraphError> {
        if temp_visited.contains(node) {
            // Cycle found; report only the cycle members, dropping any
            // acyclic prefix the traversal walked through first.
            let start = path.iter().position(|n| n == node).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].to_vec();
            cycle.push(node.to_string());
            return Err(GraphError::CyclicDependency { cycle });
        }

        if visited.contains(node) {
            return Ok(());
        }

        temp_visited.insert(node.to_string());
        path.push(node.to_string());

        if let Some(deps) = self.edges.get(node) {
            for dep in deps {
                self.visit(dep, visited, temp_visited, result, path)?;
            }
        }

        path.pop();
        temp_visited.remove(node);
        visited.insert(node.to_string());
        result.push(node.to_string());

        Ok(())
    }

    /// True when any dependency chain loops back on itself
    pub fn has_cycle(&self) -> bool {
        self.resolve_all().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::component::{ComponentDescriptor, SourceSpec};
    use proptest::prelude::*;

    fn component(name: &str, deps: &[&str]) -> ComponentDescriptor {
        ComponentDescriptor {
            name: name.to_string(),
            version: None,
            source: SourceSpec::Local {
                path: format!("vendor/{name}"),
            },
            dependencies: deps.iter().map(|d| (*d).to_string()).collect(),
            steps: Vec::new(),
            platforms: None,
            required_env: Vec::new(),
        }
    }

    // ============================================
    // Unit Tests
    // ============================================

    #[test]
    fn test_python_pip_cli_order() {
        let graph = DependencyGraph::from_components(&[
            component("python", &[]),
            component("pip", &["python"]),
            component("cli", &["python", "pip"]),
        ])
        .unwrap();

        let order = graph.resolve_all().unwrap();
        assert_eq!(order, vec!["python", "pip", "cli"]);
    }

    #[test]
    fn test_single_target_resolves_only_its_subtree() {
        let graph = DependencyGraph::from_components(&[
            component("python", &[]),
            component("pip", &["python"]),
            component("cli", &["python", "pip"]),
            component("docs", &[]),
        ])
        .unwrap();

        let order = graph.resolve("pip").unwrap();
        assert_eq!(order, vec!["python", "pip"]);
    }

    #[test]
    fn test_unknown_target() {
        let graph = DependencyGraph::from_components(&[component("python", &[])]).unwrap();
        let err = graph.resolve("ruby").unwrap_err();
        match err {
            GraphError::UnknownTarget { name } => assert_eq!(name, "ruby"),
            other => panic!("expected UnknownTarget, got {other:?}"),
        }
    }

    #[test]
    fn test_unresolved_dependency_detected_at_construction() {
        let err =
            DependencyGraph::from_components(&[component("cli", &["python"])]).unwrap_err();
        match err {
            GraphError::UnresolvedDependency {
                component,
                dependency,
            } => {
                assert_eq!(component, "cli");
                assert_eq!(dependency, "python");
            }
            other => panic!("expected UnresolvedDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_cycle_reports_member_chain() {
        let graph = DependencyGraph::from_components(&[
            component("a", &["b"]),
            component("b", &["a"]),
        ])
        .unwrap();

        assert!(graph.has_cycle());
        let err = graph.resolve_all().unwrap_err();
        match err {
            GraphError::CyclicDependency { cycle } => {
                assert_eq!(cycle, vec!["a", "b", "a"]);
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_cycle_chain_drops_acyclic_prefix() {
        // entry depends into a cycle it is not part of
        let graph = DependencyGraph::from_components(&[
            component("entry", &["a"]),
            component("a", &["b"]),
            component("b", &["a"]),
        ])
        .unwrap();

        let err = graph.resolve_all().unwrap_err();
        match err {
            GraphError::CyclicDependency { cycle } => {
                assert_eq!(cycle, vec!["a", "b", "a"]);
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let graph =
            DependencyGraph::from_components(&[component("a", &["a"])]).unwrap();
        let err = graph.resolve_all().unwrap_err();
        match err {
            GraphError::CyclicDependency { cycle } => assert_eq!(cycle, vec!["a", "a"]),
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_diamond_resolves_once() {
        let graph = DependencyGraph::from_components(&[
            component("base", &[]),
            component("left", &["base"]),
            component("right", &["base"]),
            component("top", &["left", "right"]),
        ])
        .unwrap();

        let order = graph.resolve_all().unwrap();
        assert_eq!(order, vec!["base", "left", "right", "top"]);
    }

    // ============================================
    // Property-Based Tests
    // ============================================

    /// Random DAGs: node i may only depend on nodes with smaller index,
    /// which makes cycles impossible by construction.
    fn dag_strategy() -> impl Strategy<Value = Vec<ComponentDescriptor>> {
        (2usize..10)
            .prop_flat_map(|n| {
                let deps = (0..n)
                    .map(|i| prop::collection::vec(0..n, 0..=i.min(4)))
                    .collect::<Vec<_>>();
                (Just(n), deps)
            })
            .prop_map(|(n, dep_indexes)| {
                (0..n)
                    .map(|i| {
                        let mut deps: Vec<String> = dep_indexes[i]
                            .iter()
                            .filter(|&&d| d < i)
                            .map(|d| format!("c{d}"))
                            .collect();
                        deps.sort();
                        deps.dedup();
                        let name = format!("c{i}");
                        let mut descriptor = component(&name, &[]);
                        descriptor.dependencies = deps;
                        descriptor
                    })
                    .collect()
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Every dependency appears before its dependent, and every
        /// component appears exactly once.
        #[test]
        fn prop_topological_order_is_sound(components in dag_strategy()) {
            let graph = DependencyGraph::from_components(&components).expect("valid DAG");
            let order = graph.resolve_all().expect("acyclic by construction");

            prop_assert_eq!(order.len(), components.len());
            for component in &components {
                let own = order.iter().position(|n| n == &component.name).expect("present");
                for dep in &component.dependencies {
                    let dep_pos = order.iter().position(|n| n == dep).expect("present");
                    prop_assert!(dep_pos < own, "{} must precede {}", dep, component.name);
                }
            }
        }

        /// Resolution is deterministic: the same graph yields the same
        /// order every time.
        #[test]
        fn prop_resolution_is_deterministic(components in dag_strategy()) {
            let graph = DependencyGraph::from_components(&components).expect("valid DAG");
            let first = graph.resolve_all().expect("acyclic");
            let second = graph.resolve_all().expect("acyclic");
            prop_assert_eq!(first, second);
        }

        /// Closing the loop from the first to the last node always
        /// turns a chain into a detected cycle.
        #[test]
        fn prop_closed_chain_is_cyclic(n in 2usize..8) {
            let components: Vec<ComponentDescriptor> = (0..n)
                .map(|i| {
                    let name = format!("c{i}");
                    let dep = if i == 0 { n - 1 } else { i - 1 };
                    let mut descriptor = component(&name, &[]);
                    descriptor.dependencies = vec![format!("c{dep}")];
                    descriptor
                })
                .collect();

            let graph = DependencyGraph::from_components(&components).expect("all names known");
            prop_assert!(graph.has_cycle());
        }
    }
}
