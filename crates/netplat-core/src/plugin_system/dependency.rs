use std::collections::{HashMap, HashSet};

use thiserror::Error;

/// Error that can occur when resolving the load order
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    /// Dependency cycle detected; the path starts and ends with the same plugin
    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    /// Other dependency resolution error
    #[error("Dependency error: {0}")]
    Other(String),
}

/// Declared inter-plugin dependencies, in registration order
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<(String, Vec<String>)>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plugin and the names it requires
    pub fn add(&mut self, name: impl Into<String>, requires: impl IntoIterator<Item = impl Into<String>>) {
        self.nodes
            .push((name.into(), requires.into_iter().map(Into::into).collect()));
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `(plugin, dependency)` pairs whose dependency is not in the graph
    pub fn missing(&self) -> Vec<(String, String)> {
        let known: HashSet<&str> = self.nodes.iter().map(|(n, _)| n.as_str()).collect();
        self.nodes
            .iter()
            .flat_map(|(name, requires)| {
                requires
                    .iter()
                    .filter(|dep| !known.contains(dep.as_str()))
                    .map(move |dep| (name.clone(), dep.clone()))
            })
            .collect()
    }

    /// Compute the load order.
    ///
    /// Depth-first post-order: every plugin is emitted after all of its
    /// known dependencies. Roots are visited in registration order, as are
    /// each plugin's `requires`, so independent plugins keep their relative
    /// registration order. Unknown dependencies are skipped with a warning.
    /// Any cycle, including a plugin requiring itself, is an error.
    pub fn resolve(&self) -> Result<Vec<String>, DependencyError> {
        let mut edges: HashMap<&str, &[String]> = HashMap::with_capacity(self.nodes.len());
        for (name, requires) in &self.nodes {
            if edges.insert(name.as_str(), requires.as_slice()).is_some() {
                return Err(DependencyError::Other(format!(
                    "Plugin '{}' appears more than once",
                    name
                )));
            }
        }

        let mut resolver = Resolver {
            edges: &edges,
            visited: HashSet::new(),
            path: Vec::new(),
            order: Vec::with_capacity(self.nodes.len()),
        };
        for (name, _) in &self.nodes {
            resolver.visit(name)?;
        }
        Ok(resolver.order)
    }
}

struct Resolver<'a> {
    edges: &'a HashMap<&'a str, &'a [String]>,
    visited: HashSet<&'a str>,
    /// Plugins on the current DFS path
    path: Vec<&'a str>,
    order: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn visit(&mut self, name: &'a str) -> Result<(), DependencyError> {
        if self.visited.contains(name) {
            return Ok(());
        }
        if let Some(start) = self.path.iter().position(|n| *n == name) {
            let mut cycle: Vec<String> = self.path[start..].iter().map(|n| n.to_string()).collect();
            cycle.push(name.to_string());
            return Err(DependencyError::CyclicDependency(cycle));
        }

        self.path.push(name);
        let requires = self.edges.get(name).copied().unwrap_or(&[]);
        for dep in requires {
            if !self.edges.contains_key(dep.as_str()) {
                log::warn!(
                    "Plugin '{}' requires '{}', which is not registered; continuing without it",
                    name,
                    dep
                );
                continue;
            }
            self.visit(dep.as_str())?;
        }
        self.path.pop();

        self.visited.insert(name);
        self.order.push(name.to_string());
        Ok(())
    }
}

/// Resolve a load order from `(name, requires)` pairs in registration order
pub fn resolve_load_order<'a, I>(plugins: I) -> Result<Vec<String>, DependencyError>
where
    I: IntoIterator<Item = (&'a str, &'a [String])>,
{
    let mut graph = DependencyGraph::new();
    for (name, requires) in plugins {
        graph.add(name, requires.iter().map(String::as_str));
    }
    graph.resolve()
}
