use std::fmt::Write;

use serde::Deserialize;

use netplat_topology::TopologyGraph;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiagramNode {
    pub name: String,
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiagramEdge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// An explicit diagram, independent of the stored graph
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiagramRequest {
    pub name: String,
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
}

impl DiagramRequest {
    /// Nodes are labelled with their `name` property when present, else their id
    pub fn from_topology(name: impl Into<String>, graph: &TopologyGraph) -> Self {
        let nodes = graph
            .nodes
            .iter()
            .map(|node| DiagramNode {
                name: node.id.clone(),
                label: node
                    .properties
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or(&node.id)
                    .to_string(),
                kind: Some(node.label.clone()),
            })
            .collect();
        let edges = graph
            .edges
            .iter()
            .map(|edge| DiagramEdge {
                source: edge.from.clone(),
                target: edge.to.clone(),
                label: Some(edge.relation.clone()),
            })
            .collect();
        Self {
            name: name.into(),
            nodes,
            edges,
        }
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Render as a Graphviz `digraph`
pub fn render_dot(diagram: &DiagramRequest, rankdir: &str) -> String {
    let mut out = String::new();
    // writing into a String cannot fail
    let _ = writeln!(out, "digraph {} {{", quote(&diagram.name));
    let _ = writeln!(out, "  rankdir={};", rankdir);
    for node in &diagram.nodes {
        match &node.kind {
            Some(kind) => {
                let _ = writeln!(out, "  {} [label={}, group={}];", quote(&node.name), quote(&node.label), quote(kind));
            }
            None => {
                let _ = writeln!(out, "  {} [label={}];", quote(&node.name), quote(&node.label));
            }
        }
    }
    for edge in &diagram.edges {
        match &edge.label {
            Some(label) => {
                let _ = writeln!(out, "  {} -> {} [label={}];", quote(&edge.source), quote(&edge.target), quote(label));
            }
            None => {
                let _ = writeln!(out, "  {} -> {};", quote(&edge.source), quote(&edge.target));
            }
        }
    }
    out.push_str("}\n");
    out
}
