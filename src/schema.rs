use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::{Result, anyhow, bail};
use serde::Deserialize;

use crate::dsl::{Connection, Node, ShaderGraph};
use crate::graph;

const DEFAULT_NODE_SCHEME_JSON: &str = include_str!("../assets/node-scheme.json");

#[derive(Debug, Clone)]
pub struct NodeScheme {
    pub nodes: HashMap<String, NodeTypeScheme>,
    /// Keyed by input type: the output types it accepts.
    pub port_type_compatibility: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct NodeTypeScheme {
    pub category: Option<String>,
    pub inputs: HashMap<String, String>,
    pub outputs: HashMap<String, String>,
    pub default_params: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawNodeScheme {
    #[serde(rename = "schemaVersion")]
    #[allow(dead_code)]
    schema_version: u32,
    #[serde(rename = "portTypeCompatibility", default)]
    port_type_compatibility: HashMap<String, Vec<String>>,
    #[serde(default)]
    nodes: Vec<RawNodeDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawNodeDef {
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    inputs: Vec<RawPort>,
    #[serde(default)]
    outputs: Vec<RawPort>,
    #[serde(rename = "defaultParams", default)]
    default_params: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawPort {
    id: String,
    #[serde(rename = "type")]
    port_type: String,
}

impl NodeScheme {
    /// Whether an output of type `from` may feed an input of type `to`.
    pub fn compatible(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }
        self.port_type_compatibility
            .get(to)
            .is_some_and(|allowed| allowed.iter().any(|s| s == from))
    }
}

pub fn load_default_scheme() -> Result<NodeScheme> {
    parse_scheme(DEFAULT_NODE_SCHEME_JSON)
}

fn parse_scheme(text: &str) -> Result<NodeScheme> {
    let raw: RawNodeScheme = serde_json::from_str(text)
        .map_err(|e| anyhow!("failed to parse assets/node-scheme.json: {e}"))?;
    let nodes = raw
        .nodes
        .into_iter()
        .map(|n| {
            let scheme = NodeTypeScheme {
                category: n.category,
                inputs: n.inputs.into_iter().map(|p| (p.id, p.port_type)).collect(),
                outputs: n.outputs.into_iter().map(|p| (p.id, p.port_type)).collect(),
                default_params: n.default_params,
            };
            (n.node_type, scheme)
        })
        .collect();
    Ok(NodeScheme {
        nodes,
        port_type_compatibility: raw.port_type_compatibility,
    })
}

/// Fills in every scheme default a node does not set explicitly.
pub fn apply_default_params(graph: &mut ShaderGraph, scheme: &NodeScheme) {
    for node in &mut graph.nodes {
        let Some(node_scheme) = scheme.nodes.get(&node.node_type) else {
            continue;
        };
        for (k, v) in &node_scheme.default_params {
            node.params.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
}

pub fn validate_graph(graph: &ShaderGraph) -> Result<()> {
    let scheme = load_default_scheme()?;
    validate_graph_against(graph, &scheme)
}

pub fn validate_graph_against(graph: &ShaderGraph, scheme: &NodeScheme) -> Result<()> {
    let nodes_by_id = graph.nodes_by_id();
    let mut errors: Vec<String> = Vec::new();

    let mut seen: HashSet<&str> = HashSet::new();
    for n in &graph.nodes {
        if !seen.insert(n.id.as_str()) {
            errors.push(format!("duplicate node id '{}'", n.id));
        }
        if !scheme.nodes.contains_key(&n.node_type) {
            errors.push(format!(
                "unknown node type '{}' at node '{}'",
                n.node_type, n.id
            ));
        }
    }

    let mut fed: HashSet<(&str, &str)> = HashSet::new();
    for c in &graph.connections {
        if !fed.insert((c.to.node_id.as_str(), c.to.port_id.as_str())) {
            errors.push(format!(
                "input '{}.{}' has more than one incoming connection",
                c.to.node_id, c.to.port_id
            ));
        }
        validate_connection(c, &nodes_by_id, scheme, &mut errors);
    }

    for (name, endpoint) in &graph.outputs {
        let Some(node) = nodes_by_id.get(endpoint.node_id.as_str()) else {
            errors.push(format!(
                "output '{name}' references missing node '{}'",
                endpoint.node_id
            ));
            continue;
        };
        let known = scheme
            .nodes
            .get(&node.node_type)
            .is_none_or(|s| s.outputs.contains_key(&endpoint.port_id));
        if !known {
            errors.push(format!(
                "output '{name}' uses unknown port '{}.{}'",
                endpoint.node_id, endpoint.port_id
            ));
        }
    }

    if errors.is_empty() {
        if let Err(e) = graph::topo_sort(graph) {
            errors.push(e.to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        bail!(
            "graph '{}' failed scheme validation ({} error(s)):\n- {}",
            graph.metadata.name,
            errors.len(),
            errors.join("\n- ")
        )
    }
}

fn validate_connection(
    c: &Connection,
    nodes_by_id: &HashMap<&str, &Node>,
    scheme: &NodeScheme,
    errors: &mut Vec<String>,
) {
    let Some(from_node) = nodes_by_id.get(c.from.node_id.as_str()).copied() else {
        errors.push(format!(
            "connection '{}' references missing from.nodeId '{}'",
            c.id, c.from.node_id
        ));
        return;
    };
    let Some(to_node) = nodes_by_id.get(c.to.node_id.as_str()).copied() else {
        errors.push(format!(
            "connection '{}' references missing to.nodeId '{}'",
            c.id, c.to.node_id
        ));
        return;
    };

    // Unknown node types were already reported.
    let (Some(from_scheme), Some(to_scheme)) = (
        scheme.nodes.get(&from_node.node_type),
        scheme.nodes.get(&to_node.node_type),
    ) else {
        return;
    };

    let Some(from_ty) = from_scheme.outputs.get(&c.from.port_id) else {
        errors.push(format!(
            "connection '{}' uses unknown from port '{}.{}' (type {})",
            c.id, c.from.node_id, c.from.port_id, from_node.node_type
        ));
        return;
    };
    let Some(to_ty) = to_scheme.inputs.get(&c.to.port_id) else {
        errors.push(format!(
            "connection '{}' uses unknown to port '{}.{}' (type {})",
            c.id, c.to.node_id, c.to.port_id, to_node.node_type
        ));
        return;
    };

    if !scheme.compatible(from_ty, to_ty) {
        errors.push(format!(
            "connection '{}' type mismatch: '{}.{}' ({}) -> '{}.{}' ({})",
            c.id, c.from.node_id, c.from.port_id, from_ty, c.to.node_id, c.to.port_id, to_ty
        ));
    }
}
