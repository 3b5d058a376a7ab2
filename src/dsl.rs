use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::graph;

pub const GRAPH_VERSION: &str = "1.0";

/// A shading node graph as handed to the host evaluator.
///
/// Params and outputs are ordered maps so that two builds with the same inputs
/// serialize to the same bytes.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ShaderGraph {
    pub version: String,
    pub metadata: Metadata,
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub outputs: BTreeMap<String, Endpoint>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Metadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Connection {
    pub id: String,
    pub from: Endpoint,
    pub to: Endpoint,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    #[serde(rename = "nodeId")]
    pub node_id: String,
    #[serde(rename = "portId")]
    pub port_id: String,
}

impl Endpoint {
    pub fn new(node_id: impl Into<String>, port_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            port_id: port_id.into(),
        }
    }
}

impl ShaderGraph {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            version: GRAPH_VERSION.to_string(),
            metadata: Metadata {
                name: name.into(),
                description: None,
            },
            nodes: Vec::new(),
            connections: Vec::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn nodes_by_id(&self) -> HashMap<&str, &Node> {
        self.nodes.iter().map(|n| (n.id.as_str(), n)).collect()
    }

    pub fn nodes_of_type<'a>(&'a self, node_type: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes.iter().filter(move |n| n.node_type == node_type)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize shader graph")
    }
}

/// Drops nodes that no named output depends on.
///
/// Keep set is the upstream closure of every `outputs` endpoint; connections
/// touching a dropped node are dropped with it.
pub fn treeshake_unlinked_nodes(graph: &ShaderGraph) -> ShaderGraph {
    let mut keep: HashSet<String> = HashSet::new();
    for endpoint in graph.outputs.values() {
        keep.extend(graph::upstream_reachable(graph, &endpoint.node_id));
    }

    let nodes: Vec<Node> = graph
        .nodes
        .iter()
        .filter(|n| keep.contains(&n.id))
        .cloned()
        .collect();
    let connections: Vec<Connection> = graph
        .connections
        .iter()
        .filter(|c| keep.contains(&c.from.node_id) && keep.contains(&c.to.node_id))
        .cloned()
        .collect();

    ShaderGraph {
        version: graph.version.clone(),
        metadata: graph.metadata.clone(),
        nodes,
        connections,
        outputs: graph.outputs.clone(),
    }
}

pub fn load_graph_from_path(path: impl AsRef<std::path::Path>) -> Result<ShaderGraph> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read graph json at {}", path.display()))?;
    let graph: ShaderGraph = serde_json::from_str(&text).context("failed to parse graph json")?;
    Ok(graph)
}

pub fn find_node<'a>(nodes_by_id: &HashMap<&str, &'a Node>, node_id: &str) -> Result<&'a Node> {
    nodes_by_id
        .get(node_id)
        .copied()
        .ok_or_else(|| anyhow!("node not found: {node_id}"))
}

pub fn incoming_connection<'a>(
    graph: &'a ShaderGraph,
    to_node_id: &str,
    to_port_id: &str,
) -> Option<&'a Connection> {
    graph
        .connections
        .iter()
        .find(|c| c.to.node_id == to_node_id && c.to.port_id == to_port_id)
}

pub fn parse_f32(params: &BTreeMap<String, serde_json::Value>, key: &str) -> Option<f32> {
    match params.get(key) {
        Some(v) => v
            .as_f64()
            .map(|x| x as f32)
            .or_else(|| v.as_u64().map(|x| x as f32))
            .or_else(|| v.as_i64().map(|x| x as f32)),
        None => None,
    }
}

pub fn parse_u32(params: &BTreeMap<String, serde_json::Value>, key: &str) -> Option<u32> {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
}

pub fn parse_bool(params: &BTreeMap<String, serde_json::Value>, key: &str) -> Option<bool> {
    params.get(key).and_then(|v| v.as_bool())
}

pub fn parse_str<'a>(params: &'a BTreeMap<String, serde_json::Value>, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

fn parse_array<const N: usize>(
    params: &BTreeMap<String, serde_json::Value>,
    key: &str,
) -> Option<[f32; N]> {
    let arr = params.get(key)?.as_array()?;
    if arr.len() != N {
        return None;
    }
    let mut out = [0.0f32; N];
    for (slot, v) in out.iter_mut().zip(arr) {
        *slot = v.as_f64()? as f32;
    }
    Some(out)
}

pub fn parse_vec3(params: &BTreeMap<String, serde_json::Value>, key: &str) -> Option<[f32; 3]> {
    parse_array::<3>(params, key)
}

pub fn parse_rgba(params: &BTreeMap<String, serde_json::Value>, key: &str) -> Option<[f32; 4]> {
    parse_array::<4>(params, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(id: &str, ty: &str) -> Node {
        Node {
            id: id.to_string(),
            node_type: ty.to_string(),
            params: BTreeMap::new(),
        }
    }

    fn conn(from: &str, to: &str) -> Connection {
        Connection {
            id: format!("{from}->{to}"),
            from: Endpoint::new(from, "out"),
            to: Endpoint::new(to, "in"),
        }
    }

    #[test]
    fn treeshake_keeps_only_output_ancestors() {
        let mut g = ShaderGraph::empty("t");
        g.nodes = vec![node("a", "X"), node("b", "X"), node("stray", "X"), node("out", "X")];
        g.connections = vec![conn("a", "b"), conn("b", "out"), conn("stray", "a2")];
        g.outputs.insert("main".into(), Endpoint::new("out", "value"));

        let shaken = treeshake_unlinked_nodes(&g);
        let ids: Vec<&str> = shaken.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "out"]);
        assert_eq!(shaken.connections.len(), 2);
    }

    #[test]
    fn parse_helpers_accept_ints_and_floats() {
        let mut params = BTreeMap::new();
        params.insert("f".to_string(), json!(0.25));
        params.insert("i".to_string(), json!(3));
        params.insert("v".to_string(), json!([1.0, 2, 3.5]));
        params.insert("bad".to_string(), json!([1.0, 2.0]));

        assert_eq!(parse_f32(&params, "f"), Some(0.25));
        assert_eq!(parse_f32(&params, "i"), Some(3.0));
        assert_eq!(parse_u32(&params, "i"), Some(3));
        assert_eq!(parse_vec3(&params, "v"), Some([1.0, 2.0, 3.5]));
        assert_eq!(parse_vec3(&params, "bad"), None);
        assert_eq!(parse_f32(&params, "missing"), None);
    }

    #[test]
    fn graph_json_round_trips_with_renamed_fields() {
        let mut g = ShaderGraph::empty("rt");
        g.nodes.push(node("n1", "FloatInput"));
        g.outputs.insert("main".into(), Endpoint::new("n1", "value"));
        let text = serde_json::to_string(&g).unwrap();
        assert!(text.contains("\"type\":\"FloatInput\""));
        assert!(text.contains("\"nodeId\":\"n1\""));
        let back: ShaderGraph = serde_json::from_str(&text).unwrap();
        assert_eq!(back, g);
    }
}
