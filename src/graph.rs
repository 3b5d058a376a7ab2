use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use anyhow::{Result, bail};
use serde_json::Value;

use crate::dsl::{self, Connection, Endpoint, Node, ShaderGraph};

pub fn topo_sort(graph: &ShaderGraph) -> Result<Vec<String>> {
    let mut indeg: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), 0usize))
        .collect();

    let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
    for c in &graph.connections {
        if !indeg.contains_key(c.from.node_id.as_str()) || !indeg.contains_key(c.to.node_id.as_str()) {
            bail!(
                "connection references missing node: {} -> {}",
                c.from.node_id,
                c.to.node_id
            );
        }
        if let Some(d) = indeg.get_mut(c.to.node_id.as_str()) {
            *d += 1;
        }
        outgoing
            .entry(c.from.node_id.as_str())
            .or_default()
            .push(c.to.node_id.as_str());
    }

    // Seed in declaration order so the result is stable for a given graph.
    let mut q: VecDeque<&str> = graph
        .nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| indeg.get(id) == Some(&0))
        .collect();
    let mut order: Vec<String> = Vec::with_capacity(graph.nodes.len());

    while let Some(n) = q.pop_front() {
        order.push(n.to_string());
        if let Some(nexts) = outgoing.get(n) {
            for m in nexts {
                if let Some(entry) = indeg.get_mut(m) {
                    *entry -= 1;
                    if *entry == 0 {
                        q.push_back(m);
                    }
                }
            }
        }
    }

    if order.len() != graph.nodes.len() {
        bail!("cycle detected in graph (cannot topologically sort)");
    }
    Ok(order)
}

pub fn upstream_reachable(graph: &ShaderGraph, start: &str) -> HashSet<String> {
    let mut incoming: HashMap<&str, Vec<&str>> = HashMap::new();
    for c in &graph.connections {
        incoming
            .entry(c.to.node_id.as_str())
            .or_default()
            .push(c.from.node_id.as_str());
    }

    let mut visited: HashSet<String> = HashSet::new();
    let mut stack: Vec<&str> = vec![start];
    while let Some(n) = stack.pop() {
        if !visited.insert(n.to_string()) {
            continue;
        }
        if let Some(prevs) = incoming.get(n) {
            for p in prevs {
                stack.push(p);
            }
        }
    }
    visited
}

/// Value type carried by a node port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketType {
    Float,
    Color,
    Vector,
    Shader,
}

impl SocketType {
    pub fn scheme_name(self) -> &'static str {
        match self {
            SocketType::Float => "float",
            SocketType::Color => "color",
            SocketType::Vector => "vector",
            SocketType::Shader => "shader",
        }
    }
}

/// A typed output port of a node inside a graph under construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Socket {
    pub node_id: String,
    pub port_id: String,
    pub ty: SocketType,
}

impl Socket {
    pub fn new(node_id: impl Into<String>, port_id: impl Into<String>, ty: SocketType) -> Self {
        Self {
            node_id: node_id.into(),
            port_id: port_id.into(),
            ty,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.node_id.clone(), self.port_id.clone())
    }
}

/// Append-only builder for a [`ShaderGraph`].
///
/// Node ids are `<Type>_<n>` with a per-type counter, so the same sequence of
/// calls always yields the same ids.
#[derive(Debug)]
pub struct GraphBuilder {
    graph: ShaderGraph,
    counters: BTreeMap<String, usize>,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            graph: ShaderGraph::empty(name),
            counters: BTreeMap::new(),
        }
    }

    pub fn add_node<'p>(
        &mut self,
        node_type: &str,
        params: impl IntoIterator<Item = (&'p str, Value)>,
    ) -> String {
        let counter = self.counters.entry(node_type.to_string()).or_insert(0);
        *counter += 1;
        let id = format!("{node_type}_{counter}");
        self.graph.nodes.push(Node {
            id: id.clone(),
            node_type: node_type.to_string(),
            params: params
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        });
        id
    }

    pub fn connect(&mut self, from: &Socket, to_node_id: &str, to_port_id: &str) {
        let id = format!("c{}", self.graph.connections.len() + 1);
        self.graph.connections.push(Connection {
            id,
            from: from.endpoint(),
            to: Endpoint::new(to_node_id, to_port_id),
        });
    }

    pub fn set_output(&mut self, name: &str, socket: &Socket) {
        self.graph.outputs.insert(name.to_string(), socket.endpoint());
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.graph.metadata.description = Some(description.into());
    }

    pub fn graph(&self) -> &ShaderGraph {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.nodes.len()
    }

    /// Completes the graph, dropping nodes no named output depends on.
    pub fn finish(self) -> ShaderGraph {
        if self.graph.outputs.is_empty() {
            return self.graph;
        }
        dsl::treeshake_unlinked_nodes(&self.graph)
    }
}
