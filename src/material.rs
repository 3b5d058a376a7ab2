use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use crate::dsl::ShaderGraph;
use crate::mesh::MeshData;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    pub name: String,
    pub graph: ShaderGraph,
}

/// Named materials owned by the host scene.
///
/// Graphs are only ever replaced whole: a rebuild produces a new
/// [`ShaderGraph`] and [`MaterialLibrary::replace`] swaps it in.
#[derive(Debug, Clone, Default)]
pub struct MaterialLibrary {
    materials: BTreeMap<String, Material>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `graph` under `name`, creating the material on first use.
    pub fn replace(&mut self, name: &str, graph: ShaderGraph) -> &Material {
        let material = self
            .materials
            .entry(name.to_string())
            .or_insert_with(|| Material {
                name: name.to_string(),
                graph: ShaderGraph::empty(name),
            });
        debug!(
            "material '{name}': swapping in graph with {} nodes",
            graph.nodes.len()
        );
        material.graph = graph;
        material
    }

    pub fn get(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Material> {
        self.materials.remove(name)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.values()
    }
}

/// A scene object as seen by the texturing stage: a mesh plus material slots.
#[derive(Debug, Clone, Default)]
pub struct SceneObject {
    pub name: String,
    pub mesh: Option<MeshData>,
    pub material_slots: Vec<String>,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, mesh: Option<MeshData>) -> Self {
        Self {
            name: name.into(),
            mesh,
            material_slots: Vec::new(),
        }
    }

    /// Makes `material` the only slot of this object.
    pub fn bind_sole_material(&mut self, material: &str) {
        self.material_slots.clear();
        self.material_slots.push(material.to_string());
    }

    /// Drops every slot referencing `material`; returns whether any did.
    pub fn unbind(&mut self, material: &str) -> bool {
        let before = self.material_slots.len();
        self.material_slots.retain(|m| m != material);
        before != self.material_slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_swaps_graph_in_place() {
        let mut lib = MaterialLibrary::new();
        lib.replace("Terrain_Material", ShaderGraph::empty("first"));
        let mut second = ShaderGraph::empty("second");
        second.metadata.description = Some("rebuilt".into());
        lib.replace("Terrain_Material", second.clone());
        assert_eq!(lib.len(), 1);
        assert_eq!(lib.get("Terrain_Material").unwrap().graph, second);
    }

    #[test]
    fn binding_leaves_exactly_one_slot() {
        let mut obj = SceneObject::new("Terrain", None);
        obj.material_slots = vec!["Old".into(), "Other".into()];
        obj.bind_sole_material("Terrain_Material");
        assert_eq!(obj.material_slots, vec!["Terrain_Material".to_string()]);
        assert!(obj.unbind("Terrain_Material"));
        assert!(obj.material_slots.is_empty());
    }
}
