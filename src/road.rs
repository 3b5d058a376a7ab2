//! Road material: one anisotropic category blend stretched along the route.

use log::{debug, info};

use crate::config::TextureConfig;
use crate::discovery::Category;
use crate::dsl::ShaderGraph;
use crate::error::{Result, TextureError};
use crate::graph::GraphBuilder;
use crate::loader::TextureChannelSet;
use crate::material::{MaterialLibrary, SceneObject};
use crate::mesh::PLANAR_UV_TILE;
use crate::nodes::{material_output, tex_coord};
use crate::synth::{CategoryBlend, synthesize};

pub const ROAD_MATERIAL: &str = "Road_Material";
pub const ROAD_DISPLACEMENT_SCALE: f32 = 0.02;

pub fn build_road_graph(
    bundles: &[TextureChannelSet],
    config: &TextureConfig,
) -> Result<(ShaderGraph, CategoryBlend)> {
    let mut b = GraphBuilder::new(ROAD_MATERIAL);
    let uv = tex_coord(&mut b);
    let blend = synthesize(&mut b, bundles, &config.blend_config_for(Category::Road), &uv)?;
    material_output(&mut b, &blend.output, ROAD_DISPLACEMENT_SCALE);
    b.set_description(format!("Road[{}]", blend.selected.join(", ")));
    Ok((b.finish(), blend))
}

/// Builds the road material and binds it to `object`.
///
/// Callers skip this entirely when the Road category is empty, so the road
/// keeps whatever material it had.
pub fn apply_road_material(
    object: &mut SceneObject,
    bundles: &[TextureChannelSet],
    config: &TextureConfig,
    library: &mut MaterialLibrary,
) -> Result<()> {
    if let Some(mesh) = object.mesh.as_mut() {
        if mesh.vertex_count() == 0 {
            return Err(TextureError::MeshUnavailable(format!(
                "road object '{}' has an empty mesh",
                object.name
            )));
        }
        if mesh.ensure_planar_uvs(PLANAR_UV_TILE) {
            debug!("{}: generated planar UVs", object.name);
        }
    }

    let (graph, blend) = build_road_graph(bundles, config)?;
    library.replace(ROAD_MATERIAL, graph);
    object.bind_sole_material(ROAD_MATERIAL);
    info!("{}: bound {ROAD_MATERIAL} with {:?}", object.name, blend.selected);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn named(names: &[&str]) -> Vec<TextureChannelSet> {
        names
            .iter()
            .map(|n| TextureChannelSet {
                name: n.to_string(),
                ..TextureChannelSet::default()
            })
            .collect()
    }

    #[test]
    fn road_partition_is_stretched_and_displacement_is_shallow() {
        let cfg = TextureConfig {
            mix_scale: 10.0,
            ..TextureConfig::default()
        };
        let (graph, blend) = build_road_graph(&named(&["asphalt", "gravel"]), &cfg).unwrap();
        assert_eq!(blend.selected.len(), 2);

        let voronoi = graph.nodes_of_type("Voronoi").next().unwrap();
        let feed = crate::dsl::incoming_connection(&graph, &voronoi.id, "vector").unwrap();
        let mapping = graph
            .nodes
            .iter()
            .find(|n| n.id == feed.from.node_id)
            .unwrap();
        let scale = crate::dsl::parse_vec3(&mapping.params, "scale").unwrap();
        assert!((scale[0] - 12.0).abs() < 1e-5);
        assert!((scale[1] - 2.5).abs() < 1e-5);
        assert_eq!(scale[2], 1.0);

        let disp = graph.nodes_of_type("Displacement").next().unwrap();
        assert_eq!(disp.params["scale"].as_f64().map(|v| v as f32), Some(0.02));
        assert_eq!(disp.params["midlevel"], json!(0.5));
        crate::schema::validate_graph(&graph).unwrap();
    }

    #[test]
    fn road_without_mesh_still_gets_a_material() {
        let mut obj = SceneObject::new("Road", None);
        let mut lib = MaterialLibrary::new();
        apply_road_material(&mut obj, &named(&["a"]), &TextureConfig::default(), &mut lib).unwrap();
        assert_eq!(obj.material_slots, vec![ROAD_MATERIAL.to_string()]);
    }
}
