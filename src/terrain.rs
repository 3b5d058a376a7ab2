//! Terrain material: height-banded Ground/Rock/Snow with a slope-driven
//! Cliff overlay.

use log::{debug, info};

use crate::config::TextureConfig;
use crate::discovery::Category;
use crate::dsl::ShaderGraph;
use crate::error::{Result, TextureError};
use crate::graph::{GraphBuilder, Socket};
use crate::loader::CategoryBundles;
use crate::material::{MaterialLibrary, SceneObject};
use crate::mesh::PLANAR_UV_TILE;
use crate::nodes::{
    MathOp, blend_bundles, float_input, geometry, height_aware_factor, material_output, math,
    remap_node, separate_xyz, smoothstep_node, tex_coord,
};
use crate::synth::{CategoryBlend, synthesize};

pub const TERRAIN_MATERIAL: &str = "Terrain_Material";
pub const TERRAIN_DISPLACEMENT_SCALE: f32 = 0.06;

/// Height ranges at or below this collapse to a constant normalized height.
const FLAT_EPSILON: f32 = 1e-8;

/// A built terrain graph plus the intermediate sockets worth probing.
#[derive(Debug, Clone)]
pub struct TerrainGraph {
    pub graph: ShaderGraph,
    /// Normalized height in [0, 1].
    pub height: Socket,
    /// Ground to Rock transition.
    pub t1: Socket,
    /// Rock to Snow transition.
    pub t2: Socket,
    /// Cliff weight from steepness.
    pub cliff: Socket,
    pub layers: Vec<(Category, CategoryBlend)>,
}

/// Builds the terrain graph for a mesh whose vertex z spans `z_bounds`.
pub fn build_terrain_graph(
    bundles: &CategoryBundles,
    config: &TextureConfig,
    z_bounds: (f32, f32),
) -> Result<TerrainGraph> {
    let layers_cfg = config.terrain_layers();
    layers_cfg.validate()?;

    let mut b = GraphBuilder::new(TERRAIN_MATERIAL);
    let uv = tex_coord(&mut b);
    let geo = geometry(&mut b);

    let (min_z, max_z) = z_bounds;
    let height = if max_z - min_z <= FLAT_EPSILON {
        float_input(&mut b, 0.0)
    } else {
        let [_, _, z] = separate_xyz(&mut b, &geo.position);
        remap_node(&mut b, &z, (min_z, max_z), (0.0, 1.0))
    };

    let mut layers = Vec::with_capacity(Category::TERRAIN.len());
    for category in Category::TERRAIN {
        let sets = bundles.get(&category).map(Vec::as_slice).unwrap_or(&[]);
        let blend = synthesize(&mut b, sets, &config.blend_config_for(category), &uv)?;
        debug!("{category}: layered {:?}", blend.selected);
        layers.push((category, blend));
    }
    let [ground, rock, snow, cliff_layer] = [0, 1, 2, 3].map(|i| layers[i].1.output.clone());

    let half = layers_cfg.height_blend_width * 0.5;
    let g = layers_cfg.ground_ratio;
    let r = layers_cfg.rock_ratio;
    let t1 = smoothstep_node(&mut b, &height, g - half, g + half);
    let t2 = smoothstep_node(&mut b, &height, r - half, r + half);

    let contrast = config.blend_config_for(Category::Ground).height_contrast;
    let f1 = match contrast {
        Some(c) => height_aware_factor(&mut b, &t1, &ground, &rock, c),
        None => t1.clone(),
    };
    let ground_rock = blend_bundles(&mut b, &ground, &rock, &f1);
    let f2 = match contrast {
        Some(c) => height_aware_factor(&mut b, &t2, &ground_rock, &snow, c),
        None => t2.clone(),
    };
    let base = blend_bundles(&mut b, &ground_rock, &snow, &f2);

    let [_, _, nz] = separate_xyz(&mut b, &geo.normal);
    let abs_nz = math(&mut b, MathOp::Absolute, &nz, 0.0_f32);
    let steepness = math(&mut b, MathOp::Subtract, 1.0_f32, &abs_nz);
    let cliff = smoothstep_node(
        &mut b,
        &steepness,
        layers_cfg.cliff_slope_start,
        layers_cfg.cliff_slope_end,
    );
    let final_bundle = blend_bundles(&mut b, &base, &cliff_layer, &cliff);

    material_output(&mut b, &final_bundle, TERRAIN_DISPLACEMENT_SCALE);
    b.set_description(describe(&layers));

    Ok(TerrainGraph {
        graph: b.finish(),
        height,
        t1,
        t2,
        cliff,
        layers,
    })
}

fn describe(layers: &[(Category, CategoryBlend)]) -> String {
    layers
        .iter()
        .map(|(c, blend)| format!("{c}[{}]", blend.selected.join(", ")))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Builds the terrain material and binds it as the object's only material.
///
/// A previous material is left untouched if anything fails before the swap.
pub fn apply_terrain_material(
    object: &mut SceneObject,
    bundles: &CategoryBundles,
    config: &TextureConfig,
    library: &mut MaterialLibrary,
) -> Result<()> {
    let Some(mesh) = object.mesh.as_mut() else {
        return Err(TextureError::MeshUnavailable(format!(
            "terrain object '{}' has no mesh",
            object.name
        )));
    };
    if mesh.ensure_planar_uvs(PLANAR_UV_TILE) {
        debug!("{}: generated planar UVs", object.name);
    }
    let z_bounds = mesh.z_bounds()?;

    let built = build_terrain_graph(bundles, config, z_bounds)?;
    let nodes = built.graph.nodes.len();
    library.replace(TERRAIN_MATERIAL, built.graph);
    object.bind_sole_material(TERRAIN_MATERIAL);
    info!(
        "{}: bound {TERRAIN_MATERIAL} ({nodes} nodes, z {:.2}..{:.2})",
        object.name, z_bounds.0, z_bounds.1
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::TextureChannelSet;
    use crate::mesh::MeshData;

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
    fn flat_mesh_uses_constant_height() {
        let built = build_terrain_graph(&CategoryBundles::new(), &TextureConfig::default(), (2.0, 2.0))
            .unwrap();
        let node = built
            .graph
            .nodes
            .iter()
            .find(|n| n.id == built.height.node_id)
            .unwrap();
        assert_eq!(node.node_type, "FloatInput");
    }

    #[test]
    fn terrain_graph_passes_scheme_validation() {
        let mut bundles = CategoryBundles::new();
        bundles.insert(Category::Ground, named(&["g1", "g2", "g3"]));
        bundles.insert(Category::Rock, named(&["r1"]));
        let built = build_terrain_graph(&bundles, &TextureConfig::default(), (0.0, 10.0)).unwrap();
        crate::schema::validate_graph(&built.graph).unwrap();
        assert_eq!(built.graph.nodes_of_type("MaterialOutput").count(), 1);
        assert_eq!(built.layers[0].1.selected.len(), 3);
        let disp = built.graph.nodes_of_type("Displacement").next().unwrap();
        assert_eq!(disp.params["scale"].as_f64().map(|v| v as f32), Some(0.06));
        assert_eq!(disp.params["midlevel"].as_f64(), Some(0.5));
    }

    #[test]
    fn apply_binds_material_and_fills_uvs() {
        let mut obj = SceneObject::new(
            "Terrain",
            Some(MeshData::from_heightfield(3, 3, 1.0, |x, _| x)),
        );
        let mut lib = MaterialLibrary::new();
        apply_terrain_material(&mut obj, &CategoryBundles::new(), &TextureConfig::default(), &mut lib)
            .unwrap();
        assert_eq!(obj.material_slots, vec![TERRAIN_MATERIAL.to_string()]);
        assert!(obj.mesh.as_ref().unwrap().has_uvs());
        assert!(lib.get(TERRAIN_MATERIAL).is_some());
    }

    #[test]
    fn missing_mesh_is_reported() {
        let mut obj = SceneObject::new("Terrain", None);
        let mut lib = MaterialLibrary::new();
        let err = apply_terrain_material(&mut obj, &CategoryBundles::new(), &TextureConfig::default(), &mut lib)
            .unwrap_err();
        assert!(matches!(err, TextureError::MeshUnavailable(_)));
        assert!(lib.is_empty());
    }
}
