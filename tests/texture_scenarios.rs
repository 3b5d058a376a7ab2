mod common;

use terrain_texture_forge::{
    apply::apply_textures,
    asset_store::ImageStore,
    config::{BlendConfig, TextureConfig},
    discovery::{Category, discover_category},
    eval::{Fragment, GraphEvaluator, UniformTexels},
    graph::GraphBuilder,
    loader::load_channel_set,
    material::{MaterialLibrary, SceneObject},
    mesh::MeshData,
    nodes::tex_coord,
    synth::synthesize,
    terrain::TERRAIN_MATERIAL,
};

use common::{assert_color_near, bundle, length};

fn terrain_object() -> SceneObject {
    SceneObject::new(
        "Terrain",
        Some(MeshData::from_heightfield(8, 8, 1.0, |x, y| (x * y).sqrt())),
    )
}

fn config_for(root: &std::path::Path) -> TextureConfig {
    TextureConfig {
        texture_root_dir: root.to_path_buf(),
        seed: 11,
        ..TextureConfig::default()
    }
}

#[test]
fn normal_gl_is_used_and_normal_dx_is_never_referenced() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    bundle(
        root,
        "Rock",
        "Rock01",
        &["Rock_Color.png", "Rock_NormalDX.png", "Rock_NormalGL.png"],
    );
    bundle(root, "Rock", "Rock02", &["Rock02_NormalDX.png", "Rock02_NormalGL.png"]);

    let found = discover_category(&root.join("Rock"), Category::Rock).unwrap();
    assert_eq!(found.len(), 2);
    for files in &found {
        assert!(files.normal.as_ref().unwrap().to_string_lossy().contains("NormalGL"));
        assert!(!files.color.as_ref().unwrap().to_string_lossy().contains("NormalDX"));
    }

    let mut lib = MaterialLibrary::new();
    let mut terrain = terrain_object();
    apply_textures(&config_for(root), Some(&mut terrain), None, &ImageStore::new(), &mut lib)
        .unwrap();

    let json = lib.get(TERRAIN_MATERIAL).unwrap().graph.to_json_pretty().unwrap();
    assert!(json.contains("Rock_NormalGL.png"));
    assert!(!json.contains("NormalDX"));
}

#[test]
fn three_color_only_bundles_blend_with_flat_normals() {
    let tmp = tempfile::tempdir().unwrap();
    for name in ["A", "B", "C"] {
        bundle(tmp.path(), "Ground", name, &["color.png"]);
    }
    let store = ImageStore::new();
    let mut warnings = Vec::new();
    let sets: Vec<_> = discover_category(&tmp.path().join("Ground"), Category::Ground)
        .unwrap()
        .iter()
        .map(|files| load_channel_set(&store, files, &mut warnings))
        .collect();
    assert!(warnings.is_empty());

    let cfg = BlendConfig {
        variant_count: 4,
        seed: 7,
        ..BlendConfig::default()
    };
    let mut b = GraphBuilder::new("abc");
    let uv = tex_coord(&mut b);
    let blend = synthesize(&mut b, &sets, &cfg, &uv).unwrap();

    let mut selected = blend.selected.clone();
    selected.sort();
    assert_eq!(selected, ["A", "B", "C"]);
    assert!(blend.mix_factor.is_some());
    assert_eq!(blend.overlay_masks.len(), 1);

    b.set_output("normal", &blend.output.normal);
    b.set_output("color", &blend.output.color);
    let graph = b.finish();
    assert_eq!(graph.nodes_of_type("NormalMap").count(), 0);
    assert_eq!(graph.nodes_of_type("ImageTexture").count(), 3);

    let eval = GraphEvaluator::new(&graph, UniformTexels::new([0.3, 0.6, 0.2, 1.0])).unwrap();
    for i in 0..20 {
        for j in 0..20 {
            let frag = Fragment::flat([i as f32 * 0.05, j as f32 * 0.05], 0.0);
            let n = eval.eval_output("normal", &frag).unwrap().as_vector().unwrap();
            assert!((length(n) - 1.0).abs() < 1e-5, "{n:?}");
            assert!(n[2] > 0.9999, "{n:?}");
            // Every layer samples the same texel, so any blend returns it.
            let c = eval.eval_output("color", &frag).unwrap().as_color().unwrap();
            assert_color_near(c, [0.3, 0.6, 0.2, 1.0]);
        }
    }
}

#[test]
fn missing_cliff_is_one_warning_and_falls_back_to_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    bundle(root, "Ground", "meadow", &["meadow_color.png", "meadow_roughness.png"]);
    bundle(root, "Rock", "granite", &["granite_albedo.png"]);
    bundle(root, "Snow", "powder", &["powder_basecolor.png"]);

    let mut lib = MaterialLibrary::new();
    let mut terrain = terrain_object();
    let warnings =
        apply_textures(&config_for(root), Some(&mut terrain), None, &ImageStore::new(), &mut lib)
            .unwrap();
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert!(warnings[0].contains("Cliff"));

    let material = lib.get(TERRAIN_MATERIAL).unwrap();
    let description = material.graph.metadata.description.clone().unwrap();
    assert!(description.contains("Ground[meadow]"), "{description}");
    assert!(description.contains("Cliff[]"), "{description}");

    // A vertical face is all cliff, and cliff is the default constant set.
    let eval = GraphEvaluator::new(&material.graph, UniformTexels::new([1.0, 0.0, 0.0, 1.0]))
        .unwrap();
    let wall = Fragment::new([0.2, 0.7], [1.0, 1.0, 3.0], [1.0, 0.0, 0.0]);
    let sample = eval.surface(&wall).unwrap();
    assert_color_near(sample.surface.base_color, [0.5, 0.5, 0.5, 1.0]);
    assert!((sample.surface.roughness - 0.65).abs() < 1e-4);

    // Flat ground shows the textured layers instead.
    let flat = Fragment::new([0.2, 0.7], [1.0, 1.0, 0.0], [0.0, 0.0, 1.0]);
    let sample = eval.surface(&flat).unwrap();
    assert_color_near(sample.surface.base_color, [1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn same_inputs_build_byte_identical_graphs() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    for category in ["Ground", "Rock", "Snow", "Cliff", "Road"] {
        for name in ["one", "two", "three"] {
            bundle(root, category, &format!("{category}_{name}"), &["color.png", "normalgl.png"]);
        }
    }

    let build = |seed: i64| {
        let cfg = TextureConfig {
            seed,
            ..config_for(root)
        };
        let mut lib = MaterialLibrary::new();
        let mut terrain = terrain_object();
        let mut road = SceneObject::new("Road", None);
        let warnings = apply_textures(
            &cfg,
            Some(&mut terrain),
            Some(&mut road),
            &ImageStore::new(),
            &mut lib,
        )
        .unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
        lib.iter()
            .map(|m| m.graph.to_json_pretty().unwrap())
            .collect::<Vec<_>>()
    };

    let first = build(3);
    assert_eq!(first.len(), 2);
    assert_eq!(first, build(3));
    assert_ne!(first, build(4));
}
