use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use log::info;
use terrain_texture_forge::{
    apply,
    asset_store::ImageStore,
    config, dsl, eval,
    material::{MaterialLibrary, SceneObject},
    mesh, schema,
};

#[derive(Debug, Default, Clone)]
struct Cli {
    config: Option<PathBuf>,
    texture_root: Option<PathBuf>,
    terrain: Option<PathBuf>,
    road: Option<PathBuf>,
    check: Option<PathBuf>,
    list_nodes: bool,
}

const USAGE: &str = "supported: --config <config.json>, --texture-root <dir>, --terrain <mesh.obj>, \
--road <mesh.obj>, --check <graph.json>, --list-nodes";

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = || {
            args.get(i + 1)
                .map(PathBuf::from)
                .ok_or_else(|| anyhow!("missing value for {flag}"))
        };
        match flag {
            "--config" => cli.config = Some(value()?),
            "--texture-root" => cli.texture_root = Some(value()?),
            "--terrain" => cli.terrain = Some(value()?),
            "--road" => cli.road = Some(value()?),
            "--check" => cli.check = Some(value()?),
            "--list-nodes" => {
                cli.list_nodes = true;
                i += 1;
                continue;
            }
            other => return Err(anyhow!("unknown argument: {other} ({USAGE})")),
        }
        i += 2;
    }
    Ok(cli)
}

/// Gently rolling terrain used when no mesh is given.
fn demo_terrain() -> mesh::MeshData {
    mesh::MeshData::from_heightfield(65, 65, 1.0, |x, y| {
        let ridge = (x * 0.08).sin() * (y * 0.06).cos() * 12.0;
        ridge + (x + y) * 0.15
    })
}

fn list_nodes() -> Result<()> {
    let scheme = schema::load_default_scheme()?;
    let mut types: Vec<_> = scheme.nodes.iter().collect();
    types.sort_by(|a, b| {
        (a.1.category.as_deref(), a.0.as_str()).cmp(&(b.1.category.as_deref(), b.0.as_str()))
    });
    for (name, node) in types {
        let mut inputs: Vec<_> = node.inputs.keys().map(String::as_str).collect();
        let mut outputs: Vec<_> = node.outputs.keys().map(String::as_str).collect();
        inputs.sort_unstable();
        outputs.sort_unstable();
        println!(
            "{:<10} {name:<16} ({}) -> ({})",
            node.category.as_deref().unwrap_or("-"),
            inputs.join(", "),
            outputs.join(", ")
        );
    }
    Ok(())
}

fn check_graph(path: &std::path::Path) -> Result<()> {
    let mut graph = dsl::load_graph_from_path(path)?;
    let scheme = schema::load_default_scheme()?;
    schema::apply_default_params(&mut graph, &scheme);
    schema::validate_graph_against(&graph, &scheme)
        .with_context(|| format!("graph {} is invalid", path.display()))?;
    println!("{}: {} nodes, valid", path.display(), graph.nodes.len());

    if graph.nodes_of_type("MaterialOutput").next().is_some() {
        let texels = eval::UniformTexels::new([0.5, 0.5, 0.5, 1.0]);
        let evaluator = eval::GraphEvaluator::new(&graph, texels)?;
        let sample = evaluator.surface(&eval::Fragment::flat([0.5, 0.5], 0.0))?;
        println!("surface at uv (0.5, 0.5) over gray texels: {sample:?}");
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&argv)?;

    if cli.list_nodes {
        return list_nodes();
    }
    if let Some(path) = cli.check.as_deref() {
        return check_graph(path);
    }

    let mut cfg = match cli.config.as_deref() {
        Some(path) => config::load_config_from_path(path)?,
        None => config::TextureConfig::default(),
    };
    if let Some(root) = cli.texture_root {
        cfg.texture_root_dir = root;
    }

    let terrain_mesh = match cli.terrain.as_deref() {
        Some(path) => mesh::load_obj(path)?,
        None => {
            info!("no --terrain mesh given, using a generated heightfield");
            demo_terrain()
        }
    };
    let mut terrain = SceneObject::new("Terrain", Some(terrain_mesh));
    let mut road = match cli.road.as_deref() {
        Some(path) => Some(SceneObject::new("Road", Some(mesh::load_obj(path)?))),
        None => None,
    };

    let store = ImageStore::new();
    let mut library = MaterialLibrary::new();
    let warnings = apply::apply_textures(&cfg, Some(&mut terrain), road.as_mut(), &store, &mut library)
        .context("texture application failed")?;

    let materials: Vec<_> = library.iter().collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&materials).context("failed to serialize materials")?
    );
    info!(
        "{} materials, {} cached images, {} warnings",
        library.len(),
        store.len(),
        warnings.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_cli_paths() {
        let cli = parse_cli(&args(&[
            "--config",
            "cfg.json",
            "--terrain",
            "t.obj",
            "--road",
            "r.obj",
        ]))
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("cfg.json")));
        assert_eq!(cli.terrain, Some(PathBuf::from("t.obj")));
        assert_eq!(cli.road, Some(PathBuf::from("r.obj")));
        assert!(!cli.list_nodes);
    }

    #[test]
    fn parse_cli_rejects_missing_value_and_unknown_flags() {
        assert!(parse_cli(&args(&["--terrain"])).is_err());
        let err = parse_cli(&args(&["--headless"])).unwrap_err();
        assert!(err.to_string().contains("unknown argument"));
    }

    #[test]
    fn parse_cli_list_nodes_takes_no_value() {
        let cli = parse_cli(&args(&["--list-nodes", "--texture-root", "T"])).unwrap();
        assert!(cli.list_nodes);
        assert_eq!(cli.texture_root, Some(PathBuf::from("T")));
    }

    #[test]
    fn demo_terrain_is_not_flat() {
        let (lo, hi) = demo_terrain().z_bounds().unwrap();
        assert!(hi - lo > 1.0);
    }
}
