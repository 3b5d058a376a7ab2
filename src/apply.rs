//! Orchestration entry points used by the host.

use log::{info, warn};

use crate::asset_store::ImageStore;
use crate::config::TextureConfig;
use crate::discovery::{self, BundleFiles, Category};
use crate::error::{Result, TextureError};
use crate::loader::{CategoryBundles, TextureChannelSet, load_channel_set};
use crate::material::{MaterialLibrary, SceneObject};
use crate::road::{ROAD_MATERIAL, apply_road_material};
use crate::terrain::{TERRAIN_MATERIAL, apply_terrain_material};

fn discover_with_override(
    config: &TextureConfig,
    category: Category,
    warnings: &mut Vec<String>,
) -> Vec<BundleFiles> {
    if let Some(path) = config.category_overrides.get(&category) {
        match discovery::discover_bundle_dir(path) {
            Ok(Some(bundle)) => return vec![bundle],
            Ok(None) => warnings.push(format!(
                "{category} category: override {} has no images, scanning the texture root",
                path.display()
            )),
            Err(e) => warnings.push(format!(
                "{category} category: override {} unusable ({e}), scanning the texture root",
                path.display()
            )),
        }
    }

    match discovery::discover_category(&config.category_dir(category), category) {
        Ok(bundles) if bundles.is_empty() => {
            warnings.push(format!("{category} category: no texture sets found"));
            Vec::new()
        }
        Ok(bundles) => bundles,
        Err(e @ TextureError::AssetDirectoryMissing { .. }) => {
            warnings.push(e.to_string());
            Vec::new()
        }
        Err(e) => {
            warnings.push(format!("{category} category: {e}"));
            Vec::new()
        }
    }
}

/// Discovers and loads one category; every problem becomes a warning.
pub fn load_category(
    config: &TextureConfig,
    category: Category,
    store: &ImageStore,
    warnings: &mut Vec<String>,
) -> Vec<TextureChannelSet> {
    discover_with_override(config, category, warnings)
        .iter()
        .map(|files| load_channel_set(store, files, warnings))
        .collect()
}

/// Rebuilds the terrain and road materials from the texture root.
///
/// Returns the warnings in the order they arose; an empty list means every
/// category was found and every file was readable. Only an invalid
/// configuration is returned as an error.
pub fn apply_textures(
    config: &TextureConfig,
    terrain: Option<&mut SceneObject>,
    road: Option<&mut SceneObject>,
    store: &ImageStore,
    library: &mut MaterialLibrary,
) -> Result<Vec<String>> {
    config.validate()?;
    let mut warnings = Vec::new();

    if config.apply_terrain_textures {
        match terrain {
            Some(object) => {
                let mut bundles = CategoryBundles::new();
                for category in Category::TERRAIN {
                    let sets = load_category(config, category, store, &mut warnings);
                    bundles.insert(category, sets);
                }
                if let Err(e) = apply_terrain_material(object, &bundles, config, library) {
                    if e.is_fatal() {
                        return Err(e);
                    }
                    warnings.push(e.to_string());
                }
            }
            None => warnings.push("terrain object not found; terrain material skipped".to_string()),
        }
    }

    if config.apply_road_textures {
        if let Some(object) = road {
            let sets = load_category(config, Category::Road, store, &mut warnings);
            if sets.is_empty() {
                info!("{}: no road textures, keeping its current material", object.name);
            } else if let Err(e) = apply_road_material(object, &sets, config, library) {
                if e.is_fatal() {
                    return Err(e);
                }
                warnings.push(e.to_string());
            }
        }
    }

    for w in &warnings {
        warn!("{w}");
    }
    Ok(warnings)
}

/// Removes the generated materials, unbinds them from `objects`, and evicts
/// cached images under the texture root. Returns a one-line summary.
pub fn reset_textures(
    config: &TextureConfig,
    objects: &mut [&mut SceneObject],
    library: &mut MaterialLibrary,
    store: &ImageStore,
) -> String {
    let mut materials = 0;
    for name in [TERRAIN_MATERIAL, ROAD_MATERIAL] {
        if library.remove(name).is_some() {
            materials += 1;
        }
        for object in objects.iter_mut() {
            object.unbind(name);
        }
    }
    let mut images = store.evict_under(&config.texture_root_dir);
    for path in config.category_overrides.values() {
        images += store.evict_under(path);
    }
    let summary = format!("Removed {materials} materials, {images} images");
    info!("{summary}");
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::MeshData;

    fn terrain() -> SceneObject {
        SceneObject::new(
            "Terrain",
            Some(MeshData::from_heightfield(4, 4, 1.0, |x, y| x + y)),
        )
    }

    #[test]
    fn invalid_config_escapes() {
        let cfg = TextureConfig {
            cliff_slope_start: 0.9,
            cliff_slope_end: 0.1,
            ..TextureConfig::default()
        };
        let mut lib = MaterialLibrary::new();
        let mut t = terrain();
        let res = apply_textures(&cfg, Some(&mut t), None, &ImageStore::new(), &mut lib);
        assert!(matches!(res, Err(TextureError::InvalidConfig(_))));
        assert!(lib.is_empty());
    }

    #[test]
    fn missing_root_warns_per_category_but_still_builds() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = TextureConfig {
            texture_root_dir: tmp.path().join("nope"),
            ..TextureConfig::default()
        };
        let mut lib = MaterialLibrary::new();
        let mut t = terrain();
        let mut r = SceneObject::new("Road", None);
        let warnings =
            apply_textures(&cfg, Some(&mut t), Some(&mut r), &ImageStore::new(), &mut lib).unwrap();
        assert_eq!(warnings.len(), 5);
        for (w, c) in warnings.iter().zip(Category::ALL) {
            assert!(w.starts_with(&format!("{c} category")), "{w}");
        }
        assert!(lib.get(TERRAIN_MATERIAL).is_some());
        assert!(lib.get(ROAD_MATERIAL).is_none());
        assert!(r.material_slots.is_empty());
    }

    #[test]
    fn disabled_flags_skip_everything() {
        let cfg = TextureConfig {
            apply_terrain_textures: false,
            apply_road_textures: false,
            ..TextureConfig::default()
        };
        let mut lib = MaterialLibrary::new();
        let warnings = apply_textures(&cfg, None, None, &ImageStore::new(), &mut lib).unwrap();
        assert!(warnings.is_empty());
        assert!(lib.is_empty());
    }

    #[test]
    fn reset_removes_materials_and_slots() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = TextureConfig {
            texture_root_dir: tmp.path().to_path_buf(),
            ..TextureConfig::default()
        };
        let mut lib = MaterialLibrary::new();
        let mut t = terrain();
        apply_textures(&cfg, Some(&mut t), None, &ImageStore::new(), &mut lib).unwrap();
        assert_eq!(lib.len(), 1);

        let summary = reset_textures(&cfg, &mut [&mut t], &mut lib, &ImageStore::new());
        assert_eq!(summary, "Removed 1 materials, 0 images");
        assert!(lib.is_empty());
        assert!(t.material_slots.is_empty());
    }
}
