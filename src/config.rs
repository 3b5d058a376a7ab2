use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result as AnyResult};
use serde::{Deserialize, Serialize};

use crate::discovery::Category;
use crate::error::{Result, TextureError};

/// User-facing settings, as stored by the host next to the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureConfig {
    #[serde(default = "default_texture_root")]
    pub texture_root_dir: PathBuf,
    #[serde(default)]
    pub seed: i64,
    #[serde(default = "default_texture_variants")]
    pub texture_variants: u32,
    #[serde(default = "default_mix_scale")]
    pub mix_scale: f32,
    #[serde(default = "default_transition_width")]
    pub transition_width: f32,
    #[serde(default = "default_true")]
    pub apply_terrain_textures: bool,
    #[serde(default = "default_true")]
    pub apply_road_textures: bool,
    #[serde(default = "default_ground_ratio")]
    pub ground_ratio: f32,
    #[serde(default = "default_rock_ratio")]
    pub rock_ratio: f32,
    #[serde(default = "default_height_blend_width")]
    pub height_blend_width: f32,
    #[serde(default = "default_cliff_slope_start")]
    pub cliff_slope_start: f32,
    #[serde(default = "default_cliff_slope_end")]
    pub cliff_slope_end: f32,
    /// Sharpen terrain transitions using each bundle's displacement.
    #[serde(default)]
    pub height_aware_blend: bool,
    /// Pins a category to one bundle directory instead of scanning.
    #[serde(default)]
    pub category_overrides: BTreeMap<Category, PathBuf>,
}

fn default_texture_root() -> PathBuf {
    PathBuf::from("Texture")
}

fn default_texture_variants() -> u32 {
    3
}

fn default_mix_scale() -> f32 {
    6.0
}

fn default_transition_width() -> f32 {
    0.06
}

fn default_true() -> bool {
    true
}

fn default_ground_ratio() -> f32 {
    0.4
}

fn default_rock_ratio() -> f32 {
    0.75
}

fn default_height_blend_width() -> f32 {
    0.08
}

fn default_cliff_slope_start() -> f32 {
    0.35
}

fn default_cliff_slope_end() -> f32 {
    0.6
}

const TERRAIN_DOMINANCE: (f32, f32) = (0.70, 0.90);
const ROAD_DOMINANCE: (f32, f32) = (0.80, 0.92);
const ROAD_EDGE_SOFTNESS: f32 = 0.04;
const HEIGHT_AWARE_CONTRAST: f32 = 0.2;

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            texture_root_dir: default_texture_root(),
            seed: 0,
            texture_variants: default_texture_variants(),
            mix_scale: default_mix_scale(),
            transition_width: default_transition_width(),
            apply_terrain_textures: true,
            apply_road_textures: true,
            ground_ratio: default_ground_ratio(),
            rock_ratio: default_rock_ratio(),
            height_blend_width: default_height_blend_width(),
            cliff_slope_start: default_cliff_slope_start(),
            cliff_slope_end: default_cliff_slope_end(),
            height_aware_blend: false,
            category_overrides: BTreeMap::new(),
        }
    }
}

impl TextureConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=4).contains(&self.texture_variants) {
            return Err(TextureError::invalid_config(format!(
                "textureVariants must be in 1..=4, got {}",
                self.texture_variants
            )));
        }
        if !(self.mix_scale.is_finite() && self.mix_scale > 0.0) {
            return Err(TextureError::invalid_config(format!(
                "mixScale must be > 0, got {}",
                self.mix_scale
            )));
        }
        if !(0.0..=0.5).contains(&self.transition_width) {
            return Err(TextureError::invalid_config(format!(
                "transitionWidth must be in [0, 0.5], got {}",
                self.transition_width
            )));
        }
        self.terrain_layers().validate()?;
        for category in Category::ALL {
            self.blend_config_for(category).validate()?;
        }
        Ok(())
    }

    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.texture_root_dir.join(category.dir_name())
    }

    pub fn terrain_layers(&self) -> TerrainLayerConfig {
        TerrainLayerConfig {
            ground_ratio: self.ground_ratio,
            rock_ratio: self.rock_ratio,
            height_blend_width: self.height_blend_width,
            cliff_slope_start: self.cliff_slope_start,
            cliff_slope_end: self.cliff_slope_end,
        }
    }

    /// Blend settings for one category, seeded independently of the others.
    pub fn blend_config_for(&self, category: Category) -> BlendConfig {
        let seed = (self.seed as u64) ^ category.seed_salt();
        let mix = self.mix_scale;
        let base = BlendConfig {
            variant_count: self.texture_variants,
            seed,
            ..BlendConfig::default()
        };
        match category {
            Category::Road => BlendConfig {
                spatial_scale: [mix * 1.2, mix * 0.25, 1.0],
                dominant_min: ROAD_DOMINANCE.0,
                dominant_max: ROAD_DOMINANCE.1,
                edge_softness: ROAD_EDGE_SOFTNESS,
                ..base
            },
            _ => BlendConfig {
                spatial_scale: [mix, mix, mix],
                dominant_min: TERRAIN_DOMINANCE.0,
                dominant_max: TERRAIN_DOMINANCE.1,
                edge_softness: self.transition_width,
                height_contrast: self.height_aware_blend.then_some(HEIGHT_AWARE_CONTRAST),
                ..base
            },
        }
    }
}

pub fn load_config_from_path(path: impl AsRef<Path>) -> AnyResult<TextureConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config json at {}", path.display()))?;
    let config: TextureConfig =
        serde_json::from_str(&text).context("failed to parse config json")?;
    Ok(config)
}

/// Parameters of one category blend.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendConfig {
    /// Requested layer count; clamped to `1..=4` and to the bundle count.
    pub variant_count: u32,
    pub seed: u64,
    pub spatial_scale: [f32; 3],
    pub dominant_min: f32,
    pub dominant_max: f32,
    pub edge_softness: f32,
    pub sparse_coverage: f32,
    pub sparse_softness: f32,
    pub sparse_scale: f32,
    pub overlay_base_cap: f32,
    /// Cap multiplier applied per extra overlay layer.
    pub overlay_decay: f32,
    pub randomize_uv: bool,
    pub height_contrast: Option<f32>,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            variant_count: 3,
            seed: 0,
            spatial_scale: [6.0, 6.0, 6.0],
            dominant_min: TERRAIN_DOMINANCE.0,
            dominant_max: TERRAIN_DOMINANCE.1,
            edge_softness: 0.06,
            sparse_coverage: 0.15,
            sparse_softness: 0.05,
            sparse_scale: 1.5,
            overlay_base_cap: 0.6,
            overlay_decay: 0.45,
            randomize_uv: true,
            height_contrast: None,
        }
    }
}

fn check(ok: bool, msg: impl FnOnce() -> String) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(TextureError::InvalidConfig(msg()))
    }
}

impl BlendConfig {
    pub fn validate(&self) -> Result<()> {
        let (lo, hi) = (self.dominant_min, self.dominant_max);
        check(lo > 0.5 && hi <= 1.0 && lo <= hi, || {
            format!("dominant range must satisfy 0.5 < min <= max <= 1, got {lo}..{hi}")
        })?;
        check(
            self.spatial_scale.iter().all(|s| s.is_finite() && *s > 0.0),
            || format!("spatial scale must be positive, got {:?}", self.spatial_scale),
        )?;
        check((0.0..=0.5).contains(&self.edge_softness), || {
            format!("edge softness must be in [0, 0.5], got {}", self.edge_softness)
        })?;
        check(self.sparse_coverage > 0.0 && self.sparse_coverage < 1.0, || {
            format!("sparse coverage must be in (0, 1), got {}", self.sparse_coverage)
        })?;
        check(self.sparse_softness > 0.0 && self.sparse_softness < 0.5, || {
            format!("sparse softness must be in (0, 0.5), got {}", self.sparse_softness)
        })?;
        check(self.sparse_scale.is_finite() && self.sparse_scale > 0.0, || {
            format!("sparse scale must be > 0, got {}", self.sparse_scale)
        })?;
        check(self.overlay_base_cap > 0.0 && self.overlay_base_cap <= 1.0, || {
            format!("overlay cap must be in (0, 1], got {}", self.overlay_base_cap)
        })?;
        check(self.overlay_decay > 0.0 && self.overlay_decay < 1.0, || {
            format!("overlay decay must be in (0, 1), got {}", self.overlay_decay)
        })?;
        if let Some(c) = self.height_contrast {
            check(c.is_finite() && c > 0.0, || {
                format!("height contrast must be > 0, got {c}")
            })?;
        }
        Ok(())
    }

    /// Number of layers actually blended for `available` bundles.
    pub fn effective_variants(&self, available: usize) -> usize {
        (self.variant_count.clamp(1, 4) as usize).min(available)
    }

    /// Opacity cap of the `k`-th overlay layer (k starts at 1).
    pub fn overlay_cap(&self, k: u32) -> f32 {
        self.overlay_base_cap * self.overlay_decay.powi(k as i32 - 1)
    }
}

/// Height bands and slope thresholds of the terrain material.
///
/// Slopes are on the steepness scale `1 - |normal.z|`: 0 is flat, 1 vertical.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainLayerConfig {
    pub ground_ratio: f32,
    pub rock_ratio: f32,
    pub height_blend_width: f32,
    pub cliff_slope_start: f32,
    pub cliff_slope_end: f32,
}

impl TerrainLayerConfig {
    pub fn validate(&self) -> Result<()> {
        let (g, r) = (self.ground_ratio, self.rock_ratio);
        check(0.0 < g && g < r && r < 1.0, || {
            format!("expected 0 < groundRatio < rockRatio < 1, got {g} and {r}")
        })?;
        check(self.height_blend_width >= 0.0, || {
            format!("heightBlendWidth must be >= 0, got {}", self.height_blend_width)
        })?;
        let (s, e) = (self.cliff_slope_start, self.cliff_slope_end);
        check((0.0..=1.0).contains(&s) && (0.0..=1.0).contains(&e) && s < e, || {
            format!("expected 0 <= cliffSlopeStart < cliffSlopeEnd <= 1, got {s} and {e}")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let cfg: TextureConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, TextureConfig::default());
        assert_eq!(cfg.texture_root_dir, PathBuf::from("Texture"));
        cfg.validate().unwrap();
    }

    #[test]
    fn camel_case_keys_and_overrides_parse() {
        let cfg: TextureConfig = serde_json::from_str(
            r#"{
                "seed": -5,
                "textureVariants": 2,
                "mixScale": 3.5,
                "applyRoadTextures": false,
                "categoryOverrides": { "Rock": "/packs/Rock041" }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.seed, -5);
        assert_eq!(cfg.texture_variants, 2);
        assert!(!cfg.apply_road_textures);
        assert_eq!(
            cfg.category_overrides.get(&Category::Rock),
            Some(&PathBuf::from("/packs/Rock041"))
        );
    }

    #[test]
    fn rejects_inverted_height_bands() {
        let cfg = TextureConfig {
            ground_ratio: 0.8,
            rock_ratio: 0.5,
            ..TextureConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(TextureError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_out_of_range_variants() {
        let cfg = TextureConfig {
            texture_variants: 0,
            ..TextureConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn dominance_must_exceed_parity() {
        let cfg = BlendConfig {
            dominant_min: 0.5,
            ..BlendConfig::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = BlendConfig {
            dominant_min: 0.95,
            dominant_max: 0.9,
            ..BlendConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn category_seeds_differ_and_road_is_anisotropic() {
        let cfg = TextureConfig::default();
        let ground = cfg.blend_config_for(Category::Ground);
        let rock = cfg.blend_config_for(Category::Rock);
        let road = cfg.blend_config_for(Category::Road);
        assert_ne!(ground.seed, rock.seed);
        assert_eq!(road.spatial_scale, [6.0 * 1.2, 6.0 * 0.25, 1.0]);
        assert_eq!((road.dominant_min, road.dominant_max), (0.80, 0.92));
        assert_eq!(road.edge_softness, 0.04);
    }

    #[test]
    fn overlay_cap_decays_geometrically() {
        let cfg = BlendConfig::default();
        assert!((cfg.overlay_cap(1) - 0.6).abs() < 1e-6);
        assert!((cfg.overlay_cap(2) - 0.6 * 0.45).abs() < 1e-6);
        assert_eq!(cfg.effective_variants(2), 2);
        assert_eq!(cfg.effective_variants(10), 3);
    }
}
