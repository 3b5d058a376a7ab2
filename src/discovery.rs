//! Texture bundle discovery.
//!
//! Two stages: [`discover_category`] lists a directory (the only filesystem
//! access in the crate's asset path), then [`classify_bundle`] maps sorted file
//! names to channels without touching the disk.

use std::fmt;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TextureError};

pub const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "tif", "tiff", "exr", "hdr"];

const COLOR_KEYWORDS: [&str; 4] = ["color", "albedo", "diffuse", "basecolor"];
const AO_KEYWORDS: [&str; 2] = ["ambientocclusion", "ao"];
const ROUGHNESS_KEYWORDS: [&str; 1] = ["roughness"];
const DISPLACEMENT_KEYWORDS: [&str; 2] = ["displacement", "height"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Ground,
    Rock,
    Snow,
    Cliff,
    Road,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Ground,
        Category::Rock,
        Category::Snow,
        Category::Cliff,
        Category::Road,
    ];

    /// Layers of the terrain material, bottom to top, cliff last.
    pub const TERRAIN: [Category; 4] = [
        Category::Ground,
        Category::Rock,
        Category::Snow,
        Category::Cliff,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            Category::Ground => "Ground",
            Category::Rock => "Rock",
            Category::Snow => "Snow",
            Category::Cliff => "Cliff",
            Category::Road => "Road",
        }
    }

    /// Mixed into the configured seed so categories never share a sequence.
    pub fn seed_salt(self) -> u64 {
        match self {
            Category::Ground => 0x13579,
            Category::Rock => 0x2468A,
            Category::Snow => 0xABCDE,
            Category::Cliff => 0x77777,
            Category::Road => 0xF00D,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Color,
    AmbientOcclusion,
    Roughness,
    Normal,
    Displacement,
}

impl Channel {
    /// Every channel except color holds data rather than a picture.
    pub fn is_data(self) -> bool {
        !matches!(self, Channel::Color)
    }
}

/// File paths of one bundle, one optional entry per channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleFiles {
    pub name: String,
    pub color: Option<PathBuf>,
    pub ambient_occlusion: Option<PathBuf>,
    pub roughness: Option<PathBuf>,
    pub normal: Option<PathBuf>,
    pub displacement: Option<PathBuf>,
}

impl BundleFiles {
    pub fn get(&self, channel: Channel) -> Option<&Path> {
        match channel {
            Channel::Color => self.color.as_deref(),
            Channel::AmbientOcclusion => self.ambient_occlusion.as_deref(),
            Channel::Roughness => self.roughness.as_deref(),
            Channel::Normal => self.normal.as_deref(),
            Channel::Displacement => self.displacement.as_deref(),
        }
    }

    pub fn channel_count(&self) -> usize {
        [
            Channel::Color,
            Channel::AmbientOcclusion,
            Channel::Roughness,
            Channel::Normal,
            Channel::Displacement,
        ]
        .into_iter()
        .filter(|c| self.get(*c).is_some())
        .count()
    }
}

pub fn is_image_file(file_name: &str) -> bool {
    let Some((_, ext)) = file_name.rsplit_once('.') else {
        return false;
    };
    IMAGE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e))
}

fn first_match<'a>(images: &[&'a str], keywords: &[&str]) -> Option<&'a str> {
    images.iter().copied().find(|name| {
        let low = name.to_ascii_lowercase();
        keywords.iter().any(|k| low.contains(k))
    })
}

fn normal_match<'a>(images: &[&'a str]) -> Option<&'a str> {
    first_match(images, &["normalgl"]).or_else(|| {
        images.iter().copied().find(|name| {
            let low = name.to_ascii_lowercase();
            low.contains("normal") && !low.contains("normaldx")
        })
    })
}

/// Assigns the image files of one bundle directory to channels.
///
/// Non-image names are ignored. Returns `None` when nothing matched.
pub fn classify_bundle(name: &str, dir: &Path, file_names: &[String]) -> Option<BundleFiles> {
    let mut images: Vec<&str> = file_names
        .iter()
        .map(String::as_str)
        .filter(|f| is_image_file(f))
        .collect();
    images.sort_unstable();

    let ambient_occlusion = first_match(&images, &AO_KEYWORDS);
    let roughness = first_match(&images, &ROUGHNESS_KEYWORDS);
    let normal = normal_match(&images);
    let displacement = first_match(&images, &DISPLACEMENT_KEYWORDS);
    let color = first_match(&images, &COLOR_KEYWORDS).or_else(|| {
        let claimed = [ambient_occlusion, roughness, normal, displacement];
        let mut usable = images
            .iter()
            .copied()
            .filter(|f| !f.to_ascii_lowercase().contains("normaldx"));
        let first = usable.clone().next();
        usable.find(|f| !claimed.contains(&Some(*f))).or(first)
    });

    let bundle = BundleFiles {
        name: name.to_string(),
        color: color.map(|f| dir.join(f)),
        ambient_occlusion: ambient_occlusion.map(|f| dir.join(f)),
        roughness: roughness.map(|f| dir.join(f)),
        normal: normal.map(|f| dir.join(f)),
        displacement: displacement.map(|f| dir.join(f)),
    };
    (bundle.channel_count() > 0).then_some(bundle)
}

struct DirEntry {
    name: String,
    is_dir: bool,
}

fn list_dir_sorted(dir: &Path) -> Result<Vec<DirEntry>> {
    let io_err = |source| TextureError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        // Follows symlinks, unlike DirEntry::file_type.
        let is_dir = entry.path().is_dir();
        entries.push(DirEntry { name, is_dir });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Classifies a single bundle directory.
pub fn discover_bundle_dir(dir: &Path) -> Result<Option<BundleFiles>> {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string());
    let files: Vec<String> = list_dir_sorted(dir)?
        .into_iter()
        .filter(|e| !e.is_dir)
        .map(|e| e.name)
        .collect();
    Ok(classify_bundle(&name, dir, &files))
}

/// Lists every bundle of one category directory, sorted by bundle name.
pub fn discover_category(dir: &Path, category: Category) -> Result<Vec<BundleFiles>> {
    if !dir.is_dir() {
        return Err(TextureError::AssetDirectoryMissing {
            category: category.to_string(),
            path: dir.to_path_buf(),
        });
    }

    let mut bundles = Vec::new();
    for entry in list_dir_sorted(dir)? {
        if entry.is_dir {
            match discover_bundle_dir(&dir.join(&entry.name))? {
                Some(bundle) => bundles.push(bundle),
                None => debug!("{category}: skipping '{}' (no image files)", entry.name),
            }
        } else if is_image_file(&entry.name) {
            let stem = Path::new(&entry.name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| entry.name.clone());
            bundles.push(BundleFiles {
                name: stem,
                color: Some(dir.join(&entry.name)),
                ..BundleFiles::default()
            });
        }
    }
    bundles.sort_by(|a, b| a.name.cmp(&b.name));
    debug!("{category}: discovered {} bundle(s) in {}", bundles.len(), dir.display());
    Ok(bundles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn classifies_a_typical_pbr_pack() {
        let dir = Path::new("/packs/Rock041");
        let files = names(&[
            "Rock041_1K_AmbientOcclusion.jpg",
            "Rock041_1K_Color.jpg",
            "Rock041_1K_Displacement.jpg",
            "Rock041_1K_NormalDX.jpg",
            "Rock041_1K_NormalGL.jpg",
            "Rock041_1K_Roughness.jpg",
            "Rock041.usdc",
            "preview.txt",
        ]);
        let b = classify_bundle("Rock041", dir, &files).unwrap();
        assert_eq!(b.color, Some(dir.join("Rock041_1K_Color.jpg")));
        assert_eq!(b.ambient_occlusion, Some(dir.join("Rock041_1K_AmbientOcclusion.jpg")));
        assert_eq!(b.roughness, Some(dir.join("Rock041_1K_Roughness.jpg")));
        assert_eq!(b.normal, Some(dir.join("Rock041_1K_NormalGL.jpg")));
        assert_eq!(b.displacement, Some(dir.join("Rock041_1K_Displacement.jpg")));
    }

    #[test]
    fn normal_dx_alone_is_never_used() {
        let files = names(&["Rock_Color.png", "Rock_NormalDX.png"]);
        let b = classify_bundle("Rock", Path::new("r"), &files).unwrap();
        assert_eq!(b.normal, None);

        let files = names(&["Rock_NormalDX.png", "Rock_Normal.png"]);
        let b = classify_bundle("Rock", Path::new("r"), &files).unwrap();
        assert_eq!(b.normal, Some(Path::new("r").join("Rock_Normal.png")));
    }

    #[test]
    fn normal_dx_never_becomes_the_color_fallback() {
        let files = names(&["Rock_NormalDX.png", "Rock_NormalGL.png"]);
        let b = classify_bundle("Rock", Path::new("r"), &files).unwrap();
        assert_eq!(b.normal, Some(Path::new("r").join("Rock_NormalGL.png")));
        assert_eq!(b.color, Some(Path::new("r").join("Rock_NormalGL.png")));

        let files = names(&["Rock_NormalDX.png"]);
        assert!(classify_bundle("Rock", Path::new("r"), &files).is_none());
    }

    #[test]
    fn color_falls_back_to_first_unclaimed_image() {
        let files = names(&["b_roughness.PNG", "c_texture.png", "d_other.png"]);
        let b = classify_bundle("x", Path::new("x"), &files).unwrap();
        assert_eq!(b.color, Some(Path::new("x").join("c_texture.png")));

        let files = names(&["only_roughness.png"]);
        let b = classify_bundle("x", Path::new("x"), &files).unwrap();
        assert_eq!(b.color, Some(Path::new("x").join("only_roughness.png")));
    }

    #[test]
    fn bundles_without_images_are_dropped() {
        let files = names(&["readme.md", "scene.blend"]);
        assert!(classify_bundle("x", Path::new("x"), &files).is_none());
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(is_image_file("a.TIFF"));
        assert!(is_image_file("a.b.Exr"));
        assert!(!is_image_file("png"));
        assert!(!is_image_file("a.webp"));
    }
}
