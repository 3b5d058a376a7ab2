use std::collections::BTreeMap;
use std::path::Path;

use log::debug;

use crate::asset_store::{ColorSpace, ImageResource, ImageStore};
use crate::discovery::{BundleFiles, Category, Channel};
use crate::error::Result;

/// One bundle's loaded channels. Any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureChannelSet {
    pub name: String,
    pub color: Option<ImageResource>,
    pub ambient_occlusion: Option<ImageResource>,
    pub roughness: Option<ImageResource>,
    pub normal: Option<ImageResource>,
    pub displacement: Option<ImageResource>,
}

impl TextureChannelSet {
    pub fn get(&self, channel: Channel) -> Option<&ImageResource> {
        match channel {
            Channel::Color => self.color.as_ref(),
            Channel::AmbientOcclusion => self.ambient_occlusion.as_ref(),
            Channel::Roughness => self.roughness.as_ref(),
            Channel::Normal => self.normal.as_ref(),
            Channel::Displacement => self.displacement.as_ref(),
        }
    }

    fn slot(&mut self, channel: Channel) -> &mut Option<ImageResource> {
        match channel {
            Channel::Color => &mut self.color,
            Channel::AmbientOcclusion => &mut self.ambient_occlusion,
            Channel::Roughness => &mut self.roughness,
            Channel::Normal => &mut self.normal,
            Channel::Displacement => &mut self.displacement,
        }
    }
}

/// Loaded bundles per category, each list sorted by bundle name.
pub type CategoryBundles = BTreeMap<Category, Vec<TextureChannelSet>>;

const CHANNELS: [Channel; 5] = [
    Channel::Color,
    Channel::AmbientOcclusion,
    Channel::Roughness,
    Channel::Normal,
    Channel::Displacement,
];

pub fn load_channel(store: &ImageStore, path: &Path, is_data: bool) -> Result<ImageResource> {
    store.load(path, ColorSpace::for_data(is_data))
}

/// Loads every channel of a bundle. Unreadable files become absent channels
/// and one warning each.
pub fn load_channel_set(
    store: &ImageStore,
    files: &BundleFiles,
    warnings: &mut Vec<String>,
) -> TextureChannelSet {
    let mut set = TextureChannelSet {
        name: files.name.clone(),
        ..TextureChannelSet::default()
    };
    for channel in CHANNELS {
        let Some(path) = files.get(channel) else {
            continue;
        };
        match load_channel(store, path, channel.is_data()) {
            Ok(resource) => *set.slot(channel) = Some(resource),
            Err(e) => {
                debug!("{}: dropping channel {channel:?}", files.name);
                warnings.push(format!("{}: {e}", files.name));
            }
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_channels_are_tagged_non_color() {
        let tmp = tempfile::tempdir().unwrap();
        let color = tmp.path().join("m_Color.png");
        let rough = tmp.path().join("m_Roughness.png");
        image::RgbaImage::new(2, 2).save(&color).unwrap();
        image::RgbaImage::new(2, 2).save(&rough).unwrap();
        let files = BundleFiles {
            name: "m".into(),
            color: Some(color),
            roughness: Some(rough),
            ..BundleFiles::default()
        };

        let mut warnings = Vec::new();
        let set = load_channel_set(&ImageStore::new(), &files, &mut warnings);
        assert!(warnings.is_empty());
        assert_eq!(set.color.unwrap().color_space, ColorSpace::Srgb);
        assert_eq!(set.roughness.unwrap().color_space, ColorSpace::NonColor);
        assert!(set.normal.is_none());
    }

    #[test]
    fn unreadable_channel_degrades_to_absent_with_warning() {
        let tmp = tempfile::tempdir().unwrap();
        let normal = tmp.path().join("m_NormalGL.png");
        std::fs::write(&normal, b"\x89PNG truncated").unwrap();
        let files = BundleFiles {
            name: "m".into(),
            normal: Some(normal),
            ..BundleFiles::default()
        };

        let mut warnings = Vec::new();
        let set = load_channel_set(&ImageStore::new(), &files, &mut warnings);
        assert!(set.normal.is_none());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("m_NormalGL.png"), "{}", warnings[0]);
    }
}
