use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::{ImageFormat, ImageReader};
use log::debug;

use crate::error::{Result, TextureError};

/// Header facts of one image file. Pixels are never decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

/// How a sampler must interpret texel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    Srgb,
    NonColor,
}

impl ColorSpace {
    pub fn for_data(is_data: bool) -> Self {
        if is_data {
            ColorSpace::NonColor
        } else {
            ColorSpace::Srgb
        }
    }

    /// Param value written into `ImageTexture` nodes.
    pub fn param_name(self) -> &'static str {
        match self {
            ColorSpace::Srgb => "sRGB",
            ColorSpace::NonColor => "Non-Color",
        }
    }

    pub fn from_param(name: &str) -> Option<Self> {
        match name {
            "sRGB" => Some(ColorSpace::Srgb),
            "Non-Color" => Some(ColorSpace::NonColor),
            _ => None,
        }
    }
}

/// A cached image tagged with the color interpretation of its channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageResource {
    pub info: Arc<ImageInfo>,
    pub color_space: ColorSpace,
}

/// Thread-safe, clone-friendly image header cache keyed by absolute path.
#[derive(Debug, Clone, Default)]
pub struct ImageStore {
    inner: Arc<Mutex<HashMap<PathBuf, Arc<ImageInfo>>>>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached header for `path`, reading it on first use.
    ///
    /// Failures are not cached, so a file fixed on disk loads on the next call.
    pub fn load(&self, path: &Path, color_space: ColorSpace) -> Result<ImageResource> {
        let key = std::fs::canonicalize(path).map_err(|e| TextureError::ChannelFileUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if let Some(info) = self.get(&key) {
            return Ok(ImageResource { info, color_space });
        }

        let info = Arc::new(read_header(&key)?);
        debug!(
            "cached {} ({}x{}, {:?})",
            key.display(),
            info.width,
            info.height,
            info.format
        );
        let info = match self.inner.lock() {
            Ok(mut map) => map.entry(key).or_insert(info).clone(),
            Err(_) => info,
        };
        Ok(ImageResource { info, color_space })
    }

    pub fn get(&self, path: &Path) -> Option<Arc<ImageInfo>> {
        let map = self.inner.lock().ok()?;
        map.get(path).cloned()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.inner
            .lock()
            .ok()
            .is_some_and(|map| map.contains_key(path))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut map) = self.inner.lock() {
            map.clear();
        }
    }

    /// Drops every entry located below `root`; returns how many were removed.
    pub fn evict_under(&self, root: &Path) -> usize {
        let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        let Ok(mut map) = self.inner.lock() else {
            return 0;
        };
        let before = map.len();
        map.retain(|path, _| !path.starts_with(&root));
        before - map.len()
    }
}

fn read_header(path: &Path) -> Result<ImageInfo> {
    let unreadable = |reason: String| TextureError::ChannelFileUnreadable {
        path: path.to_path_buf(),
        reason,
    };
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| unreadable(e.to_string()))?;
    let format = reader
        .format()
        .ok_or_else(|| unreadable("unrecognized image format".to_string()))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| unreadable(e.to_string()))?;
    Ok(ImageInfo {
        path: path.to_path_buf(),
        width,
        height,
        format,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
        let path = dir.join(name);
        image::RgbaImage::new(w, h).save(&path).unwrap();
        path
    }

    #[test]
    fn loads_header_once_and_shares_it() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_png(tmp.path(), "a_color.png", 4, 2);
        let store = ImageStore::new();

        let color = store.load(&path, ColorSpace::Srgb).unwrap();
        let data = store.load(&path, ColorSpace::NonColor).unwrap();
        assert_eq!((color.info.width, color.info.height), (4, 2));
        assert_eq!(color.info.format, ImageFormat::Png);
        assert!(Arc::ptr_eq(&color.info, &data.info));
        assert_eq!(data.color_space, ColorSpace::NonColor);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn garbage_and_missing_files_are_unreadable() {
        let tmp = tempfile::tempdir().unwrap();
        let bad = tmp.path().join("broken.png");
        std::fs::write(&bad, b"not an image").unwrap();
        let store = ImageStore::new();

        assert!(matches!(
            store.load(&bad, ColorSpace::Srgb),
            Err(TextureError::ChannelFileUnreadable { .. })
        ));
        assert!(matches!(
            store.load(&tmp.path().join("gone.png"), ColorSpace::Srgb),
            Err(TextureError::ChannelFileUnreadable { .. })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn evict_under_only_touches_the_given_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let inside = tmp.path().join("Texture");
        let outside = tmp.path().join("Other");
        std::fs::create_dir_all(&inside).unwrap();
        std::fs::create_dir_all(&outside).unwrap();
        let store = ImageStore::new();
        store.load(&write_png(&inside, "a.png", 1, 1), ColorSpace::Srgb).unwrap();
        store.load(&write_png(&inside, "b.png", 1, 1), ColorSpace::Srgb).unwrap();
        store.load(&write_png(&outside, "c.png", 1, 1), ColorSpace::Srgb).unwrap();

        assert_eq!(store.evict_under(&inside), 2);
        assert_eq!(store.len(), 1);
    }
}
