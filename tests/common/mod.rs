#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// Writes a tiny valid PNG; only its header is ever read.
pub fn write_png(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    image::RgbaImage::new(4, 4).save(path).unwrap();
}

/// Creates `<root>/<category>/<bundle>/<file>` for every file name.
pub fn bundle(root: &Path, category: &str, bundle: &str, files: &[&str]) -> PathBuf {
    let dir = root.join(category).join(bundle);
    std::fs::create_dir_all(&dir).unwrap();
    for f in files {
        write_png(&dir.join(f));
    }
    dir
}

pub fn length(v: [f32; 3]) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

pub fn assert_color_near(actual: [f32; 4], expected: [f32; 4]) {
    for k in 0..4 {
        assert!(
            (actual[k] - expected[k]).abs() < 1e-4,
            "{actual:?} != {expected:?}"
        );
    }
}
