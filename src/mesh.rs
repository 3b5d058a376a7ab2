use std::path::Path;

use anyhow::{Context, Result as AnyResult, bail};
use log::debug;

use crate::error::{Result, TextureError};

/// Planar UV tile size, in mesh units, for meshes that arrive without UVs.
pub const PLANAR_UV_TILE: f32 = 5.0;

/// Triangle mesh with one attribute entry per vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Regular grid in the XY plane, `cols x rows` vertices spaced by
    /// `spacing`, lifted by `height(x, y)`.
    pub fn from_heightfield(
        cols: usize,
        rows: usize,
        spacing: f32,
        height: impl Fn(f32, f32) -> f32,
    ) -> Self {
        let mut mesh = MeshData::default();
        for j in 0..rows {
            for i in 0..cols {
                let (x, y) = (i as f32 * spacing, j as f32 * spacing);
                mesh.positions.push([x, y, height(x, y)]);
            }
        }
        for j in 0..rows.saturating_sub(1) {
            for i in 0..cols.saturating_sub(1) {
                let v = (j * cols + i) as u32;
                let c = cols as u32;
                mesh.indices.extend_from_slice(&[v, v + 1, v + c + 1, v, v + c + 1, v + c]);
            }
        }
        mesh.compute_normals();
        mesh
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Lowest and highest vertex z in one pass.
    pub fn z_bounds(&self) -> Result<(f32, f32)> {
        let mut iter = self.positions.iter().map(|p| p[2]);
        let Some(first) = iter.next() else {
            return Err(TextureError::MeshUnavailable(
                "mesh has no vertices".to_string(),
            ));
        };
        Ok(iter.fold((first, first), |(lo, hi), z| (lo.min(z), hi.max(z))))
    }

    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty() && self.uvs.len() == self.positions.len()
    }

    /// Projects XY onto UV with a `tile`-sized repeat when the mesh has no
    /// usable UVs. Returns whether UVs were generated.
    pub fn ensure_planar_uvs(&mut self, tile: f32) -> bool {
        if self.has_uvs() {
            return false;
        }
        let tile = if tile > 0.0 { tile } else { PLANAR_UV_TILE };
        self.uvs = self
            .positions
            .iter()
            .map(|p| [p[0] / tile, p[1] / tile])
            .collect();
        true
    }

    /// Area-weighted vertex normals from the triangle list.
    pub fn compute_normals(&mut self) {
        let mut acc = vec![[0.0f32; 3]; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= acc.len() || b >= acc.len() || c >= acc.len() {
                continue;
            }
            let (pa, pb, pc) = (self.positions[a], self.positions[b], self.positions[c]);
            let e1 = [pb[0] - pa[0], pb[1] - pa[1], pb[2] - pa[2]];
            let e2 = [pc[0] - pa[0], pc[1] - pa[1], pc[2] - pa[2]];
            let n = [
                e1[1] * e2[2] - e1[2] * e2[1],
                e1[2] * e2[0] - e1[0] * e2[2],
                e1[0] * e2[1] - e1[1] * e2[0],
            ];
            for v in [a, b, c] {
                for k in 0..3 {
                    acc[v][k] += n[k];
                }
            }
        }
        self.normals = acc
            .into_iter()
            .map(|n| {
                let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
                if len > 1e-12 {
                    [n[0] / len, n[1] / len, n[2] / len]
                } else {
                    [0.0, 0.0, 1.0]
                }
            })
            .collect();
    }
}

/// Loads every model of an OBJ file into one mesh.
pub fn load_obj(path: impl AsRef<Path>) -> AnyResult<MeshData> {
    let path = path.as_ref();
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        },
    )
    .with_context(|| format!("failed to load obj at {}", path.display()))?;

    let mut mesh = MeshData::default();
    let mut missing_normals = false;
    for model in &models {
        let m = &model.mesh;
        let base = mesh.positions.len() as u32;
        let count = m.positions.len() / 3;
        mesh.positions
            .extend(m.positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]]));
        if m.normals.len() == m.positions.len() {
            mesh.normals
                .extend(m.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]));
        } else {
            missing_normals = true;
        }
        if m.texcoords.len() / 2 == count {
            mesh.uvs
                .extend(m.texcoords.chunks_exact(2).map(|t| [t[0], t[1]]));
        }
        mesh.indices.extend(m.indices.iter().map(|i| base + i));
    }
    if mesh.positions.is_empty() {
        bail!("obj at {} contains no vertices", path.display());
    }
    if missing_normals {
        mesh.compute_normals();
    }
    if !mesh.has_uvs() {
        mesh.uvs.clear();
    }
    debug!(
        "loaded {}: {} vertices, {} triangles",
        path.display(),
        mesh.vertex_count(),
        mesh.indices.len() / 3
    );
    Ok(mesh)
}
