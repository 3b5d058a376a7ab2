//! CPU versions of the procedural textures used by generated graphs.

use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};

use crate::nodes::smoothstep;

fn hash(ix: i32, iy: i32, iz: i32, seed: u32, salt: u32) -> u32 {
    let mut h = seed ^ salt.wrapping_mul(0x9E37_79B9);
    for v in [ix as u32, iy as u32, iz as u32] {
        h ^= v.wrapping_mul(0x85EB_CA6B);
        h = h.rotate_left(13).wrapping_mul(0xC2B2_AE35);
    }
    h ^= h >> 16;
    h = h.wrapping_mul(0x7FEB_352D);
    h ^= h >> 15;
    h = h.wrapping_mul(0x846C_A68B);
    h ^ (h >> 16)
}

fn unit(h: u32) -> f32 {
    (h >> 8) as f32 / (1u32 << 24) as f32
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoronoiSample {
    /// Distance to the nearest feature point.
    pub distance: f32,
    /// Owning cell's color, blended near cell borders. Red and green are
    /// uniform in [0, 1); blue is a per-cell coin flip, exactly 0 or 1.
    pub color: [f32; 3],
}

/// Jittered-grid cellular noise with a smooth-F1 color.
///
/// Cells whose feature point is farther than `smoothness / 2` beyond the
/// nearest one get zero weight, so cell interiors carry their exact color.
pub fn voronoi(p: [f32; 3], seed: u32, smoothness: f32) -> VoronoiSample {
    let cell = p.map(|c| c.floor() as i32);
    let mut candidates: Vec<(f32, [f32; 3])> = Vec::with_capacity(27);
    for dz in -1..=1 {
        for dy in -1..=1 {
            for dx in -1..=1 {
                let (cx, cy, cz) = (cell[0] + dx, cell[1] + dy, cell[2] + dz);
                let feature = [
                    cx as f32 + unit(hash(cx, cy, cz, seed, 1)),
                    cy as f32 + unit(hash(cx, cy, cz, seed, 2)),
                    cz as f32 + unit(hash(cx, cy, cz, seed, 3)),
                ];
                let d = ((feature[0] - p[0]).powi(2)
                    + (feature[1] - p[1]).powi(2)
                    + (feature[2] - p[2]).powi(2))
                .sqrt();
                let color = [
                    unit(hash(cx, cy, cz, seed, 4)),
                    unit(hash(cx, cy, cz, seed, 5)),
                    if unit(hash(cx, cy, cz, seed, 6)) < 0.5 { 0.0 } else { 1.0 },
                ];
                candidates.push((d, color));
            }
        }
    }

    let f1 = candidates
        .iter()
        .map(|(d, _)| *d)
        .fold(f32::INFINITY, f32::min);
    let band = smoothness.clamp(0.0, 1.0) * 0.5;
    let mut total = 0.0;
    let mut color = [0.0f32; 3];
    for (d, c) in &candidates {
        let w = if band > 0.0 {
            1.0 - smoothstep(d - f1, 0.0, band)
        } else if *d <= f1 {
            1.0
        } else {
            0.0
        };
        if w <= 0.0 {
            continue;
        }
        total += w;
        for k in 0..3 {
            color[k] += w * c[k];
        }
    }
    if total > 0.0 {
        color = color.map(|c| c / total);
    }
    VoronoiSample {
        distance: f1,
        color,
    }
}

/// Seeded OpenSimplex2 fBm remapped to [0, 1].
pub struct FbmNoise {
    noise: FastNoiseLite,
    scale: f32,
}

impl FbmNoise {
    pub fn new(seed: u32, scale: f32, detail: u32) -> Self {
        let mut noise = FastNoiseLite::with_seed(seed as i32);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_fractal_type(Some(FractalType::FBm));
        noise.set_fractal_octaves(Some(detail.clamp(1, 8) as i32));
        noise.set_frequency(Some(1.0));
        Self { noise, scale }
    }

    pub fn sample(&self, p: [f32; 3]) -> f32 {
        let s = self.scale;
        let n = self.noise.get_noise_3d(p[0] * s, p[1] * s, p[2] * s);
        ((n + 1.0) * 0.5).clamp(0.0, 1.0)
    }
}
