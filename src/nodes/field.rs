//! Coordinate mapping and the coherent fields that drive blending.

use std::f32::consts::TAU;

use rand::Rng;
use serde_json::json;

use super::remap::smoothstep_node;
use crate::graph::{GraphBuilder, Socket, SocketType};

/// Scale, then rotate about z, then translate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvTransform {
    pub location: [f32; 3],
    /// Radians about the z axis.
    pub rotation: f32,
    pub scale: [f32; 3],
}

impl UvTransform {
    pub fn scale(scale: [f32; 3]) -> Self {
        Self {
            location: [0.0; 3],
            rotation: 0.0,
            scale,
        }
    }

    /// Per-layer jitter so repeated tiles of different bundles never line up.
    pub fn random(rng: &mut impl Rng) -> Self {
        let rotation = rng.gen_range(0.0..TAU);
        let s = rng.gen_range(0.9..1.1);
        let x = rng.gen_range(-100.0..100.0);
        let y = rng.gen_range(-100.0..100.0);
        Self {
            location: [x, y, 0.0],
            rotation,
            scale: [s, s, 1.0],
        }
    }
}

pub fn mapping(b: &mut GraphBuilder, vector: &Socket, transform: &UvTransform) -> Socket {
    let id = b.add_node(
        "Mapping",
        [
            ("location", json!(transform.location)),
            ("rotation", json!([0.0, 0.0, transform.rotation])),
            ("scale", json!(transform.scale)),
        ],
    );
    b.connect(vector, &id, "vector");
    Socket::new(id, "vector", SocketType::Vector)
}

/// Two independent per-cell signals of one cellular partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionField {
    /// Which of the two blended bundles owns the cell: exactly 0 or 1 inside
    /// a cell, fractional only in the smoothed band along cell borders.
    pub region: Socket,
    /// Where inside the dominance range the cell sits.
    pub random: Socket,
}

/// Voronoi cells over `coords`. The cell color's blue channel (a per-cell
/// coin flip) becomes the region field and its green channel the random field.
pub fn partition_field(
    b: &mut GraphBuilder,
    coords: &Socket,
    seed: u32,
    smoothness: f32,
) -> PartitionField {
    let voronoi = b.add_node(
        "Voronoi",
        [
            ("seed", json!(seed)),
            ("smoothness", json!(smoothness.clamp(0.0, 1.0))),
        ],
    );
    b.connect(coords, &voronoi, "vector");
    let split = b.add_node("SeparateColor", []);
    b.connect(&Socket::new(&voronoi, "color", SocketType::Color), &split, "color");
    PartitionField {
        region: Socket::new(split.clone(), "b", SocketType::Float),
        random: Socket::new(split, "g", SocketType::Float),
    }
}

/// Patchy mask: 1 on roughly `coverage` of the surface, feathered by
/// `softness` on each side of the threshold.
pub fn sparse_mask(
    b: &mut GraphBuilder,
    coords: &Socket,
    seed: u32,
    coverage: f32,
    softness: f32,
    scale: f32,
) -> Socket {
    let noise = b.add_node(
        "Noise",
        [
            ("seed", json!(seed)),
            ("scale", json!(scale)),
            ("detail", json!(2)),
        ],
    );
    b.connect(coords, &noise, "vector");
    let threshold = (1.0 - coverage).clamp(0.01, 0.99);
    let half = softness.clamp(0.001, 0.49);
    let lo = (threshold - half).clamp(0.0, 1.0);
    let hi = (threshold + half).clamp(0.0, 1.0);
    smoothstep_node(b, &Socket::new(noise, "fac", SocketType::Float), lo, hi)
}
