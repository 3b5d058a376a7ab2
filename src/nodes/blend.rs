//! Two-input blend of channel bundles.

use serde_json::json;

use super::ChannelOutputBundle;
use super::remap::{MathOp, lerp, math, smoothstep_node};
use crate::graph::{GraphBuilder, Socket, SocketType};

/// Interpolates every channel of `a` towards `c` by `factor` (0 keeps `a`).
///
/// The normal is renormalized after interpolation; a zero-length result
/// resolves to flat up.
pub fn blend_bundles(
    b: &mut GraphBuilder,
    a: &ChannelOutputBundle,
    c: &ChannelOutputBundle,
    factor: &Socket,
) -> ChannelOutputBundle {
    let color_mix = b.add_node("ColorMix", [("blendType", json!("mix"))]);
    b.connect(factor, &color_mix, "factor");
    b.connect(&a.color, &color_mix, "a");
    b.connect(&c.color, &color_mix, "b");

    let roughness = lerp(b, factor, &a.roughness, &c.roughness);

    let normal_mix = b.add_node("MixVector", []);
    b.connect(factor, &normal_mix, "factor");
    b.connect(&a.normal, &normal_mix, "a");
    b.connect(&c.normal, &normal_mix, "b");
    let normalize = b.add_node("Normalize", []);
    b.connect(
        &Socket::new(normal_mix, "result", SocketType::Vector),
        &normalize,
        "vector",
    );

    let displacement = lerp(b, factor, &a.displacement, &c.displacement);

    ChannelOutputBundle {
        color: Socket::new(color_mix, "color", SocketType::Color),
        roughness,
        normal: Socket::new(normalize, "vector", SocketType::Vector),
        displacement,
    }
}

/// Sharpens `factor` so the bundle whose displacement is higher wins first.
///
/// `smoothstep((h_c + f) - (h_a + 1 - f), -contrast, contrast)`
pub fn height_aware_factor(
    b: &mut GraphBuilder,
    factor: &Socket,
    a: &ChannelOutputBundle,
    c: &ChannelOutputBundle,
    contrast: f32,
) -> Socket {
    let weight_a = math(b, MathOp::Subtract, 1.0_f32, factor);
    let lifted_a = math(b, MathOp::Add, &a.displacement, &weight_a);
    let lifted_c = math(b, MathOp::Add, &c.displacement, factor);
    let diff = math(b, MathOp::Subtract, &lifted_c, &lifted_a);
    let k = contrast.max(0.001);
    smoothstep_node(b, &diff, -k, k)
}
