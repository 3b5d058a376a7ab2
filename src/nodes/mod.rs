//! Graph primitives shared by the category synthesizer and the material
//! assemblers.
//!
//! Every helper appends nodes to a [`GraphBuilder`] and hands back typed
//! [`Socket`]s; nothing here inspects or edits nodes once created.

pub mod blend;
pub mod channel_set;
pub mod field;
pub mod remap;

use serde_json::json;

use crate::graph::{GraphBuilder, Socket, SocketType};

pub use blend::{blend_bundles, height_aware_factor};
pub use channel_set::{channel_set_cluster, default_bundle};
pub use field::{PartitionField, UvTransform, mapping, partition_field, sparse_mask};
pub use remap::{MathOp, Operand, lerp, math, remap, remap_node, smoothstep, smoothstep_node};

pub const DEFAULT_COLOR: [f32; 4] = [0.5, 0.5, 0.5, 1.0];
pub const DEFAULT_ROUGHNESS: f32 = 0.65;
pub const DEFAULT_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];
pub const DEFAULT_DISPLACEMENT: f32 = 0.0;

/// The four sockets one material stage hands to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOutputBundle {
    pub color: Socket,
    pub roughness: Socket,
    /// Unit length.
    pub normal: Socket,
    pub displacement: Socket,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometrySockets {
    pub position: Socket,
    pub normal: Socket,
}

pub fn float_input(b: &mut GraphBuilder, value: f32) -> Socket {
    let id = b.add_node("FloatInput", [("value", json!(value))]);
    Socket::new(id, "value", SocketType::Float)
}

pub fn color_input(b: &mut GraphBuilder, rgba: [f32; 4]) -> Socket {
    let id = b.add_node("ColorInput", [("value", json!(rgba))]);
    Socket::new(id, "color", SocketType::Color)
}

pub fn vector_input(b: &mut GraphBuilder, v: [f32; 3]) -> Socket {
    let id = b.add_node("Vector3Input", [("value", json!(v))]);
    Socket::new(id, "vector", SocketType::Vector)
}

pub fn tex_coord(b: &mut GraphBuilder) -> Socket {
    let id = b.add_node("TexCoord", []);
    Socket::new(id, "uv", SocketType::Vector)
}

pub fn geometry(b: &mut GraphBuilder) -> GeometrySockets {
    let id = b.add_node("Geometry", []);
    GeometrySockets {
        position: Socket::new(id.clone(), "position", SocketType::Vector),
        normal: Socket::new(id, "normal", SocketType::Vector),
    }
}

/// Rec. 709 luminance of a color.
pub fn luminance(b: &mut GraphBuilder, color: &Socket) -> Socket {
    let id = b.add_node("RgbToBw", []);
    b.connect(color, &id, "color");
    Socket::new(id, "val", SocketType::Float)
}

pub fn separate_xyz(b: &mut GraphBuilder, vector: &Socket) -> [Socket; 3] {
    let id = b.add_node("SeparateXYZ", []);
    b.connect(vector, &id, "vector");
    ["x", "y", "z"].map(|port| Socket::new(id.clone(), port, SocketType::Float))
}

/// Surface and displacement sockets of a finished material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialSockets {
    pub surface: Socket,
    pub displacement: Socket,
}

/// Terminates a graph: `PrincipledBsdf` for the surface, `Displacement`
/// around mid-level 0.5, both wired into `MaterialOutput` and exposed as the
/// graph's named outputs.
pub fn material_output(
    b: &mut GraphBuilder,
    bundle: &ChannelOutputBundle,
    displacement_scale: f32,
) -> MaterialSockets {
    let bsdf = b.add_node("PrincipledBsdf", []);
    b.connect(&bundle.color, &bsdf, "baseColor");
    b.connect(&bundle.roughness, &bsdf, "roughness");
    b.connect(&bundle.normal, &bsdf, "normal");
    let surface = Socket::new(bsdf, "bsdf", SocketType::Shader);

    let disp = b.add_node(
        "Displacement",
        [
            ("midlevel", json!(0.5)),
            ("scale", json!(displacement_scale)),
        ],
    );
    b.connect(&bundle.displacement, &disp, "height");
    let displacement = Socket::new(disp, "displacement", SocketType::Vector);

    let out = b.add_node("MaterialOutput", []);
    b.connect(&surface, &out, "surface");
    b.connect(&displacement, &out, "displacement");
    b.set_output("surface", &surface);
    b.set_output("displacement", &displacement);

    MaterialSockets {
        surface,
        displacement,
    }
}
