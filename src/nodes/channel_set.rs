//! Node cluster sampling one texture bundle.

use serde_json::json;

use super::{
    ChannelOutputBundle, DEFAULT_COLOR, DEFAULT_DISPLACEMENT, DEFAULT_NORMAL, DEFAULT_ROUGHNESS,
    color_input, float_input, luminance, vector_input,
};
use crate::asset_store::ImageResource;
use crate::graph::{GraphBuilder, Socket, SocketType};
use crate::loader::TextureChannelSet;

fn image_texture(b: &mut GraphBuilder, resource: &ImageResource, uv: &Socket) -> Socket {
    let id = b.add_node(
        "ImageTexture",
        [
            ("image", json!(resource.info.path.to_string_lossy())),
            ("colorSpace", json!(resource.color_space.param_name())),
            ("width", json!(resource.info.width)),
            ("height", json!(resource.info.height)),
        ],
    );
    b.connect(uv, &id, "vector");
    Socket::new(id, "color", SocketType::Color)
}

/// Constant sockets used for a missing bundle.
pub fn default_bundle(b: &mut GraphBuilder) -> ChannelOutputBundle {
    ChannelOutputBundle {
        color: color_input(b, DEFAULT_COLOR),
        roughness: float_input(b, DEFAULT_ROUGHNESS),
        normal: vector_input(b, DEFAULT_NORMAL),
        displacement: float_input(b, DEFAULT_DISPLACEMENT),
    }
}

/// Samples every present channel of `set` at `uv`; absent channels fall back
/// to the default constants.
pub fn channel_set_cluster(
    b: &mut GraphBuilder,
    set: &TextureChannelSet,
    uv: &Socket,
) -> ChannelOutputBundle {
    let base_color = match &set.color {
        Some(res) => image_texture(b, res, uv),
        None => color_input(b, DEFAULT_COLOR),
    };
    let color = match &set.ambient_occlusion {
        Some(res) => {
            let ao = image_texture(b, res, uv);
            let occlusion = luminance(b, &ao);
            let id = b.add_node(
                "ColorMix",
                [("blendType", json!("multiply")), ("factor", json!(1.0))],
            );
            b.connect(&base_color, &id, "a");
            b.connect(&occlusion, &id, "b");
            Socket::new(id, "color", SocketType::Color)
        }
        None => base_color,
    };

    let roughness = match &set.roughness {
        Some(res) => {
            let tex = image_texture(b, res, uv);
            luminance(b, &tex)
        }
        None => float_input(b, DEFAULT_ROUGHNESS),
    };

    let normal = match &set.normal {
        Some(res) => {
            let tex = image_texture(b, res, uv);
            let id = b.add_node("NormalMap", [("strength", json!(1.0))]);
            b.connect(&tex, &id, "color");
            Socket::new(id, "normal", SocketType::Vector)
        }
        None => vector_input(b, DEFAULT_NORMAL),
    };

    let displacement = match &set.displacement {
        Some(res) => {
            let tex = image_texture(b, res, uv);
            luminance(b, &tex)
        }
        None => float_input(b, DEFAULT_DISPLACEMENT),
    };

    ChannelOutputBundle {
        color,
        roughness,
        normal,
        displacement,
    }
}
