//! Category blend synthesizer.
//!
//! Turns the bundles of one category into a single [`ChannelOutputBundle`]:
//! two dominant layers split by a cellular partition field, plus up to two
//! sparse overlays with geometrically decaying opacity. All randomness comes
//! from one `StdRng` seeded by [`BlendConfig::seed`], consumed in a fixed
//! order (shuffle, per-layer UV jitter, partition seed, overlay seeds).

use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};

use crate::config::BlendConfig;
use crate::error::Result;
use crate::graph::{GraphBuilder, Socket};
use crate::loader::TextureChannelSet;
use crate::nodes::{
    ChannelOutputBundle, MathOp, UvTransform, blend_bundles, channel_set_cluster,
    default_bundle, height_aware_factor, lerp, mapping, math, partition_field, remap_node,
    smoothstep_node, sparse_mask,
};

/// Result of one synthesizer call.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryBlend {
    pub output: ChannelOutputBundle,
    /// Names of the bundles used, in layer order.
    pub selected: Vec<String>,
    /// Blend factor between the two dominant layers, when there are two.
    pub mix_factor: Option<Socket>,
    pub overlay_masks: Vec<Socket>,
}

pub fn synthesize(
    b: &mut GraphBuilder,
    bundles: &[TextureChannelSet],
    cfg: &BlendConfig,
    uv: &Socket,
) -> Result<CategoryBlend> {
    cfg.validate()?;

    if bundles.is_empty() {
        return Ok(CategoryBlend {
            output: default_bundle(b),
            selected: Vec::new(),
            mix_factor: None,
            overlay_masks: Vec::new(),
        });
    }

    // Lexical order first so the shuffle only depends on the seed.
    let mut order: Vec<&TextureChannelSet> = bundles.iter().collect();
    order.sort_by(|a, c| a.name.cmp(&c.name));
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    order.shuffle(&mut rng);

    let count = cfg.effective_variants(order.len());
    let picked = &order[..count];
    let selected: Vec<String> = picked.iter().map(|s| s.name.clone()).collect();
    debug!("blend seed {:#x}: selected {:?}", cfg.seed, selected);

    if count < 2 {
        return Ok(CategoryBlend {
            output: channel_set_cluster(b, picked[0], uv),
            selected,
            mix_factor: None,
            overlay_masks: Vec::new(),
        });
    }

    let layer_uvs: Vec<Socket> = picked
        .iter()
        .map(|_| {
            if cfg.randomize_uv {
                let jitter = UvTransform::random(&mut rng);
                mapping(b, uv, &jitter)
            } else {
                uv.clone()
            }
        })
        .collect();

    let layer_a = channel_set_cluster(b, picked[0], &layer_uvs[0]);
    let layer_b = channel_set_cluster(b, picked[1], &layer_uvs[1]);

    let coords = mapping(b, uv, &UvTransform::scale(cfg.spatial_scale));
    let field = partition_field(
        b,
        &coords,
        rng.next_u32(),
        (cfg.edge_softness * 5.0).clamp(0.0, 1.0),
    );

    let soft = cfg.edge_softness;
    let choice = smoothstep_node(b, &field.region, 0.5 - soft, 0.5 + soft);
    let minor = remap_node(
        b,
        &field.random,
        (0.0, 1.0),
        (1.0 - cfg.dominant_max, 1.0 - cfg.dominant_min),
    );
    let major = remap_node(
        b,
        &field.random,
        (0.0, 1.0),
        (cfg.dominant_min, cfg.dominant_max),
    );
    let mut factor = lerp(b, &choice, &minor, &major);
    if let Some(contrast) = cfg.height_contrast {
        factor = height_aware_factor(b, &factor, &layer_a, &layer_b, contrast);
    }

    let mut output = blend_bundles(b, &layer_a, &layer_b, &factor);

    let mut overlay_masks = Vec::new();
    for (k, (set, layer_uv)) in picked.iter().zip(&layer_uvs).enumerate().skip(2) {
        let layer = channel_set_cluster(b, set, layer_uv);
        let mask = sparse_mask(
            b,
            &coords,
            rng.next_u32(),
            cfg.sparse_coverage,
            cfg.sparse_softness,
            cfg.sparse_scale,
        );
        let cap = cfg.overlay_cap(k as u32 - 1);
        let weight = math(b, MathOp::Multiply, &mask, cap);
        output = blend_bundles(b, &output, &layer, &weight);
        overlay_masks.push(mask);
    }

    Ok(CategoryBlend {
        output,
        selected,
        mix_factor: Some(factor),
        overlay_masks,
    })
}
