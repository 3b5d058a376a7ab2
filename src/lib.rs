//! Procedural multi-layer texture blending for terrain and road meshes.
//!
//! Texture bundles are discovered per category on disk, loaded into an
//! [`asset_store::ImageStore`], and assembled into shader node graphs
//! ([`dsl::ShaderGraph`]) that a host renderer evaluates per fragment.
//! [`apply::apply_textures`] is the entry point.

pub mod apply;
pub mod asset_store;
pub mod config;
pub mod discovery;
pub mod dsl;
pub mod error;
pub mod eval;
pub mod graph;
pub mod loader;
pub mod material;
pub mod mesh;
pub mod noise;
pub mod nodes;
pub mod road;
pub mod schema;
pub mod synth;
pub mod terrain;
