//! Reference CPU evaluator for generated shader graphs.
//!
//! Evaluates any output socket at one fragment. Images are never decoded:
//! `ImageTexture` nodes ask a [`TexelSource`] for their texel. Used to probe
//! blend factors, layer weights and normals in tests and from the CLI.

use std::collections::{HashMap, HashSet};

use anyhow::{Result, anyhow, bail};

use crate::asset_store::ColorSpace;
use crate::dsl::{Endpoint, Node, ShaderGraph, parse_bool, parse_f32, parse_rgba, parse_str, parse_u32, parse_vec3};
use crate::graph;
use crate::noise::{FbmNoise, voronoi};
use crate::nodes::{MathOp, remap, smoothstep};

/// Per-fragment geometry inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub uv: [f32; 2],
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Fragment {
    pub fn new(uv: [f32; 2], position: [f32; 3], normal: [f32; 3]) -> Self {
        Self {
            uv,
            position,
            normal,
        }
    }

    /// Fragment at a height `z` on flat ground.
    pub fn flat(uv: [f32; 2], z: f32) -> Self {
        Self::new(uv, [uv[0], uv[1], z], [0.0, 0.0, 1.0])
    }
}

/// Supplies texel values for image nodes.
pub trait TexelSource {
    fn sample(&self, image: &str, color_space: ColorSpace, uv: [f32; 2]) -> [f32; 4];
}

/// Every image is one constant color, optionally overridden per file suffix.
#[derive(Debug, Clone)]
pub struct UniformTexels {
    pub default: [f32; 4],
    overrides: Vec<(String, [f32; 4])>,
}

impl UniformTexels {
    pub fn new(default: [f32; 4]) -> Self {
        Self {
            default,
            overrides: Vec::new(),
        }
    }

    pub fn with(mut self, path_suffix: impl Into<String>, rgba: [f32; 4]) -> Self {
        self.overrides.push((path_suffix.into(), rgba));
        self
    }
}

impl TexelSource for UniformTexels {
    fn sample(&self, image: &str, _color_space: ColorSpace, _uv: [f32; 2]) -> [f32; 4] {
        self.overrides
            .iter()
            .find(|(suffix, _)| image.ends_with(suffix.as_str()))
            .map(|(_, rgba)| *rgba)
            .unwrap_or(self.default)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub base_color: [f32; 4],
    pub roughness: f32,
    pub normal: [f32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Float(f32),
    Color([f32; 4]),
    Vector([f32; 3]),
    Shader(Surface),
}

fn luminance(c: [f32; 4]) -> f32 {
    0.2126 * c[0] + 0.7152 * c[1] + 0.0722 * c[2]
}

fn normalize_or_up(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len > 1e-12 && len.is_finite() {
        v.map(|c| c / len)
    } else {
        [0.0, 0.0, 1.0]
    }
}

impl Value {
    pub fn as_float(&self) -> Result<f32> {
        match self {
            Value::Float(v) => Ok(*v),
            Value::Color(c) => Ok(luminance(*c)),
            Value::Vector(v) => Ok((v[0] + v[1] + v[2]) / 3.0),
            Value::Shader(_) => Err(anyhow!("shader value used as float")),
        }
    }

    pub fn as_color(&self) -> Result<[f32; 4]> {
        match self {
            Value::Float(v) => Ok([*v, *v, *v, 1.0]),
            Value::Color(c) => Ok(*c),
            Value::Vector(v) => Ok([v[0], v[1], v[2], 1.0]),
            Value::Shader(_) => Err(anyhow!("shader value used as color")),
        }
    }

    pub fn as_vector(&self) -> Result<[f32; 3]> {
        match self {
            Value::Float(v) => Ok([*v, *v, *v]),
            Value::Color(c) => Ok([c[0], c[1], c[2]]),
            Value::Vector(v) => Ok(*v),
            Value::Shader(_) => Err(anyhow!("shader value used as vector")),
        }
    }

    pub fn as_surface(&self) -> Result<Surface> {
        match self {
            Value::Shader(s) => Ok(*s),
            other => Err(anyhow!("expected shader, got {other:?}")),
        }
    }
}

/// Evaluated material at one fragment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    pub surface: Surface,
    pub displacement: [f32; 3],
}

/// Per-fragment memo of node values, plus the nodes currently on the stack.
#[derive(Default)]
struct Scratch<'g> {
    cache: HashMap<&'g str, Value>,
    visiting: HashSet<&'g str>,
}

pub struct GraphEvaluator<'g, T: TexelSource> {
    graph: &'g ShaderGraph,
    nodes_by_id: HashMap<&'g str, &'g Node>,
    incoming: HashMap<(&'g str, &'g str), &'g Endpoint>,
    noises: HashMap<&'g str, FbmNoise>,
    texels: T,
}

impl<'g, T: TexelSource> GraphEvaluator<'g, T> {
    pub fn new(graph: &'g ShaderGraph, texels: T) -> Result<Self> {
        graph::topo_sort(graph)?;
        let incoming = graph
            .connections
            .iter()
            .map(|c| ((c.to.node_id.as_str(), c.to.port_id.as_str()), &c.from))
            .collect();
        let noises = graph
            .nodes_of_type("Noise")
            .map(|n| {
                let seed = parse_u32(&n.params, "seed").unwrap_or(0);
                let scale = parse_f32(&n.params, "scale").unwrap_or(1.0);
                let detail = parse_u32(&n.params, "detail").unwrap_or(2);
                (n.id.as_str(), FbmNoise::new(seed, scale, detail))
            })
            .collect();
        Ok(Self {
            graph,
            nodes_by_id: graph.nodes_by_id(),
            incoming,
            noises,
            texels,
        })
    }

    pub fn eval_socket(&self, node_id: &str, port_id: &str, frag: &Fragment) -> Result<Value> {
        let node = crate::dsl::find_node(&self.nodes_by_id, node_id)?;
        self.eval_node(node, port_id, frag, &mut Scratch::default())
    }

    /// Evaluates one of the graph's named outputs.
    pub fn eval_output(&self, name: &str, frag: &Fragment) -> Result<Value> {
        let endpoint = self
            .graph
            .outputs
            .get(name)
            .ok_or_else(|| anyhow!("graph has no output named '{name}'"))?;
        self.eval_socket(&endpoint.node_id, &endpoint.port_id, frag)
    }

    /// Evaluates the material output's surface and displacement.
    pub fn surface(&self, frag: &Fragment) -> Result<SurfaceSample> {
        let out = self
            .graph
            .nodes_of_type("MaterialOutput")
            .next()
            .ok_or_else(|| anyhow!("graph has no MaterialOutput node"))?;
        let mut scratch = Scratch::default();
        let surface = self
            .input(out, "surface", frag, &mut scratch)?
            .ok_or_else(|| anyhow!("MaterialOutput.surface is not connected"))?
            .as_surface()?;
        let displacement = match self.input(out, "displacement", frag, &mut scratch)? {
            Some(v) => v.as_vector()?,
            None => [0.0; 3],
        };
        Ok(SurfaceSample {
            surface,
            displacement,
        })
    }

    fn input(
        &self,
        node: &'g Node,
        port: &str,
        frag: &Fragment,
        scratch: &mut Scratch<'g>,
    ) -> Result<Option<Value>> {
        let Some(from) = self.incoming.get(&(node.id.as_str(), port)).copied() else {
            return Ok(None);
        };
        let upstream = crate::dsl::find_node(&self.nodes_by_id, &from.node_id)?;
        self.eval_node(upstream, &from.port_id, frag, scratch)
            .map(Some)
    }

    fn float_in(
        &self,
        node: &'g Node,
        port: &str,
        default: f32,
        frag: &Fragment,
        scratch: &mut Scratch<'g>,
    ) -> Result<f32> {
        match self.input(node, port, frag, scratch)? {
            Some(v) => v.as_float(),
            None => Ok(parse_f32(&node.params, port).unwrap_or(default)),
        }
    }

    fn color_in(
        &self,
        node: &'g Node,
        port: &str,
        default: [f32; 4],
        frag: &Fragment,
        scratch: &mut Scratch<'g>,
    ) -> Result<[f32; 4]> {
        match self.input(node, port, frag, scratch)? {
            Some(v) => v.as_color(),
            None => Ok(parse_rgba(&node.params, port).unwrap_or(default)),
        }
    }

    fn vector_in(
        &self,
        node: &'g Node,
        port: &str,
        default: [f32; 3],
        frag: &Fragment,
        scratch: &mut Scratch<'g>,
    ) -> Result<[f32; 3]> {
        match self.input(node, port, frag, scratch)? {
            Some(v) => v.as_vector(),
            None => Ok(parse_vec3(&node.params, port).unwrap_or(default)),
        }
    }

    fn eval_node(
        &self,
        node: &'g Node,
        port: &str,
        frag: &Fragment,
        scratch: &mut Scratch<'g>,
    ) -> Result<Value> {
        let id = node.id.as_str();
        let outputs = match scratch.cache.get(id) {
            Some(v) => *v,
            None => {
                if !scratch.visiting.insert(id) {
                    bail!("cycle detected at node '{id}'");
                }
                let v = self.compute(node, frag, scratch)?;
                scratch.visiting.remove(id);
                scratch.cache.insert(id, v);
                v
            }
        };
        select_port(node, port, outputs, frag)
    }

    /// Computes the node's primary value; [`select_port`] projects ports.
    fn compute(
        &self,
        node: &'g Node,
        frag: &Fragment,
        scratch: &mut Scratch<'g>,
    ) -> Result<Value> {
        let uv = [frag.uv[0], frag.uv[1], 0.0];
        let p = &node.params;
        let v = match node.node_type.as_str() {
            "TexCoord" => Value::Vector(uv),
            // Geometry ports are projected from the fragment directly.
            "Geometry" => Value::Vector(frag.position),
            "FloatInput" => Value::Float(parse_f32(p, "value").unwrap_or(0.0)),
            "ColorInput" => Value::Color(parse_rgba(p, "value").unwrap_or([0.5, 0.5, 0.5, 1.0])),
            "Vector3Input" => Value::Vector(parse_vec3(p, "value").unwrap_or([0.0, 0.0, 1.0])),
            "Mapping" => {
                let v = self.vector_in(node, "vector", uv, frag, scratch)?;
                let location = parse_vec3(p, "location").unwrap_or([0.0; 3]);
                let rotation = parse_vec3(p, "rotation").unwrap_or([0.0; 3]);
                let scale = parse_vec3(p, "scale").unwrap_or([1.0; 3]);
                Value::Vector(apply_mapping(v, location, rotation, scale))
            }
            "ImageTexture" => {
                let v = self.vector_in(node, "vector", uv, frag, scratch)?;
                let image = parse_str(p, "image").unwrap_or("");
                let space = parse_str(p, "colorSpace")
                    .and_then(ColorSpace::from_param)
                    .unwrap_or(ColorSpace::Srgb);
                Value::Color(self.texels.sample(image, space, [v[0], v[1]]))
            }
            "RgbToBw" => {
                let c = self.color_in(node, "color", [0.0, 0.0, 0.0, 1.0], frag, scratch)?;
                Value::Float(luminance(c))
            }
            "NormalMap" => {
                let c = self.color_in(node, "color", [0.5, 0.5, 1.0, 1.0], frag, scratch)?;
                let strength = parse_f32(p, "strength").unwrap_or(1.0);
                let decoded = normalize_or_up([c[0] * 2.0 - 1.0, c[1] * 2.0 - 1.0, c[2] * 2.0 - 1.0]);
                let bent = [
                    decoded[0] * strength,
                    decoded[1] * strength,
                    1.0 + (decoded[2] - 1.0) * strength,
                ];
                Value::Vector(normalize_or_up(bent))
            }
            "ColorMix" => {
                let f = self
                    .float_in(node, "factor", 0.5, frag, scratch)?
                    .clamp(0.0, 1.0);
                let a = self.color_in(node, "a", [0.5, 0.5, 0.5, 1.0], frag, scratch)?;
                let b = self.color_in(node, "b", [0.5, 0.5, 0.5, 1.0], frag, scratch)?;
                let out = match parse_str(p, "blendType").unwrap_or("mix") {
                    "multiply" => [0, 1, 2, 3].map(|k| {
                        if k == 3 { a[3] } else { a[k] * (1.0 - f + f * b[k]) }
                    }),
                    _ => [0, 1, 2, 3].map(|k| a[k] + (b[k] - a[k]) * f),
                };
                Value::Color(out)
            }
            "MixFloat" => {
                let f = self
                    .float_in(node, "factor", 0.5, frag, scratch)?
                    .clamp(0.0, 1.0);
                let a = self.float_in(node, "a", 0.0, frag, scratch)?;
                let b = self.float_in(node, "b", 0.0, frag, scratch)?;
                Value::Float(a + (b - a) * f)
            }
            "MixVector" => {
                let f = self
                    .float_in(node, "factor", 0.5, frag, scratch)?
                    .clamp(0.0, 1.0);
                let a = self.vector_in(node, "a", [0.0; 3], frag, scratch)?;
                let b = self.vector_in(node, "b", [0.0; 3], frag, scratch)?;
                Value::Vector([0, 1, 2].map(|k| a[k] + (b[k] - a[k]) * f))
            }
            "Normalize" => {
                let v = self.vector_in(node, "vector", [0.0, 0.0, 1.0], frag, scratch)?;
                Value::Vector(normalize_or_up(v))
            }
            "MapRange" => {
                let value = self.float_in(node, "value", 0.0, frag, scratch)?;
                let from_min = self.float_in(node, "fromMin", 0.0, frag, scratch)?;
                let from_max = self.float_in(node, "fromMax", 1.0, frag, scratch)?;
                let to_min = self.float_in(node, "toMin", 0.0, frag, scratch)?;
                let to_max = self.float_in(node, "toMax", 1.0, frag, scratch)?;
                let clamp = parse_bool(p, "clamp").unwrap_or(true);
                let smooth = parse_str(p, "interpolation") == Some("smoothstep");
                Value::Float(map_range(
                    value, from_min, from_max, to_min, to_max, clamp, smooth,
                ))
            }
            "Math" => {
                let a = self.float_in(node, "a", 0.0, frag, scratch)?;
                let b = self.float_in(node, "b", 0.0, frag, scratch)?;
                let op_name = parse_str(p, "operation").unwrap_or("add");
                let op = MathOp::from_param(op_name)
                    .ok_or_else(|| anyhow!("unsupported math operation '{op_name}' at '{}'", node.id))?;
                let v = op.apply(a, b);
                let v = if parse_bool(p, "clamp").unwrap_or(false) {
                    v.clamp(0.0, 1.0)
                } else {
                    v
                };
                Value::Float(v)
            }
            "SeparateXYZ" => Value::Vector(self.vector_in(node, "vector", [0.0; 3], frag, scratch)?),
            "SeparateColor" => Value::Color(self.color_in(
                node,
                "color",
                [0.0, 0.0, 0.0, 1.0],
                frag,
                scratch,
            )?),
            "Voronoi" => {
                let v = self.vector_in(node, "vector", uv, frag, scratch)?;
                let seed = parse_u32(p, "seed").unwrap_or(0);
                let smoothness = parse_f32(p, "smoothness").unwrap_or(0.0);
                let s = voronoi(v, seed, smoothness);
                // Distance rides in alpha; select_port splits it out.
                Value::Color([s.color[0], s.color[1], s.color[2], s.distance])
            }
            "Noise" => {
                let v = self.vector_in(node, "vector", uv, frag, scratch)?;
                let noise = self
                    .noises
                    .get(node.id.as_str())
                    .ok_or_else(|| anyhow!("noise node '{}' was not prepared", node.id))?;
                Value::Float(noise.sample(v))
            }
            "Displacement" => {
                let h = self.float_in(node, "height", 0.0, frag, scratch)?;
                let mid = parse_f32(p, "midlevel").unwrap_or(0.5);
                let scale = parse_f32(p, "scale").unwrap_or(1.0);
                let n = normalize_or_up(frag.normal);
                Value::Vector(n.map(|c| c * (h - mid) * scale))
            }
            "PrincipledBsdf" => {
                let base_color =
                    self.color_in(node, "baseColor", [0.8, 0.8, 0.8, 1.0], frag, scratch)?;
                let roughness = self.float_in(node, "roughness", 0.5, frag, scratch)?;
                let normal = self.vector_in(node, "normal", frag.normal, frag, scratch)?;
                Value::Shader(Surface {
                    base_color,
                    roughness,
                    normal,
                })
            }
            "MaterialOutput" => bail!("MaterialOutput has no outputs; use surface()"),
            other => bail!("unsupported node type '{other}' at '{}'", node.id),
        };
        Ok(v)
    }
}

fn select_port(node: &Node, port: &str, v: Value, frag: &Fragment) -> Result<Value> {
    let bad_port = || anyhow!("node '{}' ({}) has no output '{port}'", node.id, node.node_type);
    Ok(match (node.node_type.as_str(), port) {
        ("Geometry", "position") => Value::Vector(frag.position),
        ("Geometry", "normal") => Value::Vector(normalize_or_up(frag.normal)),
        ("Geometry", _) => return Err(bad_port()),
        ("SeparateXYZ", "x" | "y" | "z") | ("SeparateColor", "r" | "g" | "b") => {
            let k = match port {
                "x" | "r" => 0,
                "y" | "g" => 1,
                _ => 2,
            };
            let c = v.as_vector()?;
            Value::Float(c[k])
        }
        ("Voronoi", "color") => {
            let c = v.as_color()?;
            Value::Color([c[0], c[1], c[2], 1.0])
        }
        ("Voronoi", "distance") => Value::Float(v.as_color()?[3]),
        ("SeparateXYZ" | "SeparateColor" | "Voronoi", _) => return Err(bad_port()),
        _ => v,
    })
}

fn map_range(
    value: f32,
    from_min: f32,
    from_max: f32,
    to_min: f32,
    to_max: f32,
    clamp: bool,
    smooth: bool,
) -> f32 {
    if smooth {
        return to_min + (to_max - to_min) * smoothstep(value, from_min, from_max);
    }
    if clamp || from_min == from_max {
        return remap(value, from_min, from_max, to_min, to_max);
    }
    to_min + (to_max - to_min) * (value - from_min) / (from_max - from_min)
}

/// `R(rotation) * (v * scale) + location`, rotating X, then Y, then Z.
fn apply_mapping(v: [f32; 3], location: [f32; 3], rotation: [f32; 3], scale: [f32; 3]) -> [f32; 3] {
    let mut p = [v[0] * scale[0], v[1] * scale[1], v[2] * scale[2]];
    let (sx, cx) = rotation[0].sin_cos();
    p = [p[0], cx * p[1] - sx * p[2], sx * p[1] + cx * p[2]];
    let (sy, cy) = rotation[1].sin_cos();
    p = [cy * p[0] + sy * p[2], p[1], -sy * p[0] + cy * p[2]];
    let (sz, cz) = rotation[2].sin_cos();
    p = [cz * p[0] - sz * p[1], sz * p[0] + cz * p[1], p[2]];
    [p[0] + location[0], p[1] + location[1], p[2] + location[2]]
}
