//! Scalar shaping: smooth thresholds, linear remaps, lerp and basic math.
//!
//! The pure functions here define the math the `MapRange` node follows, so
//! graph construction and the reference evaluator share one definition.

use serde_json::json;

use crate::graph::{GraphBuilder, Socket, SocketType};

/// Cubic Hermite step: 0 at or below `lo`, 1 at or above `hi`.
///
/// `lo == hi` degenerates to a hard step at `lo`. Reversed edges ramp down.
pub fn smoothstep(x: f32, lo: f32, hi: f32) -> f32 {
    if lo == hi {
        return if x < lo { 0.0 } else { 1.0 };
    }
    let t = ((x - lo) / (hi - lo)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Linear map of `x` from `[from_min, from_max]` onto `[to_min, to_max]`,
/// clamped to the target range.
pub fn remap(x: f32, from_min: f32, from_max: f32, to_min: f32, to_max: f32) -> f32 {
    let t = if from_min == from_max {
        if x < from_min { 0.0 } else { 1.0 }
    } else {
        ((x - from_min) / (from_max - from_min)).clamp(0.0, 1.0)
    };
    to_min + (to_max - to_min) * t
}

/// Either a wired socket or a literal stored in the node's params.
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    Socket(&'a Socket),
    Const(f32),
}

impl<'a> From<&'a Socket> for Operand<'a> {
    fn from(s: &'a Socket) -> Self {
        Operand::Socket(s)
    }
}

impl From<f32> for Operand<'_> {
    fn from(v: f32) -> Self {
        Operand::Const(v)
    }
}

fn wire(b: &mut GraphBuilder, node_id: &str, port: &str, operand: Operand<'_>) {
    if let Operand::Socket(s) = operand {
        b.connect(s, node_id, port);
    }
}

fn literal(operand: Operand<'_>) -> Option<f32> {
    match operand {
        Operand::Const(v) => Some(v),
        Operand::Socket(_) => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    Add,
    Subtract,
    Multiply,
    Absolute,
}

impl MathOp {
    pub fn param_name(self) -> &'static str {
        match self {
            MathOp::Add => "add",
            MathOp::Subtract => "subtract",
            MathOp::Multiply => "multiply",
            MathOp::Absolute => "absolute",
        }
    }

    pub fn from_param(name: &str) -> Option<Self> {
        match name {
            "add" => Some(MathOp::Add),
            "subtract" => Some(MathOp::Subtract),
            "multiply" => Some(MathOp::Multiply),
            "absolute" => Some(MathOp::Absolute),
            _ => None,
        }
    }

    pub fn apply(self, a: f32, b: f32) -> f32 {
        match self {
            MathOp::Add => a + b,
            MathOp::Subtract => a - b,
            MathOp::Multiply => a * b,
            MathOp::Absolute => a.abs(),
        }
    }
}

pub fn math<'a>(
    b: &mut GraphBuilder,
    op: MathOp,
    lhs: impl Into<Operand<'a>>,
    rhs: impl Into<Operand<'a>>,
) -> Socket {
    let (lhs, rhs) = (lhs.into(), rhs.into());
    let mut params = vec![("operation", json!(op.param_name()))];
    if let Some(v) = literal(lhs) {
        params.push(("a", json!(v)));
    }
    if let Some(v) = literal(rhs) {
        params.push(("b", json!(v)));
    }
    let id = b.add_node("Math", params);
    wire(b, &id, "a", lhs);
    wire(b, &id, "b", rhs);
    Socket::new(id, "value", SocketType::Float)
}

fn map_range(
    b: &mut GraphBuilder,
    value: &Socket,
    from: (f32, f32),
    to: (f32, f32),
    interpolation: &str,
) -> Socket {
    let id = b.add_node(
        "MapRange",
        [
            ("fromMin", json!(from.0)),
            ("fromMax", json!(from.1)),
            ("toMin", json!(to.0)),
            ("toMax", json!(to.1)),
            ("clamp", json!(true)),
            ("interpolation", json!(interpolation)),
        ],
    );
    b.connect(value, &id, "value");
    Socket::new(id, "result", SocketType::Float)
}

/// `smoothstep(value, lo, hi)` as a `MapRange` node.
pub fn smoothstep_node(b: &mut GraphBuilder, value: &Socket, lo: f32, hi: f32) -> Socket {
    map_range(b, value, (lo, hi), (0.0, 1.0), "smoothstep")
}

/// Clamped linear remap as a `MapRange` node.
pub fn remap_node(b: &mut GraphBuilder, value: &Socket, from: (f32, f32), to: (f32, f32)) -> Socket {
    map_range(b, value, from, to, "linear")
}

/// `a + (c - a) * factor` as a `MixFloat` node.
pub fn lerp<'a>(
    b: &mut GraphBuilder,
    factor: impl Into<Operand<'a>>,
    a: impl Into<Operand<'a>>,
    c: impl Into<Operand<'a>>,
) -> Socket {
    let (factor, a, c) = (factor.into(), a.into(), c.into());
    let mut params = Vec::new();
    for (port, operand) in [("factor", factor), ("a", a), ("b", c)] {
        if let Some(v) = literal(operand) {
            params.push((port, json!(v)));
        }
    }
    let id = b.add_node("MixFloat", params);
    wire(b, &id, "factor", factor);
    wire(b, &id, "a", a);
    wire(b, &id, "b", c);
    Socket::new(id, "result", SocketType::Float)
}
