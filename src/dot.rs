//! Graphviz rendering of a computation graph.
//!
//! Rendering only reads node fields; it never touches gradients and never runs a backward
//! pass, so a graph can be drawn both before and after `backward`.
//!
//! ```
//! use scalargrad::{dot, Graph};
//!
//! let graph = Graph::new();
//! let a = graph.value(1.0);
//! let b = graph.value(2.0);
//! let c = a + b;
//! let text = dot::render(&c, &dot::DotOptions::default());
//! assert!(text.starts_with("digraph"));
//! ```

use num_traits::Float;
use std::{
    collections::BTreeMap,
    fmt::{self, Write},
};

use crate::backwards::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RankDir {
    #[default]
    LeftRight,
    TopBottom,
}

impl fmt::Display for RankDir {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RankDir::LeftRight => write!(f, "LR"),
            RankDir::TopBottom => write!(f, "TB"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DotOptions {
    pub rank_dir: RankDir,
    /// Decimal places for `data` and `grad` labels.
    pub precision: usize,
}

impl Default for DotOptions {
    fn default() -> Self {
        DotOptions {
            rank_dir: RankDir::LeftRight,
            precision: 4,
        }
    }
}

/// Collects every node reachable from `root` and the `(child, parent)` edges between them.
/// Nodes are returned in ascending id order; an operand used twice yields a single edge.
pub fn trace<'g, T: Float>(
    root: &Value<'g, T>,
) -> (Vec<Value<'g, T>>, Vec<(Value<'g, T>, Value<'g, T>)>) {
    let mut nodes = BTreeMap::new();
    let mut edges = BTreeMap::new();
    let mut stack = vec![*root];

    while let Some(v) = stack.pop() {
        if nodes.insert(v.id(), v).is_some() {
            continue;
        }
        for child in v.children() {
            edges.insert((child.id(), v.id()), (child, v));
            stack.push(child);
        }
    }
    (nodes.into_values().collect(), edges.into_values().collect())
}

pub fn render<T: Float + fmt::Display>(root: &Value<'_, T>, options: &DotOptions) -> String {
    let mut out = String::new();
    // writing into a String cannot fail
    let _ = write_dot(root, options, &mut out);
    out
}

/// Writes a `digraph` with one record per value, an extra node per operation and
/// operand → operation edges.
pub fn write_dot<T, W>(root: &Value<'_, T>, options: &DotOptions, out: &mut W) -> fmt::Result
where
    T: Float + fmt::Display,
    W: Write,
{
    let (nodes, edges) = trace(root);
    let precision = options.precision;

    writeln!(out, "digraph {{")?;
    writeln!(out, "  rankdir={};", options.rank_dir)?;
    for v in &nodes {
        let name = v.id().index();
        writeln!(
            out,
            "  \"{}\" [label=\"{{ data {:.*} | grad {:.*} }}\", shape=record];",
            name,
            precision,
            v.data(),
            precision,
            v.grad()
        )?;
        let op = v.op();
        if !op.is_leaf() {
            writeln!(out, "  \"{}{}\" [label=\"{}\"];", name, op, op)?;
            writeln!(out, "  \"{}{}\" -> \"{}\";", name, op, name)?;
        }
    }
    for (child, parent) in &edges {
        writeln!(
            out,
            "  \"{}\" -> \"{}{}\";",
            child.id().index(),
            parent.id().index(),
            parent.op()
        )?;
    }
    writeln!(out, "}}")
}
