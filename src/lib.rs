//! Reverse-mode automatic differentiation over scalars.
//!
//! Arithmetic on [`Value`]s records a DAG inside a [`Graph`]; [`Value::backward`] walks it in
//! reverse topological order and accumulates exact gradients into every reachable node.
//!
//! ```
//! use scalargrad::Graph;
//!
//! let graph = Graph::new();
//! let a = graph.value(2.0);
//! let b = graph.value(3.0);
//! let z = a * b + a;
//! z.backward();
//! assert_eq!(z.data(), 8.0);
//! assert_eq!(a.grad(), 4.0);
//! assert_eq!(b.grad(), 2.0);
//! ```

pub mod backwards;
pub mod dot;
pub mod error;
pub mod nn;

pub use backwards::{Graph, NodeId, Op, Value};
pub use error::{Error, Result};
pub use nn::{Layer, Mlp, Neuron};
