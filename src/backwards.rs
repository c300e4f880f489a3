use log::{debug, trace};
use num_traits::{Float, Pow};
use std::{
    cell::RefCell,
    fmt,
    ops::{Add, Div, Mul, Neg, Sub},
};

use crate::error::{self, Error};

/// Stable handle of a node inside its [`Graph`]. Handles are issued in creation order, so a
/// node can only ever point at nodes with a smaller index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The operation that produced a node, together with whatever operand data its local gradient
/// needs. Operand data is recorded at creation time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Op<T> {
    Leaf,
    Add,
    Mul { lhs: T, rhs: T },
    Pow { base: T, exponent: T },
    Tanh,
    Relu,
}

impl<T> Op<T> {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Op::Leaf)
    }
}

impl<T: fmt::Display> fmt::Display for Op<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Op::Leaf => Ok(()),
            Op::Add => write!(f, "+"),
            Op::Mul { .. } => write!(f, "*"),
            Op::Pow { exponent, .. } => write!(f, "**{}", exponent),
            Op::Tanh => write!(f, "tanh"),
            Op::Relu => write!(f, "ReLU"),
        }
    }
}

#[derive(Clone, Debug)]
struct Node<T> {
    data: T,
    grad: T,
    children: Vec<NodeId>,
    op: Op<T>,
}

impl<T: Float> Node<T> {
    /// Contribution of this node's gradient `dout` to the child at `position`.
    fn local_gradient(&self, position: usize, dout: T) -> T {
        match self.op {
            Op::Leaf => T::zero(),
            Op::Add => dout,
            Op::Mul { lhs, rhs } => {
                if position == 0 {
                    rhs * dout
                } else {
                    lhs * dout
                }
            }
            Op::Pow { base, exponent } => exponent * base.powf(exponent - T::one()) * dout,
            Op::Tanh => (T::one() - self.data * self.data) * dout,
            Op::Relu => {
                if self.data > T::zero() {
                    dout
                } else {
                    T::zero()
                }
            }
        }
    }
}

/// Arena owning every node of one computation.
///
/// Values borrow the graph, so the graph lives at least as long as any value built on it. A
/// fresh graph is meant to be built for every forward evaluation.
#[derive(Debug)]
pub struct Graph<T = f64> {
    nodes: RefCell<Vec<Node<T>>>,
}

impl<T: Float> Default for Graph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float> Graph<T> {
    pub fn new() -> Self {
        Graph {
            nodes: RefCell::new(Vec::new()),
        }
    }

    /// Creates a leaf node holding `data`.
    pub fn value(&self, data: T) -> Value<'_, T> {
        let id = self.push(data, Vec::new(), Op::Leaf);
        Value { graph: self, id }
    }

    pub fn values(&self, data: &[T]) -> Vec<Value<'_, T>> {
        data.iter().map(|&x| self.value(x)).collect()
    }

    pub fn get(&self, id: NodeId) -> error::Result<Value<'_, T>> {
        self.check(id)?;
        Ok(Value { graph: self, id })
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    /// Reassigns the data of a leaf. Nodes already built on top of the leaf keep the value
    /// they were computed from.
    pub fn set_data(&self, id: NodeId, data: T) -> error::Result<()> {
        self.check(id)?;
        let mut nodes = self.nodes.borrow_mut();
        let node = &mut nodes[id.0];
        if !node.op.is_leaf() {
            return Err(Error::NotALeaf(id));
        }
        node.data = data;
        Ok(())
    }

    /// Resets the gradient of every node to zero. Never called implicitly by `backward`.
    pub fn zero_grad(&self) {
        let mut nodes = self.nodes.borrow_mut();
        debug!("zero_grad: resetting {} nodes", nodes.len());
        for node in nodes.iter_mut() {
            node.grad = T::zero();
        }
    }

    fn check(&self, id: NodeId) -> error::Result<()> {
        let len = self.len();
        if id.0 < len {
            Ok(())
        } else {
            Err(Error::UnknownNode { id, len })
        }
    }

    fn push(&self, data: T, children: Vec<NodeId>, op: Op<T>) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId(nodes.len());
        nodes.push(Node {
            data,
            grad: T::zero(),
            children,
            op,
        });
        id
    }
}

/// A scalar in a computation graph.
///
/// `Value` is a cheap `Copy` handle; arithmetic on it records new nodes in the owning graph.
///
/// A float literal on the left of an operator needs a type suffix (`2.0f64 / v`), since both
/// `f32` and `f64` implement the reflected operators.
#[derive(Clone, Copy)]
pub struct Value<'g, T: Float = f64> {
    graph: &'g Graph<T>,
    id: NodeId,
}

impl<'g, T: Float> Value<'g, T> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn graph(&self) -> &'g Graph<T> {
        self.graph
    }

    pub fn data(&self) -> T {
        self.graph.nodes.borrow()[self.id.0].data
    }

    pub fn grad(&self) -> T {
        self.graph.nodes.borrow()[self.id.0].grad
    }

    pub fn op(&self) -> Op<T> {
        self.graph.nodes.borrow()[self.id.0].op
    }

    pub fn is_leaf(&self) -> bool {
        self.op().is_leaf()
    }

    /// Operands of this node in operand order. `a + a` lists `a` twice.
    pub fn children(&self) -> Vec<Value<'g, T>> {
        self.graph.nodes.borrow()[self.id.0]
            .children
            .iter()
            .map(|&id| Value {
                graph: self.graph,
                id,
            })
            .collect()
    }

    pub fn set_data(&self, data: T) -> error::Result<()> {
        self.graph.set_data(self.id, data)
    }

    pub fn zero_grad(&self) {
        self.graph.nodes.borrow_mut()[self.id.0].grad = T::zero();
    }

    /// Raises this value to a constant exponent. The exponent is never a node.
    pub fn pow(self, exponent: T) -> Self {
        let base = self.data();
        self.unary(base.powf(exponent), Op::Pow { base, exponent })
    }

    pub fn tanh(self) -> Self {
        self.unary(self.data().tanh(), Op::Tanh)
    }

    pub fn relu(self) -> Self {
        let x = self.data();
        let out = if x > T::zero() { x } else { T::zero() };
        self.unary(out, Op::Relu)
    }

    /// Every node reachable from this one, children strictly before parents, `self` last.
    pub fn topological_order(&self) -> Vec<NodeId> {
        let nodes = self.graph.nodes.borrow();
        let mut visited = vec![false; self.id.0 + 1];
        let mut order = Vec::new();
        let mut stack = vec![(self.id, false)];

        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if visited[id.0] {
                continue;
            }
            visited[id.0] = true;
            stack.push((id, true));
            for &child in nodes[id.0].children.iter().rev() {
                if !visited[child.0] {
                    stack.push((child, false));
                }
            }
        }
        order
    }

    /// Performs the backward pass from this value.
    ///
    /// Gradients are accumulated on top of whatever the nodes already hold; call
    /// [`Graph::zero_grad`] first when reusing a graph.
    pub fn backward(&self) {
        let order = self.topological_order();
        trace!("backward from {:?}: {} reachable nodes", self.id, order.len());

        let mut nodes = self.graph.nodes.borrow_mut();
        // Seed the gradient of the output with 1
        nodes[self.id.0].grad = T::one();

        for &id in order.iter().rev() {
            let dout = nodes[id.0].grad;
            for position in 0..nodes[id.0].children.len() {
                let child = nodes[id.0].children[position];
                let contribution = nodes[id.0].local_gradient(position, dout);
                nodes[child.0].grad = nodes[child.0].grad + contribution;
            }
        }
    }

    fn unary(self, data: T, op: Op<T>) -> Self {
        let id = self.graph.push(data, vec![self.id], op);
        Value {
            graph: self.graph,
            id,
        }
    }

    fn binary(self, rhs: Self, data: T, op: Op<T>) -> Self {
        assert!(
            std::ptr::eq(self.graph, rhs.graph),
            "cannot combine values from different graphs ({:?} and {:?})",
            self.id,
            rhs.id
        );
        let id = self.graph.push(data, vec![self.id, rhs.id], op);
        Value {
            graph: self.graph,
            id,
        }
    }

    fn lift(&self, scalar: T) -> Self {
        self.graph.value(scalar)
    }
}

impl<'g, T: Float + fmt::Debug> fmt::Debug for Value<'g, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Value")
            .field("id", &self.id)
            .field("data", &self.data())
            .field("grad", &self.grad())
            .finish()
    }
}

impl<'g, T: Float + fmt::Display> fmt::Display for Value<'g, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Value(data={})", self.data())
    }
}

impl<'g, T: Float> Add for Value<'g, T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let data = self.data() + rhs.data();
        self.binary(rhs, data, Op::Add)
    }
}

impl<'g, T: Float> Mul for Value<'g, T> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let (lhs_data, rhs_data) = (self.data(), rhs.data());
        self.binary(
            rhs,
            lhs_data * rhs_data,
            Op::Mul {
                lhs: lhs_data,
                rhs: rhs_data,
            },
        )
    }
}

impl<'g, T: Float> Neg for Value<'g, T> {
    type Output = Self;

    fn neg(self) -> Self {
        self * -T::one()
    }
}

impl<'g, T: Float> Sub for Value<'g, T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl<'g, T: Float> Div for Value<'g, T> {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        self * rhs.pow(-T::one())
    }
}

impl<'g, T: Float> Add<T> for Value<'g, T> {
    type Output = Self;

    fn add(self, rhs: T) -> Self {
        self + self.lift(rhs)
    }
}

impl<'g, T: Float> Mul<T> for Value<'g, T> {
    type Output = Self;

    fn mul(self, rhs: T) -> Self {
        self * self.lift(rhs)
    }
}

impl<'g, T: Float> Sub<T> for Value<'g, T> {
    type Output = Self;

    fn sub(self, rhs: T) -> Self {
        self - self.lift(rhs)
    }
}

impl<'g, T: Float> Div<T> for Value<'g, T> {
    type Output = Self;

    fn div(self, rhs: T) -> Self {
        self / self.lift(rhs)
    }
}

impl<'g, T: Float> Pow<T> for Value<'g, T> {
    type Output = Self;

    fn pow(self, exponent: T) -> Self {
        Value::pow(self, exponent)
    }
}

// scalar on the left: lift it into the graph and keep the operand order
macro_rules! impl_scalar_lhs {
    ($($scalar:ty),*) => {$(
        impl<'g> Add<Value<'g, $scalar>> for $scalar {
            type Output = Value<'g, $scalar>;

            fn add(self, rhs: Value<'g, $scalar>) -> Value<'g, $scalar> {
                rhs.lift(self) + rhs
            }
        }

        impl<'g> Sub<Value<'g, $scalar>> for $scalar {
            type Output = Value<'g, $scalar>;

            fn sub(self, rhs: Value<'g, $scalar>) -> Value<'g, $scalar> {
                rhs.lift(self) - rhs
            }
        }

        impl<'g> Mul<Value<'g, $scalar>> for $scalar {
            type Output = Value<'g, $scalar>;

            fn mul(self, rhs: Value<'g, $scalar>) -> Value<'g, $scalar> {
                rhs.lift(self) * rhs
            }
        }

        impl<'g> Div<Value<'g, $scalar>> for $scalar {
            type Output = Value<'g, $scalar>;

            fn div(self, rhs: Value<'g, $scalar>) -> Value<'g, $scalar> {
                rhs.lift(self) / rhs
            }
        }
    )*};
}

impl_scalar_lhs!(f32, f64);
