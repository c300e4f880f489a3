//! Feed-forward network built purely out of [`Value`] operations.

use log::debug;
use num_traits::Float;
use rand::{distributions::uniform::SampleUniform, rngs::StdRng, Rng, SeedableRng};

use crate::backwards::{Graph, Value};
use crate::error::{Error, Result};

/// Weighted sum of its inputs plus a bias, passed through ReLU.
#[derive(Clone, Debug)]
pub struct Neuron<'g, T: Float = f64> {
    weights: Vec<Value<'g, T>>,
    bias: Value<'g, T>,
}

impl<'g, T: Float + SampleUniform> Neuron<'g, T> {
    /// Draws `nin` weights and the bias uniformly from `[-1, 1)`.
    pub fn new<R: Rng + ?Sized>(graph: &'g Graph<T>, nin: usize, rng: &mut R) -> Self {
        let mut sample = || graph.value(rng.gen_range(-T::one()..T::one()));
        let weights = (0..nin).map(|_| sample()).collect();
        let bias = sample();
        Neuron { weights, bias }
    }
}

impl<'g, T: Float> Neuron<'g, T> {
    pub fn from_parameters(weights: Vec<Value<'g, T>>, bias: Value<'g, T>) -> Self {
        Neuron { weights, bias }
    }

    pub fn nin(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[Value<'g, T>] {
        &self.weights
    }

    pub fn bias(&self) -> Value<'g, T> {
        self.bias
    }

    pub fn forward(&self, x: &[Value<'g, T>]) -> Result<Value<'g, T>> {
        if x.len() != self.weights.len() {
            return Err(Error::InputSizeMismatch {
                expected: self.weights.len(),
                actual: x.len(),
            });
        }
        let sum = self
            .weights
            .iter()
            .zip(x)
            .fold(self.bias, |acc, (&w, &xi)| acc + w * xi);
        Ok(sum.relu())
    }

    pub fn parameters(&self) -> Vec<Value<'g, T>> {
        let mut params = self.weights.clone();
        params.push(self.bias);
        params
    }
}

#[derive(Clone, Debug)]
pub struct Layer<'g, T: Float = f64> {
    neurons: Vec<Neuron<'g, T>>,
}

impl<'g, T: Float + SampleUniform> Layer<'g, T> {
    pub fn new<R: Rng + ?Sized>(graph: &'g Graph<T>, nin: usize, nout: usize, rng: &mut R) -> Self {
        let neurons = (0..nout).map(|_| Neuron::new(graph, nin, &mut *rng)).collect();
        Layer { neurons }
    }
}

impl<'g, T: Float> Layer<'g, T> {
    pub fn from_neurons(neurons: Vec<Neuron<'g, T>>) -> Self {
        Layer { neurons }
    }

    pub fn neurons(&self) -> &[Neuron<'g, T>] {
        &self.neurons
    }

    /// One output per neuron, in neuron order.
    pub fn forward(&self, x: &[Value<'g, T>]) -> Result<Vec<Value<'g, T>>> {
        self.neurons.iter().map(|n| n.forward(x)).collect()
    }

    pub fn parameters(&self) -> Vec<Value<'g, T>> {
        self.neurons.iter().flat_map(|n| n.parameters()).collect()
    }
}

/// Multi-layer perceptron: layers applied one after the other.
#[derive(Clone, Debug)]
pub struct Mlp<'g, T: Float = f64> {
    layers: Vec<Layer<'g, T>>,
}

impl<'g, T: Float + SampleUniform> Mlp<'g, T> {
    /// Layer `i` maps `sizes[i - 1]` inputs (or `nin` for the first layer) to `sizes[i]`
    /// outputs.
    pub fn new<R: Rng + ?Sized>(
        graph: &'g Graph<T>,
        nin: usize,
        sizes: &[usize],
        rng: &mut R,
    ) -> Result<Self> {
        if sizes.is_empty() {
            return Err(Error::InvalidArchitecture("network needs at least one layer".into()));
        }
        if let Some(i) = sizes.iter().position(|&s| s == 0) {
            return Err(Error::InvalidArchitecture(format!("layer {} has no neurons", i)));
        }

        let widths: Vec<usize> = std::iter::once(nin).chain(sizes.iter().copied()).collect();
        let layers = widths
            .windows(2)
            .map(|w| Layer::new(graph, w[0], w[1], &mut *rng))
            .collect();
        debug!("Mlp: built layers {:?}", widths);
        Ok(Mlp { layers })
    }

    pub fn with_seed(graph: &'g Graph<T>, nin: usize, sizes: &[usize], seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new(graph, nin, sizes, &mut rng)
    }
}

impl<'g, T: Float> Mlp<'g, T> {
    pub fn layers(&self) -> &[Layer<'g, T>] {
        &self.layers
    }

    pub fn forward(&self, x: &[Value<'g, T>]) -> Result<Vec<Value<'g, T>>> {
        let mut activations = x.to_vec();
        for layer in &self.layers {
            activations = layer.forward(&activations)?;
        }
        Ok(activations)
    }

    pub fn parameters(&self) -> Vec<Value<'g, T>> {
        self.layers.iter().flat_map(|l| l.parameters()).collect()
    }
}
