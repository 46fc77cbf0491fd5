//! A [Feedforward neural network]
//! (https://en.wikipedia.org/wiki/Feedforward_neural_network) with tanh
//! neurons, trained one sample at a time.
//!
//! # Example
//!
//! ```
//! # use target_locator::feed_forward::Network;
//! let mut network = Network::with_seed(&[2, 3, 1], 42).unwrap();
//! for _ in 0..1000 {
//!     network.back_propagate(&[1.0, 0.0], &[0.5]).unwrap();
//! }
//! let output = network.run(&[1.0, 0.0]).unwrap();
//! assert!((output[0] - 0.5).abs() < 0.1);
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{Error, Result};
use crate::layers::{Dense, Layer};
use crate::matrix::Mat;
use crate::persist::{self, LoadFailure};
use crate::utils::{adjacent, adjacent_mut};

/// The learning rate used unless one is set explicitly.
pub const DEFAULT_LEARNING_RATE: f64 = 0.01;

/// A feedforward neural network.
///
/// The network owns its activations: every call to [`Network::feed_forward`]
/// or [`Network::back_propagate`] overwrites the values of every layer.
#[derive(Clone, Debug)]
pub struct Network {
    topology: Vec<usize>,
    layers: Vec<Dense>,
    /// Activated values of every layer, input layer first.
    activations: Vec<Vec<f64>>,
    /// Error signal scratch space, same shape as `activations`.
    errors: Vec<Vec<f64>>,
    learning_rate: f64,
}

impl Network {
    /// Creates a new, untrained neural network.
    ///
    /// Arguments:
    ///  * `topology` - the number of neurons in each layer, input layer
    ///                 first. Must contain at least 2 non-zero entries.
    ///  * `rng` - the source of the initial biases and weights.
    pub fn new<R: Rng + ?Sized>(topology: &[usize], rng: &mut R) -> Result<Self> {
        validate_topology(topology)?;
        let layers = topology
            .windows(2)
            .map(|pair| Dense::new(pair[0], pair[1], rng))
            .collect();
        let activations: Vec<Vec<f64>> = topology.iter().map(|&n| vec![0.0; n]).collect();
        Ok(Network {
            topology: topology.to_vec(),
            layers,
            errors: activations.clone(),
            activations,
            learning_rate: DEFAULT_LEARNING_RATE,
        })
    }

    /// Creates a new network whose initial parameters depend only on `seed`.
    pub fn with_seed(topology: &[usize], seed: u64) -> Result<Self> {
        Network::new(topology, &mut ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn topology(&self) -> &[usize] {
        &self.topology
    }

    /// Returns the size of the input layer to the network.
    pub fn input_len(&self) -> usize {
        self.topology[0]
    }

    /// Returns the size of the output layer from the network.
    pub fn output_len(&self) -> usize {
        self.topology[self.layers.len()]
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, rate: f64) -> Result<()> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(Error::Configuration(format!(
                "learning rate must be positive and finite, got {rate}"
            )));
        }
        self.learning_rate = rate;
        Ok(())
    }

    /// Number of biases: one per neuron outside the input layer.
    pub fn bias_count(&self) -> usize {
        self.layers.iter().map(|l| l.output_len()).sum()
    }

    /// Number of weights: one per connection between adjacent layers.
    pub fn weight_count(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.input_len() * l.output_len())
            .sum()
    }

    pub fn parameter_count(&self) -> usize {
        self.bias_count() + self.weight_count()
    }

    /// Biases of layer `layer` (1-based: layer 0 is the input and has none).
    ///
    /// # Panics
    ///
    /// Panics if `layer` is 0 or not below `topology().len()`.
    pub fn biases(&self, layer: usize) -> &[f64] {
        self.dense(layer).biases()
    }

    /// Incoming weights of layer `layer`, one row per neuron.
    ///
    /// # Panics
    ///
    /// Panics if `layer` is 0 or not below `topology().len()`.
    pub fn weights(&self, layer: usize) -> &Mat {
        self.dense(layer).weights()
    }

    fn dense(&self, layer: usize) -> &Dense {
        assert!(layer > 0, "the input layer has no parameters");
        &self.layers[layer - 1]
    }

    /// Activations of layer `layer` as left by the last forward pass.
    ///
    /// # Panics
    ///
    /// Panics if `layer` is not below `topology().len()`.
    pub fn activations(&self, layer: usize) -> &[f64] {
        &self.activations[layer]
    }

    /// Feeds the provided `input` through the network, returning the output
    /// layer.
    ///
    /// The returned slice borrows the network's own activations, so it cannot
    /// outlive the next forward or training call.
    pub fn feed_forward(&mut self, input: &[f64]) -> Result<&[f64]> {
        Error::check_len(self.input_len(), input.len())?;
        self.forward(input);
        Ok(self.activations[self.layers.len()].as_slice())
    }

    /// Like [`Network::feed_forward`], but returns an owned copy of the output.
    pub fn run(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        self.feed_forward(input).map(|output| output.to_vec())
    }

    /// Performs one step of stochastic gradient descent on a single sample,
    /// minimizing the squared error between the output and `expected`.
    pub fn back_propagate(&mut self, input: &[f64], expected: &[f64]) -> Result<()> {
        Error::check_len(self.input_len(), input.len())?;
        Error::check_len(self.output_len(), expected.len())?;
        self.forward(input);

        let output = self.layers.len();
        for (e, (&y, &t)) in self.errors[output]
            .iter_mut()
            .zip(self.activations[output].iter().zip(expected))
        {
            *e = y - t;
        }
        for (i, layer) in self.layers.iter_mut().enumerate().rev() {
            let (inputs, outputs) = adjacent(&self.activations, i);
            let (in_errors, out_errors) = adjacent_mut(&mut self.errors, i);
            // Nothing upstream of the input layer needs an error signal.
            let in_errors = if i > 0 {
                in_errors.fill(0.0);
                Some(in_errors.as_mut_slice())
            } else {
                None
            };
            layer.backward(self.learning_rate, inputs, outputs, out_errors, in_errors);
        }
        Ok(())
    }

    fn forward(&mut self, input: &[f64]) {
        self.activations[0].copy_from_slice(input);
        for (i, layer) in self.layers.iter().enumerate() {
            let (inputs, outputs) = adjacent_mut(&mut self.activations, i);
            layer.forward(inputs, outputs);
        }
    }

    /// Writes every bias, then every weight, one value per line.
    ///
    /// Biases are ordered layer-major then neuron-major; weights layer-major,
    /// destination-neuron-major, source-neuron-minor.
    pub fn write_parameters<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for layer in &self.layers {
            persist::write_values(writer, layer.biases())?;
        }
        for layer in &self.layers {
            persist::write_values(writer, layer.weights().as_slice())?;
        }
        Ok(())
    }

    /// Replaces every parameter with values read in [`Network::write_parameters`]
    /// order. On failure the network is left untouched.
    pub(crate) fn read_parameters<R: BufRead>(&mut self, reader: R) -> std::result::Result<(), LoadFailure> {
        let values = persist::read_values(reader, self.parameter_count())?;
        let (biases, weights) = values.split_at(self.bias_count());

        let mut offset = 0;
        for layer in &mut self.layers {
            let n = layer.output_len();
            layer.biases_mut().copy_from_slice(&biases[offset..offset + n]);
            offset += n;
        }
        let mut offset = 0;
        for layer in &mut self.layers {
            let n = layer.input_len() * layer.output_len();
            layer.weights_mut().copy_from_slice(&weights[offset..offset + n]);
            offset += n;
        }
        Ok(())
    }

    /// Saves the biases and weights to `path`, replacing any existing file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::save(path, e))?;
        let mut writer = BufWriter::new(file);
        self.write_parameters(&mut writer)
            .and_then(|_| writer.flush())
            .map_err(|e| Error::save(path, e))?;
        debug!("saved {} parameters to {}", self.parameter_count(), path.display());
        Ok(())
    }

    /// Loads the biases and weights saved at `path`.
    ///
    /// The file carries no shape information, so it must have been written by
    /// a network of the same topology. A missing file, a malformed value or a
    /// count that disagrees with this topology fails the load and leaves the
    /// network untouched.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::load(path, "file does not exist"));
        }
        let file = File::open(path).map_err(|e| Error::load(path, e))?;
        self.read_parameters(BufReader::new(file))
            .map_err(|e| Error::load(path, e))?;
        debug!("loaded {} parameters from {}", self.parameter_count(), path.display());
        Ok(())
    }
}

fn validate_topology(topology: &[usize]) -> Result<()> {
    if topology.len() < 2 {
        return Err(Error::Configuration(format!(
            "a network needs at least an input and an output layer, got {} layer(s)",
            topology.len()
        )));
    }
    if let Some(layer) = topology.iter().position(|&n| n == 0) {
        return Err(Error::Configuration(format!("layer {layer} has no neurons")));
    }
    Ok(())
}
