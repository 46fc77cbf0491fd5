use crate::activator::TanH;
use crate::layers;
use crate::matrix::Mat;

use itertools::multizip;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;

/// Initial weights are drawn from the bias range, then shrunk by this factor
/// so every pre-activation sum starts in the linear region of tanh.
const WEIGHT_SHRINK: f64 = 100.0;

/// A fully connected tanh layer.
#[derive(Clone, Debug)]
pub struct Dense {
    /// The incoming weights, one row per neuron.
    weights: Mat,
    /// One bias per neuron.
    biases: Vec<f64>,
}

impl Dense {
    /// Initializes a new, untrained layer.
    ///
    /// Arguments:
    ///
    ///  * `inputs` - the number of inputs to this layer.
    ///  * `outputs` - the number of outputs from this layer.
    ///  * `rng` - the source of the initial parameters.
    pub fn new<R: Rng + ?Sized>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let range = Uniform::new(-0.5, 0.5);
        let biases = (0..outputs).map(|_| range.sample(rng)).collect();
        let mut weights = Mat::random(&range, rng, outputs, inputs);
        weights.scale(1.0 / WEIGHT_SHRINK);
        Dense { weights, biases }
    }

    pub fn biases(&self) -> &[f64] {
        &self.biases
    }

    pub fn biases_mut(&mut self) -> &mut [f64] {
        &mut self.biases
    }

    pub fn weights(&self) -> &Mat {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut [f64] {
        self.weights.as_mut_slice()
    }
}

impl layers::Layer for Dense {
    fn input_len(&self) -> usize {
        self.weights.cols()
    }

    fn output_len(&self) -> usize {
        self.weights.rows()
    }

    fn forward(&self, inputs: &[f64], outputs: &mut [f64]) {
        assert_eq!(inputs.len(), self.input_len());
        assert_eq!(outputs.len(), self.output_len());
        outputs.copy_from_slice(&self.biases);
        self.weights.gemv(inputs, outputs);
        for y in outputs {
            *y = TanH.f(*y);
        }
    }

    fn backward(
        &mut self,
        rate: f64,
        inputs: &[f64],
        outputs: &[f64],
        output_errors: &mut [f64],
        input_errors: Option<&mut [f64]>,
    ) {
        assert_eq!(inputs.len(), self.input_len());
        assert_eq!(outputs.len(), self.output_len());
        assert_eq!(output_errors.len(), self.output_len());
        for (y, e, b) in multizip((
            outputs.iter(),
            output_errors.iter_mut(),
            self.biases.iter_mut(),
        )) {
            *e *= TanH.fprime(*y);
            *b -= rate * *e;
        }
        self.weights.ger(-rate, output_errors, inputs);

        // Upstream errors see the weights as they are after this update.
        if let Some(input_errors) = input_errors {
            assert_eq!(input_errors.len(), self.input_len());
            self.weights.gemv_trans(output_errors, input_errors);
        }
    }
}
