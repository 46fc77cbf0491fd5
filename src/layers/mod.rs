pub mod dense;

pub use self::dense::Dense;

/// A single trainable transition between two layers of neurons.
pub trait Layer {
    /// Returns the number of inputs to this layer.
    fn input_len(&self) -> usize;

    /// Returns the number of outputs from this layer.
    fn output_len(&self) -> usize;

    /// Feeds the provided `inputs` forward, overwriting `outputs` with the
    /// activated values.
    fn forward(&self, inputs: &[f64], outputs: &mut [f64]);

    /// Feeds `output_errors` backwards through the layer and updates its
    /// parameters in place, scaled by the gradient descent `rate`.
    ///
    /// On entry `output_errors` holds `dE/dy` for each output; on return it
    /// holds the error signal (gamma) of each neuron. When `input_errors` is
    /// given, the error owed by each input is accumulated into it.
    fn backward(
        &mut self,
        rate: f64,
        inputs: &[f64],
        outputs: &[f64],
        output_errors: &mut [f64],
        input_errors: Option<&mut [f64]>,
    );
}
