//! The network's activation function.

/// [Hyperbolic tangent](https://en.wikipedia.org/wiki/Hyperbolic_functions)
/// activation, squashing every neuron into `[-1, 1]`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TanH;

impl TanH {
    /// Evaluates `f(x) = tanh(x)`.
    pub fn f(&self, x: f64) -> f64 {
        x.tanh()
    }

    /// Evaluates the derivative `f'(x)`, where `x = f^{-1}(y)`.
    ///
    /// Note that this function takes in the *output* of the activation
    /// function, rather than the input. Since `tanh'(x) = 1 - tanh(x)^2`, the
    /// intermediate results before activation never have to be stored.
    pub fn fprime(&self, y: f64) -> f64 {
        1.0 - y * y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn output_is_bounded() {
        for x in [-50.0, -1.0, 0.0, 0.3, 50.0] {
            let y = TanH.f(x);
            assert!((-1.0..=1.0).contains(&y));
        }
        assert_eq!(TanH.f(0.0), 0.0);
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let h = 1e-6;
        for x in [-2.0, -0.5, 0.0, 0.7, 1.5] {
            let numeric = (TanH.f(x + h) - TanH.f(x - h)) / (2.0 * h);
            assert_abs_diff_eq!(TanH.fprime(TanH.f(x)), numeric, epsilon = 1e-8);
        }
    }
}
