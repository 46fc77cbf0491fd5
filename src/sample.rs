/// One synthetic training example: a featurized frame and where the target
/// really was.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingSample {
    features: Vec<f64>,
    target: f64,
    size_class: u32,
}

impl TrainingSample {
    /// Arguments:
    ///  * `features` - the featurized frame, one entry per pixel.
    ///  * `target` - the target's horizontal position, in pixels.
    ///  * `size_class` - the rendered size of the target; only used to pick
    ///                   a convergence tolerance.
    pub fn new(features: Vec<f64>, target: f64, size_class: u32) -> Self {
        TrainingSample {
            features,
            target,
            size_class,
        }
    }

    pub fn features(&self) -> &[f64] {
        &self.features
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn size_class(&self) -> u32 {
        self.size_class
    }
}
