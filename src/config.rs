//! Settings for building a [`TargetLocator`](crate::pipeline::TargetLocator).

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::feed_forward::DEFAULT_LEARNING_RATE;
use crate::raster::FrameGeometry;
use crate::trainer::TolerancePolicy;

/// The sizes and positions training frames are rendered at. Ends are
/// exclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisGrid {
    pub size_start: u32,
    pub size_end: u32,
    pub size_step: u32,
    pub position_start: u32,
    pub position_end: u32,
    pub position_step: u32,
}

impl SynthesisGrid {
    /// Every `(size, position)` pair, sizes in the outer loop.
    pub fn points(&self) -> impl Iterator<Item = (u32, u32)> {
        let grid = *self;
        (grid.size_start..grid.size_end)
            .step_by(grid.size_step.max(1) as usize)
            .flat_map(move |size| {
                (grid.position_start..grid.position_end)
                    .step_by(grid.position_step.max(1) as usize)
                    .map(move |position| (size, position))
            })
    }

    pub fn len(&self) -> usize {
        self.points().count()
    }

    pub fn is_empty(&self) -> bool {
        self.points().next().is_none()
    }
}

impl Default for SynthesisGrid {
    fn default() -> Self {
        SynthesisGrid {
            size_start: 25,
            size_end: 175,
            size_step: 5,
            position_start: 0,
            position_end: 200,
            position_step: 1,
        }
    }
}

/// Everything needed to build, train and persist a target locator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Neurons per layer, input first. The input layer must match `frame`
    /// and the output layer must be a single neuron.
    pub topology: Vec<usize>,
    pub frame: FrameGeometry,
    pub learning_rate: f64,
    /// Seed for the initial parameters; `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Epoch cap; `None` trains until converged, however long that takes.
    pub max_epochs: Option<usize>,
    /// Fail with `MaxEpochsExceeded` instead of keeping the best network
    /// when the cap is hit.
    pub require_convergence: bool,
    pub tolerance: TolerancePolicy,
    pub grid: SynthesisGrid,
    /// Where the trained model is loaded from and saved to; `None` disables
    /// persistence.
    pub model_path: Option<PathBuf>,
    /// Run the edge filter before thresholding.
    pub edges_only: bool,
    /// Keep the training samples around after training for lookups.
    pub retain_samples: bool,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        let frame = FrameGeometry::default();
        LocatorConfig {
            topology: vec![frame.pixels(), 5, 1],
            frame,
            learning_rate: DEFAULT_LEARNING_RATE,
            seed: Some(0),
            max_epochs: Some(10_000),
            require_convergence: false,
            tolerance: TolerancePolicy::default(),
            grid: SynthesisGrid::default(),
            model_path: Some(PathBuf::from("sinking-feeling.ai")),
            edges_only: true,
            retain_samples: false,
        }
    }
}

impl LocatorConfig {
    /// Reads a JSON configuration; missing fields take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: LocatorConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings are consistent with each other.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::Configuration(msg));
        if self.frame.pixels() == 0 {
            return invalid(format!("frame {:?} has no pixels", self.frame));
        }
        if self.topology.len() < 2 {
            return invalid(format!(
                "topology {:?} needs at least an input and an output layer",
                self.topology
            ));
        }
        if self.topology[0] != self.frame.pixels() {
            return invalid(format!(
                "input layer has {} neurons but frames have {} pixels",
                self.topology[0],
                self.frame.pixels()
            ));
        }
        if self.topology.last() != Some(&1) {
            return invalid(format!(
                "output layer must be a single neuron, topology is {:?}",
                self.topology
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return invalid(format!("learning rate {} is not positive", self.learning_rate));
        }
        if self.max_epochs == Some(0) {
            return invalid("max_epochs must be at least 1".to_string());
        }
        if self.tolerance.tight < 0.0 || self.tolerance.loose < 0.0 {
            return invalid(format!("negative tolerance in {:?}", self.tolerance));
        }
        if self.grid.size_step == 0 || self.grid.position_step == 0 {
            return invalid("synthesis grid steps must be at least 1".to_string());
        }
        if self.grid.is_empty() {
            return invalid(format!("synthesis grid {:?} is empty", self.grid));
        }
        Ok(())
    }
}
