//! Builds a trained target locator and runs it on live frames.
//!
//! On construction the locator first tries the saved model; if that is
//! missing or was written for another topology it renders a grid of
//! synthetic frames, trains on them until every prediction is within
//! tolerance, and saves the result for the next run.

use log::{info, warn};
use rand::thread_rng;

use crate::config::{LocatorConfig, SynthesisGrid};
use crate::error::{Error, Result};
use crate::feed_forward::Network;
use crate::raster::{Featurizer, Raster, ThresholdFeaturizer};
use crate::render::Renderer;
use crate::sample::TrainingSample;
use crate::telemetry::Telemetry;
use crate::trainer::{self, CancelToken, Logging, Trainer, TrainingOutcome};

/// Consumes the locator's predictions, for instance to steer toward them.
pub trait PredictionSink {
    /// `offset` is the predicted target column; `size_class` is whatever the
    /// caller passed along with the frame.
    fn on_prediction(&mut self, offset: f64, size_class: u32);
}

impl<F: FnMut(f64, u32)> PredictionSink for F {
    fn on_prediction(&mut self, offset: f64, size_class: u32) {
        self(offset, size_class)
    }
}

/// Where the locator's parameters came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Provenance {
    /// Read back from the model file.
    Loaded,
    /// Trained in this process.
    Trained { epochs: usize, converged: bool },
}

/// Renders a training sample for every point of `grid`.
///
/// The target of each sample is the position it was rendered at and its
/// size class is the rendered size.
pub fn synthesize_samples(
    grid: &SynthesisGrid,
    renderer: &dyn Renderer,
    featurizer: &dyn Featurizer,
) -> Result<Vec<TrainingSample>> {
    grid.points()
        .map(|(size, position)| {
            let frame = renderer.render(f64::from(size), f64::from(position));
            let features = featurizer.featurize(&frame)?;
            Ok(TrainingSample::new(features, f64::from(position), size))
        })
        .collect()
}

/// Turns a predicted column into the heading change that would centre it:
/// positive to the left of centre, negative to the right, scaled so the
/// frame edge maps to `half_fov_degrees`.
pub fn heading_correction(offset: f64, frame_width: usize, half_fov_degrees: f64) -> f64 {
    let half_width = frame_width as f64 / 2.0;
    -(offset - half_width) / half_width * half_fov_degrees
}

/// A trained network together with the featurizer it was trained through.
#[derive(Debug)]
pub struct TargetLocator {
    network: Network,
    featurizer: ThresholdFeaturizer,
    config: LocatorConfig,
    provenance: Provenance,
    samples: Vec<TrainingSample>,
}

impl TargetLocator {
    /// Loads the saved model, or trains and saves a new one.
    ///
    /// Progress is reported to `telemetry`. Training runs on the calling
    /// thread until it converges or `config.max_epochs` is reached.
    pub fn new(
        config: LocatorConfig,
        renderer: &dyn Renderer,
        telemetry: &mut dyn Telemetry,
    ) -> Result<Self> {
        TargetLocator::build(config, renderer, telemetry, None)
    }

    /// Like [`TargetLocator::new`], but training stops with
    /// `Error::Cancelled` once `cancel` is raised.
    pub fn new_cancellable(
        config: LocatorConfig,
        renderer: &dyn Renderer,
        telemetry: &mut dyn Telemetry,
        cancel: CancelToken,
    ) -> Result<Self> {
        TargetLocator::build(config, renderer, telemetry, Some(cancel))
    }

    fn build(
        config: LocatorConfig,
        renderer: &dyn Renderer,
        telemetry: &mut dyn Telemetry,
        cancel: Option<CancelToken>,
    ) -> Result<Self> {
        config.validate()?;
        if renderer.geometry() != config.frame {
            return Err(Error::Configuration(format!(
                "renderer draws {:?} frames but the network expects {:?}",
                renderer.geometry(),
                config.frame
            )));
        }

        let mut network = match config.seed {
            Some(seed) => Network::with_seed(&config.topology, seed)?,
            None => Network::new(&config.topology, &mut thread_rng())?,
        };
        network.set_learning_rate(config.learning_rate)?;
        let featurizer = ThresholdFeaturizer::new(config.frame).edges_only(config.edges_only);

        if let Some(path) = &config.model_path {
            match network.load(path) {
                Ok(()) => {
                    info!("loaded model from {}", path.display());
                    telemetry.line(">> LOADED AI MODEL");
                    return Ok(TargetLocator {
                        network,
                        featurizer,
                        config,
                        provenance: Provenance::Loaded,
                        samples: Vec::new(),
                    });
                }
                Err(e) => warn!("{e}; training a new model"),
            }
        }

        telemetry.line(">> CREATING TRAINING DATA");
        let samples = synthesize_samples(&config.grid, renderer, &featurizer)?;
        info!("created {} training samples", samples.len());

        telemetry.line(">> TRAINING AI MODEL");
        let mut trainer = Trainer::new(config.frame.width as f64)
            .tolerance(config.tolerance)
            .logging(Logging::Epochs(100))
            .stop_condition(config.max_epochs);
        if let Some(token) = cancel {
            trainer = trainer.cancel_token(token);
        }
        let outcome = trainer.train(network, &samples, telemetry)?;
        telemetry.line(&format!(">> TRAINING COMPLETE. EPOCH {}", outcome.epochs()));

        let provenance = Provenance::Trained {
            epochs: outcome.epochs(),
            converged: outcome.is_converged(),
        };
        let network = match outcome {
            TrainingOutcome::Converged { network, epochs } => {
                info!("training complete after {epochs} epochs");
                if let Some(path) = &config.model_path {
                    network.save(path)?;
                    telemetry.line(">> AI MODEL SAVED");
                }
                network
            }
            TrainingOutcome::Exhausted { epochs, .. } if config.require_convergence => {
                return Err(Error::MaxEpochsExceeded { epochs });
            }
            TrainingOutcome::Exhausted {
                network,
                epochs,
                misses,
            } => {
                warn!("no convergence after {epochs} epochs, {misses} sample(s) still missed; model not saved");
                network
            }
        };

        Ok(TargetLocator {
            network,
            featurizer,
            samples: if config.retain_samples {
                samples
            } else {
                Vec::new()
            },
            config,
            provenance,
        })
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Predicts the target column for an already featurized frame.
    pub fn predict(&mut self, features: &[f64]) -> Result<f64> {
        trainer::predict(&mut self.network, features, self.config.frame.width as f64)
    }

    /// Featurizes `frame` and predicts the target column in it.
    pub fn locate(&mut self, frame: &Raster) -> Result<f64> {
        let features = self.featurizer.featurize(frame)?;
        self.predict(&features)
    }

    /// Locates the target in `frame` and hands the prediction to `sink`.
    pub fn observe(
        &mut self,
        frame: &Raster,
        size_class: u32,
        sink: &mut dyn PredictionSink,
    ) -> Result<f64> {
        let offset = self.locate(frame)?;
        sink.on_prediction(offset, size_class);
        Ok(offset)
    }

    /// The retained training sample rendered at `size` and `position`, if any.
    pub fn sample(&self, size: u32, position: u32) -> Option<&TrainingSample> {
        self.samples
            .iter()
            .find(|s| s.size_class() == size && s.target() == f64::from(position))
    }
}
