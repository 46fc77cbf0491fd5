//! Convergence-gated training of a [`Network`] on [`TrainingSample`]s.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::feed_forward::Network;
use crate::sample::TrainingSample;
use crate::telemetry::Telemetry;

/// Per-sample acceptance rule: how far, in target units, a prediction may
/// stray before the sample counts as unlearned.
///
/// A fixed error in pixels matters more for a small, distant target, so
/// samples whose size class is below `size_threshold` get the `tight`
/// tolerance and all others the `loose` one.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TolerancePolicy {
    pub size_threshold: u32,
    pub tight: f64,
    pub loose: f64,
}

impl TolerancePolicy {
    pub fn tolerance(&self, size_class: u32) -> f64 {
        if size_class < self.size_threshold {
            self.tight
        } else {
            self.loose
        }
    }

    /// Returns true when `predicted` is close enough to the sample's target.
    pub fn accepts(&self, sample: &TrainingSample, predicted: f64) -> bool {
        (predicted - sample.target()).abs() <= self.tolerance(sample.size_class())
    }
}

impl Default for TolerancePolicy {
    fn default() -> Self {
        TolerancePolicy {
            size_threshold: 40,
            tight: 2.0,
            loose: 5.0,
        }
    }
}

/// Logging frequency to use during training
#[derive(Copy, Clone, Debug)]
pub enum Logging {
    /// No logs will be emitted
    Silent,
    /// A summary will be logged at completion
    Completion,
    /// A summary will be logged after every `n` epochs
    Epochs(usize),
}

impl Logging {
    /// Performs logging at the end of `epoch`.
    fn epoch(&self, epoch: usize, misses: usize) {
        if let Logging::Epochs(freq) = *self {
            if freq > 0 && epoch % freq == 0 {
                info!("Epoch {epoch}:\t{misses} sample(s) outside tolerance");
            }
        }
        debug!("epoch {epoch} done, {misses} miss(es)");
    }

    /// Performs logging at the end of training.
    fn completion(&self, outcome: &TrainingOutcome, start_time: Instant) {
        if let Logging::Silent = self {
            return;
        }
        match outcome {
            TrainingOutcome::Converged { epochs, .. } => info!(
                "Converged after {} epochs in {} seconds.",
                epochs,
                start_time.elapsed().as_secs()
            ),
            TrainingOutcome::Exhausted { epochs, misses, .. } => info!(
                "Stopped after {} epochs in {} seconds, best network misses {} sample(s).",
                epochs,
                start_time.elapsed().as_secs(),
                misses
            ),
        }
    }
}

/// When to give up on convergence
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum StopCondition {
    /// Trains until every sample is within tolerance, however long it takes
    Converged,
    /// Stops after the provided number of epochs
    Epochs(usize),
    /// Stops after the provided duration
    Duration(Duration),
}

impl From<Duration> for StopCondition {
    fn from(duration: Duration) -> StopCondition {
        StopCondition::Duration(duration)
    }
}

impl From<Option<usize>> for StopCondition {
    fn from(max_epochs: Option<usize>) -> StopCondition {
        max_epochs.map_or(StopCondition::Converged, StopCondition::Epochs)
    }
}

impl StopCondition {
    /// Returns true if training should give up after `epoch`.
    fn should_stop(&self, epoch: usize, start_time: Instant) -> bool {
        match *self {
            StopCondition::Converged => false,
            StopCondition::Epochs(epochs) => epoch >= epochs,
            StopCondition::Duration(duration) => start_time.elapsed() > duration,
        }
    }
}

/// A flag another thread can raise to stop training between epochs.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How a training run ended.
#[derive(Debug)]
pub enum TrainingOutcome {
    /// Every sample was within tolerance after `epochs` epochs.
    Converged { network: Network, epochs: usize },
    /// The stop condition fired first. `network` is the best one seen.
    Exhausted {
        network: Network,
        epochs: usize,
        /// Samples the returned network still misses. Exact when the trainer
        /// keeps the best network, otherwise a lower bound of 1.
        misses: usize,
    },
}

impl TrainingOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, TrainingOutcome::Converged { .. })
    }

    pub fn epochs(&self) -> usize {
        match self {
            TrainingOutcome::Converged { epochs, .. } | TrainingOutcome::Exhausted { epochs, .. } => {
                *epochs
            }
        }
    }

    pub fn network(&self) -> &Network {
        match self {
            TrainingOutcome::Converged { network, .. }
            | TrainingOutcome::Exhausted { network, .. } => network,
        }
    }

    pub fn into_network(self) -> Network {
        match self {
            TrainingOutcome::Converged { network, .. }
            | TrainingOutcome::Exhausted { network, .. } => network,
        }
    }
}

/// Rounds the network's single output back into target units.
pub fn predict(network: &mut Network, features: &[f64], scale: f64) -> Result<f64> {
    let output = network.feed_forward(features)?;
    Ok((output[0] * scale).round())
}

/// Trains a `Network` until it predicts every sample within tolerance.
///
/// # Example
///
/// ```
/// # use target_locator::feed_forward::Network;
/// # use target_locator::sample::TrainingSample;
/// # use target_locator::telemetry::NullTelemetry;
/// # use target_locator::trainer::*;
/// let samples = [TrainingSample::new(vec![1.0, 0.0, 0.0, 1.0], 3.0, 10)];
/// let network = Network::with_seed(&[4, 2, 1], 1).unwrap();
/// let outcome = Trainer::new(10.0)
///     .stop_condition(StopCondition::Epochs(5000))
///     .train(network, &samples, &mut NullTelemetry)
///     .unwrap();
/// assert!(outcome.is_converged());
/// ```
#[derive(Debug)]
pub struct Trainer {
    scale: f64,
    learning_rate: Option<f64>,
    tolerance: TolerancePolicy,
    logging: Logging,
    stop_condition: StopCondition,
    keep_best: bool,
    cancel: Option<CancelToken>,
}

impl Trainer {
    /// Creates a new Trainer instance.
    ///
    /// `scale` maps targets into the network's output range: the network is
    /// taught `target / scale`, and its output is multiplied back by `scale`.
    /// For pixel columns this is the frame width.
    ///
    /// The trainer is initialized with some default values. These defaults are:
    ///
    /// * The network's own learning rate.
    /// * A tolerance of 2 below size 40, 5 otherwise.
    /// * Trains until converged, with no epoch cap.
    /// * Logs on training completion.
    pub fn new(scale: f64) -> Self {
        Trainer {
            scale,
            learning_rate: None,
            tolerance: TolerancePolicy::default(),
            logging: Logging::Completion,
            stop_condition: StopCondition::Converged,
            keep_best: true,
            cancel: None,
        }
    }

    /// Overrides the network's learning rate for this run.
    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = Some(rate);
        self
    }

    /// Sets the per-sample acceptance rule.
    pub fn tolerance(mut self, tolerance: TolerancePolicy) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the type of logging to be emitted during training.
    pub fn logging(mut self, logging: Logging) -> Self {
        self.logging = logging;
        self
    }

    /// Sets the condition to give up on convergence.
    pub fn stop_condition<C>(mut self, condition: C) -> Self
    where
        C: Into<StopCondition>,
    {
        self.stop_condition = condition.into();
        self
    }

    /// When set (the default), every epoch checks all samples and the network
    /// with the fewest misses is kept in case training is exhausted. When
    /// unset, checking stops at the first miss and an exhausted run returns
    /// the last network.
    pub fn keep_best(mut self, keep_best: bool) -> Self {
        self.keep_best = keep_best;
        self
    }

    /// Checks `token` once per epoch and stops with `Error::Cancelled` once
    /// it is raised.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Trains `network` on `samples`, visiting them in order every epoch.
    ///
    /// Returns:
    ///   The trained network and how training ended, or an error if invalid
    ///   training parameters were provided or training was cancelled.
    pub fn train(
        self,
        mut network: Network,
        samples: &[TrainingSample],
        telemetry: &mut dyn Telemetry,
    ) -> Result<TrainingOutcome> {
        self.validate(&network, samples)?;
        if let Some(rate) = self.learning_rate {
            network.set_learning_rate(rate)?;
        }

        let start_time = Instant::now();
        let mut best: Option<(Network, usize)> = None;
        let mut epoch = 0;
        loop {
            if self.cancel.as_ref().map_or(false, CancelToken::is_cancelled) {
                info!("training cancelled after {epoch} epochs");
                return Err(Error::Cancelled { epochs: epoch });
            }
            epoch += 1;

            for sample in samples {
                network.back_propagate(sample.features(), &[sample.target() / self.scale])?;
            }
            let misses = self.misses(&mut network, samples)?;

            telemetry.line(&format!(">> EPOCH {epoch}"));
            self.logging.epoch(epoch, misses);

            if misses == 0 {
                let outcome = TrainingOutcome::Converged {
                    network,
                    epochs: epoch,
                };
                self.logging.completion(&outcome, start_time);
                return Ok(outcome);
            }
            if self.keep_best && best.as_ref().map_or(true, |(_, fewest)| misses < *fewest) {
                best = Some((network.clone(), misses));
            }
            if self.stop_condition.should_stop(epoch, start_time) {
                let (network, misses) = best.unwrap_or((network, misses));
                let outcome = TrainingOutcome::Exhausted {
                    network,
                    epochs: epoch,
                    misses,
                };
                self.logging.completion(&outcome, start_time);
                return Ok(outcome);
            }
        }
    }

    /// Counts samples outside tolerance; stops at the first one unless the
    /// best network is being tracked.
    fn misses(&self, network: &mut Network, samples: &[TrainingSample]) -> Result<usize> {
        let mut misses = 0;
        for sample in samples {
            let predicted = predict(network, sample.features(), self.scale)?;
            if !self.tolerance.accepts(sample, predicted) {
                misses += 1;
                if !self.keep_best {
                    break;
                }
            }
        }
        Ok(misses)
    }

    /// Verifies that all provided inputs to the `Trainer` are valid, returning
    /// an error if something is wrong.
    fn validate(&self, network: &Network, samples: &[TrainingSample]) -> Result<()> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(Error::Configuration(format!(
                "target scale must be positive and finite, got {}",
                self.scale
            )));
        }
        if network.output_len() != 1 {
            return Err(Error::Configuration(format!(
                "the network must have a single output, got {}",
                network.output_len()
            )));
        }
        if samples.is_empty() {
            return Err(Error::Configuration("no training samples".to_string()));
        }
        for sample in samples {
            Error::check_len(network.input_len(), sample.features().len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::NullTelemetry;

    fn one_hot(width: usize, index: usize) -> Vec<f64> {
        let mut v = vec![0.0; width];
        v[index] = 1.0;
        v
    }

    #[test]
    fn tolerance_is_two_tier() {
        let policy = TolerancePolicy::default();
        assert_eq!(policy.tolerance(25), 2.0);
        assert_eq!(policy.tolerance(39), 2.0);
        assert_eq!(policy.tolerance(40), 5.0);
        let sample = TrainingSample::new(vec![], 100.0, 30);
        assert!(policy.accepts(&sample, 102.0));
        assert!(!policy.accepts(&sample, 103.0));
    }

    #[test]
    fn stop_condition_from_epoch_cap() {
        assert_eq!(StopCondition::from(None), StopCondition::Converged);
        assert_eq!(StopCondition::from(Some(7)), StopCondition::Epochs(7));
        assert!(StopCondition::Epochs(3).should_stop(3, Instant::now()));
        assert!(!StopCondition::Converged.should_stop(usize::MAX, Instant::now()));
    }

    /// Two one-hot inputs whose targets sit 0.6 apart after scaling. The
    /// initial weights are too small to tell them apart, so the hidden layer
    /// has to learn before the output can meet both.
    fn separated_pair() -> [TrainingSample; 2] {
        [
            TrainingSample::new(one_hot(4, 0), 2.0, 10),
            TrainingSample::new(one_hot(4, 3), 8.0, 10),
        ]
    }

    fn hidden_layer_trainer() -> Trainer {
        Trainer::new(10.0)
            .learning_rate(0.1)
            .stop_condition(StopCondition::Epochs(50_000))
    }

    #[test]
    fn hidden_layer_learns_over_several_epochs() {
        let samples = separated_pair();
        let network = Network::with_seed(&[4, 2, 1], 5).unwrap();
        let outcome = hidden_layer_trainer()
            .train(network, &samples, &mut NullTelemetry)
            .unwrap();
        assert!(outcome.is_converged(), "{outcome:?}");
        assert!(outcome.epochs() > 1);

        let mut network = outcome.into_network();
        for sample in &samples {
            let predicted = predict(&mut network, sample.features(), 10.0).unwrap();
            assert!((predicted - sample.target()).abs() <= 2.0);
        }
    }

    #[test]
    fn untracked_training_reaches_the_same_verdict() {
        let samples = separated_pair();
        let network = Network::with_seed(&[4, 2, 1], 5).unwrap();
        let tracked = hidden_layer_trainer()
            .train(network.clone(), &samples, &mut NullTelemetry)
            .unwrap();
        let untracked = hidden_layer_trainer()
            .keep_best(false)
            .train(network, &samples, &mut NullTelemetry)
            .unwrap();
        assert!(untracked.is_converged(), "{untracked:?}");
        assert_eq!(untracked.epochs(), tracked.epochs());
    }

    #[test]
    fn untracked_training_stops_counting_at_first_miss() {
        let samples = [
            TrainingSample::new(one_hot(2, 0), 30.0, 10),
            TrainingSample::new(one_hot(2, 1), 40.0, 10),
        ];
        let network = Network::with_seed(&[2, 1], 0).unwrap();
        let exhausted = |keep_best: bool| {
            let outcome = Trainer::new(10.0)
                .keep_best(keep_best)
                .stop_condition(StopCondition::Epochs(25))
                .train(network.clone(), &samples, &mut NullTelemetry)
                .unwrap();
            match outcome {
                TrainingOutcome::Exhausted { epochs, misses, .. } => (epochs, misses),
                other => panic!("unexpected outcome: {other:?}"),
            }
        };
        assert_eq!(exhausted(false), (25, 1));
        assert_eq!(exhausted(true), (25, 2));
    }

    #[test]
    fn distinct_targets_converge_within_tight_tolerance() {
        let samples = [
            TrainingSample::new(one_hot(4, 0), 2.0, 10),
            TrainingSample::new(one_hot(4, 3), 8.0, 10),
        ];
        let network = Network::with_seed(&[4, 1], 3).unwrap();
        let outcome = Trainer::new(10.0)
            .learning_rate(0.05)
            .stop_condition(StopCondition::Epochs(5000))
            .train(network, &samples, &mut NullTelemetry)
            .unwrap();
        assert!(outcome.is_converged(), "{outcome:?}");

        let mut network = outcome.into_network();
        for sample in &samples {
            let predicted = predict(&mut network, sample.features(), 10.0).unwrap();
            assert!((predicted - sample.target()).abs() <= 2.0);
        }
    }

    #[test]
    fn telemetry_sees_every_epoch() {
        let samples = [TrainingSample::new(one_hot(3, 1), 6.0, 10)];
        let network = Network::with_seed(&[3, 1], 1).unwrap();
        let mut lines = Vec::new();
        let outcome = Trainer::new(10.0)
            .learning_rate(0.05)
            .stop_condition(StopCondition::Epochs(5000))
            .train(network, &samples, &mut |text: &str| lines.push(text.to_string()))
            .unwrap();
        assert_eq!(lines.len(), outcome.epochs());
        assert_eq!(lines[0], ">> EPOCH 1");
    }

    #[test]
    fn unreachable_tolerance_is_exhausted() {
        // Targets beyond the tanh range can never be met.
        let samples = [TrainingSample::new(one_hot(2, 0), 30.0, 10)];
        let network = Network::with_seed(&[2, 1], 0).unwrap();
        let outcome = Trainer::new(10.0)
            .stop_condition(StopCondition::Epochs(25))
            .train(network, &samples, &mut NullTelemetry)
            .unwrap();
        match outcome {
            TrainingOutcome::Exhausted { epochs, misses, .. } => {
                assert_eq!(epochs, 25);
                assert_eq!(misses, 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn cancelled_before_first_epoch() {
        let samples = [TrainingSample::new(one_hot(2, 0), 30.0, 10)];
        let token = CancelToken::new();
        token.cancel();
        let result = Trainer::new(10.0)
            .cancel_token(token)
            .train(Network::with_seed(&[2, 1], 0).unwrap(), &samples, &mut NullTelemetry);
        assert!(matches!(result, Err(Error::Cancelled { epochs: 0 })));
    }

    #[test]
    fn invalid_parameters() {
        let network = || Network::with_seed(&[2, 1], 0).unwrap();
        let good = [TrainingSample::new(vec![0.0, 1.0], 1.0, 10)];
        let bad = [TrainingSample::new(vec![0.0, 1.0, 1.0], 1.0, 10)];

        assert!(matches!(
            Trainer::new(10.0).train(network(), &[], &mut NullTelemetry),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            Trainer::new(0.0).train(network(), &good, &mut NullTelemetry),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            Trainer::new(10.0).train(network(), &bad, &mut NullTelemetry),
            Err(Error::ShapeMismatch { expected: 2, got: 3 })
        ));
        assert!(matches!(
            Trainer::new(10.0).train(
                Network::with_seed(&[2, 2], 0).unwrap(),
                &good,
                &mut NullTelemetry
            ),
            Err(Error::Configuration(_))
        ));
    }
}
