//! Line-oriented progress reporting for hosts that want to show it.

use log::info;

/// Receives human readable progress lines, such as `>> EPOCH 12`.
///
/// Purely observational: nothing a sink does can change how training runs.
pub trait Telemetry {
    fn line(&mut self, text: &str);
}

/// Discards every line.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullTelemetry;

impl Telemetry for NullTelemetry {
    fn line(&mut self, _: &str) {}
}

/// Forwards every line to the `log` facade at info level.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn line(&mut self, text: &str) {
        info!(target: "telemetry", "{text}");
    }
}

impl<F: FnMut(&str)> Telemetry for F {
    fn line(&mut self, text: &str) {
        self(text)
    }
}
