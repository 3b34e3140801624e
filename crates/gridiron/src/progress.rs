//! Progress reporting.

use crossbeam_channel::Sender;
use serde::Serialize;

/// One progress event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub current_step: usize,
    pub total_steps: usize,
    /// `current_step / total_steps * 100`, or 0 with no steps.
    pub progress_percent: f64,
    pub message: String,
}

/// Receiver of progress events.
pub trait ProgressSink {
    fn report(&mut self, progress: Progress);
}

impl<F> ProgressSink for F
where
    F: FnMut(Progress),
{
    fn report(&mut self, progress: Progress) {
        self(progress)
    }
}

impl ProgressSink for Sender<Progress> {
    fn report(&mut self, progress: Progress) {
        // A dropped receiver means nobody is listening.
        let _ = self.send(progress);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _progress: Progress) {}
}

/// Step counter that stamps messages with the current position.
#[derive(Debug, Clone)]
pub(crate) struct ProgressTracker {
    current_step: usize,
    total_steps: usize,
}

impl ProgressTracker {
    pub(crate) fn new(total_steps: usize) -> Self {
        Self {
            current_step: 0,
            total_steps,
        }
    }

    pub(crate) fn set_total(&mut self, total_steps: usize) {
        self.total_steps = total_steps;
    }

    pub(crate) fn step(&mut self) {
        self.current_step += 1;
    }

    pub(crate) fn reset(&mut self) {
        self.current_step = 0;
    }

    pub(crate) fn format(&self, message: impl Into<String>) -> Progress {
        let progress_percent = if self.total_steps == 0 {
            0.0
        } else {
            self.current_step as f64 / self.total_steps as f64 * 100.0
        };
        Progress {
            current_step: self.current_step,
            total_steps: self.total_steps,
            progress_percent,
            message: message.into(),
        }
    }

    pub(crate) fn emit(&self, sink: &mut dyn ProgressSink, message: impl Into<String>) {
        sink.report(self.format(message));
    }
}
