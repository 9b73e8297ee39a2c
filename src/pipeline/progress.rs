//! Load Progress Reporting
//!
//! A run reports through a single [`ProgressSink`]. The [`ProgressTracker`]
//! blends per-resource byte progress into one overall percentage:
//!
//! - every stage owns a share of the 0 to 100 range (its weight in
//!   [`PipelineSettings::stage_weights`](crate::config::PipelineSettings));
//! - inside the fetch stage every resource counts equally, and the resource in
//!   flight contributes `bytes_loaded / bytes_total` when its size is known;
//! - emitted percentages never decrease, and completion emits exactly `100.0`.

use serde::Serialize;

use crate::assets::descriptor::LoadManifest;
use crate::errors::VisionError;

/// Percentage reported on successful completion.
pub const COMPLETE_PERCENT: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LoadStage {
    Discovery,
    Fetch,
    Assembly,
    Effects,
}

impl LoadStage {
    pub const ALL: [LoadStage; 4] = [
        LoadStage::Discovery,
        LoadStage::Fetch,
        LoadStage::Assembly,
        LoadStage::Effects,
    ];

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Discovery => "Discovering resources",
            Self::Fetch => "Downloading",
            Self::Assembly => "Assembling scene",
            Self::Effects => "Preparing lighting",
        }
    }
}

/// A single progress report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadProgress {
    pub stage: LoadStage,
    pub stage_index: usize,
    pub total_stages: usize,
    /// Bytes received so far across the whole run.
    pub bytes_loaded: u64,
    /// Sum of the sizes known so far.
    pub bytes_total: u64,
    pub current_label: String,
    /// Overall completion in `0.0..=100.0`.
    pub percent: f32,
}

impl LoadProgress {
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.percent >= COMPLETE_PERCENT
    }
}

/// Host callback receiving progress and the final outcome of a run.
pub trait ProgressSink {
    fn on_progress(&mut self, progress: &LoadProgress);

    /// Called once per run, after the last progress report.
    fn on_finished(&mut self, _outcome: Result<&LoadManifest, &VisionError>) {}
}

impl<F: FnMut(&LoadProgress)> ProgressSink for F {
    fn on_progress(&mut self, progress: &LoadProgress) {
        self(progress);
    }
}

/// Sink that discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_progress(&mut self, _progress: &LoadProgress) {}
}

/// Aggregates stage and byte progress for one run.
pub struct ProgressTracker<'a> {
    sink: &'a mut dyn ProgressSink,
    weights: [f32; 4],
    stage: LoadStage,
    stage_fraction: f32,
    label: String,
    last_percent: f32,

    resource_count: usize,
    resources_done: usize,
    current_loaded: u64,
    /// Size reported by the transport for the resource in flight. A hint only.
    current_total: Option<u64>,
    bytes_loaded: u64,
    /// Bytes of finished resources, as actually received.
    bytes_settled: u64,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(sink: &'a mut dyn ProgressSink, weights: [f32; 4]) -> Self {
        Self {
            sink,
            weights,
            stage: LoadStage::Discovery,
            stage_fraction: 0.0,
            label: String::new(),
            last_percent: 0.0,
            resource_count: 0,
            resources_done: 0,
            current_loaded: 0,
            current_total: None,
            bytes_loaded: 0,
            bytes_settled: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn last_percent(&self) -> f32 {
        self.last_percent
    }

    #[inline]
    #[must_use]
    pub fn bytes_loaded(&self) -> u64 {
        self.bytes_loaded
    }

    pub fn enter_stage(&mut self, stage: LoadStage) {
        self.stage = stage;
        self.stage_fraction = 0.0;
        self.label = stage.label().to_string();
        self.emit();
    }

    /// Progress inside a non-fetch stage.
    pub fn set_stage_fraction(&mut self, fraction: f32, label: &str) {
        self.stage_fraction = fraction.clamp(0.0, 1.0);
        label.clone_into(&mut self.label);
        self.emit();
    }

    pub fn begin_fetch(&mut self, resource_count: usize) {
        self.stage = LoadStage::Fetch;
        self.resource_count = resource_count;
        self.resources_done = 0;
        self.label = LoadStage::Fetch.label().to_string();
        self.emit();
    }

    pub fn begin_resource(&mut self, label: &str, total: Option<u64>) {
        self.current_loaded = 0;
        self.current_total = total.filter(|t| *t > 0);
        label.clone_into(&mut self.label);
        self.emit();
    }

    pub fn advance_bytes(&mut self, n: u64) {
        self.current_loaded = self.current_loaded.saturating_add(n);
        self.bytes_loaded = self.bytes_loaded.saturating_add(n);
        log::trace!("{}: {} bytes", self.label, self.current_loaded);
        self.emit();
    }

    /// Closes the resource in flight, whether it loaded or was skipped.
    pub fn finish_resource(&mut self) {
        self.bytes_settled = self.bytes_settled.saturating_add(self.current_loaded);
        self.resources_done = (self.resources_done + 1).min(self.resource_count);
        self.current_loaded = 0;
        self.current_total = None;
        self.emit();
    }

    /// Emits the completion sentinel.
    pub fn complete(&mut self, label: &str) {
        label.clone_into(&mut self.label);
        self.stage = LoadStage::Effects;
        self.last_percent = COMPLETE_PERCENT;
        let progress = self.snapshot(COMPLETE_PERCENT);
        self.sink.on_progress(&progress);
    }

    fn fetch_fraction(&self) -> f32 {
        if self.resource_count == 0 {
            return 1.0;
        }
        let in_flight = match self.current_total {
            Some(total) => (self.current_loaded as f64 / total as f64).min(1.0) as f32,
            None => 0.0,
        };
        ((self.resources_done as f32 + in_flight) / self.resource_count as f32).min(1.0)
    }

    fn overall_percent(&self) -> f32 {
        let sum: f32 = self.weights.iter().sum();
        if sum <= 0.0 {
            return 0.0;
        }
        let index = self.stage.index();
        let before: f32 = self.weights[..index].iter().sum();
        let fraction = match self.stage {
            LoadStage::Fetch => self.fetch_fraction(),
            _ => self.stage_fraction,
        };
        ((before + self.weights[index] * fraction) / sum * COMPLETE_PERCENT).min(COMPLETE_PERCENT)
    }

    fn snapshot(&self, percent: f32) -> LoadProgress {
        LoadProgress {
            stage: self.stage,
            stage_index: self.stage.index(),
            total_stages: LoadStage::ALL.len(),
            bytes_loaded: self.bytes_loaded,
            bytes_total: self
                .bytes_settled
                .saturating_add(self.current_total.unwrap_or(0).max(self.current_loaded)),
            current_label: self.label.clone(),
            percent,
        }
    }

    fn emit(&mut self) {
        let percent = self.overall_percent().max(self.last_percent);
        self.last_percent = percent;
        let progress = self.snapshot(percent);
        self.sink.on_progress(&progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEIGHTS: [f32; 4] = [5.0, 80.0, 10.0, 5.0];

    #[test]
    fn fetch_blends_bytes_across_resources() {
        let mut seen = Vec::new();
        let mut sink = |p: &LoadProgress| seen.push(p.percent);
        let mut tracker = ProgressTracker::new(&mut sink, WEIGHTS);

        tracker.enter_stage(LoadStage::Discovery);
        tracker.begin_fetch(2);
        tracker.begin_resource("a", Some(100));
        tracker.advance_bytes(50);
        // Half of the first of two resources: 5 + 80 * 0.25
        assert!((tracker.last_percent() - 25.0).abs() < 1e-4);
        tracker.advance_bytes(50);
        tracker.finish_resource();
        assert!((tracker.last_percent() - 45.0).abs() < 1e-4);
        tracker.complete("done");
        drop(tracker);

        assert_eq!(*seen.last().unwrap(), COMPLETE_PERCENT);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn unknown_sizes_only_advance_on_completion() {
        let mut last = None;
        let mut sink = |p: &LoadProgress| last = Some(p.clone());
        let mut tracker = ProgressTracker::new(&mut sink, WEIGHTS);

        tracker.begin_fetch(1);
        tracker.begin_resource("stream", None);
        tracker.advance_bytes(10);
        let mid = tracker.last_percent();
        tracker.advance_bytes(10);
        assert!((tracker.last_percent() - mid).abs() < f32::EPSILON);
        tracker.finish_resource();
        drop(tracker);

        let last = last.unwrap();
        assert_eq!(last.bytes_total, 20);
        assert_eq!(last.bytes_loaded, 20);
        assert!((last.percent - 85.0).abs() < 1e-4);
    }

    #[test]
    fn oversized_reported_totals_do_not_overflow() {
        let mut last = None;
        let mut sink = |p: &LoadProgress| last = Some(p.clone());
        let mut tracker = ProgressTracker::new(&mut sink, WEIGHTS);

        tracker.begin_fetch(2);
        tracker.begin_resource("a", Some(40));
        tracker.advance_bytes(40);
        tracker.finish_resource();
        tracker.begin_resource("b", Some(u64::MAX));
        tracker.advance_bytes(10);
        tracker.finish_resource();
        drop(tracker);

        // Totals settle to the bytes actually received.
        let last = last.unwrap();
        assert_eq!(last.bytes_loaded, 50);
        assert_eq!(last.bytes_total, 50);
        assert!((last.percent - 85.0).abs() < 1e-4);
    }

    #[test]
    fn stage_regression_never_lowers_percent() {
        let mut seen = Vec::new();
        let mut sink = |p: &LoadProgress| seen.push(p.percent);
        let mut tracker = ProgressTracker::new(&mut sink, WEIGHTS);

        tracker.enter_stage(LoadStage::Assembly);
        tracker.enter_stage(LoadStage::Discovery);
        drop(tracker);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }
}
