//! # Frame Timing
//!
//! [`PerformanceMonitor`] keeps a rolling window of frame times and the draw
//! statistics of the last frame. [`RedrawTimer`] answers whether the next
//! periodic redraw (about 60 Hz by default) is due.
//!
//! ## Usage
//!
//! ```rust
//! use plyview::performance::PerformanceMonitor;
//!
//! let mut monitor = PerformanceMonitor::new();
//!
//! monitor.begin_frame();
//! // ... render frame ...
//! monitor.end_frame();
//!
//! let fps = monitor.get_metrics().fps;
//! # let _ = fps;
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceMetrics {
    /// Frames per second over the sample window
    pub fps: f32,
    /// Average frame time in milliseconds
    pub frame_time_ms: f32,
    pub min_frame_time_ms: f32,
    pub max_frame_time_ms: f32,
    /// Draw calls issued in the last frame
    pub draw_calls: u32,
    /// Vertices submitted in the last frame
    pub vertex_count: u32,
    /// Frames recorded since creation or the last reset
    pub total_frames: u64,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            fps: 0.0,
            frame_time_ms: 0.0,
            min_frame_time_ms: f32::MAX,
            max_frame_time_ms: 0.0,
            draw_calls: 0,
            vertex_count: 0,
            total_frames: 0,
        }
    }
}

pub struct PerformanceMonitor {
    /// Ring buffer of recent frame times
    frame_times: VecDeque<Duration>,
    max_samples: usize,
    frame_start: Option<Instant>,
    current_metrics: PerformanceMetrics,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        // ~2 seconds at 60fps
        Self::with_capacity(120)
    }

    pub fn with_capacity(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            frame_times: VecDeque::with_capacity(max_samples),
            max_samples,
            frame_start: None,
            current_metrics: PerformanceMetrics::default(),
        }
    }

    pub fn begin_frame(&mut self) {
        self.frame_start = Some(Instant::now());
    }

    /// Closes the frame opened by `begin_frame`; ignored without one
    pub fn end_frame(&mut self) {
        if let Some(start) = self.frame_start.take() {
            self.record_frame(start.elapsed());
        }
    }

    /// Adds one frame time sample and refreshes the metrics
    pub fn record_frame(&mut self, frame_time: Duration) {
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(frame_time);
        self.current_metrics.total_frames += 1;
        self.update_metrics();
    }

    fn update_metrics(&mut self) {
        if self.frame_times.is_empty() {
            return;
        }

        let total_time: Duration = self.frame_times.iter().sum();
        let avg_frame_time = total_time / self.frame_times.len() as u32;
        let avg_frame_time_ms = avg_frame_time.as_secs_f32() * 1000.0;

        self.current_metrics.frame_time_ms = avg_frame_time_ms;
        self.current_metrics.fps = if avg_frame_time_ms > 0.0 {
            1000.0 / avg_frame_time_ms
        } else {
            0.0
        };

        if let (Some(min_time), Some(max_time)) =
            (self.frame_times.iter().min(), self.frame_times.iter().max())
        {
            self.current_metrics.min_frame_time_ms = min_time.as_secs_f32() * 1000.0;
            self.current_metrics.max_frame_time_ms = max_time.as_secs_f32() * 1000.0;
        }
    }

    pub fn update_render_stats(&mut self, draw_calls: u32, vertex_count: u32) {
        self.current_metrics.draw_calls = draw_calls;
        self.current_metrics.vertex_count = vertex_count;
    }

    pub fn get_metrics(&self) -> &PerformanceMetrics {
        &self.current_metrics
    }

    /// Frame times in milliseconds, oldest first
    pub fn get_frame_time_history(&self) -> Vec<f32> {
        self.frame_times
            .iter()
            .map(|duration| duration.as_secs_f32() * 1000.0)
            .collect()
    }

    pub fn reset(&mut self) {
        self.frame_times.clear();
        self.current_metrics = PerformanceMetrics::default();
        self.frame_start = None;
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-interval redraw schedule.
///
/// Only reports whether a redraw is due; the caller marks it done with
/// [`RedrawTimer::mark_redrawn`].
#[derive(Debug, Clone, Copy)]
pub struct RedrawTimer {
    interval: Duration,
    last_redraw: Option<Instant>,
}

impl RedrawTimer {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_micros(16_667);

    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_redraw: None,
        }
    }

    /// Falls back to [`Self::DEFAULT_INTERVAL`] for rates with no
    /// representable, non-zero interval
    pub fn from_rate(hz: f32) -> Self {
        let interval = Some(hz)
            .filter(|&hz| hz > 0.0)
            .and_then(|hz| Duration::try_from_secs_f32(1.0 / hz).ok())
            .filter(|interval| !interval.is_zero())
            .unwrap_or(Self::DEFAULT_INTERVAL);
        Self::new(interval)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True before the first redraw and once `interval` has passed since the last
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_redraw {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    pub fn mark_redrawn(&mut self, now: Instant) {
        self.last_redraw = Some(now);
    }

    /// Time left until the next redraw is due
    pub fn time_until_due(&self, now: Instant) -> Duration {
        match self.last_redraw {
            Some(last) => self
                .interval
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }
}

impl Default for RedrawTimer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }
}
