use std::ops::Range;
use std::time::Duration;

use tokio::time::Instant;

/// The contiguous slice of rows to realize for the current scroll position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VirtualWindow {
    pub start: usize,
    pub end: usize,
    pub offset_top: f64,
    pub total_height: f64,
}

impl VirtualWindow {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn slice<'a, T>(&self, rows: &'a [T]) -> &'a [T] {
        let end = self.end.min(rows.len());
        &rows[self.start.min(end)..end]
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportMetrics {
    pub row_height: f64,
    pub overscan: usize,
    pub container_height: f64,
    pub scroll_top: f64,
}

/// Uniform-height windowing. A non-positive row height yields an empty window.
pub fn compute_window(row_count: usize, metrics: ViewportMetrics) -> VirtualWindow {
    let ViewportMetrics {
        row_height,
        overscan,
        container_height,
        scroll_top,
    } = metrics;

    if row_height <= 0.0 || !row_height.is_finite() {
        return VirtualWindow {
            start: 0,
            end: 0,
            offset_top: 0.0,
            total_height: 0.0,
        };
    }

    let scroll_top = scroll_top.max(0.0);
    let first_visible = (scroll_top / row_height).floor() as usize;
    // A partially scrolled first row pushes one more row into view.
    let partial = scroll_top - first_visible as f64 * row_height;
    let visible_count = ((partial + container_height.max(0.0)) / row_height).ceil() as usize;
    let start = first_visible.saturating_sub(overscan).min(row_count);
    let span = visible_count.saturating_add(overscan.saturating_mul(2));
    let end = start.saturating_add(span).min(row_count);

    VirtualWindow {
        start,
        end,
        offset_top: start as f64 * row_height,
        total_height: row_count as f64 * row_height,
    }
}

/// Caps how often scroll offsets reach the pipeline. Offsets arriving inside
/// the interval are held; the latest one is released by the next accepted
/// offer or by [`ScrollSampler::flush`].
#[derive(Clone, Debug)]
pub struct ScrollSampler {
    interval: Duration,
    last_emit: Option<Instant>,
    pending: Option<f64>,
}

impl ScrollSampler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
            pending: None,
        }
    }

    pub fn offer(&mut self, scroll_top: f64) -> Option<f64> {
        self.offer_at(scroll_top, Instant::now())
    }

    pub fn offer_at(&mut self, scroll_top: f64, now: Instant) -> Option<f64> {
        let due = self
            .last_emit
            .map_or(true, |last| now.duration_since(last) >= self.interval);
        if due {
            self.last_emit = Some(now);
            self.pending = None;
            Some(scroll_top)
        } else {
            self.pending = Some(scroll_top);
            None
        }
    }

    pub fn flush(&mut self) -> Option<f64> {
        let pending = self.pending.take();
        if pending.is_some() {
            self.last_emit = Some(Instant::now());
        }
        pending
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}
