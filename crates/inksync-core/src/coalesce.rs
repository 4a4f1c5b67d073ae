//! Pointer-move rate limiting.
//!
//! Drag gestures produce far more move events than are worth rendering or
//! transmitting. The coalescer releases at most one point per interval:
//! the first move of a window passes straight through, later moves in the
//! same window replace a single pending point which is released on the
//! next tick or when the gesture ends.

use std::time::{Duration, Instant};

use crate::element::Point;

/// Default tick, roughly one frame at 60Hz
pub const DEFAULT_MOVE_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone)]
pub struct MoveCoalescer {
    interval: Duration,
    last_release: Option<Instant>,
    pending: Option<Point>,
}

impl MoveCoalescer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_release: None,
            pending: None,
        }
    }

    /// Offer a move. Returns the point to apply now, if any.
    pub fn offer(&mut self, point: Point, now: Instant) -> Option<Point> {
        match self.last_release {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                self.pending = Some(point);
                None
            }
            _ => {
                self.last_release = Some(now);
                self.pending = None;
                Some(point)
            }
        }
    }

    /// Release the pending point once its window has passed
    pub fn tick(&mut self, now: Instant) -> Option<Point> {
        let last = self.last_release?;
        if self.pending.is_some() && now.saturating_duration_since(last) >= self.interval {
            self.last_release = Some(now);
            return self.pending.take();
        }
        None
    }

    /// Release whatever is pending regardless of timing (gesture end)
    pub fn flush(&mut self) -> Option<Point> {
        self.pending.take()
    }

    /// Forget timing and any pending point (gesture start)
    pub fn reset(&mut self) {
        self.last_release = None;
        self.pending = None;
    }
}

impl Default for MoveCoalescer {
    fn default() -> Self {
        Self::new(DEFAULT_MOVE_INTERVAL)
    }
}
