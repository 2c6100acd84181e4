//! Render utility helpers: frame timing and a couple of numeric helpers.

use std::time::Instant;

/// A simple frame timer that tracks `dt`, the seconds since the last `tick()`.
///
/// Typical usage:
/// - Create once in your state: `let mut clock = FrameClock::new();`
/// - Each frame: `let dt = clock.tick();`
///
/// Note:
/// - `tick()` clamps unreasonable `dt` (e.g. when resuming from a breakpoint).
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    /// Max dt allowed from `tick()` (in seconds).
    max_dt: f32,
}

impl FrameClock {
    /// Create a new clock with a reasonable default `max_dt` clamp.
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            max_dt: 0.1, // 100ms
        }
    }

    /// Advance the clock and return `dt` in seconds.
    ///
    /// `dt` is clamped to `[0, max_dt]` to avoid destabilizing animations.
    #[inline]
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    /// [`Self::tick`] with an explicit timestamp.
    pub fn tick_at(&mut self, now: Instant) -> f32 {
        let dt = now.saturating_duration_since(self.last).as_secs_f32();
        self.last = now;
        dt.clamp(0.0, self.max_dt)
    }

    /// Timestamp of the last tick.
    #[inline]
    pub fn last(&self) -> Instant {
        self.last
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Linear interpolation.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Map a physical-pixel size to the `u32` pair wgpu wants, never zero.
#[inline]
pub fn px_size(width: f32, height: f32) -> (u32, u32) {
    (width.round().max(1.0) as u32, height.round().max(1.0) as u32)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn tick_clamps_long_gaps() {
        let mut clock = FrameClock::new();
        let start = clock.last();
        assert!((clock.tick_at(start + Duration::from_millis(16)) - 0.016).abs() < 1e-4);
        assert_eq!(clock.tick_at(start + Duration::from_secs(3)), 0.1);
    }

    #[test]
    fn tick_never_goes_negative() {
        let mut clock = FrameClock::new();
        let earlier = clock.last() - Duration::from_millis(10);
        assert_eq!(clock.tick_at(earlier), 0.0);
    }

    #[test]
    fn lerp_endpoints() {
        assert_eq!(lerp(2.0, 6.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 6.0, 1.0), 6.0);
        assert_eq!(lerp(2.0, 6.0, 0.25), 3.0);
    }

    #[test]
    fn px_size_is_never_zero() {
        assert_eq!(px_size(0.0, 0.2), (1, 1));
        assert_eq!(px_size(179.6, 160.0), (180, 160));
    }
}
