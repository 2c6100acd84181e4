//! Horizontal package shelf: scroll position and scroll affordances.
//!
//! The shelf lays packages out in fixed-width slots. It tracks the scroll offset,
//! the visible width and whether there is still content to the left/right.
//! Programmatic scrolls are smooth; the affordance flags are rechecked after a short
//! delay so the check sees the settled layout.

use std::time::{Duration, Instant};

use crate::render::util::lerp;

/// Width of one package slot, pixels.
pub const SLOT_WIDTH_PX: f32 = 180.0;
/// Distance of one arrow scroll, pixels.
pub const SCROLL_STEP_PX: f32 = 180.0;
/// Slack at either end before an arrow is shown, pixels.
pub const EDGE_TOLERANCE_PX: f32 = 4.0;
/// Recheck delay after an arrow scroll.
pub const ARROW_RECHECK_DELAY: Duration = Duration::from_millis(350);
/// Recheck delay after adding a package / first layout.
pub const LAYOUT_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Smooth-scroll rate: fraction of the remaining distance covered per second,
/// as `1 - exp(-rate * dt)`.
const SMOOTH_SCROLL_RATE: f32 = 14.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScrollDirection {
    Left,
    Right,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Deferred {
    /// Just recheck the arrows.
    Recheck,
    /// Jump the scroll target to the end, then recheck.
    ScrollToEnd,
}

#[derive(Debug, Clone)]
pub struct Shelf {
    scroll_left: f32,
    scroll_target: f32,
    client_width: f32,
    item_count: usize,

    can_scroll_left: bool,
    can_scroll_right: bool,

    deferred: Vec<(Instant, Deferred)>,
}

impl Shelf {
    /// A shelf `client_width` pixels wide, with an initial settle-recheck scheduled.
    pub fn new(client_width: f32, now: Instant) -> Self {
        Self {
            scroll_left: 0.0,
            scroll_target: 0.0,
            client_width: client_width.max(0.0),
            item_count: 0,
            can_scroll_left: false,
            can_scroll_right: false,
            deferred: vec![(now + LAYOUT_SETTLE_DELAY, Deferred::Recheck)],
        }
    }

    #[inline]
    pub fn can_scroll_left(&self) -> bool {
        self.can_scroll_left
    }

    #[inline]
    pub fn can_scroll_right(&self) -> bool {
        self.can_scroll_right
    }

    #[inline]
    pub fn scroll_left(&self) -> f32 {
        self.scroll_left
    }

    #[inline]
    pub fn client_width(&self) -> f32 {
        self.client_width
    }

    #[inline]
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Total content width (never less than the visible width).
    #[inline]
    pub fn scroll_width(&self) -> f32 {
        (self.item_count as f32 * SLOT_WIDTH_PX).max(self.client_width)
    }

    #[inline]
    pub fn max_scroll(&self) -> f32 {
        (self.scroll_width() - self.client_width).max(0.0)
    }

    /// Recompute the arrow flags from the current offset.
    pub fn check_arrow_visibility(&mut self) {
        self.can_scroll_left = self.scroll_left > EDGE_TOLERANCE_PX;
        self.can_scroll_right =
            self.scroll_left + self.client_width < self.scroll_width() - EDGE_TOLERANCE_PX;
    }

    /// Scroll event: the offset changed (user wheel/drag, or smooth-scroll progress).
    pub fn on_scroll(&mut self, scroll_left: f32) {
        self.scroll_left = scroll_left.clamp(0.0, self.max_scroll());
        self.scroll_target = self.scroll_left;
        self.check_arrow_visibility();
    }

    /// Scroll by a raw pixel delta (wheel input).
    pub fn scroll_by_px(&mut self, dx: f32) {
        self.on_scroll(self.scroll_left + dx);
    }

    pub fn on_resize(&mut self, client_width: f32) {
        self.client_width = client_width.max(0.0);
        self.scroll_left = self.scroll_left.clamp(0.0, self.max_scroll());
        self.scroll_target = self.scroll_target.clamp(0.0, self.max_scroll());
        self.check_arrow_visibility();
    }

    /// The package list changed length.
    pub fn set_item_count(&mut self, count: usize) {
        self.item_count = count;
        self.scroll_left = self.scroll_left.clamp(0.0, self.max_scroll());
        self.scroll_target = self.scroll_target.clamp(0.0, self.max_scroll());
    }

    /// Arrow action: smooth-scroll one step, recheck once it has settled.
    pub fn scroll(&mut self, direction: ScrollDirection, now: Instant) {
        let step = match direction {
            ScrollDirection::Left => -SCROLL_STEP_PX,
            ScrollDirection::Right => SCROLL_STEP_PX,
        };
        self.scroll_target = (self.scroll_target + step).clamp(0.0, self.max_scroll());
        self.deferred.push((now + ARROW_RECHECK_DELAY, Deferred::Recheck));
    }

    /// After a package was appended: once layout settles, scroll to the end.
    pub fn scroll_to_end_after_layout(&mut self, now: Instant) {
        self.deferred
            .push((now + LAYOUT_SETTLE_DELAY, Deferred::ScrollToEnd));
    }

    /// Advance smooth scrolling by `dt` seconds and run due deferred checks.
    pub fn tick(&mut self, now: Instant, dt: f32) {
        if (self.scroll_target - self.scroll_left).abs() > 0.5 {
            let t = 1.0 - (-SMOOTH_SCROLL_RATE * dt.max(0.0)).exp();
            let next = lerp(self.scroll_left, self.scroll_target, t);
            let target = self.scroll_target;
            self.on_scroll(next);
            self.scroll_target = target;
        } else if self.scroll_left != self.scroll_target {
            let target = self.scroll_target;
            self.on_scroll(target);
        }

        let mut due = Vec::new();
        self.deferred.retain(|&(at, what)| {
            if at <= now {
                due.push(what);
                false
            } else {
                true
            }
        });
        for what in due {
            if what == Deferred::ScrollToEnd {
                self.scroll_target = self.max_scroll();
            }
            self.check_arrow_visibility();
        }
    }

    /// Horizontal span `(x, width)` of slot `index` in viewport pixels.
    #[inline]
    pub fn slot_span(&self, index: usize) -> (f32, f32) {
        (index as f32 * SLOT_WIDTH_PX - self.scroll_left, SLOT_WIDTH_PX)
    }

    /// True if slot `index` exists and lies entirely inside the visible width.
    pub fn is_fully_visible(&self, index: usize) -> bool {
        let (x, w) = self.slot_span(index);
        index < self.item_count && x >= -0.5 && x + w <= self.client_width + 0.5
    }

    /// Slots fully inside the visible width. Only these are drawn.
    pub fn fully_visible_slots(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.item_count).filter(move |&i| self.is_fully_visible(i))
    }

    /// Drawn slot under viewport x coordinate, if any. Partly scrolled-out slots
    /// are not drawn and do not take pointer input.
    pub fn slot_at(&self, x: f32) -> Option<usize> {
        if x < 0.0 || x > self.client_width {
            return None;
        }
        let i = ((x + self.scroll_left) / SLOT_WIDTH_PX).floor();
        if i < 0.0 {
            return None;
        }
        let i = i as usize;
        self.is_fully_visible(i).then_some(i)
    }

    /// Whether an arrow scroll towards `direction` has anything to reveal.
    #[inline]
    pub fn can_scroll(&self, direction: ScrollDirection) -> bool {
        match direction {
            ScrollDirection::Left => self.can_scroll_left,
            ScrollDirection::Right => self.can_scroll_right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle(shelf: &mut Shelf, start: Instant) -> Instant {
        let mut now = start;
        for _ in 0..120 {
            now += Duration::from_millis(16);
            shelf.tick(now, 0.016);
        }
        now
    }

    #[test]
    fn short_list_shows_no_arrows() {
        let now = Instant::now();
        let mut shelf = Shelf::new(800.0, now);
        shelf.set_item_count(3);
        settle(&mut shelf, now);
        assert!(!shelf.can_scroll_left());
        assert!(!shelf.can_scroll_right());
    }

    #[test]
    fn overflowing_list_shows_right_arrow_after_initial_layout() {
        let now = Instant::now();
        let mut shelf = Shelf::new(500.0, now);
        shelf.set_item_count(10);
        // Not yet rechecked.
        assert!(!shelf.can_scroll_right());
        shelf.tick(now + LAYOUT_SETTLE_DELAY, 0.0);
        assert!(shelf.can_scroll_right());
        assert!(!shelf.can_scroll_left());
    }

    #[test]
    fn scrolling_right_then_left_updates_affordances() {
        let now = Instant::now();
        let mut shelf = Shelf::new(500.0, now);
        shelf.set_item_count(10);

        shelf.scroll(ScrollDirection::Right, now);
        let now = settle(&mut shelf, now);
        assert!((shelf.scroll_left() - SCROLL_STEP_PX).abs() < 1e-3);
        assert!(shelf.can_scroll_left());
        assert!(shelf.can_scroll_right());

        shelf.scroll(ScrollDirection::Left, now);
        settle(&mut shelf, now);
        assert_eq!(shelf.scroll_left(), 0.0);
        assert!(!shelf.can_scroll_left());
    }

    #[test]
    fn scroll_to_end_hides_right_arrow() {
        let now = Instant::now();
        let mut shelf = Shelf::new(500.0, now);
        shelf.set_item_count(10);
        shelf.scroll_to_end_after_layout(now);
        settle(&mut shelf, now);
        assert!((shelf.scroll_left() - shelf.max_scroll()).abs() < 1e-3);
        assert!(shelf.can_scroll_left());
        assert!(!shelf.can_scroll_right());
    }

    #[test]
    fn edge_tolerance_absorbs_small_offsets() {
        let now = Instant::now();
        let mut shelf = Shelf::new(500.0, now);
        shelf.set_item_count(10);
        shelf.on_scroll(3.0);
        assert!(!shelf.can_scroll_left());
        shelf.on_scroll(shelf.max_scroll() - 3.0);
        assert!(!shelf.can_scroll_right());
    }

    #[test]
    fn resize_reclamps_and_rechecks() {
        let now = Instant::now();
        let mut shelf = Shelf::new(500.0, now);
        shelf.set_item_count(4);
        shelf.on_scroll(220.0);
        shelf.on_resize(2000.0);
        assert_eq!(shelf.scroll_left(), 0.0);
        assert!(!shelf.can_scroll_left());
        assert!(!shelf.can_scroll_right());
    }

    #[test]
    fn slot_hit_testing_accounts_for_scroll() {
        let now = Instant::now();
        let mut shelf = Shelf::new(500.0, now);
        shelf.set_item_count(5);
        assert_eq!(shelf.slot_at(10.0), Some(0));
        assert_eq!(shelf.slot_at(190.0), Some(1));
        shelf.on_scroll(180.0);
        assert_eq!(shelf.slot_at(10.0), Some(1));
        assert_eq!(shelf.slot_at(-1.0), None);
        assert_eq!(shelf.fully_visible_slots().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn partly_visible_slots_take_no_pointer_input() {
        let now = Instant::now();
        let mut shelf = Shelf::new(500.0, now);
        shelf.set_item_count(5);
        // Slot 2 spans 360..540 and is cut off at 500.
        assert!(!shelf.is_fully_visible(2));
        assert_eq!(shelf.slot_at(400.0), None);

        shelf.on_scroll(90.0);
        // Slot 0 now spans -90..90.
        assert_eq!(shelf.slot_at(45.0), None);
        assert_eq!(shelf.slot_at(100.0), Some(1));
        for x in [0.0, 45.0, 100.0, 300.0, 450.0, 499.0] {
            if let Some(i) = shelf.slot_at(x) {
                assert!(shelf.fully_visible_slots().any(|v| v == i));
            }
        }
    }

    #[test]
    fn can_scroll_follows_affordance_flags() {
        let now = Instant::now();
        let mut shelf = Shelf::new(500.0, now);
        shelf.set_item_count(10);
        shelf.on_scroll(200.0);
        assert!(shelf.can_scroll(ScrollDirection::Left));
        assert!(shelf.can_scroll(ScrollDirection::Right));
        shelf.on_scroll(0.0);
        assert!(!shelf.can_scroll(ScrollDirection::Left));
    }
}
