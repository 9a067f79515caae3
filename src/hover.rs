// Hover animation - per-card filmstrip frame cycling
use std::time::{Duration, Instant};

/// Interval between filmstrip frames while a card is hovered.
pub const HOVER_TICK_INTERVAL: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoverState {
    #[default]
    Idle,
    Animating,
}

/// Cycles filmstrip frames while the pointer rests on a card.
///
/// The filmstrip length is passed in fresh on every tick because frames keep
/// arriving while the animation runs; the index simply wraps over whatever is
/// available at that moment. Each card owns its own animator, independent of
/// all others.
#[derive(Debug)]
pub struct HoverAnimator {
    state: HoverState,
    frame_index: usize,
    interval: Duration,
    next_tick: Option<Instant>,
}

impl HoverAnimator {
    pub fn new() -> Self {
        Self::with_interval(HOVER_TICK_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            state: HoverState::Idle,
            frame_index: 0,
            interval,
            next_tick: None,
        }
    }

    pub fn state(&self) -> HoverState {
        self.state
    }

    /// Pointer entered the card. Starts animating from frame 0 unless the
    /// filmstrip is still empty, in which case this is a no-op.
    pub fn hover_enter(&mut self, filmstrip_len: usize, now: Instant) -> bool {
        if filmstrip_len == 0 {
            self.stop();
            return false;
        }
        self.frame_index = 0;
        self.state = HoverState::Animating;
        self.next_tick = Some(now + self.interval);
        true
    }

    /// Advance the animation. Returns the frame index to display when a tick
    /// is due; a filmstrip that became empty stops the animation.
    pub fn tick(&mut self, filmstrip_len: usize, now: Instant) -> Option<usize> {
        if self.state != HoverState::Animating {
            return None;
        }
        if filmstrip_len == 0 {
            self.stop();
            return None;
        }
        let due = self.next_tick.map(|at| now >= at).unwrap_or(false);
        if !due {
            return None;
        }
        let shown = self.frame_index % filmstrip_len;
        self.frame_index = (shown + 1) % filmstrip_len;
        self.next_tick = Some(now + self.interval);
        Some(shown)
    }

    /// Pointer left the card. Stops immediately; the caller restores the
    /// static thumbnail.
    pub fn hover_leave(&mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.state = HoverState::Idle;
        self.frame_index = 0;
        self.next_tick = None;
    }
}

impl Default for HoverAnimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(300);

    #[test]
    fn empty_filmstrip_keeps_the_animator_idle() {
        let mut animator = HoverAnimator::new();
        let now = Instant::now();
        assert!(!animator.hover_enter(0, now));
        assert_eq!(animator.state(), HoverState::Idle);
        assert_eq!(animator.tick(0, now + TICK), None);
    }

    #[test]
    fn frames_cycle_in_order_and_wrap() {
        let mut animator = HoverAnimator::new();
        let start = Instant::now();
        assert!(animator.hover_enter(3, start));

        assert_eq!(animator.tick(3, start + TICK), Some(0));
        assert_eq!(animator.tick(3, start + TICK * 2), Some(1));
        assert_eq!(animator.tick(3, start + TICK * 3), Some(2));
        assert_eq!(animator.tick(3, start + TICK * 4), Some(0));
    }

    #[test]
    fn nothing_is_shown_before_the_interval_elapses() {
        let mut animator = HoverAnimator::new();
        let start = Instant::now();
        animator.hover_enter(3, start);
        assert_eq!(animator.tick(3, start + TICK / 2), None);
        assert_eq!(animator.tick(3, start + TICK), Some(0));
    }

    #[test]
    fn length_is_read_fresh_while_frames_arrive() {
        let mut animator = HoverAnimator::new();
        let start = Instant::now();
        animator.hover_enter(2, start);

        assert_eq!(animator.tick(2, start + TICK), Some(0));
        assert_eq!(animator.tick(2, start + TICK * 2), Some(1));
        // Two more frames landed while animating; the cycle picks them up.
        assert_eq!(animator.tick(4, start + TICK * 3), Some(0));
        assert_eq!(animator.tick(4, start + TICK * 4), Some(1));
        assert_eq!(animator.tick(4, start + TICK * 5), Some(2));
        assert_eq!(animator.tick(4, start + TICK * 6), Some(3));
    }

    #[test]
    fn hover_leave_stops_synchronously() {
        let mut animator = HoverAnimator::new();
        let start = Instant::now();
        animator.hover_enter(3, start);
        assert_eq!(animator.tick(3, start + TICK), Some(0));

        animator.hover_leave();
        assert_eq!(animator.state(), HoverState::Idle);
        assert_eq!(animator.tick(3, start + TICK * 2), None);
    }

    #[test]
    fn filmstrip_reset_to_empty_returns_to_idle() {
        let mut animator = HoverAnimator::new();
        let start = Instant::now();
        animator.hover_enter(3, start);
        assert_eq!(animator.tick(0, start + TICK), None);
        assert_eq!(animator.state(), HoverState::Idle);
    }
}
