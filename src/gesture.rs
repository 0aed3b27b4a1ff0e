//! Slide-to-call drag control: a continuous drag becomes one discrete start.
//!
//! One-dimensional drag bounded to `[0, max_distance]`. Crossing 90% of the
//! track completes the control, which is terminal until `reset`. Completion
//! arms a short settle deadline so the visual snap finishes before the call
//! actually starts; `poll_fire` reports the deadline passing exactly once.

use std::time::{Duration, Instant};

/// Fraction of the track that must be covered to trigger a call.
pub const COMPLETION_RATIO: f32 = 0.9;

/// What a drag input did to the control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    /// Input ignored (not tracking, already complete, or disabled).
    Ignored,
    /// Still tracking below the threshold.
    Tracking,
    /// Released below the threshold; position snapped back to zero.
    SnappedBack,
    /// Threshold crossed; the control is now terminal.
    Completed,
}

/// Drag state for the slide-to-call control.
pub struct SlideToCall {
    max_distance: f32,
    settle: Duration,
    position: f32,
    dragging: bool,
    complete: bool,
    disabled: bool,
    fire_at: Option<Instant>,
    fired: bool,
}

impl SlideToCall {
    pub fn new(max_distance: f32, settle: Duration) -> Self {
        Self {
            max_distance: max_distance.max(1.0),
            settle,
            position: 0.0,
            dragging: false,
            complete: false,
            disabled: false,
            fire_at: None,
            fired: false,
        }
    }

    /// Start tracking a drag. Returns `false` when the control refuses input
    /// (already complete or disabled).
    pub fn begin(&mut self) -> bool {
        if self.complete || self.disabled {
            return false;
        }
        self.dragging = true;
        true
    }

    /// Move the drag to `offset` from the track origin, clamped to the track.
    pub fn update(&mut self, offset: f32, now: Instant) -> DragOutcome {
        if !self.dragging || self.complete || self.disabled {
            return DragOutcome::Ignored;
        }
        self.position = offset.clamp(0.0, self.max_distance);
        if self.position >= self.max_distance * COMPLETION_RATIO {
            self.complete = true;
            self.dragging = false;
            self.position = self.max_distance;
            self.fire_at = Some(now + self.settle);
            DragOutcome::Completed
        } else {
            DragOutcome::Tracking
        }
    }

    /// End the drag. Below the threshold the position snaps back to zero; the
    /// visual layer may animate that, the model does not.
    pub fn release(&mut self) -> DragOutcome {
        if !self.dragging || self.complete {
            return DragOutcome::Ignored;
        }
        self.dragging = false;
        self.position = 0.0;
        DragOutcome::SnappedBack
    }

    /// True exactly once, the settle delay after completion. The start-call
    /// side effect hangs off this, not off `Completed` itself.
    pub fn poll_fire(&mut self, now: Instant) -> bool {
        if self.fired || !self.complete {
            return false;
        }
        match self.fire_at {
            Some(deadline) if now >= deadline => {
                self.fired = true;
                true
            }
            _ => false,
        }
    }

    /// External reset for a new session; the only way out of `complete`.
    pub fn reset(&mut self) {
        self.position = 0.0;
        self.dragging = false;
        self.complete = false;
        self.fire_at = None;
        self.fired = false;
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    /// Covered fraction of the track, for rendering.
    pub fn ratio(&self) -> f32 {
        self.position / self.max_distance
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control() -> SlideToCall {
        SlideToCall::new(100.0, Duration::from_millis(50))
    }

    #[test]
    fn completes_once_at_ninety_percent() {
        let now = Instant::now();
        let mut slide = control();
        assert!(slide.begin());
        assert_eq!(slide.update(50.0, now), DragOutcome::Tracking);
        assert_eq!(slide.update(89.9, now), DragOutcome::Tracking);
        assert_eq!(slide.update(90.0, now), DragOutcome::Completed);
        assert!(slide.is_complete());
        assert_eq!(slide.position(), 100.0, "completion pins the knob to the end");
    }

    #[test]
    fn release_below_threshold_snaps_back_to_zero() {
        let now = Instant::now();
        let mut slide = control();
        slide.begin();
        slide.update(70.0, now);
        assert_eq!(slide.release(), DragOutcome::SnappedBack);
        assert_eq!(slide.position(), 0.0);
        assert!(!slide.is_complete());
        // The control is reusable without reset after a snap-back.
        assert!(slide.begin());
    }

    #[test]
    fn terminal_after_completion_until_reset() {
        let now = Instant::now();
        let mut slide = control();
        slide.begin();
        slide.update(95.0, now);
        assert!(!slide.begin());
        assert_eq!(slide.update(10.0, now), DragOutcome::Ignored);
        assert_eq!(slide.release(), DragOutcome::Ignored);

        slide.reset();
        assert!(!slide.is_complete());
        assert!(slide.begin());
    }

    #[test]
    fn fires_exactly_once_after_the_settle_delay() {
        let now = Instant::now();
        let mut slide = control();
        slide.begin();
        slide.update(100.0, now);
        assert!(!slide.poll_fire(now), "must not fire before the settle delay");
        let later = now + Duration::from_millis(50);
        assert!(slide.poll_fire(later));
        assert!(!slide.poll_fire(later + Duration::from_secs(1)));
    }

    #[test]
    fn never_fires_without_completion() {
        let now = Instant::now();
        let mut slide = control();
        slide.begin();
        slide.update(80.0, now);
        slide.release();
        assert!(!slide.poll_fire(now + Duration::from_secs(5)));
    }

    #[test]
    fn offsets_clamp_to_the_track() {
        let now = Instant::now();
        let mut slide = control();
        slide.begin();
        slide.update(-25.0, now);
        assert_eq!(slide.position(), 0.0);
        // Overshoot clamps to the end, which is past the threshold.
        assert_eq!(slide.update(500.0, now), DragOutcome::Completed);
    }

    #[test]
    fn disabled_control_ignores_all_input() {
        let now = Instant::now();
        let mut slide = control();
        slide.set_disabled(true);
        assert!(!slide.begin());
        assert_eq!(slide.update(100.0, now), DragOutcome::Ignored);
        assert!(!slide.poll_fire(now + Duration::from_secs(1)));
    }

    #[test]
    fn moves_without_begin_are_ignored() {
        let now = Instant::now();
        let mut slide = control();
        assert_eq!(slide.update(100.0, now), DragOutcome::Ignored);
        assert_eq!(slide.position(), 0.0);
    }
}
