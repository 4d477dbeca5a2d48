//! Debounced push-button input.
//!
//! Buttons are wired to ground with a pull-up, so the pin reads
//! [`Level::Low`] while pressed. A [`Debouncer`] turns the raw level sampled by
//! the main loop into at most one press per physical actuation.
//!
//! # State machine
//!
//! | Phase | Behaviour | Leaves when |
//! |-------|-----------|-------------|
//! | `Tracking` | Raw changes restart the window timer. A level held for the window and different from the stable level is committed. | Committed level is `Low` (press reported) |
//! | `AwaitRelease` | No presses while held, so holding never repeats. Raw changes restart the window timer. | Raw level held `High` for the window (release committed) |
//! | `Settling` | Input ignored for the settle delay, swallowing release chatter | Settle delay elapsed |
//!
//! Both edges go through the same window, so `stable_level` only ever changes
//! after the raw level has held for it.
//!
//! Waiting for the release is a phase rather than a busy-wait, so the node's
//! loop keeps servicing other inputs while a button is held.
//!
//! # Example
//!
//! ```rust
//! use room_nodes::debounce::{Debouncer, Level};
//!
//! let mut button = Debouncer::default();
//!
//! // Contact chatter while pressing
//! assert!(!button.poll(Level::Low, 0));
//! assert!(!button.poll(Level::High, 2));
//! assert!(!button.poll(Level::Low, 4));
//!
//! // Held long enough: exactly one press
//! assert!(button.poll(Level::Low, 34));
//! assert!(!button.poll(Level::Low, 500));
//! ```

/// Default debounce window in milliseconds.
pub const DEBOUNCE_WINDOW_MS: u32 = 30;

/// Default settle delay after release in milliseconds.
pub const RELEASE_SETTLE_MS: u32 = 10;

/// Logic level of a digital input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Level {
    /// Pulled up; button released.
    #[default]
    High,
    /// Pulled to ground; button pressed.
    Low,
}

impl Level {
    /// Converts an `is_high()` reading.
    #[inline]
    pub const fn from_high(is_high: bool) -> Self {
        if is_high {
            Level::High
        } else {
            Level::Low
        }
    }

    /// True for the pressed (active-low) level.
    #[inline]
    pub const fn is_active(self) -> bool {
        matches!(self, Level::Low)
    }
}

/// Debounce timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebounceConfig {
    /// Time a raw level must hold before it is accepted.
    pub window_ms: u32,
    /// Quiet time after release before tracking resumes.
    pub settle_ms: u32,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            window_ms: DEBOUNCE_WINDOW_MS,
            settle_ms: RELEASE_SETTLE_MS,
        }
    }
}

impl DebounceConfig {
    /// Set the debounce window
    pub fn with_window_ms(mut self, ms: u32) -> Self {
        self.window_ms = ms;
        self
    }

    /// Set the release settle delay
    pub fn with_settle_ms(mut self, ms: u32) -> Self {
        self.settle_ms = ms;
        self
    }
}

/// Where the debouncer is in a press cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Watching the raw level for a stable change.
    Tracking,
    /// Press reported, waiting for the button to be let go.
    AwaitRelease,
    /// Released, ignoring chatter until the settle delay passes.
    Settling {
        /// Time the release was first seen.
        since_ms: u64,
    },
}

/// Per-pin debounce state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonState {
    /// Last accepted level.
    pub stable_level: Level,
    /// Last observed level.
    pub raw_level: Level,
    /// When `raw_level` last changed.
    pub last_change_ms: u64,
    /// Current phase.
    pub phase: Phase,
}

impl Default for ButtonState {
    fn default() -> Self {
        Self {
            stable_level: Level::High,
            raw_level: Level::High,
            last_change_ms: 0,
            phase: Phase::Tracking,
        }
    }
}

/// Falling-edge detector for one active-low button.
#[derive(Clone, Debug, Default)]
pub struct Debouncer {
    state: ButtonState,
    config: DebounceConfig,
}

impl Debouncer {
    /// Creates a debouncer with custom timing.
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            state: ButtonState::default(),
            config,
        }
    }

    /// Feeds one sample. Returns `true` exactly once per press.
    pub fn poll(&mut self, raw: Level, now_ms: u64) -> bool {
        let state = &mut self.state;
        match state.phase {
            Phase::Tracking => {
                if raw != state.raw_level {
                    state.raw_level = raw;
                    state.last_change_ms = now_ms;
                }

                let held_ms = now_ms.saturating_sub(state.last_change_ms);
                if held_ms >= u64::from(self.config.window_ms) && raw != state.stable_level {
                    state.stable_level = raw;
                    if raw.is_active() {
                        state.phase = Phase::AwaitRelease;
                        return true;
                    }
                }
                false
            }

            Phase::AwaitRelease => {
                if raw != state.raw_level {
                    state.raw_level = raw;
                    state.last_change_ms = now_ms;
                }

                let held_ms = now_ms.saturating_sub(state.last_change_ms);
                if !raw.is_active() && held_ms >= u64::from(self.config.window_ms) {
                    state.stable_level = Level::High;
                    state.phase = Phase::Settling { since_ms: now_ms };
                }
                false
            }

            Phase::Settling { since_ms } => {
                if now_ms.saturating_sub(since_ms) >= u64::from(self.config.settle_ms) {
                    // Any low level from here on must hold a full window
                    state.raw_level = raw;
                    state.last_change_ms = now_ms;
                    state.phase = Phase::Tracking;
                }
                false
            }
        }
    }

    /// Current debounce state.
    pub fn state(&self) -> &ButtonState {
        &self.state
    }

    /// True while a reported press has not been committed as released.
    pub fn is_held(&self) -> bool {
        matches!(self.state.phase, Phase::AwaitRelease)
    }

    /// Timing in use.
    pub fn config(&self) -> DebounceConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feeds `(time, level)` samples and counts presses.
    fn run(debouncer: &mut Debouncer, samples: &[(u64, Level)]) -> usize {
        samples
            .iter()
            .filter(|(t, level)| debouncer.poll(*level, *t))
            .count()
    }

    /// Samples a level every millisecond over `[from, to)`.
    fn hold(from: u64, to: u64, level: Level) -> impl Iterator<Item = (u64, Level)> {
        (from..to).map(move |t| (t, level))
    }

    #[test]
    fn level_from_high() {
        assert_eq!(Level::from_high(true), Level::High);
        assert_eq!(Level::from_high(false), Level::Low);
        assert!(Level::Low.is_active());
        assert!(!Level::High.is_active());
    }

    #[test]
    fn idle_high_never_presses() {
        let mut d = Debouncer::default();
        let samples: Vec<_> = hold(0, 1000, Level::High).collect();
        assert_eq!(run(&mut d, &samples), 0);
    }

    #[test]
    fn clean_press_reports_once_after_window() {
        let mut d = Debouncer::default();
        assert!(!d.poll(Level::Low, 100));
        assert!(!d.poll(Level::Low, 129));
        assert!(d.poll(Level::Low, 130));
        assert!(d.is_held());
    }

    #[test]
    fn glitch_shorter_than_window_is_ignored() {
        let mut d = Debouncer::default();
        let mut samples: Vec<_> = hold(0, 20, Level::Low).collect();
        samples.extend(hold(20, 200, Level::High));
        assert_eq!(run(&mut d, &samples), 0);
        assert_eq!(d.state().stable_level, Level::High);
    }

    #[test]
    fn bouncing_press_reports_exactly_one() {
        let mut d = Debouncer::default();
        let mut samples = Vec::new();
        // Chatter for 12ms, alternating every 2ms
        for t in 0..12u64 {
            let level = if (t / 2) % 2 == 0 { Level::Low } else { Level::High };
            samples.push((t, level));
        }
        // Solid press
        samples.extend(hold(12, 300, Level::Low));
        // Release chatter
        for t in 300..308u64 {
            let level = if t % 2 == 0 { Level::High } else { Level::Low };
            samples.push((t, level));
        }
        samples.extend(hold(308, 600, Level::High));

        assert_eq!(run(&mut d, &samples), 1);
        assert_eq!(d.state().phase, Phase::Tracking);
    }

    #[test]
    fn hold_does_not_repeat() {
        let mut d = Debouncer::default();
        let samples: Vec<_> = hold(0, 10_000, Level::Low).collect();
        assert_eq!(run(&mut d, &samples), 1);
    }

    #[test]
    fn two_separate_presses_report_twice() {
        let mut d = Debouncer::default();
        let mut samples: Vec<_> = hold(0, 100, Level::Low).collect();
        samples.extend(hold(100, 200, Level::High));
        samples.extend(hold(200, 300, Level::Low));
        samples.extend(hold(300, 400, Level::High));
        assert_eq!(run(&mut d, &samples), 2);
    }

    #[test]
    fn release_chatter_during_settle_is_swallowed() {
        let mut d = Debouncer::default();
        assert!(d.poll(Level::Low, 0) || d.poll(Level::Low, 30));
        assert!(d.is_held());

        // Release chatter restarts the release window
        assert!(!d.poll(Level::High, 50));
        assert!(!d.poll(Level::Low, 52));
        assert!(!d.poll(Level::High, 54));
        assert!(!d.poll(Level::High, 83));
        assert!(d.is_held());
        assert_eq!(d.state().stable_level, Level::Low);

        // High for the window: release committed, then settle
        assert!(!d.poll(Level::High, 84));
        assert_eq!(d.state().stable_level, Level::High);
        assert!(!d.poll(Level::Low, 86));
        assert!(!d.poll(Level::High, 94));
        assert_eq!(d.state().phase, Phase::Tracking);

        // Staying released never produces a second press
        let samples: Vec<_> = hold(95, 200, Level::High).collect();
        assert_eq!(run(&mut d, &samples), 0);
    }

    #[test]
    fn low_after_settle_needs_full_window() {
        let mut d = Debouncer::default();
        assert!(d.poll(Level::Low, 30) || d.poll(Level::Low, 60));
        d.poll(Level::High, 100);
        d.poll(Level::High, 130);
        // Settle completes while the line is already low again
        assert!(!d.poll(Level::Low, 140));
        assert!(!d.poll(Level::Low, 169));
        assert!(d.poll(Level::Low, 170));
    }

    #[test]
    fn short_release_keeps_stable_level_low() {
        let mut d = Debouncer::default();
        let mut samples: Vec<_> = hold(0, 100, Level::Low).collect();
        // Released for less than the window, then pressed again
        samples.extend(hold(100, 120, Level::High));
        samples.extend(hold(120, 400, Level::Low));
        assert_eq!(run(&mut d, &samples), 1);
        assert_eq!(d.state().stable_level, Level::Low);
        assert!(d.is_held());
    }

    #[test]
    fn stable_level_changes_only_after_window() {
        let mut d = Debouncer::default();
        let mut samples: Vec<_> = hold(0, 100, Level::Low).collect();
        samples.extend(hold(100, 300, Level::High));
        let mut last_change = 0;
        let mut stable = d.state().stable_level;
        for (t, level) in samples {
            if level != d.state().raw_level {
                last_change = t;
            }
            d.poll(level, t);
            if d.state().stable_level != stable {
                stable = d.state().stable_level;
                assert_eq!(stable, level);
                assert!(t - last_change >= 30);
            }
        }
        assert_eq!(stable, Level::High);
    }

    #[test]
    fn custom_window() {
        let mut d = Debouncer::new(DebounceConfig::default().with_window_ms(5).with_settle_ms(0));
        assert!(!d.poll(Level::Low, 0));
        assert!(d.poll(Level::Low, 5));
        assert_eq!(d.config().window_ms, 5);
    }
}
