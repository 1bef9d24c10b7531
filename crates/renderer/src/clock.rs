use std::time::{Duration, Instant};

/// Refresh rate assumed for `fps = auto` until the host reports one.
pub const DEFAULT_REFRESH_RATE: f32 = 60.0;

/// Slowest fixed rate the clock runs at; slower requests are raised to it.
pub const MIN_FIXED_RATE: f32 = 0.1;

/// Ticks slightly early rather than missing a deadline by a timer's jitter.
const FRAME_SLACK: Duration = Duration::from_micros(500);

/// Target tick rate of the frame clock.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FpsSetting {
    /// Follow the host's native refresh signal.
    #[default]
    Auto,
    /// Tick at a fixed rate (frames per second, greater than zero).
    Fixed(f32),
}

impl FpsSetting {
    /// Maps a raw frame rate to a setting; zero or negative means `Auto`.
    ///
    /// Positive rates below [`MIN_FIXED_RATE`] are raised to it.
    pub fn from_rate(rate: f32) -> Self {
        if rate.is_finite() && rate > 0.0 {
            FpsSetting::Fixed(rate.max(MIN_FIXED_RATE))
        } else {
            FpsSetting::Auto
        }
    }
}

/// One frame tick emitted by the [`FrameClock`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Elapsed time since the previous tick divided by the target interval.
    pub fps_multiplier: f32,
    /// Wall-clock time since the previous tick.
    pub elapsed: Duration,
    /// Monotonic tick counter, reset only by construction.
    pub frame_index: u64,
}

/// Paces frame ticks and reports how far each tick is from the nominal rate.
///
/// The clock never sleeps; the host event loop asks [`ready_for_frame`] and
/// [`next_deadline`] to decide when to wake up, then calls [`tick`].
///
/// [`ready_for_frame`]: FrameClock::ready_for_frame
/// [`next_deadline`]: FrameClock::next_deadline
/// [`tick`]: FrameClock::tick
#[derive(Debug, Clone)]
pub struct FrameClock {
    fps: FpsSetting,
    refresh_rate: f32,
    playing: bool,
    last_tick: Option<Instant>,
    frame_index: u64,
}

impl FrameClock {
    /// Creates a paused clock.
    pub fn new(fps: FpsSetting) -> Self {
        Self {
            fps,
            refresh_rate: DEFAULT_REFRESH_RATE,
            playing: false,
            last_tick: None,
            frame_index: 0,
        }
    }

    /// Records the host refresh rate used by `FpsSetting::Auto`.
    pub fn set_refresh_rate(&mut self, hz: f32) {
        if hz.is_finite() && hz > 0.0 {
            self.refresh_rate = hz;
            tracing::debug!(refresh_rate = hz, "frame clock refresh rate detected");
        }
    }

    fn refresh_interval(&self) -> Duration {
        Duration::try_from_secs_f32(1.0 / self.refresh_rate)
            .unwrap_or_else(|_| Duration::from_secs_f32(1.0 / DEFAULT_REFRESH_RATE))
    }

    /// Nominal time between two ticks.
    ///
    /// Falls back to the refresh interval when a fixed rate has no
    /// representable interval.
    pub fn target_interval(&self) -> Duration {
        match self.fps {
            FpsSetting::Fixed(rate) if rate.is_finite() && rate > 0.0 => {
                Duration::try_from_secs_f32(1.0 / rate.max(MIN_FIXED_RATE))
                    .unwrap_or_else(|_| self.refresh_interval())
            }
            _ => self.refresh_interval(),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Starts ticking. The first tick after `play` reports a multiplier of 1.
    pub fn play(&mut self) {
        if self.playing {
            return;
        }
        self.playing = true;
        self.last_tick = None;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// True when a tick is due at `now`.
    ///
    /// With `FpsSetting::Auto` every wake-up is due; presentation is paced
    /// by the host's vsync.
    pub fn ready_for_frame(&self, now: Instant) -> bool {
        if !self.playing {
            return false;
        }
        match (self.fps, self.last_tick) {
            (FpsSetting::Auto, _) | (_, None) => true,
            (FpsSetting::Fixed(_), Some(last)) => {
                now.saturating_duration_since(last) + FRAME_SLACK >= self.target_interval()
            }
        }
    }

    /// Instant at which the next fixed-rate tick becomes due.
    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.playing {
            return None;
        }
        match (self.fps, self.last_tick) {
            (FpsSetting::Fixed(_), Some(last)) => Some(last + self.target_interval()),
            _ => None,
        }
    }

    /// Emits a tick if one is due at `now`.
    pub fn tick(&mut self, now: Instant) -> Option<FrameTick> {
        if !self.ready_for_frame(now) {
            return None;
        }
        let elapsed = self
            .last_tick
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or_else(|| self.target_interval());
        let fps_multiplier = if self.last_tick.is_some() {
            elapsed.as_secs_f32() / self.target_interval().as_secs_f32()
        } else {
            1.0
        };
        self.last_tick = Some(now);
        let tick = FrameTick {
            fps_multiplier,
            elapsed,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.saturating_add(1);
        tracing::trace!(
            frame = tick.frame_index,
            fps_multiplier,
            elapsed_ms = elapsed.as_secs_f32() * 1000.0,
            "frame tick"
        );
        Some(tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn paused_clock_never_ticks() {
        let mut clock = FrameClock::new(FpsSetting::Auto);
        let now = Instant::now();
        assert!(!clock.ready_for_frame(now));
        assert!(clock.tick(now).is_none());
        assert!(clock.next_deadline().is_none());
    }

    #[test]
    fn first_tick_after_play_reports_unit_multiplier() {
        let mut clock = FrameClock::new(FpsSetting::Fixed(60.0));
        clock.play();
        let tick = clock.tick(Instant::now()).expect("tick");
        assert_eq!(tick.fps_multiplier, 1.0);
        assert_eq!(tick.frame_index, 0);
    }

    #[test]
    fn multiplier_compensates_for_slow_ticks() {
        let mut clock = FrameClock::new(FpsSetting::Fixed(60.0));
        clock.play();
        let start = Instant::now();
        clock.tick(start).expect("first tick");
        let tick = clock
            .tick(start + Duration::from_secs_f32(2.0 / 60.0))
            .expect("second tick");
        assert!(approx(tick.fps_multiplier, 2.0), "{}", tick.fps_multiplier);
        assert_eq!(tick.frame_index, 1);
    }

    #[test]
    fn fixed_rate_waits_for_the_interval() {
        let mut clock = FrameClock::new(FpsSetting::Fixed(30.0));
        clock.play();
        let start = Instant::now();
        clock.tick(start).expect("first tick");
        assert!(clock.tick(start + Duration::from_millis(10)).is_none());
        let deadline = clock.next_deadline().expect("deadline");
        assert_eq!(deadline, start + clock.target_interval());
        assert!(clock.tick(deadline).is_some());
    }

    #[test]
    fn auto_uses_the_detected_refresh_interval() {
        let mut clock = FrameClock::new(FpsSetting::Auto);
        clock.set_refresh_rate(144.0);
        clock.play();
        let start = Instant::now();
        clock.tick(start).expect("first tick");
        let tick = clock
            .tick(start + Duration::from_secs_f32(1.0 / 72.0))
            .expect("auto always ticks");
        assert!(approx(tick.fps_multiplier, 2.0), "{}", tick.fps_multiplier);
        assert!(clock.next_deadline().is_none());
    }

    #[test]
    fn invalid_refresh_rates_are_ignored() {
        let mut clock = FrameClock::new(FpsSetting::Auto);
        clock.set_refresh_rate(0.0);
        clock.set_refresh_rate(f32::NAN);
        assert!(approx(
            clock.target_interval().as_secs_f32(),
            1.0 / DEFAULT_REFRESH_RATE
        ));
    }

    #[test]
    fn resuming_after_pause_does_not_report_the_gap() {
        let mut clock = FrameClock::new(FpsSetting::Fixed(60.0));
        clock.play();
        let start = Instant::now();
        clock.tick(start).expect("first tick");
        clock.pause();
        clock.play();
        clock.play();
        let tick = clock.tick(start + Duration::from_secs(5)).expect("tick");
        assert_eq!(tick.fps_multiplier, 1.0);
    }

    #[test]
    fn from_rate_maps_non_positive_to_auto() {
        assert_eq!(FpsSetting::from_rate(0.0), FpsSetting::Auto);
        assert_eq!(FpsSetting::from_rate(-5.0), FpsSetting::Auto);
        assert_eq!(FpsSetting::from_rate(24.0), FpsSetting::Fixed(24.0));
    }

    #[test]
    fn tiny_fixed_rates_are_raised_to_the_minimum() {
        assert_eq!(FpsSetting::from_rate(1e-20), FpsSetting::Fixed(MIN_FIXED_RATE));

        let mut clock = FrameClock::new(FpsSetting::from_rate(1e-20));
        clock.play();
        let start = Instant::now();
        assert!(clock.tick(start).is_some());
        assert!(approx(clock.target_interval().as_secs_f32(), 1.0 / MIN_FIXED_RATE));
        assert!(clock.tick(start + Duration::from_secs(1)).is_none());
    }

    #[test]
    fn fixed_rate_below_minimum_never_panics() {
        let mut clock = FrameClock::new(FpsSetting::Fixed(f32::MIN_POSITIVE));
        clock.play();
        let start = Instant::now();
        assert!(clock.tick(start).is_some());
        assert!(clock.next_deadline().is_some());
        assert!(clock.tick(start + Duration::from_millis(1)).is_none());
    }
}
