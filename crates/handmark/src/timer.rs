//! Frame rate and performance measurement.

use std::{
    cell::RefCell,
    fmt, mem,
    time::{Duration, Instant},
};

use itertools::Itertools;

const EMA_ALPHA: f32 = 0.3;

/// Measures the instantaneous frame rate from the time between two consecutive ticks.
#[derive(Debug, Default)]
pub struct FpsMeter {
    prev: Option<Instant>,
}

impl FpsMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a tick at the current time and returns the frame rate since the last tick.
    pub fn tick(&mut self) -> Option<f32> {
        self.tick_at(Instant::now())
    }

    /// Records a tick at `now` and returns `1 / (now - previous tick)`.
    ///
    /// Returns [`None`] when there is no previous tick, or when no time has passed since it (or
    /// `now` lies before it), since the rate is undefined in those cases.
    pub fn tick_at(&mut self, now: Instant) -> Option<f32> {
        let prev = self.prev.replace(now)?;
        let elapsed = now.checked_duration_since(prev)?.as_secs_f32();
        if elapsed > 0.0 {
            Some(1.0 / elapsed)
        } else {
            None
        }
    }
}

/// Keeps a smoothed average of how long one stage of the frame loop takes.
///
/// Formatting the timer with `{}` prints `name: <samples>x<average>ms` and starts over.
pub struct Timer {
    name: &'static str,
    state: RefCell<State>,
}

#[derive(Default)]
struct State {
    /// Exponential moving average, in seconds.
    avg: Option<f32>,
    count: usize,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: RefCell::new(State::default()),
        }
    }

    /// Runs `f` and records how long it took.
    pub fn time<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        f()
    }

    /// Records the time from now until the returned guard is dropped.
    pub fn start(&self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            timer: self,
        }
    }

    fn record(&self, duration: Duration) {
        let mut state = self.state.borrow_mut();
        let secs = duration.as_secs_f32();
        state.avg = Some(match state.avg {
            Some(avg) => avg + EMA_ALPHA * (secs - avg),
            None => secs,
        });
        state.count += 1;
    }
}

impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let State { avg, count } = mem::take(&mut *self.state.borrow_mut());
        let avg_ms = avg.unwrap_or(0.0) * 1000.0;

        write!(f, "{}: {count}x{avg_ms:.01}ms", self.name)
    }
}

/// The clone starts without any samples.
impl Clone for Timer {
    fn clone(&self) -> Self {
        Self::new(self.name)
    }
}

/// Returned by [`Timer::start`].
pub struct TimerGuard<'a> {
    start: Instant,
    timer: &'a Timer,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.record(self.start.elapsed());
    }
}

/// Counts loop iterations and logs the rate once per second at debug level.
pub struct FpsCounter {
    name: String,
    frames: u32,
    start: Instant,
}

impl FpsCounter {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            frames: 0,
            start: Instant::now(),
        }
    }

    /// Counts one iteration. When a log line is due, `extra` is appended to it; passing
    /// [`Timer`]s there prints and resets them.
    pub fn tick_with<D: fmt::Display, I: IntoIterator<Item = D>>(&mut self, extra: I) {
        self.frames += 1;
        if self.start.elapsed() < Duration::from_secs(1) {
            return;
        }

        let extra = extra.into_iter().join(", ");
        if extra.is_empty() {
            log::debug!("{}: {} FPS", self.name, self.frames);
        } else {
            log::debug!("{}: {} FPS ({})", self.name, self.frames, extra);
        }
        self.frames = 0;
        self.start = Instant::now();
    }
}
