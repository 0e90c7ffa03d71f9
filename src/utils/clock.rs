//! Wall-clock source for every timed poll loop

use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;

/// Time source used by the controllers.
///
/// `now` is monotonic time since the clock was created. Controllers re-read it every
/// cycle instead of relying on a scheduler.
pub trait Clock {
    fn now(&self) -> Duration;
    fn sleep(&self, d: Duration);

    fn sleep_secs(&self, secs: f64) {
        if secs > 0.0 {
            self.sleep(Duration::from_secs_f64(secs));
        }
    }

    /// Seconds elapsed since an earlier `now()` reading
    fn since(&self, earlier: Duration) -> f64 {
        self.now().saturating_sub(earlier).as_secs_f64()
    }
}

/// Production clock backed by `Instant` and `thread::sleep`
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, d: Duration) {
        thread::sleep(d);
    }
}

/// Random pause length in `[0, max_secs)`
pub fn jitter(max_secs: f64) -> f64 {
    if max_secs <= 0.0 {
        return 0.0;
    }
    rand::thread_rng().gen_range(0.0..max_secs)
}
