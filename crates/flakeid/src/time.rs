use std::{
    sync::{
        Arc, OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

/// A source of wall-clock time in milliseconds since the Unix epoch.
///
/// The generator samples this once per call (and repeatedly while waiting for
/// the next millisecond), which is what lets tests plug in a frozen, stepped
/// or regressing clock.
///
/// # Example
///
/// ```
/// use flakeid::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> i64 {
///         1234
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn current_millis(&self) -> i64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> i64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_millis(&self) -> i64 {
        (**self).current_millis()
    }
}

/// The system wall clock.
///
/// Follows every adjustment made to the system time, including backwards
/// steps, which the generator then reports as
/// [`Error::ClockMovedBackwards`](crate::Error::ClockMovedBackwards).
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since) => i64::try_from(since.as_millis()).unwrap_or(i64::MAX),
            // A clock set before 1970 reads as negative millis.
            Err(err) => i64::try_from(err.duration().as_millis()).map_or(i64::MIN, |ms| -ms),
        }
    }
}

/// Shared ticker thread that updates every millisecond.
#[derive(Debug)]
struct SharedTickerInner {
    current: AtomicU64,
    _handle: OnceLock<JoinHandle<()>>,
}

/// A time source that never goes backwards.
///
/// The wall-clock time is read once at construction. From then on the clock
/// advances by the monotonic time elapsed since construction (`Instant`), so
/// NTP steps or manual changes to the system time are not observed.
///
/// A background thread updates a shared counter once per millisecond so the
/// hot path is a single atomic load. Clones share that thread, and it exits
/// once the last clone is dropped.
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    inner: Arc<SharedTickerInner>,
    anchor_millis: i64,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Starts a clock anchored at the current system time.
    pub fn new() -> Self {
        Self::with_anchor(SystemClock.current_millis())
    }

    /// Starts a clock whose first reading is `anchor_millis`.
    ///
    /// # Example
    ///
    /// ```
    /// use flakeid::{MonotonicClock, TimeSource};
    ///
    /// let clock = MonotonicClock::with_anchor(1_000);
    /// std::thread::sleep(std::time::Duration::from_millis(5));
    ///
    /// // Sleep and ticker alignment are not exact, but the reading never
    /// // goes backwards.
    /// assert!(clock.current_millis() >= 1_000);
    /// ```
    pub fn with_anchor(anchor_millis: i64) -> Self {
        let start = Instant::now();
        let inner = Arc::new(SharedTickerInner {
            current: AtomicU64::new(0),
            _handle: OnceLock::new(),
        });

        let weak_inner = Arc::downgrade(&inner);
        let handle = thread::spawn(move || {
            let mut tick = 0;

            loop {
                let Some(inner_ref) = weak_inner.upgrade() else {
                    break;
                };

                // Compute the absolute target time of the next tick
                let target = start + Duration::from_millis(tick);

                // Sleep if we are early
                let now = Instant::now();
                if now < target {
                    thread::sleep(target - now);
                }

                let now_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                inner_ref.current.store(now_ms, Ordering::Relaxed);

                // Align to next tick after the current actual time
                tick = now_ms.saturating_add(1);
            }
        });

        // The cell is fresh, so this cannot fail.
        let _ = inner._handle.set(handle);

        Self {
            inner,
            anchor_millis,
        }
    }
}

impl TimeSource for MonotonicClock {
    fn current_millis(&self) -> i64 {
        self.anchor_millis
            .saturating_add_unsigned(self.inner.current.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_reads_unix_millis() {
        let before = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as i64;
        let now = SystemClock.current_millis();
        assert!(now >= before);
        assert!(now - before < 1_000);
    }

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::with_anchor(500);
        let mut last = clock.current_millis();
        assert!(last >= 500);
        for _ in 0..1_000 {
            let now = clock.current_millis();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn monotonic_clock_advances() {
        let clock = MonotonicClock::with_anchor(0);
        thread::sleep(Duration::from_millis(20));
        assert!(clock.current_millis() > 0);
    }

    #[test]
    fn clones_share_the_ticker() {
        let clock = MonotonicClock::with_anchor(0);
        let clone = clock.clone();
        assert!(Arc::ptr_eq(&clock.inner, &clone.inner));
        drop(clock);
        thread::sleep(Duration::from_millis(20));
        assert!(clone.current_millis() > 0);
    }
}
