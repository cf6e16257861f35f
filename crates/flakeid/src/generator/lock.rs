use core::cmp::Ordering;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    Error, IdGenStatus, Layout, ParsedId, Result, SnowflakeId, SystemClock, TimeSource,
    generator::{Mutex, MutexGuard},
};

/// The mutable part of a generator. Only ever touched under the lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct State {
    last_timestamp: i64,
    sequence: i64,
}

/// A lock-based Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// Every call to [`next_id`] holds the lock for its whole body, including
/// the clock read and the wait for the next millisecond when the sequence is
/// exhausted. Concurrent callers are therefore serialized into one total
/// order and each receives a strictly larger id than the caller before it.
///
/// Throughput is bounded by `max_sequence + 1` ids per millisecond; excess
/// demand spills into the following milliseconds.
///
/// Ids are only unique across generators if no two of them ever run with the
/// same worker id and layout at the same time. Assigning worker ids is up to
/// the caller.
///
/// Wrap the generator in an `Arc` to share it between threads that are not
/// scoped.
///
/// [`next_id`]: SnowflakeGenerator::next_id
#[derive(Debug)]
pub struct SnowflakeGenerator<T = SystemClock>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    pub(crate) state: crossbeam_utils::CachePadded<Mutex<State>>,
    #[cfg(not(feature = "cache-padded"))]
    pub(crate) state: Mutex<State>,
    worker_id: i64,
    layout: Layout,
    time: T,
}

impl SnowflakeGenerator<SystemClock> {
    /// Creates a generator for `worker_id` using [`Layout::DEFAULT`] and the
    /// system wall clock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWorkerId`] when `worker_id` is negative or
    /// larger than [`Layout::max_worker_id`].
    ///
    /// # Example
    /// ```
    /// use flakeid::SnowflakeGenerator;
    ///
    /// let generator = SnowflakeGenerator::new(1).unwrap();
    /// let a = generator.next_id().unwrap();
    /// let b = generator.next_id().unwrap();
    /// assert!(a < b);
    ///
    /// assert!(SnowflakeGenerator::new(1024).is_err());
    /// ```
    pub fn new(worker_id: i64) -> Result<Self> {
        Self::with_layout(worker_id, Layout::DEFAULT, SystemClock)
    }
}

impl<T> SnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a generator with an explicit layout and time source.
    ///
    /// The initial timestamp and sequence are zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWorkerId`] when `worker_id` does not fit the
    /// layout's worker id field.
    ///
    /// # Example
    /// ```
    /// use flakeid::{Layout, MonotonicClock, SnowflakeGenerator, TWITTER_EPOCH};
    ///
    /// let layout = Layout::new(TWITTER_EPOCH, 5, 17).unwrap();
    /// let generator = SnowflakeGenerator::with_layout(31, layout, MonotonicClock::new()).unwrap();
    ///
    /// let id = generator.next_id().unwrap();
    /// assert_eq!(generator.parse(id).worker_id, 31);
    /// ```
    pub fn with_layout(worker_id: i64, layout: Layout, time: T) -> Result<Self> {
        Self::from_components(0, 0, worker_id, layout, time)
    }

    /// Creates a generator preloaded with a last issued timestamp and
    /// sequence.
    ///
    /// This is useful for restoring a high-water mark persisted by a previous
    /// process so that a restart on a lagging clock reports
    /// [`Error::ClockMovedBackwards`] instead of reissuing ids. `sequence` is
    /// masked to the layout's sequence width.
    ///
    /// # ⚠️ Note
    /// In typical use cases, you should prefer [`Self::with_layout`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWorkerId`] when `worker_id` does not fit the
    /// layout's worker id field.
    pub fn from_components(
        last_timestamp: i64,
        sequence: i64,
        worker_id: i64,
        layout: Layout,
        time: T,
    ) -> Result<Self> {
        let worker_id = layout.check_worker_id(worker_id)?;
        let state = State {
            last_timestamp,
            sequence: sequence & layout.max_sequence(),
        };
        Ok(Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(Mutex::new(state)),
            #[cfg(not(feature = "cache-padded"))]
            state: Mutex::new(state),
            worker_id,
            layout,
            time,
        })
    }

    pub fn worker_id(&self) -> i64 {
        self.worker_id
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The wall-clock millisecond of the last issued id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if the lock has been poisoned.
    pub fn last_timestamp(&self) -> Result<i64> {
        Ok(self.lock()?.last_timestamp)
    }

    /// The sequence of the last issued id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if the lock has been poisoned.
    pub fn sequence(&self) -> Result<i64> {
        Ok(self.lock()?.sequence)
    }

    /// Decomposes an id with this generator's layout. Takes no lock.
    pub fn parse(&self, id: SnowflakeId) -> ParsedId {
        self.layout.parse(id.to_raw())
    }

    /// Generates the next id, waiting for the next millisecond if the
    /// sequence is exhausted.
    ///
    /// While waiting the thread yields between clock samples. The lock stays
    /// held, so other callers queue behind the wait.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockMovedBackwards`] if the clock reads earlier than the
    ///   last issued timestamp, either on entry or while waiting for the next
    ///   millisecond. No state is modified.
    /// - [`Error::TimestampOutOfRange`] if the clock lies outside the layout's
    ///   window.
    /// - [`Error::LockPoisoned`] if the lock has been poisoned.
    pub fn next_id(&self) -> Result<SnowflakeId> {
        self.next_id_with(|_| std::thread::yield_now())
    }

    /// Like [`Self::next_id`], but calls `f` with the millisecond being
    /// waited for each time the clock is sampled without having advanced.
    ///
    /// `f` is called with the lock held.
    ///
    /// # Errors
    ///
    /// See [`Self::next_id`].
    ///
    /// # Example
    /// ```
    /// use flakeid::SnowflakeGenerator;
    ///
    /// let generator = SnowflakeGenerator::new(0).unwrap();
    /// let id = generator.next_id_with(|_| core::hint::spin_loop()).unwrap();
    /// assert!(id.to_raw() > 0);
    /// ```
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self, f), fields(worker_id = self.worker_id)))]
    pub fn next_id_with(&self, mut f: impl FnMut(i64)) -> Result<SnowflakeId> {
        let mut state = self.lock()?;
        let now = self.time.current_millis();

        let (timestamp, sequence) = match now.cmp(&state.last_timestamp) {
            Ordering::Less => return Err(Self::cold_clock_behind(now, state.last_timestamp)),
            Ordering::Equal => {
                let sequence = (state.sequence + 1) & self.layout.max_sequence();
                if sequence == 0 {
                    (self.wait_past(state.last_timestamp, &mut f)?, 0)
                } else {
                    (now, sequence)
                }
            }
            Ordering::Greater => (now, 0),
        };

        self.commit(&mut state, timestamp, sequence)
    }

    /// Attempts to generate the next id without waiting.
    ///
    /// If the sequence is exhausted for the current millisecond, returns
    /// [`IdGenStatus::Pending`] and leaves the state untouched.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockMovedBackwards`] if the clock reads earlier than the
    ///   last issued timestamp.
    /// - [`Error::TimestampOutOfRange`] if the clock lies outside the layout's
    ///   window.
    /// - [`Error::LockPoisoned`] if the lock has been poisoned.
    ///
    /// # Example
    /// ```
    /// use flakeid::{IdGenStatus, SnowflakeGenerator};
    ///
    /// let generator = SnowflakeGenerator::new(0).unwrap();
    ///
    /// let id = loop {
    ///     match generator.try_poll_id().unwrap() {
    ///         IdGenStatus::Ready { id } => break id,
    ///         IdGenStatus::Pending { .. } => std::thread::yield_now(),
    ///     }
    /// };
    /// assert_eq!(generator.parse(id).worker_id, 0);
    /// ```
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self), fields(worker_id = self.worker_id)))]
    pub fn try_poll_id(&self) -> Result<IdGenStatus> {
        let mut state = self.lock()?;
        let now = self.time.current_millis();

        match now.cmp(&state.last_timestamp) {
            Ordering::Less => Err(Self::cold_clock_behind(now, state.last_timestamp)),
            Ordering::Equal => {
                if state.sequence < self.layout.max_sequence() {
                    let sequence = state.sequence + 1;
                    let id = self.commit(&mut state, now, sequence)?;
                    Ok(IdGenStatus::Ready { id })
                } else {
                    Ok(IdGenStatus::Pending {
                        yield_until: state.last_timestamp + 1,
                    })
                }
            }
            Ordering::Greater => {
                let id = self.commit(&mut state, now, 0)?;
                Ok(IdGenStatus::Ready { id })
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        #[cfg(feature = "parking-lot")]
        {
            Ok(self.state.lock())
        }
        #[cfg(not(feature = "parking-lot"))]
        {
            Ok(self.state.lock()?)
        }
    }

    /// Validates the timestamp against the layout, then records it and packs
    /// the id. Nothing is written on error.
    fn commit(&self, state: &mut State, timestamp: i64, sequence: i64) -> Result<SnowflakeId> {
        let elapsed = self.layout.elapsed(timestamp)?;
        state.last_timestamp = timestamp;
        state.sequence = sequence;
        Ok(self.layout.compose(elapsed, self.worker_id, sequence))
    }

    /// Samples the clock until it reads past `last_timestamp`.
    ///
    /// A reading below `last_timestamp` aborts the wait instead of spinning
    /// until the clock catches up again.
    #[cold]
    fn wait_past(&self, last_timestamp: i64, f: &mut impl FnMut(i64)) -> Result<i64> {
        #[cfg(feature = "tracing")]
        tracing::trace!(last_timestamp, "sequence exhausted, waiting for next millisecond");

        loop {
            let now = self.time.current_millis();
            match now.cmp(&last_timestamp) {
                Ordering::Greater => return Ok(now),
                Ordering::Equal => f(last_timestamp + 1),
                Ordering::Less => return Err(Self::cold_clock_behind(now, last_timestamp)),
            }
        }
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(now: i64, last_timestamp: i64) -> Error {
        let behind_by_millis = last_timestamp.saturating_sub(now);
        debug_assert!(behind_by_millis > 0);

        #[cfg(feature = "tracing")]
        tracing::warn!(behind_by_millis, "clock moved backwards");

        Error::ClockMovedBackwards { behind_by_millis }
    }
}
