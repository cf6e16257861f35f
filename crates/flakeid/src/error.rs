/// A result type defaulting to this crate's [`enum@Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `flakeid` can emit.
///
/// Only [`Error::InvalidWorkerId`] and [`Error::InvalidLayout`] are raised at
/// construction time. Everything else is raised per call by
/// [`SnowflakeGenerator::next_id`] and leaves the generator state untouched.
///
/// [`SnowflakeGenerator::next_id`]: crate::SnowflakeGenerator::next_id
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The worker id does not fit the layout's worker id field.
    #[error("worker id must be between 0 and {max}, got {worker_id}")]
    InvalidWorkerId {
        /// The rejected worker id.
        worker_id: i64,
        /// The largest worker id the layout can encode.
        max: i64,
    },

    /// The requested bit layout cannot be packed into a signed 64-bit id.
    #[error("invalid layout: {reason}")]
    InvalidLayout {
        /// What was wrong with the layout.
        reason: &'static str,
    },

    /// The clock reads earlier than the last issued timestamp.
    ///
    /// No retry is attempted; the caller decides whether to wait, retry, or
    /// abort.
    #[error("clock moved backwards, refusing to generate id for {behind_by_millis} milliseconds")]
    ClockMovedBackwards {
        /// How far (in milliseconds) the clock is behind the last issued
        /// timestamp.
        behind_by_millis: i64,
    },

    /// The current time lies outside the window the layout can encode, either
    /// before the epoch or past the last representable millisecond.
    #[error("timestamp {now_millis} is outside the encodable window of the layout")]
    TimestampOutOfRange {
        /// The offending wall-clock reading, in milliseconds since the Unix
        /// epoch.
        now_millis: i64,
    },

    /// The generator lock was poisoned by a thread that panicked while
    /// holding it. With the `parking-lot` feature mutexes do not poison, so
    /// this variant does not exist.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator lock poisoned")]
    LockPoisoned,
}

#[cfg(not(feature = "parking-lot"))]
use std::sync::{MutexGuard, PoisonError};

#[cfg(not(feature = "parking-lot"))]
// Convert all poisoned lock errors to a simplified `LockPoisoned`
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
