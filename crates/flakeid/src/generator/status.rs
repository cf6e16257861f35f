use crate::SnowflakeId;

/// Represents the result of a non-blocking attempt to generate an ID.
///
/// This type models the outcome of
/// [`SnowflakeGenerator::try_poll_id`](crate::SnowflakeGenerator::try_poll_id):
///
/// - [`IdGenStatus::Ready`] indicates a new ID was successfully generated.
/// - [`IdGenStatus::Pending`] means the sequence is exhausted for the current
///   millisecond and no ID can be produced until the clock reaches
///   `yield_until`.
///
/// # Example
///
/// ```
/// use flakeid::{IdGenStatus, Layout, SnowflakeGenerator, TimeSource};
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> i64 {
///         1_704_067_200_001
///     }
/// }
///
/// let generator = SnowflakeGenerator::from_components(
///     1_704_067_200_001,
///     Layout::DEFAULT.max_sequence(),
///     0,
///     Layout::DEFAULT,
///     FixedTime,
/// )
/// .unwrap();
///
/// match generator.try_poll_id().unwrap() {
///     IdGenStatus::Ready { id } => println!("ID: {id}"),
///     IdGenStatus::Pending { yield_until } => println!("Back off until: {yield_until}"),
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdGenStatus {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated Snowflake ID.
        id: SnowflakeId,
    },
    /// No ID could be generated because the sequence has been exhausted for the
    /// current millisecond.
    Pending {
        /// The wall-clock millisecond (inclusive) at which generation may
        /// resume.
        yield_until: i64,
    },
}
