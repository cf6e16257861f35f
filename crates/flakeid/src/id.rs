use chrono::{DateTime, Utc};
use core::fmt;

use crate::Layout;

/// A 64-bit Snowflake ID.
///
/// Ordering is the ordering of the raw integer, so ids issued by one
/// generator sort in issuance order. Use a [`Layout`] to get at the fields.
///
/// # Example
///
/// ```
/// use flakeid::{Layout, SnowflakeId};
///
/// let id = Layout::DEFAULT.compose(1000, 2, 1);
/// assert_eq!(id, SnowflakeId::from_raw(id.to_raw()));
///
/// let parsed = id.parse(&Layout::DEFAULT);
/// assert_eq!(parsed.worker_id, 2);
/// assert_eq!(parsed.sequence, 1);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnowflakeId(i64);

impl SnowflakeId {
    /// Wraps a raw integer without any validation.
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer.
    pub const fn to_raw(&self) -> i64 {
        self.0
    }

    /// Decomposes this id with the given layout.
    pub fn parse(&self, layout: &Layout) -> ParsedId {
        layout.parse(self.0)
    }

    /// Returns the ID as a zero-padded 19-digit string so that string order
    /// matches numeric order for non-negative ids.
    pub fn to_padded_string(&self) -> String {
        format!("{:019}", self.0)
    }
}

impl From<SnowflakeId> for i64 {
    fn from(id: SnowflakeId) -> Self {
        id.0
    }
}

impl From<i64> for SnowflakeId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SnowflakeId({} / 0x{:016x})", self.0, self.0)
    }
}

/// The fields recovered from an id by [`Layout::parse`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParsedId {
    /// Milliseconds since the Unix epoch (the layout's epoch already added).
    pub timestamp_millis: i64,
    pub worker_id: i64,
    pub sequence: i64,
    /// `timestamp_millis` as an absolute UTC time. Saturates at the range
    /// chrono can represent.
    pub time: DateTime<Utc>,
}

impl ParsedId {
    pub(crate) fn new(timestamp_millis: i64, worker_id: i64, sequence: i64) -> Self {
        Self {
            timestamp_millis,
            worker_id,
            sequence,
            time: millis_to_utc(timestamp_millis),
        }
    }
}

fn millis_to_utc(millis: i64) -> DateTime<Utc> {
    match DateTime::from_timestamp_millis(millis) {
        Some(time) => time,
        None if millis < 0 => DateTime::<Utc>::MIN_UTC,
        None => DateTime::<Utc>::MAX_UTC,
    }
}
