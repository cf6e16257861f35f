use crate::{Error, ParsedId, Result, SnowflakeId};

/// Default epoch: Monday, January 1, 2024 00:00:00 UTC
pub const DEFAULT_EPOCH: i64 = 1_704_067_200_000;

/// Twitter epoch: Thursday, November 4, 2010 1:42:54.657 UTC
pub const TWITTER_EPOCH: i64 = 1_288_834_974_657;

/// Discord epoch: Thursday, January 1, 2015 00:00:00 UTC
pub const DISCORD_EPOCH: i64 = 1_420_070_400_000;

/// The bit layout of a [`SnowflakeId`] together with the epoch its timestamp
/// is measured from.
///
/// The sign bit is never used. Whatever the worker id and sequence fields
/// leave over becomes the timestamp field:
///
/// ```text
///  Bit Index:  63           63 62             22 21             12 11             0
///              +--------------+-----------------+-----------------+---------------+
///  Field:      | reserved (1) | timestamp (41)  | worker ID (10)  | sequence (12) |
///              +--------------+-----------------+-----------------+---------------+
///              |<----------- MSB ---------- 64 bits ----------- LSB ------------>|
/// ```
///
/// The diagram shows [`Layout::DEFAULT`]. The three values are fixed for the
/// lifetime of a generator and every party decoding ids must agree on them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Layout {
    epoch_millis: i64,
    worker_id_bits: u8,
    sequence_bits: u8,
}

impl Default for Layout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Layout {
    /// 41 timestamp bits since [`DEFAULT_EPOCH`], 10 worker id bits and 12
    /// sequence bits. Good for roughly 69 years after the epoch.
    pub const DEFAULT: Self = Self {
        epoch_millis: DEFAULT_EPOCH,
        worker_id_bits: 10,
        sequence_bits: 12,
    };

    /// Creates a layout, validating that it leaves at least one timestamp
    /// bit below the sign bit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLayout`] when `epoch_millis` is negative or
    /// when `worker_id_bits + sequence_bits` exceeds 62.
    ///
    /// # Example
    /// ```
    /// use flakeid::{Layout, DISCORD_EPOCH};
    ///
    /// let layout = Layout::new(DISCORD_EPOCH, 8, 14).unwrap();
    /// assert_eq!(layout.max_worker_id(), 255);
    /// assert_eq!(layout.max_sequence(), 16_383);
    /// assert!(Layout::new(DISCORD_EPOCH, 40, 23).is_err());
    /// ```
    pub const fn new(epoch_millis: i64, worker_id_bits: u8, sequence_bits: u8) -> Result<Self> {
        if epoch_millis < 0 {
            return Err(Error::InvalidLayout {
                reason: "epoch must not precede the Unix epoch",
            });
        }
        if worker_id_bits as u32 + sequence_bits as u32 > 62 {
            return Err(Error::InvalidLayout {
                reason: "worker id and sequence bits must leave room for a timestamp",
            });
        }
        Ok(Self {
            epoch_millis,
            worker_id_bits,
            sequence_bits,
        })
    }

    /// Milliseconds since the Unix epoch at which timestamps start counting.
    pub const fn epoch_millis(&self) -> i64 {
        self.epoch_millis
    }

    pub const fn worker_id_bits(&self) -> u8 {
        self.worker_id_bits
    }

    pub const fn sequence_bits(&self) -> u8 {
        self.sequence_bits
    }

    pub const fn timestamp_bits(&self) -> u8 {
        63 - self.worker_id_bits - self.sequence_bits
    }

    /// Number of bits to shift the timestamp to its position.
    pub const fn timestamp_shift(&self) -> u8 {
        self.worker_id_bits + self.sequence_bits
    }

    /// Number of bits to shift the worker id to its position.
    pub const fn worker_id_shift(&self) -> u8 {
        self.sequence_bits
    }

    pub const fn max_worker_id(&self) -> i64 {
        (1 << self.worker_id_bits) - 1
    }

    pub const fn max_sequence(&self) -> i64 {
        (1 << self.sequence_bits) - 1
    }

    /// The largest number of milliseconds after the epoch that still fits the
    /// timestamp field without reaching the sign bit.
    pub const fn max_timestamp(&self) -> i64 {
        i64::MAX >> self.timestamp_shift()
    }

    /// Returns `true` if `worker_id` fits the worker id field.
    pub const fn is_valid_worker_id(&self, worker_id: i64) -> bool {
        worker_id >= 0 && worker_id <= self.max_worker_id()
    }

    pub(crate) const fn check_worker_id(&self, worker_id: i64) -> Result<i64> {
        if self.is_valid_worker_id(worker_id) {
            Ok(worker_id)
        } else {
            Err(Error::InvalidWorkerId {
                worker_id,
                max: self.max_worker_id(),
            })
        }
    }

    /// Converts a wall-clock reading into milliseconds since the epoch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimestampOutOfRange`] if `now_millis` is before the
    /// epoch or past [`Layout::max_timestamp`].
    pub const fn elapsed(&self, now_millis: i64) -> Result<i64> {
        match now_millis.checked_sub(self.epoch_millis) {
            Some(elapsed) if elapsed >= 0 && elapsed <= self.max_timestamp() => Ok(elapsed),
            _ => Err(Error::TimestampOutOfRange { now_millis }),
        }
    }

    /// Packs the three fields into an id.
    ///
    /// `elapsed` is milliseconds since the epoch. Out of range inputs are
    /// masked to their field width.
    pub const fn compose(&self, elapsed: i64, worker_id: i64, sequence: i64) -> SnowflakeId {
        debug_assert!(elapsed >= 0 && elapsed <= self.max_timestamp(), "timestamp overflow");
        debug_assert!(self.is_valid_worker_id(worker_id), "worker_id overflow");
        debug_assert!(sequence >= 0 && sequence <= self.max_sequence(), "sequence overflow");
        let timestamp = (elapsed & self.max_timestamp()) << self.timestamp_shift();
        let worker_id = (worker_id & self.max_worker_id()) << self.worker_id_shift();
        let sequence = sequence & self.max_sequence();
        SnowflakeId::from_raw(timestamp | worker_id | sequence)
    }

    /// Decomposes any 64-bit value into its fields.
    ///
    /// No validation is performed: values that were never produced by a
    /// generator decode into well-defined but meaningless fields.
    ///
    /// # Example
    /// ```
    /// use flakeid::{Layout, DEFAULT_EPOCH};
    ///
    /// let layout = Layout::DEFAULT;
    /// let id = layout.compose(1_000, 7, 3);
    /// let parsed = layout.parse(id.to_raw());
    /// assert_eq!(parsed.timestamp_millis, DEFAULT_EPOCH + 1_000);
    /// assert_eq!(parsed.worker_id, 7);
    /// assert_eq!(parsed.sequence, 3);
    /// ```
    pub fn parse(&self, id: i64) -> ParsedId {
        let timestamp_millis = (id >> self.timestamp_shift()).saturating_add(self.epoch_millis);
        let worker_id = (id >> self.worker_id_shift()) & self.max_worker_id();
        let sequence = id & self.max_sequence();
        ParsedId::new(timestamp_millis, worker_id, sequence)
    }
}

/// Decomposes `id` using [`Layout::DEFAULT`].
///
/// This is total over all 64-bit inputs and never takes a lock.
pub fn parse_id(id: i64) -> ParsedId {
    Layout::DEFAULT.parse(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_matches_twitter_widths() {
        let layout = Layout::DEFAULT;
        assert_eq!(layout.timestamp_bits(), 41);
        assert_eq!(layout.timestamp_shift(), 22);
        assert_eq!(layout.worker_id_shift(), 12);
        assert_eq!(layout.max_worker_id(), 1023);
        assert_eq!(layout.max_sequence(), 4095);
        assert_eq!(layout.max_timestamp(), (1 << 41) - 1);
        assert_eq!(Layout::default(), Layout::DEFAULT);
    }

    #[test]
    fn rejects_layouts_without_timestamp_room() {
        assert!(matches!(
            Layout::new(0, 31, 32),
            Err(Error::InvalidLayout { .. })
        ));
        assert!(matches!(
            Layout::new(-1, 10, 12),
            Err(Error::InvalidLayout { .. })
        ));

        let narrow = Layout::new(0, 31, 31).unwrap();
        assert_eq!(narrow.timestamp_bits(), 1);
        assert_eq!(narrow.max_timestamp(), 1);

        let wide = Layout::new(0, 0, 0).unwrap();
        assert_eq!(wide.max_timestamp(), i64::MAX);
        assert_eq!(wide.max_worker_id(), 0);
        assert_eq!(wide.max_sequence(), 0);
    }

    #[test]
    fn compose_places_fields() {
        let layout = Layout::DEFAULT;
        let id = layout.compose(1, 1, 1).to_raw();
        assert_eq!(id, (1 << 22) | (1 << 12) | 1);
    }

    #[test]
    fn elapsed_rejects_values_outside_window() {
        let layout = Layout::DEFAULT;
        assert_eq!(layout.elapsed(DEFAULT_EPOCH), Ok(0));
        assert_eq!(
            layout.elapsed(DEFAULT_EPOCH - 1),
            Err(Error::TimestampOutOfRange {
                now_millis: DEFAULT_EPOCH - 1
            })
        );
        let last = DEFAULT_EPOCH + layout.max_timestamp();
        assert_eq!(layout.elapsed(last), Ok(layout.max_timestamp()));
        assert!(layout.elapsed(last + 1).is_err());
        assert!(layout.elapsed(i64::MIN).is_err());
    }

    #[test]
    fn parse_is_total() {
        let parsed = parse_id(-1);
        assert_eq!(parsed.timestamp_millis, DEFAULT_EPOCH - 1);
        assert_eq!(parsed.worker_id, 1023);
        assert_eq!(parsed.sequence, 4095);

        let parsed = parse_id(i64::MAX);
        assert_eq!(parsed.timestamp_millis, DEFAULT_EPOCH + (1 << 41) - 1);

        let parsed = parse_id(i64::MIN);
        assert_eq!(parsed.timestamp_millis, DEFAULT_EPOCH - (1 << 41));
        assert_eq!(parsed.worker_id, 0);
        assert_eq!(parsed.sequence, 0);

        let parsed = Layout::new(i64::MAX, 0, 0).unwrap().parse(i64::MAX);
        assert_eq!(parsed.timestamp_millis, i64::MAX);
    }

    #[test]
    fn custom_layout_round_trips() {
        let layout = Layout::new(TWITTER_EPOCH, 5, 7).unwrap();
        let id = layout.compose(123_456, 31, 127);
        let parsed = layout.parse(id.to_raw());
        assert_eq!(parsed.timestamp_millis, TWITTER_EPOCH + 123_456);
        assert_eq!(parsed.worker_id, 31);
        assert_eq!(parsed.sequence, 127);
    }
}
