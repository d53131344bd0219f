//! Year-prefixed identifiers.
//!
//! The textual form is the 4-digit year immediately followed by the
//! sequence number in plain decimal: year 2025, sequence 1000 is
//! `"20251000"`; sequence 10000 is `"202510000"`. There is no padding, so
//! the suffix never starts with `0` and every identifier has exactly one
//! textual form.

use chrono::Datelike;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::AllocationError;

/// Sequence number of the first identifier issued in a partition.
pub const FIRST_SEQUENCE: u64 = 1000;

const PREFIX_LEN: usize = 4;

/// A calendar year usable as an identifier prefix (1000..=9999).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Year(u16);

impl Year {
    pub const MIN: u16 = 1000;
    pub const MAX: u16 = 9999;

    pub fn new(year: i64) -> Result<Self, AllocationError> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&year) {
            Ok(Self(year as u16))
        } else {
            Err(AllocationError::InvalidYear(year))
        }
    }

    /// The current UTC calendar year.
    ///
    /// Around New Year this differs from the local calendar year of a
    /// non-UTC host. Pass a [`Year`] to `IdAllocator::allocate` when the
    /// local year is wanted.
    pub fn current() -> Result<Self, AllocationError> {
        Self::new(chrono::Utc::now().year() as i64)
    }

    #[inline]
    pub const fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierParseError {
    #[error("expected at least {min} digits, got {len}")]
    TooShort { len: usize, min: usize },

    #[error("contains a non-digit character")]
    NonDigit,

    #[error("year prefix {0} is out of range")]
    InvalidYear(u16),

    #[error("sequence suffix has a leading zero")]
    LeadingZero,

    #[error("sequence {0} is below the first sequence number {FIRST_SEQUENCE}")]
    BelowFirstSequence(u64),

    #[error("sequence suffix does not fit in 64 bits")]
    Overflow,
}

/// An issued employee or student identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Identifier {
    year: Year,
    sequence: u64,
}

impl Identifier {
    pub fn new(year: Year, sequence: u64) -> Result<Self, IdentifierParseError> {
        if sequence < FIRST_SEQUENCE {
            return Err(IdentifierParseError::BelowFirstSequence(sequence));
        }
        Ok(Self { year, sequence })
    }

    /// First identifier of a partition, `{year}1000`.
    pub fn first(year: Year) -> Self {
        Self {
            year,
            sequence: FIRST_SEQUENCE,
        }
    }

    #[inline]
    pub const fn year(&self) -> Year {
        self.year
    }

    #[inline]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.year, self.sequence)
    }
}

impl FromStr for Identifier {
    type Err = IdentifierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // 4-digit year + at least the 4 digits of FIRST_SEQUENCE
        let min = PREFIX_LEN + 4;
        if s.len() < min {
            return Err(IdentifierParseError::TooShort { len: s.len(), min });
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdentifierParseError::NonDigit);
        }

        let (prefix, suffix) = s.split_at(PREFIX_LEN);
        let year_value: u16 = prefix.parse().map_err(|_| IdentifierParseError::NonDigit)?;
        let year = Year::new(year_value as i64)
            .map_err(|_| IdentifierParseError::InvalidYear(year_value))?;

        if suffix.starts_with('0') {
            return Err(IdentifierParseError::LeadingZero);
        }
        let sequence: u64 = suffix.parse().map_err(|_| IdentifierParseError::Overflow)?;

        Identifier::new(year, sequence)
    }
}

impl Serialize for Identifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Picks the numerically highest of several identifier strings.
///
/// Longer strings win, then ordinary string order decides. For
/// fixed-prefix decimal strings this is numeric order, so `202510000`
/// beats `20259999` even though it sorts lower as a plain string.
pub(crate) fn numerically_highest<'a, I>(candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
}

/// Sequence number that follows `highest` in the scan-based design, or
/// [`FIRST_SEQUENCE`] when the partition is empty.
pub(crate) fn next_after_highest(
    highest: Option<&str>,
    year: Year,
) -> Result<u64, AllocationError> {
    let Some(raw) = highest else {
        return Ok(FIRST_SEQUENCE);
    };

    let corrupt = |reason: String| AllocationError::CorruptLedgerEntry {
        identifier: raw.to_string(),
        reason,
    };

    let identifier: Identifier = raw.parse().map_err(|e: IdentifierParseError| corrupt(e.to_string()))?;
    if identifier.year() != year {
        return Err(corrupt(format!("expected year prefix {}", year)));
    }

    identifier
        .sequence()
        .checked_add(1)
        .ok_or_else(|| corrupt("sequence cannot be incremented".to_string()))
}
