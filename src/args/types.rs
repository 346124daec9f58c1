use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::{NonZeroU64, NonZeroUsize};

use crate::error::ValidationError;

/// Which request sequence a virtual user runs per iteration.
#[derive(Debug, Clone, Copy, ValueEnum, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowKind {
    /// Login, upload a batch, poll every upload until terminal.
    Upload,
    /// Login, then list own videos, public videos and rankings.
    Browse,
    /// The upload workflow followed by the browse reads.
    Full,
}

impl WorkflowKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            WorkflowKind::Upload => "upload",
            WorkflowKind::Browse => "browse",
            WorkflowKind::Full => "full",
        }
    }

    #[must_use]
    pub const fn uploads(self) -> bool {
        matches!(self, WorkflowKind::Upload | WorkflowKind::Full)
    }

    #[must_use]
    pub const fn browses(self) -> bool {
        matches!(self, WorkflowKind::Browse | WorkflowKind::Full)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositiveU64(NonZeroU64);

impl PositiveU64 {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl TryFrom<u64> for PositiveU64 {
    type Error = ValidationError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        NonZeroU64::new(value)
            .map(PositiveU64)
            .ok_or(ValidationError::ValueTooSmall { min: 1 })
    }
}

impl std::str::FromStr for PositiveU64 {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u64 = s
            .trim()
            .parse()
            .map_err(|err| ValidationError::InvalidNumber { source: err })?;
        PositiveU64::try_from(value)
    }
}

impl From<PositiveU64> for u64 {
    fn from(value: PositiveU64) -> Self {
        value.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositiveUsize(NonZeroUsize);

impl PositiveUsize {
    #[must_use]
    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl TryFrom<usize> for PositiveUsize {
    type Error = ValidationError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        NonZeroUsize::new(value)
            .map(PositiveUsize)
            .ok_or(ValidationError::ValueTooSmall { min: 1 })
    }
}

impl std::str::FromStr for PositiveUsize {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: usize = s
            .trim()
            .parse()
            .map_err(|err| ValidationError::InvalidNumber { source: err })?;
        PositiveUsize::try_from(value)
    }
}

impl From<PositiveUsize> for usize {
    fn from(value: PositiveUsize) -> Self {
        value.get()
    }
}

/// Parts per million of a ratio.
pub const PPM_SCALE: u64 = 1_000_000;
/// Digits kept after the decimal point when parsing a fraction.
const PPM_DIGITS: usize = 6;

/// A ratio in `[0, 1]` stored as parts per million.
///
/// Accepts fractions (`0.05`) and percentages (`5%`); parsing is integer-only
/// so the same text always yields the same bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RatePpm(u64);

impl RatePpm {
    #[must_use]
    pub const fn from_ppm(ppm: u64) -> Option<Self> {
        if ppm > PPM_SCALE {
            None
        } else {
            Some(Self(ppm))
        }
    }

    #[must_use]
    pub const fn ppm(self) -> u64 {
        self.0
    }

    /// Ratio of `part` over `whole`, rounded down; `None` when `whole` is zero.
    #[must_use]
    pub fn of(part: u64, whole: u64) -> Option<Self> {
        let scaled = u128::from(part)
            .saturating_mul(u128::from(PPM_SCALE))
            .checked_div(u128::from(whole))?;
        Self::from_ppm(u64::try_from(scaled).unwrap_or(u64::MAX))
    }
}

impl fmt::Display for RatePpm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / PPM_SCALE;
        let frac = self.0 % PPM_SCALE;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:06}", frac);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl std::str::FromStr for RatePpm {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        let invalid = || ValidationError::InvalidRate {
            value: value.to_owned(),
        };
        let (number, percent) = match value.strip_suffix('%') {
            Some(number) => (number.trim(), true),
            None => (value, false),
        };
        let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.chars().all(|ch| ch.is_ascii_digit())
            || !frac_part.chars().all(|ch| ch.is_ascii_digit())
        {
            return Err(invalid());
        }

        // Percent input is scaled down by two decimal places.
        let frac_digits = if percent {
            PPM_DIGITS.saturating_sub(2)
        } else {
            PPM_DIGITS
        };
        let int_value: u64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_err| invalid())?
        };
        let frac_trimmed: String = frac_part.chars().take(frac_digits).collect();
        let frac_padded = format!("{:0<width$}", frac_trimmed, width = frac_digits);
        let frac_value: u64 = if frac_padded.is_empty() {
            0
        } else {
            frac_padded.parse().map_err(|_err| invalid())?
        };
        let int_scale = if percent { 10_000 } else { PPM_SCALE };
        let ppm = int_value
            .checked_mul(int_scale)
            .and_then(|scaled| scaled.checked_add(frac_value))
            .ok_or_else(|| ValidationError::RateOutOfRange {
                value: value.to_owned(),
            })?;
        RatePpm::from_ppm(ppm).ok_or_else(|| ValidationError::RateOutOfRange {
            value: value.to_owned(),
        })
    }
}
