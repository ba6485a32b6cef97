//! Validated rental date ranges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A half-open rental period `[starts_at, ends_at)`.
///
/// Construction enforces the `starts_at < ends_at` invariant, so any
/// `RentalPeriod` in circulation is well-formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalPeriod {
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

impl RentalPeriod {
    /// Creates a rental period, rejecting empty or inverted ranges.
    pub fn new(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<Self, DomainError> {
        if starts_at >= ends_at {
            return Err(DomainError::InvalidPeriod { starts_at, ends_at });
        }
        Ok(Self { starts_at, ends_at })
    }

    /// Returns the period start.
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    /// Returns the period end.
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }

    /// Returns true if the two periods share any instant.
    ///
    /// Ranges are half-open, so a period ending exactly when another
    /// starts does not overlap it.
    pub fn overlaps(&self, other: &RentalPeriod) -> bool {
        self.starts_at < other.ends_at && other.starts_at < self.ends_at
    }
}

impl std::fmt::Display for RentalPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} .. {}", self.starts_at, self.ends_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn rejects_inverted_and_empty_ranges() {
        assert!(RentalPeriod::new(ts(10), ts(9)).is_err());
        assert!(RentalPeriod::new(ts(10), ts(10)).is_err());
        assert!(RentalPeriod::new(ts(9), ts(10)).is_ok());
    }

    #[test]
    fn overlap_is_symmetric() {
        let a = RentalPeriod::new(ts(1), ts(5)).unwrap();
        let b = RentalPeriod::new(ts(4), ts(8)).unwrap();
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        let a = RentalPeriod::new(ts(1), ts(5)).unwrap();
        let b = RentalPeriod::new(ts(5), ts(8)).unwrap();
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn contained_range_overlaps() {
        let outer = RentalPeriod::new(ts(1), ts(10)).unwrap();
        let inner = RentalPeriod::new(ts(3), ts(4)).unwrap();
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }
}
