use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A cadence range whose start lies after its end
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Invalid cadence range: start {start} is after end {end}")]
pub struct InvalidCadenceRange {
    pub start: i32,
    pub end: i32,
}

/// Contiguous, inclusive interval of cadences `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CadenceRange {
    start: i32,
    end: i32,
}

impl CadenceRange {
    pub fn new(start: i32, end: i32) -> Result<Self, InvalidCadenceRange> {
        if start > end {
            return Err(InvalidCadenceRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    /// Number of cadences in the range (never zero)
    pub fn len(&self) -> usize {
        (i64::from(self.end) - i64::from(self.start) + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, cadence: i32) -> bool {
        cadence >= self.start && cadence <= self.end
    }
}

impl fmt::Display for CadenceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_length_is_inclusive() {
        let range = CadenceRange::new(100, 199).unwrap();
        assert_eq!(range.len(), 100);
        assert!(range.contains(100));
        assert!(range.contains(199));
        assert!(!range.contains(200));

        assert_eq!(CadenceRange::new(5, 5).unwrap().len(), 1);
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let err = CadenceRange::new(10, 9).unwrap_err();
        assert_eq!(err, InvalidCadenceRange { start: 10, end: 9 });
        assert!(err.to_string().contains("start 10 is after end 9"));
    }
}
