use serde::{Deserialize, Serialize};
use std::fmt;

/// Stages of a processing task, in the order they run.
///
/// A sequence only ever moves forward through these; a phase is never revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Background pixel batches
    Background,
    /// Batches of bright reference targets
    PpaTargets,
    /// Motion polynomials fitted from the reference target results
    MotionPolynomials,
    /// Batches of all remaining targets
    Targets,
    /// Task-wide aggregation of per-target results
    AggregateResults,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Self::Background,
        Self::PpaTargets,
        Self::MotionPolynomials,
        Self::Targets,
        Self::AggregateResults,
    ];

    /// Phases whose bundles carry phase-specific data rather than a batch of work items
    pub fn is_side_phase(&self) -> bool {
        matches!(self, Self::MotionPolynomials | Self::AggregateResults)
    }

    /// Position in the canonical phase order
    pub fn ordinal(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Background => write!(f, "background"),
            Self::PpaTargets => write!(f, "ppa_targets"),
            Self::MotionPolynomials => write!(f, "motion_polynomials"),
            Self::Targets => write!(f, "targets"),
            Self::AggregateResults => write!(f, "aggregate_results"),
        }
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "background" => Ok(Self::Background),
            "ppa_targets" => Ok(Self::PpaTargets),
            "motion_polynomials" => Ok(Self::MotionPolynomials),
            "targets" => Ok(Self::Targets),
            "aggregate_results" => Ok(Self::AggregateResults),
            _ => Err(format!("Invalid phase: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order_matches_declaration() {
        let mut sorted = Phase::ALL;
        sorted.sort();
        assert_eq!(sorted, Phase::ALL);
        assert!(Phase::Background < Phase::AggregateResults);
        assert_eq!(Phase::Targets.ordinal(), 3);
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for phase in Phase::ALL {
            assert_eq!(phase.to_string().parse::<Phase>().unwrap(), phase);
        }
        assert!("ppa".parse::<Phase>().is_err());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_value(Phase::PpaTargets).unwrap(),
            serde_json::json!("ppa_targets")
        );
    }
}
