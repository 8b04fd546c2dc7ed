//! Memory pressure levels
//!
//! Platform memory warnings and the image store's own budget utilization are
//! both expressed as a [`MemoryPressure`] level. Only the two upper levels
//! call for evicting page images.

use std::fmt;

/// Memory pressure level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MemoryPressure {
    /// Less than 50% of the budget in use
    Low,
    /// 50% to 75%
    Moderate,
    /// 75% to 90%, or a platform "warning" signal
    High,
    /// Above 90%, or a platform "critical" signal
    Critical,
}

impl MemoryPressure {
    /// Pressure level for a utilization ratio (0.0 to 1.0)
    pub fn from_utilization(utilization: f64) -> Self {
        if utilization < 0.5 {
            MemoryPressure::Low
        } else if utilization < 0.75 {
            MemoryPressure::Moderate
        } else if utilization < 0.90 {
            MemoryPressure::High
        } else {
            MemoryPressure::Critical
        }
    }

    /// Whether this level should drop the page image cache
    pub fn needs_eviction(&self) -> bool {
        matches!(self, MemoryPressure::High | MemoryPressure::Critical)
    }
}

impl fmt::Display for MemoryPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MemoryPressure::Low => "low",
            MemoryPressure::Moderate => "moderate",
            MemoryPressure::High => "high",
            MemoryPressure::Critical => "critical",
        };
        f.write_str(name)
    }
}
