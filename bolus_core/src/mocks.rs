//! Test and helper fakes for bolus_core.
//!
//! Lightweight stand-ins implementing the narrow collaborator contracts;
//! tests construct these directly instead of intercepting calls.

use bolus_traits::{ConstrainedDose, ConstraintEngine, PhysiologyQuery, PhysiologySnapshot};

/// A physiology query that returns the same snapshot on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPhysiology {
    pub snapshot: PhysiologySnapshot,
}

impl FixedPhysiology {
    pub fn new(snapshot: PhysiologySnapshot) -> Self {
        Self { snapshot }
    }

    /// Zero IOB and COB; the baseline for the scenario tests.
    pub fn zero() -> Self {
        Self::default()
    }
}

impl PhysiologyQuery for FixedPhysiology {
    fn snapshot(
        &self,
        _at_ms: u64,
    ) -> Result<PhysiologySnapshot, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.snapshot)
    }
}

/// A physiology query that always errors; useful for exercising the
/// infrastructure-failure path of `compute`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingPhysiology;

impl PhysiologyQuery for FailingPhysiology {
    fn snapshot(
        &self,
        _at_ms: u64,
    ) -> Result<PhysiologySnapshot, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("physiology store offline")))
    }
}

/// A constraint engine that applies no clamping at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughConstraints;

impl ConstraintEngine for PassthroughConstraints {
    fn apply(&self, proposed_units: f64) -> ConstrainedDose {
        ConstrainedDose {
            units: proposed_units,
            warnings: Vec::new(),
        }
    }
}
