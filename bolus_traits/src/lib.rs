//! Collaborator contracts for the bolus wizard.
//!
//! The calculation core talks to the surrounding system exclusively through
//! the traits in this crate: `PhysiologyQuery` for the IOB/COB view,
//! `ConstraintEngine` for dose clamping, and `Clock` for snapshot
//! timestamps. Implementations live elsewhere (the core ships a
//! mutex-guarded store and a pump-limit engine; applications may bring
//! their own).

pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// One internally consistent view of active insulin and carbohydrates.
///
/// All three fields must be computed against the same instant; producers
/// publish whole snapshots so readers can never observe a torn view.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhysiologySnapshot {
    /// Insulin still active from prior boluses (units).
    pub bolus_iob: f64,
    /// Insulin still active from basal delivery (units, signed; may be
    /// negative while running below the scheduled baseline).
    pub basal_iob: f64,
    /// Carbohydrates still being absorbed (grams).
    pub cob: f64,
}

/// Result of constraint application: the clamped dose plus every adjustment
/// that was applied, in order. Clamping must never be silent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstrainedDose {
    pub units: f64,
    pub warnings: Vec<String>,
}

/// Atomic multi-field read of the IOB/COB state as of `at_ms`.
///
/// The core calls this exactly once per calculation; the bolus-IOB,
/// basal-IOB and COB values used within one dose must come from one call.
pub trait PhysiologyQuery {
    fn snapshot(
        &self,
        at_ms: u64,
    ) -> Result<PhysiologySnapshot, Box<dyn std::error::Error + Send + Sync>>;
}

/// Pure clamping of a proposed dose to whatever bounds the implementation
/// knows about (pump capability, physician-configured maxima).
pub trait ConstraintEngine {
    fn apply(&self, proposed_units: f64) -> ConstrainedDose;
}

impl<T: PhysiologyQuery + ?Sized> PhysiologyQuery for Box<T> {
    fn snapshot(
        &self,
        at_ms: u64,
    ) -> Result<PhysiologySnapshot, Box<dyn std::error::Error + Send + Sync>> {
        (**self).snapshot(at_ms)
    }
}

impl<T: ConstraintEngine + ?Sized> ConstraintEngine for Box<T> {
    fn apply(&self, proposed_units: f64) -> ConstrainedDose {
        (**self).apply(proposed_units)
    }
}
