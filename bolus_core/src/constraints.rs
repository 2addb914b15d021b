//! Default pump-limit constraint engine.
//!
//! Clamps a proposed dose to `[0, max_bolus_u]` and records every applied
//! adjustment. Systems with a physician-configured checker supply their own
//! `ConstraintEngine` implementation instead.

use bolus_traits::{ConstrainedDose, ConstraintEngine};

#[derive(Debug, Clone, Copy)]
pub struct PumpLimitsConstraints {
    pub max_bolus_u: f64,
}

impl PumpLimitsConstraints {
    pub fn new(max_bolus_u: f64) -> Self {
        Self { max_bolus_u }
    }
}

impl ConstraintEngine for PumpLimitsConstraints {
    fn apply(&self, proposed_units: f64) -> ConstrainedDose {
        let mut warnings = Vec::new();
        // A non-finite proposal must not reach the pump in any form.
        let mut units = if proposed_units.is_finite() {
            proposed_units
        } else {
            warnings.push("proposed dose is not finite; limited to 0 U".to_string());
            0.0
        };
        if units < 0.0 {
            warnings.push("negative dose limited to 0 U".to_string());
            units = 0.0;
        }
        if self.max_bolus_u.is_finite() && units > self.max_bolus_u {
            warnings.push(format!("dose limited to maximum bolus {} U", self.max_bolus_u));
            units = self.max_bolus_u;
        }
        ConstrainedDose { units, warnings }
    }
}
