//! Dose rounding to the pump's delivery granularity.
//!
//! All arithmetic happens in integer milliunits (mU, 1 mU = 0.001 U) so
//! that half-step ties are exact and the configured tie-break is applied
//! deterministically instead of inheriting whatever `f64::round` does.

use crate::error::{Result, WizardError};

/// Tie-break direction when a dose lands exactly between two pump steps.
///
/// An explicit, reviewed choice: rounding every tie up over-delivers
/// systematically across many calculations, so the default never rounds a
/// tie away from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    #[default]
    TowardZero,
    AwayFromZero,
    ToEven,
}

impl From<bolus_config::TieBreak> for TieBreak {
    fn from(t: bolus_config::TieBreak) -> Self {
        match t {
            bolus_config::TieBreak::TowardZero => Self::TowardZero,
            bolus_config::TieBreak::AwayFromZero => Self::AwayFromZero,
            bolus_config::TieBreak::ToEven => Self::ToEven,
        }
    }
}

/// Keep quantized magnitudes small enough that `2 * r` and `(q + 1) * step`
/// below can never overflow. Far beyond any deliverable dose.
const MAX_MU: i64 = 1 << 40;

/// Quantize a floating-point insulin amount to integer milliunits, rounding
/// to nearest and clamping to a safe range. Non-finite values (NaN/±Inf)
/// map to 0.
#[inline]
pub fn quantize_to_mu(units: f64) -> i64 {
    if !units.is_finite() {
        return 0;
    }
    let scaled = (units * 1000.0).round();
    if scaled >= MAX_MU as f64 {
        MAX_MU
    } else if scaled <= -MAX_MU as f64 {
        -MAX_MU
    } else {
        scaled as i64
    }
}

/// Round `value` to the nearest multiple of `step` (both in mU, `step > 0`),
/// resolving exact half-step ties per `tie`.
fn round_to_multiple(value: i64, step: i64, tie: TieBreak) -> i64 {
    debug_assert!(step > 0, "round_to_multiple: step must be > 0");
    let q = value.div_euclid(step);
    let r = value.rem_euclid(step); // 0..step
    let up = match (2 * r).cmp(&step) {
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Greater => true,
        // Exact tie: q*step and (q+1)*step are equidistant.
        std::cmp::Ordering::Equal => match tie {
            // For value >= 0 the lower multiple is closer to zero; for
            // value < 0 the upper one is.
            TieBreak::TowardZero => value < 0,
            TieBreak::AwayFromZero => value >= 0,
            // Go up iff the lower multiple is odd (in step counts).
            TieBreak::ToEven => q % 2 != 0,
        },
    };
    (q + i64::from(up)) * step
}

/// Rounds real-valued doses to the pump's minimum deliverable increment.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoseRounder {
    tie_break: TieBreak,
}

impl DoseRounder {
    pub fn new(tie_break: TieBreak) -> Self {
        Self { tie_break }
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Round `units` to the nearest multiple of `step`.
    ///
    /// `step <= 0` (or a step below one milliunit) is a structural contract
    /// violation by the caller and returns `WizardError::InvalidPumpStep`.
    pub fn round(&self, units: f64, step: f64) -> Result<f64> {
        if !(step.is_finite() && step > 0.0) {
            return Err(eyre::Report::new(WizardError::InvalidPumpStep(step)));
        }
        let step_mu = quantize_to_mu(step);
        if step_mu <= 0 {
            return Err(eyre::Report::new(WizardError::InvalidPumpStep(step)));
        }
        let value_mu = quantize_to_mu(units);
        let rounded_mu = round_to_multiple(value_mu, step_mu, self.tie_break);
        Ok(rounded_mu as f64 / 1000.0)
    }
}
