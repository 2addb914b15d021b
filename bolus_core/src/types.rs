//! Request and result types for one bolus calculation.
//!
//! A `CalculationRequest` is built fresh by the caller for every invocation
//! and consumed by `BolusCalculator::compute`; a `CalculatedDose` is
//! produced once and read-only afterwards. The core retains neither.

/// Glucose unit system tag. All glucose-valued fields within one
/// calculation must share one unit; the core performs no conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlucoseUnit {
    MgDl,
    Mmol,
}

impl From<bolus_config::GlucoseUnitCfg> for GlucoseUnit {
    fn from(u: bolus_config::GlucoseUnitCfg) -> Self {
        match u {
            bolus_config::GlucoseUnitCfg::Mgdl => Self::MgDl,
            bolus_config::GlucoseUnitCfg::Mmol => Self::Mmol,
        }
    }
}

/// Glucose range considered "in range"; no correction inside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetBand {
    pub low: f64,
    pub high: f64,
}

impl TargetBand {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Inclusive on both bounds: a reading sitting exactly on an edge
    /// contributes zero correction.
    pub fn contains(&self, glucose: f64) -> bool {
        glucose >= self.low && glucose <= self.high
    }

    pub fn is_inverted(&self) -> bool {
        self.low > self.high
    }

    pub fn is_finite(&self) -> bool {
        self.low.is_finite() && self.high.is_finite()
    }
}

/// Immutable view of the active treatment profile at calculation time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileSnapshot {
    pub target: TargetBand,
    /// Glucose drop per unit of insulin (ISF); must be > 0 to contribute.
    pub correction_factor: f64,
    /// Grams of carbohydrate offset per unit of insulin (IC); must be > 0
    /// to contribute.
    pub carb_ratio: f64,
    /// Current scheduled basal rate (units/hour); feeds the superbolus.
    pub basal_rate_u_per_hr: f64,
    pub unit: GlucoseUnit,
}

impl From<bolus_config::ProfileCfg> for ProfileSnapshot {
    fn from(p: bolus_config::ProfileCfg) -> Self {
        Self {
            target: TargetBand::new(p.target_low, p.target_high),
            correction_factor: p.correction_factor,
            carb_ratio: p.carb_ratio,
            basal_rate_u_per_hr: p.basal_rate_u_per_hr,
            unit: p.units.into(),
        }
    }
}

/// The eight independent calculation toggles. Each flag gates exactly one
/// component; interactions are purely additive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WizardOptions {
    /// Include the glucose correction component.
    pub use_bg: bool,
    /// Include the carbohydrate component.
    pub use_cob: bool,
    /// Subtract insulin still active from prior boluses.
    pub include_bolus_iob: bool,
    /// Subtract insulin still active from basal delivery.
    pub include_basal_iob: bool,
    /// Pull withheld future basal forward into this bolus.
    pub use_super_bolus: bool,
    /// Correct against the temp-target band instead of the profile band.
    pub use_tt: bool,
    /// Include the glucose-trend adjustment.
    pub use_trend: bool,
    /// Ask the caller to raise a low-glucose alert for a non-zero dose.
    pub use_alarm: bool,
}

/// Inputs for one calculation. Constructed fresh per call, consumed by
/// `compute`, never retained.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationRequest {
    pub profile: ProfileSnapshot,
    /// Consumed or planned carbohydrates (grams, >= 0).
    pub carbs_g: f64,
    /// Measured glucose; ignored unless `options.use_bg`.
    pub glucose: Option<f64>,
    /// Signed glucose delta per sensor interval; ignored unless
    /// `options.use_trend`.
    pub glucose_trend: Option<f64>,
    /// Replaces the profile band when `options.use_tt` is set.
    pub temp_target: Option<TargetBand>,
    /// Future basal pulled forward by the superbolus (minutes).
    pub superbolus_lookahead_min: u32,
    /// Caller-selected scaling of the proposed total, in percent (100 =
    /// unscaled). Applied before constraint application.
    pub percentage: u32,
    pub options: WizardOptions,
    /// Minimum deliverable dose increment of the connected pump (> 0).
    pub pump_step: f64,
}

impl CalculationRequest {
    /// A request with no carbs, no glucose data and every option off.
    pub fn new(profile: ProfileSnapshot, pump_step: f64) -> Self {
        Self {
            profile,
            carbs_g: 0.0,
            glucose: None,
            glucose_trend: None,
            temp_target: None,
            superbolus_lookahead_min: 0,
            percentage: 100,
            options: WizardOptions::default(),
            pump_step,
        }
    }
}

/// The computed dose, broken into its named contributing components.
///
/// IOB components are stored as the queried magnitudes and subtracted in
/// the aggregate; every other component is added.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatedDose {
    pub carbs_insulin: f64,
    pub correction_insulin: f64,
    pub bolus_iob_insulin: f64,
    pub basal_iob_insulin: f64,
    pub superbolus_insulin: f64,
    pub trend_insulin: f64,
    /// Carbs-on-board from the snapshot, echoed for display; does not
    /// enter the dose sum.
    pub carbs_on_board: f64,
    /// Algebraic sum of the included components, before percentage scaling
    /// and constraints.
    pub total_before_constraints: f64,
    /// Dose after constraint-engine clamping.
    pub total_after_constraints: f64,
    /// Constrained dose rounded to the pump step; the number a caller
    /// displays or dispatches.
    pub calculated_total_insulin: f64,
    /// Ordered advisory messages; never fatal.
    pub warnings: Vec<String>,
    /// True when `use_alarm` was set, glucose was below the effective
    /// band and the final rounded dose is non-zero. The core performs no
    /// alerting itself.
    pub alarm_requested: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_bounds_are_inclusive() {
        let band = TargetBand::new(4.0, 8.0);
        assert!(band.contains(4.0));
        assert!(band.contains(8.0));
        assert!(!band.contains(3.999));
        assert!(!band.contains(8.001));
    }

    #[test]
    fn inverted_band_is_detected() {
        assert!(TargetBand::new(8.0, 4.0).is_inverted());
        assert!(!TargetBand::new(4.0, 4.0).is_inverted());
    }
}
