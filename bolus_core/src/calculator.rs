//! The bolus wizard: combines profile, glucose, carbs, IOB/COB and option
//! flags into one constrained, pump-rounded dose.
//!
//! `compute` is a total function for well-formed input: a missing glucose
//! reading, a disabled flag or a misconfigured profile each degrade to a
//! zero contribution from the affected component, never an abort. The only
//! hard failures are a non-positive pump step (structural contract
//! violation by the caller) and a failing physiology query.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use bolus_traits::{Clock, ConstraintEngine, MonotonicClock, PhysiologyQuery};
use eyre::WrapErr;

use crate::error::{BuildError, Result, WizardError};
use crate::rounding::{DoseRounder, TieBreak};
use crate::types::{CalculatedDose, CalculationRequest, TargetBand};

/// Default trend projection span, in sensor intervals. Three 5-minute
/// deltas project 15 minutes ahead.
pub const DEFAULT_TREND_PROJECTION_INTERVALS: f64 = 3.0;

/// Statically dispatched calculator over concrete collaborators.
pub struct BolusCalculator<P: PhysiologyQuery, C: ConstraintEngine> {
    physiology: P,
    constraints: C,
    rounder: DoseRounder,
    trend_projection_intervals: f64,
    clock: Arc<dyn Clock + Send + Sync>,
    // Epoch Instant for computing snapshot timestamps
    epoch: Instant,
}

impl<P: PhysiologyQuery, C: ConstraintEngine> core::fmt::Debug for BolusCalculator<P, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BolusCalculator")
            .field("tie_break", &self.rounder.tie_break())
            .field(
                "trend_projection_intervals",
                &self.trend_projection_intervals,
            )
            .finish()
    }
}

impl<P: PhysiologyQuery, C: ConstraintEngine> BolusCalculator<P, C> {
    /// Compute one recommended dose from `request`.
    ///
    /// Acquires exactly one physiology snapshot, so the bolus-IOB,
    /// basal-IOB and COB values used here are mutually consistent even
    /// while a background refresh is writing the store.
    pub fn compute(&self, request: CalculationRequest) -> Result<CalculatedDose> {
        // Validate the pump step before touching any collaborator.
        if !(request.pump_step.is_finite() && request.pump_step > 0.0) {
            return Err(eyre::Report::new(WizardError::InvalidPumpStep(
                request.pump_step,
            )));
        }

        let mut warnings: Vec<String> = Vec::new();
        let profile = &request.profile;
        let opts = request.options;

        let now_ms = self.clock.ms_since(self.epoch);
        let snapshot = self
            .physiology
            .snapshot(now_ms)
            .map_err(|e| eyre::Report::new(WizardError::Physiology(e.to_string())))
            .wrap_err("acquiring physiology snapshot")?;

        let isf_ok = profile.correction_factor.is_finite() && profile.correction_factor > 0.0;
        let ic_ok = profile.carb_ratio.is_finite() && profile.carb_ratio > 0.0;

        // Degenerate optional inputs resolve to "absent", not to NaN sums.
        let glucose = request.glucose.filter(|g| g.is_finite());
        let trend = request.glucose_trend.filter(|t| t.is_finite());

        // Carb component
        let carbs_insulin = if opts.use_cob {
            if !ic_ok {
                tracing::warn!(
                    carb_ratio = profile.carb_ratio,
                    "carb ratio not positive; carb component zeroed"
                );
                warnings.push("carb ratio must be > 0; carb component zeroed".to_string());
                0.0
            } else if !(request.carbs_g.is_finite() && request.carbs_g >= 0.0) {
                warnings.push(
                    "carbs must be a finite non-negative amount; carb component zeroed".to_string(),
                );
                0.0
            } else {
                request.carbs_g / profile.carb_ratio
            }
        } else {
            0.0
        };

        // Effective band: temp target wins only when the flag is set and an
        // override was actually supplied.
        let band: TargetBand = if opts.use_tt {
            request.temp_target.unwrap_or(profile.target)
        } else {
            profile.target
        };
        let band_ok = band.is_finite() && !band.is_inverted();

        let wants_correction = opts.use_bg && glucose.is_some();
        let wants_trend = opts.use_trend && trend.is_some();

        if (wants_correction || wants_trend) && !isf_ok {
            tracing::warn!(
                correction_factor = profile.correction_factor,
                "correction factor not positive; correction and trend zeroed"
            );
            warnings.push(
                "correction factor must be > 0; correction and trend components zeroed"
                    .to_string(),
            );
        }
        if wants_correction && !band_ok {
            warnings.push("target band is invalid (low > high); correction zeroed".to_string());
        }

        // Correction component: band-relative, never midpoint-relative. Any
        // reading inside the band, edges included, contributes exactly 0.
        let correction_insulin = match glucose {
            Some(bg) if opts.use_bg && isf_ok && band_ok => {
                if bg > band.high {
                    (bg - band.high) / profile.correction_factor
                } else if bg < band.low {
                    (bg - band.low) / profile.correction_factor
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };

        // IOB components, both from the one snapshot taken above.
        let bolus_iob_insulin = if opts.include_bolus_iob {
            snapshot.bolus_iob
        } else {
            0.0
        };
        let basal_iob_insulin = if opts.include_basal_iob {
            snapshot.basal_iob
        } else {
            0.0
        };

        // Superbolus: future basal pulled forward into this bolus.
        let superbolus_insulin = if opts.use_super_bolus {
            let rate = profile.basal_rate_u_per_hr;
            if !(rate.is_finite() && rate >= 0.0) {
                warnings.push("basal rate must be >= 0; superbolus zeroed".to_string());
                0.0
            } else {
                rate * f64::from(request.superbolus_lookahead_min) / 60.0
            }
        } else {
            0.0
        };

        // Trend component: signed and uncapped here; capping transient
        // sensor spikes is the constraint engine's concern.
        let trend_insulin = match trend {
            Some(delta) if opts.use_trend && isf_ok => {
                delta * self.trend_projection_intervals / profile.correction_factor
            }
            _ => 0.0,
        };

        let total_before_constraints = carbs_insulin + correction_insulin - bolus_iob_insulin
            - basal_iob_insulin
            + superbolus_insulin
            + trend_insulin;

        let proposed = total_before_constraints * f64::from(request.percentage) / 100.0;

        let constrained = self.constraints.apply(proposed);
        let total_after_constraints = constrained.units;
        warnings.extend(constrained.warnings);

        let calculated_total_insulin = self
            .rounder
            .round(total_after_constraints, request.pump_step)?;

        // Forward the alarm intent only; alerting itself is the caller's job.
        let alarm_requested = opts.use_alarm
            && calculated_total_insulin != 0.0
            && opts.use_bg
            && glucose.is_some_and(|bg| bg < band.low);

        tracing::debug!(
            carbs_insulin,
            correction_insulin,
            bolus_iob_insulin,
            basal_iob_insulin,
            superbolus_insulin,
            trend_insulin,
            total_before_constraints,
            total_after_constraints,
            calculated_total_insulin,
            "bolus computed"
        );

        Ok(CalculatedDose {
            carbs_insulin,
            correction_insulin,
            bolus_iob_insulin,
            basal_iob_insulin,
            superbolus_insulin,
            trend_insulin,
            carbs_on_board: snapshot.cob,
            total_before_constraints,
            total_after_constraints,
            calculated_total_insulin,
            warnings,
            alarm_requested,
        })
    }
}

/// Public dynamic (boxed) wizard that callers assemble via the builder.
pub struct BolusWizard {
    inner: BolusCalculator<Box<dyn PhysiologyQuery>, Box<dyn ConstraintEngine>>,
}

impl core::fmt::Debug for BolusWizard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BolusWizard")
            .field("tie_break", &self.inner.rounder.tie_break())
            .finish()
    }
}

impl BolusWizard {
    /// Start building a BolusWizard.
    pub fn builder() -> BolusCalculatorBuilder<Missing, Missing> {
        BolusCalculatorBuilder::default()
    }

    /// Compute one recommended dose from `request`.
    pub fn compute(&self, request: CalculationRequest) -> Result<CalculatedDose> {
        self.inner.compute(request)
    }
}

// Type-state markers for the builder
pub struct Missing;
pub struct Set;

/// Builder for `BolusWizard`. The physiology query and constraint engine
/// are mandatory; `build()` is only available once both are set, while
/// `try_build()` reports a typed `BuildError` from any state.
pub struct BolusCalculatorBuilder<P, C> {
    physiology: Option<Box<dyn PhysiologyQuery>>,
    constraints: Option<Box<dyn ConstraintEngine>>,
    tie_break: Option<TieBreak>,
    trend_projection_intervals: Option<f64>,
    // Optional clock for tests (accept Box here)
    clock: Option<Box<dyn Clock + Send + Sync>>,
    // Type-state markers
    _p: PhantomData<P>,
    _c: PhantomData<C>,
}

impl Default for BolusCalculatorBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            physiology: None,
            constraints: None,
            tie_break: None,
            trend_projection_intervals: None,
            clock: None,
            _p: PhantomData,
            _c: PhantomData,
        }
    }
}

impl<P, C> BolusCalculatorBuilder<P, C> {
    /// Fallible build available in any type-state; returns a detailed
    /// BuildError for missing pieces.
    pub fn try_build(self) -> Result<BolusWizard> {
        let BolusCalculatorBuilder {
            physiology,
            constraints,
            tie_break,
            trend_projection_intervals,
            clock,
            _p: _,
            _c: _,
        } = self;

        let physiology =
            physiology.ok_or_else(|| eyre::Report::new(BuildError::MissingPhysiology))?;
        let constraints =
            constraints.ok_or_else(|| eyre::Report::new(BuildError::MissingConstraints))?;

        let tie_break = tie_break.unwrap_or_default();
        let trend_projection_intervals =
            trend_projection_intervals.unwrap_or(DEFAULT_TREND_PROJECTION_INTERVALS);
        if !(trend_projection_intervals.is_finite() && trend_projection_intervals > 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "trend_projection_intervals must be > 0",
            )));
        }
        let clock: Arc<dyn Clock + Send + Sync> = match clock {
            Some(b) => Arc::from(b),
            None => Arc::new(MonotonicClock::new()),
        };
        let epoch = clock.now();

        Ok(BolusWizard {
            inner: BolusCalculator {
                physiology,
                constraints,
                rounder: DoseRounder::new(tie_break),
                trend_projection_intervals,
                clock,
                epoch,
            },
        })
    }
}

/// Chainable setters that do not affect type-state
impl<P, C> BolusCalculatorBuilder<P, C> {
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = Some(tie_break);
        self
    }
    pub fn with_trend_projection_intervals(mut self, intervals: f64) -> Self {
        self.trend_projection_intervals = Some(intervals);
        self
    }
    /// Provide a custom clock implementation; defaults to MonotonicClock
    /// when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state when providing mandatory collaborators
impl<C> BolusCalculatorBuilder<Missing, C> {
    pub fn with_physiology(
        self,
        physiology: impl PhysiologyQuery + 'static,
    ) -> BolusCalculatorBuilder<Set, C> {
        let BolusCalculatorBuilder {
            physiology: _,
            constraints,
            tie_break,
            trend_projection_intervals,
            clock,
            _p: _,
            _c: _,
        } = self;
        BolusCalculatorBuilder {
            physiology: Some(Box::new(physiology)),
            constraints,
            tie_break,
            trend_projection_intervals,
            clock,
            _p: PhantomData,
            _c: PhantomData,
        }
    }
}

impl<P> BolusCalculatorBuilder<P, Missing> {
    pub fn with_constraints(
        self,
        constraints: impl ConstraintEngine + 'static,
    ) -> BolusCalculatorBuilder<P, Set> {
        let BolusCalculatorBuilder {
            physiology,
            constraints: _,
            tie_break,
            trend_projection_intervals,
            clock,
            _p: _,
            _c: _,
        } = self;
        BolusCalculatorBuilder {
            physiology,
            constraints: Some(Box::new(constraints)),
            tie_break,
            trend_projection_intervals,
            clock,
            _p: PhantomData,
            _c: PhantomData,
        }
    }
}

impl BolusCalculatorBuilder<Set, Set> {
    /// Validate and build the wizard. Only available when both the
    /// physiology query and the constraint engine are set.
    pub fn build(self) -> Result<BolusWizard> {
        self.try_build()
    }
}

/// Build a generic, statically-dispatched calculator from concrete
/// collaborators.
pub fn build_calculator<P, C>(
    physiology: P,
    constraints: C,
    tie_break: TieBreak,
    trend_projection_intervals: f64,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<BolusCalculator<P, C>>
where
    P: PhysiologyQuery + 'static,
    C: ConstraintEngine + 'static,
{
    if !(trend_projection_intervals.is_finite() && trend_projection_intervals > 0.0) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "trend_projection_intervals must be > 0",
        )));
    }
    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    let epoch = clock.now();
    Ok(BolusCalculator {
        physiology,
        constraints,
        rounder: DoseRounder::new(tie_break),
        trend_projection_intervals,
        clock,
        epoch,
    })
}
