//! Wiring a wizard from a persisted TOML config.

use bolus_core::mocks::FixedPhysiology;
use bolus_core::{
    BolusWizard, CalculationRequest, ProfileSnapshot, PumpLimitsConstraints, TieBreak,
    WizardOptions,
};
use bolus_traits::PhysiologySnapshot;
use rstest::rstest;

const CONFIG: &str = r#"
    [pump]
    bolus_step_u = 0.05
    max_bolus_u = 2.0

    [rounding]
    tie_break = "toward-zero"

    [profile]
    target_low = 4.0
    target_high = 8.0
    correction_factor = 20.0
    carb_ratio = 12.0
    basal_rate_u_per_hr = 0.8
    units = "mmol"
"#;

#[rstest]
fn wizard_assembled_from_config_computes_and_honors_pump_limits() {
    let cfg = bolus_config::load_toml(CONFIG).expect("parse");
    cfg.validate().expect("validate");

    let profile: ProfileSnapshot = cfg.profile.expect("profile section").into();
    let wizard = BolusWizard::builder()
        .with_physiology(FixedPhysiology::new(PhysiologySnapshot::default()))
        .with_constraints(PumpLimitsConstraints::new(cfg.pump.max_bolus_u))
        .with_tie_break(TieBreak::from(cfg.rounding.tie_break))
        .with_trend_projection_intervals(cfg.wizard.trend_projection_intervals)
        .build()
        .expect("build");

    let mut req = CalculationRequest::new(profile, cfg.pump.bolus_step_u);
    req.carbs_g = 60.0; // 5 U worth of carbs, beyond the 2 U pump maximum
    req.options = WizardOptions {
        use_cob: true,
        ..WizardOptions::default()
    };
    let dose = wizard.compute(req).expect("compute");

    assert!((dose.total_before_constraints - 5.0).abs() < 1e-9);
    assert_eq!(dose.total_after_constraints, 2.0);
    assert_eq!(dose.calculated_total_insulin, 2.0);
    assert!(dose.warnings.iter().any(|w| w.contains("maximum bolus")));
}
