use bolus_core::mocks::{FixedPhysiology, PassthroughConstraints};
use bolus_core::{
    BolusWizard, CalculationRequest, GlucoseUnit, ProfileSnapshot, TargetBand, WizardOptions,
};
use bolus_traits::PhysiologySnapshot;
use proptest::prelude::*;

fn profile() -> ProfileSnapshot {
    ProfileSnapshot {
        target: TargetBand::new(4.0, 8.0),
        correction_factor: 20.0,
        carb_ratio: 12.0,
        basal_rate_u_per_hr: 0.8,
        unit: GlucoseUnit::Mmol,
    }
}

fn wizard() -> BolusWizard {
    BolusWizard::builder()
        .with_physiology(FixedPhysiology::new(PhysiologySnapshot {
            bolus_iob: 0.4,
            basal_iob: 0.1,
            cob: 12.0,
        }))
        .with_constraints(PassthroughConstraints)
        .build()
        .unwrap()
}

fn request(glucose: f64, carbs: f64, step: f64) -> CalculationRequest {
    let mut req = CalculationRequest::new(profile(), step);
    req.carbs_g = carbs;
    req.glucose = Some(glucose);
    req.options = WizardOptions {
        use_bg: true,
        use_cob: true,
        include_bolus_iob: true,
        include_basal_iob: true,
        ..WizardOptions::default()
    };
    req
}

proptest! {
    // Any two readings inside the target band yield the same dose,
    // independent of where inside the band they fall.
    #[test]
    fn in_band_readings_share_one_dose(
        g1 in 4.0f64..=8.0,
        g2 in 4.0f64..=8.0,
        carbs in 0.0f64..150.0,
    ) {
        let w = wizard();
        let d1 = w.compute(request(g1, carbs, 0.1)).unwrap();
        let d2 = w.compute(request(g2, carbs, 0.1)).unwrap();
        prop_assert_eq!(d1.correction_insulin, 0.0);
        prop_assert_eq!(d2.correction_insulin, 0.0);
        prop_assert_eq!(d1.calculated_total_insulin, d2.calculated_total_insulin);
    }

    // Above the band, a higher reading never doses less.
    #[test]
    fn dose_is_monotone_above_the_band(
        g in 8.01f64..25.0,
        delta in 0.0f64..10.0,
        carbs in 0.0f64..150.0,
    ) {
        let w = wizard();
        let lower = w.compute(request(g, carbs, 0.1)).unwrap();
        let higher = w.compute(request(g + delta, carbs, 0.1)).unwrap();
        prop_assert!(higher.calculated_total_insulin >= lower.calculated_total_insulin);
    }

    // Below the band, a lower reading never doses more.
    #[test]
    fn dose_is_monotone_below_the_band(
        g in 1.0f64..3.99,
        delta in 0.0f64..2.0,
        carbs in 0.0f64..150.0,
    ) {
        let w = wizard();
        let higher_bg = w.compute(request(g, carbs, 0.1)).unwrap();
        let lower_bg = w.compute(request((g - delta).max(0.5), carbs, 0.1)).unwrap();
        prop_assert!(lower_bg.calculated_total_insulin <= higher_bg.calculated_total_insulin);
    }

    // The final dose always sits on the pump's delivery grid.
    #[test]
    fn rounded_dose_lands_on_the_pump_grid(
        g in 1.0f64..25.0,
        carbs in 0.0f64..200.0,
        step_idx in 0usize..5,
    ) {
        let step = [0.025, 0.05, 0.1, 0.5, 1.0][step_idx];
        let dose = wizard().compute(request(g, carbs, step)).unwrap();
        let mu = (dose.calculated_total_insulin * 1000.0).round() as i64;
        let step_mu = (step * 1000.0).round() as i64;
        prop_assert_eq!(mu % step_mu, 0, "dose {} not a multiple of step {}", dose.calculated_total_insulin, step);
    }

    // Repeating a request against an unchanged snapshot is bit-identical.
    #[test]
    fn compute_is_idempotent(
        g in 1.0f64..25.0,
        carbs in 0.0f64..200.0,
    ) {
        let w = wizard();
        let req = request(g, carbs, 0.05);
        let first = w.compute(req.clone()).unwrap();
        let second = w.compute(req).unwrap();
        prop_assert_eq!(first, second);
    }
}
