use bolus_core::mocks::{FixedPhysiology, PassthroughConstraints};
use bolus_core::{
    CalculationRequest, GlucoseUnit, ProfileSnapshot, TargetBand, TieBreak, WizardOptions,
    build_calculator,
};
use bolus_traits::PhysiologySnapshot;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn bench_compute(c: &mut Criterion) {
    let calc = build_calculator(
        FixedPhysiology::new(PhysiologySnapshot {
            bolus_iob: 0.6,
            basal_iob: 0.2,
            cob: 24.0,
        }),
        PassthroughConstraints,
        TieBreak::TowardZero,
        3.0,
        None,
    )
    .unwrap();

    let profile = ProfileSnapshot {
        target: TargetBand::new(4.0, 8.0),
        correction_factor: 20.0,
        carb_ratio: 12.0,
        basal_rate_u_per_hr: 0.8,
        unit: GlucoseUnit::Mmol,
    };
    let mut request = CalculationRequest::new(profile, 0.05);
    request.carbs_g = 45.0;
    request.glucose = Some(9.8);
    request.glucose_trend = Some(0.3);
    request.superbolus_lookahead_min = 120;
    request.options = WizardOptions {
        use_bg: true,
        use_cob: true,
        include_bolus_iob: true,
        include_basal_iob: true,
        use_super_bolus: true,
        use_trend: true,
        ..WizardOptions::default()
    };

    c.bench_function("compute_all_components", |b| {
        b.iter(|| calc.compute(black_box(request.clone())).unwrap())
    });
}

criterion_group!(benches, bench_compute);
criterion_main!(benches);
