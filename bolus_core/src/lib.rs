#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core bolus calculation logic (delivery-agnostic).
//!
//! This crate provides the pump-independent bolus wizard. All collaborator
//! interactions go through the `bolus_traits::PhysiologyQuery` and
//! `bolus_traits::ConstraintEngine` traits.
//!
//! ## Architecture
//!
//! - **Types**: profile snapshot, request and result structs (`types` module)
//! - **Calculator**: component formulas and aggregation (`calculator` module)
//! - **Rounding**: pump-step quantization with explicit tie-break (`rounding` module)
//! - **Constraints**: default pump-limit clamping engine (`constraints` module)
//! - **Store**: mutex-guarded IOB/COB snapshot store with background feed (`store` module)
//!
//! ## Fixed-Point Rounding
//!
//! Dose rounding operates in **milliunits** (mU, 1 mU = 0.001 U) using `i64`
//! for deterministic tie handling. See `rounding::quantize_to_mu`.

pub mod calculator;
pub mod constraints;
pub mod error;
pub mod mocks;
pub mod rounding;
pub mod store;
pub mod types;

pub use calculator::{
    BolusCalculator, BolusCalculatorBuilder, BolusWizard, Missing, Set, build_calculator,
};
pub use constraints::PumpLimitsConstraints;
pub use rounding::{DoseRounder, TieBreak};
pub use store::{SnapshotFeed, SnapshotStore};
pub use types::{
    CalculatedDose, CalculationRequest, GlucoseUnit, ProfileSnapshot, TargetBand, WizardOptions,
};
