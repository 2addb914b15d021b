use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum WizardError {
    /// The caller handed a pump step for which rounding is undefined.
    /// This is a structural contract violation, never a physiological edge
    /// case, and is the one hard failure of `compute`.
    #[error("invalid pump step: {0} (must be finite and at least 0.001 U, the rounding granularity)")]
    InvalidPumpStep(f64),
    #[error("physiology query failed: {0}")]
    Physiology(String),
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing physiology query")]
    MissingPhysiology,
    #[error("missing constraint engine")]
    MissingConstraints,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
