#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas for the bolus wizard.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Validation is strict: a persisted file with a non-positive carb ratio
//!   or an inverted target band fails loudly here, while the calculation
//!   core merely neutralizes the same defect at compute time. Both layers
//!   exist on purpose.
use serde::Deserialize;
use std::path::Path;

/// Delivery capabilities of the connected pump.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct PumpCfg {
    /// Smallest deliverable bolus increment (insulin units).
    pub bolus_step_u: f64,
    /// Hard ceiling for a single bolus (insulin units).
    pub max_bolus_u: f64,
}

impl Default for PumpCfg {
    fn default() -> Self {
        Self {
            bolus_step_u: 0.05,
            max_bolus_u: 10.0,
        }
    }
}

/// Wizard tuning knobs.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct WizardCfg {
    /// Future basal pulled forward when superbolus is enabled (minutes).
    pub superbolus_lookahead_min: u32,
    /// Trend intervals projected forward for the trend component.
    /// The source data is a per-interval glucose delta; 3 intervals of
    /// 5-minute deltas projects 15 minutes ahead.
    pub trend_projection_intervals: f64,
}

impl Default for WizardCfg {
    fn default() -> Self {
        Self {
            superbolus_lookahead_min: 120,
            trend_projection_intervals: 3.0,
        }
    }
}

/// Tie-break direction when a dose lands exactly between two pump steps.
///
/// This is a reviewed safety choice, not a platform default: rounding every
/// tie up over-delivers systematically across many calculations.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    #[default]
    TowardZero,
    AwayFromZero,
    ToEven,
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
#[serde(default)]
pub struct RoundingCfg {
    pub tie_break: TieBreak,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
}

impl Logging {
    /// Install the global `tracing` subscriber described by this section.
    ///
    /// With `file` set, log lines go to that file as JSON; the returned
    /// guard must be held for the life of the program so buffered lines are
    /// flushed on exit. Without one, human-readable output goes to stderr.
    /// `level` accepts anything `EnvFilter` parses ("info", "debug",
    /// "bolus_core=trace", ...); unset means "info".
    pub fn init(&self) -> eyre::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
        let filter =
            tracing_subscriber::EnvFilter::try_new(self.level.as_deref().unwrap_or("info"))
                .map_err(|e| eyre::eyre!("logging.level: {e}"))?;
        match self.file.as_deref() {
            Some(file) => {
                let path = Path::new(file);
                let dir = match path.parent() {
                    Some(p) if !p.as_os_str().is_empty() => p,
                    _ => Path::new("."),
                };
                let name = path
                    .file_name()
                    .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;
                let (writer, guard) =
                    tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
                tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(writer)
                    .try_init()
                    .map_err(|e| eyre::eyre!("installing log subscriber: {e}"))?;
                Ok(Some(guard))
            }
            None => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .try_init()
                    .map_err(|e| eyre::eyre!("installing log subscriber: {e}"))?;
                Ok(None)
            }
        }
    }
}

/// Glucose unit system tag; all glucose values in one calculation share one.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GlucoseUnitCfg {
    Mgdl,
    Mmol,
}

/// Optional persisted treatment profile.
///
/// Glucose-valued fields (`target_low`, `target_high`, `correction_factor`)
/// are expressed in `units`.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ProfileCfg {
    pub target_low: f64,
    pub target_high: f64,
    /// Glucose drop per unit of insulin (ISF).
    pub correction_factor: f64,
    /// Grams of carbohydrate offset per unit of insulin (IC).
    pub carb_ratio: f64,
    /// Current scheduled basal rate (units/hour); feeds the superbolus.
    #[serde(default)]
    pub basal_rate_u_per_hr: f64,
    pub units: GlucoseUnitCfg,
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub pump: PumpCfg,
    #[serde(default)]
    pub wizard: WizardCfg,
    #[serde(default)]
    pub rounding: RoundingCfg,
    #[serde(default)]
    pub logging: Logging,
    /// Optional persisted default profile; callers usually supply a live
    /// snapshot per calculation instead.
    #[serde(default)]
    pub profile: Option<ProfileCfg>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    /// Read and parse a TOML config file. Does not validate; call
    /// `validate()` before handing values to the core.
    pub fn from_path(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("reading config {}: {e}", path.display()))?;
        load_toml(&raw).map_err(|e| eyre::eyre!("parsing config {}: {e}", path.display()))
    }

    pub fn validate(&self) -> eyre::Result<()> {
        if !(self.pump.bolus_step_u.is_finite() && self.pump.bolus_step_u > 0.0) {
            eyre::bail!("pump.bolus_step_u must be > 0");
        }
        if !(self.pump.max_bolus_u.is_finite() && self.pump.max_bolus_u > 0.0) {
            eyre::bail!("pump.max_bolus_u must be > 0");
        }
        if !(self.wizard.trend_projection_intervals.is_finite()
            && self.wizard.trend_projection_intervals > 0.0)
        {
            eyre::bail!("wizard.trend_projection_intervals must be > 0");
        }
        if let Some(p) = &self.profile {
            if !(p.correction_factor.is_finite() && p.correction_factor > 0.0) {
                eyre::bail!("profile.correction_factor must be > 0");
            }
            if !(p.carb_ratio.is_finite() && p.carb_ratio > 0.0) {
                eyre::bail!("profile.carb_ratio must be > 0");
            }
            if !(p.target_low.is_finite() && p.target_high.is_finite()) {
                eyre::bail!("profile target band must be finite");
            }
            if p.target_low > p.target_high {
                eyre::bail!("profile.target_low must be <= profile.target_high");
            }
            if !(p.basal_rate_u_per_hr.is_finite() && p.basal_rate_u_per_hr >= 0.0) {
                eyre::bail!("profile.basal_rate_u_per_hr must be >= 0");
            }
        }
        Ok(())
    }
}
