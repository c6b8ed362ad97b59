//! Analysis configuration.
//!
//! The whole run is described by one TOML file. Every parameter block has
//! defaults, so a configuration only needs to list its inputs:
//!
//! ```toml
//! output_dir = "out"
//! reference_scenario = "paleo"
//!
//! [inputs]
//! segments = "data/segments.csv"
//! control = "data/control.csv"
//! regions = "data/realms.geojson"
//!
//! [[inputs.periods]]
//! label = "PETM"
//! trend = "data/petm_trend.asc"
//! variability = "data/petm_sd.asc"
//!
//! [[inputs.scenarios]]
//! name = "rcp85"
//! layers = [{ time = 2006.0, path = "data/rcp85_2006.asc" }]
//!
//! [overlap]
//! min_cells = 10
//! adjust_method = "benjamini_yekutieli"
//! ```

use crate::errors::{SnrError, SnrResult};
use crate::extremes::ExtremeParameters;
use crate::overlap::OverlapParameters;
use crate::thresholds::ThresholdParameters;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A paleo reference period with its trend and variability rasters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodInput {
    pub label: String,
    pub trend: PathBuf,
    pub variability: PathBuf,
}

/// One layer of a future scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerInput {
    pub time: f64,
    pub path: PathBuf,
}

/// A future scenario given as a time series of layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioInput {
    pub name: String,
    pub layers: Vec<LayerInput>,
}

/// Input file locations. Relative paths are resolved against the
/// directory of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    /// Warming segments table (`label,start,end,rate`)
    pub segments: PathBuf,
    /// Control distribution (`rate` column)
    pub control: PathBuf,
    /// GeoJSON regions
    pub regions: PathBuf,
    pub periods: Vec<PeriodInput>,
    pub scenarios: Vec<ScenarioInput>,
}

impl InputPaths {
    fn resolve_against(&mut self, base: &Path) {
        let fix = |p: &mut PathBuf| {
            if p.is_relative() && !p.as_os_str().is_empty() {
                *p = base.join(&*p);
            }
        };
        fix(&mut self.segments);
        fix(&mut self.control);
        fix(&mut self.regions);
        for period in &mut self.periods {
            fix(&mut period.trend);
            fix(&mut period.variability);
        }
        for scenario in &mut self.scenarios {
            for layer in &mut scenario.layers {
                fix(&mut layer.path);
            }
        }
    }
}

/// Top level configuration of an analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub output_dir: PathBuf,
    /// Scenario label of the aggregated paleo SNR raster
    ///
    /// Default: "paleo"
    pub reference_scenario: String,
    pub inputs: InputPaths,
    pub threshold: ThresholdParameters,
    pub overlap: OverlapParameters,
    pub extremes: ExtremeParameters,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            reference_scenario: "paleo".to_string(),
            inputs: InputPaths::default(),
            threshold: ThresholdParameters::default(),
            overlap: OverlapParameters::default(),
            extremes: ExtremeParameters::default(),
        }
    }
}

impl AnalysisConfig {
    /// Parse and validate a configuration.
    pub fn from_toml_str(s: &str) -> SnrResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Check parameter values that TOML types alone cannot constrain.
    pub fn validate(&self) -> SnrResult<()> {
        self.overlap.density.validate()?;
        if !(self.overlap.alpha > 0.0 && self.overlap.alpha <= 1.0) {
            return Err(SnrError::Error(format!(
                "overlap alpha must lie in (0, 1], got {}",
                self.overlap.alpha
            )));
        }
        let quantiles = std::iter::once(&self.threshold.quantile).chain(&self.extremes.quantiles);
        for &q in quantiles {
            if !(0.0..=1.0).contains(&q) {
                return Err(SnrError::InvalidQuantile(q));
            }
        }
        Ok(())
    }

    /// Read a configuration file and resolve relative paths against its directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SnrResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            config.inputs.resolve_against(base);
            if config.output_dir.is_relative() {
                config.output_dir = base.join(&config.output_dir);
            }
        }
        Ok(config)
    }
}
