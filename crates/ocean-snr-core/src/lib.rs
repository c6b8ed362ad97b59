//! Signal-to-noise analysis of ocean warming.
//!
//! Compares the SNR of sea surface temperature change during extreme paleo
//! warming periods with that of future warming scenarios, region by region.
//!
//! The pipeline is a straight chain of library calls:
//! [`thresholds`] selects the paleo periods, [`aggregate`] and [`trend`]
//! turn rasters into SNR rasters, [`normalise`] rescales them jointly,
//! [`sample`] extracts regional samples using [`region`] masks, and
//! [`overlap`] and [`extremes`] compare the samples. [`pipeline::run`] wires
//! everything together from an [`config::AnalysisConfig`].

pub mod adjust;
pub mod aggregate;
pub mod config;
pub mod density;
pub mod errors;
pub mod extremes;
pub mod io;
pub mod ks;
pub mod normalise;
pub mod overlap;
pub mod pipeline;
pub mod raster;
pub mod region;
pub mod sample;
pub mod stats;
pub mod thresholds;
pub mod trend;

pub type FloatValue = f64;

pub use config::AnalysisConfig;
pub use errors::{SnrError, SnrResult};
pub use pipeline::{run, RunSummary};
pub use raster::{GridGeometry, Raster, RasterStack};
