//! Signal-to-noise analysis of ocean warming.
//!
//! This crate re-exports [`ocean_snr_core`], which holds the statistical routines.
//! The batch driver lives in the `ocean-snr-run` binary.

pub use ocean_snr_core::*;
