//! The batch analysis run.
//!
//! Steps, each completed before the next begins:
//!
//! 1. Derive the warming threshold and select the extreme paleo periods
//! 2. Aggregate the selected period layers into the reference SNR raster
//! 3. Fit trend and variability of each future scenario stack
//! 4. Rescale all SNR rasters jointly to [0, 1] and write them out
//! 5. Extract regional samples and write the per-cell table
//! 6. Overlap analysis against the reference scenario
//! 7. Extreme-condition counts against the reference scenario

use crate::aggregate::{aggregate_periods, snr_from_stack, PeriodLayer};
use crate::config::{AnalysisConfig, ScenarioInput};
use crate::errors::SnrResult;
use crate::extremes::{count_regional_extremes, ExtremeRecord};
use crate::io::tables::CellRecord;
use crate::io::{
    read_ascii_grid, read_control, read_regions, read_segments, write_ascii_grid,
    write_cell_table, write_extremes_table, write_overlap_table, write_selection_table,
};
use crate::normalise::rescale_combined;
use crate::overlap::{compare_regions, OverlapRecord};
use crate::raster::{Raster, RasterStack};
use crate::region::RegionMask;
use crate::sample::{collect_samples, RegionLabel};
use crate::thresholds::{select_extreme_periods, PeriodSelection};
use crate::FloatValue;
use std::path::PathBuf;
use tracing::{debug, info};

/// Outcome of a run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub selection: PeriodSelection,
    /// Scenario labels in output order, reference first
    pub scenarios: Vec<String>,
    pub overlaps: Vec<OverlapRecord>,
    pub extremes: Vec<ExtremeRecord>,
    /// Every file written
    pub outputs: Vec<PathBuf>,
}

fn load_periods(config: &AnalysisConfig) -> SnrResult<Vec<PeriodLayer>> {
    config
        .inputs
        .periods
        .iter()
        .map(|p| {
            debug!(period = %p.label, trend = ?p.trend, "Reading period layers");
            PeriodLayer::new(
                &p.label,
                read_ascii_grid(&p.trend)?,
                read_ascii_grid(&p.variability)?,
            )
        })
        .collect()
}

fn load_scenario(scenario: &ScenarioInput) -> SnrResult<(RasterStack, Vec<FloatValue>)> {
    let mut layers = scenario.layers.clone();
    layers.sort_by(|a, b| a.time.total_cmp(&b.time));
    let rasters = layers
        .iter()
        .map(|l| read_ascii_grid(&l.path))
        .collect::<SnrResult<Vec<_>>>()?;
    let labels = layers
        .iter()
        .map(|l| format!("{}_{}", scenario.name, l.time))
        .collect();
    let times = layers.iter().map(|l| l.time).collect();
    Ok((RasterStack::from_layers(labels, &rasters)?, times))
}

fn cell_records(labelled: &[(String, Raster)], masks: &[RegionMask]) -> Vec<CellRecord> {
    let mut rows = Vec::new();
    for mask in masks {
        let region = RegionLabel::from(mask);
        for (scenario, raster) in labelled {
            rows.extend(
                mask.extract_cells(raster)
                    .into_iter()
                    .map(|(lon, lat, snr)| CellRecord {
                        scenario: scenario.clone(),
                        region: region.clone(),
                        lon,
                        lat,
                        snr,
                    }),
            );
        }
    }
    rows
}

/// Run the full analysis described by `config`.
pub fn run(config: &AnalysisConfig) -> SnrResult<RunSummary> {
    let out_dir = &config.output_dir;
    std::fs::create_dir_all(out_dir)?;
    let mut outputs = Vec::new();

    let segments = read_segments(&config.inputs.segments)?;
    let control = read_control(&config.inputs.control)?;
    let selection = select_extreme_periods(&segments, &control, &config.threshold)?;
    let path = out_dir.join("selected_periods.csv");
    write_selection_table(&path, &selection)?;
    outputs.push(path);

    let periods = load_periods(config)?;
    let paleo = aggregate_periods(&periods, &selection.labels())?;
    info!(
        periods = selection.selected.len(),
        cells = paleo.snr.n_finite(),
        "Aggregated reference SNR"
    );

    let mut labels = vec![config.reference_scenario.clone()];
    let mut snr = vec![paleo.snr];
    for scenario in &config.inputs.scenarios {
        let (stack, times) = load_scenario(scenario)?;
        snr[0].geometry().ensure_matches(stack.geometry())?;
        let rasters = snr_from_stack(&stack, &times)?;
        info!(
            scenario = %scenario.name,
            layers = stack.n_layers(),
            cells = rasters.snr.n_finite(),
            "Computed scenario SNR"
        );
        labels.push(scenario.name.clone());
        snr.push(rasters.snr);
    }

    let rescaled = rescale_combined(&snr)?;
    let labelled: Vec<(String, Raster)> = labels.iter().cloned().zip(rescaled).collect();
    for (label, raster) in &labelled {
        let path = out_dir.join(format!("snr_{}.asc", label));
        write_ascii_grid(raster, &path)?;
        outputs.push(path);
    }

    let regions = read_regions(&config.inputs.regions)?;
    let geometry = labelled[0].1.geometry().clone();
    let masks: Vec<RegionMask> = regions.iter().map(|r| r.mask(&geometry)).collect();
    for mask in &masks {
        debug!(
            region = %mask.region_name,
            cells = mask.n_cells(),
            area_km2 = mask.area_km2(),
            "Built region mask"
        );
    }
    let path = out_dir.join("snr_cells.csv");
    write_cell_table(&path, &cell_records(&labelled, &masks))?;
    outputs.push(path);

    let collections = collect_samples(&labelled, &masks);
    let overlaps = compare_regions(&collections, &config.reference_scenario, &config.overlap);
    let path = out_dir.join("overlap_summary.csv");
    write_overlap_table(&path, &overlaps)?;
    outputs.push(path);

    let extremes =
        count_regional_extremes(&collections, &config.reference_scenario, &config.extremes)?;
    let path = out_dir.join("extremes.csv");
    write_extremes_table(&path, &extremes)?;
    outputs.push(path);

    info!(
        scenarios = labels.len(),
        regions = masks.len(),
        outputs = outputs.len(),
        output_dir = ?out_dir,
        "Analysis complete"
    );
    Ok(RunSummary {
        selection,
        scenarios: labels,
        overlaps,
        extremes,
        outputs,
    })
}
