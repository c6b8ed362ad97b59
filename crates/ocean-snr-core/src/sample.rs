//! Regional sample collections.
//!
//! A [`SampleCollection`] is the bag of SNR values of one scenario inside one
//! region. Collections are built from rescaled scenario rasters and region masks.

use crate::raster::Raster;
use crate::region::RegionMask;
use crate::FloatValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Identifier of a region in output tables.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegionLabel {
    pub id: i64,
    pub name: String,
}

impl RegionLabel {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

impl From<&RegionMask> for RegionLabel {
    fn from(mask: &RegionMask) -> Self {
        Self::new(mask.region_id, &mask.region_name)
    }
}

/// SNR values of one scenario in one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleCollection {
    pub scenario: String,
    pub region: RegionLabel,
    pub values: Vec<FloatValue>,
    /// Number of grid cells in the region, including cells without data
    pub region_cells: usize,
}

impl SampleCollection {
    pub fn new(
        scenario: &str,
        region: RegionLabel,
        values: Vec<FloatValue>,
        region_cells: usize,
    ) -> Self {
        Self {
            scenario: scenario.to_string(),
            region,
            values: values.into_iter().filter(|v| v.is_finite()).collect(),
            region_cells,
        }
    }

    /// Extract the finite cells of `raster` inside `mask`.
    pub fn from_raster(scenario: &str, mask: &RegionMask, raster: &Raster) -> Self {
        Self::new(
            scenario,
            RegionLabel::from(mask),
            mask.extract(raster),
            mask.n_cells(),
        )
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Build collections for every scenario raster and every region mask.
///
/// `rasters` pairs a scenario label with its (rescaled) SNR raster.
pub fn collect_samples(
    rasters: &[(String, Raster)],
    masks: &[RegionMask],
) -> Vec<SampleCollection> {
    masks
        .iter()
        .flat_map(|mask| {
            rasters
                .iter()
                .map(move |(scenario, raster)| SampleCollection::from_raster(scenario, mask, raster))
        })
        .collect()
}

/// Group collections by region, keeping only regions where every collection
/// has at least `min_cells` values.
pub fn group_by_region(
    collections: &[SampleCollection],
    min_cells: usize,
) -> BTreeMap<RegionLabel, Vec<&SampleCollection>> {
    let mut grouped: BTreeMap<RegionLabel, Vec<&SampleCollection>> = BTreeMap::new();
    for c in collections {
        grouped.entry(c.region.clone()).or_default().push(c);
    }
    grouped.retain(|region, members| {
        let smallest = members.iter().map(|c| c.len()).min().unwrap_or(0);
        let keep = smallest >= min_cells;
        if !keep {
            info!(
                region = %region.name,
                region_id = region.id,
                cells = smallest,
                min_cells,
                "Excluding region below minimum cell count"
            );
        }
        keep
    });
    grouped
}
