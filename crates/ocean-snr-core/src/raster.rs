//! Regular latitude/longitude raster grids.
//!
//! This module provides the grid types every other stage works on:
//!
//! - [`GridGeometry`]: shape, origin, cell size and coordinate reference system
//! - [`Raster`]: a single 2D layer of cell values
//! - [`RasterStack`]: an ordered set of layers sharing one geometry
//!
//! Missing cells (land, outside the model domain) are stored as NaN.
//! Row 0 is the northernmost row, matching the ESRI ASCII grid layout.
//!
//! # Examples
//!
//! ```rust
//! use ocean_snr_core::raster::{GridGeometry, Raster};
//!
//! let geometry = GridGeometry::global(10.0);
//! assert_eq!(geometry.ncols, 36);
//! assert_eq!(geometry.nrows, 18);
//!
//! let raster = Raster::filled(geometry, 1.5);
//! assert_eq!(raster.n_finite(), 36 * 18);
//! ```

use crate::errors::{SnrError, SnrResult};
use crate::FloatValue;
use ndarray::{Array2, Array3, ArrayView2, Axis, Zip};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in km (IUGG).
pub const EARTH_RADIUS_KM: FloatValue = 6371.0088;

/// Default coordinate reference system for model grids.
pub const WGS84: &str = "EPSG:4326";

/// Shape and placement of a regular lon/lat grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub ncols: usize,
    pub nrows: usize,
    /// Longitude of the western edge
    pub xll_corner: FloatValue,
    /// Latitude of the southern edge
    pub yll_corner: FloatValue,
    /// Cell size in degrees (square cells)
    pub cell_size: FloatValue,
    pub crs: String,
}

impl GridGeometry {
    pub fn new(
        ncols: usize,
        nrows: usize,
        xll_corner: FloatValue,
        yll_corner: FloatValue,
        cell_size: FloatValue,
    ) -> Self {
        Self {
            ncols,
            nrows,
            xll_corner,
            yll_corner,
            cell_size,
            crs: WGS84.to_string(),
        }
    }

    /// A global grid spanning -180..180, -90..90 at `cell_size` degrees.
    pub fn global(cell_size: FloatValue) -> Self {
        let ncols = (360.0 / cell_size).round() as usize;
        let nrows = (180.0 / cell_size).round() as usize;
        Self::new(ncols, nrows, -180.0, -90.0, cell_size)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    pub fn n_cells(&self) -> usize {
        self.nrows * self.ncols
    }

    /// Longitude of the centre of column `col`.
    pub fn lon(&self, col: usize) -> FloatValue {
        self.xll_corner + (col as FloatValue + 0.5) * self.cell_size
    }

    /// Latitude of the centre of row `row` (row 0 is the top of the grid).
    pub fn lat(&self, row: usize) -> FloatValue {
        self.yll_corner + (self.nrows as FloatValue - row as FloatValue - 0.5) * self.cell_size
    }

    /// Cell centre as `(lon, lat)`.
    pub fn cell_centre(&self, row: usize, col: usize) -> (FloatValue, FloatValue) {
        (self.lon(col), self.lat(row))
    }

    /// Surface area of a cell in row `row` in km².
    ///
    /// Uses the spherical band formula
    /// $A = R^2 \Delta\lambda (\sin\varphi_2 - \sin\varphi_1)$.
    pub fn cell_area_km2(&self, row: usize) -> FloatValue {
        let lat_top = self.lat(row) + 0.5 * self.cell_size;
        let lat_bottom = self.lat(row) - 0.5 * self.cell_size;
        let dlon = self.cell_size.to_radians();
        EARTH_RADIUS_KM.powi(2)
            * dlon
            * (lat_top.to_radians().sin() - lat_bottom.to_radians().sin()).abs()
    }

    /// Check that `other` describes the same grid.
    pub fn ensure_matches(&self, other: &GridGeometry) -> SnrResult<()> {
        let same = self.ncols == other.ncols
            && self.nrows == other.nrows
            && (self.xll_corner - other.xll_corner).abs() < 1e-9
            && (self.yll_corner - other.yll_corner).abs() < 1e-9
            && (self.cell_size - other.cell_size).abs() < 1e-9;
        if same {
            Ok(())
        } else {
            Err(SnrError::GeometryMismatch(
                self.describe(),
                other.describe(),
            ))
        }
    }

    fn describe(&self) -> String {
        format!(
            "{}x{} grid at ({}, {}) with {} deg cells",
            self.nrows, self.ncols, self.xll_corner, self.yll_corner, self.cell_size
        )
    }
}

/// A single raster layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Raster {
    geometry: GridGeometry,
    values: Array2<FloatValue>,
}

impl Raster {
    /// Create a raster from values laid out as `(nrows, ncols)`.
    pub fn new(geometry: GridGeometry, values: Array2<FloatValue>) -> SnrResult<Self> {
        let (nrows, ncols) = values.dim();
        if nrows != geometry.nrows {
            return Err(SnrError::DimensionMismatch {
                expected: geometry.nrows,
                actual: nrows,
            });
        }
        if ncols != geometry.ncols {
            return Err(SnrError::DimensionMismatch {
                expected: geometry.ncols,
                actual: ncols,
            });
        }
        Ok(Self { geometry, values })
    }

    /// A raster with every cell set to `value`.
    pub fn filled(geometry: GridGeometry, value: FloatValue) -> Self {
        let values = Array2::from_elem(geometry.shape(), value);
        Self { geometry, values }
    }

    /// A raster with every cell missing.
    pub fn empty(geometry: GridGeometry) -> Self {
        Self::filled(geometry, FloatValue::NAN)
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn values(&self) -> ArrayView2<'_, FloatValue> {
        self.values.view()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<FloatValue> {
        self.values.get((row, col)).copied()
    }

    /// Number of cells holding a finite value.
    pub fn n_finite(&self) -> usize {
        self.values.iter().filter(|v| v.is_finite()).count()
    }

    /// Apply `f` to every cell, keeping the geometry.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(FloatValue) -> FloatValue,
    {
        Self {
            geometry: self.geometry.clone(),
            values: self.values.mapv(f),
        }
    }

    /// Combine two rasters cell by cell.
    pub fn zip_with<F>(&self, other: &Raster, f: F) -> SnrResult<Self>
    where
        F: Fn(FloatValue, FloatValue) -> FloatValue,
    {
        self.geometry.ensure_matches(&other.geometry)?;
        let mut values = Array2::zeros(self.geometry.shape());
        Zip::from(&mut values)
            .and(&self.values)
            .and(&other.values)
            .for_each(|out, &a, &b| *out = f(a, b));
        Ok(Self {
            geometry: self.geometry.clone(),
            values,
        })
    }

    /// Iterate over `(row, col, value)` for every finite cell.
    pub fn iter_finite(&self) -> impl Iterator<Item = (usize, usize, FloatValue)> + '_ {
        self.values
            .indexed_iter()
            .filter(|(_, v)| v.is_finite())
            .map(|((r, c), v)| (r, c, *v))
    }
}

/// An ordered stack of layers on one grid, e.g. annual fields of a scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RasterStack {
    geometry: GridGeometry,
    labels: Vec<String>,
    /// Shape (layer, row, col)
    values: Array3<FloatValue>,
}

impl RasterStack {
    /// Stack layers in the given order.
    ///
    /// # Errors
    ///
    /// * [`SnrError::EmptySample`] if `layers` is empty
    /// * [`SnrError::DimensionMismatch`] if labels and layers differ in length
    /// * [`SnrError::GeometryMismatch`] if layers are on different grids
    pub fn from_layers(labels: Vec<String>, layers: &[Raster]) -> SnrResult<Self> {
        let first = layers
            .first()
            .ok_or_else(|| SnrError::EmptySample("raster stack".to_string()))?;
        if labels.len() != layers.len() {
            return Err(SnrError::DimensionMismatch {
                expected: layers.len(),
                actual: labels.len(),
            });
        }
        let geometry = first.geometry().clone();
        let (nrows, ncols) = geometry.shape();
        let mut values = Array3::from_elem((layers.len(), nrows, ncols), FloatValue::NAN);
        for (i, layer) in layers.iter().enumerate() {
            geometry.ensure_matches(layer.geometry())?;
            values.index_axis_mut(Axis(0), i).assign(&layer.values);
        }
        Ok(Self {
            geometry,
            labels,
            values,
        })
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn n_layers(&self) -> usize {
        self.values.len_of(Axis(0))
    }

    pub fn values(&self) -> &Array3<FloatValue> {
        &self.values
    }

    /// Copy out a single layer.
    pub fn layer(&self, index: usize) -> Option<Raster> {
        if index >= self.n_layers() {
            return None;
        }
        Some(Raster {
            geometry: self.geometry.clone(),
            values: self.values.index_axis(Axis(0), index).to_owned(),
        })
    }
}
