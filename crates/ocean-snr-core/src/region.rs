//! Marine regions (realms/provinces) and their grid masks.
//!
//! A [`Region`] is a named polygon area with an integer identifier. To work
//! with rasters it is rasterised onto a grid as a [`RegionMask`]: the set of
//! cells whose centres fall inside the polygon. The derived area of a region
//! is the summed spherical area of its masked cells.

use crate::raster::{GridGeometry, Raster};
use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// A closed ring of `(lon, lat)` vertices. The closing vertex may be omitted.
pub type Ring = Vec<(FloatValue, FloatValue)>;

/// A polygon with an outer ring and optional holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub exterior: Ring,
    #[serde(default)]
    pub holes: Vec<Ring>,
}

impl Polygon {
    pub fn new(exterior: Ring) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }

    pub fn with_holes(exterior: Ring, holes: Vec<Ring>) -> Self {
        Self { exterior, holes }
    }

    /// Whether `(lon, lat)` lies inside the exterior and outside every hole.
    pub fn contains(&self, lon: FloatValue, lat: FloatValue) -> bool {
        ring_contains(&self.exterior, lon, lat)
            && !self.holes.iter().any(|h| ring_contains(h, lon, lat))
    }

    /// Axis-aligned bounding box `(min_lon, min_lat, max_lon, max_lat)`.
    pub fn bounds(&self) -> Option<(FloatValue, FloatValue, FloatValue, FloatValue)> {
        self.exterior.iter().fold(None, |acc, &(x, y)| match acc {
            None => Some((x, y, x, y)),
            Some((x0, y0, x1, y1)) => Some((x0.min(x), y0.min(y), x1.max(x), y1.max(y))),
        })
    }
}

/// Even-odd ray casting test.
fn ring_contains(ring: &[(FloatValue, FloatValue)], x: FloatValue, y: FloatValue) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// A named marine region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: i64,
    pub name: String,
    /// One or more polygon parts
    pub parts: Vec<Polygon>,
}

impl Region {
    pub fn new(id: i64, name: &str, parts: Vec<Polygon>) -> Self {
        Self {
            id,
            name: name.to_string(),
            parts,
        }
    }

    pub fn contains(&self, lon: FloatValue, lat: FloatValue) -> bool {
        self.parts.iter().any(|p| p.contains(lon, lat))
    }

    /// Rasterise onto `geometry`.
    pub fn mask(&self, geometry: &GridGeometry) -> RegionMask {
        RegionMask::build(self, geometry)
    }
}

/// Cells of a grid that belong to a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionMask {
    pub region_id: i64,
    pub region_name: String,
    geometry: GridGeometry,
    /// `(row, col)` of every cell whose centre lies inside the region
    cells: Vec<(usize, usize)>,
    area_km2: FloatValue,
}

impl RegionMask {
    /// Select the cells whose centres fall inside `region`.
    ///
    /// Each part is tested only for centres inside its bounding box.
    pub fn build(region: &Region, geometry: &GridGeometry) -> Self {
        let parts: Vec<_> = region
            .parts
            .iter()
            .filter_map(|p| p.bounds().map(|b| (p, b)))
            .collect();
        let mut cells = Vec::new();
        let mut area_km2 = 0.0;
        for row in 0..geometry.nrows {
            let row_area = geometry.cell_area_km2(row);
            for col in 0..geometry.ncols {
                let (lon, lat) = geometry.cell_centre(row, col);
                let inside = parts.iter().any(|(part, (x0, y0, x1, y1))| {
                    (*x0..=*x1).contains(&lon)
                        && (*y0..=*y1).contains(&lat)
                        && part.contains(lon, lat)
                });
                if inside {
                    cells.push((row, col));
                    area_km2 += row_area;
                }
            }
        }
        Self {
            region_id: region.id,
            region_name: region.name.clone(),
            geometry: geometry.clone(),
            cells,
            area_km2,
        }
    }

    pub fn cells(&self) -> &[(usize, usize)] {
        &self.cells
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// Summed spherical area of the masked cells.
    pub fn area_km2(&self) -> FloatValue {
        self.area_km2
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Finite values of `raster` inside the region.
    ///
    /// # Panics
    ///
    /// Panics if `raster` is on a different grid than the mask.
    pub fn extract(&self, raster: &Raster) -> Vec<FloatValue> {
        self.extract_cells(raster)
            .into_iter()
            .map(|(_, _, v)| v)
            .collect()
    }

    /// Finite values of `raster` inside the region with their `(lon, lat)`.
    pub fn extract_cells(&self, raster: &Raster) -> Vec<(FloatValue, FloatValue, FloatValue)> {
        assert!(
            self.geometry.ensure_matches(raster.geometry()).is_ok(),
            "Raster grid does not match the region mask grid"
        );
        self.cells
            .iter()
            .filter_map(|&(row, col)| {
                raster
                    .get(row, col)
                    .filter(|v| v.is_finite())
                    .map(|v| (self.geometry.lon(col), self.geometry.lat(row), v))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Ring {
        vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]
    }

    #[test]
    fn point_in_polygon() {
        let p = Polygon::new(square(0.0, 0.0, 10.0, 10.0));
        assert!(p.contains(5.0, 5.0));
        assert!(!p.contains(15.0, 5.0));
        assert!(!p.contains(-0.1, 5.0));
    }

    #[test]
    fn holes_are_excluded() {
        let p = Polygon::with_holes(
            square(0.0, 0.0, 10.0, 10.0),
            vec![square(4.0, 4.0, 6.0, 6.0)],
        );
        assert!(p.contains(2.0, 2.0));
        assert!(!p.contains(5.0, 5.0));
    }

    #[test]
    fn bounds_of_exterior() {
        let p = Polygon::new(vec![(2.0, -1.0), (5.0, 3.0), (-1.0, 4.0), (2.0, -1.0)]);
        assert_eq!(p.bounds(), Some((-1.0, -1.0, 5.0, 4.0)));
        assert_eq!(Polygon::new(Vec::new()).bounds(), None);
    }

    #[test]
    fn mask_of_multipart_region() {
        let geometry = GridGeometry::new(6, 2, 0.0, 0.0, 1.0);
        let region = Region::new(
            3,
            "Split",
            vec![
                Polygon::new(square(0.0, 0.0, 1.0, 2.0)),
                Polygon::new(square(4.0, 1.0, 6.0, 2.0)),
                Polygon::new(Vec::new()),
            ],
        );
        let mask = region.mask(&geometry);
        // Left column in both rows, then two cells of the top row on the right
        assert_eq!(mask.cells(), &[(0, 0), (0, 4), (0, 5), (1, 0)]);
    }

    #[test]
    fn mask_counts_cell_centres() {
        let geometry = GridGeometry::new(4, 4, 0.0, 0.0, 1.0);
        let region = Region::new(
            7,
            "Corner",
            vec![Polygon::new(square(0.0, 0.0, 2.0, 2.0))],
        );
        let mask = region.mask(&geometry);
        assert_eq!(mask.region_id, 7);
        assert_eq!(mask.n_cells(), 4);
        // Bottom-left 2x2 block is rows 2..4, cols 0..2
        assert!(mask.cells().contains(&(3, 0)));
        assert!(mask.cells().contains(&(2, 1)));
        assert!(!mask.cells().contains(&(0, 0)));
    }

    #[test]
    fn mask_area_matches_cells() {
        let geometry = GridGeometry::global(10.0);
        let everything = Region::new(
            1,
            "World",
            vec![Polygon::new(square(-180.0, -90.0, 180.0, 90.0))],
        );
        let mask = everything.mask(&geometry);
        assert_eq!(mask.n_cells(), geometry.n_cells());
        let sphere = 4.0 * std::f64::consts::PI * crate::raster::EARTH_RADIUS_KM.powi(2);
        assert_relative_eq!(mask.area_km2(), sphere, max_relative = 1e-10);
    }

    #[test]
    fn extract_skips_missing() {
        let geometry = GridGeometry::new(2, 1, 0.0, 0.0, 1.0);
        let raster = Raster::new(geometry.clone(), ndarray::array![[1.0, f64::NAN]]).unwrap();
        let region = Region::new(
            1,
            "All",
            vec![Polygon::new(square(0.0, 0.0, 2.0, 1.0))],
        );
        let mask = region.mask(&geometry);
        assert_eq!(mask.n_cells(), 2);
        assert_eq!(mask.extract(&raster), vec![1.0]);
        let cells = mask.extract_cells(&raster);
        assert_eq!(cells, vec![(0.5, 0.5, 1.0)]);
    }
}
