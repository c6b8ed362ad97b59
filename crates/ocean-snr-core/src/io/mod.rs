//! Reading inputs and writing output tables and rasters.
//!
//! - [`ascii_grid`]: ESRI ASCII grid rasters (`.asc`)
//! - [`geojson`]: region polygons from GeoJSON feature collections
//! - [`tables`]: CSV input tables and output summaries

pub mod ascii_grid;
pub mod geojson;
pub mod tables;

pub use ascii_grid::{read_ascii_grid, write_ascii_grid};
pub use geojson::read_regions;
pub use tables::{
    read_control, read_segments, write_cell_table, write_extremes_table, write_overlap_table,
    write_selection_table,
};
