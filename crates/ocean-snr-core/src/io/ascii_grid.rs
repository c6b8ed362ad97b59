//! ESRI ASCII grid format.
//!
//! ```text
//! ncols         4
//! nrows         2
//! xllcorner     -180.0
//! yllcorner     -90.0
//! cellsize      90.0
//! NODATA_value  -9999
//! 1.0 2.0 3.0 -9999
//! 5.0 6.0 7.0 8.0
//! ```
//!
//! The first data row is the northernmost row. `xllcenter`/`yllcenter` are
//! accepted in place of the corner keys.

use crate::errors::{SnrError, SnrResult};
use crate::raster::{GridGeometry, Raster};
use crate::FloatValue;
use ndarray::Array2;
use std::fmt::Write as _;
use std::path::Path;

/// Value written for missing cells.
pub const NODATA: FloatValue = -9999.0;

#[derive(Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<(FloatValue, bool)>,
    yll: Option<(FloatValue, bool)>,
    cell_size: Option<FloatValue>,
    nodata: Option<FloatValue>,
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> SnrResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| SnrError::parse(format!("ASCII grid header `{}`", key), e))
}

/// Parse an ASCII grid from text.
pub fn parse_ascii_grid(text: &str) -> SnrResult<Raster> {
    let mut header = Header::default();
    let mut lines = text.lines().filter(|l| !l.trim().is_empty()).peekable();

    while let Some(line) = lines.peek() {
        let mut parts = line.split_whitespace();
        let key = parts.next().unwrap_or_default().to_ascii_lowercase();
        if !key.starts_with(|c: char| c.is_ascii_alphabetic()) {
            break;
        }
        let value = parts
            .next()
            .ok_or_else(|| SnrError::parse("ASCII grid header", format!("missing value for {}", key)))?;
        match key.as_str() {
            "ncols" => header.ncols = Some(parse_number(&key, value)?),
            "nrows" => header.nrows = Some(parse_number(&key, value)?),
            "xllcorner" => header.xll = Some((parse_number(&key, value)?, false)),
            "xllcenter" => header.xll = Some((parse_number(&key, value)?, true)),
            "yllcorner" => header.yll = Some((parse_number(&key, value)?, false)),
            "yllcenter" => header.yll = Some((parse_number(&key, value)?, true)),
            "cellsize" => header.cell_size = Some(parse_number(&key, value)?),
            "nodata_value" => header.nodata = Some(parse_number(&key, value)?),
            other => {
                return Err(SnrError::parse(
                    "ASCII grid header",
                    format!("unknown key {}", other),
                ))
            }
        }
        lines.next();
    }

    let missing = |k: &str| SnrError::parse("ASCII grid header", format!("missing {}", k));
    let ncols = header.ncols.ok_or_else(|| missing("ncols"))?;
    let nrows = header.nrows.ok_or_else(|| missing("nrows"))?;
    let cell_size = header.cell_size.ok_or_else(|| missing("cellsize"))?;
    let (xll, x_centre) = header.xll.ok_or_else(|| missing("xllcorner"))?;
    let (yll, y_centre) = header.yll.ok_or_else(|| missing("yllcorner"))?;
    let half = 0.5 * cell_size;
    let xll_corner = if x_centre { xll - half } else { xll };
    let yll_corner = if y_centre { yll - half } else { yll };

    let mut data = Vec::with_capacity(ncols * nrows);
    for token in lines.flat_map(|l| l.split_whitespace()) {
        let v: FloatValue = parse_number("cell value", token)?;
        let is_nodata = header.nodata.map_or(false, |nd| v == nd);
        data.push(if is_nodata { FloatValue::NAN } else { v });
    }
    if data.len() != ncols * nrows {
        return Err(SnrError::DimensionMismatch {
            expected: ncols * nrows,
            actual: data.len(),
        });
    }

    let values = Array2::from_shape_vec((nrows, ncols), data)
        .map_err(|e| SnrError::parse("ASCII grid body", e))?;
    Raster::new(
        GridGeometry::new(ncols, nrows, xll_corner, yll_corner, cell_size),
        values,
    )
}

/// Read an ASCII grid file.
pub fn read_ascii_grid<P: AsRef<Path>>(path: P) -> SnrResult<Raster> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_ascii_grid(&text)
}

/// Render a raster as ASCII grid text. Missing cells are written as [`NODATA`].
pub fn format_ascii_grid(raster: &Raster) -> String {
    let g = raster.geometry();
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "ncols         {}", g.ncols);
    let _ = writeln!(out, "nrows         {}", g.nrows);
    let _ = writeln!(out, "xllcorner     {}", g.xll_corner);
    let _ = writeln!(out, "yllcorner     {}", g.yll_corner);
    let _ = writeln!(out, "cellsize      {}", g.cell_size);
    let _ = writeln!(out, "NODATA_value  {}", NODATA);
    for row in raster.values().rows() {
        let line: Vec<String> = row
            .iter()
            .map(|v| {
                if v.is_finite() {
                    v.to_string()
                } else {
                    NODATA.to_string()
                }
            })
            .collect();
        let _ = writeln!(out, "{}", line.join(" "));
    }
    out
}

/// Write a raster to an ASCII grid file.
pub fn write_ascii_grid<P: AsRef<Path>>(raster: &Raster, path: P) -> SnrResult<()> {
    std::fs::write(path.as_ref(), format_ascii_grid(raster))?;
    Ok(())
}
