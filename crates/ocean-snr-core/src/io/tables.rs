//! Comma separated input tables and output summaries.
//!
//! Inputs are small hand-maintained tables, so only plain comma separated
//! values are supported: no quoting, `#` starts a comment line. Output text
//! fields are quoted when they contain a comma, a quote or a line break.

use crate::errors::{SnrError, SnrResult};
use crate::extremes::ExtremeRecord;
use crate::overlap::OverlapRecord;
use crate::sample::RegionLabel;
use crate::thresholds::{PeriodSelection, WarmingSegment};
use crate::FloatValue;
use std::io::{BufWriter, Write};
use std::path::Path;

/// SNR value of one cell inside one region.
#[derive(Debug, Clone, PartialEq)]
pub struct CellRecord {
    pub scenario: String,
    pub region: RegionLabel,
    pub lon: FloatValue,
    pub lat: FloatValue,
    pub snr: FloatValue,
}

struct Table {
    header: Vec<String>,
    rows: Vec<(usize, Vec<String>)>,
}

impl Table {
    fn parse(text: &str, what: &str) -> SnrResult<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'));
        let (_, header) = lines
            .next()
            .ok_or_else(|| SnrError::parse(what, "table is empty"))?;
        let header = split(header);
        let rows = lines.map(|(n, l)| (n, split(l))).collect();
        Ok(Self { header, rows })
    }

    fn column(&self, name: &str, what: &str) -> SnrResult<usize> {
        self.header
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| SnrError::parse(what, format!("missing column `{}`", name)))
    }
}

fn split(line: &str) -> Vec<String> {
    line.split(',').map(|f| f.trim().to_string()).collect()
}

fn field<'a>(row: &'a [String], idx: usize, line: usize, what: &str) -> SnrResult<&'a str> {
    row.get(idx)
        .map(String::as_str)
        .ok_or_else(|| SnrError::parse(what, format!("line {}: too few fields", line)))
}

fn number(row: &[String], idx: usize, line: usize, what: &str) -> SnrResult<FloatValue> {
    let raw = field(row, idx, line, what)?;
    raw.parse::<FloatValue>()
        .map_err(|e| SnrError::parse(what, format!("line {}: `{}`: {}", line, raw, e)))
}

/// Quote a text field if it contains a separator, a quote or a line break.
fn csv_field(text: &str) -> String {
    if text.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

fn format_value(v: FloatValue) -> String {
    if v.is_finite() {
        v.to_string()
    } else {
        "NA".to_string()
    }
}

/// Parse warming segments from a `label,start,end,rate` table.
pub fn parse_segments(text: &str) -> SnrResult<Vec<WarmingSegment>> {
    let what = "segments table";
    let table = Table::parse(text, what)?;
    let label = table.column("label", what)?;
    let start = table.column("start", what)?;
    let end = table.column("end", what)?;
    let rate = table.column("rate", what)?;
    table
        .rows
        .iter()
        .map(|(line, row)| {
            Ok(WarmingSegment::new(
                field(row, label, *line, what)?,
                number(row, start, *line, what)?,
                number(row, end, *line, what)?,
                number(row, rate, *line, what)?,
            ))
        })
        .collect()
}

/// Read warming segments from a file.
pub fn read_segments<P: AsRef<Path>>(path: P) -> SnrResult<Vec<WarmingSegment>> {
    parse_segments(&std::fs::read_to_string(path.as_ref())?)
}

/// Parse a control distribution.
///
/// The values are taken from the `rate` column. A single-column table may
/// use any header name.
pub fn parse_control(text: &str) -> SnrResult<Vec<FloatValue>> {
    let what = "control table";
    let table = Table::parse(text, what)?;
    let col = if table.header.len() == 1 {
        0
    } else {
        table.column("rate", what)?
    };
    table
        .rows
        .iter()
        .map(|(line, row)| number(row, col, *line, what))
        .collect()
}

/// Read a control distribution from a file.
pub fn read_control<P: AsRef<Path>>(path: P) -> SnrResult<Vec<FloatValue>> {
    parse_control(&std::fs::read_to_string(path.as_ref())?)
}

fn write_lines<P, I>(path: P, header: &str, lines: I) -> SnrResult<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = String>,
{
    let mut out = BufWriter::new(std::fs::File::create(path.as_ref())?);
    writeln!(out, "{}", header)?;
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    out.flush()?;
    Ok(())
}

/// Write per-cell SNR values.
pub fn write_cell_table<P: AsRef<Path>>(path: P, rows: &[CellRecord]) -> SnrResult<()> {
    write_lines(
        path,
        "scenario,region_id,region,lon,lat,snr",
        rows.iter().map(|r| {
            format!(
                "{},{},{},{},{},{}",
                csv_field(&r.scenario),
                r.region.id,
                csv_field(&r.region.name),
                r.lon,
                r.lat,
                format_value(r.snr)
            )
        }),
    )
}

/// Write the overlap summary. Missing overlaps are written as `NA`.
pub fn write_overlap_table<P: AsRef<Path>>(path: P, records: &[OverlapRecord]) -> SnrResult<()> {
    write_lines(
        path,
        "region_id,region,scenario_a,scenario_b,n_a,n_b,overlap,ks_statistic,p_value,p_adjusted,significant,marker",
        records.iter().map(|r| {
            format!(
                "{},{},{},{},{},{},{},{},{},{},{},{}",
                r.region.id,
                csv_field(&r.region.name),
                csv_field(&r.scenario_a),
                csv_field(&r.scenario_b),
                r.n_a,
                r.n_b,
                r.overlap.map_or_else(|| "NA".to_string(), format_value),
                format_value(r.ks_statistic),
                format_value(r.p_value),
                format_value(r.p_adjusted),
                r.significant,
                r.marker
            )
        }),
    )
}

/// Write extreme-condition counts, one row per quantile level.
pub fn write_extremes_table<P: AsRef<Path>>(path: P, records: &[ExtremeRecord]) -> SnrResult<()> {
    write_lines(
        path,
        "region_id,region,reference,scenario,quantile,threshold,count,pct_of_comparison,pct_of_region",
        records.iter().flat_map(|r| {
            r.counts.iter().map(move |c| {
                format!(
                    "{},{},{},{},{},{},{},{},{}",
                    r.region.id,
                    csv_field(&r.region.name),
                    csv_field(&r.reference),
                    csv_field(&r.scenario),
                    c.quantile,
                    format_value(c.threshold),
                    c.count,
                    format_value(c.pct_of_comparison),
                    format_value(c.pct_of_region)
                )
            })
        }),
    )
}

/// Write the selected warming periods together with the threshold.
pub fn write_selection_table<P: AsRef<Path>>(
    path: P,
    selection: &PeriodSelection,
) -> SnrResult<()> {
    write_lines(
        path,
        "label,start,end,rate,threshold",
        selection.selected.iter().map(|s| {
            format!(
                "{},{},{},{},{}",
                csv_field(&s.label),
                s.start,
                s.end,
                s.rate,
                selection.threshold
            )
        }),
    )
}
