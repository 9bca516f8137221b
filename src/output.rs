use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use crate::error::PipelineError;
use crate::pipeline::PipelineOutput;
use crate::reports;

pub const DISTRICT_FILE: &str = "district_rankings.csv";
pub const PINCODE_FILE: &str = "pincode_rankings.csv";
pub const ZONE_FILE: &str = "priority_zones.csv";
pub const VARIATION_FILE: &str = "district_variation.csv";
pub const SCORECARD_FILE: &str = "district_scorecard.csv";
pub const SUMMARY_FILE: &str = "summary.json";

/// Serialize rows under their field names. An empty table still gets its
/// header line.
pub fn write_csv<T, P>(path: P, rows: &[T]) -> Result<(), PipelineError>
where
    T: Serialize + Tabled,
    P: AsRef<Path>,
{
    let mut wtr = csv::Writer::from_path(path)?;
    if rows.is_empty() {
        let headers = T::headers();
        wtr.write_record(headers.iter().map(|h| h.as_bytes()))?;
    }
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<(), PipelineError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Render the first `max_rows` rows as a markdown table.
pub fn render_table_rows<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", render_table_rows(rows, max_rows));
}

/// Write every table plus the JSON summary into `dir`; returns the paths
/// written, in order.
pub fn write_all(dir: &Path, out: &PipelineOutput) -> Result<Vec<PathBuf>, PipelineError> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let path = dir.join(DISTRICT_FILE);
    write_csv(&path, &reports::district_rows(&out.districts))?;
    written.push(path);

    let path = dir.join(PINCODE_FILE);
    write_csv(&path, &reports::pincode_rows(&out.pincodes))?;
    written.push(path);

    let path = dir.join(ZONE_FILE);
    write_csv(&path, &reports::priority_zone_rows(&out.priority_zones))?;
    written.push(path);

    let path = dir.join(VARIATION_FILE);
    write_csv(&path, &reports::variation_rows(&out.variation))?;
    written.push(path);

    let path = dir.join(SCORECARD_FILE);
    write_csv(&path, &reports::scorecard_rows(&out.scorecard))?;
    written.push(path);

    let path = dir.join(SUMMARY_FILE);
    write_json(&path, &reports::summary_document(out))?;
    written.push(path);

    info!("Wrote {} output files to {}", written.len(), dir.display());
    Ok(written)
}
