use crate::error::PipelineError;
use crate::types::{RawRow, RawTable};
use csv::{ReaderBuilder, Trim};
use log::{info, warn};
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub total_rows: usize,
    pub parse_errors: usize,
}

/// Read every row as untyped strings; typing happens in `cleaning`.
pub fn load_from_reader<R: Read>(reader: R) -> Result<(RawTable, LoadReport), PipelineError> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();

    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut rows: Vec<RawRow> = Vec::new();
    for result in rdr.deserialize::<RawRow>() {
        total_rows += 1;
        match result {
            Ok(r) => rows.push(r),
            Err(e) => {
                parse_errors += 1;
                warn!("Skipping unreadable row {}: {}", total_rows, e);
            }
        }
    }

    info!("Loaded {} records ({} unreadable)", rows.len(), parse_errors);
    Ok((RawTable::new(headers, rows), LoadReport { total_rows, parse_errors }))
}

pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<(RawTable, LoadReport), PipelineError> {
    let file = std::fs::File::open(path.as_ref())?;
    info!("Loading {}...", path.as_ref().display());
    load_from_reader(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_rows_and_headers() {
        let data = "date,state,district,pincode,age_0_5,age_5_17,age_18_greater\n\
                    01-03-2025,Telangana,Nalgonda,508001,5,1,0\n\
                    02-03-2025,,Hyderabad,500001.0,,2,3\n";
        let (table, report) = load_from_reader(data.as_bytes()).unwrap();
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.parse_errors, 0);
        assert!(table.has_column("age_18_greater"));
        assert_eq!(table.rows[0].district.as_deref(), Some("Nalgonda"));
        assert_eq!(table.rows[1].state, None);
        assert_eq!(table.rows[1].age_0_5, None);
        assert_eq!(table.rows[1].pincode.as_deref(), Some("500001.0"));
    }

    #[test]
    fn missing_columns_survive_loading_for_schema_check() {
        let data = "date,district,pincode\n01-03-2025,Nalgonda,508001\n";
        let (table, _) = load_from_reader(data.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
        assert!(!table.has_column("age_0_5"));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date,district,pincode,age_0_5,age_5_17,age_18_greater").unwrap();
        writeln!(file, "2025-03-01,Nalgonda,508001,1,2,3").unwrap();
        let (table, _) = load_csv(file.path()).unwrap();
        assert_eq!(table.rows[0].age_18_greater.as_deref(), Some("3"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_csv("/nonexistent/enrollment.csv").unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
