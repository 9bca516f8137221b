//! Cleaning and aggregation of raw enrollment rows.
//!
//! Every step is a pure transform: the raw table is never modified and rows
//! with bad dates or PIN codes are flagged rather than dropped.
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::{BTreeMap, HashMap};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, ValidationReport, ValidationWarning};
use crate::types::{AgeCounts, EnrollmentRecord, Period, RawRow, RawTable, YearMonth};
use crate::util::parse_count_safe;

pub const REQUIRED_COLUMNS: [&str; 6] = [
    "date",
    "district",
    "pincode",
    "age_0_5",
    "age_5_17",
    "age_18_greater",
];

/// Candidate layouts, in priority order.
pub const DATE_FORMATS: [&str; 4] = ["%d-%m-%Y", "%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"];

const DISTRICT_SYNONYMS: [(&str, &str); 6] = [
    ("Ranga Reddy", "Rangareddy"),
    ("RangaReddy", "Rangareddy"),
    ("Ranga reddy", "Rangareddy"),
    ("RANGAREDDY", "Rangareddy"),
    ("HYDERABAD", "Hyderabad"),
    ("NALGONDA", "Nalgonda"),
];

const COUNT_COLUMNS: [&str; 3] = ["age_0_5", "age_5_17", "age_18_greater"];

/// Fail fast when the source lacks any required column.
pub fn check_schema(table: &RawTable) -> Result<(), PipelineError> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !table.has_column(c))
        .map(|c| c.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::Schema { missing })
    }
}

fn parse_date(s: &str, fmt: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, fmt).ok()
}

/// Pick the layout that parses the most values. Earlier layouts win ties;
/// `None` when no layout parses anything.
pub fn choose_date_format<'a, I>(values: I) -> Option<&'static str>
where
    I: IntoIterator<Item = Option<&'a str>> + Clone,
{
    let mut best: Option<(&'static str, usize)> = None;
    for fmt in DATE_FORMATS {
        let parsed = values
            .clone()
            .into_iter()
            .filter(|v| v.and_then(|s| parse_date(s, fmt)).is_some())
            .count();
        if parsed > best.map(|(_, n)| n).unwrap_or(0) {
            best = Some((fmt, parsed));
        }
    }
    best.map(|(fmt, _)| fmt)
}

/// Trim and map known spelling variants onto one canonical district name.
pub fn canonical_district(raw: &str, extra: &BTreeMap<String, String>) -> String {
    let name = raw.trim();
    if let Some(mapped) = extra.get(name) {
        return mapped.clone();
    }
    DISTRICT_SYNONYMS
        .iter()
        .find(|(variant, _)| *variant == name)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Strip whitespace and the `.0` suffix numeric exports leave behind.
pub fn normalize_pincode(raw: &str) -> String {
    let s = raw.trim();
    s.strip_suffix(".0").unwrap_or(s).to_string()
}

/// A PIN code is valid iff it is exactly six ASCII digits.
pub fn is_valid_pincode(pin: &str) -> bool {
    pin.len() == 6 && pin.bytes().all(|b| b.is_ascii_digit())
}

fn parse_counts(row: &RawRow, idx: usize, report: &mut ValidationReport) -> AgeCounts {
    let fields = [&row.age_0_5, &row.age_5_17, &row.age_18_greater];
    let mut values = [0u64; 3];
    for (i, field) in fields.iter().enumerate() {
        values[i] = match parse_count_safe(field.as_deref()) {
            Some(v) => v,
            None => {
                report.missing_counts += 1;
                report.push(ValidationWarning::MissingCount { row: idx, column: COUNT_COLUMNS[i] });
                0
            }
        };
    }
    AgeCounts::new(values[0], values[1], values[2])
}

fn flag_excessive_counts(records: &[EnrollmentRecord], ceiling: u64, report: &mut ValidationReport) {
    let columns: [(&'static str, fn(&AgeCounts) -> u64); 3] = [
        ("age_0_5", |c: &AgeCounts| c.age_0_5),
        ("age_5_17", |c: &AgeCounts| c.age_5_17),
        ("age_18_greater", |c: &AgeCounts| c.age_18_greater),
    ];
    for (column, get) in columns {
        let rows = records.iter().filter(|r| get(&r.counts) > ceiling).count();
        if rows > 0 {
            warn!("{} records with {} > {}", rows, column, ceiling);
            report.push(ValidationWarning::ExcessiveCount { column, rows, ceiling });
        }
    }
}

/// Merge rows that share (period, district, pincode): counts are summed,
/// everything else keeps the first occurrence. First-occurrence order is
/// preserved.
pub fn merge_duplicates(
    records: Vec<EnrollmentRecord>,
    report: &mut ValidationReport,
) -> Vec<EnrollmentRecord> {
    let mut index: HashMap<(Period, String, String), usize> = HashMap::new();
    let mut merged: Vec<EnrollmentRecord> = Vec::with_capacity(records.len());
    for r in records {
        let key = (r.period, r.district.clone(), r.pincode.clone());
        match index.get(&key) {
            Some(&i) => {
                let kept = &mut merged[i];
                kept.counts += r.counts;
                if let (Some(a), Some(b)) = (&kept.state, &r.state) {
                    if a != b {
                        let warning = ValidationWarning::ConflictingState {
                            district: kept.district.clone(),
                            pincode: kept.pincode.clone(),
                            kept: a.clone(),
                            dropped: b.clone(),
                        };
                        report.push(warning);
                    }
                } else if kept.state.is_none() {
                    kept.state = r.state;
                }
                report.duplicate_rows += 1;
            }
            None => {
                index.insert(key, merged.len());
                merged.push(r);
            }
        }
    }
    if report.duplicate_rows > 0 {
        info!(
            "Aggregated {} duplicate records by summing enrollments ({} remain)",
            report.duplicate_rows,
            merged.len()
        );
    }
    merged
}

/// Validate, normalize and deduplicate a raw table.
pub fn clean(
    table: &RawTable,
    config: &PipelineConfig,
) -> Result<(Vec<EnrollmentRecord>, ValidationReport), PipelineError> {
    check_schema(table)?;

    let mut report = ValidationReport {
        input_rows: table.len(),
        ..ValidationReport::default()
    };

    let date_format = choose_date_format(table.rows.iter().map(|r| r.date.as_deref()));
    report.date_format = date_format;
    match date_format {
        Some(fmt) => info!("Parsing dates using format {}", fmt),
        None if !table.is_empty() => warn!("No known date format matched any row"),
        None => {}
    }

    let mut records = Vec::with_capacity(table.len());
    for (idx, row) in table.rows.iter().enumerate() {
        let raw_date = row.date.as_deref().unwrap_or("");
        let period = match date_format.and_then(|fmt| parse_date(raw_date, fmt)) {
            Some(d) => Period::Day(d),
            None => {
                report.unparsed_dates += 1;
                report.push(ValidationWarning::UnparsedDate { row: idx, value: raw_date.to_string() });
                Period::Missing
            }
        };

        let district = canonical_district(
            row.district.as_deref().unwrap_or("Unknown"),
            &config.district_aliases,
        );

        let pincode = normalize_pincode(row.pincode.as_deref().unwrap_or(""));
        let pincode_valid = is_valid_pincode(&pincode);
        if !pincode_valid {
            report.invalid_pincodes += 1;
            report.push(ValidationWarning::InvalidPincode { row: idx, value: pincode.clone() });
        }

        let state = row
            .state
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let counts = parse_counts(row, idx, &mut report);
        records.push(EnrollmentRecord { period, state, district, pincode, pincode_valid, counts });
    }

    if report.unparsed_dates > 0 {
        warn!("{} dates could not be parsed", report.unparsed_dates);
    }
    if report.invalid_pincodes > 0 {
        warn!("{} invalid PIN codes found (kept and flagged)", report.invalid_pincodes);
    }
    if report.missing_counts > 0 {
        info!("Filled {} missing enrollment values with 0", report.missing_counts);
    }
    flag_excessive_counts(&records, config.max_reasonable_enrollment, &mut report);

    let records = merge_duplicates(records, &mut report);
    report.output_rows = records.len();
    info!(
        "Preprocessing complete: {} original records, {} cleaned",
        report.input_rows, report.output_rows
    );
    Ok((records, report))
}

/// Sum counts per (year-month, district, pincode). Groups come out in key
/// order; rows without a date share one "missing month" group per
/// geography.
pub fn aggregate_monthly(records: &[EnrollmentRecord]) -> Vec<EnrollmentRecord> {
    let mut groups: BTreeMap<(Option<YearMonth>, String, String), EnrollmentRecord> =
        BTreeMap::new();
    for r in records {
        let month = r.period.year_month();
        let key = (month, r.district.clone(), r.pincode.clone());
        groups
            .entry(key)
            .and_modify(|acc| acc.counts += r.counts)
            .or_insert_with(|| EnrollmentRecord {
                period: month.map(Period::Month).unwrap_or(Period::Missing),
                ..r.clone()
            });
    }
    let monthly: Vec<EnrollmentRecord> = groups.into_values().collect();
    info!("Aggregated to {} monthly records", monthly.len());
    monthly
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(date: &str, district: &str, pin: &str, c: (&str, &str, &str)) -> RawRow {
        RawRow {
            date: Some(date.to_string()),
            state: None,
            district: Some(district.to_string()),
            pincode: Some(pin.to_string()),
            age_0_5: Some(c.0.to_string()),
            age_5_17: Some(c.1.to_string()),
            age_18_greater: Some(c.2.to_string()),
        }
    }

    #[test]
    fn missing_columns_are_all_reported() {
        let table = RawTable::new(vec!["date".into(), "district".into(), "age_0_5".into()], vec![]);
        match check_schema(&table) {
            Err(PipelineError::Schema { missing }) => {
                assert_eq!(missing, vec!["pincode", "age_5_17", "age_18_greater"]);
            }
            other => panic!("expected schema error, got {:?}", other),
        }
        assert!(clean(&table, &PipelineConfig::default()).is_err());
    }

    #[test]
    fn date_format_with_most_matches_wins() {
        let values = vec![Some("03/25/2025"), Some("04/01/2025"), Some("12/31/2024")];
        // 03/25 and 12/31 only parse month-first
        assert_eq!(choose_date_format(values.iter().copied()), Some("%m/%d/%Y"));
        let dashed = vec![Some("01-03-2025"), Some("garbage"), None];
        assert_eq!(choose_date_format(dashed.iter().copied()), Some("%d-%m-%Y"));
        let none: Vec<Option<&str>> = vec![Some("soon"), None];
        assert_eq!(choose_date_format(none.iter().copied()), None);
    }

    #[test]
    fn district_synonyms_and_passthrough() {
        let extra = BTreeMap::new();
        assert_eq!(canonical_district(" Ranga Reddy ", &extra), "Rangareddy");
        assert_eq!(canonical_district("HYDERABAD", &extra), "Hyderabad");
        assert_eq!(canonical_district("Warangal", &extra), "Warangal");
        let mut extra = BTreeMap::new();
        extra.insert("Hyd".to_string(), "Hyderabad".to_string());
        assert_eq!(canonical_district("Hyd", &extra), "Hyderabad");
    }

    #[test]
    fn pincode_validation() {
        assert_eq!(normalize_pincode(" 500001.0 "), "500001");
        assert!(is_valid_pincode("500001"));
        assert!(!is_valid_pincode("50001"));
        assert!(!is_valid_pincode("5000012"));
        assert!(!is_valid_pincode("50A001"));
        assert!(!is_valid_pincode(""));
    }

    #[test]
    fn bad_rows_are_flagged_not_dropped() {
        let table = RawTable::with_full_schema(vec![
            raw("01-03-2025", "Nalgonda", "508001", ("5", "1", "1")),
            raw("not a date", "Nalgonda", "5080", ("", "-3", "2.0")),
        ]);
        let (records, report) = clean(&table, &PipelineConfig::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].period, Period::Missing);
        assert!(!records[1].pincode_valid);
        assert_eq!(records[1].counts, AgeCounts::new(0, 0, 2));
        assert_eq!(report.unparsed_dates, 1);
        assert_eq!(report.invalid_pincodes, 1);
        assert_eq!(report.missing_counts, 1);
        assert_eq!(report.date_format, Some("%d-%m-%Y"));
    }

    #[test]
    fn duplicates_are_summed() {
        let mut a = raw("01-03-2025", "Hyderabad", "500001", ("2", "3", "1"));
        a.state = Some("Telangana".into());
        let mut b = raw("01-03-2025", "HYDERABAD", "500001", ("1", "0", "4"));
        b.state = Some("TS".into());
        let table = RawTable::with_full_schema(vec![a, b]);
        let (records, report) = clean(&table, &PipelineConfig::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].counts, AgeCounts::new(3, 3, 5));
        assert_eq!(records[0].total_enrollments(), 11);
        assert_eq!(records[0].state.as_deref(), Some("Telangana"));
        assert_eq!(report.duplicate_rows, 1);
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, ValidationWarning::ConflictingState { .. })));
    }

    #[test]
    fn excessive_counts_warn_but_stay() {
        let table = RawTable::with_full_schema(vec![raw(
            "01-03-2025",
            "Nalgonda",
            "508001",
            ("20000", "1", "1"),
        )]);
        let (records, report) = clean(&table, &PipelineConfig::default()).unwrap();
        assert_eq!(records[0].counts.age_0_5, 20000);
        assert!(report.warnings.contains(&ValidationWarning::ExcessiveCount {
            column: "age_0_5",
            rows: 1,
            ceiling: 10_000,
        }));
    }

    #[test]
    fn monthly_aggregation_sums_within_month() {
        let table = RawTable::with_full_schema(vec![
            raw("01-03-2025", "Nalgonda", "508001", ("2", "3", "1")),
            raw("15-03-2025", "Nalgonda", "508001", ("1", "0", "4")),
            raw("02-04-2025", "Nalgonda", "508001", ("9", "0", "0")),
            raw("??", "Nalgonda", "508001", ("1", "1", "1")),
        ]);
        let (records, _) = clean(&table, &PipelineConfig::default()).unwrap();
        let monthly = aggregate_monthly(&records);
        assert_eq!(monthly.len(), 3);
        assert_eq!(monthly[0].period, Period::Missing);
        let march = YearMonth { year: 2025, month: 3 };
        assert_eq!(monthly[1].period, Period::Month(march));
        assert_eq!(monthly[1].counts, AgeCounts::new(3, 3, 5));
        assert_eq!(monthly[2].counts.total(), 9);
    }

    #[test]
    fn empty_table_cleans_to_empty() {
        let (records, report) = clean(&RawTable::with_full_schema(vec![]), &PipelineConfig::default()).unwrap();
        assert!(records.is_empty());
        assert_eq!(report.output_rows, 0);
    }
}
