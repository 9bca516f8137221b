//! Cross-cutting statistics built on top of metrics and rankings.
use log::info;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::ranking::{aggregate_by_district, aggregate_by_pincode};
use crate::types::{AgeCounts, AnnotatedRecord, Grade, MetricSet};
use crate::util::{average, median, min_max, quantile, sample_std};

#[derive(Debug, Clone, PartialEq)]
pub struct DistrictVariation {
    pub district: String,
    pub num_pincodes: usize,
    pub mean_aer: f64,
    pub median_aer: f64,
    pub std_aer: f64,
    pub min_aer: f64,
    pub max_aer: f64,
    pub cv_aer: f64,
    pub range_aer: f64,
    pub best_pincode: String,
    pub worst_pincode: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScorecardEntry {
    pub priority_rank: usize,
    pub district: String,
    pub counts: AgeCounts,
    pub metrics: MetricSet,
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AerStats {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub q25: f64,
    pub q75: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AebiStats {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricSummary {
    pub aer: AerStats,
    pub aebi: AebiStats,
    pub aer_grades: BTreeMap<Grade, usize>,
    pub aebi_grades: BTreeMap<Grade, usize>,
    pub avg_child_pct: f64,
    pub avg_youth_pct: f64,
    pub avg_adult_pct: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExecutiveSummary {
    pub state: String,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub num_districts: usize,
    pub num_pincodes: usize,
    pub total_enrollments: u64,
    pub total_child: u64,
    pub total_youth: u64,
    pub total_adult: u64,
    pub child_share_pct: f64,
    pub youth_share_pct: f64,
    pub adult_share_pct: f64,
    pub avg_aer: f64,
    pub min_aer: f64,
    pub max_aer: f64,
    pub children_per_adult: u64,
    pub grade_distribution: BTreeMap<Grade, usize>,
}

/// Spread of PIN-code AER inside each district with at least
/// `min_pincodes` PIN codes, most unequal district first.
pub fn analyze_within_district_variation(
    rows: &[AnnotatedRecord],
    min_pincodes: usize,
) -> Vec<DistrictVariation> {
    let mut by_district: BTreeMap<String, Vec<(String, f64)>> = BTreeMap::new();
    for p in aggregate_by_pincode(rows) {
        by_district.entry(p.district).or_default().push((p.pincode, p.metrics.aer));
    }

    let mut stats: Vec<DistrictVariation> = by_district
        .into_iter()
        .filter(|(_, pins)| !pins.is_empty() && pins.len() >= min_pincodes)
        .map(|(district, pins)| {
            let aers: Vec<f64> = pins.iter().map(|(_, a)| *a).collect();
            let mean = average(&aers);
            let std = sample_std(&aers);
            let (min, max) = min_max(&aers);
            // first occurrence wins on ties, in PIN order
            let best = pins.iter().find(|(_, a)| *a == max).map(|(p, _)| p.clone());
            let worst = pins.iter().find(|(_, a)| *a == min).map(|(p, _)| p.clone());
            DistrictVariation {
                district,
                num_pincodes: pins.len(),
                mean_aer: mean,
                median_aer: median(aers.clone()),
                std_aer: std,
                min_aer: min,
                max_aer: max,
                cv_aer: if mean > 0.0 { std / mean * 100.0 } else { 0.0 },
                range_aer: max - min,
                best_pincode: best.unwrap_or_default(),
                worst_pincode: worst.unwrap_or_default(),
            }
        })
        .collect();

    stats.sort_by(|a, b| {
        b.cv_aer
            .partial_cmp(&a.cv_aer)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    info!("Analyzed within-district variation for {} districts", stats.len());
    stats
}

pub fn status_for(grade: Grade) -> &'static str {
    match grade {
        Grade::Green => "✓ Acceptable",
        Grade::Yellow => "⚠ Needs Improvement",
        Grade::Red => "⚠ Critical",
    }
}

/// Average-method ascending ranks (ties share the mean of their positions),
/// truncated to whole numbers.
fn average_ranks(values: &[f64]) -> Vec<usize> {
    values
        .iter()
        .map(|v| {
            let below = values.iter().filter(|o| *o < v).count();
            let equal = values.iter().filter(|o| *o == v).count();
            let avg = below as f64 + (equal as f64 + 1.0) / 2.0;
            avg.trunc() as usize
        })
        .collect()
}

pub fn create_performance_scorecard(rows: &[AnnotatedRecord]) -> Vec<ScorecardEntry> {
    let districts = aggregate_by_district(rows);
    let aers: Vec<f64> = districts.iter().map(|(_, _, m)| m.aer).collect();
    let ranks = average_ranks(&aers);

    let mut card: Vec<ScorecardEntry> = districts
        .into_iter()
        .zip(ranks)
        .map(|((district, counts, metrics), priority_rank)| ScorecardEntry {
            priority_rank,
            status: status_for(metrics.aer_grade),
            district,
            counts,
            metrics,
        })
        .collect();
    card.sort_by_key(|e| e.priority_rank);
    info!("Created scorecard for {} districts", card.len());
    card
}

fn grade_counts<F>(rows: &[AnnotatedRecord], grade: F) -> BTreeMap<Grade, usize>
where
    F: Fn(&MetricSet) -> Grade,
{
    let mut out = BTreeMap::new();
    for r in rows {
        *out.entry(grade(&r.metrics)).or_insert(0) += 1;
    }
    out
}

pub fn metric_summary(rows: &[AnnotatedRecord]) -> MetricSummary {
    let aer: Vec<f64> = rows.iter().map(|r| r.metrics.aer).collect();
    let aebi: Vec<f64> = rows.iter().map(|r| r.metrics.aebi).collect();
    let (aer_min, aer_max) = min_max(&aer);
    let (aebi_min, aebi_max) = min_max(&aebi);
    let pct = |f: fn(&MetricSet) -> f64| average(&rows.iter().map(|r| f(&r.metrics)).collect::<Vec<_>>());

    MetricSummary {
        aer: AerStats {
            mean: average(&aer),
            median: median(aer.clone()),
            std: sample_std(&aer),
            min: aer_min,
            max: aer_max,
            q25: quantile(aer.clone(), 0.25),
            q75: quantile(aer, 0.75),
        },
        aebi: AebiStats {
            mean: average(&aebi),
            median: median(aebi.clone()),
            std: sample_std(&aebi),
            min: aebi_min,
            max: aebi_max,
        },
        aer_grades: grade_counts(rows, |m| m.aer_grade),
        aebi_grades: grade_counts(rows, |m| m.aebi_grade),
        avg_child_pct: pct(|m: &MetricSet| m.child_pct),
        avg_youth_pct: pct(|m: &MetricSet| m.youth_pct),
        avg_adult_pct: pct(|m: &MetricSet| m.adult_pct),
    }
}

pub fn executive_summary(rows: &[AnnotatedRecord], default_state: &str) -> ExecutiveSummary {
    let mut totals = AgeCounts::default();
    let mut districts = BTreeSet::new();
    let mut pincodes = BTreeSet::new();
    let mut months = BTreeSet::new();
    for r in rows {
        totals += r.record.counts;
        districts.insert(r.record.district.as_str());
        pincodes.insert(r.record.pincode.as_str());
        if let Some(ym) = r.record.period.year_month() {
            months.insert(ym);
        }
    }
    let state = rows
        .iter()
        .find_map(|r| r.record.state.clone())
        .unwrap_or_else(|| default_state.to_string());

    let shares = MetricSet::from_counts(&totals);
    let aers: Vec<f64> = rows.iter().map(|r| r.metrics.aer).collect();
    let (min_aer, max_aer) = min_max(&aers);

    ExecutiveSummary {
        state,
        period_start: months.iter().next().map(|m| m.to_string()),
        period_end: months.iter().next_back().map(|m| m.to_string()),
        num_districts: districts.len(),
        num_pincodes: pincodes.len(),
        total_enrollments: totals.total(),
        total_child: totals.age_0_5,
        total_youth: totals.age_5_17,
        total_adult: totals.age_18_greater,
        child_share_pct: shares.child_pct,
        youth_share_pct: shares.youth_pct,
        adult_share_pct: shares.adult_pct,
        avg_aer: average(&aers),
        min_aer,
        max_aer,
        children_per_adult: totals.age_0_5 / totals.age_18_greater.max(1),
        grade_distribution: grade_counts(rows, |m| m.aer_grade),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::annotate;
    use crate::types::{EnrollmentRecord, Period, YearMonth};

    fn row(district: &str, pincode: &str, c0: u64, c2: u64) -> EnrollmentRecord {
        EnrollmentRecord {
            period: Period::Missing,
            state: None,
            district: district.to_string(),
            pincode: pincode.to_string(),
            pincode_valid: true,
            counts: AgeCounts::new(c0, 0, c2),
        }
    }

    #[test]
    fn variation_skips_small_districts_and_orders_by_cv() {
        let mut records = Vec::new();
        // Even: AER 0.1 in every PIN, CV 0
        for i in 0..5 {
            records.push(row("Even", &format!("50010{}", i), 90, 10));
        }
        // Uneven: AER 0, 0.1, 0.2, 0.3, 0.4
        for i in 0..5u64 {
            records.push(row("Uneven", &format!("50020{}", i), 100 - i * 10, i * 10));
        }
        records.push(row("Tiny", "500300", 90, 10));

        let stats = analyze_within_district_variation(&annotate(&records), 5);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].district, "Uneven");
        assert_eq!(stats[0].best_pincode, "500204");
        assert_eq!(stats[0].worst_pincode, "500200");
        assert!((stats[0].mean_aer - 0.2).abs() < 1e-12);
        assert!((stats[0].range_aer - 0.4).abs() < 1e-12);
        assert!(stats[0].cv_aer > 0.0);
        assert_eq!(stats[1].district, "Even");
        assert_eq!(stats[1].cv_aer, 0.0);
        assert_eq!(stats[1].best_pincode, "500100");
    }

    #[test]
    fn zero_mean_gives_zero_cv() {
        let records: Vec<EnrollmentRecord> =
            (0..3).map(|i| row("Dry", &format!("50000{}", i), 10, 0)).collect();
        let stats = analyze_within_district_variation(&annotate(&records), 3);
        assert_eq!(stats[0].cv_aer, 0.0);
    }

    #[test]
    fn scorecard_ties_share_truncated_average_rank() {
        let records = vec![
            row("Alpha", "500001", 90, 10), // 0.1
            row("Bravo", "500002", 99, 1),  // 0.01
            row("Charlie", "500003", 99, 1), // 0.01
        ];
        let card = create_performance_scorecard(&annotate(&records));
        let ranks: Vec<(usize, &str)> =
            card.iter().map(|e| (e.priority_rank, e.district.as_str())).collect();
        // Bravo/Charlie tie at 1.5 -> 1
        assert_eq!(ranks, vec![(1, "Bravo"), (1, "Charlie"), (3, "Alpha")]);
        assert_eq!(card[0].status, "⚠ Needs Improvement");
        assert_eq!(card[2].status, "✓ Acceptable");
    }

    #[test]
    fn summary_statistics() {
        let rows = annotate(&[row("A", "500001", 100, 0), row("A", "500002", 90, 10)]);
        let s = metric_summary(&rows);
        assert!((s.aer.mean - 0.05).abs() < 1e-12);
        assert_eq!(s.aer.min, 0.0);
        assert!((s.aer.max - 0.1).abs() < 1e-12);
        assert_eq!(s.aer_grades.get(&Grade::Red), Some(&1));
        assert_eq!(s.aer_grades.get(&Grade::Green), Some(&1));
    }

    #[test]
    fn executive_summary_totals() {
        let mut records = vec![row("A", "500001", 100, 0), row("B", "500002", 90, 10)];
        records[0].period = Period::Month(YearMonth { year: 2025, month: 1 });
        records[1].period = Period::Month(YearMonth { year: 2025, month: 4 });
        let s = executive_summary(&annotate(&records), "Telangana");
        assert_eq!(s.state, "Telangana");
        assert_eq!(s.total_enrollments, 200);
        assert_eq!(s.children_per_adult, 19);
        assert_eq!(s.period_start.as_deref(), Some("2025-01"));
        assert_eq!(s.period_end.as_deref(), Some("2025-04"));
        assert!((s.adult_share_pct - 5.0).abs() < 1e-9);
        assert_eq!(s.num_districts, 2);
    }

    #[test]
    fn empty_rows_give_zeroed_summaries() {
        let s = executive_summary(&[], "Telangana");
        assert_eq!(s.total_enrollments, 0);
        assert_eq!(s.child_share_pct, 0.0);
        assert!(create_performance_scorecard(&[]).is_empty());
        assert!(analyze_within_district_variation(&[], 5).is_empty());
        assert_eq!(metric_summary(&[]).aer.mean, 0.0);
    }
}
