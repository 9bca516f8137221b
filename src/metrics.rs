//! Enrollment imbalance metrics.
//!
//! Every aggregate in the crate derives its metrics through
//! [`MetricSet::from_counts`], so district, PIN-code and per-row values share
//! exactly one set of formulas.
use log::info;

use crate::types::{AgeCounts, AnnotatedRecord, EnrollmentRecord, Grade, MetricSet};

/// Reference youth share the AEBI penalizes deviation from.
const AEBI_YOUTH_REFERENCE: f64 = 0.05;
/// Width of the linear falloff around the reference share.
const AEBI_YOUTH_WINDOW: f64 = 0.1;

/// Adult Enrollment Ratio: adults over all enrollments, 0 for an empty total.
pub fn aer(age_0_5: u64, age_5_17: u64, age_18_greater: u64) -> f64 {
    let total = AgeCounts::new(age_0_5, age_5_17, age_18_greater).total();
    if total == 0 {
        return 0.0;
    }
    age_18_greater as f64 / total as f64
}

/// Child-to-Adult Enrollment Skew, smoothed with +1 on the adult count.
pub fn caes(age_0_5: u64, age_18_greater: u64) -> f64 {
    age_0_5 as f64 / (age_18_greater as f64 + 1.0)
}

/// Age Enrollment Balance Index, clamped to [0, 100].
pub fn aebi(age_0_5: u64, age_5_17: u64, age_18_greater: u64) -> f64 {
    let total = AgeCounts::new(age_0_5, age_5_17, age_18_greater).total();
    if total == 0 {
        return 0.0;
    }
    let ratio_5_17 = age_5_17 as f64 / total as f64;
    let score = aer(age_0_5, age_5_17, age_18_greater) * 100.0
        + (1.0 - (ratio_5_17 - AEBI_YOUTH_REFERENCE).abs() / AEBI_YOUTH_WINDOW);
    score.clamp(0.0, 100.0)
}

pub fn classify_aer(aer: f64) -> Grade {
    if aer >= 0.05 {
        Grade::Green
    } else if aer >= 0.01 {
        Grade::Yellow
    } else {
        Grade::Red
    }
}

pub fn classify_aebi(aebi: f64) -> Grade {
    if aebi >= 7.0 {
        Grade::Green
    } else if aebi >= 3.0 {
        Grade::Yellow
    } else {
        Grade::Red
    }
}

fn share_pct(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

impl MetricSet {
    pub fn from_counts(c: &AgeCounts) -> Self {
        let total = c.total();
        let aer = aer(c.age_0_5, c.age_5_17, c.age_18_greater);
        let aebi = aebi(c.age_0_5, c.age_5_17, c.age_18_greater);
        MetricSet {
            aer,
            caes: caes(c.age_0_5, c.age_18_greater),
            aebi,
            aer_pct: aer * 100.0,
            child_pct: share_pct(c.age_0_5, total),
            youth_pct: share_pct(c.age_5_17, total),
            adult_pct: share_pct(c.age_18_greater, total),
            aer_grade: classify_aer(aer),
            aebi_grade: classify_aebi(aebi),
        }
    }
}

/// Attach a freshly computed [`MetricSet`] to every record.
pub fn annotate(records: &[EnrollmentRecord]) -> Vec<AnnotatedRecord> {
    let annotated: Vec<AnnotatedRecord> = records
        .iter()
        .map(|r| AnnotatedRecord {
            record: r.clone(),
            metrics: MetricSet::from_counts(&r.counts),
        })
        .collect();
    info!("Calculated imbalance metrics for {} records", annotated.len());
    annotated
}
