//! District and PIN-code rankings.
//!
//! Rankings never average per-row metrics: counts are summed per group and
//! the metrics are re-derived from the sums.
use log::info;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::config::{PrioritySplit, RankMetric};
use crate::types::{AgeCounts, AnnotatedRecord, MetricSet, Priority, Tier};

#[derive(Debug, Clone, PartialEq)]
pub struct DistrictRanking {
    pub rank: usize,
    pub district: String,
    pub counts: AgeCounts,
    pub metrics: MetricSet,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PincodeRanking {
    pub rank: usize,
    pub district: String,
    pub pincode: String,
    pub counts: AgeCounts,
    pub metrics: MetricSet,
    pub risk_level: Priority,
    pub recommendation: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriorityZone {
    pub tier: Tier,
    pub district: String,
    pub pincode: String,
    pub counts: AgeCounts,
    pub metrics: MetricSet,
}

/// Summed counts with metrics re-derived from the sums.
#[derive(Debug, Clone, PartialEq)]
pub struct PincodeAggregate {
    pub district: String,
    pub pincode: String,
    pub counts: AgeCounts,
    pub metrics: MetricSet,
}

/// Sum counts per district; groups come back in district-name order.
pub fn aggregate_by_district(rows: &[AnnotatedRecord]) -> Vec<(String, AgeCounts, MetricSet)> {
    let mut groups: BTreeMap<&str, AgeCounts> = BTreeMap::new();
    for r in rows {
        *groups.entry(r.record.district.as_str()).or_default() += r.record.counts;
    }
    groups
        .into_iter()
        .map(|(district, counts)| (district.to_string(), counts, MetricSet::from_counts(&counts)))
        .collect()
}

/// Sum counts per (district, pincode), ordered by that key.
pub fn aggregate_by_pincode(rows: &[AnnotatedRecord]) -> Vec<PincodeAggregate> {
    let mut groups: BTreeMap<(&str, &str), AgeCounts> = BTreeMap::new();
    for r in rows {
        let key = (r.record.district.as_str(), r.record.pincode.as_str());
        *groups.entry(key).or_default() += r.record.counts;
    }
    groups
        .into_iter()
        .map(|((district, pincode), counts)| PincodeAggregate {
            district: district.to_string(),
            pincode: pincode.to_string(),
            counts,
            metrics: MetricSet::from_counts(&counts),
        })
        .collect()
}

/// Stable ascending order; equal values keep grouping order.
fn ascending(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Priority from rank position: the first `high` share of ranks is HIGH,
/// up to the `medium` share MEDIUM, the rest LOW.
pub fn priority_for_rank(rank: usize, n: usize, split: &PrioritySplit) -> Priority {
    let r = rank as f64;
    let n = n as f64;
    if r <= n * split.high {
        Priority::High
    } else if r <= n * split.medium {
        Priority::Medium
    } else {
        Priority::Low
    }
}

pub fn risk_level(aer: f64) -> Priority {
    if aer < 0.005 {
        Priority::High
    } else if aer < 0.02 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

pub fn recommendation(counts: &AgeCounts, aer: f64) -> &'static str {
    if counts.age_18_greater == 0 {
        "Targeted adult drive needed"
    } else if aer < 0.01 {
        "Adult outreach required"
    } else if aer < 0.03 {
        "Moderate improvement needed"
    } else if aer < 0.05 {
        "Slight optimization possible"
    } else {
        "Best-practice center"
    }
}

pub fn zone_tier(aer: f64) -> Tier {
    if aer < 0.001 {
        Tier::Urgent
    } else if aer < 0.005 {
        Tier::Moderate
    } else {
        Tier::LowPriority
    }
}

pub fn rank_districts(
    rows: &[AnnotatedRecord],
    metric: RankMetric,
    split: &PrioritySplit,
) -> Vec<DistrictRanking> {
    let mut districts = aggregate_by_district(rows);
    districts.sort_by(|a, b| ascending(metric.value(&a.2), metric.value(&b.2)));

    let n = districts.len();
    let ranked: Vec<DistrictRanking> = districts
        .into_iter()
        .enumerate()
        .map(|(idx, (district, counts, metrics))| DistrictRanking {
            rank: idx + 1,
            district,
            counts,
            metrics,
            priority: priority_for_rank(idx + 1, n, split),
        })
        .collect();
    info!("Ranked {} districts by {}", ranked.len(), metric.to_string().to_uppercase());
    ranked
}

pub fn rank_pincodes(
    rows: &[AnnotatedRecord],
    metric: RankMetric,
    min_enrollments: u64,
    top_n: Option<usize>,
) -> Vec<PincodeRanking> {
    let mut pins: Vec<PincodeAggregate> = aggregate_by_pincode(rows)
        .into_iter()
        .filter(|p| p.counts.total() >= min_enrollments)
        .collect();
    pins.sort_by(|a, b| ascending(metric.value(&a.metrics), metric.value(&b.metrics)));

    let ranked: Vec<PincodeRanking> = pins
        .into_iter()
        .take(top_n.unwrap_or(usize::MAX))
        .enumerate()
        .map(|(idx, p)| PincodeRanking {
            rank: idx + 1,
            risk_level: risk_level(p.metrics.aer),
            recommendation: recommendation(&p.counts, p.metrics.aer),
            district: p.district,
            pincode: p.pincode,
            counts: p.counts,
            metrics: p.metrics,
        })
        .collect();
    info!(
        "Ranked {} PIN codes by {} (minimum {} enrollments)",
        ranked.len(),
        metric.to_string().to_uppercase(),
        min_enrollments
    );
    ranked
}

pub fn identify_priority_zones(
    rows: &[AnnotatedRecord],
    aer_threshold: f64,
    min_enrollments: u64,
) -> Vec<PriorityZone> {
    let mut zones: Vec<PriorityZone> = aggregate_by_pincode(rows)
        .into_iter()
        .filter(|p| p.counts.total() >= min_enrollments && p.metrics.aer < aer_threshold)
        .map(|p| PriorityZone {
            tier: zone_tier(p.metrics.aer),
            district: p.district,
            pincode: p.pincode,
            counts: p.counts,
            metrics: p.metrics,
        })
        .collect();
    zones.sort_by(|a, b| ascending(a.metrics.aer, b.metrics.aer));

    info!(
        "Identified {} priority zones (AER < {:.1}%, min enrollments: {})",
        zones.len(),
        aer_threshold * 100.0,
        min_enrollments
    );
    for (tier, count) in tier_breakdown(&zones) {
        if count > 0 {
            info!("  {}: {} zones", tier, count);
        }
    }
    zones
}

/// Zone count per tier, most urgent first.
pub fn tier_breakdown(zones: &[PriorityZone]) -> Vec<(Tier, usize)> {
    Tier::ALL
        .iter()
        .map(|t| (*t, zones.iter().filter(|z| z.tier == *t).count()))
        .collect()
}
