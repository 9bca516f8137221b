//! Flatten typed pipeline results into the tabular shapes the
//! presentation and export layers consume.
use serde::Serialize;

use crate::error::ValidationReport;
use crate::pipeline::PipelineOutput;
use crate::ranking::{tier_breakdown, DistrictRanking, PincodeRanking, PriorityZone};
use crate::summary::{DistrictVariation, ExecutiveSummary, MetricSummary, ScorecardEntry};
use crate::types::{
    DistrictRankingRow, PincodeRankingRow, PriorityZoneRow, ScorecardRow, VariationRow,
};

pub fn district_rows(ranked: &[DistrictRanking]) -> Vec<DistrictRankingRow> {
    ranked
        .iter()
        .map(|d| DistrictRankingRow {
            rank: d.rank,
            district: d.district.clone(),
            total_enrollments: d.counts.total(),
            age_0_5: d.counts.age_0_5,
            age_5_17: d.counts.age_5_17,
            age_18_greater: d.counts.age_18_greater,
            aer: d.metrics.aer,
            aer_pct: d.metrics.aer_pct,
            aebi: d.metrics.aebi,
            aer_grade: d.metrics.aer_grade,
            aebi_grade: d.metrics.aebi_grade,
            priority: d.priority,
        })
        .collect()
}

pub fn pincode_rows(ranked: &[PincodeRanking]) -> Vec<PincodeRankingRow> {
    ranked
        .iter()
        .map(|p| PincodeRankingRow {
            rank: p.rank,
            district: p.district.clone(),
            pincode: p.pincode.clone(),
            total_enrollments: p.counts.total(),
            aer: p.metrics.aer,
            aer_pct: p.metrics.aer_pct,
            risk_level: p.risk_level,
            recommendation: p.recommendation.to_string(),
            child_pct: p.metrics.child_pct,
            youth_pct: p.metrics.youth_pct,
            adult_pct: p.metrics.adult_pct,
        })
        .collect()
}

pub fn priority_zone_rows(zones: &[PriorityZone]) -> Vec<PriorityZoneRow> {
    zones
        .iter()
        .map(|z| PriorityZoneRow {
            tier: z.tier,
            district: z.district.clone(),
            pincode: z.pincode.clone(),
            total_enrollments: z.counts.total(),
            aer_pct: z.metrics.aer_pct,
        })
        .collect()
}

pub fn variation_rows(stats: &[DistrictVariation]) -> Vec<VariationRow> {
    stats
        .iter()
        .map(|v| VariationRow {
            district: v.district.clone(),
            num_pincodes: v.num_pincodes,
            mean_aer: v.mean_aer,
            median_aer: v.median_aer,
            std_aer: v.std_aer,
            min_aer: v.min_aer,
            max_aer: v.max_aer,
            cv_aer: v.cv_aer,
            range_aer: v.range_aer,
            best_pincode: v.best_pincode.clone(),
            worst_pincode: v.worst_pincode.clone(),
        })
        .collect()
}

pub fn scorecard_rows(card: &[ScorecardEntry]) -> Vec<ScorecardRow> {
    card.iter()
        .map(|e| ScorecardRow {
            priority_rank: e.priority_rank,
            district: e.district.clone(),
            total_enrollments: e.counts.total(),
            aer_pct: e.metrics.aer_pct,
            aebi: e.metrics.aebi,
            caes: e.metrics.caes,
            aer_grade: e.metrics.aer_grade,
            status: e.status.to_string(),
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct ValidationSummary {
    pub input_rows: usize,
    pub output_rows: usize,
    pub date_format: Option<String>,
    pub unparsed_dates: usize,
    pub invalid_pincodes: usize,
    pub missing_counts: usize,
    pub duplicate_rows: usize,
    pub warnings: usize,
}

impl From<&ValidationReport> for ValidationSummary {
    fn from(r: &ValidationReport) -> Self {
        Self {
            input_rows: r.input_rows,
            output_rows: r.output_rows,
            date_format: r.date_format.map(str::to_string),
            unparsed_dates: r.unparsed_dates,
            invalid_pincodes: r.invalid_pincodes,
            missing_counts: r.missing_counts,
            duplicate_rows: r.duplicate_rows,
            warnings: r.warnings.len(),
        }
    }
}

/// Everything written to `summary.json`.
#[derive(Debug, Serialize)]
pub struct SummaryDocument<'a> {
    pub executive: &'a ExecutiveSummary,
    pub metrics: &'a MetricSummary,
    pub validation: ValidationSummary,
    pub priority_zone_tiers: Vec<(String, usize)>,
    pub district_count: usize,
    pub ranked_pincodes: usize,
}

pub fn summary_document(out: &PipelineOutput) -> SummaryDocument<'_> {
    SummaryDocument {
        executive: &out.executive_summary,
        metrics: &out.metric_summary,
        validation: ValidationSummary::from(&out.validation),
        priority_zone_tiers: tier_breakdown(&out.priority_zones)
            .into_iter()
            .map(|(t, n)| (t.label().to_string(), n))
            .collect(),
        district_count: out.districts.len(),
        ranked_pincodes: out.pincodes.len(),
    }
}
