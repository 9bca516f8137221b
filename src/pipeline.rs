//! One full pass: clean → (monthly) → metrics → rankings → summaries.
use log::info;

use crate::cleaning;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, ValidationReport};
use crate::metrics;
use crate::ranking::{self, DistrictRanking, PincodeRanking, PriorityZone};
use crate::summary::{self, DistrictVariation, ExecutiveSummary, MetricSummary, ScorecardEntry};
use crate::types::{AnnotatedRecord, RawTable};

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub records: Vec<AnnotatedRecord>,
    pub validation: ValidationReport,
    pub districts: Vec<DistrictRanking>,
    pub pincodes: Vec<PincodeRanking>,
    pub priority_zones: Vec<PriorityZone>,
    pub variation: Vec<DistrictVariation>,
    pub scorecard: Vec<ScorecardEntry>,
    pub metric_summary: MetricSummary,
    pub executive_summary: ExecutiveSummary,
}

pub fn run(table: &RawTable, config: &PipelineConfig) -> Result<PipelineOutput, PipelineError> {
    config.validate()?;

    let (cleaned, validation) = cleaning::clean(table, config)?;
    let cleaned = if config.aggregate_monthly {
        cleaning::aggregate_monthly(&cleaned)
    } else {
        cleaned
    };
    let records = metrics::annotate(&cleaned);

    let districts = ranking::rank_districts(&records, config.rank_metric, &config.priority_split);
    let pincodes = ranking::rank_pincodes(
        &records,
        config.rank_metric,
        config.pin_min_enrollments,
        config.pin_top_n,
    );
    let priority_zones = ranking::identify_priority_zones(
        &records,
        config.zone_aer_threshold,
        config.zone_min_enrollments,
    );
    let variation = summary::analyze_within_district_variation(&records, config.variation_min_pincodes);
    let scorecard = summary::create_performance_scorecard(&records);
    let metric_summary = summary::metric_summary(&records);
    let executive_summary = summary::executive_summary(&records, &config.default_state);

    info!(
        "Pipeline finished: {} records, {} districts, {} PIN codes, {} priority zones",
        records.len(),
        districts.len(),
        pincodes.len(),
        priority_zones.len()
    );

    Ok(PipelineOutput {
        records,
        validation,
        districts,
        pincodes,
        priority_zones,
        variation,
        scorecard,
        metric_summary,
        executive_summary,
    })
}
