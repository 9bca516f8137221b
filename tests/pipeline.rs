use enrollment_ranker::cache::PipelineCache;
use enrollment_ranker::error::ValidationWarning;
use enrollment_ranker::loader::load_from_reader;
use enrollment_ranker::output::{self, DISTRICT_FILE, PINCODE_FILE, SUMMARY_FILE, ZONE_FILE};
use enrollment_ranker::{run, Grade, PipelineConfig, PipelineError, Priority, RankMetric, Tier};

const SAMPLE: &str = "\
date,state,district,pincode,age_0_5,age_5_17,age_18_greater
01-03-2025,Telangana,Hyderabad,500001,2,3,1
01-03-2025,Telangana,HYDERABAD,500001,1,0,4
02-03-2025,Telangana,Hyderabad,500002,100,20,0
03-03-2025,Telangana,Ranga Reddy,501101,3,1,1
03-03-2025,Telangana,Rangareddy,501102,80,15,5
04-03-2025,Telangana,Nalgonda,508001,40,5,5
05-03-2025,Telangana,Nalgonda,50800X,10,2,
bad-date,Telangana,Nalgonda,508002,60,10,1
";

fn sample_output(config: &PipelineConfig) -> enrollment_ranker::PipelineOutput {
    let (table, _) = load_from_reader(SAMPLE.as_bytes()).unwrap();
    run(&table, config).unwrap()
}

#[test]
fn cleaning_merges_duplicates_and_flags_bad_rows() {
    let out = sample_output(&PipelineConfig::default());
    let v = &out.validation;
    assert_eq!(v.input_rows, 8);
    assert_eq!(v.duplicate_rows, 1);
    assert_eq!(v.output_rows, 7);
    assert_eq!(v.unparsed_dates, 1);
    assert_eq!(v.invalid_pincodes, 1);
    assert_eq!(v.missing_counts, 1);

    let merged = out
        .records
        .iter()
        .find(|r| r.record.pincode == "500001")
        .unwrap();
    assert_eq!(merged.record.total_enrollments(), 11);
    assert_eq!(
        (merged.record.counts.age_0_5, merged.record.counts.age_5_17, merged.record.counts.age_18_greater),
        (3, 3, 5)
    );
}

#[test]
fn districts_are_canonicalized_and_ranked_worst_first() {
    let out = sample_output(&PipelineConfig::default());
    let names: Vec<&str> = out.districts.iter().map(|d| d.district.as_str()).collect();
    // Hyderabad 5/131, Nalgonda 6/133, Rangareddy 6/105
    assert_eq!(names, vec!["Hyderabad", "Nalgonda", "Rangareddy"]);
    assert_eq!(out.districts.iter().map(|d| d.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(out.districts[0].priority, Priority::Medium);
    assert_eq!(out.districts[2].priority, Priority::Low);
    for w in out.districts.windows(2) {
        assert!(w[0].metrics.aer <= w[1].metrics.aer);
    }
}

#[test]
fn small_pin_excluded_from_pin_ranking_but_counted_for_district() {
    let out = sample_output(&PipelineConfig::default());
    // 501101 has 5 enrollments, below the floor of 10
    assert!(out.pincodes.iter().all(|p| p.pincode != "501101"));
    let rr = out.districts.iter().find(|d| d.district == "Rangareddy").unwrap();
    assert_eq!(rr.counts.total(), 105);
}

#[test]
fn zero_adult_pin_is_tier_one_with_adult_drive() {
    let out = sample_output(&PipelineConfig::default());
    let zone = out.priority_zones.iter().find(|z| z.pincode == "500002").unwrap();
    assert_eq!(zone.tier, Tier::Urgent);
    assert_eq!(out.priority_zones[0].pincode, "500002");

    let pin = out.pincodes.iter().find(|p| p.pincode == "500002").unwrap();
    assert_eq!(pin.rank, 1);
    assert_eq!(pin.recommendation, "Targeted adult drive needed");
    assert_eq!(pin.risk_level, Priority::High);
    assert_eq!(pin.metrics.aer_grade, Grade::Red);
}

#[test]
fn ranking_metric_is_configurable() {
    let config = PipelineConfig { rank_metric: RankMetric::Aebi, ..PipelineConfig::default() };
    let out = sample_output(&config);
    for w in out.districts.windows(2) {
        assert!(w[0].metrics.aebi <= w[1].metrics.aebi);
    }
}

#[test]
fn missing_columns_fail_fast() {
    let csv = "date,district,pincode,age_0_5\n01-03-2025,Nalgonda,508001,4\n";
    let (table, _) = load_from_reader(csv.as_bytes()).unwrap();
    match run(&table, &PipelineConfig::default()) {
        Err(PipelineError::Schema { missing }) => {
            assert_eq!(missing, vec!["age_5_17".to_string(), "age_18_greater".to_string()]);
        }
        other => panic!("expected schema error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn cached_runs_are_reused_per_config() {
    let (table, _) = load_from_reader(SAMPLE.as_bytes()).unwrap();
    let mut cache = PipelineCache::new();
    let config = PipelineConfig::default();
    cache.get_or_run(&table, &config).unwrap();
    cache.get_or_run(&table, &config).unwrap();
    let looser = PipelineConfig { pin_min_enrollments: 1, ..config };
    let out = cache.get_or_run(&table, &looser).unwrap();
    assert!(out.pincodes.iter().any(|p| p.pincode == "501101"));
    assert_eq!((cache.hits(), cache.misses()), (1, 2));
}

#[test]
fn exports_every_table() {
    let dir = tempfile::tempdir().unwrap();
    let out = sample_output(&PipelineConfig::default());
    let written = output::write_all(dir.path(), &out).unwrap();
    assert_eq!(written.len(), 6);

    let districts = std::fs::read_to_string(dir.path().join(DISTRICT_FILE)).unwrap();
    assert_eq!(
        districts.lines().next().unwrap(),
        "rank,district,total_enrollments,age_0_5,age_5_17,age_18_greater,aer,aer_pct,aebi,aer_grade,aebi_grade,priority"
    );
    let pins = std::fs::read_to_string(dir.path().join(PINCODE_FILE)).unwrap();
    assert_eq!(
        pins.lines().next().unwrap(),
        "rank,district,pincode,total_enrollments,aer,aer_pct,risk_level,recommendation,child_pct,youth_pct,adult_pct"
    );
    let zones = std::fs::read_to_string(dir.path().join(ZONE_FILE)).unwrap();
    assert!(zones.lines().nth(1).unwrap().starts_with("TIER 1 - URGENT,Hyderabad,500002,120,"));

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap()).unwrap();
    assert_eq!(summary["executive"]["state"], "Telangana");
    assert_eq!(summary["validation"]["duplicate_rows"], 1);
}

#[test]
fn huge_counts_warn_without_halting() {
    let csv = "\
date,state,district,pincode,age_0_5,age_5_17,age_18_greater
01-03-2025,Telangana,Hyderabad,500001,10000000000000000000,1,1
01-03-2025,Telangana,Hyderabad,500001,10000000000000000000,1,1
02-03-2025,Telangana,Nalgonda,508001,99999999999999999999999,4,2
";
    let (table, _) = load_from_reader(csv.as_bytes()).unwrap();
    let out = run(&table, &PipelineConfig::default()).unwrap();

    let merged = out.records.iter().find(|r| r.record.pincode == "500001").unwrap();
    assert_eq!(merged.record.counts.age_0_5, u64::MAX);
    assert_eq!(merged.record.total_enrollments(), u64::MAX);
    let single = out.records.iter().find(|r| r.record.pincode == "508001").unwrap();
    assert_eq!(single.record.total_enrollments(), u64::MAX);

    assert!(out
        .validation
        .warnings
        .iter()
        .any(|w| matches!(w, ValidationWarning::ExcessiveCount { column: "age_0_5", .. })));
    assert!(out.districts.iter().all(|d| d.metrics.aer.is_finite()));
    assert_eq!(out.executive_summary.total_enrollments, u64::MAX);
}
