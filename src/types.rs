use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};
use tabled::Tabled;

use crate::util::{display_pct, display_ratio, display_score};

/// One row as it arrives from the CSV, every field still an untrusted string.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct RawRow {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
    #[serde(default)]
    pub age_0_5: Option<String>,
    #[serde(default)]
    pub age_5_17: Option<String>,
    #[serde(default)]
    pub age_18_greater: Option<String>,
}

/// Raw rows plus the column names the source actually provided.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self { headers, rows }
    }

    /// Build a table whose header set is the full known schema.
    pub fn with_full_schema(rows: Vec<RawRow>) -> Self {
        let headers = crate::cleaning::REQUIRED_COLUMNS
            .iter()
            .chain(std::iter::once(&"state"))
            .map(|c| c.to_string())
            .collect();
        Self { headers, rows }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h.trim() == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The three age-band counts. Total is always derived, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct AgeCounts {
    pub age_0_5: u64,
    pub age_5_17: u64,
    pub age_18_greater: u64,
}

impl AgeCounts {
    pub fn new(age_0_5: u64, age_5_17: u64, age_18_greater: u64) -> Self {
        Self { age_0_5, age_5_17, age_18_greater }
    }

    /// Saturates at `u64::MAX` rather than overflowing on absurd inputs.
    pub fn total(&self) -> u64 {
        self.age_0_5
            .saturating_add(self.age_5_17)
            .saturating_add(self.age_18_greater)
    }
}

impl Add for AgeCounts {
    type Output = AgeCounts;

    fn add(self, rhs: AgeCounts) -> AgeCounts {
        AgeCounts {
            age_0_5: self.age_0_5.saturating_add(rhs.age_0_5),
            age_5_17: self.age_5_17.saturating_add(rhs.age_5_17),
            age_18_greater: self.age_18_greater.saturating_add(rhs.age_18_greater),
        }
    }
}

impl AddAssign for AgeCounts {
    fn add_assign(&mut self, rhs: AgeCounts) {
        *self = *self + rhs;
    }
}

/// Calendar month used as the monthly aggregation key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn from_date(date: NaiveDate) -> Self {
        use chrono::Datelike;
        Self { year: date.year(), month: date.month() }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// When a record was observed: a day, a whole month after monthly
/// aggregation, or unknown because the date did not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Period {
    Missing,
    Day(NaiveDate),
    Month(YearMonth),
}

impl Period {
    pub fn year_month(&self) -> Option<YearMonth> {
        match self {
            Period::Missing => None,
            Period::Day(d) => Some(YearMonth::from_date(*d)),
            Period::Month(ym) => Some(*ym),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Missing => write!(f, "missing"),
            Period::Day(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Period::Month(ym) => write!(f, "{}", ym),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentRecord {
    pub period: Period,
    pub state: Option<String>,
    pub district: String,
    pub pincode: String,
    pub pincode_valid: bool,
    pub counts: AgeCounts,
}

impl EnrollmentRecord {
    pub fn total_enrollments(&self) -> u64 {
        self.counts.total()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Grade {
    Red,
    Yellow,
    Green,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::Red => write!(f, "RED"),
            Grade::Yellow => write!(f, "YELLOW"),
            Grade::Green => write!(f, "GREEN"),
        }
    }
}

/// Used both for district priority and PIN-code risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "HIGH"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::Low => write!(f, "LOW"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Tier {
    #[serde(rename = "TIER 1 - URGENT")]
    Urgent,
    #[serde(rename = "TIER 2 - MODERATE")]
    Moderate,
    #[serde(rename = "TIER 3 - LOW PRIORITY")]
    LowPriority,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Urgent, Tier::Moderate, Tier::LowPriority];

    pub fn label(&self) -> &'static str {
        match self {
            Tier::Urgent => "TIER 1 - URGENT",
            Tier::Moderate => "TIER 2 - MODERATE",
            Tier::LowPriority => "TIER 3 - LOW PRIORITY",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSet {
    pub aer: f64,
    pub caes: f64,
    pub aebi: f64,
    pub aer_pct: f64,
    pub child_pct: f64,
    pub youth_pct: f64,
    pub adult_pct: f64,
    pub aer_grade: Grade,
    pub aebi_grade: Grade,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedRecord {
    pub record: EnrollmentRecord,
    pub metrics: MetricSet,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DistrictRankingRow {
    pub rank: usize,
    pub district: String,
    pub total_enrollments: u64,
    pub age_0_5: u64,
    pub age_5_17: u64,
    pub age_18_greater: u64,
    #[tabled(display_with = "display_ratio")]
    pub aer: f64,
    #[tabled(display_with = "display_pct")]
    pub aer_pct: f64,
    #[tabled(display_with = "display_score")]
    pub aebi: f64,
    pub aer_grade: Grade,
    pub aebi_grade: Grade,
    pub priority: Priority,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PincodeRankingRow {
    pub rank: usize,
    pub district: String,
    pub pincode: String,
    pub total_enrollments: u64,
    #[tabled(display_with = "display_ratio")]
    pub aer: f64,
    #[tabled(display_with = "display_pct")]
    pub aer_pct: f64,
    pub risk_level: Priority,
    pub recommendation: String,
    #[tabled(display_with = "display_pct")]
    pub child_pct: f64,
    #[tabled(display_with = "display_pct")]
    pub youth_pct: f64,
    #[tabled(display_with = "display_pct")]
    pub adult_pct: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PriorityZoneRow {
    pub tier: Tier,
    pub district: String,
    pub pincode: String,
    pub total_enrollments: u64,
    #[tabled(display_with = "display_pct")]
    pub aer_pct: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct VariationRow {
    pub district: String,
    pub num_pincodes: usize,
    #[tabled(display_with = "display_ratio")]
    pub mean_aer: f64,
    #[tabled(display_with = "display_ratio")]
    pub median_aer: f64,
    #[tabled(display_with = "display_ratio")]
    pub std_aer: f64,
    #[tabled(display_with = "display_ratio")]
    pub min_aer: f64,
    #[tabled(display_with = "display_ratio")]
    pub max_aer: f64,
    #[tabled(display_with = "display_score")]
    pub cv_aer: f64,
    #[tabled(display_with = "display_ratio")]
    pub range_aer: f64,
    pub best_pincode: String,
    pub worst_pincode: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ScorecardRow {
    pub priority_rank: usize,
    pub district: String,
    pub total_enrollments: u64,
    #[tabled(display_with = "display_pct")]
    pub aer_pct: f64,
    #[tabled(display_with = "display_score")]
    pub aebi: f64,
    #[tabled(display_with = "display_score")]
    pub caes: f64,
    pub aer_grade: Grade,
    pub status: String,
}
