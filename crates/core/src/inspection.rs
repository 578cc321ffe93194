//! Inspection results and their summaries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category::{CategoryCode, CheckDimension};
use crate::id::InspectionId;
use crate::statistic::{pass_rate, FieldStatistic};
use crate::Time;

/// Roll-up status of one check type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Fail,
}

/// Per-check-type summary shown for an inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckBreakdown {
    pub status: CheckStatus,
    pub pass_rate: f64,
    pub total_checks: u64,
    pub failed_checks: u64,
}

impl CheckBreakdown {
    /// Build from totals. Any failure makes the status `FAIL`.
    pub fn new(total_checks: u64, failed_checks: u64) -> Self {
        let passed = total_checks.saturating_sub(failed_checks);
        Self {
            status: if failed_checks > 0 {
                CheckStatus::Fail
            } else {
                CheckStatus::Pass
            },
            pass_rate: pass_rate(passed, total_checks),
            total_checks,
            failed_checks,
        }
    }
}

/// Derived summary of an inspection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InspectionSummary {
    pub overall_rate: f64,
    pub total_checks: u64,
    pub total_passed: u64,
    pub breakdown: BTreeMap<CategoryCode, CheckBreakdown>,
}

/// Persisted outcome of one inspection. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionResult {
    pub inspection_id: InspectionId,
    pub data_type_id: String,
    pub created_at: Time,
    pub field_statistics: Vec<FieldStatistic>,
    pub summary: InspectionSummary,
}

impl InspectionResult {
    /// Pooled pass rate over statistics of one dimension.
    ///
    /// `None` when the result holds no statistic of that dimension.
    pub fn dimension_rate(&self, dimension: CheckDimension) -> Option<f64> {
        let (total, passed) = self
            .field_statistics
            .iter()
            .filter(|s| s.rule_kind.map(|k| k.dimension()) == Some(dimension))
            .fold((0u64, 0u64), |(t, p), s| (t + s.total_checks, p + s.pass_count));
        let any = self
            .field_statistics
            .iter()
            .any(|s| s.rule_kind.map(|k| k.dimension()) == Some(dimension));
        any.then(|| pass_rate(passed, total))
    }
}

/// Latest summary for a data type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub data_type_id: String,
    pub inspection_id: InspectionId,
    #[serde(flatten)]
    pub summary: InspectionSummary,
    pub last_inspection_date: Time,
}
