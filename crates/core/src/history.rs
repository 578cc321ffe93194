//! History buckets for trend charts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Bucket granularity of a history query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
}

/// Requested history period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryPeriod {
    Daily,
    Weekly,
    Monthly,
    /// Inclusive calendar-date range.
    Custom { start: NaiveDate, end: NaiveDate },
}

/// One time bucket of inspection results. Recomputed on every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    /// Bucket label
    pub date: String,
    /// Mean overall pass rate of the bucket's inspections
    pub score: f64,
    pub total_checks: u64,
    pub passed_checks: u64,
    pub failed_checks: u64,
    pub completeness_rate: f64,
    pub validity_rate: f64,
    /// Number of inspections folded into the bucket
    pub inspections: usize,
}
