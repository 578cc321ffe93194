//! Field-level analysis of one inspection.

use portdq_core::{CategoryCode, FieldStatistic, InspectionResult, Severity};
use serde::{Deserialize, Serialize};

/// Count of statistics sharing a check type and severity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityCount {
    /// Severity grade
    pub severity: Severity,
    /// Number of statistics with this grade
    pub count: usize,
    /// Check type the statistics belong to
    pub check_type: CategoryCode,
}

/// Field statistics of an inspection plus their severity distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAnalysis {
    /// Statistics in evaluation order
    pub field_statistics: Vec<FieldStatistic>,
    /// One entry per `(check_type, severity)` pair, first seen first
    pub severity_distribution: Vec<SeverityCount>,
}

impl FieldAnalysis {
    /// Analyze a stored result.
    pub fn analyze(result: &InspectionResult) -> Self {
        Self::from_statistics(result.field_statistics.clone())
    }

    /// Analyze a list of statistics.
    pub fn from_statistics(field_statistics: Vec<FieldStatistic>) -> Self {
        let mut severity_distribution: Vec<SeverityCount> = Vec::new();
        for stat in &field_statistics {
            match severity_distribution
                .iter_mut()
                .find(|c| c.check_type == stat.check_type && c.severity == stat.severity)
            {
                Some(entry) => entry.count += 1,
                None => severity_distribution.push(SeverityCount {
                    severity: stat.severity,
                    count: 1,
                    check_type: stat.check_type,
                }),
            }
        }

        Self {
            field_statistics,
            severity_distribution,
        }
    }
}
