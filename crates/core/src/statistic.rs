//! Per-field rule outcomes.

use serde::{Deserialize, Serialize};

use crate::category::{CategoryCode, CheckDimension, RuleKind};

/// How serious a field statistic's failures are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Grade a statistic by its failure count and pass rate.
    pub fn grade(fail_count: u64, pass_rate: f64) -> Self {
        if fail_count == 0 {
            Severity::Info
        } else if pass_rate >= 95.0 {
            Severity::Warning
        } else if pass_rate >= 80.0 {
            Severity::Error
        } else {
            Severity::Critical
        }
    }
}

/// Outcome of one rule applied to one field (or field group).
///
/// `pass_count + fail_count == total_checks` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldStatistic {
    pub field_name: String,
    pub check_type: CategoryCode,
    /// `None` for a statistic recorded against an unknown rule kind.
    pub rule_kind: Option<RuleKind>,
    pub total_checks: u64,
    pub pass_count: u64,
    pub fail_count: u64,
    pub affected_rows: u64,
    pub pass_rate: f64,
    pub message: String,
    pub severity: Severity,
}

impl FieldStatistic {
    /// Build a statistic from pass/fail counts, generating its message.
    pub fn from_counts(
        field_name: impl Into<String>,
        check_type: CategoryCode,
        rule_kind: RuleKind,
        pass_count: u64,
        fail_count: u64,
    ) -> Self {
        let field_name = field_name.into();
        let total_checks = pass_count + fail_count;
        let pass_rate = pass_rate(pass_count, total_checks);
        let message = render_message(rule_kind.dimension(), &field_name, total_checks, fail_count);
        Self {
            field_name,
            check_type,
            rule_kind: Some(rule_kind),
            total_checks,
            pass_count,
            fail_count,
            affected_rows: fail_count,
            pass_rate,
            message,
            severity: Severity::grade(fail_count, pass_rate),
        }
    }

    /// A zero-count statistic standing in for a misconfigured rule.
    pub fn degraded(
        field_name: impl Into<String>,
        check_type: CategoryCode,
        rule_kind: Option<RuleKind>,
        reason: &str,
    ) -> Self {
        let field_name = field_name.into();
        let message = format!("[{field_name}] 규칙 설정 오류: {reason}");
        Self {
            field_name,
            check_type,
            rule_kind,
            total_checks: 0,
            pass_count: 0,
            fail_count: 0,
            affected_rows: 0,
            pass_rate: 0.0,
            message,
            severity: Severity::Error,
        }
    }

    /// True when this statistic records a rule that could not be evaluated.
    pub fn is_degraded(&self) -> bool {
        self.total_checks == 0 && self.severity == Severity::Error
    }

    /// Message to show for this statistic.
    ///
    /// A stored message always wins; one is regenerated only when none was kept.
    pub fn display_message(&self) -> String {
        if !self.message.trim().is_empty() {
            return self.message.clone();
        }
        let dimension = self
            .rule_kind
            .map(|k| k.dimension())
            .unwrap_or(CheckDimension::Validity);
        render_message(dimension, &self.field_name, self.total_checks, self.affected_rows)
    }
}

/// `passed / total * 100`, or 0 when nothing was checked.
pub fn pass_rate(passed: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        passed as f64 / total as f64 * 100.0
    }
}

/// The dashboard's summary sentence for a statistic.
pub fn render_message(dimension: CheckDimension, field: &str, total: u64, affected: u64) -> String {
    match dimension {
        CheckDimension::Completeness => {
            format!("[{field}] 항목에 전체 [{total}]개 중 [{affected}]개의 빈값이 확인 되었습니다")
        }
        CheckDimension::Validity => {
            let valid = total.saturating_sub(affected);
            format!("[{field}] 항목에 전체 [{total}]개 중 [{valid}]개의 유효값이 확인 되었습니다")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_counts_keeps_totals_consistent() {
        let stat = FieldStatistic::from_counts("callYr", CategoryCode::DV, RuleKind::Range, 98, 2);
        assert_eq!(stat.total_checks, 100);
        assert_eq!(stat.pass_count + stat.fail_count, stat.total_checks);
        assert_eq!(stat.affected_rows, 2);
        assert!((stat.pass_rate - 98.0).abs() < 1e-9);
        assert_eq!(stat.severity, Severity::Warning);
        assert_eq!(stat.message, "[callYr] 항목에 전체 [100]개 중 [98]개의 유효값이 확인 되었습니다");
    }

    #[test]
    fn test_completeness_message() {
        let stat = FieldStatistic::from_counts("wkTime", CategoryCode::DU, RuleKind::Usage, 45, 5);
        assert_eq!(stat.message, "[wkTime] 항목에 전체 [50]개 중 [5]개의 빈값이 확인 되었습니다");
    }

    #[test]
    fn test_zero_checks_has_zero_rate() {
        let stat = FieldStatistic::from_counts("x", CategoryCode::DI, RuleKind::Duplicate, 0, 0);
        assert_eq!(stat.pass_rate, 0.0);
        assert_eq!(stat.severity, Severity::Info);
        assert_eq!(pass_rate(0, 0), 0.0);
    }

    #[test]
    fn test_degraded_statistic() {
        let stat = FieldStatistic::degraded("callYr", CategoryCode::DV, Some(RuleKind::Range), "missing field `val2`");
        assert!(stat.is_degraded());
        assert_eq!(stat.total_checks, 0);
        assert_eq!(stat.fail_count, 0);
        assert!(stat.message.contains("missing field `val2`"));
    }

    #[test]
    fn test_stored_message_takes_precedence() {
        let mut stat = FieldStatistic::from_counts("serNo", CategoryCode::DV, RuleKind::Range, 10, 0);
        stat.message = "legacy wording kept from an older run".to_string();
        assert_eq!(stat.display_message(), "legacy wording kept from an older run");

        stat.message.clear();
        assert_eq!(stat.display_message(), "[serNo] 항목에 전체 [10]개 중 [10]개의 유효값이 확인 되었습니다");
    }

    #[test]
    fn test_field_statistic_json_shape() {
        let stat = FieldStatistic::from_counts("tmnlId", CategoryCode::DU, RuleKind::Usage, 50, 0);
        let json = serde_json::to_value(&stat).unwrap();
        assert_eq!(json["fieldName"], "tmnlId");
        assert_eq!(json["checkType"], "DU");
        assert_eq!(json["ruleKind"], "USAGE");
        assert_eq!(json["passCount"], 50);
        assert_eq!(json["severity"], "info");
    }

    #[test]
    fn test_severity_grades() {
        assert_eq!(Severity::grade(0, 0.0), Severity::Info);
        assert_eq!(Severity::grade(1, 99.0), Severity::Warning);
        assert_eq!(Severity::grade(10, 90.0), Severity::Error);
        assert_eq!(Severity::grade(50, 50.0), Severity::Critical);
    }
}
