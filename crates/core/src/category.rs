//! Rule categories, rule kinds, and check dimensions.

use serde::{Deserialize, Serialize};

/// Rule category code; also the check type a statistic is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CategoryCode {
    /// Completeness / validity
    DV,
    /// Consistency
    DC,
    /// Usage
    DU,
    /// Timeliness
    DT,
    /// Integrity
    DI,
}

impl CategoryCode {
    /// All categories in display order.
    pub const ALL: [CategoryCode; 5] = [
        CategoryCode::DV,
        CategoryCode::DC,
        CategoryCode::DU,
        CategoryCode::DT,
        CategoryCode::DI,
    ];

    /// The two-letter code.
    pub fn code(&self) -> &'static str {
        match self {
            CategoryCode::DV => "DV",
            CategoryCode::DC => "DC",
            CategoryCode::DU => "DU",
            CategoryCode::DT => "DT",
            CategoryCode::DI => "DI",
        }
    }

    /// Human-readable name shown on dashboard tabs.
    pub fn label(&self) -> &'static str {
        match self {
            CategoryCode::DV => "완전성/유효성",
            CategoryCode::DC => "일관성",
            CategoryCode::DU => "활용성",
            CategoryCode::DT => "적시성",
            CategoryCode::DI => "무결성",
        }
    }

    /// Parse a two-letter code.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == s)
    }
}

impl std::fmt::Display for CategoryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Concrete check algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    Range,
    Date,
    Duplicate,
    Usage,
}

impl RuleKind {
    /// Key used in rule set JSON.
    pub fn key(&self) -> &'static str {
        match self {
            RuleKind::Range => "RANGE",
            RuleKind::Date => "DATE",
            RuleKind::Duplicate => "DUPLICATE",
            RuleKind::Usage => "USAGE",
        }
    }

    /// Parse a rule set key. Unknown kinds yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RANGE" => Some(RuleKind::Range),
            "DATE" => Some(RuleKind::Date),
            "DUPLICATE" => Some(RuleKind::Duplicate),
            "USAGE" => Some(RuleKind::Usage),
            _ => None,
        }
    }

    /// Which message style and history rate this kind feeds.
    pub fn dimension(&self) -> CheckDimension {
        match self {
            RuleKind::Usage => CheckDimension::Completeness,
            RuleKind::Range | RuleKind::Date | RuleKind::Duplicate => CheckDimension::Validity,
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Completeness checks count empty values; validity checks count valid ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckDimension {
    Completeness,
    Validity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_codes_round_trip() {
        for cat in CategoryCode::ALL {
            assert_eq!(CategoryCode::parse(cat.code()), Some(cat));
        }
        assert_eq!(CategoryCode::parse("XX"), None);
    }

    #[test]
    fn test_category_serializes_as_code() {
        let json = serde_json::to_string(&CategoryCode::DU).unwrap();
        assert_eq!(json, "\"DU\"");
    }

    #[test]
    fn test_rule_kind_dimensions() {
        assert_eq!(RuleKind::Usage.dimension(), CheckDimension::Completeness);
        assert_eq!(RuleKind::Range.dimension(), CheckDimension::Validity);
        assert_eq!(RuleKind::parse("DUPLICATE"), Some(RuleKind::Duplicate));
        assert_eq!(RuleKind::parse("PATTERN"), None);
    }
}
