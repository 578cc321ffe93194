//! portdq core data models.
//!
//! Rule configuration, inspection results, and history buckets for the
//! port data-quality dashboard.

#![warn(missing_docs)]

mod id;
mod category;
mod value;
mod rule;
mod data_type;
mod statistic;
mod inspection;
mod history;

pub use id::*;
pub use category::{CategoryCode, RuleKind, CheckDimension};
pub use value::{
    Row, field, is_blank, parse_integer, parse_float, parse_datetime, datetime_value,
    key_component, merge_json,
};
pub use rule::{
    RuleSet, Rule, RuleBinding, RuleError, FieldSelector,
    RangeRule, NumericType, RangeMode, DateRule, DuplicateRule, UsageRule,
    DATE_SINGLE_SIDED, DUPLICATE_UNIQUE,
};
pub use data_type::{DataTypeConfig, ParamValue, ApiParams, merge_params};
pub use statistic::{FieldStatistic, Severity, pass_rate, render_message};
pub use inspection::{
    InspectionResult, InspectionSummary, CheckBreakdown, CheckStatus, QualitySummary,
};
pub use history::{HistoryRecord, HistoryPeriod, Granularity};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
