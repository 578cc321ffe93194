//! Rule evaluator: applies one typed rule to a row set.
//!
//! Pure functions of their inputs. Every produced statistic satisfies
//! `pass_count + fail_count == total_checks`.

use std::collections::HashMap;

use portdq_core::{
    datetime_value, field, is_blank, key_component, parse_float, parse_integer, CategoryCode,
    DateRule, DuplicateRule, FieldSelector, FieldStatistic, NumericType, RangeRule, Row, Rule,
    RuleBinding, RuleError, RuleKind, UsageRule, DUPLICATE_UNIQUE,
};
use serde_json::Value;
use tracing::debug;

/// Evaluate a resolved binding.
///
/// USAGE yields one statistic per listed column; every other kind yields one.
pub fn evaluate(binding: &RuleBinding, rows: &[Row]) -> Vec<FieldStatistic> {
    let category = binding.category;
    let stats = match &binding.rule {
        Rule::Range(rule) => vec![evaluate_range(category, &binding.selector.display_name(), rule, rows)],
        Rule::Date(rule) => vec![evaluate_date(category, &binding.selector.display_name(), rule, rows)],
        Rule::Duplicate(rule) => vec![evaluate_duplicate(category, rule, rows)],
        Rule::Usage(rule) => evaluate_usage(category, rule, rows),
    };

    for stat in &stats {
        debug!(
            check_type = %stat.check_type,
            field = %stat.field_name,
            total = stat.total_checks,
            failed = stat.fail_count,
            "Evaluated {} rule",
            binding.rule.kind()
        );
    }
    stats
}

/// Evaluate a rule given as raw parameters for one selector.
///
/// Parameters that do not match the kind's shape are a [`RuleError`] and no
/// statistic is produced.
pub fn evaluate_params(
    category: CategoryCode,
    kind: RuleKind,
    params: &Value,
    selector: &FieldSelector,
    rows: &[Row],
) -> Result<Vec<FieldStatistic>, RuleError> {
    let shape_err = |reason: String| RuleError {
        category,
        kind: kind.key().to_string(),
        target: selector.display_name(),
        reason,
    };

    let rule = match (kind, selector) {
        (RuleKind::Range, FieldSelector::Field(_)) => {
            Rule::Range(RangeRule::from_params(params).map_err(shape_err)?)
        }
        (RuleKind::Date, FieldSelector::Field(_)) => {
            Rule::Date(DateRule::from_params(params).map_err(shape_err)?)
        }
        (RuleKind::Duplicate, FieldSelector::Fields(fields)) => {
            Rule::Duplicate(duplicate_group(params, fields).map_err(shape_err)?)
        }
        (RuleKind::Usage, _) => Rule::Usage(UsageRule::from_params(params).map_err(shape_err)?),
        (kind, _) => {
            return Err(shape_err(format!(
                "{} rules cannot target this field selector",
                kind.key()
            )))
        }
    };

    Ok(evaluate(
        &RuleBinding {
            category,
            selector: selector.clone(),
            rule,
        },
        rows,
    ))
}

/// Find the `{"U": {label: [fields...]}}` group whose key is `fields`.
fn duplicate_group(params: &Value, fields: &[String]) -> Result<DuplicateRule, String> {
    let groups = params
        .get(DUPLICATE_UNIQUE)
        .and_then(Value::as_object)
        .ok_or_else(|| format!("expected '{DUPLICATE_UNIQUE}' mapping labels to field lists"))?;
    for (label, list) in groups {
        let rule = DuplicateRule::from_params(label.as_str(), list)?;
        if rule.fields == fields {
            return Ok(rule);
        }
    }
    Err(format!("no key group matches [{}]", fields.join(",")))
}

/// RANGE: parse per `rtype`, compare per `ctype`. Unparseable values fail.
pub fn evaluate_range(
    category: CategoryCode,
    field_name: &str,
    rule: &RangeRule,
    rows: &[Row],
) -> FieldStatistic {
    let passed = rows
        .iter()
        .filter(|row| {
            field(row, field_name)
                .and_then(|v| match rule.rtype {
                    NumericType::Integer => parse_integer(v).map(|i| i as f64),
                    NumericType::Float => parse_float(v),
                })
                .is_some_and(|v| rule.accepts(v))
        })
        .count() as u64;
    let total = rows.len() as u64;
    FieldStatistic::from_counts(field_name, category, RuleKind::Range, passed, total - passed)
}

/// DATE: a value passes iff it parses and is not earlier than the reference.
pub fn evaluate_date(
    category: CategoryCode,
    field_name: &str,
    rule: &DateRule,
    rows: &[Row],
) -> FieldStatistic {
    let passed = rows
        .iter()
        .filter(|row| {
            field(row, field_name)
                .and_then(datetime_value)
                .is_some_and(|dt| dt >= rule.reference)
        })
        .count() as u64;
    let total = rows.len() as u64;
    FieldStatistic::from_counts(field_name, category, RuleKind::Date, passed, total - passed)
}

/// DUPLICATE: every member of a repeated composite key fails.
///
/// Rows with any blank key component are excluded from both counts.
pub fn evaluate_duplicate(category: CategoryCode, rule: &DuplicateRule, rows: &[Row]) -> FieldStatistic {
    let keys: Vec<Vec<String>> = rows
        .iter()
        .filter_map(|row| {
            rule.fields
                .iter()
                .map(|f| key_component(field(row, f)))
                .collect::<Option<Vec<_>>>()
        })
        .collect();

    let mut occurrences: HashMap<&[String], u64> = HashMap::with_capacity(keys.len());
    for key in &keys {
        *occurrences.entry(key.as_slice()).or_default() += 1;
    }

    let failed = keys
        .iter()
        .filter(|key| occurrences.get(key.as_slice()).copied().unwrap_or(0) > 1)
        .count() as u64;
    let total = keys.len() as u64;
    FieldStatistic::from_counts(
        rule.fields.join(","),
        category,
        RuleKind::Duplicate,
        total - failed,
        failed,
    )
}

/// USAGE: one statistic per column; blank values fail.
pub fn evaluate_usage(category: CategoryCode, rule: &UsageRule, rows: &[Row]) -> Vec<FieldStatistic> {
    rule.columns
        .iter()
        .map(|column| {
            let passed = rows
                .iter()
                .filter(|row| !is_blank(field(row, column)))
                .count() as u64;
            let total = rows.len() as u64;
            FieldStatistic::from_counts(column.as_str(), category, RuleKind::Usage, passed, total - passed)
        })
        .collect()
}
