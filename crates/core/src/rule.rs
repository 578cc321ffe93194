//! Rule sets and the typed rules they resolve into.
//!
//! A [`RuleSet`] is the loosely-typed JSON document users edit per category
//! tab. [`RuleSet::resolve`] turns it into typed [`RuleBinding`]s, rejecting
//! entries whose parameters do not match their kind with a [`RuleError`].

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::category::{CategoryCode, RuleKind};
use crate::value::{merge_json, parse_datetime};

/// Sub-key holding single-sided DATE rules.
pub const DATE_SINGLE_SIDED: &str = "S";

/// Sub-key holding DUPLICATE key groups.
pub const DUPLICATE_UNIQUE: &str = "U";

/// category -> rule kind -> parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet(BTreeMap<CategoryCode, serde_json::Map<String, Value>>);

impl RuleSet {
    /// Create an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a rule set from JSON.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Set the parameters of one rule kind in a category.
    pub fn with_rule(mut self, category: CategoryCode, kind: RuleKind, params: Value) -> Self {
        self.0
            .entry(category)
            .or_default()
            .insert(kind.key().to_string(), params);
        self
    }

    /// Parameters configured under one category.
    pub fn category(&self, category: CategoryCode) -> Option<&serde_json::Map<String, Value>> {
        self.0.get(&category)
    }

    /// Categories with at least one rule kind configured.
    pub fn categories(&self) -> impl Iterator<Item = CategoryCode> + '_ {
        self.0.iter().filter(|(_, kinds)| !kinds.is_empty()).map(|(c, _)| *c)
    }

    /// True when no category holds any rule kind.
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|kinds| kinds.is_empty())
    }

    /// Overlay `overrides` on this rule set key by key.
    pub fn merged(&self, overrides: &RuleSet) -> RuleSet {
        let mut merged = self.0.clone();
        for (category, kinds) in &overrides.0 {
            merge_json(merged.entry(*category).or_default(), kinds);
        }
        merged.retain(|_, kinds| !kinds.is_empty());
        RuleSet(merged)
    }

    /// Resolve every configured entry into a typed binding or a rule error.
    ///
    /// Entries come out in category order, then in key order within a
    /// category.
    pub fn resolve(&self) -> Vec<Result<RuleBinding, RuleError>> {
        let mut out = Vec::new();
        for (category, kinds) in &self.0 {
            for (kind_key, params) in kinds {
                match RuleKind::parse(kind_key) {
                    Some(kind) => resolve_kind(*category, kind, params, &mut out),
                    None => out.push(Err(RuleError::new(
                        *category,
                        kind_key,
                        "*",
                        "unknown rule kind",
                    ))),
                }
            }
        }
        out
    }
}

/// Integer vs. float parsing for RANGE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumericType {
    #[serde(rename = "I")]
    Integer,
    #[serde(rename = "F")]
    Float,
}

/// Inside vs. outside the RANGE band. Bounds are inclusive in both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeMode {
    #[serde(rename = "I")]
    Inside,
    #[serde(rename = "O")]
    Outside,
}

/// RANGE parameters for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeRule {
    pub rtype: NumericType,
    pub ctype: RangeMode,
    pub val1: f64,
    pub val2: f64,
}

impl RangeRule {
    /// Parse and check the parameters of one RANGE field.
    pub fn from_params(params: &Value) -> Result<Self, String> {
        let rule: RangeRule = serde_json::from_value(params.clone()).map_err(|e| e.to_string())?;
        if rule.val1 > rule.val2 {
            return Err(format!("val1 ({}) exceeds val2 ({})", rule.val1, rule.val2));
        }
        Ok(rule)
    }

    /// Whether a parsed value satisfies the band.
    pub fn accepts(&self, v: f64) -> bool {
        let inside = self.val1 <= v && v <= self.val2;
        match self.ctype {
            RangeMode::Inside => inside,
            RangeMode::Outside => !inside,
        }
    }
}

/// DATE parameters for one field: values must not be earlier than `val1`.
#[derive(Debug, Clone, PartialEq)]
pub struct DateRule {
    pub val1: String,
    pub reference: NaiveDateTime,
}

impl DateRule {
    /// Parse `{ "val1": "<reference date>" }`.
    pub fn from_params(params: &Value) -> Result<Self, String> {
        let val1 = params
            .get("val1")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing string 'val1'".to_string())?;
        let reference =
            parse_datetime(val1).ok_or_else(|| format!("'{val1}' is not a valid reference date"))?;
        Ok(DateRule {
            val1: val1.to_string(),
            reference,
        })
    }
}

/// DUPLICATE parameters: an ordered composite key.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateRule {
    pub label: String,
    pub fields: Vec<String>,
}

/// USAGE parameters: columns whose fill rate is measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRule {
    pub columns: Vec<String>,
}

impl UsageRule {
    /// Parse `{ "columns": [...] }`.
    pub fn from_params(params: &Value) -> Result<Self, String> {
        let columns = params
            .get("columns")
            .ok_or_else(|| "missing 'columns'".to_string())
            .and_then(string_list)?;
        Ok(UsageRule { columns })
    }
}

impl DuplicateRule {
    /// Build a key group from a JSON list of field names.
    pub fn from_params(label: impl Into<String>, params: &Value) -> Result<Self, String> {
        Ok(DuplicateRule {
            label: label.into(),
            fields: string_list(params)?,
        })
    }
}

/// A typed rule, one variant per kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Range(RangeRule),
    Date(DateRule),
    Duplicate(DuplicateRule),
    Usage(UsageRule),
}

impl Rule {
    /// The rule's kind.
    pub fn kind(&self) -> RuleKind {
        match self {
            Rule::Range(_) => RuleKind::Range,
            Rule::Date(_) => RuleKind::Date,
            Rule::Duplicate(_) => RuleKind::Duplicate,
            Rule::Usage(_) => RuleKind::Usage,
        }
    }
}

/// Which field(s) a rule is applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelector {
    Field(String),
    Fields(Vec<String>),
}

impl FieldSelector {
    /// Name used in statistics and messages.
    pub fn display_name(&self) -> String {
        match self {
            FieldSelector::Field(name) => name.clone(),
            FieldSelector::Fields(names) => names.join(","),
        }
    }
}

/// A validated rule ready for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleBinding {
    pub category: CategoryCode,
    pub selector: FieldSelector,
    pub rule: Rule,
}

/// A rule whose parameters do not match its kind's shape.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid {kind} rule for [{target}] in {category}: {reason}")]
pub struct RuleError {
    pub category: CategoryCode,
    pub kind: String,
    pub target: String,
    pub reason: String,
}

impl RuleError {
    fn new(
        category: CategoryCode,
        kind: impl Into<String>,
        target: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            category,
            kind: kind.into(),
            target: target.into(),
            reason: reason.into(),
        }
    }
}

fn resolve_kind(
    category: CategoryCode,
    kind: RuleKind,
    params: &Value,
    out: &mut Vec<Result<RuleBinding, RuleError>>,
) {
    let err = |target: &str, reason: String| Err(RuleError::new(category, kind.key(), target, reason));

    let Some(entries) = params.as_object() else {
        out.push(err("*", "parameters must be an object".to_string()));
        return;
    };

    match kind {
        RuleKind::Range => {
            for (field, value) in entries {
                out.push(match RangeRule::from_params(value) {
                    Ok(rule) => Ok(RuleBinding {
                        category,
                        selector: FieldSelector::Field(field.clone()),
                        rule: Rule::Range(rule),
                    }),
                    Err(reason) => err(field.as_str(), reason),
                });
            }
        }
        RuleKind::Date => {
            for (side, fields) in entries {
                if side != DATE_SINGLE_SIDED {
                    out.push(err(side.as_str(), format!("unsupported DATE sub-key '{side}'")));
                    continue;
                }
                let Some(fields) = fields.as_object() else {
                    out.push(err(side.as_str(), "DATE sub-key must map fields to parameters".to_string()));
                    continue;
                };
                for (field, value) in fields {
                    out.push(match DateRule::from_params(value) {
                        Ok(rule) => Ok(RuleBinding {
                            category,
                            selector: FieldSelector::Field(field.clone()),
                            rule: Rule::Date(rule),
                        }),
                        Err(reason) => err(field.as_str(), reason),
                    });
                }
            }
        }
        RuleKind::Duplicate => {
            let Some(groups) = entries.get(DUPLICATE_UNIQUE) else {
                out.push(err("*", "missing 'U' key groups".to_string()));
                return;
            };
            let Some(groups) = groups.as_object() else {
                out.push(err("U", "'U' must map labels to field lists".to_string()));
                return;
            };
            for (label, fields) in groups {
                out.push(match DuplicateRule::from_params(label.as_str(), fields) {
                    Ok(rule) => Ok(RuleBinding {
                        category,
                        selector: FieldSelector::Fields(rule.fields.clone()),
                        rule: Rule::Duplicate(rule),
                    }),
                    Err(reason) => err(label.as_str(), reason),
                });
            }
        }
        RuleKind::Usage => {
            out.push(match UsageRule::from_params(params) {
                Ok(rule) => Ok(RuleBinding {
                    category,
                    selector: FieldSelector::Fields(rule.columns.clone()),
                    rule: Rule::Usage(rule),
                }),
                Err(reason) => err("columns", reason),
            });
        }
    }
}

fn string_list(value: &Value) -> Result<Vec<String>, String> {
    let items = value
        .as_array()
        .ok_or_else(|| "expected a list of field names".to_string())?;
    let names = items
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| "field names must be strings".to_string())?;
    if names.is_empty() {
        return Err("field list must not be empty".to_string());
    }
    Ok(names)
}
