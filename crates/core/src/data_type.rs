//! Data type definitions: a feed, its fetch parameters, and its default rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rule::RuleSet;

/// One API parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(serde_json::Number),
    Text(String),
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Number(n) => n.fmt(f),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Number(n.into())
    }
}

/// Parameters passed to the row-fetch collaborator.
pub type ApiParams = BTreeMap<String, ParamValue>;

/// Overlay `overrides` on `base`; override values win per key.
pub fn merge_params(base: &ApiParams, overrides: &ApiParams) -> ApiParams {
    let mut merged = base.clone();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Immutable catalog entry for one data feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTypeConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    /// Path appended to the upstream base URL when fetching rows.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub default_params: ApiParams,
    #[serde(default)]
    pub default_meta: RuleSet,
}
