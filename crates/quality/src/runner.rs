//! Inspection runner.
//!
//! Orchestrates one inspection:
//! ```text
//! Resolve data type → Merge overrides → Fetch rows → Evaluate rules → Assemble result
//! ```
//! The runner never persists; that belongs to the aggregator.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use portdq_core::{
    merge_params, ApiParams, FieldStatistic, InspectionId, InspectionResult, Row, RuleKind,
    RuleSet, Time,
};
use tracing::{debug, info, warn};

use crate::aggregator::aggregate;
use crate::catalog::Catalog;
use crate::error::{FetchError, QualityError, Result};
use crate::evaluator::evaluate;
use crate::source::RowSource;

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Upper bound on the row fetch
    pub fetch_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

/// One inspection in flight. Owns its rows until the result is assembled.
#[derive(Debug)]
pub struct InspectionRun {
    /// Generated id of the eventual result
    pub inspection_id: InspectionId,
    /// Data type being inspected
    pub data_type_id: String,
    /// Effective request parameters
    pub api_params: ApiParams,
    /// Effective rule set
    pub rules: RuleSet,
    /// Fetched rows
    pub rows: Vec<Row>,
    /// When the run started
    pub started_at: Time,
    /// When rule evaluation completed; unset until [`InspectionRun::evaluate`]
    pub finished_at: Option<Time>,
}

impl InspectionRun {
    /// Evaluate every resolved rule against the rows.
    ///
    /// Misconfigured rules become degraded statistics; the rest are evaluated.
    /// Records `finished_at`.
    pub fn evaluate(&mut self) -> Vec<FieldStatistic> {
        let mut stats = Vec::new();
        for resolved in self.rules.resolve() {
            match resolved {
                Ok(binding) => stats.extend(evaluate(&binding, &self.rows)),
                Err(e) => {
                    warn!(
                        data_type = %self.data_type_id,
                        inspection = %self.inspection_id,
                        "Skipping misconfigured rule: {}", e
                    );
                    stats.push(FieldStatistic::degraded(
                        e.target.as_str(),
                        e.category,
                        RuleKind::parse(&e.kind),
                        &e.reason,
                    ));
                }
            }
        }
        self.finished_at = Some(Utc::now());
        stats
    }

    /// Consume the run, keeping only its result.
    ///
    /// The result is stamped with `finished_at`, or now if the run was never
    /// evaluated.
    pub fn finish(self, field_statistics: Vec<FieldStatistic>) -> InspectionResult {
        let summary = aggregate(&field_statistics);
        let finished_at = self.finished_at.unwrap_or_else(Utc::now);
        debug!(
            inspection = %self.inspection_id,
            elapsed_ms = (finished_at - self.started_at).num_milliseconds(),
            "Inspection run complete"
        );
        InspectionResult {
            inspection_id: self.inspection_id,
            data_type_id: self.data_type_id,
            created_at: finished_at,
            field_statistics,
            summary,
        }
    }
}

/// Runs inspections for catalog data types against a row source.
pub struct InspectionRunner {
    catalog: Arc<Catalog>,
    source: Arc<dyn RowSource>,
    config: RunnerConfig,
}

impl InspectionRunner {
    /// Create a runner.
    pub fn new(catalog: Arc<Catalog>, source: Arc<dyn RowSource>) -> Self {
        Self {
            catalog,
            source,
            config: RunnerConfig::default(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// The catalog this runner resolves data types from.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Run one inspection.
    ///
    /// Fails with `UnknownDataType` before any fetch, `NoRulesConfigured`
    /// when the merged rule set is empty, and `FetchFailed` when rows could
    /// not be obtained in time. No result exists in any failure case.
    pub async fn run(
        &self,
        data_type_id: &str,
        override_params: Option<&ApiParams>,
        override_rules: Option<&RuleSet>,
    ) -> Result<InspectionResult> {
        let mut run = self.prepare(data_type_id, override_params, override_rules).await?;
        let row_count = run.rows.len();
        let stats = run.evaluate();
        let result = run.finish(stats);

        info!(
            data_type = %result.data_type_id,
            inspection = %result.inspection_id,
            rows = row_count,
            statistics = result.field_statistics.len(),
            overall_rate = result.summary.overall_rate,
            "Inspection finished"
        );
        Ok(result)
    }

    /// Resolve the data type, merge overrides and fetch the rows.
    pub async fn prepare(
        &self,
        data_type_id: &str,
        override_params: Option<&ApiParams>,
        override_rules: Option<&RuleSet>,
    ) -> Result<InspectionRun> {
        let data_type = self
            .catalog
            .get(data_type_id)
            .ok_or_else(|| QualityError::UnknownDataType(data_type_id.to_string()))?;

        let api_params = match override_params {
            Some(over) => merge_params(&data_type.default_params, over),
            None => data_type.default_params.clone(),
        };
        let rules = match override_rules {
            Some(over) => data_type.default_meta.merged(over),
            None => data_type.default_meta.clone(),
        };
        if rules.resolve().is_empty() {
            return Err(QualityError::NoRulesConfigured(data_type_id.to_string()));
        }

        let inspection_id = InspectionId::new();
        let started_at = Utc::now();
        info!(data_type = %data_type_id, inspection = %inspection_id, "Starting inspection");

        let timeout = self.config.fetch_timeout;
        let fetched = tokio::time::timeout(timeout, self.source.fetch(data_type, &api_params))
            .await
            .unwrap_or(Err(FetchError::Timeout(timeout)));
        let rows = fetched.map_err(|source| {
            warn!(data_type = %data_type_id, "Row fetch failed: {}", source);
            QualityError::FetchFailed {
                data_type: data_type_id.to_string(),
                source,
            }
        })?;

        Ok(InspectionRun {
            inspection_id,
            data_type_id: data_type_id.to_string(),
            api_params,
            rules,
            rows,
            started_at,
            finished_at: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticRowSource;
    use async_trait::async_trait;
    use portdq_core::{CategoryCode, DataTypeConfig, ParamValue};
    use serde_json::json;
    use std::sync::Mutex;

    /// Records the parameters of every fetch.
    #[derive(Default)]
    struct RecordingSource {
        seen: Mutex<Vec<ApiParams>>,
    }

    #[async_trait]
    impl RowSource for RecordingSource {
        async fn fetch(&self, _dt: &DataTypeConfig, params: &ApiParams) -> std::result::Result<Vec<Row>, FetchError> {
            self.seen.lock().unwrap().push(params.clone());
            Ok(vec![json!({"callYr": "2021", "serNo": 1}).as_object().cloned().unwrap()])
        }
    }

    struct SlowSource;

    #[async_trait]
    impl RowSource for SlowSource {
        async fn fetch(&self, _dt: &DataTypeConfig, _params: &ApiParams) -> std::result::Result<Vec<Row>, FetchError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![])
        }
    }

    fn catalog() -> Arc<Catalog> {
        Arc::new(Catalog::builtin().unwrap())
    }

    #[tokio::test]
    async fn test_unknown_data_type_fails_before_fetch() {
        let source = Arc::new(RecordingSource::default());
        let runner = InspectionRunner::new(catalog(), source.clone());

        let err = runner.run("no_such_feed", None, None).await.unwrap_err();
        assert!(matches!(err, QualityError::UnknownDataType(_)));
        assert!(source.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_override_params_merge_key_by_key() {
        let source = Arc::new(RecordingSource::default());
        let runner = InspectionRunner::new(catalog(), source.clone());

        let mut over = ApiParams::new();
        over.insert("tmnlId".to_string(), ParamValue::from("BPTS"));
        runner.run("tc_work_info", Some(&over), None).await.unwrap();

        let seen = source.seen.lock().unwrap();
        assert_eq!(seen[0].get("tmnlId"), Some(&ParamValue::from("BPTS")));
        assert_eq!(seen[0].get("size"), Some(&ParamValue::from(1000_i64)));
    }

    #[tokio::test]
    async fn test_emptied_rule_set_is_rejected() {
        let runner = InspectionRunner::new(catalog(), Arc::new(StaticRowSource::default()));
        let cleared = RuleSet::from_json(json!({
            "DV": {"RANGE": null},
            "DU": {"USAGE": null},
            "DT": {"DATE": null},
            "DI": {"DUPLICATE": null}
        }))
        .unwrap();

        let err = runner.run("tc_work_info", None, Some(&cleared)).await.unwrap_err();
        assert!(matches!(err, QualityError::NoRulesConfigured(_)));
    }

    #[tokio::test]
    async fn test_misconfigured_rule_degrades_without_aborting() {
        let runner = InspectionRunner::new(catalog(), Arc::new(RecordingSource::default()));
        let over = RuleSet::new().with_rule(
            CategoryCode::DV,
            RuleKind::Range,
            json!({"serNo": {"val1": 5000}}),
        );

        let result = runner.run("tc_work_info", None, Some(&over)).await.unwrap();
        let ser_no = result
            .field_statistics
            .iter()
            .find(|s| s.field_name == "serNo")
            .unwrap();
        assert!(ser_no.is_degraded());
        assert_eq!(ser_no.fail_count, 0);

        let call_yr = result
            .field_statistics
            .iter()
            .find(|s| s.field_name == "callYr")
            .unwrap();
        assert_eq!(call_yr.pass_count, 1);
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_fetch_failed() {
        let runner = InspectionRunner::new(catalog(), Arc::new(SlowSource)).with_config(RunnerConfig {
            fetch_timeout: Duration::from_millis(20),
        });

        let err = runner.run("tc_work_info", None, None).await.unwrap_err();
        assert!(matches!(
            err,
            QualityError::FetchFailed { source: FetchError::Timeout(_), .. }
        ));
    }

    #[tokio::test]
    async fn test_prepare_keeps_run_state() {
        let runner = InspectionRunner::new(catalog(), Arc::new(RecordingSource::default()));
        let mut run = runner.prepare("tc_work_info", None, None).await.unwrap();
        assert_eq!(run.rows.len(), 1);
        assert_eq!(run.data_type_id, "tc_work_info");
        assert!(run.finished_at.is_none());

        let started = run.started_at;
        let id = run.inspection_id;
        let stats = run.evaluate();
        let finished = run.finished_at.unwrap();
        assert!(finished >= started);

        let result = run.finish(stats);
        assert_eq!(result.inspection_id, id);
        assert_eq!(result.created_at, finished);
    }
}
