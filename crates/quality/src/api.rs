//! Endpoint request/response shapes and the service facade behind them.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use portdq_core::{
    ApiParams, HistoryPeriod, HistoryRecord, InspectionId, InspectionResult, InspectionSummary,
    QualitySummary, RuleSet, Time,
};
use portdq_storage::HistoryStore;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::aggregator::ResultAggregator;
use crate::analysis::FieldAnalysis;
use crate::catalog::Catalog;
use crate::error::{QualityError, Result};
use crate::history::{HistoryConfig, HistoryQueryService};
use crate::runner::InspectionRunner;

/// Body of an inspection-run request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InspectionRunRequest {
    /// Catalog id of the data type
    pub data_type: String,
    /// Parameter overrides
    #[serde(default)]
    pub api_params: ApiParams,
    /// Rule overrides
    #[serde(default)]
    pub quality_meta: RuleSet,
}

impl InspectionRunRequest {
    /// Parse a request body. Unknown check types are a configuration error.
    pub fn from_json(body: serde_json::Value) -> Result<Self> {
        serde_json::from_value(body)
            .map_err(|e| QualityError::Configuration(format!("invalid inspection request: {e}")))
    }
}

/// Body of an inspection-run response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionRunResponse {
    /// Whether an inspection result was computed
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
    /// Id of the stored result; absent when nothing was stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspection_id: Option<InspectionId>,
    /// Summary of the computed result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<InspectionSummary>,
    /// When the response was produced
    pub timestamp: Time,
}

impl InspectionRunResponse {
    fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
            inspection_id: None,
            results: None,
            timestamp: Utc::now(),
        }
    }
}

/// Requested history period on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    /// Calendar days
    Daily,
    /// ISO weeks
    Weekly,
    /// Calendar months
    Monthly,
    /// Caller-supplied inclusive date range
    Custom,
}

/// Query of the history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRequest {
    /// Bucket period
    pub period: PeriodKind,
    /// First day of a custom range
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Last day of a custom range
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Keep only the most recent buckets
    #[serde(default)]
    pub limit: Option<usize>,
}

impl HistoryRequest {
    /// A request for one fixed period.
    pub fn new(period: PeriodKind) -> Self {
        Self {
            period,
            start_date: None,
            end_date: None,
            limit: None,
        }
    }

    /// Resolve the requested period. Custom ranges need both dates.
    pub fn period(&self) -> Result<HistoryPeriod> {
        Ok(match self.period {
            PeriodKind::Daily => HistoryPeriod::Daily,
            PeriodKind::Weekly => HistoryPeriod::Weekly,
            PeriodKind::Monthly => HistoryPeriod::Monthly,
            PeriodKind::Custom => match (self.start_date, self.end_date) {
                (Some(start), Some(end)) => HistoryPeriod::Custom { start, end },
                _ => {
                    return Err(QualityError::Configuration(
                        "custom period requires start_date and end_date".to_string(),
                    ))
                }
            },
        })
    }
}

/// One entry point for every endpoint of the inspection core.
pub struct InspectionService<S: HistoryStore + ?Sized> {
    runner: InspectionRunner,
    aggregator: ResultAggregator<S>,
    history: HistoryQueryService<S>,
}

impl<S: HistoryStore + ?Sized> InspectionService<S> {
    /// Create a service over a runner and a history store.
    pub fn new(runner: InspectionRunner, store: Arc<S>) -> Self {
        Self {
            runner,
            aggregator: ResultAggregator::new(Arc::clone(&store)),
            history: HistoryQueryService::new(store),
        }
    }

    /// Set the history bucketing configuration.
    pub fn with_history_config(mut self, config: HistoryConfig) -> Self {
        self.history = self.history.with_config(config);
        self
    }

    /// The catalog served by this service.
    pub fn catalog(&self) -> &Catalog {
        self.runner.catalog()
    }

    /// Run, aggregate and persist one inspection.
    ///
    /// Returns the computed result alongside the stored id; a storage
    /// failure leaves the result intact and surfaces as the second element.
    pub async fn inspect(
        &self,
        request: &InspectionRunRequest,
    ) -> Result<(InspectionResult, Result<InspectionId>)> {
        let result = self
            .runner
            .run(
                &request.data_type,
                Some(&request.api_params),
                Some(&request.quality_meta),
            )
            .await?;
        let stored = self.aggregator.persist(&result).await;
        Ok((result, stored))
    }

    /// Serve an inspection-run request.
    pub async fn run(&self, request: &InspectionRunRequest) -> InspectionRunResponse {
        match self.inspect(request).await {
            Ok((result, Ok(id))) => InspectionRunResponse {
                success: true,
                message: format!("Inspection of {} completed", result.data_type_id),
                inspection_id: Some(id),
                results: Some(result.summary),
                timestamp: Utc::now(),
            },
            Ok((result, Err(e))) => {
                warn!(data_type = %result.data_type_id, "Returning unstored inspection: {}", e);
                InspectionRunResponse {
                    success: true,
                    message: format!("Inspection completed but was not stored: {e}"),
                    inspection_id: None,
                    results: Some(result.summary),
                    timestamp: Utc::now(),
                }
            }
            Err(e) => InspectionRunResponse::failed(e.to_string()),
        }
    }

    /// Serve a history request.
    pub async fn history(&self, data_type_id: &str, request: &HistoryRequest) -> Result<Vec<HistoryRecord>> {
        self.catalog().get_by_id(data_type_id)?;
        self.history
            .query(data_type_id, request.period()?, request.limit)
            .await
    }

    /// Field analysis of one stored inspection, or of the latest one.
    pub async fn field_analysis(
        &self,
        data_type_id: &str,
        inspection_id: Option<InspectionId>,
    ) -> Result<FieldAnalysis> {
        let store = self.aggregator.store();
        let result = match inspection_id {
            Some(id) => store
                .load(data_type_id, id)
                .await?
                .ok_or_else(|| QualityError::NotFound(format!("inspection {data_type_id}/{id}")))?,
            None => store
                .latest(data_type_id)
                .await?
                .ok_or_else(|| QualityError::NotFound(format!("no inspections for '{data_type_id}'")))?,
        };
        Ok(FieldAnalysis::analyze(&result))
    }

    /// Latest summary of a data type.
    pub async fn summary(&self, data_type_id: &str) -> Result<QualitySummary> {
        self.aggregator.summary_for(data_type_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let req = InspectionRunRequest::from_json(json!({"data_type": "tc_work_info"})).unwrap();
        assert!(req.api_params.is_empty());
        assert!(req.quality_meta.is_empty());
    }

    #[test]
    fn test_request_rejects_unknown_check_type() {
        let err = InspectionRunRequest::from_json(json!({
            "data_type": "tc_work_info",
            "quality_meta": {"XX": {"RANGE": {}}}
        }))
        .unwrap_err();
        assert!(matches!(err, QualityError::Configuration(_)));
    }

    #[test]
    fn test_history_request_periods() {
        let req: HistoryRequest = serde_json::from_value(json!({
            "period": "custom",
            "start_date": "2025-09-01",
            "end_date": "2025-09-12"
        }))
        .unwrap();
        assert!(matches!(req.period().unwrap(), HistoryPeriod::Custom { .. }));

        let incomplete: HistoryRequest =
            serde_json::from_value(json!({"period": "custom", "start_date": "2025-09-01"})).unwrap();
        assert!(matches!(incomplete.period(), Err(QualityError::Configuration(_))));

        assert_eq!(HistoryRequest::new(PeriodKind::Weekly).period().unwrap(), HistoryPeriod::Weekly);
    }

    #[test]
    fn test_failed_response_shape() {
        let json = serde_json::to_value(InspectionRunResponse::failed("Unknown data type: x".to_string())).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("inspection_id").is_none());
        assert!(json.get("results").is_none());
        assert!(json["timestamp"].is_string());
    }
}
