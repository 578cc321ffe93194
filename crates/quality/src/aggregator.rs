//! Result aggregation and persistence.

use std::collections::BTreeMap;
use std::sync::Arc;

use portdq_core::{
    pass_rate, CategoryCode, CheckBreakdown, FieldStatistic, InspectionId, InspectionResult,
    InspectionSummary, QualitySummary,
};
use portdq_storage::HistoryStore;
use tracing::{debug, error};

use crate::error::{QualityError, Result};

/// Fold field statistics into an inspection summary.
///
/// Breakdown entries exist only for check types that produced a statistic.
pub fn aggregate(field_statistics: &[FieldStatistic]) -> InspectionSummary {
    let mut totals: BTreeMap<CategoryCode, (u64, u64)> = BTreeMap::new();
    let mut total_checks = 0u64;
    let mut total_passed = 0u64;

    for stat in field_statistics {
        total_checks += stat.total_checks;
        total_passed += stat.pass_count;
        let (checks, failed) = totals.entry(stat.check_type).or_default();
        *checks += stat.total_checks;
        *failed += stat.fail_count;
    }

    InspectionSummary {
        overall_rate: pass_rate(total_passed, total_checks),
        total_checks,
        total_passed,
        breakdown: totals
            .into_iter()
            .map(|(category, (checks, failed))| (category, CheckBreakdown::new(checks, failed)))
            .collect(),
    }
}

/// Persists inspection results and answers summary lookups.
pub struct ResultAggregator<S: HistoryStore + ?Sized> {
    store: Arc<S>,
}

impl<S: HistoryStore + ?Sized> Clone for ResultAggregator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: HistoryStore + ?Sized> ResultAggregator<S> {
    /// Create an aggregator over a history store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Append a result to history.
    ///
    /// On failure the caller still holds the computed result; nothing is
    /// retried here.
    pub async fn persist(&self, result: &InspectionResult) -> Result<InspectionId> {
        match self.store.append(result).await {
            Ok(()) => {
                debug!(
                    data_type = %result.data_type_id,
                    inspection = %result.inspection_id,
                    "Persisted inspection"
                );
                Ok(result.inspection_id)
            }
            Err(source) => {
                error!(
                    data_type = %result.data_type_id,
                    inspection = %result.inspection_id,
                    "Failed to persist inspection: {}", source
                );
                Err(QualityError::Persistence {
                    inspection_id: result.inspection_id,
                    source,
                })
            }
        }
    }

    /// Summary of the latest inspection of a data type.
    pub async fn summary_for(&self, data_type_id: &str) -> Result<QualitySummary> {
        let latest = self
            .store
            .latest(data_type_id)
            .await?
            .ok_or_else(|| QualityError::NotFound(format!("no inspections for '{data_type_id}'")))?;

        Ok(QualitySummary {
            data_type_id: latest.data_type_id,
            inspection_id: latest.inspection_id,
            summary: latest.summary,
            last_inspection_date: latest.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use portdq_core::{CheckStatus, RuleKind, Time};
    use portdq_storage::{MemoryStorage, StorageError};

    struct BrokenStore;

    #[async_trait]
    impl HistoryStore for BrokenStore {
        async fn append(&self, _result: &InspectionResult) -> portdq_storage::Result<()> {
            Err(StorageError::Other("disk full".to_string()))
        }

        async fn load(&self, _dt: &str, _id: InspectionId) -> portdq_storage::Result<Option<InspectionResult>> {
            Ok(None)
        }

        async fn list(&self, _dt: &str) -> portdq_storage::Result<Vec<InspectionResult>> {
            Ok(vec![])
        }
    }

    fn result(stats: Vec<FieldStatistic>, created_at: Time) -> InspectionResult {
        let summary = aggregate(&stats);
        InspectionResult {
            inspection_id: InspectionId::new(),
            data_type_id: "tc_work_info".to_string(),
            created_at,
            field_statistics: stats,
            summary,
        }
    }

    #[test]
    fn test_aggregate_pools_counts() {
        let stats = vec![
            FieldStatistic::from_counts("callYr", CategoryCode::DV, RuleKind::Range, 98, 2),
            FieldStatistic::from_counts("serNo", CategoryCode::DV, RuleKind::Range, 100, 0),
            FieldStatistic::from_counts("tmnlId", CategoryCode::DU, RuleKind::Usage, 50, 0),
        ];
        let summary = aggregate(&stats);

        assert_eq!(summary.total_checks, 250);
        assert_eq!(summary.total_passed, 248);
        assert!((summary.overall_rate - 99.2).abs() < 1e-9);

        let dv = &summary.breakdown[&CategoryCode::DV];
        assert_eq!(dv.status, CheckStatus::Fail);
        assert_eq!(dv.total_checks, 200);
        assert_eq!(dv.failed_checks, 2);
        assert!((dv.pass_rate - 99.0).abs() < 1e-9);

        assert_eq!(summary.breakdown[&CategoryCode::DU].status, CheckStatus::Pass);
        assert_eq!(summary.breakdown.len(), 2);
    }

    #[test]
    fn test_aggregate_empty_is_zero() {
        let summary = aggregate(&[]);
        assert_eq!(summary.overall_rate, 0.0);
        assert!(summary.breakdown.is_empty());
    }

    #[test]
    fn test_degraded_statistic_still_gets_breakdown_entry() {
        let stats = vec![FieldStatistic::degraded("x", CategoryCode::DT, Some(RuleKind::Date), "bad val1")];
        let summary = aggregate(&stats);
        let dt = &summary.breakdown[&CategoryCode::DT];
        assert_eq!(dt.total_checks, 0);
        assert_eq!(dt.pass_rate, 0.0);
        assert_eq!(dt.status, CheckStatus::Pass);
    }

    #[tokio::test]
    async fn test_persist_and_summary() {
        let aggregator = ResultAggregator::new(Arc::new(MemoryStorage::new()));
        let now = Utc::now();
        let older = result(
            vec![FieldStatistic::from_counts("a", CategoryCode::DV, RuleKind::Range, 1, 1)],
            now - Duration::hours(1),
        );
        let newer = result(
            vec![FieldStatistic::from_counts("a", CategoryCode::DV, RuleKind::Range, 2, 0)],
            now,
        );

        assert_eq!(aggregator.persist(&older).await.unwrap(), older.inspection_id);
        aggregator.persist(&newer).await.unwrap();

        let summary = aggregator.summary_for("tc_work_info").await.unwrap();
        assert_eq!(summary.inspection_id, newer.inspection_id);
        assert_eq!(summary.last_inspection_date, now);
        assert_eq!(summary.summary.overall_rate, 100.0);
    }

    #[tokio::test]
    async fn test_summary_without_history_is_not_found() {
        let aggregator = ResultAggregator::new(Arc::new(MemoryStorage::new()));
        assert!(matches!(
            aggregator.summary_for("tc_work_info").await,
            Err(QualityError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_result() {
        let aggregator = ResultAggregator::new(Arc::new(BrokenStore));
        let computed = result(vec![], Utc::now());

        let err = aggregator.persist(&computed).await.unwrap_err();
        match err {
            QualityError::Persistence { inspection_id, .. } => {
                assert_eq!(inspection_id, computed.inspection_id)
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(computed.summary.overall_rate, 0.0);
    }
}
