//! History query service: time-bucketed projections of stored inspections.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use portdq_core::{
    CheckDimension, Granularity, HistoryPeriod, HistoryRecord, InspectionResult, Time,
};
use portdq_storage::HistoryStore;
use tracing::debug;

use crate::error::{QualityError, Result};

/// Bucketing configuration.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Offset applied to `created_at` before choosing a bucket
    pub utc_offset: FixedOffset,
    /// Custom ranges longer than this many days are bucketed weekly
    pub weekly_threshold_days: i64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            utc_offset: Utc.fix(),
            weekly_threshold_days: 60,
        }
    }
}

/// Answers history queries. Read-only; never writes to the store.
pub struct HistoryQueryService<S: HistoryStore + ?Sized> {
    store: Arc<S>,
    config: HistoryConfig,
}

impl<S: HistoryStore + ?Sized> HistoryQueryService<S> {
    /// Create a service with the default configuration.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            config: HistoryConfig::default(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: HistoryConfig) -> Self {
        self.config = config;
        self
    }

    /// Bucket a data type's inspections for one period.
    ///
    /// Buckets come back in ascending order. `limit` keeps only the most
    /// recent buckets. No inspections in range is an empty list.
    pub async fn query(
        &self,
        data_type_id: &str,
        period: HistoryPeriod,
        limit: Option<usize>,
    ) -> Result<Vec<HistoryRecord>> {
        let (results, granularity) = match period {
            HistoryPeriod::Daily => (self.store.list(data_type_id).await?, Granularity::Daily),
            HistoryPeriod::Weekly => (self.store.list(data_type_id).await?, Granularity::Weekly),
            HistoryPeriod::Monthly => (self.store.list(data_type_id).await?, Granularity::Monthly),
            HistoryPeriod::Custom { start, end } => {
                if end < start {
                    return Err(QualityError::Configuration(format!(
                        "custom range ends ({end}) before it starts ({start})"
                    )));
                }
                let granularity = if (end - start).num_days() > self.config.weekly_threshold_days {
                    Granularity::Weekly
                } else {
                    Granularity::Daily
                };
                let from = self.local_midnight(start)?;
                let to = end
                    .succ_opt()
                    .ok_or_else(|| {
                        QualityError::Configuration(format!("custom range end {end} is out of range"))
                    })
                    .and_then(|next| self.local_midnight(next))?;
                (self.store.list_between(data_type_id, from, to).await?, granularity)
            }
        };

        let mut records = self.bucket(&results, granularity);
        if let Some(limit) = limit {
            let skip = records.len().saturating_sub(limit);
            records = records.split_off(skip);
        }

        debug!(
            data_type = %data_type_id,
            inspections = results.len(),
            buckets = records.len(),
            "History query"
        );
        Ok(records)
    }

    /// Fold results into buckets of one granularity.
    pub fn bucket(&self, results: &[InspectionResult], granularity: Granularity) -> Vec<HistoryRecord> {
        let mut buckets: BTreeMap<NaiveDate, Vec<&InspectionResult>> = BTreeMap::new();
        for result in results {
            let local = result.created_at.with_timezone(&self.config.utc_offset).date_naive();
            buckets
                .entry(bucket_start(local, granularity))
                .or_default()
                .push(result);
        }

        buckets
            .into_iter()
            .map(|(start, members)| record(bucket_label(start, granularity), &members))
            .collect()
    }

    fn local_midnight(&self, date: NaiveDate) -> Result<Time> {
        let local = date.and_time(NaiveTime::MIN);
        let offset = Duration::seconds(i64::from(self.config.utc_offset.local_minus_utc()));
        local
            .checked_sub_signed(offset)
            .map(|utc| Utc.from_utc_datetime(&utc))
            .ok_or_else(|| QualityError::Configuration(format!("date {date} is out of range")))
    }
}

/// First day of the bucket containing `date`.
pub fn bucket_start(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    match granularity {
        Granularity::Daily => date,
        Granularity::Weekly => {
            date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
        }
        Granularity::Monthly => date.with_day(1).unwrap_or(date),
    }
}

/// Display label of the bucket starting at `start`.
///
/// Weekly labels name the month holding the week's Thursday and that
/// Thursday's ordinal within the month.
pub fn bucket_label(start: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Daily => start.format("%Y-%m-%d").to_string(),
        Granularity::Monthly => start.format("%Y-%m").to_string(),
        Granularity::Weekly => {
            let thursday = start + Duration::days(3);
            let nth = (thursday.day() - 1) / 7 + 1;
            format!("{}년 {}월 {}주차", thursday.year(), thursday.month(), nth)
        }
    }
}

fn record(date: String, members: &[&InspectionResult]) -> HistoryRecord {
    let count = members.len();
    let total_checks: u64 = members.iter().map(|r| r.summary.total_checks).sum();
    let passed_checks: u64 = members.iter().map(|r| r.summary.total_passed).sum();

    HistoryRecord {
        date,
        score: mean(members.iter().map(|r| r.summary.overall_rate)),
        total_checks,
        passed_checks,
        failed_checks: total_checks.saturating_sub(passed_checks),
        completeness_rate: mean(
            members
                .iter()
                .filter_map(|r| r.dimension_rate(CheckDimension::Completeness)),
        ),
        validity_rate: mean(
            members
                .iter()
                .filter_map(|r| r.dimension_rate(CheckDimension::Validity)),
        ),
        inspections: count,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}
