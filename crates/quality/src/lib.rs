//! Inspection core
//!
//! Catalog lookup, rule evaluation, inspection runs, aggregation and
//! history projection.

#![warn(missing_docs)]

pub mod aggregator;
pub mod analysis;
pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod history;
pub mod runner;
pub mod source;

pub use aggregator::{aggregate, ResultAggregator};
pub use analysis::{FieldAnalysis, SeverityCount};
pub use api::{
    HistoryRequest, InspectionRunRequest, InspectionRunResponse, InspectionService, PeriodKind,
};
pub use catalog::{Catalog, CatalogError, CatalogGroup};
pub use config::{AppConfig, StorageBackend};
pub use error::{FetchError, QualityError, Result};
pub use evaluator::{evaluate, evaluate_params};
pub use history::{HistoryConfig, HistoryQueryService};
pub use runner::{InspectionRun, InspectionRunner, RunnerConfig};
pub use source::{HttpRowSource, JsonFileRowSource, RowSource, StaticRowSource};
