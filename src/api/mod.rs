//! Typed clients for the Yandex Metrika and AppMetrica REST APIs.
//!
//! This module provides:
//! - [`ApiClient`]: base URL layout, bearer auth, retry and error decoding
//! - One service per endpoint family built on top of it

mod applications;
mod client;
mod goals;
mod log_request;
mod stat_table;

pub use applications::{Application, ApplicationsService};
pub use client::{ApiClient, QueryParams, ServiceKind};
pub use goals::{Goal, GoalsService};
pub use log_request::{
    Attribution, EvaluationResult, JobStatus, LogExportJob, LogExportQuery, LogPart, LogSource,
    LogRequestService,
};
pub use stat_table::{DimensionValue, StatTablePage, StatTableQuery, StatTableRow, StatTableService};
