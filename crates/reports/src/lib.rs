//! # Pandaloto Reports
//!
//! Report generation - CSV, JSON and Markdown renderings of analytics,
//! fraud alerts and player statements.
//!
//! ## Exporters
//!
//! - [`CsvExporter`] - CSV with quoting, configurable delimiter
//! - [`JsonExporter`] - JSON (pretty or compact)
//! - [`MarkdownExporter`] - Markdown tables
//!
//! ## Reports
//!
//! - [`OverviewReport`] - dashboard counters
//! - [`TopUsersReport`] - biggest wagerers
//! - [`TimeSeriesReport`] - transaction volume per bucket
//! - [`StatementReport`] - ledger statement of one player
//! - [`FraudReport`] - alert listing with a risk score
//! - [`UserRiskReport`] - alerts grouped per player
//!
//! ## Example
//!
//! ```rust,ignore
//! use pandaloto_reports::{FraudReport, MarkdownExporter, ReportExporter};
//!
//! let report = FraudReport::generate("Alertas de fraude", &alerts, now);
//! let markdown = MarkdownExporter::new().with_toc().export(&report);
//! ```

pub mod exporters;
pub mod fraud_report;
pub mod platform;

pub use exporters::{
    exporter_for, CsvExporter, JsonExporter, MarkdownExporter, ReportData, ReportExporter,
};
pub use fraud_report::{classify_score, FraudReport, UserRisk, UserRiskReport};
pub use platform::{OverviewReport, StatementReport, TimeSeriesReport, TopUsersReport};
