//! Tabular query output and typed views over the aggregate reports.

pub mod statistics;
pub mod table;

pub use statistics::{ClinicVisits, HourlyVisits, VisitStatistics};
pub use table::{Record, Table, Value};
