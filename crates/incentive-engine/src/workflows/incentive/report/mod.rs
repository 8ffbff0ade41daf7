mod summary;
pub mod views;

pub use summary::{ArchetypeTotals, RunReport};
pub use views::{EmployeeExplanation, RunReportSummary};
