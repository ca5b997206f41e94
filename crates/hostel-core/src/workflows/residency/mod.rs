pub mod requests;

mod conflicts;
mod report;

pub use conflicts::{Conflict, ConflictChecker, ConflictKind, ConflictSeverity};
pub use report::{AwayEntry, DailyReport, GuestEntry, MaintenanceEntry};
