use serde::{Deserialize, Serialize};

use super::super::domain::MaintenanceCategory;

/// Thresholds backing the auto-approval rules. Values are plain data so
/// tests can tighten or loosen policy without environment plumbing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Longest guest stay, in nights, the system approves on its own.
    pub max_auto_guest_nights: i64,
    /// Longest leave, in inclusive days, the system approves on its own.
    pub max_auto_leave_days: i64,
    /// Hard cap on leave length; beyond this a request is rejected outright.
    pub max_leave_days: i64,
    /// Guest visits announced later than this are noted as short notice.
    pub min_advance_notice_hours: i64,
    /// Arrivals within this window are flagged for the gate as imminent.
    pub imminent_arrival_hours: i64,
    /// Leaves longer than this escalate at a raised priority.
    pub extended_leave_days: i64,
    /// Maintenance categories eligible for automatic work orders.
    pub basic_maintenance: Vec<MaintenanceCategory>,
}

impl PolicyConfig {
    /// The standing hostel policy.
    pub fn standard() -> Self {
        Self {
            max_auto_guest_nights: 1,
            max_auto_leave_days: 2,
            max_leave_days: 30,
            min_advance_notice_hours: 24,
            imminent_arrival_hours: 2,
            extended_leave_days: 7,
            basic_maintenance: vec![
                MaintenanceCategory::Plumbing,
                MaintenanceCategory::ElectricalMinor,
                MaintenanceCategory::Furniture,
                MaintenanceCategory::Cleaning,
                MaintenanceCategory::AcRepair,
            ],
        }
    }

    pub fn is_basic_maintenance(&self, category: MaintenanceCategory) -> bool {
        self.basic_maintenance.contains(&category)
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::standard()
    }
}
