//! Wire envelopes and typed resource records.
//!
//! The backend uses hyphenated and oddly cased field names. Every record maps
//! them onto snake_case fields with `#[serde(rename)]`:
//!
//! | Record        | Wire                                   | Field                        |
//! |---------------|----------------------------------------|------------------------------|
//! | `Machine`     | `amc-start-date`, `amc-end-date`       | `amc_start_date`, `amc_end_date` |
//! | `Machine`     | `warranty-start-date`, `warranty-end-date` | `warranty_start_date`, `warranty_end_date` |
//! | `Machine`     | `next-calibration-at`                  | `next_calibration_at`        |
//! | `Machine`     | `asset-current-value`, `asset-purchase-value` | `asset_current_value`, `asset_purchase_value` |
//! | `Maintenance` | `maintainance_type`, `maintainance_date` | `maintenance_type`, `maintenance_date` |
//! | `Maintenance` | `breakdown-category`                   | `breakdown_category`         |
//! | `SparePart`   | `spare-parts-item-no`, `spare-parts-item` | `item_no`, `item`         |
//! | `SparePart`   | `available-qty`, `critical-qty`        | `available_qty`, `critical_qty` |
//! | `Equipment`   | `equipment-id`, `mcs-sl-no`, `Status`, `equipment-type` | `equipment_id`, `mcs_sl_no`, `status`, `equipment_type` |

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub count: Option<u64>,
    pub page: u32,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
    #[serde(rename = "totalPage", default)]
    pub total_pages: Option<u32>,
    #[serde(rename = "hasNext", default)]
    pub has_next: Option<bool>,
}

/// One HTTP response's worth of list data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEnvelope<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> PageEnvelope<T> {
    /// True when the backend reports more pages after `page`.
    pub fn has_more_after(&self, page: u32) -> bool {
        self.meta.has_next.unwrap_or(false)
            || self.meta.total_pages.map_or(false, |total| page < total)
    }
}

/// Every page of a list query, concatenated in fetch order. Pagination state
/// does not survive aggregation: the snapshot always describes itself as a
/// single page holding everything.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedResult<T> {
    pub items: Vec<T>,
    pub count: usize,
    pub page: u32,
    pub page_size: usize,
    pub total_pages: u32,
    pub has_next: bool,
}

impl<T> AggregatedResult<T> {
    pub fn from_items(items: Vec<T>) -> Self {
        let count = items.len();
        Self {
            items,
            count,
            page: 1,
            page_size: count,
            total_pages: 1,
            has_next: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceType {
    Breakdown,
    Preventive,
}

impl MaintenanceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceType::Breakdown => "breakdown",
            MaintenanceType::Preventive => "preventive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRef {
    pub unit_id: String,
    #[serde(default)]
    pub unit_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineTypeRef {
    pub machine_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRef {
    pub location_id: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub building: Option<String>,
    #[serde(default)]
    pub floor: Option<String>,
    #[serde(default)]
    pub line: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub id: i64,
    pub machine_id: String,
    #[serde(default)]
    pub machine_no: Option<String>,
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub ownership: Option<String>,
    #[serde(default)]
    pub has_amc: Option<String>,
    #[serde(rename = "amc-start-date", default)]
    pub amc_start_date: Option<String>,
    #[serde(rename = "amc-end-date", default)]
    pub amc_end_date: Option<String>,
    #[serde(default)]
    pub has_warranty: Option<String>,
    #[serde(rename = "warranty-start-date", default)]
    pub warranty_start_date: Option<String>,
    #[serde(rename = "warranty-end-date", default)]
    pub warranty_end_date: Option<String>,
    #[serde(default)]
    pub calibration_required: Option<String>,
    #[serde(rename = "next-calibration-at", default)]
    pub next_calibration_at: Option<String>,
    #[serde(default)]
    pub date_of_installation: Option<String>,
    #[serde(rename = "asset-current-value", default)]
    pub asset_current_value: Option<f64>,
    #[serde(rename = "asset-purchase-value", default)]
    pub asset_purchase_value: Option<f64>,
    #[serde(default)]
    pub machine_type: Option<MachineTypeRef>,
    #[serde(default)]
    pub machine_location: Option<LocationRef>,
    #[serde(default)]
    pub unit: Option<UnitRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokenMachineRef {
    pub machine_id: String,
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub ownership: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub machine_type: Option<MachineTypeRef>,
    #[serde(default)]
    pub machine_location: Option<LocationRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssigneeRef {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Breakdown and preventive tickets share one backend collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Maintenance {
    pub id: i64,
    #[serde(rename = "maintainance_type")]
    pub maintenance_type: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "breakdown-category", default)]
    pub breakdown_category: Option<String>,
    #[serde(rename = "maintainance_date", default)]
    pub maintenance_date: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub attended: Option<String>,
    #[serde(default)]
    pub solved: Option<String>,
    #[serde(default)]
    pub escalation_remarks: Option<String>,
    #[serde(default)]
    pub head_mechanic_remarks: Option<String>,
    #[serde(default)]
    pub unit_manager_remarks: Option<String>,
    #[serde(default)]
    pub floor_manager_remarks: Option<String>,
    #[serde(default)]
    pub broken_machine: Option<BrokenMachineRef>,
    #[serde(default)]
    pub assigned_to: Option<AssigneeRef>,
    #[serde(default)]
    pub location: Option<LocationRef>,
}

impl Maintenance {
    pub fn kind(&self) -> Option<MaintenanceType> {
        match self.maintenance_type.as_str() {
            "breakdown" => Some(MaintenanceType::Breakdown),
            "preventive" => Some(MaintenanceType::Preventive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparePartItemRef {
    #[serde(rename = "spare-parts-item-no")]
    pub item_no: String,
    #[serde(default)]
    pub spares_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparePart {
    pub id: i64,
    #[serde(rename = "spare-parts-item-no", default)]
    pub item_no: Option<String>,
    #[serde(rename = "available-qty", default)]
    pub available_qty: Option<f64>,
    #[serde(rename = "critical-qty", default)]
    pub critical_qty: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "spare-parts-item", default)]
    pub item: Option<SparePartItemRef>,
    #[serde(default)]
    pub unit: Option<UnitRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentTypeRef {
    #[serde(rename = "equipment-type")]
    pub equipment_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: i64,
    #[serde(rename = "equipment-id")]
    pub equipment_id: String,
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(rename = "mcs-sl-no", default)]
    pub mcs_sl_no: Option<String>,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
    #[serde(rename = "equipment-type", default)]
    pub equipment_type: Option<EquipmentTypeRef>,
    #[serde(default)]
    pub unit: Option<UnitRef>,
    #[serde(default)]
    pub location: Option<LocationRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub unit_id: String,
    pub unit_name: String,
}

/// A decoded aggregation for one of the dashboard resources.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Machines(AggregatedResult<Machine>),
    Maintenance(AggregatedResult<Maintenance>),
    SpareParts(AggregatedResult<SparePart>),
    Equipment(AggregatedResult<Equipment>),
    Units(AggregatedResult<Unit>),
}

impl Dataset {
    pub fn count(&self) -> usize {
        match self {
            Dataset::Machines(r) => r.count,
            Dataset::Maintenance(r) => r.count,
            Dataset::SpareParts(r) => r.count,
            Dataset::Equipment(r) => r.count,
            Dataset::Units(r) => r.count,
        }
    }

    pub fn units(&self) -> &[Unit] {
        match self {
            Dataset::Units(r) => &r.items,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_reads_camel_case_meta() {
        let envelope: PageEnvelope<serde_json::Value> = serde_json::from_value(json!({
            "data": [{"id": 1}],
            "meta": {"count": 412, "page": 2, "pageSize": 200, "totalPage": 3}
        }))
        .unwrap();

        assert_eq!(envelope.meta.total_pages, Some(3));
        assert_eq!(envelope.meta.has_next, None);
        assert!(envelope.has_more_after(2));
        assert!(!envelope.has_more_after(3));
    }

    #[test]
    fn test_has_next_wins_over_total_pages() {
        let envelope: PageEnvelope<serde_json::Value> = serde_json::from_value(json!({
            "data": [],
            "meta": {"page": 5, "pageSize": 200, "totalPage": 1, "hasNext": true}
        }))
        .unwrap();
        assert!(envelope.has_more_after(5));
    }

    #[test]
    fn test_aggregated_result_describes_one_page() {
        let result = AggregatedResult::from_items(vec![1, 2, 3]);
        assert_eq!(result.count, 3);
        assert_eq!(result.page_size, 3);
        assert_eq!(result.page, 1);
        assert_eq!(result.total_pages, 1);
        assert!(!result.has_next);
    }

    #[test]
    fn test_hyphenated_fields_decode() {
        let machine: Machine = serde_json::from_value(json!({
            "id": 7,
            "machine_id": "M-007",
            "status": "Active",
            "ownership": "Rented",
            "amc-end-date": "2025-03-31",
            "asset-current-value": 125000,
            "machine_type": {"machine_type": "Lockstitch"},
            "unit": {"unit_id": "U1", "unit_name": "Unit One"}
        }))
        .unwrap();
        assert_eq!(machine.amc_end_date.as_deref(), Some("2025-03-31"));
        assert_eq!(machine.asset_current_value, Some(125000.0));
        assert_eq!(machine.unit.unwrap().unit_name.as_deref(), Some("Unit One"));

        let equipment: Equipment = serde_json::from_value(json!({
            "id": 3,
            "equipment-id": "EQ-3",
            "Status": "Working",
            "equipment-type": {"equipment-type": "Transformer"}
        }))
        .unwrap();
        assert_eq!(equipment.status.as_deref(), Some("Working"));
        assert_eq!(equipment.equipment_type.unwrap().equipment_type, "Transformer");
    }

    #[test]
    fn test_maintenance_nulls_are_none() {
        let ticket: Maintenance = serde_json::from_value(json!({
            "id": 11,
            "maintainance_type": "breakdown",
            "status": "Escalated",
            "breakdown-category": null,
            "maintainance_date": "2024-01-15T08:30:00.000Z",
            "assigned_to": {"id": 4, "username": "ravi"}
        }))
        .unwrap();
        assert_eq!(ticket.kind(), Some(MaintenanceType::Breakdown));
        assert_eq!(ticket.breakdown_category, None);
        assert_eq!(ticket.assigned_to.unwrap().username.as_deref(), Some("ravi"));
    }
}
