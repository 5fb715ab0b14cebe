// services/asset-dash/src/tiles.rs
//
// Tile catalog: every counted query shown on the dashboard, grouped into sections

use svckit::filter::{DateRange, Scope};
use svckit::query_builder::{self as qb, ListQuery};
use svckit::QueryCache;

#[derive(Debug, Clone)]
pub struct Tile {
    pub title: &'static str,
    pub key: String,
    pub query: ListQuery,
}

#[derive(Debug, Clone)]
pub struct Section {
    pub title: &'static str,
    pub tiles: Vec<Tile>,
}

/// Cache identity of a tile: `<stem>-<division>-<unit or "all">`.
pub fn query_key(stem: &str, division_id: Option<&str>, unit_id: Option<&str>) -> String {
    format!(
        "{}-{}-{}",
        stem,
        division_id.unwrap_or("none"),
        unit_id.unwrap_or("all")
    )
}

pub fn units_key(division_id: &str) -> String {
    format!("units-{}", division_id)
}

/// Sum of the cached tile counts of a section; tiles without data add nothing.
pub fn section_total(section: &Section, cache: &QueryCache) -> usize {
    section
        .tiles
        .iter()
        .filter_map(|tile| cache.snapshot(&tile.key))
        .map(|data| data.count())
        .sum()
}

pub fn catalog(division_id: Option<&str>, unit_id: Option<&str>) -> Vec<Section> {
    let scope = Scope::from_ids(division_id, unit_id);
    let any_date = DateRange::default();
    let tile = |title, stem: &str, query| Tile {
        title,
        key: query_key(stem, division_id, unit_id),
        query,
    };

    vec![
        Section {
            title: "Machines",
            tiles: vec![
                tile("Total Machines", "machines-total", qb::machines(vec![], &scope)),
                tile("Active Machines", "machines-active", qb::machines_by_status("Active", &scope)),
                tile("Under Service", "machines-service", qb::machines_by_status("Service", &scope)),
                tile("Idle Machines", "machines-idle", qb::machines_by_status("Idle", &scope)),
                tile("In Transit", "machines-transit", qb::machines_by_status("Moving", &scope)),
                tile("Owned Machines", "machines-owned", qb::machines_by_ownership("Owned", &scope)),
                tile("Rented Machines", "machines-rented", qb::machines_by_ownership("Rented", &scope)),
                tile("Demo Machines", "machines-demo", qb::machines_by_ownership("Demo", &scope)),
                tile("Broken Machines", "machines-breakdown", qb::machines_by_status("Breakdown", &scope)),
            ],
        },
        Section {
            title: "AMC & Warranty",
            tiles: vec![
                tile("AMC Active", "machines-amc-active", qb::machines_by_amc("Yes", &scope)),
                tile("No AMC", "machines-amc-inactive", qb::machines_by_amc("No", &scope)),
                tile("Under Warranty", "machines-warranty-active", qb::machines_by_warranty("Yes", &scope)),
                tile("No Warranty", "machines-warranty-inactive", qb::machines_by_warranty("No", &scope)),
            ],
        },
        Section {
            title: "Calibration",
            tiles: vec![
                tile("Calibration Required", "machines-calibration-required", qb::machines_by_calibration("Yes", &scope)),
                tile("No Calibration", "machines-calibration-not-required", qb::machines_by_calibration("No", &scope)),
            ],
        },
        Section {
            title: "Breakdown Maintenance",
            tiles: vec![
                tile("Total Breakdown", "breakdown-total", qb::breakdown_maintenance(vec![], &scope, &any_date)),
                tile("Assigned Breakdown", "breakdown-assigned", qb::breakdown_by_status("Assigned", &scope, &any_date)),
                tile("Escalated Breakdown", "breakdown-escalated", qb::breakdown_by_status("Escalated", &scope, &any_date)),
                tile("Not Attended Breakdown", "breakdown-not-attended", qb::breakdown_by_status("Not Attended", &scope, &any_date)),
                tile("Pending Approval", "breakdown-pending-approval", qb::breakdown_by_status("Pending Approval", &scope, &any_date)),
                tile("Resolved Breakdown", "breakdown-resolved", qb::breakdown_by_status("Resolved", &scope, &any_date)),
                tile("Electrical Breakdown", "breakdown-electrical", qb::breakdown_by_category("Electrical Breakdown", &scope, &any_date)),
                tile("Mechanical Breakdown", "breakdown-mechanical", qb::breakdown_by_category("Mechanical Breakdown", &scope, &any_date)),
            ],
        },
        Section {
            title: "Periodic Maintenance",
            tiles: vec![
                tile("Total Periodic", "periodic-total", qb::periodic_maintenance(vec![], &scope, &any_date)),
                tile("Assigned Periodic", "periodic-assigned", qb::periodic_by_status("Assigned", &scope, &any_date)),
                tile("Not Attended Periodic", "periodic-not-attended", qb::periodic_by_status("Not Attended", &scope, &any_date)),
                tile("Escalated Periodic", "periodic-escalated", qb::periodic_by_status("Escalated", &scope, &any_date)),
                tile("Pending Approval Periodic", "periodic-pending-approval", qb::periodic_by_status("Pending Approval", &scope, &any_date)),
                tile("Resolved Periodic", "periodic-resolved", qb::periodic_by_status("Resolved", &scope, &any_date)),
                tile("Pending Periodic", "periodic-pending", qb::periodic_by_status("Pending", &scope, &any_date)),
                tile("Upcoming Periodic", "periodic-upcoming", qb::periodic_by_status("Upcoming", &scope, &any_date)),
            ],
        },
        Section {
            title: "Spare Parts",
            tiles: vec![
                tile("Total Stock", "spares-total", qb::spare_parts(vec![], &scope)),
                tile("In Stock", "spares-in-stock", qb::spare_parts_by_status("In Stock", &scope)),
                tile("Critical Stock", "spares-critical", qb::spare_parts_by_status("Critical", &scope)),
                tile("Out of Stock", "spares-out-of-stock", qb::spare_parts_by_status("Out of Stock", &scope)),
            ],
        },
        Section {
            title: "Electrical Utility",
            tiles: vec![
                tile("Total Equipment", "equipment-total", qb::equipment(vec![], &scope)),
                tile("Active Equipment", "equipment-active", qb::equipment_by_status("Working", &scope)),
                tile("Under Service", "equipment-service", qb::equipment_by_status("Repair", &scope)),
                tile("Not Working", "equipment-not-working", qb::equipment_by_status("Not Working", &scope)),
            ],
        },
    ]
}
