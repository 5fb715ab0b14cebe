use url::Url;

use crate::config::DEFAULT_PAGE_SIZE;
use crate::errors::FetchError;
use crate::filter::{DateRange, FilterExpr, Predicate, Scope};
use crate::types::MaintenanceType;

pub const MAINTENANCE_TYPE_FIELD: &str = "maintainance_type";
pub const MAINTENANCE_DATE_FIELD: &str = "maintainance_date";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Machines,
    BreakdownMaintenance,
    PeriodicMaintenance,
    SpareParts,
    Equipment,
    Units,
}

impl Resource {
    pub fn name(&self) -> &'static str {
        match self {
            Resource::Machines => "machines",
            Resource::BreakdownMaintenance => "breakdown",
            Resource::PeriodicMaintenance => "periodic",
            Resource::SpareParts => "spare_parts",
            Resource::Equipment => "equipment",
            Resource::Units => "units",
        }
    }

    /// Backend collection name; both maintenance kinds live in one collection.
    pub fn collection(&self) -> &'static str {
        match self {
            Resource::Machines => "machines",
            Resource::BreakdownMaintenance | Resource::PeriodicMaintenance => {
                "breakdown_maintainance"
            }
            Resource::SpareParts => "spare-parts-item",
            Resource::Equipment => "Equipments",
            Resource::Units => "units",
        }
    }

    pub fn sort(&self) -> &'static [&'static str] {
        match self {
            Resource::BreakdownMaintenance | Resource::PeriodicMaintenance => &["-id"],
            _ => &[],
        }
    }

    /// Relations the backend should expand inline.
    pub fn appends(&self) -> &'static [&'static str] {
        match self {
            Resource::Machines => &["machine_location", "machine_type", "unit"],
            Resource::BreakdownMaintenance | Resource::PeriodicMaintenance => &[
                "broken_machine",
                "broken_machine.machine_type",
                "broken_machine.machine_location",
                "assigned_to",
                "location",
            ],
            Resource::SpareParts => &["spare-parts-item", "unit"],
            Resource::Equipment => &["equipment-type", "unit", "location", "createdBy", "updatedBy"],
            Resource::Units => &[],
        }
    }

    /// Relation path from a record to its unit.
    pub fn unit_path(&self) -> &'static [&'static str] {
        match self {
            Resource::BreakdownMaintenance | Resource::PeriodicMaintenance => &["location", "unit"],
            Resource::Units => &[],
            _ => &["unit"],
        }
    }
}

/// A list request minus its page number.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub resource: Resource,
    pub filter: FilterExpr,
    pub page_size: u32,
}

impl ListQuery {
    pub fn new(resource: Resource, filter: FilterExpr) -> Self {
        Self {
            resource,
            filter,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// `<base>/<collection>:list?pageSize=..&sort[]=..&appends[]=..&page=N&filter=..`
    pub fn page_url(&self, base: &Url, page: u32) -> Result<Url, FetchError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Config(format!("base url cannot hold a path: {}", base)))?
            .pop_if_empty()
            .push(&format!("{}:list", self.resource.collection()));

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("pageSize", &self.page_size.to_string());
            for sort in self.resource.sort() {
                pairs.append_pair("sort[]", sort);
            }
            for append in self.resource.appends() {
                pairs.append_pair("appends[]", append);
            }
            pairs.append_pair("page", &page.to_string());
            pairs.append_pair("filter", &self.filter.encode());
        }

        Ok(url)
    }
}

fn scoped(resource: Resource, filters: Vec<Predicate>, scope: &Scope) -> ListQuery {
    let filter = FilterExpr::new()
        .and_all(filters)
        .and_opt(scope.predicate(resource.unit_path()));
    ListQuery::new(resource, filter)
}

pub fn machines(filters: Vec<Predicate>, scope: &Scope) -> ListQuery {
    scoped(Resource::Machines, filters, scope)
}

pub fn machines_by_status(status: &str, scope: &Scope) -> ListQuery {
    machines(vec![Predicate::eq("status", status)], scope)
}

pub fn machines_by_ownership(ownership: &str, scope: &Scope) -> ListQuery {
    machines(vec![Predicate::eq("ownership", ownership)], scope)
}

pub fn machines_by_amc(has_amc: &str, scope: &Scope) -> ListQuery {
    machines(vec![Predicate::eq("has_amc", has_amc)], scope)
}

pub fn machines_by_warranty(has_warranty: &str, scope: &Scope) -> ListQuery {
    machines(vec![Predicate::eq("has_warranty", has_warranty)], scope)
}

pub fn machines_by_calibration(calibration_required: &str, scope: &Scope) -> ListQuery {
    machines(vec![Predicate::eq("calibration_required", calibration_required)], scope)
}

/// Shared by both maintenance kinds. The kind predicate comes first, then the
/// caller's filters, the scope and finally the date range.
pub fn maintenance(
    kind: MaintenanceType,
    filters: Vec<Predicate>,
    scope: &Scope,
    range: &DateRange,
) -> ListQuery {
    let resource = match kind {
        MaintenanceType::Breakdown => Resource::BreakdownMaintenance,
        MaintenanceType::Preventive => Resource::PeriodicMaintenance,
    };
    let filter = FilterExpr::new()
        .and(Predicate::eq(MAINTENANCE_TYPE_FIELD, kind.as_str()))
        .and_all(filters)
        .and_opt(scope.predicate(resource.unit_path()))
        .and_opt(range.predicate(MAINTENANCE_DATE_FIELD));
    ListQuery::new(resource, filter)
}

pub fn breakdown_maintenance(filters: Vec<Predicate>, scope: &Scope, range: &DateRange) -> ListQuery {
    maintenance(MaintenanceType::Breakdown, filters, scope, range)
}

/// Ticket statuses are matched by substring.
pub fn breakdown_by_status(status: &str, scope: &Scope, range: &DateRange) -> ListQuery {
    breakdown_maintenance(vec![Predicate::includes("status", status)], scope, range)
}

pub fn breakdown_by_category(category: &str, scope: &Scope, range: &DateRange) -> ListQuery {
    breakdown_maintenance(vec![Predicate::eq("breakdown-category", category)], scope, range)
}

pub fn periodic_maintenance(filters: Vec<Predicate>, scope: &Scope, range: &DateRange) -> ListQuery {
    maintenance(MaintenanceType::Preventive, filters, scope, range)
}

pub fn periodic_by_status(status: &str, scope: &Scope, range: &DateRange) -> ListQuery {
    periodic_maintenance(vec![Predicate::includes("status", status)], scope, range)
}

pub fn spare_parts(filters: Vec<Predicate>, scope: &Scope) -> ListQuery {
    scoped(Resource::SpareParts, filters, scope)
}

pub fn spare_parts_by_status(status: &str, scope: &Scope) -> ListQuery {
    spare_parts(vec![Predicate::eq("status", status)], scope)
}

pub fn equipment(filters: Vec<Predicate>, scope: &Scope) -> ListQuery {
    scoped(Resource::Equipment, filters, scope)
}

pub fn equipment_by_status(status: &str, scope: &Scope) -> ListQuery {
    equipment(vec![Predicate::eq("Status", status)], scope)
}

/// Wrapped in `$and` like every other list filter. The backend reads a bare
/// `{"division": {"division_id": {"$eq": ..}}}` object the same way.
pub fn units_by_division(division_id: &str) -> ListQuery {
    let filter = FilterExpr::new()
        .and(Predicate::path(["division", "division_id"]).with(crate::filter::Op::Eq, division_id));
    ListQuery::new(Resource::Units, filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Url {
        Url::parse("https://assets.example.com/api/").unwrap()
    }

    #[test]
    fn test_status_filter_with_unit_scope() {
        let query = machines_by_status("Active", &Scope::Unit("U1".to_string()));
        assert_eq!(
            query.filter.to_json(),
            json!({"$and": [
                {"status": {"$eq": "Active"}},
                {"unit": {"unit_id": {"$eq": "U1"}}}
            ]})
        );
    }

    #[test]
    fn test_unit_scope_drops_division_predicate() {
        let scope = Scope::from_ids(Some("D1"), Some("U1"));
        let text = machines(vec![], &scope).filter.encode();
        assert!(text.contains("unit_id"));
        assert!(!text.contains("division_id"));
    }

    #[test]
    fn test_division_scope_on_spare_parts() {
        let query = spare_parts_by_status("Critical", &Scope::Division("D1".to_string()));
        assert_eq!(
            query.filter.to_json(),
            json!({"$and": [
                {"status": {"$eq": "Critical"}},
                {"unit": {"division": {"division_id": {"$eq": "D1"}}}}
            ]})
        );
    }

    #[test]
    fn test_maintenance_date_range_without_scope() {
        let range = DateRange::parse(Some("2024-01-01"), Some("2024-01-31")).unwrap();
        let query = breakdown_maintenance(vec![], &Scope::Unscoped, &range);

        assert_eq!(
            query.filter.to_json(),
            json!({"$and": [
                {"maintainance_type": {"$eq": "breakdown"}},
                {"maintainance_date": {"$gte": "2024-01-01", "$lte": "2024-01-31"}}
            ]})
        );
        let text = query.filter.encode();
        assert!(!text.contains("unit_id"));
        assert!(!text.contains("division_id"));
    }

    #[test]
    fn test_maintenance_scope_goes_through_location() {
        let query = periodic_by_status("Upcoming", &Scope::Unit("U9".to_string()), &DateRange::default());
        assert_eq!(query.resource, Resource::PeriodicMaintenance);
        assert_eq!(
            query.filter.to_json(),
            json!({"$and": [
                {"maintainance_type": {"$eq": "preventive"}},
                {"status": {"$includes": "Upcoming"}},
                {"location": {"unit": {"unit_id": {"$eq": "U9"}}}}
            ]})
        );
    }

    #[test]
    fn test_equipment_status_uses_capitalized_field() {
        let query = equipment_by_status("Working", &Scope::Unscoped);
        assert_eq!(query.filter.to_json(), json!({"$and": [{"Status": {"$eq": "Working"}}]}));
    }

    #[test]
    fn test_units_by_division() {
        let query = units_by_division("D4");
        assert_eq!(query.resource, Resource::Units);
        assert_eq!(
            query.filter.to_json(),
            json!({"$and": [{"division": {"division_id": {"$eq": "D4"}}}]})
        );
    }

    #[test]
    fn test_page_url_carries_list_parameters() {
        let query = breakdown_by_category("Electrical Breakdown", &Scope::Unscoped, &DateRange::default());
        let url = query.page_url(&base(), 3).unwrap();

        assert_eq!(url.path(), "/api/breakdown_maintainance:list");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("pageSize".to_string(), "200".to_string()));
        assert_eq!(pairs[1], ("sort[]".to_string(), "-id".to_string()));
        assert_eq!(
            pairs.iter().filter(|(k, _)| k == "appends[]").count(),
            Resource::BreakdownMaintenance.appends().len()
        );
        assert!(pairs.contains(&("page".to_string(), "3".to_string())));

        let filter = pairs.iter().find(|(k, _)| k == "filter").map(|(_, v)| v.clone()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&filter).unwrap();
        assert_eq!(parsed, query.filter.to_json());
    }

    #[test]
    fn test_page_url_only_changes_page_number() {
        let query = equipment(vec![], &Scope::Unscoped).with_page_size(50);
        let first = query.page_url(&base(), 1).unwrap();
        let second = query.page_url(&base(), 2).unwrap();

        assert_eq!(first.path(), "/api/Equipments:list");
        assert!(first.as_str().contains("pageSize=50"));
        assert_eq!(
            first.as_str().replace("page=1&", "page=2&"),
            second.as_str()
        );
    }
}
