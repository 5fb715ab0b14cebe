// services/asset-dash/src/mock.rs
//
// In-process demo backend: synthetic records served through the same
// PageFetcher seam as the HTTP fetcher, filtered and paged like the real API

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Local};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use url::Url;

use svckit::errors::FetchError;
use svckit::fetch::PageFetcher;
use svckit::types::{PageEnvelope, PageMeta};

const DIVISIONS: &[(&str, &[(&str, &str)])] = &[
    ("D1", &[("U1", "Stitching Unit 1"), ("U2", "Stitching Unit 2"), ("U3", "Finishing Unit")]),
    ("D2", &[("U4", "Knitting Unit"), ("U5", "Dyeing Unit")]),
];

const MACHINE_STATUSES: &[&str] = &["Active", "Active", "Active", "Service", "Idle", "Moving", "Breakdown"];
const OWNERSHIPS: &[&str] = &["Owned", "Owned", "Rented", "Demo"];
const MAKES: &[(&str, &str)] = &[("Juki", "DDL-8700"), ("Brother", "S-7300A"), ("Pegasus", "M900"), ("Yamato", "VG3711")];
const MACHINE_TYPES: &[&str] = &["Lockstitch", "Overlock", "Flatlock", "Bartack"];
const BREAKDOWN_STATUSES: &[&str] = &["Assigned", "Escalated", "Not Attended", "Pending Approval", "Resolved", "Resolved"];
const PERIODIC_STATUSES: &[&str] = &["Assigned", "Not Attended", "Escalated", "Pending Approval", "Resolved", "Pending", "Upcoming"];
const CATEGORIES: &[&str] = &["Electrical Breakdown", "Mechanical Breakdown"];
const SPARE_STATUSES: &[&str] = &["In Stock", "In Stock", "Critical", "Out of Stock"];
const EQUIPMENT_STATUSES: &[&str] = &["Working", "Working", "Repair", "Not Working"];
const EQUIPMENT_TYPES: &[&str] = &["Transformer", "Generator", "Compressor", "Chiller"];
const MECHANICS: &[&str] = &["ravi", "anita", "kumar", "selvi"];

pub struct DemoBackend {
    collections: HashMap<&'static str, Vec<Value>>,
    failure_ratio: Option<(u32, u32)>,
    latency_ms: Option<(u64, u64)>,
}

impl DemoBackend {
    /// Deterministic dataset for a given seed; no latency, no failures.
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let units: Vec<(&str, &str, &str)> = DIVISIONS
            .iter()
            .flat_map(|(division, units)| units.iter().map(move |(id, name)| (*division, *id, *name)))
            .collect();

        let mut collections: HashMap<&'static str, Vec<Value>> = HashMap::new();
        collections.insert("units", units.iter().map(|u| unit_json(*u)).collect());
        collections.insert("machines", machines(&mut rng, &units, 640));
        collections.insert("breakdown_maintainance", tickets(&mut rng, &units, 520));
        collections.insert("spare-parts-item", spare_parts(&mut rng, &units, 180));
        collections.insert("Equipments", equipment(&mut rng, &units, 72));

        Self {
            collections,
            failure_ratio: None,
            latency_ms: None,
        }
    }

    /// Fails roughly `numerator` in `denominator` page requests with a network error.
    pub fn with_failures(mut self, numerator: u32, denominator: u32) -> Self {
        self.failure_ratio = Some((numerator, denominator.max(numerator).max(1)));
        self
    }

    pub fn with_latency(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.latency_ms = Some((min_ms, max_ms.max(min_ms + 1)));
        self
    }

    pub fn record_count(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |c| c.len())
    }

    fn serve(&self, url: &Url) -> Result<PageEnvelope<Value>, FetchError> {
        let endpoint = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default();
        let collection = endpoint.strip_suffix(":list").ok_or_else(|| FetchError::HttpStatus {
            code: 404,
            url: url.to_string(),
        })?;
        let records = self.collections.get(collection).ok_or_else(|| FetchError::HttpStatus {
            code: 404,
            url: url.to_string(),
        })?;

        let mut page: u32 = 1;
        let mut page_size: u32 = 20;
        let mut filter = Value::Null;
        let mut descending = false;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "page" => page = value.parse().unwrap_or(1).max(1),
                "pageSize" => page_size = value.parse().unwrap_or(20).max(1),
                "filter" => filter = serde_json::from_str(&value)?,
                "sort[]" => descending = value == "-id",
                _ => {}
            }
        }

        let mut matched: Vec<&Value> = records.iter().filter(|r| matches(r, &filter)).collect();
        if descending {
            matched.reverse();
        }

        let count = matched.len();
        let total_pages = (count as u32).div_ceil(page_size).max(1);
        let start = ((page - 1) * page_size) as usize;
        let data = matched
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect();

        Ok(PageEnvelope {
            data,
            meta: PageMeta {
                count: Some(count as u64),
                page,
                page_size,
                total_pages: Some(total_pages),
                has_next: Some(page < total_pages),
            },
        })
    }
}

#[async_trait]
impl PageFetcher for DemoBackend {
    async fn fetch_page(&self, url: &Url) -> Result<PageEnvelope<Value>, FetchError> {
        if let Some((min, max)) = self.latency_ms {
            let delay = rand::thread_rng().gen_range(min..max);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if let Some((numerator, denominator)) = self.failure_ratio {
            if rand::thread_rng().gen_ratio(numerator, denominator) {
                return Err(FetchError::Network("demo backend dropped the connection".to_string()));
            }
        }

        self.serve(url)
    }

    fn name(&self) -> &str {
        "demo"
    }
}

/// Evaluates a filter document the way the backend does: nested keys walk
/// relations, `$`-keys compare the value reached.
fn matches(record: &Value, filter: &Value) -> bool {
    let Some(conditions) = filter.as_object() else {
        return true;
    };

    conditions.iter().all(|(key, expected)| match key.as_str() {
        "$and" => expected
            .as_array()
            .map_or(true, |clauses| clauses.iter().all(|c| matches(record, c))),
        "$eq" => record == expected,
        "$includes" => match (record.as_str(), expected.as_str()) {
            (Some(actual), Some(needle)) => actual.contains(needle),
            _ => false,
        },
        "$gte" => compare_dates(record, expected).map_or(false, |o| o.is_ge()),
        "$lte" => compare_dates(record, expected).map_or(false, |o| o.is_le()),
        field => matches(record.get(field).unwrap_or(&Value::Null), expected),
    })
}

fn compare_dates(record: &Value, bound: &Value) -> Option<std::cmp::Ordering> {
    let actual = record.as_str()?.get(..10)?;
    Some(actual.cmp(bound.as_str()?))
}

fn unit_json((division, id, name): (&str, &str, &str)) -> Value {
    json!({
        "unit_id": id,
        "unit_name": name,
        "division": {"division_id": division}
    })
}

fn pick<'a>(rng: &mut StdRng, options: &[&'a str]) -> &'a str {
    options[rng.gen_range(0..options.len())]
}

fn yes_no(rng: &mut StdRng, yes_ratio: f64) -> &'static str {
    if rng.gen_bool(yes_ratio) {
        "Yes"
    } else {
        "No"
    }
}

fn location(rng: &mut StdRng, id: usize) -> Value {
    json!({
        "location_id": format!("L-{:03}", id % 40),
        "department": pick(rng, &["Sewing", "Cutting", "Finishing"]),
        "building": pick(rng, &["A", "B"]),
        "floor": format!("{}", rng.gen_range(1..4)),
        "line": format!("Line {}", rng.gen_range(1..13)),
    })
}

fn machines(rng: &mut StdRng, units: &[(&str, &str, &str)], n: usize) -> Vec<Value> {
    (1..=n)
        .map(|id| {
            let unit = units[rng.gen_range(0..units.len())];
            let (make, model) = MAKES[rng.gen_range(0..MAKES.len())];
            json!({
                "id": id,
                "machine_id": format!("M-{:05}", id),
                "machine_no": format!("{}", 1000 + id),
                "make": make,
                "model": model,
                "status": pick(rng, MACHINE_STATUSES),
                "ownership": pick(rng, OWNERSHIPS),
                "has_amc": yes_no(rng, 0.6),
                "has_warranty": yes_no(rng, 0.45),
                "calibration_required": yes_no(rng, 0.3),
                "asset-current-value": rng.gen_range(20_000..250_000),
                "machine_type": {"machine_type": pick(rng, MACHINE_TYPES)},
                "machine_location": location(rng, id),
                "unit": unit_json(unit),
            })
        })
        .collect()
}

fn tickets(rng: &mut StdRng, units: &[(&str, &str, &str)], n: usize) -> Vec<Value> {
    let today = Local::now().date_naive();
    (1..=n)
        .map(|id| {
            let unit = units[rng.gen_range(0..units.len())];
            let breakdown = rng.gen_bool(0.55);
            let date = if rng.gen_ratio(1, 25) {
                Value::Null
            } else {
                let day = today - ChronoDuration::days(rng.gen_range(0..120));
                json!(format!("{}T{:02}:15:00.000Z", day.format("%Y-%m-%d"), rng.gen_range(6..20)))
            };
            let (make, model) = MAKES[rng.gen_range(0..MAKES.len())];

            let mut site = location(rng, id);
            site["unit"] = unit_json(unit);

            json!({
                "id": id,
                "maintainance_type": if breakdown { "breakdown" } else { "preventive" },
                "status": pick(rng, if breakdown { BREAKDOWN_STATUSES } else { PERIODIC_STATUSES }),
                "breakdown-category": if breakdown { json!(pick(rng, CATEGORIES)) } else { Value::Null },
                "maintainance_date": date,
                "broken_machine": {
                    "machine_id": format!("M-{:05}", rng.gen_range(1..640)),
                    "make": make,
                    "model": model,
                    "machine_type": {"machine_type": pick(rng, MACHINE_TYPES)},
                },
                "assigned_to": {"id": rng.gen_range(1..5), "username": pick(rng, MECHANICS)},
                "location": site,
            })
        })
        .collect()
}

fn spare_parts(rng: &mut StdRng, units: &[(&str, &str, &str)], n: usize) -> Vec<Value> {
    (1..=n)
        .map(|id| {
            let unit = units[rng.gen_range(0..units.len())];
            let item_no = format!("SP-{:04}", id);
            json!({
                "id": id,
                "spare-parts-item-no": item_no,
                "available-qty": rng.gen_range(0..400),
                "critical-qty": rng.gen_range(5..50),
                "status": pick(rng, SPARE_STATUSES),
                "spare-parts-item": {
                    "spare-parts-item-no": item_no,
                    "spares_description": pick(rng, &["Needle plate", "Feed dog", "Bobbin case", "Looper", "Presser foot"]),
                },
                "unit": unit_json(unit),
            })
        })
        .collect()
}

fn equipment(rng: &mut StdRng, units: &[(&str, &str, &str)], n: usize) -> Vec<Value> {
    (1..=n)
        .map(|id| {
            let unit = units[rng.gen_range(0..units.len())];
            json!({
                "id": id,
                "equipment-id": format!("EQ-{:03}", id),
                "make": pick(rng, &["ABB", "Siemens", "Kirloskar"]),
                "model": format!("X{}", rng.gen_range(100..900)),
                "mcs-sl-no": format!("MCS{:05}", rng.gen_range(1..99_999)),
                "Status": pick(rng, EQUIPMENT_STATUSES),
                "equipment-type": {"equipment-type": pick(rng, EQUIPMENT_TYPES)},
                "unit": unit_json(unit),
                "location": location(rng, id),
            })
        })
        .collect()
}
