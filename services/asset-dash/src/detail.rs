// services/asset-dash/src/detail.rs
//
// Detail table for one tile: date filtering and paging happen client-side
// over the tile's cached dataset

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use svckit::filter::DateRange;
use svckit::types::{Dataset, Equipment, Machine, Maintenance, SparePart, Unit};

pub const ROWS_PER_PAGE: usize = 100;

/// Quick ranges for the maintenance date filter, relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatePreset {
    #[default]
    AllTime,
    Last7Days,
    Last30Days,
    Last90Days,
}

impl DatePreset {
    pub fn next(self) -> Self {
        match self {
            DatePreset::AllTime => DatePreset::Last7Days,
            DatePreset::Last7Days => DatePreset::Last30Days,
            DatePreset::Last30Days => DatePreset::Last90Days,
            DatePreset::Last90Days => DatePreset::AllTime,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DatePreset::AllTime => "All time",
            DatePreset::Last7Days => "Last 7 days",
            DatePreset::Last30Days => "Last 30 days",
            DatePreset::Last90Days => "Last 90 days",
        }
    }

    pub fn range(&self, today: NaiveDate) -> DateRange {
        let days = match self {
            DatePreset::AllTime => return DateRange::default(),
            DatePreset::Last7Days => 6,
            DatePreset::Last30Days => 29,
            DatePreset::Last90Days => 89,
        };
        DateRange::new(Some(today - chrono::Duration::days(days)), Some(today))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeField {
    #[default]
    Start,
    End,
}

/// Typed start and end dates for a custom maintenance range. Either side may
/// be left blank for an open end; both blank clears the filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangePrompt {
    pub start: String,
    pub end: String,
    pub field: RangeField,
    pub error: Option<String>,
}

impl RangePrompt {
    const MAX_LEN: usize = 10;

    pub fn from_range(range: DateRange) -> Self {
        let text = |d: Option<NaiveDate>| d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
        Self {
            start: text(range.start),
            end: text(range.end),
            ..Default::default()
        }
    }

    fn active(&mut self) -> &mut String {
        match self.field {
            RangeField::Start => &mut self.start,
            RangeField::End => &mut self.end,
        }
    }

    /// Only digits and dashes are accepted, up to `YYYY-MM-DD`.
    pub fn push(&mut self, c: char) {
        if !(c.is_ascii_digit() || c == '-') {
            return;
        }
        let field = self.active();
        if field.len() < Self::MAX_LEN {
            field.push(c);
        }
        self.error = None;
    }

    pub fn backspace(&mut self) {
        self.active().pop();
        self.error = None;
    }

    pub fn switch_field(&mut self) {
        self.field = match self.field {
            RangeField::Start => RangeField::End,
            RangeField::End => RangeField::Start,
        };
    }

    pub fn parse(&self) -> Result<DateRange, String> {
        let range = DateRange::parse(Some(self.start.trim()), Some(self.end.trim()))
            .map_err(|_| "dates must be YYYY-MM-DD".to_string())?;
        match (range.start, range.end) {
            (Some(start), Some(end)) if start > end => Err("start date is after end date".to_string()),
            _ => Ok(range),
        }
    }
}

/// Calendar date of a record timestamp, in the offset it was written with.
/// Accepts RFC 3339, naive date-times and plain `YYYY-MM-DD`.
pub fn parse_record_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.date_naive());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts.date());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(ts.date());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

pub struct DetailView {
    pub title: String,
    pub key: String,
    data: Arc<Dataset>,
    range: DateRange,
    // None while a typed range is applied
    preset: Option<DatePreset>,
    prompt: Option<RangePrompt>,
    page: usize,
}

impl DetailView {
    pub fn new(title: &str, key: &str, data: Arc<Dataset>) -> Self {
        Self {
            title: title.to_string(),
            key: key.to_string(),
            data,
            range: DateRange::default(),
            preset: Some(DatePreset::AllTime),
            prompt: None,
            page: 1,
        }
    }

    /// Swaps in a refreshed dataset. The page resets only when the data
    /// actually changed.
    pub fn set_data(&mut self, data: Arc<Dataset>) {
        if !Arc::ptr_eq(&self.data, &data) {
            self.data = data;
            self.page = 1;
        }
    }

    pub fn supports_date_filter(&self) -> bool {
        matches!(*self.data, Dataset::Maintenance(_))
    }

    pub fn set_range(&mut self, range: DateRange) {
        if self.range != range {
            self.range = range;
            self.page = 1;
        }
    }

    pub fn cycle_preset(&mut self, today: NaiveDate) {
        if !self.supports_date_filter() {
            return;
        }
        let preset = self.preset.map_or(DatePreset::AllTime, DatePreset::next);
        self.preset = Some(preset);
        self.set_range(preset.range(today));
    }

    pub fn preset(&self) -> Option<DatePreset> {
        self.preset
    }

    pub fn clear_range(&mut self) {
        self.preset = Some(DatePreset::AllTime);
        self.prompt = None;
        self.set_range(DateRange::default());
    }

    pub fn range_label(&self) -> String {
        match self.preset {
            Some(preset) => preset.label().to_string(),
            None => {
                let side = |d: Option<NaiveDate>| d.map_or_else(|| "...".to_string(), |d| d.format("%Y-%m-%d").to_string());
                format!("{} to {}", side(self.range.start), side(self.range.end))
            }
        }
    }

    /// Opens the typed range entry, prefilled with the active range.
    pub fn begin_range_entry(&mut self) {
        if self.supports_date_filter() {
            self.prompt = Some(RangePrompt::from_range(self.range));
        }
    }

    pub fn range_prompt(&self) -> Option<&RangePrompt> {
        self.prompt.as_ref()
    }

    pub fn range_prompt_mut(&mut self) -> Option<&mut RangePrompt> {
        self.prompt.as_mut()
    }

    pub fn cancel_range_entry(&mut self) {
        self.prompt = None;
    }

    /// Applies the typed range. Invalid input keeps the prompt open with an
    /// error and leaves the current range alone.
    pub fn submit_range_entry(&mut self) -> Result<(), String> {
        let Some(mut prompt) = self.prompt.take() else {
            return Ok(());
        };
        match prompt.parse() {
            Ok(range) if range.is_empty() => {
                self.clear_range();
                Ok(())
            }
            Ok(range) => {
                self.preset = None;
                self.set_range(range);
                Ok(())
            }
            Err(error) => {
                prompt.error = Some(error.clone());
                self.prompt = Some(prompt);
                Err(error)
            }
        }
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn total_len(&self) -> usize {
        self.data.count()
    }

    pub fn filtered_len(&self) -> usize {
        match &*self.data {
            Dataset::Maintenance(r) => r.items.iter().filter(|t| self.keeps(t)).count(),
            other => other.count(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.filtered_len().div_ceil(ROWS_PER_PAGE).max(1)
    }

    pub fn next_page(&mut self) {
        if self.page < self.page_count() {
            self.page += 1;
        }
    }

    pub fn prev_page(&mut self) {
        if self.page > 1 {
            self.page -= 1;
        }
    }

    pub fn headers(&self) -> &'static [&'static str] {
        match &*self.data {
            Dataset::Machines(_) => &["MACHINE", "MAKE / MODEL", "TYPE", "STATUS", "OWNERSHIP", "AMC", "WARRANTY", "UNIT", "LOCATION"],
            Dataset::Maintenance(_) => &["ID", "MACHINE", "STATUS", "CATEGORY", "DATE", "ASSIGNED TO", "LOCATION"],
            Dataset::SpareParts(_) => &["ITEM NO", "DESCRIPTION", "AVAILABLE", "CRITICAL", "STATUS", "UNIT"],
            Dataset::Equipment(_) => &["EQUIPMENT", "TYPE", "MAKE / MODEL", "SERIAL", "STATUS", "UNIT"],
            Dataset::Units(_) => &["UNIT ID", "NAME"],
        }
    }

    /// Rows of the current page, already formatted for display.
    pub fn page_rows(&self) -> Vec<Vec<String>> {
        let skip = (self.page - 1) * ROWS_PER_PAGE;
        match &*self.data {
            Dataset::Machines(r) => paged(r.items.iter(), skip).map(machine_row).collect(),
            Dataset::Maintenance(r) => paged(r.items.iter().filter(|t| self.keeps(t)), skip)
                .map(maintenance_row)
                .collect(),
            Dataset::SpareParts(r) => paged(r.items.iter(), skip).map(spare_part_row).collect(),
            Dataset::Equipment(r) => paged(r.items.iter(), skip).map(equipment_row).collect(),
            Dataset::Units(r) => paged(r.items.iter(), skip).map(unit_row).collect(),
        }
    }

    pub fn summary(&self) -> String {
        let shown = self.page_rows().len();
        let filtered = self.filtered_len();
        let total = self.total_len();
        let mut text = format!("Showing {} of {} records", shown, filtered);
        if filtered != total {
            text.push_str(&format!(" (filtered from {})", total));
        }
        text
    }

    /// Undated tickets stay visible; a date that cannot be read hides the
    /// ticket while a range is active.
    fn keeps(&self, ticket: &Maintenance) -> bool {
        if self.range.is_empty() {
            return true;
        }
        match ticket.maintenance_date.as_deref() {
            None => true,
            Some(raw) => parse_record_date(raw).is_some_and(|d| self.range.contains(d)),
        }
    }
}

fn paged<'a, T: 'a>(items: impl Iterator<Item = &'a T>, skip: usize) -> impl Iterator<Item = &'a T> {
    items.skip(skip).take(ROWS_PER_PAGE)
}

fn text(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or("-").to_string()
}

fn make_model(make: Option<&str>, model: Option<&str>) -> String {
    match (make, model) {
        (Some(make), Some(model)) => format!("{} {}", make, model),
        (Some(one), None) | (None, Some(one)) => one.to_string(),
        (None, None) => "-".to_string(),
    }
}

fn qty(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{}", v))
}

fn machine_row(m: &Machine) -> Vec<String> {
    vec![
        m.machine_id.clone(),
        make_model(m.make.as_deref(), m.model.as_deref()),
        text(m.machine_type.as_ref().map(|t| t.machine_type.as_str())),
        text(m.status.as_deref()),
        text(m.ownership.as_deref()),
        text(m.has_amc.as_deref()),
        text(m.has_warranty.as_deref()),
        unit_label(m.unit.as_ref().map(|u| (u.unit_id.as_str(), u.unit_name.as_deref()))),
        text(m.machine_location.as_ref().and_then(|l| l.line.as_deref())),
    ]
}

fn maintenance_row(t: &Maintenance) -> Vec<String> {
    let date = t
        .maintenance_date
        .as_deref()
        .map(|raw| parse_record_date(raw).map_or_else(|| raw.to_string(), |d| d.format("%Y-%m-%d").to_string()));
    vec![
        t.id.to_string(),
        text(t.broken_machine.as_ref().map(|m| m.machine_id.as_str())),
        text(t.status.as_deref()),
        text(t.breakdown_category.as_deref()),
        text(date.as_deref()),
        text(t.assigned_to.as_ref().and_then(|a| a.username.as_deref())),
        text(t.location.as_ref().map(|l| l.location_id.as_str())),
    ]
}

fn spare_part_row(s: &SparePart) -> Vec<String> {
    vec![
        text(s.item_no.as_deref()),
        text(s.item.as_ref().and_then(|i| i.spares_description.as_deref())),
        qty(s.available_qty),
        qty(s.critical_qty),
        text(s.status.as_deref()),
        unit_label(s.unit.as_ref().map(|u| (u.unit_id.as_str(), u.unit_name.as_deref()))),
    ]
}

fn equipment_row(e: &Equipment) -> Vec<String> {
    vec![
        e.equipment_id.clone(),
        text(e.equipment_type.as_ref().map(|t| t.equipment_type.as_str())),
        make_model(e.make.as_deref(), e.model.as_deref()),
        text(e.mcs_sl_no.as_deref()),
        text(e.status.as_deref()),
        unit_label(e.unit.as_ref().map(|u| (u.unit_id.as_str(), u.unit_name.as_deref()))),
    ]
}

fn unit_row(u: &Unit) -> Vec<String> {
    vec![u.unit_id.clone(), u.unit_name.clone()]
}

fn unit_label(unit: Option<(&str, Option<&str>)>) -> String {
    match unit {
        Some((_, Some(name))) => name.to_string(),
        Some((id, None)) => id.to_string(),
        None => "-".to_string(),
    }
}
