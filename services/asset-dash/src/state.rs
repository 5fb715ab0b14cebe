// services/asset-dash/src/state.rs
//
// Dashboard state management

use std::time::Instant;

use chrono::{DateTime, Local};

use svckit::types::Unit;

use crate::detail::DetailView;
use crate::poller::{PollEvent, Selection};

pub struct DashboardState {
    // Scope
    pub division_id: Option<String>,
    pub units: Vec<Unit>,
    unit_index: usize, // 0 = All Units

    // Tile cursor, flat index across all sections
    pub cursor: usize,
    pub tile_count: usize,

    pub detail: Option<DetailView>,

    // Counters for the header
    pub refreshes_ok: u64,
    pub refreshes_failed: u64,
    pub started_at: Instant,

    // Activity log
    pub activity_log: Vec<LogEntry>,
    pub errors_only: bool,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: String, // INFO, WARN, ERROR
    // Query key of the refresh that produced the entry
    pub key: Option<String>,
    pub message: String,
}

impl DashboardState {
    pub fn new(selection: &Selection, tile_count: usize) -> Self {
        let units = selection
            .unit_id
            .iter()
            .map(|id| Unit { unit_id: id.clone(), unit_name: id.clone() })
            .collect::<Vec<_>>();
        let unit_index = if units.is_empty() { 0 } else { 1 };

        Self {
            division_id: selection.division_id.clone(),
            units,
            unit_index,
            cursor: 0,
            tile_count,
            detail: None,
            refreshes_ok: 0,
            refreshes_failed: 0,
            started_at: Instant::now(),
            activity_log: Vec::new(),
            errors_only: false,
        }
    }

    pub fn selection(&self) -> Selection {
        Selection::new(self.division_id.clone(), self.selected_unit().map(|u| u.unit_id.clone()))
    }

    pub fn selected_unit(&self) -> Option<&Unit> {
        self.unit_index.checked_sub(1).and_then(|i| self.units.get(i))
    }

    pub fn unit_label(&self) -> String {
        match self.selected_unit() {
            Some(unit) => unit.unit_name.clone(),
            None => "All Units".to_string(),
        }
    }

    /// The selector only exists once a division is chosen.
    pub fn has_unit_selector(&self) -> bool {
        self.division_id.is_some()
    }

    /// Replaces the unit list of the division, keeping the selected unit when
    /// it is still present and falling back to All Units otherwise.
    pub fn set_units(&mut self, units: Vec<Unit>) {
        if units == self.units {
            return;
        }
        let selected = self.selected_unit().map(|u| u.unit_id.clone());
        self.units = units;
        self.unit_index = selected
            .and_then(|id| self.units.iter().position(|u| u.unit_id == id))
            .map_or(0, |i| i + 1);
    }

    /// Cycles through All Units and each unit. Returns true when the
    /// selection changed.
    pub fn next_unit(&mut self) -> bool {
        self.step_unit(1)
    }

    pub fn prev_unit(&mut self) -> bool {
        self.step_unit(self.units.len())
    }

    fn step_unit(&mut self, by: usize) -> bool {
        if !self.has_unit_selector() || self.units.is_empty() {
            return false;
        }
        let options = self.units.len() + 1;
        self.unit_index = (self.unit_index + by) % options;
        let label = self.unit_label();
        self.add_log("INFO", &format!("Showing {}", label));
        true
    }

    pub fn cursor_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    pub fn cursor_down(&mut self) {
        if self.cursor + 1 < self.tile_count {
            self.cursor += 1;
        }
    }

    pub fn record(&mut self, event: PollEvent) {
        match event {
            PollEvent::Refreshed { key, count } => {
                self.refreshes_ok += 1;
                if key.starts_with("units-") {
                    self.push_log("INFO", Some(key), format!("Loaded {} units", count));
                } else if self.detail.as_ref().is_some_and(|d| d.key == key) {
                    self.push_log("INFO", Some(key), format!("Refreshed, {} records", count));
                }
            }
            PollEvent::Failed { key, error } => {
                self.refreshes_failed += 1;
                self.push_log("ERROR", Some(key), error);
            }
        }
    }

    pub fn add_log(&mut self, level: &str, message: &str) {
        self.push_log(level, None, message.to_string());
    }

    fn push_log(&mut self, level: &str, key: Option<String>, message: String) {
        self.activity_log.push(LogEntry {
            timestamp: Local::now(),
            level: level.to_string(),
            key,
            message,
        });

        // Keep last 100 entries
        if self.activity_log.len() > 100 {
            self.activity_log.remove(0);
        }
    }

    pub fn toggle_errors_only(&mut self) {
        self.errors_only = !self.errors_only;
    }

    /// Log key the activity panel narrows to: the open detail's query.
    pub fn log_focus(&self) -> Option<&str> {
        self.detail.as_ref().map(|d| d.key.as_str())
    }

    /// Entries for the activity panel, newest first.
    pub fn visible_log(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        let focus = self.log_focus();
        self.activity_log.iter().rev().filter(move |entry| {
            focus.map_or(true, |key| entry.key.as_deref() == Some(key))
                && (!self.errors_only || entry.level == "ERROR")
        })
    }

    pub fn uptime_display(&self) -> String {
        let secs = self.started_at.elapsed().as_secs();
        format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use svckit::types::{AggregatedResult, Dataset};

    fn unit(id: &str) -> Unit {
        Unit { unit_id: id.to_string(), unit_name: format!("Unit {}", id) }
    }

    fn division(id: &str) -> Selection {
        Selection::new(Some(id.to_string()), None)
    }

    #[test]
    fn test_unit_cycle_wraps_through_all_units() {
        let mut state = DashboardState::new(&division("D1"), 39);
        state.set_units(vec![unit("U1"), unit("U2")]);
        assert_eq!(state.unit_label(), "All Units");

        assert!(state.next_unit());
        assert_eq!(state.selection().unit_id.as_deref(), Some("U1"));
        assert!(state.next_unit());
        assert_eq!(state.selection().unit_id.as_deref(), Some("U2"));
        assert!(state.next_unit());
        assert_eq!(state.selection().unit_id, None);

        assert!(state.prev_unit());
        assert_eq!(state.selection().unit_id.as_deref(), Some("U2"));
    }

    #[test]
    fn test_no_selector_without_division() {
        let mut state = DashboardState::new(&Selection::default(), 39);
        state.set_units(vec![unit("U1")]);
        assert!(!state.has_unit_selector());
        assert!(!state.next_unit());
        assert_eq!(state.selection(), Selection::default());
    }

    #[test]
    fn test_refreshed_units_keep_current_selection() {
        let mut state = DashboardState::new(&Selection::new(Some("D1".to_string()), Some("U2".to_string())), 39);
        assert_eq!(state.selection().unit_id.as_deref(), Some("U2"));

        state.set_units(vec![unit("U1"), unit("U2"), unit("U3")]);
        assert_eq!(state.selection().unit_id.as_deref(), Some("U2"));
        assert_eq!(state.unit_label(), "Unit U2");

        state.set_units(vec![unit("U1")]);
        assert_eq!(state.selection().unit_id, None);
    }

    #[test]
    fn test_cursor_stays_in_bounds() {
        let mut state = DashboardState::new(&Selection::default(), 2);
        state.cursor_up();
        assert_eq!(state.cursor, 0);
        state.cursor_down();
        state.cursor_down();
        assert_eq!(state.cursor, 1);
    }

    #[test]
    fn test_activity_log_keeps_last_100() {
        let mut state = DashboardState::new(&Selection::default(), 1);
        for i in 0..150 {
            state.add_log("INFO", &format!("entry {}", i));
        }
        assert_eq!(state.activity_log.len(), 100);
        assert_eq!(state.activity_log[0].message, "entry 50");
    }

    #[test]
    fn test_failed_refresh_is_logged() {
        let mut state = DashboardState::new(&Selection::default(), 1);
        state.record(PollEvent::Failed { key: "spares-total-none-all".to_string(), error: "HTTP 502".to_string() });
        state.record(PollEvent::Refreshed { key: "spares-critical-none-all".to_string(), count: 4 });

        assert_eq!(state.refreshes_failed, 1);
        assert_eq!(state.refreshes_ok, 1);
        assert_eq!(state.activity_log.len(), 1);
        assert_eq!(state.activity_log[0].level, "ERROR");
        assert_eq!(state.activity_log[0].key.as_deref(), Some("spares-total-none-all"));
        assert_eq!(state.activity_log[0].message, "HTTP 502");
    }

    #[test]
    fn test_visible_log_follows_open_detail_and_error_toggle() {
        let mut state = DashboardState::new(&division("D1"), 39);
        state.add_log("INFO", "Dashboard started in DEMO mode");
        state.record(PollEvent::Failed { key: "machines-total-D1-all".to_string(), error: "HTTP 500".to_string() });
        state.record(PollEvent::Failed { key: "spares-total-D1-all".to_string(), error: "timeout".to_string() });
        state.record(PollEvent::Refreshed { key: "units-D1".to_string(), count: 3 });

        let messages = |state: &DashboardState| state.visible_log().map(|e| e.message.clone()).collect::<Vec<_>>();
        assert_eq!(messages(&state), vec!["Loaded 3 units", "timeout", "HTTP 500", "Dashboard started in DEMO mode"]);

        state.toggle_errors_only();
        assert_eq!(messages(&state), vec!["timeout", "HTTP 500"]);
        state.toggle_errors_only();

        let data = Arc::new(Dataset::Units(AggregatedResult::from_items(vec![])));
        state.detail = Some(DetailView::new("Total Machines", "machines-total-D1-all", data));
        state.record(PollEvent::Refreshed { key: "machines-total-D1-all".to_string(), count: 12 });
        state.record(PollEvent::Refreshed { key: "machines-idle-D1-all".to_string(), count: 2 });
        assert_eq!(state.log_focus(), Some("machines-total-D1-all"));
        assert_eq!(messages(&state), vec!["Refreshed, 12 records", "HTTP 500"]);
    }
}
