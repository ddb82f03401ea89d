//! Loading, exporting and importing the bill document.
//!
//! - **Load** is forgiving: a missing or corrupt local document falls back
//!   to a blank state, and missing collections are filled in.
//! - **Import** is strict: a document without a `bills` array is rejected
//!   and the current state is left untouched.
//! - **Export** writes bills and payments only; UI preferences stay local.

use serde_json::{Map, Value};
use shared::{Bill, BillDocument, BillFilter, SortKey, UiPreferences, YearMonth, DOCUMENT_VERSION};
use tracing::warn;

use crate::domain::bill_service::BillService;
use crate::domain::models::TrackerState;

/// Sample bills: (name, amount, due day, category, autopay, notes)
const DEMO_BILLS: [(&str, f64, u32, &str, bool, &str); 6] = [
    ("Rent", 1800.0, 1, "Housing", true, ""),
    ("Electric", 120.0, 7, "Utilities", false, "Varies"),
    ("Internet", 75.0, 10, "Utilities", true, ""),
    ("Car insurance", 160.0, 18, "Insurance", true, ""),
    ("Phone", 35.0, 23, "Utilities", true, "Visible"),
    ("Streaming", 28.0, 28, "Entertainment", false, ""),
];

/// Demo bills marked paid in the selected month when demo data is loaded
pub const DEMO_PAID_NAMES: [&str; 2] = ["rent", "internet"];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ImportError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Invalid JSON: document must be an object")]
    NotAnObject,
    #[error("Missing bills[]")]
    MissingBills,
    #[error("Invalid document: {0}")]
    InvalidShape(String),
}

#[derive(Debug, Clone, Default)]
pub struct DocumentService;

impl DocumentService {
    pub fn new() -> Self {
        Self
    }

    /// A fresh state for `current_month`
    pub fn blank_state(&self, current_month: YearMonth, now: &str) -> TrackerState {
        TrackerState::blank(UiPreferences::for_month(current_month), now)
    }

    /// Load a locally persisted document, repairing what can be repaired
    pub fn load_or_blank(&self, raw: Option<&str>, current_month: YearMonth, now: &str) -> TrackerState {
        let Some(raw) = raw else {
            return self.blank_state(current_month, now);
        };

        let mut root = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(root)) => root,
            Ok(_) => {
                warn!("Stored document is not an object, starting blank");
                return self.blank_state(current_month, now);
            }
            Err(e) => {
                warn!("Stored document is not valid JSON ({}), starting blank", e);
                return self.blank_state(current_month, now);
            }
        };

        if !root.get("bills").is_some_and(Value::is_array) {
            root.insert("bills".to_string(), Value::Array(Vec::new()));
        }
        repair_common_fields(&mut root, now);
        repair_ui(&mut root, current_month);

        match serde_json::from_value::<BillDocument>(Value::Object(root)) {
            Ok(document) => {
                TrackerState::from_document(document, UiPreferences::for_month(current_month))
            }
            Err(e) => {
                warn!("Stored document has an invalid shape ({}), starting blank", e);
                self.blank_state(current_month, now)
            }
        }
    }

    /// Serialize the state for local persistence, UI preferences included
    pub fn to_local_json(&self, state: &TrackerState) -> serde_json::Result<String> {
        serde_json::to_string(&state.to_document(true))
    }

    /// Pretty-printed export of bills and payments, stamped with `now`
    pub fn export_json(&self, state: &TrackerState, now: &str) -> serde_json::Result<String> {
        let mut document = state.to_document(false);
        document.updated_at = now.to_string();
        serde_json::to_string_pretty(&document)
    }

    /// Fresh copies of the sample bills, each with a new id
    pub fn demo_bills(&self, now: &str) -> Vec<Bill> {
        DEMO_BILLS
            .iter()
            .map(|&(name, amount, due_day, category, autopay, notes)| Bill {
                id: BillService::generate_id(),
                name: name.to_string(),
                amount,
                due_day,
                category: category.to_string(),
                autopay,
                notes: notes.to_string(),
                active: true,
                updated_at: now.to_string(),
            })
            .collect()
    }

    pub fn export_file_name(&self, month: YearMonth) -> String {
        format!("bill-tracker-export-{}.json", month)
    }

    /// Parse an exported document into a new state that keeps `current_ui`
    pub fn import_json(
        &self,
        json_text: &str,
        current_ui: &UiPreferences,
        now: &str,
    ) -> Result<TrackerState, ImportError> {
        let value: Value =
            serde_json::from_str(json_text).map_err(|e| ImportError::InvalidJson(e.to_string()))?;
        let Value::Object(mut root) = value else {
            return Err(ImportError::NotAnObject);
        };
        if !root.get("bills").is_some_and(Value::is_array) {
            return Err(ImportError::MissingBills);
        }

        root.remove("ui");
        repair_common_fields(&mut root, now);

        let document: BillDocument = serde_json::from_value(Value::Object(root))
            .map_err(|e| ImportError::InvalidShape(e.to_string()))?;

        let mut state = TrackerState::from_document(document, current_ui.clone());
        state.version = DOCUMENT_VERSION;
        state.updated_at = now.to_string();
        Ok(state)
    }
}

fn repair_common_fields(root: &mut Map<String, Value>, now: &str) {
    if !root.get("payments").is_some_and(Value::is_object) {
        root.insert("payments".to_string(), Value::Object(Map::new()));
    }
    if !root.get("version").is_some_and(Value::is_u64) {
        root.insert("version".to_string(), Value::from(DOCUMENT_VERSION));
    }
    for key in ["createdAt", "updatedAt"] {
        if !root.get(key).is_some_and(Value::is_string) {
            root.insert(key.to_string(), Value::from(now));
        }
    }
}

fn repair_ui(root: &mut Map<String, Value>, current_month: YearMonth) {
    let defaults = UiPreferences::for_month(current_month);
    let ui = match root.get("ui") {
        Some(ui @ Value::Object(_)) => {
            let mut ui = ui.clone();
            let month_ok = ui
                .get("month")
                .and_then(Value::as_str)
                .is_some_and(|m| m.parse::<YearMonth>().is_ok());
            if !month_ok {
                ui["month"] = Value::from(current_month.to_string());
            }
            if !ui.get("onboardingDismissed").is_some_and(Value::is_boolean) {
                ui["onboardingDismissed"] = Value::Bool(false);
            }
            // Unknown filter/sort names fall back to the defaults
            let filter_ok = ui
                .get("filter")
                .map_or(true, |v| serde_json::from_value::<BillFilter>(v.clone()).is_ok());
            if !filter_ok {
                ui["filter"] = serde_json::to_value(defaults.filter).unwrap_or(Value::Null);
            }
            let sort_ok = ui
                .get("sort")
                .map_or(true, |v| serde_json::from_value::<SortKey>(v.clone()).is_ok());
            if !sort_ok {
                ui["sort"] = serde_json::to_value(defaults.sort).unwrap_or(Value::Null);
            }
            if !ui.get("search").map_or(true, Value::is_string) {
                ui["search"] = Value::from("");
            }
            ui
        }
        _ => serde_json::to_value(&defaults).unwrap_or(Value::Null),
    };
    root.insert("ui".to_string(), ui);
}
