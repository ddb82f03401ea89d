//! # Bill Tracker Controller
//!
//! `BillTracker` owns the single [`TrackerState`] a user works with and is the
//! only place it changes. Every mutation runs against a copy, the copy is
//! persisted through the [`DocumentStore`], and only then does it replace the
//! in-memory state. A failed save leaves the tracker exactly as it was.
//!
//! Views (month view, insights, exports) are computed on demand from the
//! current state and the injected clock.
//!
//! A tracker backed by a JSON file on disk:
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use bill_tracker_backend::domain::{BillTracker, SystemClock, TrackerError};
//! use bill_tracker_backend::storage::FileDocumentStore;
//! use shared::BillForm;
//!
//! # fn main() -> Result<(), TrackerError> {
//! let store = FileDocumentStore::in_directory(Path::new("data"));
//! let mut tracker = BillTracker::open(Arc::new(store), Arc::new(SystemClock))?;
//!
//! let rent = tracker.save_bill(&BillForm {
//!     name: "Rent".to_string(),
//!     amount: "1800".to_string(),
//!     due_day: "1".to_string(),
//!     ..Default::default()
//! })?;
//! let month = tracker.state().ui.month;
//! tracker.set_paid(&rent.id, month, true)?;
//! # Ok(())
//! # }
//! ```

use shared::{
    Bill, BillFilter, BillForm, MonthView, SectionView, SortKey, DerivedBill, ViewConfig, YearMonth,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::bill_service::{BillService, BillValidationError};
use crate::domain::calendar_export::{CalendarExportError, CalendarExportService};
use crate::domain::clock::SharedClock;
use crate::domain::derivation::{derive_month, sum_amounts};
use crate::domain::document_service::{DocumentService, ImportError, DEMO_PAID_NAMES};
use crate::domain::insights::compute_insights;
use crate::domain::models::TrackerState;
use crate::domain::view_pipeline::apply_filter_sort_search;
use crate::storage::DocumentStore;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error(transparent)]
    Validation(#[from] BillValidationError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error("Bill not found: {0}")]
    UnknownBill(String),
    #[error("Bill {0} is paid by autopay this month")]
    AutoPaid(String),
    #[error("Invalid month: {0}")]
    InvalidMonth(String),
    #[error("Storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<CalendarExportError> for TrackerError {
    fn from(e: CalendarExportError) -> Self {
        match e {
            CalendarExportError::InvalidMonth(month) => TrackerError::InvalidMonth(month),
        }
    }
}

/// A generated file: suggested name plus contents
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub file_name: String,
    pub contents: String,
}

pub struct BillTracker {
    store: Arc<dyn DocumentStore>,
    clock: SharedClock,
    state: TrackerState,
    bill_service: BillService,
    document_service: DocumentService,
    calendar_service: CalendarExportService,
}

impl BillTracker {
    /// Load the persisted document (or start blank) from `store`
    pub fn open(store: Arc<dyn DocumentStore>, clock: SharedClock) -> Result<Self, TrackerError> {
        let document_service = DocumentService::new();
        let raw = store.load()?;
        let state = document_service.load_or_blank(
            raw.as_deref(),
            YearMonth::from_date(clock.today()),
            &clock.now_rfc3339(),
        );
        info!("Opened bill tracker with {} bills", state.bills.len());

        Ok(Self {
            store,
            clock,
            state,
            bill_service: BillService::new(),
            document_service,
            calendar_service: CalendarExportService::new(),
        })
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn current_month(&self) -> YearMonth {
        YearMonth::from_date(self.clock.today())
    }

    /// Month currently selected in the UI
    pub fn selected_month(&self) -> YearMonth {
        self.state.ui.month
    }

    /// Apply `mutate` to a copy of the state, persist it, then commit
    fn apply<T>(
        &mut self,
        mutate: impl FnOnce(&mut TrackerState, &str) -> Result<T, TrackerError>,
    ) -> Result<T, TrackerError> {
        let now = self.clock.now_rfc3339();
        let mut next = self.state.clone();
        let result = mutate(&mut next, &now)?;
        next.updated_at = now;

        self.persist(&next)?;
        self.state = next;
        Ok(result)
    }

    fn persist(&self, state: &TrackerState) -> Result<(), TrackerError> {
        let json = self
            .document_service
            .to_local_json(state)
            .map_err(|e| TrackerError::Storage(e.into()))?;
        self.store.save(&json).map_err(|e| {
            warn!("Failed to save bill document: {}", e);
            TrackerError::Storage(e)
        })
    }

    /// Add a bill from form input, or replace the bill with the form's id
    pub fn save_bill(&mut self, form: &BillForm) -> Result<Bill, TrackerError> {
        let now = self.clock.now_rfc3339();
        let bill = self.bill_service.normalize_bill_form(form, &now)?;

        self.apply(|state, _| {
            match state.bill_index(&bill.id) {
                Some(index) => state.bills[index] = bill.clone(),
                None => state.bills.insert(0, bill.clone()),
            }
            Ok(())
        })?;
        info!("Saved bill {} ({})", bill.id, bill.name);
        Ok(bill)
    }

    /// Hide a bill from every view while keeping it and its payment history
    pub fn archive_bill(&mut self, bill_id: &str) -> Result<(), TrackerError> {
        self.apply(|state, now| {
            let index = state
                .bill_index(bill_id)
                .ok_or_else(|| TrackerError::UnknownBill(bill_id.to_string()))?;
            let bill = &mut state.bills[index];
            bill.active = false;
            bill.updated_at = now.to_string();
            Ok(())
        })
    }

    /// Remove a bill and all of its payment records
    pub fn delete_bill(&mut self, bill_id: &str) -> Result<(), TrackerError> {
        self.apply(|state, _| {
            let index = state
                .bill_index(bill_id)
                .ok_or_else(|| TrackerError::UnknownBill(bill_id.to_string()))?;
            state.bills.remove(index);
            state.payments.remove_bill(bill_id);
            Ok(())
        })
    }

    pub fn set_paid(&mut self, bill_id: &str, month: YearMonth, paid: bool) -> Result<(), TrackerError> {
        self.apply(|state, now| {
            if state.find_bill(bill_id).is_none() {
                return Err(TrackerError::UnknownBill(bill_id.to_string()));
            }
            state.payments.set_paid(bill_id, month, paid, now);
            Ok(())
        })
    }

    /// Flip the explicit paid mark; returns the new value.
    ///
    /// Bills currently counted as paid through autopay have no mark to flip.
    pub fn toggle_paid(&mut self, bill_id: &str, month: YearMonth) -> Result<bool, TrackerError> {
        let today = self.clock.today();
        self.apply(|state, now| {
            if state.find_bill(bill_id).is_none() {
                return Err(TrackerError::UnknownBill(bill_id.to_string()));
            }
            let auto_paid = derive_month(state, month, today)
                .bills
                .iter()
                .any(|b| b.bill.id == bill_id && b.paid_auto);
            if auto_paid {
                return Err(TrackerError::AutoPaid(bill_id.to_string()));
            }

            let paid = !state.payments.is_paid(bill_id, month);
            state.payments.set_paid(bill_id, month, paid, now);
            Ok(paid)
        })
    }

    /// Select a month by `YYYY-MM`; anything else selects the current month
    pub fn set_month(&mut self, input: &str) -> Result<YearMonth, TrackerError> {
        let month: YearMonth = input.trim().parse().unwrap_or_else(|_| self.current_month());
        self.apply(|state, _| {
            state.ui.month = month;
            Ok(month)
        })
    }

    pub fn set_filter(&mut self, filter: BillFilter) -> Result<(), TrackerError> {
        self.apply(|state, _| {
            state.ui.filter = filter;
            Ok(())
        })
    }

    pub fn set_sort(&mut self, sort: SortKey) -> Result<(), TrackerError> {
        self.apply(|state, _| {
            state.ui.sort = sort;
            Ok(())
        })
    }

    pub fn set_search(&mut self, search: &str) -> Result<(), TrackerError> {
        self.apply(|state, _| {
            state.ui.search = search.to_string();
            Ok(())
        })
    }

    pub fn dismiss_onboarding(&mut self) -> Result<(), TrackerError> {
        self.apply(|state, _| {
            state.ui.onboarding_dismissed = true;
            Ok(())
        })
    }

    /// Replace all bills and payments with the sample set
    pub fn load_demo(&mut self) -> Result<(), TrackerError> {
        let bills = self.document_service.demo_bills(&self.clock.now_rfc3339());
        self.apply(|state, now| {
            let month = state.ui.month;
            state.bills = bills;
            state.payments = Default::default();
            let paid_ids: Vec<String> = state
                .bills
                .iter()
                .filter(|b| DEMO_PAID_NAMES.contains(&b.name.to_lowercase().as_str()))
                .map(|b| b.id.clone())
                .collect();
            for id in paid_ids {
                state.payments.set_paid(&id, month, true, now);
            }
            Ok(())
        })?;
        info!("Loaded demo data");
        Ok(())
    }

    /// Erase the persisted document and start over with a blank state
    pub fn reset(&mut self) -> Result<(), TrackerError> {
        self.store.wipe()?;
        self.state = self
            .document_service
            .blank_state(self.current_month(), &self.clock.now_rfc3339());
        info!("Reset bill tracker");
        Ok(())
    }

    /// Export bills and payments as a JSON file named after the selected month
    pub fn export(&self) -> Result<ExportFile, TrackerError> {
        let contents = self
            .document_service
            .export_json(&self.state, &self.clock.now_rfc3339())
            .map_err(|e| TrackerError::Storage(e.into()))?;
        Ok(ExportFile {
            file_name: self.document_service.export_file_name(self.state.ui.month),
            contents,
        })
    }

    /// Replace bills and payments with an exported document; UI preferences are kept
    pub fn import(&mut self, json_text: &str) -> Result<(), TrackerError> {
        let imported =
            self.document_service
                .import_json(json_text, &self.state.ui, &self.clock.now_rfc3339())?;
        let bill_count = imported.bills.len();
        self.apply(|state, _| {
            *state = imported;
            Ok(())
        })?;
        info!("Imported {} bills", bill_count);
        Ok(())
    }

    /// View of the selected month
    pub fn month_view(&self) -> MonthView {
        self.month_view_for(self.state.ui.month)
    }

    /// Sections filtered, sorted and searched with the saved preferences, plus insights
    pub fn month_view_for(&self, month: YearMonth) -> MonthView {
        let derived = derive_month(&self.state, month, self.clock.today());
        let config = self.state.ui.view_config();

        MonthView {
            month,
            pre: section(&derived.pre, &config),
            post: section(&derived.post, &config),
            totals: derived.totals,
            bill_count: derived.bills.len(),
            insights: compute_insights(&derived),
        }
    }

    /// ICS file with the active bills' due dates for `months` months from `start_month`
    pub fn calendar_export(&self, start_month: &str, months: u32) -> Result<ExportFile, TrackerError> {
        let start: YearMonth = start_month
            .parse()
            .map_err(|_| TrackerError::InvalidMonth(start_month.to_string()))?;
        let events = self.calendar_service.build_events(&self.state, start_month, months)?;

        Ok(ExportFile {
            file_name: self.calendar_service.file_name(start, months),
            contents: self.calendar_service.render_ics(&events, self.clock.now()),
        })
    }
}

fn section(bills: &[DerivedBill], config: &ViewConfig) -> SectionView {
    let bills = apply_filter_sort_search(bills, config);
    SectionView {
        count: bills.len(),
        total: sum_amounts(bills.iter()),
        bills,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use crate::storage::file_document_store::DOCUMENT_FILE_NAME;
    use crate::storage::{FileDocumentStore, InMemoryDocumentStore};

    fn form(name: &str, amount: &str, due_day: &str) -> BillForm {
        BillForm {
            name: name.to_string(),
            amount: amount.to_string(),
            due_day: due_day.to_string(),
            ..Default::default()
        }
    }

    fn may() -> YearMonth {
        YearMonth::new(2025, 5).unwrap()
    }

    fn setup_test() -> (BillTracker, InMemoryDocumentStore) {
        let store = InMemoryDocumentStore::new();
        let tracker = BillTracker::open(Arc::new(store.clone()), Arc::new(FixedClock::on_date(2025, 5, 12)))
            .expect("Failed to open tracker");
        (tracker, store)
    }

    fn reopen(store: &InMemoryDocumentStore) -> BillTracker {
        BillTracker::open(Arc::new(store.clone()), Arc::new(FixedClock::on_date(2025, 5, 12))).unwrap()
    }

    #[test]
    fn test_open_empty_store_is_blank() {
        let (tracker, store) = setup_test();
        assert!(tracker.state().bills.is_empty());
        assert_eq!(tracker.selected_month(), may());
        assert!(store.contents().is_none());
    }

    #[test]
    fn test_new_bills_are_prepended_and_persisted() {
        let (mut tracker, store) = setup_test();
        tracker.save_bill(&form("Rent", "$1,800", "1")).unwrap();
        let phone = tracker.save_bill(&form("Phone", "35", "23")).unwrap();

        let names: Vec<_> = tracker.state().bills.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Phone", "Rent"]);
        assert_eq!(tracker.state().bills[1].amount, 1800.0);

        let reloaded = reopen(&store);
        assert_eq!(reloaded.state().bills, tracker.state().bills);
        assert_eq!(reloaded.state().find_bill(&phone.id).unwrap().due_day, 23);
    }

    #[test]
    fn test_editing_replaces_in_place() {
        let (mut tracker, _) = setup_test();
        let rent = tracker.save_bill(&form("Rent", "1800", "1")).unwrap();
        tracker.save_bill(&form("Gym", "30", "20")).unwrap();

        let mut edit = form("Rent", "1850", "2");
        edit.id = Some(rent.id.clone());
        tracker.save_bill(&edit).unwrap();

        assert_eq!(tracker.state().bills.len(), 2);
        assert_eq!(tracker.state().bills[1].id, rent.id);
        assert_eq!(tracker.state().bills[1].amount, 1850.0);
    }

    #[test]
    fn test_invalid_form_creates_nothing() {
        let (mut tracker, store) = setup_test();

        let result = tracker.save_bill(&form("  ", "10", "1"));
        assert!(matches!(result, Err(TrackerError::Validation(BillValidationError::MissingName))));
        let result = tracker.save_bill(&form("Gym", "-5", "1"));
        assert!(matches!(result, Err(TrackerError::Validation(BillValidationError::InvalidAmount(_)))));
        let result = tracker.save_bill(&form("Gym", "5", "32"));
        assert!(matches!(result, Err(TrackerError::Validation(BillValidationError::DueDayOutOfRange(_)))));

        assert!(tracker.state().bills.is_empty());
        assert!(store.contents().is_none());
    }

    #[test]
    fn test_archive_keeps_bill_but_hides_it() {
        let (mut tracker, _) = setup_test();
        let rent = tracker.save_bill(&form("Rent", "1800", "1")).unwrap();
        tracker.set_paid(&rent.id, may(), true).unwrap();

        tracker.archive_bill(&rent.id).unwrap();

        assert!(!tracker.state().bills[0].active);
        assert!(tracker.state().payments.is_paid(&rent.id, may()));
        assert_eq!(tracker.month_view().bill_count, 0);
    }

    #[test]
    fn test_delete_purges_payments() {
        let (mut tracker, _) = setup_test();
        let rent = tracker.save_bill(&form("Rent", "1800", "1")).unwrap();
        tracker.set_paid(&rent.id, may(), true).unwrap();

        tracker.delete_bill(&rent.id).unwrap();

        assert!(tracker.state().bills.is_empty());
        assert!(tracker.state().payments.is_empty());
        assert!(matches!(tracker.delete_bill(&rent.id), Err(TrackerError::UnknownBill(_))));
    }

    #[test]
    fn test_toggle_paid() {
        let (mut tracker, _) = setup_test();
        let gym = tracker.save_bill(&form("Gym", "30", "20")).unwrap();

        assert!(tracker.toggle_paid(&gym.id, may()).unwrap());
        assert!(tracker.state().payments.is_paid(&gym.id, may()));
        assert!(!tracker.toggle_paid(&gym.id, may()).unwrap());
        assert!(tracker.state().payments.is_empty());
    }

    #[test]
    fn test_auto_paid_bill_cannot_be_toggled() {
        let (mut tracker, _) = setup_test();
        let mut internet = form("Internet", "75", "10");
        internet.autopay = true;
        let internet = tracker.save_bill(&internet).unwrap();

        let result = tracker.toggle_paid(&internet.id, may());
        assert!(matches!(result, Err(TrackerError::AutoPaid(_))));

        // Next month is not auto-paid yet, so it can be marked by hand
        let june = YearMonth::new(2025, 6).unwrap();
        assert!(tracker.toggle_paid(&internet.id, june).unwrap());
    }

    #[test]
    fn test_set_month_falls_back_to_current() {
        let (mut tracker, _) = setup_test();
        assert_eq!(tracker.set_month("2024-11").unwrap(), YearMonth::new(2024, 11).unwrap());
        assert_eq!(tracker.set_month("november").unwrap(), may());
        assert_eq!(tracker.selected_month(), may());
    }

    #[test]
    fn test_preferences_persist() {
        let (mut tracker, store) = setup_test();
        tracker.set_filter(BillFilter::Unpaid).unwrap();
        tracker.set_sort(SortKey::AmountDesc).unwrap();
        tracker.set_search("util").unwrap();
        tracker.dismiss_onboarding().unwrap();

        let ui = reopen(&store).state().ui.clone();
        assert_eq!(ui.filter, BillFilter::Unpaid);
        assert_eq!(ui.sort, SortKey::AmountDesc);
        assert_eq!(ui.search, "util");
        assert!(ui.onboarding_dismissed);
    }

    #[test]
    fn test_failed_save_leaves_state_unchanged() {
        let (mut tracker, store) = setup_test();
        tracker.save_bill(&form("Rent", "1800", "1")).unwrap();
        let before = tracker.state().clone();
        let persisted = store.contents();

        store.set_fail_saves(true);
        let result = tracker.save_bill(&form("Phone", "35", "23"));
        assert!(matches!(result, Err(TrackerError::Storage(_))));
        assert!(tracker.set_filter(BillFilter::Paid).is_err());

        assert_eq!(tracker.state(), &before);
        assert_eq!(store.contents(), persisted);
    }

    #[test]
    fn test_load_demo_marks_rent_and_internet_paid() {
        let (mut tracker, _) = setup_test();
        tracker.load_demo().unwrap();

        let state = tracker.state();
        assert_eq!(state.bills.len(), 6);
        let paid: Vec<_> = state
            .bills
            .iter()
            .filter(|b| state.payments.is_paid(&b.id, may()))
            .map(|b| b.name.as_str())
            .collect();
        assert_eq!(paid, vec!["Rent", "Internet"]);
    }

    #[test]
    fn test_month_view_sections_and_filtering() {
        let (mut tracker, _) = setup_test();
        tracker.load_demo().unwrap();

        let view = tracker.month_view();
        assert_eq!(view.bill_count, 6);
        assert_eq!(view.pre.count, 3);
        assert_eq!(view.post.count, 3);
        assert_eq!(view.totals.all, 2218.0);
        assert_eq!(view.insights.paid_count, 2);

        tracker.set_filter(BillFilter::Unpaid).unwrap();
        let view = tracker.month_view();
        assert_eq!(view.pre.count, 1);
        assert_eq!(view.pre.bills[0].bill.name, "Electric");
        assert_eq!(view.pre.total, 120.0);
        // Totals and insights ignore the list filter
        assert_eq!(view.totals.all, 2218.0);
        assert_eq!(view.insights.bill_count, 6);
    }

    #[test]
    fn test_reset_wipes_store() {
        let (mut tracker, store) = setup_test();
        tracker.load_demo().unwrap();
        tracker.set_month("2024-01").unwrap();

        tracker.reset().unwrap();

        assert!(tracker.state().bills.is_empty());
        assert_eq!(tracker.selected_month(), may());
        assert!(store.contents().is_none());
    }

    #[test]
    fn test_export_then_import_round_trip() {
        let (mut tracker, _) = setup_test();
        tracker.load_demo().unwrap();
        let exported = tracker.export().unwrap();
        assert_eq!(exported.file_name, "bill-tracker-export-2025-05.json");

        let (mut other, _) = setup_test();
        other.set_sort(SortKey::NameAsc).unwrap();
        other.import(&exported.contents).unwrap();

        assert_eq!(other.state().bills, tracker.state().bills);
        assert_eq!(other.state().payments, tracker.state().payments);
        assert_eq!(other.state().ui.sort, SortKey::NameAsc);
    }

    #[test]
    fn test_rejected_import_leaves_store_untouched() {
        let (mut tracker, store) = setup_test();
        tracker.save_bill(&form("Rent", "1800", "1")).unwrap();
        let before = tracker.state().clone();
        let persisted = store.contents();

        let result = tracker.import(r#"{"version": 2, "payments": {}}"#);
        assert!(matches!(result, Err(TrackerError::Import(ImportError::MissingBills))));
        assert_eq!(tracker.state(), &before);
        assert_eq!(store.contents(), persisted);
    }

    #[test]
    fn test_calendar_export() {
        let (mut tracker, _) = setup_test();
        tracker.save_bill(&form("Rent", "1800", "1")).unwrap();

        let file = tracker.calendar_export("2025-06", 3).unwrap();
        assert_eq!(file.file_name, "bill-tracker_2025-06_next_3_months.ics");
        assert_eq!(file.contents.matches("BEGIN:VEVENT").count(), 3);

        assert!(matches!(tracker.calendar_export("June", 1), Err(TrackerError::InvalidMonth(_))));
    }

    #[test]
    fn test_file_backed_tracker_survives_reopen() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let clock: SharedClock = Arc::new(FixedClock::on_date(2025, 5, 12));
        let open = || BillTracker::open(Arc::new(FileDocumentStore::in_directory(temp_dir.path())), clock.clone());

        let mut tracker = open().unwrap();
        let rent = tracker.save_bill(&form("Rent", "1800", "1")).unwrap();
        tracker.set_paid(&rent.id, may(), true).unwrap();
        assert!(temp_dir.path().join(DOCUMENT_FILE_NAME).exists());

        let reopened = open().unwrap();
        assert_eq!(reopened.state().bills, tracker.state().bills);
        assert!(reopened.state().payments.is_paid(&rent.id, may()));
    }
}
