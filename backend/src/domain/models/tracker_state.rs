//! The single application state a user owns: bills, payment marks and UI preferences.
use shared::{Bill, BillDocument, UiPreferences, DOCUMENT_VERSION};

use super::payment_ledger::PaymentLedger;

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerState {
    pub version: u32,
    /// Insertion order is kept; it is the fallback display order
    pub bills: Vec<Bill>,
    pub payments: PaymentLedger,
    pub ui: UiPreferences,
    pub created_at: String,
    pub updated_at: String,
}

impl TrackerState {
    /// An empty state stamped with `now`
    pub fn blank(ui: UiPreferences, now: &str) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            bills: Vec::new(),
            payments: PaymentLedger::new(),
            ui,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    pub fn active_bills(&self) -> impl Iterator<Item = &Bill> {
        self.bills.iter().filter(|b| b.active)
    }

    pub fn find_bill(&self, bill_id: &str) -> Option<&Bill> {
        self.bills.iter().find(|b| b.id == bill_id)
    }

    pub fn bill_index(&self, bill_id: &str) -> Option<usize> {
        self.bills.iter().position(|b| b.id == bill_id)
    }

    /// Build a state from a document, using `fallback_ui` when the document carries none
    pub fn from_document(document: BillDocument, fallback_ui: UiPreferences) -> Self {
        Self {
            version: document.version,
            bills: document.bills,
            payments: PaymentLedger::from_map(document.payments),
            ui: document.ui.unwrap_or(fallback_ui),
            created_at: document.created_at,
            updated_at: document.updated_at,
        }
    }

    /// Persisted form; exports leave out the UI preferences
    pub fn to_document(&self, include_ui: bool) -> BillDocument {
        BillDocument {
            version: self.version,
            bills: self.bills.clone(),
            payments: self.payments.as_map().clone(),
            ui: include_ui.then(|| self.ui.clone()),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}
