//! # Domain Module
//!
//! Business logic for the bill tracker.
//!
//! ## Key Responsibilities
//!
//! - **Models**: the tracker state and its sparse payment ledger
//! - **Bill Service**: validating and normalizing bill form input
//! - **Derivation**: per-month paid/autopay/due status and totals
//! - **View Pipeline**: search, filter and sort of derived bill lists
//! - **Insights**: month summary figures
//! - **Documents**: local load/repair, export, import and demo data
//! - **Calendar Export**: ICS events for bill due dates
//! - **Tracker**: the controller that owns and persists the state
//! - **Sync**: per-user document storage with revision checks
//!
//! Derivation, the view pipeline and insights are pure functions over an
//! explicit state and date. Time enters the domain only through [`Clock`].

pub mod bill_service;
pub mod calendar_export;
pub mod clock;
pub mod derivation;
pub mod document_service;
pub mod insights;
pub mod models;
pub mod sync_service;
pub mod tracker;
pub mod view_pipeline;

pub use bill_service::{BillService, BillValidationError};
pub use calendar_export::{CalendarEvent, CalendarExportError, CalendarExportService};
pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use derivation::derive_month;
pub use document_service::{DocumentService, ImportError};
pub use insights::{compute_insights, format_money};
pub use models::{PaymentLedger, TrackerState};
pub use sync_service::{SyncError, SyncService, SyncedDocument, UserIdentity};
pub use tracker::{BillTracker, ExportFile, TrackerError};
pub use view_pipeline::apply_filter_sort_search;
