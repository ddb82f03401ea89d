pub mod payment_ledger;
pub mod tracker_state;

pub use payment_ledger::PaymentLedger;
pub use tracker_state::TrackerState;
