//! Sparse per-month payment marks.
//!
//! A bill is explicitly paid for a month iff a record exists for the
//! `(bill id, month)` pair. Unmarking removes the record instead of storing
//! `paid: false`, so the map only ever grows with real payments.

use shared::{PaymentMap, PaymentRecord, YearMonth};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentLedger {
    records: PaymentMap,
}

impl PaymentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from a persisted map, dropping `paid: false` entries and empty bills
    pub fn from_map(mut records: PaymentMap) -> Self {
        for months in records.values_mut() {
            months.retain(|_, record| record.paid);
        }
        records.retain(|_, months| !months.is_empty());
        Self { records }
    }

    pub fn as_map(&self) -> &PaymentMap {
        &self.records
    }

    pub fn into_map(self) -> PaymentMap {
        self.records
    }

    pub fn is_paid(&self, bill_id: &str, month: YearMonth) -> bool {
        self.record(bill_id, month).is_some()
    }

    pub fn record(&self, bill_id: &str, month: YearMonth) -> Option<&PaymentRecord> {
        self.records.get(bill_id)?.get(&month)
    }

    /// Mark or unmark a bill as paid for a month
    pub fn set_paid(&mut self, bill_id: &str, month: YearMonth, paid: bool, paid_at: &str) {
        if paid {
            self.records.entry(bill_id.to_string()).or_default().insert(
                month,
                PaymentRecord {
                    paid: true,
                    paid_at: paid_at.to_string(),
                },
            );
        } else if let Some(months) = self.records.get_mut(bill_id) {
            months.remove(&month);
            if months.is_empty() {
                self.records.remove(bill_id);
            }
        }
    }

    /// Forget every record of a bill
    pub fn remove_bill(&mut self, bill_id: &str) -> bool {
        self.records.remove(bill_id).is_some()
    }

    /// Total number of (bill, month) records
    pub fn len(&self) -> usize {
        self.records.values().map(|months| months.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn march() -> YearMonth {
        YearMonth::new(2025, 3).unwrap()
    }

    #[test]
    fn test_set_and_clear_paid() {
        let mut ledger = PaymentLedger::new();
        ledger.set_paid("rent", march(), true, "2025-03-01T09:00:00.000Z");

        assert!(ledger.is_paid("rent", march()));
        assert!(!ledger.is_paid("rent", march().add_months(1)));
        assert_eq!(
            ledger.record("rent", march()).unwrap().paid_at,
            "2025-03-01T09:00:00.000Z"
        );

        ledger.set_paid("rent", march(), false, "ignored");
        assert!(!ledger.is_paid("rent", march()));
        assert!(ledger.is_empty(), "unmarking must not leave empty entries behind");
    }

    #[test]
    fn test_unmarking_unknown_bill_is_noop() {
        let mut ledger = PaymentLedger::new();
        ledger.set_paid("ghost", march(), false, "");
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_from_map_prunes_unpaid_records() {
        let mut map = PaymentMap::new();
        let months = map.entry("phone".to_string()).or_default();
        months.insert(march(), PaymentRecord { paid: false, paid_at: String::new() });
        months.insert(march().add_months(1), PaymentRecord { paid: true, paid_at: "x".into() });
        map.entry("empty".to_string()).or_default();

        let ledger = PaymentLedger::from_map(map);
        assert_eq!(ledger.len(), 1);
        assert!(!ledger.is_paid("phone", march()));
        assert!(ledger.is_paid("phone", march().add_months(1)));
        assert!(!ledger.as_map().contains_key("empty"));
    }

    #[test]
    fn test_remove_bill_drops_all_months() {
        let mut ledger = PaymentLedger::new();
        ledger.set_paid("car", march(), true, "a");
        ledger.set_paid("car", march().add_months(1), true, "b");
        ledger.set_paid("gym", march(), true, "c");

        assert!(ledger.remove_bill("car"));
        assert!(!ledger.remove_bill("car"));
        assert_eq!(ledger.len(), 1);
    }
}
