//! Search, filter and sort for derived bill lists.
//!
//! The order is fixed: text search first, then the categorical filter, then a
//! stable sort. Equal keys keep their incoming order.

use shared::{BillFilter, DerivedBill, SortKey, ViewConfig};
use std::cmp::Ordering;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::domain::derivation::effective_amount;

pub fn apply_filter_sort_search(bills: &[DerivedBill], config: &ViewConfig) -> Vec<DerivedBill> {
    let query = config.search.trim().to_lowercase();

    let mut out: Vec<DerivedBill> = bills
        .iter()
        .filter(|b| matches_search(b, &query))
        .filter(|b| matches_filter(b, config.filter))
        .cloned()
        .collect();

    out.sort_by(|a, b| compare(a, b, config.sort));
    out
}

/// Case-insensitive substring match on name, category and notes. An empty query matches everything.
fn matches_search(bill: &DerivedBill, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    [&bill.bill.name, &bill.bill.category, &bill.bill.notes]
        .iter()
        .any(|field| field.to_lowercase().contains(query))
}

fn matches_filter(bill: &DerivedBill, filter: BillFilter) -> bool {
    match filter {
        BillFilter::All => true,
        BillFilter::Paid => bill.paid,
        BillFilter::Unpaid => !bill.paid,
        BillFilter::Autopay => bill.bill.autopay,
    }
}

fn compare(a: &DerivedBill, b: &DerivedBill, sort: SortKey) -> Ordering {
    match sort {
        SortKey::AmountDesc => effective_amount(&b.bill).total_cmp(&effective_amount(&a.bill)),
        SortKey::AmountAsc => effective_amount(&a.bill).total_cmp(&effective_amount(&b.bill)),
        SortKey::NameAsc => compare_names(&a.bill.name, &b.bill.name),
        SortKey::DueDay => a.bill.due_day.cmp(&b.bill.due_day),
    }
}

/// Name ordering that ignores case and accents ("Électricité" sorts with "electricite")
fn compare_names(a: &str, b: &str) -> Ordering {
    sort_key(a).cmp(sort_key(b))
}

fn sort_key(name: &str) -> impl Iterator<Item = char> + '_ {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Bill, DueStatus};

    fn derived(name: &str, amount: f64, due_day: u32, paid: bool, autopay: bool) -> DerivedBill {
        DerivedBill {
            bill: Bill {
                id: format!("id_{name}"),
                name: name.to_string(),
                amount,
                due_day,
                category: String::new(),
                autopay,
                notes: String::new(),
                active: true,
                updated_at: String::new(),
            },
            paid,
            paid_manual: paid,
            paid_auto: false,
            due_status: DueStatus::None,
            due_in_days: None,
            due_day_effective: due_day,
        }
    }

    fn names(bills: &[DerivedBill]) -> Vec<&str> {
        bills.iter().map(|b| b.bill.name.as_str()).collect()
    }

    fn config(filter: BillFilter, sort: SortKey, search: &str) -> ViewConfig {
        ViewConfig {
            filter,
            sort,
            search: search.to_string(),
        }
    }

    #[test]
    fn test_search_matches_single_bill_regardless_of_filter_and_sort() {
        let bills = vec![
            derived("Rent", 1800.0, 1, false, false),
            derived("Wifi", 75.0, 10, false, false),
        ];

        for sort in [SortKey::DueDay, SortKey::AmountAsc, SortKey::AmountDesc, SortKey::NameAsc] {
            for filter in [BillFilter::All, BillFilter::Unpaid] {
                let out = apply_filter_sort_search(&bills, &config(filter, sort, "wifi"));
                assert_eq!(names(&out), vec!["Wifi"]);
            }
        }
    }

    #[test]
    fn test_search_covers_category_and_notes() {
        let mut car = derived("Car", 160.0, 18, false, false);
        car.bill.category = "Insurance".to_string();
        let mut phone = derived("Phone", 35.0, 23, false, false);
        phone.bill.notes = "Family plan".to_string();
        let bills = vec![car, phone];

        let out = apply_filter_sort_search(&bills, &config(BillFilter::All, SortKey::DueDay, "  INSUR "));
        assert_eq!(names(&out), vec!["Car"]);

        let out = apply_filter_sort_search(&bills, &config(BillFilter::All, SortKey::DueDay, "family"));
        assert_eq!(names(&out), vec!["Phone"]);
    }

    #[test]
    fn test_filters() {
        let bills = vec![
            derived("A", 1.0, 1, true, false),
            derived("B", 2.0, 2, false, true),
            derived("C", 3.0, 3, false, false),
        ];

        let run = |filter| names(&apply_filter_sort_search(&bills, &config(filter, SortKey::DueDay, ""))).join(",");
        assert_eq!(run(BillFilter::All), "A,B,C");
        assert_eq!(run(BillFilter::Paid), "A");
        assert_eq!(run(BillFilter::Unpaid), "B,C");
        assert_eq!(run(BillFilter::Autopay), "B");
    }

    #[test]
    fn test_sorts() {
        let bills = vec![
            derived("streaming", 28.0, 28, false, false),
            derived("Electric", 120.0, 7, false, false),
            derived("rent", 1800.0, 1, false, false),
        ];

        let run = |sort| names(&apply_filter_sort_search(&bills, &config(BillFilter::All, sort, ""))).join(",");
        assert_eq!(run(SortKey::DueDay), "rent,Electric,streaming");
        assert_eq!(run(SortKey::AmountDesc), "rent,Electric,streaming");
        assert_eq!(run(SortKey::AmountAsc), "streaming,Electric,rent");
        assert_eq!(run(SortKey::NameAsc), "Electric,rent,streaming");
    }

    #[test]
    fn test_name_sort_ignores_accents() {
        let bills = vec![
            derived("zebra", 1.0, 1, false, false),
            derived("Électricité", 2.0, 2, false, false),
            derived("apple", 3.0, 3, false, false),
            derived("Eau", 4.0, 4, false, false),
        ];

        let out = apply_filter_sort_search(&bills, &config(BillFilter::All, SortKey::NameAsc, ""));
        assert_eq!(names(&out), vec!["apple", "Eau", "Électricité", "zebra"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let bills = vec![
            derived("First", 10.0, 5, false, false),
            derived("Second", 10.0, 5, false, false),
            derived("Third", 10.0, 5, false, false),
        ];

        for sort in [SortKey::DueDay, SortKey::AmountAsc, SortKey::AmountDesc] {
            let out = apply_filter_sort_search(&bills, &config(BillFilter::All, sort, ""));
            assert_eq!(names(&out), vec!["First", "Second", "Third"]);
        }
    }
}
