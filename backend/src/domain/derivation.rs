//! Per-month bill status derivation.
//!
//! Turns the stored bills and payment marks into what a month actually looks
//! like: which bills are paid (explicitly or through autopay), how close the
//! unpaid ones are to their due date, and the aggregate totals for the
//! pre/post mid-month sections.
//!
//! Autopay and due-proximity only apply when the viewed month is the month
//! containing `today`. Past and future months show explicit marks only.

use chrono::{Datelike, NaiveDate};
use shared::{Bill, DerivedBill, DerivedMonth, DueStatus, MonthTotals, YearMonth, MID_MONTH_DAY};

use crate::domain::models::{PaymentLedger, TrackerState};

/// Unpaid bills due within this many days are flagged as due soon
pub const DUE_SOON_WINDOW_DAYS: i64 = 7;

/// Derive every active bill's status for `month` as seen on `today`
pub fn derive_month(state: &TrackerState, month: YearMonth, today: NaiveDate) -> DerivedMonth {
    let reference_day = (YearMonth::from_date(today) == month).then_some(today);

    let bills: Vec<DerivedBill> = state
        .active_bills()
        .map(|bill| derive_bill(bill, &state.payments, month, reference_day))
        .collect();

    let (pre, post): (Vec<DerivedBill>, Vec<DerivedBill>) = bills
        .iter()
        .cloned()
        .partition(|b| b.bill.due_day <= MID_MONTH_DAY);

    let totals = MonthTotals {
        all: sum_amounts(bills.iter()),
        paid: sum_amounts(bills.iter().filter(|b| b.paid)),
        unpaid: sum_amounts(bills.iter().filter(|b| !b.paid)),
        pre: sum_amounts(pre.iter()),
        post: sum_amounts(post.iter()),
    };

    DerivedMonth {
        month,
        bills,
        pre,
        post,
        totals,
    }
}

/// Status of one bill. `today` is only given when `month` is the current month.
fn derive_bill(
    bill: &Bill,
    payments: &PaymentLedger,
    month: YearMonth,
    today: Option<NaiveDate>,
) -> DerivedBill {
    let due_day_effective = month.clamp_day(bill.due_day);
    let paid_manual = payments.is_paid(&bill.id, month);
    let paid_auto = !paid_manual
        && bill.autopay
        && today.is_some_and(|t| t.day() >= due_day_effective);
    let paid = paid_manual || paid_auto;

    let (due_status, due_in_days) = match today {
        Some(today) if !paid => {
            let in_days = days_until(month.date_for_day(bill.due_day), today);
            (classify_due(in_days), Some(in_days))
        }
        _ => (DueStatus::None, None),
    };

    DerivedBill {
        bill: bill.clone(),
        paid,
        paid_manual,
        paid_auto,
        due_status,
        due_in_days,
        due_day_effective,
    }
}

/// Whole calendar days from `today` to `due`; negative when `due` has passed
pub fn days_until(due: NaiveDate, today: NaiveDate) -> i64 {
    due.signed_duration_since(today).num_days()
}

pub fn classify_due(in_days: i64) -> DueStatus {
    match in_days {
        d if d < 0 => DueStatus::Overdue,
        0 => DueStatus::Today,
        d if d <= DUE_SOON_WINDOW_DAYS => DueStatus::Soon,
        _ => DueStatus::None,
    }
}

/// Amount of a bill for summing; corrupt (non-finite) amounts count as zero
pub fn effective_amount(bill: &Bill) -> f64 {
    if bill.amount.is_finite() {
        bill.amount
    } else {
        0.0
    }
}

pub fn sum_amounts<'a>(bills: impl Iterator<Item = &'a DerivedBill>) -> f64 {
    bills.map(|b| effective_amount(&b.bill)).sum()
}
