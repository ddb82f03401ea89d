//! Month summary figures and their display formatting.
use shared::{DerivedMonth, InsightLine, MonthInsights, NamedAmount};

use crate::domain::derivation::effective_amount;

pub const UNCATEGORIZED: &str = "Uncategorized";
const EMPTY_VALUE: &str = "—";

/// Summarize a derived month
pub fn compute_insights(derived: &DerivedMonth) -> MonthInsights {
    let bill_count = derived.bills.len();
    let paid_count = derived.bills.iter().filter(|b| b.paid).count();

    // First maximum wins on ties
    let mut largest_bill: Option<NamedAmount> = None;
    for b in &derived.bills {
        let amount = effective_amount(&b.bill);
        if largest_bill.as_ref().map_or(true, |l| amount > l.amount) {
            largest_bill = Some(NamedAmount {
                name: b.bill.name.clone(),
                amount,
            });
        }
    }

    let mut by_category: Vec<NamedAmount> = Vec::new();
    for b in &derived.bills {
        let category = match b.bill.category.trim() {
            "" => UNCATEGORIZED,
            c => c,
        };
        let amount = effective_amount(&b.bill);
        match by_category.iter_mut().find(|c| c.name == category) {
            Some(entry) => entry.amount += amount,
            None => by_category.push(NamedAmount {
                name: category.to_string(),
                amount,
            }),
        }
    }
    let mut top_category: Option<NamedAmount> = None;
    for category in by_category {
        if top_category.as_ref().map_or(true, |t| category.amount > t.amount) {
            top_category = Some(category);
        }
    }

    let totals = derived.totals;
    let describe = |named: &Option<NamedAmount>| match named {
        Some(n) => format!("{} • {}", n.name, format_money(n.amount)),
        None => EMPTY_VALUE.to_string(),
    };
    let lines = vec![
        line("Bills paid", format!("{} / {}", paid_count, bill_count)),
        line("Remaining this month", format_money(totals.unpaid)),
        line("Largest bill", describe(&largest_bill)),
        line("Top category", describe(&top_category)),
        line(
            "Pre-15th vs Post-15th",
            format!("{} / {}", format_money(totals.pre), format_money(totals.post)),
        ),
        line(
            "Paid vs Unpaid",
            format!("{} / {}", format_money(totals.paid), format_money(totals.unpaid)),
        ),
    ];

    MonthInsights {
        bill_count,
        paid_count,
        unpaid_count: bill_count - paid_count,
        remaining: totals.unpaid,
        largest_bill,
        top_category,
        lines,
    }
}

fn line(label: &str, value: String) -> InsightLine {
    InsightLine {
        label: label.to_string(),
        value,
    }
}

/// Format a dollar amount: `$1,800`, `$12.50`. Cents are shown only when non-zero.
pub fn format_money(value: f64) -> String {
    if !value.is_finite() {
        return "$0".to_string();
    }
    let cents = (value * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let whole = group_thousands(cents / 100);
    match cents % 100 {
        0 => format!("{sign}${whole}"),
        frac => format!("{sign}${whole}.{frac:02}"),
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
