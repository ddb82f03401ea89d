//! Bill form validation and normalization.
//!
//! Raw form input is checked and cleaned here before a [`Bill`] ever enters
//! the tracker state. Rejected input never produces a partial record.

use shared::{Bill, BillForm};
use uuid::Uuid;

pub const MAX_NAME_LENGTH: usize = 60;
pub const MAX_CATEGORY_LENGTH: usize = 40;
pub const MAX_NOTES_LENGTH: usize = 220;
pub const MIN_DUE_DAY: u32 = 1;
pub const MAX_DUE_DAY: u32 = 31;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BillValidationError {
    #[error("Name is required")]
    MissingName,
    #[error("Amount must be valid")]
    InvalidAmount(String),
    #[error("Due day must be between 1 and 31")]
    DueDayOutOfRange(String),
}

#[derive(Debug, Clone, Default)]
pub struct BillService;

impl BillService {
    pub fn new() -> Self {
        Self
    }

    /// Generate a fresh bill id
    pub fn generate_id() -> String {
        format!("bill_{}", Uuid::new_v4().simple())
    }

    /// Validate a bill form and turn it into an active bill stamped with `now`
    pub fn normalize_bill_form(&self, form: &BillForm, now: &str) -> Result<Bill, BillValidationError> {
        let name = truncate_chars(form.name.trim(), MAX_NAME_LENGTH);
        if name.is_empty() {
            return Err(BillValidationError::MissingName);
        }

        let amount = self.clean_and_parse_amount(&form.amount)?;
        let due_day = self.parse_due_day(&form.due_day)?;

        let id = match form.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Self::generate_id(),
        };

        Ok(Bill {
            id,
            name,
            amount,
            due_day,
            category: truncate_chars(form.category.trim(), MAX_CATEGORY_LENGTH),
            autopay: form.autopay,
            notes: truncate_chars(form.notes.trim(), MAX_NOTES_LENGTH),
            active: true,
            updated_at: now.to_string(),
        })
    }

    /// Parse an amount field. Currency symbols and thousands separators are
    /// ignored; an empty field means zero.
    pub fn clean_and_parse_amount(&self, amount_input: &str) -> Result<f64, BillValidationError> {
        let cleaned: String = amount_input
            .trim()
            .chars()
            .filter(|c| !matches!(c, '$' | ',' | ' '))
            .collect();

        if cleaned.is_empty() {
            return Ok(0.0);
        }

        let amount: f64 = cleaned
            .parse()
            .map_err(|_| BillValidationError::InvalidAmount(amount_input.to_string()))?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(BillValidationError::InvalidAmount(amount_input.to_string()));
        }
        Ok(amount)
    }

    pub fn parse_due_day(&self, due_day_input: &str) -> Result<u32, BillValidationError> {
        due_day_input
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|day| (MIN_DUE_DAY..=MAX_DUE_DAY).contains(day))
            .ok_or_else(|| BillValidationError::DueDayOutOfRange(due_day_input.to_string()))
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect::<String>().trim_end().to_string()
}
