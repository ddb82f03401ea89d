use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Current version of the persisted bill document format
pub const DOCUMENT_VERSION: u32 = 2;

/// Bills due on or before this day of the month belong to the "pre" section
pub const MID_MONTH_DAY: u32 = 15;

/// A calendar month, serialized as `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

/// Error returned when a string is not a valid `YYYY-MM` month
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseYearMonthError(pub String);

impl fmt::Display for ParseYearMonthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid month '{}', expected YYYY-MM", self.0)
    }
}

impl std::error::Error for ParseYearMonthError {}

impl YearMonth {
    /// Create a month from a year and a 1-based month number
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) && (0..=9999).contains(&year) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// The month containing the given date
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Number of days in this month
    pub fn days_in_month(&self) -> u32 {
        match self.month {
            2 => {
                if is_leap_year(self.year) {
                    29
                } else {
                    28
                }
            }
            4 | 6 | 9 | 11 => 30,
            _ => 31,
        }
    }

    /// Clamp a nominal day-of-month into this month (day 31 in April is the 30th)
    pub fn clamp_day(&self, day: u32) -> u32 {
        day.clamp(1, self.days_in_month())
    }

    /// The concrete date of a nominal day-of-month in this month
    pub fn date_for_day(&self, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, self.clamp_day(day))
            .unwrap_or(NaiveDate::MIN)
    }

    /// The month `count` months after this one
    pub fn add_months(&self, count: u32) -> Self {
        let index = self.year as i64 * 12 + (self.month as i64 - 1) + count as i64;
        Self {
            year: (index / 12) as i32,
            month: (index % 12) as u32 + 1,
        }
    }
}

fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ParseYearMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseYearMonthError(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != 7 || bytes[4] != b'-' {
            return Err(err());
        }
        let (year, month) = (&s[..4], &s[5..]);
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        YearMonth::new(year, month).ok_or_else(err)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

fn default_true() -> bool {
    true
}

fn default_due_day() -> u32 {
    1
}

/// A recurring monthly bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: String,
    /// Display name (1..60 characters)
    #[serde(default)]
    pub name: String,
    /// Non-negative amount due each month
    #[serde(default)]
    pub amount: f64,
    /// Nominal day of the month the bill is due (1..31)
    #[serde(default = "default_due_day")]
    pub due_day: u32,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub autopay: bool,
    #[serde(default)]
    pub notes: String,
    /// Inactive bills are kept in storage but excluded from every view
    #[serde(default = "default_true")]
    pub active: bool,
    /// RFC 3339 timestamp of the last edit
    #[serde(default)]
    pub updated_at: String,
}

/// An explicit "paid" mark for one bill in one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub paid: bool,
    /// RFC 3339 timestamp of when the bill was marked paid
    #[serde(default)]
    pub paid_at: String,
}

/// Payment records keyed by bill id, then by month
pub type PaymentMap = BTreeMap<String, BTreeMap<YearMonth, PaymentRecord>>;

/// Categorical filter applied to a bill list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BillFilter {
    #[default]
    All,
    Paid,
    Unpaid,
    Autopay,
}

/// Ordering applied to a bill list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    DueDay,
    AmountDesc,
    AmountAsc,
    NameAsc,
}

/// Persisted UI preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiPreferences {
    #[serde(default)]
    pub filter: BillFilter,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub search: String,
    pub month: YearMonth,
    #[serde(default)]
    pub onboarding_dismissed: bool,
}

impl UiPreferences {
    pub fn for_month(month: YearMonth) -> Self {
        Self {
            filter: BillFilter::All,
            sort: SortKey::DueDay,
            search: String::new(),
            month,
            onboarding_dismissed: false,
        }
    }

    pub fn view_config(&self) -> ViewConfig {
        ViewConfig {
            filter: self.filter,
            sort: self.sort,
            search: self.search.clone(),
        }
    }
}

/// The persisted bill document.
///
/// Local saves carry `ui`; exports omit it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillDocument {
    pub version: u32,
    pub bills: Vec<Bill>,
    #[serde(default)]
    pub payments: PaymentMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<UiPreferences>,
    pub created_at: String,
    pub updated_at: String,
}

/// Raw bill form input, as typed by the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillForm {
    /// Present when editing an existing bill
    pub id: Option<String>,
    pub name: String,
    pub amount: String,
    pub due_day: String,
    pub category: String,
    pub autopay: bool,
    pub notes: String,
}

/// Filter, sort and search settings for a bill list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    pub filter: BillFilter,
    pub sort: SortKey,
    pub search: String,
}

/// How close an unpaid bill is to its due date in the current month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DueStatus {
    #[default]
    None,
    Overdue,
    Today,
    Soon,
}

/// A bill together with its status for one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedBill {
    #[serde(flatten)]
    pub bill: Bill,
    pub paid: bool,
    pub paid_manual: bool,
    pub paid_auto: bool,
    pub due_status: DueStatus,
    /// Days until the due date; only set when viewing the current month unpaid
    pub due_in_days: Option<i64>,
    /// The due day clamped to the viewed month
    pub due_day_effective: u32,
}

/// Aggregate amounts for one month
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthTotals {
    pub all: f64,
    pub paid: f64,
    pub unpaid: f64,
    pub pre: f64,
    pub post: f64,
}

/// Every active bill's status for one month, split at mid-month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMonth {
    pub month: YearMonth,
    pub bills: Vec<DerivedBill>,
    pub pre: Vec<DerivedBill>,
    pub post: Vec<DerivedBill>,
    pub totals: MonthTotals,
}

/// A labelled amount, e.g. the largest bill or top category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedAmount {
    pub name: String,
    pub amount: f64,
}

/// A formatted insight line for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightLine {
    pub label: String,
    pub value: String,
}

/// Summary figures for one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthInsights {
    pub bill_count: usize,
    pub paid_count: usize,
    pub unpaid_count: usize,
    pub remaining: f64,
    pub largest_bill: Option<NamedAmount>,
    pub top_category: Option<NamedAmount>,
    pub lines: Vec<InsightLine>,
}

/// One section (pre or post mid-month) after filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionView {
    pub bills: Vec<DerivedBill>,
    pub count: usize,
    pub total: f64,
}

/// Everything needed to render one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthView {
    pub month: YearMonth,
    pub pre: SectionView,
    pub post: SectionView,
    pub totals: MonthTotals,
    pub bill_count: usize,
    pub insights: MonthInsights,
}

/// Revision token of a synced document (epoch milliseconds, strictly increasing per user)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(pub i64);

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Revision {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Revision)
    }
}

/// Response body for GET /api/state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateResponse {
    pub state: serde_json::Value,
    pub updated_at: Revision,
}

/// Response body for a successful PUT /api/state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PutStateResponse {
    pub ok: bool,
    pub updated_at: Revision,
}

/// Response body for a rejected PUT /api/state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictResponse {
    pub error: String,
    pub current_updated_at: Revision,
}

/// Generic error body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response body for GET /api/health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}
