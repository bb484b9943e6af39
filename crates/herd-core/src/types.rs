use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::LivestockError;

/// Stock-changing action recorded against the herd
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Birth,
    Death,
    Move,
    Sale,
    Purchase,
}

impl ActionType {
    pub const ALL: [ActionType; 5] = [
        ActionType::Birth,
        ActionType::Death,
        ActionType::Move,
        ActionType::Sale,
        ActionType::Purchase,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Birth => "BIRTH",
            ActionType::Death => "DEATH",
            ActionType::Move => "MOVE",
            ActionType::Sale => "SALE",
            ActionType::Purchase => "PURCHASE",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = LivestockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionType::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LivestockError::UnknownActionType(s.to_string()))
    }
}

/// Livestock classification by sex and age
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Cows,
    Bulls,
    Steers,
    YoungSteers,
    Heifers,
    MaleCalves,
    FemaleCalves,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Cows,
        Category::Bulls,
        Category::Steers,
        Category::YoungSteers,
        Category::Heifers,
        Category::MaleCalves,
        Category::FemaleCalves,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cows => "COWS",
            Category::Bulls => "BULLS",
            Category::Steers => "STEERS",
            Category::YoungSteers => "YOUNG_STEERS",
            Category::Heifers => "HEIFERS",
            Category::MaleCalves => "MALE_CALVES",
            Category::FemaleCalves => "FEMALE_CALVES",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = LivestockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LivestockError::UnknownCategory(s.to_string()))
    }
}

/// Head count per category.
///
/// Used both for a single field's counters and for the herd-wide snapshot
/// (the sum over all livestock fields). The snapshot is stored state, kept
/// as a running total by the ledger; it is never derived from the
/// transaction log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub cows: i64,
    pub bulls: i64,
    pub steers: i64,
    pub young_steers: i64,
    pub heifers: i64,
    pub male_calves: i64,
    pub female_calves: i64,
}

impl StockSnapshot {
    pub fn get(&self, category: Category) -> i64 {
        match category {
            Category::Cows => self.cows,
            Category::Bulls => self.bulls,
            Category::Steers => self.steers,
            Category::YoungSteers => self.young_steers,
            Category::Heifers => self.heifers,
            Category::MaleCalves => self.male_calves,
            Category::FemaleCalves => self.female_calves,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut i64 {
        match category {
            Category::Cows => &mut self.cows,
            Category::Bulls => &mut self.bulls,
            Category::Steers => &mut self.steers,
            Category::YoungSteers => &mut self.young_steers,
            Category::Heifers => &mut self.heifers,
            Category::MaleCalves => &mut self.male_calves,
            Category::FemaleCalves => &mut self.female_calves,
        }
    }

    pub fn set(&mut self, category: Category, value: i64) {
        *self.get_mut(category) = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, i64)> + '_ {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    /// Total head count across all categories
    pub fn total(&self) -> i64 {
        self.iter().map(|(_, v)| v).sum()
    }
}

impl std::ops::AddAssign<&StockSnapshot> for StockSnapshot {
    fn add_assign(&mut self, other: &StockSnapshot) {
        for (category, value) in other.iter() {
            *self.get_mut(category) += value;
        }
    }
}

impl FromIterator<(Category, i64)> for StockSnapshot {
    fn from_iter<I: IntoIterator<Item = (Category, i64)>>(iter: I) -> Self {
        let mut snapshot = StockSnapshot::default();
        for (category, value) in iter {
            *snapshot.get_mut(category) += value;
        }
        snapshot
    }
}

/// A recorded livestock transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivestockTransaction {
    pub id: i64,
    pub action_type: ActionType,
    pub category: Category,
    /// Head count moved; always at least one
    pub quantity: u32,
    /// Calendar date as stored; see [`parse_date`]
    pub date: String,
    pub source_field_id: Option<i64>,
    pub target_field_id: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,

    // Financial fields
    #[serde(default)]
    pub price_per_unit: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub exchange_rate: Option<Decimal>,
    #[serde(default)]
    pub price_per_unit_usd: Option<Decimal>,
    #[serde(default)]
    pub salvage_value: Option<Decimal>,
    #[serde(default)]
    pub salvage_value_usd: Option<Decimal>,
}

impl LivestockTransaction {
    /// Build a transaction with no financial data
    pub fn new(
        id: i64,
        action_type: ActionType,
        category: Category,
        quantity: u32,
        date: impl Into<String>,
    ) -> Self {
        Self {
            id,
            action_type,
            category,
            quantity,
            date: date.into(),
            source_field_id: None,
            target_field_id: None,
            notes: None,
            price_per_unit: None,
            currency: None,
            exchange_rate: None,
            price_per_unit_usd: None,
            salvage_value: None,
            salvage_value_usd: None,
        }
    }

    pub fn with_fields(mut self, source: Option<i64>, target: Option<i64>) -> Self {
        self.source_field_id = source;
        self.target_field_id = target;
        self
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }

    /// Total value in USD (unit price × quantity), if priced
    pub fn total_value_usd(&self) -> Option<Decimal> {
        self.price_per_unit_usd
            .map(|price| price * Decimal::from(self.quantity))
    }
}

/// Input for creating or updating a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub action_type: ActionType,
    pub category: Category,
    pub quantity: u32,
    #[serde(default)]
    pub source_field_id: Option<i64>,
    #[serde(default)]
    pub target_field_id: Option<i64>,
    /// Defaults to today when absent
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub price_per_unit: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub exchange_rate: Option<Decimal>,
    #[serde(default)]
    pub salvage_value: Option<Decimal>,
}

impl TransactionDraft {
    pub fn new(action_type: ActionType, category: Category, quantity: u32) -> Self {
        Self {
            action_type,
            category,
            quantity,
            source_field_id: None,
            target_field_id: None,
            date: None,
            notes: None,
            price_per_unit: None,
            currency: None,
            exchange_rate: None,
            salvage_value: None,
        }
    }

    pub fn source(mut self, field_id: i64) -> Self {
        self.source_field_id = Some(field_id);
        self
    }

    pub fn target(mut self, field_id: i64) -> Self {
        self.target_field_id = Some(field_id);
        self
    }

    pub fn on(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// The transaction date, falling back to `today` when none was given
    pub fn resolved_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self.date.as_deref().map(str::trim) {
            None | Some("") => Some(today),
            Some(raw) => parse_date(raw),
        }
    }
}

/// A farm field with its livestock counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: i64,
    pub name: String,
    pub hectares: f64,
    pub photo: Option<String>,
    pub has_agriculture: bool,
    pub has_livestock: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(flatten)]
    pub stock: StockSnapshot,
}

/// Input for creating or updating a field (counters excluded)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInput {
    pub name: String,
    pub hectares: f64,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub has_agriculture: bool,
    #[serde(default)]
    pub has_livestock: bool,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Dated copy of one field's counters, written whenever the ledger changes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldStockRecord {
    pub id: i64,
    pub field_id: i64,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub stock: StockSnapshot,
}

/// Herd-wide counters on a given date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedStock {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub stock: StockSnapshot,
}

/// General livestock expense (feed, vet, labour...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivestockExpense {
    pub id: i64,
    pub name: String,
    pub field_id: Option<i64>,
    pub cost: Decimal,
    pub currency: String,
    pub exchange_rate: Option<Decimal>,
    pub cost_usd: Option<Decimal>,
    pub note: Option<String>,
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseDraft {
    pub name: String,
    #[serde(default)]
    pub field_id: Option<i64>,
    pub cost: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub exchange_rate: Option<Decimal>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Parse a stored transaction date.
///
/// Accepts `YYYY-MM-DD`, a naive `YYYY-MM-DDTHH:MM:SS` timestamp, or an
/// RFC 3339 timestamp; the calendar date is kept. Returns `None` for
/// anything else.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}
