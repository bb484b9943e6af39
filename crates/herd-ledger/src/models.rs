//! Database rows and their conversion into domain types.
//!
//! Money is stored as decimal text so values survive SQLite untouched.

use anyhow::Result;
use chrono::NaiveDate;
use herd_core::{
    Field, FieldStockRecord, LivestockError, LivestockExpense, LivestockTransaction, StockSnapshot,
};
use rust_decimal::Decimal;
use std::str::FromStr;

pub(crate) const COUNTER_COLUMNS: &str =
    "cows, bulls, steers, young_steers, heifers, male_calves, female_calves";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FieldRow {
    pub id: i64,
    pub name: String,
    pub hectares: f64,
    pub photo: Option<String>,
    pub has_agriculture: bool,
    pub has_livestock: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub cows: i64,
    pub bulls: i64,
    pub steers: i64,
    pub young_steers: i64,
    pub heifers: i64,
    pub male_calves: i64,
    pub female_calves: i64,
}

impl FieldRow {
    pub fn stock(&self) -> StockSnapshot {
        StockSnapshot {
            cows: self.cows,
            bulls: self.bulls,
            steers: self.steers,
            young_steers: self.young_steers,
            heifers: self.heifers,
            male_calves: self.male_calves,
            female_calves: self.female_calves,
        }
    }
}

impl From<FieldRow> for Field {
    fn from(row: FieldRow) -> Self {
        let stock = row.stock();
        Field {
            id: row.id,
            name: row.name,
            hectares: row.hectares,
            photo: row.photo,
            has_agriculture: row.has_agriculture,
            has_livestock: row.has_livestock,
            latitude: row.latitude,
            longitude: row.longitude,
            stock,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StockRecordRow {
    pub id: i64,
    pub field_id: i64,
    pub date: String,
    pub cows: i64,
    pub bulls: i64,
    pub steers: i64,
    pub young_steers: i64,
    pub heifers: i64,
    pub male_calves: i64,
    pub female_calves: i64,
}

impl StockRecordRow {
    pub fn into_record(self) -> Result<FieldStockRecord> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|_| LivestockError::InvalidDate(self.date.clone()))?;
        Ok(FieldStockRecord {
            id: self.id,
            field_id: self.field_id,
            date,
            stock: StockSnapshot {
                cows: self.cows,
                bulls: self.bulls,
                steers: self.steers,
                young_steers: self.young_steers,
                heifers: self.heifers,
                male_calves: self.male_calves,
                female_calves: self.female_calves,
            },
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionRow {
    pub id: i64,
    pub action_type: String,
    pub category: String,
    pub quantity: i64,
    pub date: String,
    pub source_field_id: Option<i64>,
    pub target_field_id: Option<i64>,
    pub notes: Option<String>,
    pub price_per_unit: Option<String>,
    pub currency: Option<String>,
    pub exchange_rate: Option<String>,
    pub price_per_unit_usd: Option<String>,
    pub salvage_value: Option<String>,
    pub salvage_value_usd: Option<String>,
}

impl TransactionRow {
    pub fn into_transaction(self) -> Result<LivestockTransaction> {
        Ok(LivestockTransaction {
            id: self.id,
            action_type: self.action_type.parse()?,
            category: self.category.parse()?,
            quantity: u32::try_from(self.quantity)
                .map_err(|_| LivestockError::InvalidQuantity(self.quantity))?,
            date: self.date,
            source_field_id: self.source_field_id,
            target_field_id: self.target_field_id,
            notes: self.notes,
            price_per_unit: decimal(self.price_per_unit.as_deref()),
            currency: self.currency,
            exchange_rate: decimal(self.exchange_rate.as_deref()),
            price_per_unit_usd: decimal(self.price_per_unit_usd.as_deref()),
            salvage_value: decimal(self.salvage_value.as_deref()),
            salvage_value_usd: decimal(self.salvage_value_usd.as_deref()),
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExpenseRow {
    pub id: i64,
    pub name: String,
    pub field_id: Option<i64>,
    pub cost: String,
    pub currency: String,
    pub exchange_rate: Option<String>,
    pub cost_usd: Option<String>,
    pub note: Option<String>,
    pub date: String,
}

impl From<ExpenseRow> for LivestockExpense {
    fn from(row: ExpenseRow) -> Self {
        LivestockExpense {
            id: row.id,
            name: row.name,
            field_id: row.field_id,
            cost: decimal(Some(&row.cost)).unwrap_or_default(),
            currency: row.currency,
            exchange_rate: decimal(row.exchange_rate.as_deref()),
            cost_usd: decimal(row.cost_usd.as_deref()),
            note: row.note,
            date: row.date,
        }
    }
}

fn decimal(raw: Option<&str>) -> Option<Decimal> {
    let raw = raw?;
    match Decimal::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(value = raw, error = %e, "Ignoring malformed decimal column");
            None
        }
    }
}

pub(crate) fn decimal_text(value: Option<Decimal>) -> Option<String> {
    value.map(|v| v.to_string())
}
