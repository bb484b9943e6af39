use crate::db::HerdDb;
use crate::models::{decimal_text, FieldRow, TransactionRow, COUNTER_COLUMNS};
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use herd_core::{
    field_deltas, finance::BASE_CURRENCY, finance::PESO_CURRENCY, parse_date, to_usd, validate,
    Category,
    FieldDelta, LivestockError, LivestockTransaction, StockSnapshot, TransactionDraft,
};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;

/// Records livestock transactions and keeps field counters in step.
///
/// Every mutation runs in one database transaction: the counters, the
/// stock records and the transaction row change together or not at all.
pub struct TransactionLedger {
    db: HerdDb,
}

#[derive(Debug, Default)]
struct Pricing {
    price_per_unit: Option<Decimal>,
    currency: Option<String>,
    exchange_rate: Option<Decimal>,
    price_per_unit_usd: Option<Decimal>,
    salvage_value: Option<Decimal>,
    salvage_value_usd: Option<Decimal>,
}

impl Pricing {
    /// Normalise the draft's prices to USD. Salvage is only kept alongside a
    /// unit price.
    fn from_draft(draft: &TransactionDraft) -> Result<Self> {
        let Some(price) = draft.price_per_unit else {
            return Ok(Self::default());
        };

        let currency = draft
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(BASE_CURRENCY)
            .to_uppercase();
        let is_peso = currency == PESO_CURRENCY;

        let price_per_unit_usd = to_usd(price, &currency, draft.exchange_rate)?;
        let salvage_value_usd = draft
            .salvage_value
            .map(|salvage| to_usd(salvage, &currency, draft.exchange_rate))
            .transpose()?;

        Ok(Self {
            price_per_unit: Some(price),
            exchange_rate: if is_peso { draft.exchange_rate } else { None },
            currency: Some(currency),
            price_per_unit_usd: Some(price_per_unit_usd),
            salvage_value: draft.salvage_value,
            salvage_value_usd,
        })
    }
}

impl TransactionLedger {
    pub fn new(db: HerdDb) -> Self {
        Self { db }
    }

    /// Validate and record a transaction, applying its effect to the
    /// referenced fields. Only livestock fields can be referenced.
    pub async fn create(&self, draft: TransactionDraft) -> Result<LivestockTransaction> {
        validate(&draft)?;
        let today = Utc::now().date_naive();
        let date = resolve_date(&draft, today)?;
        let pricing = Pricing::from_draft(&draft)?;

        let mut tx = self.db.pool().begin().await?;

        for field_id in [draft.source_field_id, draft.target_field_id]
            .into_iter()
            .flatten()
        {
            if !load_field(&mut tx, field_id).await?.has_livestock {
                return Err(LivestockError::NotLivestockField(field_id).into());
            }
        }

        let deltas = field_deltas(
            draft.action_type,
            draft.quantity,
            draft.source_field_id,
            draft.target_field_id,
        );
        apply_deltas(&mut tx, draft.category, &deltas).await?;
        record_stock(&mut tx, &deltas, today).await?;

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO livestock_transactions
            (action_type, category, quantity, date, source_field_id, target_field_id, notes,
             price_per_unit, currency, exchange_rate, price_per_unit_usd, salvage_value, salvage_value_usd)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(draft.action_type.as_str())
        .bind(draft.category.as_str())
        .bind(draft.quantity)
        .bind(date.format("%Y-%m-%d").to_string())
        .bind(draft.source_field_id)
        .bind(draft.target_field_id)
        .bind(&draft.notes)
        .bind(decimal_text(pricing.price_per_unit))
        .bind(&pricing.currency)
        .bind(decimal_text(pricing.exchange_rate))
        .bind(decimal_text(pricing.price_per_unit_usd))
        .bind(decimal_text(pricing.salvage_value))
        .bind(decimal_text(pricing.salvage_value_usd))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            transaction_id = id,
            action = %draft.action_type,
            category = %draft.category,
            quantity = draft.quantity,
            "Livestock transaction recorded"
        );

        self.get(id)
            .await?
            .ok_or_else(|| LivestockError::TransactionNotFound(id).into())
    }

    /// Get all transactions, most recent first
    pub async fn list(&self) -> Result<Vec<LivestockTransaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM livestock_transactions ORDER BY date DESC, id DESC",
        )
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(TransactionRow::into_transaction).collect()
    }

    /// Get the transactions that moved animals on or off a field
    pub async fn list_for_field(&self, field_id: i64) -> Result<Vec<LivestockTransaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT * FROM livestock_transactions
            WHERE source_field_id = ? OR target_field_id = ?
            ORDER BY date DESC, id DESC
            "#,
        )
        .bind(field_id)
        .bind(field_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(TransactionRow::into_transaction).collect()
    }

    /// Get transaction by ID
    pub async fn get(&self, id: i64) -> Result<Option<LivestockTransaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM livestock_transactions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(TransactionRow::into_transaction).transpose()
    }

    /// Correct a transaction's quantity, category, date, notes or prices.
    ///
    /// The stored effect is reverted and the corrected one applied. The
    /// action type and the source/target fields are kept as recorded; to
    /// change those, delete and record again. A draft without a date keeps
    /// the stored one.
    pub async fn update(&self, id: i64, draft: TransactionDraft) -> Result<LivestockTransaction> {
        if draft.quantity == 0 {
            return Err(LivestockError::InvalidQuantity(0).into());
        }
        let today = Utc::now().date_naive();
        let requested_date = match draft.date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                parse_date(raw).ok_or_else(|| LivestockError::InvalidDate(raw.to_string()))?,
            ),
        };

        let mut tx = self.db.pool().begin().await?;
        let existing = load_transaction(&mut tx, id).await?;

        if draft.action_type != existing.action_type {
            tracing::warn!(
                transaction_id = id,
                stored = %existing.action_type,
                requested = %draft.action_type,
                "Action type cannot be changed on update; keeping stored value"
            );
        }

        let reverted: Vec<FieldDelta> = field_deltas(
            existing.action_type,
            existing.quantity,
            existing.source_field_id,
            existing.target_field_id,
        )
        .into_iter()
        .map(FieldDelta::inverted)
        .collect();
        apply_deltas(&mut tx, existing.category, &reverted).await?;

        let applied = field_deltas(
            existing.action_type,
            draft.quantity,
            existing.source_field_id,
            existing.target_field_id,
        );
        apply_deltas(&mut tx, draft.category, &applied).await?;
        record_stock(&mut tx, &applied, today).await?;

        let date = match requested_date {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None => existing.date.clone(),
        };

        sqlx::query(
            r#"
            UPDATE livestock_transactions
            SET quantity = ?, date = ?, notes = ?, category = ?
            WHERE id = ?
            "#,
        )
        .bind(draft.quantity)
        .bind(&date)
        .bind(&draft.notes)
        .bind(draft.category.as_str())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if draft.price_per_unit.is_some() {
            let pricing = Pricing::from_draft(&draft)?;
            sqlx::query(
                r#"
                UPDATE livestock_transactions
                SET price_per_unit = ?, currency = ?, exchange_rate = ?, price_per_unit_usd = ?,
                    salvage_value = ?, salvage_value_usd = ?
                WHERE id = ?
                "#,
            )
            .bind(decimal_text(pricing.price_per_unit))
            .bind(&pricing.currency)
            .bind(decimal_text(pricing.exchange_rate))
            .bind(decimal_text(pricing.price_per_unit_usd))
            .bind(decimal_text(pricing.salvage_value))
            .bind(decimal_text(pricing.salvage_value_usd))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(transaction_id = id, "Livestock transaction updated");

        self.get(id)
            .await?
            .ok_or_else(|| LivestockError::TransactionNotFound(id).into())
    }

    /// Revert a transaction's effect and remove it
    pub async fn delete(&self, id: i64) -> Result<()> {
        let today = Utc::now().date_naive();
        let mut tx = self.db.pool().begin().await?;
        let existing = load_transaction(&mut tx, id).await?;

        let reverted: Vec<FieldDelta> = field_deltas(
            existing.action_type,
            existing.quantity,
            existing.source_field_id,
            existing.target_field_id,
        )
        .into_iter()
        .map(FieldDelta::inverted)
        .collect();
        apply_deltas(&mut tx, existing.category, &reverted).await?;
        record_stock(&mut tx, &reverted, today).await?;

        sqlx::query("DELETE FROM livestock_transactions WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(transaction_id = id, "Livestock transaction deleted");

        Ok(())
    }
}

fn resolve_date(draft: &TransactionDraft, today: NaiveDate) -> Result<NaiveDate> {
    draft.resolved_date(today).ok_or_else(|| {
        LivestockError::InvalidDate(draft.date.clone().unwrap_or_default()).into()
    })
}

async fn load_field(conn: &mut SqliteConnection, field_id: i64) -> Result<FieldRow> {
    sqlx::query_as::<_, FieldRow>("SELECT * FROM fields WHERE id = ?")
        .bind(field_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| LivestockError::FieldNotFound(field_id).into())
}

async fn load_transaction(conn: &mut SqliteConnection, id: i64) -> Result<LivestockTransaction> {
    sqlx::query_as::<_, TransactionRow>("SELECT * FROM livestock_transactions WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(LivestockError::TransactionNotFound(id))?
        .into_transaction()
}

/// Apply signed changes to one category's counters. Every touched field
/// must hold livestock and no counter may drop below zero.
async fn apply_deltas(
    conn: &mut SqliteConnection,
    category: Category,
    deltas: &[FieldDelta],
) -> Result<()> {
    for delta in deltas {
        let field = load_field(conn, delta.field_id).await?;
        if !field.has_livestock {
            return Err(LivestockError::NotLivestockField(field.id).into());
        }

        let mut stock = field.stock();
        let available = stock.get(category);
        let next = available
            .checked_add(delta.delta)
            .ok_or_else(|| LivestockError::StockOverflow {
                field: field.name.clone(),
                category,
            })?;

        if next < 0 {
            return Err(LivestockError::InsufficientStock {
                field: field.name,
                category,
                available,
                requested: -delta.delta,
            }
            .into());
        }

        stock.set(category, next);
        write_counters(conn, delta.field_id, &stock).await?;
    }

    Ok(())
}

async fn write_counters(conn: &mut SqliteConnection, field_id: i64, stock: &StockSnapshot) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE fields
        SET cows = ?, bulls = ?, steers = ?, young_steers = ?, heifers = ?,
            male_calves = ?, female_calves = ?
        WHERE id = ?
        "#,
    )
    .bind(stock.cows)
    .bind(stock.bulls)
    .bind(stock.steers)
    .bind(stock.young_steers)
    .bind(stock.heifers)
    .bind(stock.male_calves)
    .bind(stock.female_calves)
    .bind(field_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Write a dated copy of each touched field's counters
async fn record_stock(conn: &mut SqliteConnection, deltas: &[FieldDelta], date: NaiveDate) -> Result<()> {
    let statement = format!(
        "INSERT INTO field_stock_records (field_id, date, {cols}) SELECT id, ?, {cols} FROM fields WHERE id = ?",
        cols = COUNTER_COLUMNS
    );

    let mut recorded: Vec<i64> = Vec::with_capacity(deltas.len());
    for delta in deltas {
        if recorded.contains(&delta.field_id) {
            continue;
        }
        sqlx::query(&statement)
            .bind(date.format("%Y-%m-%d").to_string())
            .bind(delta.field_id)
            .execute(&mut *conn)
            .await?;
        recorded.push(delta.field_id);
    }

    Ok(())
}
