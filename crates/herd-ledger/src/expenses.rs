use crate::db::HerdDb;
use crate::models::{decimal_text, ExpenseRow};
use anyhow::Result;
use chrono::Utc;
use herd_core::{
    finance::BASE_CURRENCY, finance::PESO_CURRENCY, parse_date, to_usd, ExpenseDraft,
    LivestockError, LivestockExpense,
};
use rust_decimal::Decimal;

/// General livestock costs not tied to a head count change (feed, vet, etc.)
pub struct ExpenseLog {
    db: HerdDb,
}

impl ExpenseLog {
    pub fn new(db: HerdDb) -> Self {
        Self { db }
    }

    /// Record an expense, converting its cost to USD
    pub async fn create(&self, draft: ExpenseDraft) -> Result<LivestockExpense> {
        if draft.cost <= Decimal::ZERO {
            return Err(LivestockError::InvalidAmount(draft.cost.to_string()).into());
        }

        let date = match draft.date.as_deref().map(str::trim) {
            None | Some("") => Utc::now().date_naive(),
            Some(raw) => parse_date(raw).ok_or_else(|| LivestockError::InvalidDate(raw.to_string()))?,
        };

        let currency = draft
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(BASE_CURRENCY)
            .to_uppercase();
        let cost_usd = to_usd(draft.cost, &currency, draft.exchange_rate)?;
        let exchange_rate = if currency == PESO_CURRENCY {
            draft.exchange_rate
        } else {
            None
        };

        if let Some(field_id) = draft.field_id {
            let (found,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM fields WHERE id = ?")
                .bind(field_id)
                .fetch_one(self.db.pool())
                .await?;
            if found == 0 {
                return Err(LivestockError::FieldNotFound(field_id).into());
            }
        }

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO livestock_expenses (name, field_id, cost, currency, exchange_rate, cost_usd, note, date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&draft.name)
        .bind(draft.field_id)
        .bind(draft.cost.to_string())
        .bind(&currency)
        .bind(decimal_text(exchange_rate))
        .bind(decimal_text(Some(cost_usd)))
        .bind(&draft.note)
        .bind(date.format("%Y-%m-%d").to_string())
        .fetch_one(self.db.pool())
        .await?;

        tracing::info!(expense_id = id, name = %draft.name, cost_usd = %cost_usd, "Expense recorded");

        Ok(LivestockExpense {
            id,
            name: draft.name,
            field_id: draft.field_id,
            cost: draft.cost,
            currency,
            exchange_rate,
            cost_usd: Some(cost_usd),
            note: draft.note,
            date: date.format("%Y-%m-%d").to_string(),
        })
    }

    /// Get all expenses, most recent first
    pub async fn list(&self) -> Result<Vec<LivestockExpense>> {
        let rows = sqlx::query_as::<_, ExpenseRow>(
            "SELECT * FROM livestock_expenses ORDER BY date DESC, id DESC",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(LivestockExpense::from).collect())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM livestock_expenses WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(LivestockError::ExpenseNotFound(id).into());
        }

        tracing::info!(expense_id = id, "Expense deleted");
        Ok(())
    }
}
