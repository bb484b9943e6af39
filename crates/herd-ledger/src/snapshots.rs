use crate::db::HerdDb;
use crate::models::StockRecordRow;
use anyhow::Result;
use herd_core::{aggregate_records, DatedStock, FieldStockRecord};

/// Read side of the dated stock records the ledger writes
pub struct StockRecords {
    db: HerdDb,
}

impl StockRecords {
    pub fn new(db: HerdDb) -> Self {
        Self { db }
    }

    /// Recorded counters of one field, oldest first
    pub async fn field_history(&self, field_id: i64) -> Result<Vec<FieldStockRecord>> {
        let rows = sqlx::query_as::<_, StockRecordRow>(
            "SELECT * FROM field_stock_records WHERE field_id = ? ORDER BY date ASC, id ASC",
        )
        .bind(field_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(StockRecordRow::into_record).collect()
    }

    pub async fn all_records(&self) -> Result<Vec<FieldStockRecord>> {
        let rows = sqlx::query_as::<_, StockRecordRow>(
            "SELECT * FROM field_stock_records ORDER BY date ASC, id ASC",
        )
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(StockRecordRow::into_record).collect()
    }

    /// Herd-wide totals per recorded date
    pub async fn global_history(&self) -> Result<Vec<DatedStock>> {
        let records = self.all_records().await?;
        Ok(aggregate_records(&records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldRegistry;
    use crate::test_support::{pasture, setup_test_db};

    async fn insert_record(db: &HerdDb, field_id: i64, date: &str, cows: i64) {
        sqlx::query("INSERT INTO field_stock_records (field_id, date, cows) VALUES (?, ?, ?)")
            .bind(field_id)
            .bind(date)
            .bind(cows)
            .execute(db.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_field_history_is_chronological() {
        let db = setup_test_db().await;
        let registry = FieldRegistry::new(db.clone());
        let field = registry.create_field(pasture("Potrero 2")).await.unwrap();

        insert_record(&db, field.id, "2024-02-01", 8).await;
        insert_record(&db, field.id, "2024-01-01", 5).await;

        let records = StockRecords::new(db).field_history(field.id).await.unwrap();
        let cows: Vec<i64> = records.iter().map(|r| r.stock.cows).collect();
        assert_eq!(cows, vec![5, 8]);
    }

    #[tokio::test]
    async fn test_global_history_carries_fields_forward() {
        let db = setup_test_db().await;
        let registry = FieldRegistry::new(db.clone());
        let a = registry.create_field(pasture("A")).await.unwrap();
        let b = registry.create_field(pasture("B")).await.unwrap();

        insert_record(&db, a.id, "2024-01-01", 10).await;
        insert_record(&db, b.id, "2024-01-05", 4).await;
        insert_record(&db, a.id, "2024-01-05", 7).await;
        insert_record(&db, a.id, "2024-01-05", 6).await;

        let history = StockRecords::new(db).global_history().await.unwrap();
        let totals: Vec<i64> = history.iter().map(|d| d.stock.cows).collect();
        assert_eq!(totals, vec![10, 10]);
    }

    #[tokio::test]
    async fn test_records_follow_field_deletion() {
        let db = setup_test_db().await;
        let registry = FieldRegistry::new(db.clone());
        let field = registry.create_field(pasture("Temporal")).await.unwrap();
        insert_record(&db, field.id, "2024-01-01", 3).await;

        registry.delete_field(field.id).await.unwrap();

        let records = StockRecords::new(db).all_records().await.unwrap();
        assert!(records.is_empty());
    }
}
