use crate::db::HerdDb;
use crate::models::FieldRow;
use anyhow::Result;
use herd_core::{Field, FieldInput, LivestockError, StockSnapshot};

pub struct FieldRegistry {
    db: HerdDb,
}

impl FieldRegistry {
    pub fn new(db: HerdDb) -> Self {
        Self { db }
    }

    /// Register a new field with empty counters
    pub async fn create_field(&self, input: FieldInput) -> Result<Field> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO fields (name, hectares, photo, has_agriculture, has_livestock, latitude, longitude)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&input.name)
        .bind(input.hectares)
        .bind(&input.photo)
        .bind(input.has_agriculture)
        .bind(input.has_livestock)
        .bind(input.latitude)
        .bind(input.longitude)
        .fetch_one(self.db.pool())
        .await?;

        tracing::info!(field_id = id, name = %input.name, "Field created");

        self.get_field(id)
            .await?
            .ok_or_else(|| LivestockError::FieldNotFound(id).into())
    }

    /// Get a field by ID
    pub async fn get_field(&self, id: i64) -> Result<Option<Field>> {
        let row = sqlx::query_as::<_, FieldRow>("SELECT * FROM fields WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(Field::from))
    }

    /// Get all fields
    pub async fn list_fields(&self) -> Result<Vec<Field>> {
        let rows = sqlx::query_as::<_, FieldRow>("SELECT * FROM fields ORDER BY name, id")
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows.into_iter().map(Field::from).collect())
    }

    /// Update a field's descriptive data. Counters only change through the
    /// transaction ledger, and a field holding animals cannot stop being a
    /// livestock field.
    pub async fn update_field(&self, id: i64, input: FieldInput) -> Result<Field> {
        let mut tx = self.db.pool().begin().await?;

        let current = sqlx::query_as::<_, FieldRow>("SELECT * FROM fields WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LivestockError::FieldNotFound(id))?;

        let head = current.stock().total();
        if !input.has_livestock && head != 0 {
            return Err(LivestockError::FieldStillStocked { field: id, head }.into());
        }

        sqlx::query(
            r#"
            UPDATE fields
            SET name = ?, hectares = ?, photo = ?, has_agriculture = ?, has_livestock = ?,
                latitude = ?, longitude = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.name)
        .bind(input.hectares)
        .bind(&input.photo)
        .bind(input.has_agriculture)
        .bind(input.has_livestock)
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_field(id)
            .await?
            .ok_or_else(|| LivestockError::FieldNotFound(id).into())
    }

    /// Delete a field. A field still holding animals is refused; move or
    /// sell them first.
    pub async fn delete_field(&self, id: i64) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;

        let current = sqlx::query_as::<_, FieldRow>("SELECT * FROM fields WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LivestockError::FieldNotFound(id))?;

        let head = current.stock().total();
        if head != 0 {
            return Err(LivestockError::FieldStillStocked { field: id, head }.into());
        }

        sqlx::query("DELETE FROM fields WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(field_id = id, "Field deleted");
        Ok(())
    }

    /// Present-day head count: the counters of every livestock field summed
    pub async fn snapshot(&self) -> Result<StockSnapshot> {
        let totals: (i64, i64, i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(cows), 0), COALESCE(SUM(bulls), 0), COALESCE(SUM(steers), 0),
                   COALESCE(SUM(young_steers), 0), COALESCE(SUM(heifers), 0),
                   COALESCE(SUM(male_calves), 0), COALESCE(SUM(female_calves), 0)
            FROM fields
            WHERE has_livestock = 1
            "#,
        )
        .fetch_one(self.db.pool())
        .await?;

        Ok(StockSnapshot {
            cows: totals.0,
            bulls: totals.1,
            steers: totals.2,
            young_steers: totals.3,
            heifers: totals.4,
            male_calves: totals.5,
            female_calves: totals.6,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{pasture, setup_test_db};

    #[tokio::test]
    async fn test_create_and_get_field() {
        let registry = FieldRegistry::new(setup_test_db().await);

        let field = registry.create_field(pasture("La Loma")).await.unwrap();
        assert!(field.id > 0);
        assert_eq!(field.stock, StockSnapshot::default());

        let fetched = registry.get_field(field.id).await.unwrap();
        assert_eq!(fetched, Some(field));
        assert!(registry.get_field(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_and_delete_field() {
        let registry = FieldRegistry::new(setup_test_db().await);
        let field = registry.create_field(pasture("El Bajo")).await.unwrap();

        let mut input = pasture("El Bajo Grande");
        input.hectares = 150.0;
        let updated = registry.update_field(field.id, input).await.unwrap();
        assert_eq!(updated.name, "El Bajo Grande");
        assert_eq!(updated.hectares, 150.0);

        registry.delete_field(field.id).await.unwrap();
        assert!(registry.list_fields().await.unwrap().is_empty());

        let err = registry.delete_field(field.id).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<LivestockError>(),
            Some(&LivestockError::FieldNotFound(field.id))
        );
    }

    #[tokio::test]
    async fn test_stocked_field_keeps_livestock_flag() {
        let db = setup_test_db().await;
        let registry = FieldRegistry::new(db.clone());
        let field = registry.create_field(pasture("La Aguada")).await.unwrap();

        sqlx::query("UPDATE fields SET steers = 7 WHERE id = ?")
            .bind(field.id)
            .execute(db.pool())
            .await
            .unwrap();

        let mut crops = pasture("La Aguada");
        crops.has_livestock = false;
        let err = registry.update_field(field.id, crops.clone()).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<LivestockError>(),
            Some(&LivestockError::FieldStillStocked { field: field.id, head: 7 })
        );

        let err = registry.delete_field(field.id).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LivestockError>(),
            Some(LivestockError::FieldStillStocked { .. })
        ));

        let unchanged = registry.get_field(field.id).await.unwrap().unwrap();
        assert!(unchanged.has_livestock);
        assert_eq!(registry.snapshot().await.unwrap().steers, 7);

        sqlx::query("UPDATE fields SET steers = 0 WHERE id = ?")
            .bind(field.id)
            .execute(db.pool())
            .await
            .unwrap();
        let emptied = registry.update_field(field.id, crops).await.unwrap();
        assert!(!emptied.has_livestock);
    }

    #[tokio::test]
    async fn test_update_missing_field() {
        let registry = FieldRegistry::new(setup_test_db().await);
        let err = registry.update_field(77, pasture("Nada")).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<LivestockError>(),
            Some(&LivestockError::FieldNotFound(77))
        );
    }

    #[tokio::test]
    async fn test_snapshot_skips_non_livestock_fields() {
        let db = setup_test_db().await;
        let registry = FieldRegistry::new(db.clone());

        let grazing = registry.create_field(pasture("Potrero 1")).await.unwrap();
        let mut crops = pasture("Soja");
        crops.has_livestock = false;
        let crops = registry.create_field(crops).await.unwrap();

        sqlx::query("UPDATE fields SET cows = 12, heifers = 3 WHERE id = ?")
            .bind(grazing.id)
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("UPDATE fields SET cows = 100 WHERE id = ?")
            .bind(crops.id)
            .execute(db.pool())
            .await
            .unwrap();

        let snapshot = registry.snapshot().await.unwrap();
        assert_eq!(snapshot.cows, 12);
        assert_eq!(snapshot.heifers, 3);
        assert_eq!(snapshot.total(), 15);
    }

    #[tokio::test]
    async fn test_empty_snapshot() {
        let registry = FieldRegistry::new(setup_test_db().await);
        assert_eq!(registry.snapshot().await.unwrap(), StockSnapshot::default());
    }
}
