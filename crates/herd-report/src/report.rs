use std::collections::BTreeMap;

use anyhow::Result;
use chrono::NaiveDate;
use herd_core::{
    reconstruct_category, reconstruct_field, summarize, Category, ChartPoint, FinancialSummary,
    LivestockError, Scope, StockHistory,
};
use herd_ledger::{ExpenseLog, FieldRegistry, HerdDb, TransactionLedger};
use serde::Serialize;

use crate::config::ReportConfig;

#[derive(Debug, Serialize)]
pub struct Report {
    pub generated_on: NaiveDate,
    pub scope: Scope,
    pub history: BTreeMap<Category, Vec<ChartPoint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finance: Option<FinancialSummary>,
}

/// Build the stock history (and optionally the finance summary) from the
/// ledger's current state. `today` stands in for the "now" point.
pub async fn build(db: &HerdDb, config: &ReportConfig, today: NaiveDate) -> Result<Report> {
    let categories: Vec<Category> = match config.category {
        Some(category) => vec![category],
        None => Category::ALL.to_vec(),
    };

    let fields = FieldRegistry::new(db.clone());
    let ledger = TransactionLedger::new(db.clone());

    let (scope, histories): (Scope, Vec<(Category, StockHistory)>) = match config.field_id {
        Some(field_id) => {
            let field = fields
                .get_field(field_id)
                .await?
                .ok_or(LivestockError::FieldNotFound(field_id))?;
            let transactions = ledger.list_for_field(field_id).await?;
            let histories = categories
                .iter()
                .map(|&category| (category, reconstruct_field(&field, category, &transactions)))
                .collect();
            (Scope::Field(field_id), histories)
        }
        None => {
            let snapshot = fields.snapshot().await?;
            let transactions = ledger.list().await?;
            let histories = categories
                .iter()
                .map(|&category| (category, reconstruct_category(&snapshot, category, &transactions)))
                .collect();
            (Scope::Global, histories)
        }
    };

    let points: usize = histories.iter().map(|(_, h)| h.len()).sum();
    tracing::info!(?scope, categories = histories.len(), points, "Stock history reconstructed");

    let history = histories
        .into_iter()
        .map(|(category, history)| (category, history.resolve(today)))
        .collect();

    let finance = if config.include_finance {
        let transactions = ledger.list().await?;
        let expenses = ExpenseLog::new(db.clone()).list().await?;
        Some(summarize(&transactions, &expenses))
    } else {
        None
    };

    Ok(Report {
        generated_on: today,
        scope,
        history,
        finance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use herd_core::{ActionType, FieldInput, TransactionDraft};
    use rust_decimal_macros::dec;

    fn config() -> ReportConfig {
        ReportConfig {
            database_url: "sqlite::memory:".to_string(),
            category: Some(Category::Cows),
            field_id: None,
            include_finance: false,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    async fn seeded() -> (HerdDb, i64, i64) {
        let db = HerdDb::new("sqlite::memory:").await.unwrap();
        let fields = FieldRegistry::new(db.clone());
        let mut ids = Vec::new();
        for name in ["Norte", "Sur"] {
            let field = fields
                .create_field(FieldInput {
                    name: name.to_string(),
                    hectares: 50.0,
                    photo: None,
                    has_agriculture: false,
                    has_livestock: true,
                    latitude: None,
                    longitude: None,
                })
                .await
                .unwrap();
            ids.push(field.id);
        }

        let ledger = TransactionLedger::new(db.clone());
        let mut purchase = TransactionDraft::new(ActionType::Purchase, Category::Cows, 10)
            .target(ids[0])
            .on("2024-01-10");
        purchase.price_per_unit = Some(dec!(500));
        ledger.create(purchase).await.unwrap();

        ledger
            .create(
                TransactionDraft::new(ActionType::Move, Category::Cows, 6)
                    .source(ids[0])
                    .target(ids[1])
                    .on("2024-02-01"),
            )
            .await
            .unwrap();

        let mut sale = TransactionDraft::new(ActionType::Sale, Category::Cows, 4)
            .source(ids[1])
            .on("2024-03-15");
        sale.price_per_unit = Some(dec!(700));
        ledger.create(sale).await.unwrap();

        (db, ids[0], ids[1])
    }

    #[tokio::test]
    async fn test_global_report() {
        let (db, _, _) = seeded().await;

        let report = build(&db, &config(), today()).await.unwrap();
        assert_eq!(report.scope, Scope::Global);
        assert!(report.finance.is_none());

        let cows = &report.history[&Category::Cows];
        let values: Vec<i64> = cows.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![0, 10, 6]);
        assert_eq!(cows[0].label, "Jan 10");
        assert!(cows[2].current);
        assert_eq!(cows[2].date, today());
    }

    #[tokio::test]
    async fn test_field_report_counts_moves() {
        let (db, _, south) = seeded().await;

        let mut config = config();
        config.field_id = Some(south);
        let report = build(&db, &config, today()).await.unwrap();

        assert_eq!(report.scope, Scope::Field(south));
        let values: Vec<i64> = report.history[&Category::Cows].iter().map(|p| p.value).collect();
        assert_eq!(values, vec![0, 6, 2]);
    }

    #[tokio::test]
    async fn test_all_categories_and_finance() {
        let (db, _, _) = seeded().await;

        let mut config = config();
        config.category = None;
        config.include_finance = true;
        let report = build(&db, &config, today()).await.unwrap();

        assert_eq!(report.history.len(), Category::ALL.len());
        assert_eq!(report.history[&Category::Bulls].len(), 1);

        let finance = report.finance.unwrap();
        assert_eq!(finance.income, dec!(2800));
        assert_eq!(finance.expenses, dec!(5000));
        assert_eq!(finance.months.len(), 2);

        let json = serde_json::to_value(&finance).unwrap();
        assert!(json.get("months").is_some());
    }

    #[tokio::test]
    async fn test_unknown_field_is_an_error() {
        let (db, _, _) = seeded().await;

        let mut config = config();
        config.field_id = Some(404);
        let err = build(&db, &config, today()).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<LivestockError>(),
            Some(&LivestockError::FieldNotFound(404))
        );
    }
}
