//! Livestock Financial Summary
//!
//! Income, expenses and cumulative balance by month from priced
//! transactions and general livestock expenses.

use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{LivestockError, LivestockResult};
use crate::types::{parse_date, ActionType, LivestockExpense, LivestockTransaction};

pub const BASE_CURRENCY: &str = "USD";
pub const PESO_CURRENCY: &str = "ARS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyFinancials {
    /// `YYYY-MM`
    pub month: String,
    pub income: Decimal,
    pub expenses: Decimal,
    /// Running balance up to and including this month
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub income: Decimal,
    pub expenses: Decimal,
    pub balance: Decimal,
    pub months: Vec<MonthlyFinancials>,
}

/// Convert an amount to USD.
///
/// Peso amounts are divided by the exchange rate and rounded to cents,
/// half away from zero. Every other currency is taken as USD already.
pub fn to_usd(
    amount: Decimal,
    currency: &str,
    exchange_rate: Option<Decimal>,
) -> LivestockResult<Decimal> {
    if !currency.eq_ignore_ascii_case(PESO_CURRENCY) {
        return Ok(amount);
    }

    match exchange_rate {
        Some(rate) if rate > Decimal::ZERO => Ok((amount / rate)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)),
        _ => Err(LivestockError::MissingExchangeRate(currency.to_uppercase())),
    }
}

/// Summarise income and expenses.
///
/// SALE is income, PURCHASE an expense. A DEATH costs the animals' value
/// less salvage (never below zero) and books any salvage as income.
/// Transactions without a USD price and records with unparseable dates
/// are ignored.
pub fn summarize(
    transactions: &[LivestockTransaction],
    expenses: &[LivestockExpense],
) -> FinancialSummary {
    let mut buckets: BTreeMap<(i32, u32), (Decimal, Decimal)> = BTreeMap::new();

    for tx in transactions {
        let (Some(total), Some(date)) = (tx.total_value_usd(), tx.parsed_date()) else {
            continue;
        };
        let total = total.abs();

        let (income, expense) = match tx.action_type {
            ActionType::Sale => (total, Decimal::ZERO),
            ActionType::Purchase => (Decimal::ZERO, total),
            ActionType::Death => {
                let salvage = tx.salvage_value_usd.unwrap_or_default().abs();
                let loss = (total - salvage).max(Decimal::ZERO);
                (salvage, loss)
            }
            ActionType::Birth | ActionType::Move => continue,
        };

        let bucket = buckets.entry(month_key(date)).or_default();
        bucket.0 += income;
        bucket.1 += expense;
    }

    for expense in expenses {
        let (Some(cost), Some(date)) = (expense.cost_usd, parse_date(&expense.date)) else {
            continue;
        };
        buckets.entry(month_key(date)).or_default().1 += cost.abs();
    }

    let mut income = Decimal::ZERO;
    let mut spent = Decimal::ZERO;
    let mut months = Vec::with_capacity(buckets.len());

    for ((year, month), (month_income, month_expenses)) in buckets {
        income += month_income;
        spent += month_expenses;
        months.push(MonthlyFinancials {
            month: format!("{:04}-{:02}", year, month),
            income: month_income,
            expenses: month_expenses,
            balance: income - spent,
        });
    }

    FinancialSummary {
        income,
        expenses: spent,
        balance: income - spent,
        months,
    }
}

fn month_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;
    use rust_decimal_macros::dec;

    fn priced(id: i64, action: ActionType, qty: u32, price: Decimal, date: &str) -> LivestockTransaction {
        let mut tx = LivestockTransaction::new(id, action, Category::Steers, qty, date);
        tx.price_per_unit = Some(price);
        tx.currency = Some(BASE_CURRENCY.to_string());
        tx.price_per_unit_usd = Some(price);
        tx
    }

    #[test]
    fn test_to_usd() {
        assert_eq!(to_usd(dec!(150), "USD", None).unwrap(), dec!(150));
        assert_eq!(to_usd(dec!(1000), "ARS", Some(dec!(3))).unwrap(), dec!(333.33));
        assert_eq!(to_usd(dec!(1001), "ars", Some(dec!(200))).unwrap(), dec!(5.01));
        assert_eq!(to_usd(dec!(0.125), "ARS", Some(dec!(1))).unwrap(), dec!(0.13));
        assert_eq!(
            to_usd(dec!(10), "ARS", None),
            Err(LivestockError::MissingExchangeRate("ARS".to_string()))
        );
        assert!(to_usd(dec!(10), "ARS", Some(Decimal::ZERO)).is_err());
    }

    #[test]
    fn test_sales_and_purchases() {
        let txs = vec![
            priced(1, ActionType::Purchase, 10, dec!(500), "2024-01-05"),
            priced(2, ActionType::Sale, 4, dec!(700), "2024-02-10"),
            priced(3, ActionType::Birth, 3, dec!(100), "2024-02-11"),
        ];

        let summary = summarize(&txs, &[]);
        assert_eq!(summary.income, dec!(2800));
        assert_eq!(summary.expenses, dec!(5000));
        assert_eq!(summary.balance, dec!(-2200));
        assert_eq!(summary.months.len(), 2);
        assert_eq!(summary.months[0].month, "2024-01");
        assert_eq!(summary.months[0].balance, dec!(-5000));
        assert_eq!(summary.months[1].balance, dec!(-2200));
    }

    #[test]
    fn test_death_loss_and_salvage() {
        let mut death = priced(1, ActionType::Death, 2, dec!(400), "2024-03-01");
        death.salvage_value_usd = Some(dec!(150));

        let mut over_salvaged = priced(2, ActionType::Death, 1, dec!(100), "2024-03-02");
        over_salvaged.salvage_value_usd = Some(dec!(250));

        let summary = summarize(&[death, over_salvaged], &[]);
        assert_eq!(summary.expenses, dec!(650));
        assert_eq!(summary.income, dec!(400));
    }

    #[test]
    fn test_unpriced_and_undated_are_ignored() {
        let unpriced = LivestockTransaction::new(1, ActionType::Sale, Category::Cows, 5, "2024-01-01");
        let undated = priced(2, ActionType::Sale, 1, dec!(10), "sometime");

        let summary = summarize(&[unpriced, undated], &[]);
        assert_eq!(summary.income, Decimal::ZERO);
        assert!(summary.months.is_empty());
    }

    #[test]
    fn test_expenses_are_bucketed() {
        let expense = LivestockExpense {
            id: 1,
            name: "Vacunas".to_string(),
            field_id: None,
            cost: dec!(30000),
            currency: PESO_CURRENCY.to_string(),
            exchange_rate: Some(dec!(1000)),
            cost_usd: Some(dec!(30)),
            note: None,
            date: "2023-12-20".to_string(),
        };
        let txs = vec![priced(1, ActionType::Sale, 1, dec!(100), "2024-01-02")];

        let summary = summarize(&txs, &[expense]);
        assert_eq!(summary.months[0].month, "2023-12");
        assert_eq!(summary.months[0].expenses, dec!(30));
        assert_eq!(summary.months[1].balance, dec!(70));
        assert_eq!(summary.balance, dec!(70));
    }
}
