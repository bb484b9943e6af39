//! Stock History Reconstruction
//!
//! Rebuilds what a head count was at each point in the past by walking the
//! transaction log backward from the present-day snapshot and inverting
//! each transaction's effect.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::effect::{stock_effect, Scope};
use crate::types::{Category, DatedStock, Field, FieldStockRecord, LivestockTransaction, StockSnapshot};

/// When a reconstructed value held
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointTime {
    /// Immediately before a transaction recorded on this date
    Date(NaiveDate),
    /// The present-day snapshot
    Now,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPoint {
    pub time: PointTime,
    /// May be negative when the log disagrees with the snapshot
    pub value: i64,
}

impl StockPoint {
    pub fn now(value: i64) -> Self {
        Self {
            time: PointTime::Now,
            value,
        }
    }

    pub fn dated(date: NaiveDate, value: i64) -> Self {
        Self {
            time: PointTime::Date(date),
            value,
        }
    }
}

/// Chart-ready point with a concrete date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub label: String,
    pub value: i64,
    pub current: bool,
}

/// Reconstructed series, ascending in time, always ending at "now"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockHistory {
    points: Vec<StockPoint>,
}

impl StockHistory {
    pub fn points(&self) -> &[StockPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<StockPoint> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Oldest reconstructed value
    pub fn first_value(&self) -> i64 {
        self.points.first().map(|p| p.value).unwrap_or_default()
    }

    /// The snapshot value the series ends at
    pub fn current_value(&self) -> i64 {
        self.points.last().map(|p| p.value).unwrap_or_default()
    }

    /// Replace "now" with `today` and attach short labels for charting
    pub fn resolve(&self, today: NaiveDate) -> Vec<ChartPoint> {
        self.points
            .iter()
            .map(|p| {
                let (date, current) = match p.time {
                    PointTime::Date(d) => (d, false),
                    PointTime::Now => (today, true),
                };
                ChartPoint {
                    date,
                    label: date.format("%b %-d").to_string(),
                    value: p.value,
                    current,
                }
            })
            .collect()
    }
}

/// Walks a transaction log backward from a known present-day count
#[derive(Debug, Clone, Copy)]
pub struct StockHistoryReconstructor {
    scope: Scope,
}

impl Default for StockHistoryReconstructor {
    fn default() -> Self {
        Self::new()
    }
}

impl StockHistoryReconstructor {
    /// Herd-wide reconstruction; MOVE is neutral
    pub fn new() -> Self {
        Self {
            scope: Scope::Global,
        }
    }

    /// Reconstruction of the count held on one field; MOVE counts in and out
    pub fn for_field(field_id: i64) -> Self {
        Self {
            scope: Scope::Field(field_id),
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Reconstruct the series for transactions already filtered to one
    /// category.
    ///
    /// Transactions are walked most recent first (date descending, then id
    /// descending). Each one with a non-zero effect emits the value held
    /// just before it. Transactions with an unparseable date are skipped.
    /// Values stop at the `i64` bounds instead of wrapping.
    pub fn reconstruct<'a, I>(&self, current_stock: i64, transactions: I) -> StockHistory
    where
        I: IntoIterator<Item = &'a LivestockTransaction>,
    {
        let dated = self.sorted_descending(transactions);

        let mut points = Vec::with_capacity(dated.len() + 1);
        let mut running = current_stock;
        points.push(StockPoint::now(running));

        for (date, tx) in dated {
            let effect = stock_effect(tx, self.scope);
            if effect == 0 {
                continue;
            }
            running = running.saturating_sub(effect);
            points.push(StockPoint::dated(date, running));
        }

        points.reverse();
        StockHistory { points }
    }

    /// Apply effects forward, oldest first, starting from `first_value`.
    ///
    /// Replaying a reconstructed series' first value over the same log
    /// yields the snapshot it was built from.
    pub fn replay_forward<'a, I>(&self, first_value: i64, transactions: I) -> i64
    where
        I: IntoIterator<Item = &'a LivestockTransaction>,
    {
        let mut dated = self.sorted_descending(transactions);
        dated.reverse();
        dated
            .into_iter()
            .fold(first_value, |acc, (_, tx)| acc.saturating_add(stock_effect(tx, self.scope)))
    }

    fn sorted_descending<'a, I>(&self, transactions: I) -> Vec<(NaiveDate, &'a LivestockTransaction)>
    where
        I: IntoIterator<Item = &'a LivestockTransaction>,
    {
        let mut skipped = 0usize;
        let mut dated: Vec<(NaiveDate, &LivestockTransaction)> = transactions
            .into_iter()
            .filter_map(|tx| match tx.parsed_date() {
                Some(date) => Some((date, tx)),
                None => {
                    skipped += 1;
                    None
                }
            })
            .collect();

        if skipped > 0 {
            tracing::debug!(skipped, "Skipping transactions with unparseable dates");
        }

        dated.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.id.cmp(&a.1.id)));
        dated
    }
}

/// Herd-wide history for one category, filtered from the full log
pub fn reconstruct_category(
    snapshot: &StockSnapshot,
    category: Category,
    transactions: &[LivestockTransaction],
) -> StockHistory {
    StockHistoryReconstructor::new().reconstruct(
        snapshot.get(category),
        transactions.iter().filter(|tx| tx.category == category),
    )
}

/// Herd-wide history for every category
pub fn reconstruct_all(
    snapshot: &StockSnapshot,
    transactions: &[LivestockTransaction],
) -> BTreeMap<Category, StockHistory> {
    Category::ALL
        .into_iter()
        .map(|category| (category, reconstruct_category(snapshot, category, transactions)))
        .collect()
}

/// History of one category on one field, anchored at the field's counter
pub fn reconstruct_field(
    field: &Field,
    category: Category,
    transactions: &[LivestockTransaction],
) -> StockHistory {
    StockHistoryReconstructor::for_field(field.id).reconstruct(
        field.stock.get(category),
        transactions.iter().filter(|tx| tx.category == category),
    )
}

/// Fold per-field stock records into herd-wide totals per date.
///
/// Records are grouped by date in ascending order. On each date the latest
/// record of every field seen so far is kept and the totals are summed
/// across fields.
pub fn aggregate_records(records: &[FieldStockRecord]) -> Vec<DatedStock> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&FieldStockRecord>> = BTreeMap::new();
    for record in records {
        by_date.entry(record.date).or_default().push(record);
    }

    let mut latest: HashMap<i64, StockSnapshot> = HashMap::new();
    let mut result = Vec::with_capacity(by_date.len());

    for (date, mut updates) in by_date {
        updates.sort_by_key(|r| r.id);
        for update in updates {
            latest.insert(update.field_id, update.stock);
        }

        let mut stock = StockSnapshot::default();
        for state in latest.values() {
            stock += state;
        }
        result.push(DatedStock { date, stock });
    }

    result
}
