//! Herd Core
//!
//! Livestock domain types, the stock effect table, transaction validation,
//! stock-history reconstruction and the financial summary. No I/O.

pub mod effect;
pub mod error;
pub mod finance;
pub mod history;
pub mod types;
pub mod validation;

pub use effect::{field_deltas, stock_effect, FieldDelta, Scope};
pub use error::*;
pub use finance::{summarize, to_usd, FinancialSummary, MonthlyFinancials};
pub use history::{
    aggregate_records, reconstruct_all, reconstruct_category, reconstruct_field, ChartPoint,
    PointTime, StockHistory, StockHistoryReconstructor, StockPoint,
};
pub use types::*;
pub use validation::validate;
