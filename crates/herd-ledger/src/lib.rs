pub mod db;
pub mod expenses;
pub mod fields;
pub mod models;
pub mod snapshots;
pub mod transactions;

#[cfg(test)]
pub(crate) mod test_support;

pub use db::HerdDb;
pub use expenses::ExpenseLog;
pub use fields::FieldRegistry;
pub use snapshots::StockRecords;
pub use transactions::TransactionLedger;
