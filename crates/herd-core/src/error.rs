use thiserror::Error;

use crate::types::Category;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LivestockError {
    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(i64),

    #[error("Amount must be positive: {0}")]
    InvalidAmount(String),

    #[error("Source field is required for {0}")]
    MissingSourceField(String),

    #[error("Target field is required for {0}")]
    MissingTargetField(String),

    #[error("Source and target fields must differ for MOVE (field {0})")]
    SameSourceAndTarget(i64),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Insufficient stock in field {field} for category {category}: have {available}, need {requested}")]
    InsufficientStock {
        field: String,
        category: Category,
        available: i64,
        requested: i64,
    },

    #[error("Field not found: {0}")]
    FieldNotFound(i64),

    #[error("Field {0} does not hold livestock")]
    NotLivestockField(i64),

    #[error("Field {field} still holds {head} head of livestock")]
    FieldStillStocked { field: i64, head: i64 },

    #[error("Stock count overflow in field {field} for category {category}")]
    StockOverflow { field: String, category: Category },

    #[error("Transaction not found: {0}")]
    TransactionNotFound(i64),

    #[error("Expense not found: {0}")]
    ExpenseNotFound(i64),

    #[error("Exchange rate is required for {0} amounts")]
    MissingExchangeRate(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown action type: {0}")]
    UnknownActionType(String),
}

pub type LivestockResult<T> = Result<T, LivestockError>;
