//! Transaction management for the finance tracker.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing, querying, and managing transactions

mod core;
mod query;

pub use core::{
    Transaction, TransactionBuilder, TransactionType, TransactionUpdate, count_transactions,
    create_transaction, create_transaction_table, delete_transaction, get_transaction,
    update_transaction,
};
pub use query::{TransactionFilter, get_transactions_since, query_transactions};
