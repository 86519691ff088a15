//! User defined categories for labelling transactions.

mod db;
mod domain;

pub use db::{
    check_category_owner, count_categories, count_category_transactions, create_category,
    create_category_table, delete_category, get_categories, get_category,
    sum_category_transactions, update_category,
};
pub use domain::{Category, CategoryId, CategoryName, CategoryUpdate, NewCategory};
