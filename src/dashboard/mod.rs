//! Dashboard module
//!
//! Summarises a user's transactions as overall totals, a monthly breakdown
//! for the last year and their most used category.

mod aggregation;
mod stats;

pub use aggregation::{MonthlyStat, Totals};
pub use stats::{get_dashboard_stats, get_monthly_stats, get_most_used_category};
