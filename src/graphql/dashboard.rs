use async_graphql::{Context, Object, SimpleObject};

use crate::{
    dashboard::{
        MonthlyStat, Totals, get_dashboard_stats, get_monthly_stats, get_most_used_category,
    },
    timezone::local_today,
};

use super::{CategoryObject, app_state, authenticated_user, with_connection};

#[derive(SimpleObject)]
struct DashboardStats {
    total_balance: f64,
    total_income: f64,
    total_expense: f64,
}

impl From<Totals> for DashboardStats {
    fn from(totals: Totals) -> Self {
        Self {
            total_balance: totals.balance,
            total_income: totals.income,
            total_expense: totals.expense,
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "MonthlyStat")]
struct MonthlyStatObject {
    /// The month formatted as "YYYY-MM".
    month: String,
    total_income: f64,
    total_expense: f64,
}

impl From<MonthlyStat> for MonthlyStatObject {
    fn from(stat: MonthlyStat) -> Self {
        Self {
            month: stat.month,
            total_income: stat.income,
            total_expense: stat.expense,
        }
    }
}

#[derive(Default)]
pub struct DashboardQuery;

#[Object]
impl DashboardQuery {
    /// The balance, income and expenses over all of the user's transactions.
    async fn dashboard_stats(&self, ctx: &Context<'_>) -> async_graphql::Result<DashboardStats> {
        let user_id = authenticated_user(ctx)?;

        with_connection(ctx, |connection| {
            get_dashboard_stats(user_id, connection).map(DashboardStats::from)
        })
    }

    /// Income and expenses per month over the last year, oldest first.
    ///
    /// Months without transactions are left out.
    async fn monthly_stats(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<MonthlyStatObject>> {
        let user_id = authenticated_user(ctx)?;
        let state = app_state(ctx)?;

        with_connection(ctx, |connection| {
            let today = local_today(&state.local_timezone)?;

            get_monthly_stats(user_id, today, connection)
                .map(|stats| stats.into_iter().map(MonthlyStatObject::from).collect())
        })
    }

    /// The category with the most transactions, null if no transaction has a category.
    async fn most_used_category(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Option<CategoryObject>> {
        let user_id = authenticated_user(ctx)?;

        with_connection(ctx, |connection| {
            get_most_used_category(user_id, connection)
                .map(|category| category.map(CategoryObject))
        })
    }
}
