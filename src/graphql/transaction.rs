use async_graphql::{Context, ID, InputObject, MaybeUndefined, Object};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    category::get_category,
    transaction::{
        Transaction, TransactionFilter, TransactionType, TransactionUpdate, count_transactions,
        create_transaction, delete_transaction, get_transaction, query_transactions,
        update_transaction,
    },
    user::get_user_by_id,
};

use super::{
    CategoryObject, UserObject, authenticated_user, maybe_undefined_to_update, parse_id,
    with_connection,
};

/// A transaction as seen by GraphQL clients.
pub struct TransactionObject(pub Transaction);

#[Object(name = "Transaction")]
impl TransactionObject {
    async fn id(&self) -> ID {
        self.0.id.into()
    }

    async fn amount(&self) -> f64 {
        self.0.amount
    }

    async fn date(&self) -> Date {
        self.0.date
    }

    async fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    #[graphql(name = "type")]
    async fn transaction_type(&self) -> TransactionType {
        self.0.transaction_type
    }

    async fn category_id(&self) -> Option<ID> {
        self.0.category_id.map(ID::from)
    }

    async fn user_id(&self) -> ID {
        self.0.user_id.as_i64().into()
    }

    async fn created_at(&self) -> OffsetDateTime {
        self.0.created_at
    }

    async fn updated_at(&self) -> OffsetDateTime {
        self.0.updated_at
    }

    /// The category the transaction belongs to, if any.
    async fn category(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<CategoryObject>> {
        let Some(category_id) = self.0.category_id else {
            return Ok(None);
        };

        with_connection(ctx, |connection| {
            match get_category(category_id, self.0.user_id, connection) {
                Ok(category) => Ok(Some(CategoryObject(category))),
                Err(Error::NotFound) => Ok(None),
                Err(error) => Err(error),
            }
        })
    }

    async fn user(&self, ctx: &Context<'_>) -> async_graphql::Result<UserObject> {
        with_connection(ctx, |connection| {
            get_user_by_id(self.0.user_id, connection).map(UserObject)
        })
    }
}

#[derive(InputObject)]
struct CreateTransactionInput {
    amount: f64,
    date: Date,
    description: Option<String>,
    #[graphql(name = "type")]
    transaction_type: TransactionType,
    category_id: Option<ID>,
}

/// Fields that are left out are not changed. `description` and `categoryId`
/// are cleared when set to null.
#[derive(InputObject)]
struct UpdateTransactionInput {
    amount: Option<f64>,
    date: Option<Date>,
    description: MaybeUndefined<String>,
    #[graphql(name = "type")]
    transaction_type: Option<TransactionType>,
    category_id: MaybeUndefined<ID>,
}

#[derive(InputObject, Default)]
struct TransactionFilterInput {
    /// Only include transactions whose description contains this text.
    description: Option<String>,
    #[graphql(name = "type")]
    transaction_type: Option<TransactionType>,
    category_id: Option<ID>,
    /// Inclusive.
    start_date: Option<Date>,
    /// Inclusive.
    end_date: Option<Date>,
}

fn parse_category_id(id: &ID) -> Result<i64, Error> {
    id.parse::<i64>().map_err(|_| Error::InvalidCategory(None))
}

#[derive(Default)]
pub struct TransactionQuery;

#[Object]
impl TransactionQuery {
    /// The user's transactions, newest first.
    async fn list_transactions(
        &self,
        ctx: &Context<'_>,
        limit: Option<u32>,
        offset: Option<u32>,
        filter: Option<TransactionFilterInput>,
    ) -> async_graphql::Result<Vec<TransactionObject>> {
        let user_id = authenticated_user(ctx)?;
        let filter = filter.unwrap_or_default();

        with_connection(ctx, |connection| {
            let filter = TransactionFilter {
                description: filter.description,
                transaction_type: filter.transaction_type,
                // An unparsable category ID cannot match anything.
                category_id: match filter.category_id {
                    Some(id) => match id.parse::<i64>() {
                        Ok(id) => Some(id),
                        Err(_) => return Ok(Vec::new()),
                    },
                    None => None,
                },
                start_date: filter.start_date,
                end_date: filter.end_date,
            };

            query_transactions(user_id, &filter, limit, offset, connection)
                .map(|transactions| transactions.into_iter().map(TransactionObject).collect())
        })
    }

    async fn get_transaction(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<TransactionObject> {
        let user_id = authenticated_user(ctx)?;

        with_connection(ctx, |connection| {
            get_transaction(parse_id(&id)?, user_id, connection).map(TransactionObject)
        })
    }

    async fn count_transactions(&self, ctx: &Context<'_>) -> async_graphql::Result<u32> {
        let user_id = authenticated_user(ctx)?;

        with_connection(ctx, |connection| count_transactions(user_id, connection))
    }
}

#[derive(Default)]
pub struct TransactionMutation;

#[Object]
impl TransactionMutation {
    async fn create_transaction(
        &self,
        ctx: &Context<'_>,
        data: CreateTransactionInput,
    ) -> async_graphql::Result<TransactionObject> {
        let user_id = authenticated_user(ctx)?;

        with_connection(ctx, |connection| {
            let category_id = data.category_id.as_ref().map(parse_category_id).transpose()?;
            let builder = Transaction::build(data.amount, data.date, data.transaction_type)
                .description(data.description)
                .category_id(category_id);

            let transaction = create_transaction(builder, user_id, connection)?;
            tracing::debug!("User {user_id} created transaction {}", transaction.id);

            Ok(TransactionObject(transaction))
        })
    }

    async fn update_transaction(
        &self,
        ctx: &Context<'_>,
        id: ID,
        data: UpdateTransactionInput,
    ) -> async_graphql::Result<TransactionObject> {
        let user_id = authenticated_user(ctx)?;

        with_connection(ctx, |connection| {
            let id = parse_id(&id).map_err(|_| Error::UpdateMissingTransaction)?;
            let category_id = match maybe_undefined_to_update(data.category_id) {
                Some(Some(category_id)) => Some(Some(parse_category_id(&category_id)?)),
                Some(None) => Some(None),
                None => None,
            };
            let update = TransactionUpdate {
                amount: data.amount,
                date: data.date,
                description: maybe_undefined_to_update(data.description),
                transaction_type: data.transaction_type,
                category_id,
            };

            update_transaction(id, user_id, update, connection).map(TransactionObject)
        })
    }

    async fn delete_transaction(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let user_id = authenticated_user(ctx)?;

        with_connection(ctx, |connection| {
            let id = parse_id(&id).map_err(|_| Error::DeleteMissingTransaction)?;
            delete_transaction(id, user_id, connection)?;
            tracing::debug!("User {user_id} deleted transaction {id}");

            Ok(true)
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use crate::test_utils::{
        assert_error_code, get_test_server, get_test_state, graphql_request, register_test_user,
    };

    const CREATE_TRANSACTION: &str = "mutation Create($data: CreateTransactionInput!) {
        createTransaction(data: $data) {
            id amount date description type categoryId category { id name }
        }
    }";

    const CREATE_CATEGORY: &str = "mutation Create($data: CreateCategoryInput!) {
        createCategory(data: $data) { id }
    }";

    async fn create_transaction(
        server: &axum_test::TestServer,
        token: &str,
        data: Value,
    ) -> Value {
        graphql_request(
            server,
            CREATE_TRANSACTION,
            json!({ "data": data }),
            Some(token),
        )
        .await
    }

    async fn create_category(server: &axum_test::TestServer, token: &str, name: &str) -> String {
        let response = graphql_request(
            server,
            CREATE_CATEGORY,
            json!({ "data": { "name": name, "icon": "Utensils", "color": "#cc3629" } }),
            Some(token),
        )
        .await;

        response["data"]["createCategory"]["id"]
            .as_str()
            .unwrap_or_else(|| panic!("Could not create category: {response}"))
            .to_owned()
    }

    #[tokio::test]
    async fn create_and_get_transaction() {
        let server = get_test_server(get_test_state());
        let token = register_test_user(&server, "foo@bar.baz").await;
        let category_id = create_category(&server, &token, "Food").await;

        let created = create_transaction(
            &server,
            &token,
            json!({
                "amount": 12.5,
                "date": "2025-10-19",
                "description": "Lunch",
                "type": "EXPENSE",
                "categoryId": category_id,
            }),
        )
        .await;
        let created = &created["data"]["createTransaction"];

        assert_eq!(created["amount"], 12.5);
        assert_eq!(created["date"], "2025-10-19");
        assert_eq!(created["type"], "EXPENSE");
        assert_eq!(created["categoryId"], category_id.as_str());
        assert_eq!(created["category"]["name"], "Food");

        let got = graphql_request(
            &server,
            "query Get($id: ID!) { getTransaction(id: $id) { id description } }",
            json!({ "id": created["id"] }),
            Some(&token),
        )
        .await;

        assert_eq!(got["data"]["getTransaction"]["id"], created["id"]);
        assert_eq!(got["data"]["getTransaction"]["description"], "Lunch");
    }

    #[tokio::test]
    async fn requests_without_token_are_unauthenticated() {
        let server = get_test_server(get_test_state());

        let response =
            graphql_request(&server, "{ listTransactions { id } }", json!({}), None).await;

        assert_error_code(&response, "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn requests_with_garbage_token_are_unauthenticated() {
        let server = get_test_server(get_test_state());

        let response = graphql_request(
            &server,
            "{ countTransactions }",
            json!({}),
            Some("not-a-token"),
        )
        .await;

        assert_error_code(&response, "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn other_users_transactions_are_not_found() {
        let server = get_test_server(get_test_state());
        let alice = register_test_user(&server, "alice@example.com").await;
        let bob = register_test_user(&server, "bob@example.com").await;
        let created = create_transaction(
            &server,
            &alice,
            json!({ "amount": 10.0, "date": "2025-10-19", "type": "INCOME" }),
        )
        .await;
        let id = created["data"]["createTransaction"]["id"].clone();

        let get = graphql_request(
            &server,
            "query Get($id: ID!) { getTransaction(id: $id) { id } }",
            json!({ "id": id }),
            Some(&bob),
        )
        .await;
        assert_error_code(&get, "NOT_FOUND");

        let update = graphql_request(
            &server,
            "mutation Update($id: ID!) { updateTransaction(id: $id, data: { amount: 0 }) { id } }",
            json!({ "id": id }),
            Some(&bob),
        )
        .await;
        assert_error_code(&update, "NOT_FOUND");

        let delete = graphql_request(
            &server,
            "mutation Delete($id: ID!) { deleteTransaction(id: $id) }",
            json!({ "id": id }),
            Some(&bob),
        )
        .await;
        assert_error_code(&delete, "NOT_FOUND");

        let list = graphql_request(&server, "{ listTransactions { id } }", json!({}), Some(&bob))
            .await;
        assert_eq!(list["data"]["listTransactions"], json!([]));
    }

    #[tokio::test]
    async fn create_with_other_users_category_is_rejected() {
        let server = get_test_server(get_test_state());
        let alice = register_test_user(&server, "alice@example.com").await;
        let bob = register_test_user(&server, "bob@example.com").await;
        let alices_category = create_category(&server, &alice, "Food").await;

        let response = create_transaction(
            &server,
            &bob,
            json!({
                "amount": 10.0,
                "date": "2025-10-19",
                "type": "EXPENSE",
                "categoryId": alices_category,
            }),
        )
        .await;

        assert_error_code(&response, "BAD_USER_INPUT");
        let count = graphql_request(&server, "{ countTransactions }", json!({}), Some(&bob)).await;
        assert_eq!(count["data"]["countTransactions"], 0);
    }

    #[tokio::test]
    async fn update_changes_only_given_fields_and_null_clears() {
        let server = get_test_server(get_test_state());
        let token = register_test_user(&server, "foo@bar.baz").await;
        let category_id = create_category(&server, &token, "Food").await;
        let created = create_transaction(
            &server,
            &token,
            json!({
                "amount": 10.0,
                "date": "2025-10-19",
                "description": "Lunch",
                "type": "EXPENSE",
                "categoryId": category_id,
            }),
        )
        .await;
        let id = created["data"]["createTransaction"]["id"].clone();

        let response = graphql_request(
            &server,
            "mutation Update($id: ID!, $data: UpdateTransactionInput!) {
                updateTransaction(id: $id, data: $data) { amount description type categoryId }
            }",
            json!({ "id": id, "data": { "amount": 11.0, "categoryId": null } }),
            Some(&token),
        )
        .await;
        let updated = &response["data"]["updateTransaction"];

        assert_eq!(updated["amount"], 11.0);
        assert_eq!(updated["description"], "Lunch");
        assert_eq!(updated["type"], "EXPENSE");
        assert_eq!(updated["categoryId"], Value::Null);
    }

    #[tokio::test]
    async fn list_filters_and_pages() {
        let server = get_test_server(get_test_state());
        let token = register_test_user(&server, "foo@bar.baz").await;
        for (day, transaction_type) in [(1, "INCOME"), (2, "EXPENSE"), (3, "EXPENSE"), (4, "INCOME")]
        {
            create_transaction(
                &server,
                &token,
                json!({
                    "amount": day as f64,
                    "date": format!("2025-10-0{day}"),
                    "type": transaction_type,
                }),
            )
            .await;
        }

        let response = graphql_request(
            &server,
            "query List($filter: TransactionFilterInput) {
                listTransactions(limit: 1, offset: 1, filter: $filter) { date }
            }",
            json!({ "filter": { "type": "EXPENSE", "endDate": "2025-10-03" } }),
            Some(&token),
        )
        .await;

        assert_eq!(
            response["data"]["listTransactions"],
            json!([{ "date": "2025-10-02" }])
        );
    }

    #[tokio::test]
    async fn delete_returns_true() {
        let server = get_test_server(get_test_state());
        let token = register_test_user(&server, "foo@bar.baz").await;
        let created = create_transaction(
            &server,
            &token,
            json!({ "amount": 1.0, "date": "2025-10-19", "type": "INCOME" }),
        )
        .await;
        let id = created["data"]["createTransaction"]["id"].clone();

        let response = graphql_request(
            &server,
            "mutation Delete($id: ID!) { deleteTransaction(id: $id) }",
            json!({ "id": id }),
            Some(&token),
        )
        .await;

        assert_eq!(response["data"]["deleteTransaction"], true);
        let count = graphql_request(&server, "{ countTransactions }", json!({}), Some(&token)).await;
        assert_eq!(count["data"]["countTransactions"], 0);
    }
}
