use async_graphql::{Context, ID, InputObject, MaybeUndefined, Object};
use time::OffsetDateTime;

use crate::{
    Error,
    category::{
        Category, CategoryName, CategoryUpdate, NewCategory, count_categories,
        count_category_transactions, create_category, delete_category, get_categories,
        get_category, sum_category_transactions, update_category,
    },
    user::get_user_by_id,
};

use super::{
    UserObject, authenticated_user, maybe_undefined_to_update, parse_id, with_connection,
};

/// A category as seen by GraphQL clients.
pub struct CategoryObject(pub Category);

#[Object(name = "Category")]
impl CategoryObject {
    async fn id(&self) -> ID {
        self.0.id.into()
    }

    async fn name(&self) -> &str {
        self.0.name.as_ref()
    }

    async fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    async fn icon(&self) -> &str {
        &self.0.icon
    }

    async fn color(&self) -> &str {
        &self.0.color
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

    /// The number of transactions in this category.
    async fn transaction_count(&self, ctx: &Context<'_>) -> async_graphql::Result<u32> {
        with_connection(ctx, |connection| {
            count_category_transactions(self.0.id, connection)
        })
    }

    /// The sum of the amounts of the transactions in this category, regardless of their type.
    async fn total_amount(&self, ctx: &Context<'_>) -> async_graphql::Result<f64> {
        with_connection(ctx, |connection| {
            sum_category_transactions(self.0.id, connection)
        })
    }

    async fn user(&self, ctx: &Context<'_>) -> async_graphql::Result<UserObject> {
        with_connection(ctx, |connection| {
            get_user_by_id(self.0.user_id, connection).map(UserObject)
        })
    }
}

#[derive(InputObject)]
struct CreateCategoryInput {
    name: String,
    description: Option<String>,
    icon: String,
    color: String,
}

/// Fields that are left out are not changed. `description` is cleared when set to null.
#[derive(InputObject)]
struct UpdateCategoryInput {
    name: Option<String>,
    description: MaybeUndefined<String>,
    icon: Option<String>,
    color: Option<String>,
}

#[derive(Default)]
pub struct CategoryQuery;

#[Object]
impl CategoryQuery {
    /// The user's categories in alphabetical order.
    async fn list_categories(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Vec<CategoryObject>> {
        let user_id = authenticated_user(ctx)?;

        with_connection(ctx, |connection| {
            get_categories(user_id, connection)
                .map(|categories| categories.into_iter().map(CategoryObject).collect())
        })
    }

    async fn get_category(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<CategoryObject> {
        let user_id = authenticated_user(ctx)?;

        with_connection(ctx, |connection| {
            get_category(parse_id(&id)?, user_id, connection).map(CategoryObject)
        })
    }

    async fn count_categories(&self, ctx: &Context<'_>) -> async_graphql::Result<u32> {
        let user_id = authenticated_user(ctx)?;

        with_connection(ctx, |connection| count_categories(user_id, connection))
    }
}

#[derive(Default)]
pub struct CategoryMutation;

#[Object]
impl CategoryMutation {
    async fn create_category(
        &self,
        ctx: &Context<'_>,
        data: CreateCategoryInput,
    ) -> async_graphql::Result<CategoryObject> {
        let user_id = authenticated_user(ctx)?;

        with_connection(ctx, |connection| {
            let new_category = NewCategory {
                name: CategoryName::new(&data.name)?,
                description: data.description,
                icon: data.icon,
                color: data.color,
            };

            let category = create_category(new_category, user_id, connection)?;
            tracing::debug!("User {user_id} created category {}", category.id);

            Ok(CategoryObject(category))
        })
    }

    async fn update_category(
        &self,
        ctx: &Context<'_>,
        id: ID,
        data: UpdateCategoryInput,
    ) -> async_graphql::Result<CategoryObject> {
        let user_id = authenticated_user(ctx)?;

        with_connection(ctx, |connection| {
            let id = parse_id(&id).map_err(|_| Error::UpdateMissingCategory)?;
            let update = CategoryUpdate {
                name: data.name.as_deref().map(CategoryName::new).transpose()?,
                description: maybe_undefined_to_update(data.description),
                icon: data.icon,
                color: data.color,
            };

            update_category(id, user_id, update, connection).map(CategoryObject)
        })
    }

    /// Delete a category. Its transactions are kept without a category.
    async fn delete_category(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let user_id = authenticated_user(ctx)?;

        with_connection(ctx, |connection| {
            let id = parse_id(&id).map_err(|_| Error::DeleteMissingCategory)?;
            delete_category(id, user_id, connection)?;
            tracing::debug!("User {user_id} deleted category {id}");

            Ok(true)
        })
    }
}
