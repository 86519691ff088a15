//! Core category domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, user::UserID};

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is an empty string.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if the non-empty invariant is violated it will cause incorrect behaviour but not affect memory safety.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryName::new(s)
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Database identifier for a category.
pub type CategoryId = i64;

/// A user defined label for transactions (e.g., 'Groceries', 'Salary').
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The category's display name.
    pub name: CategoryName,
    /// An optional longer explanation of what belongs in the category.
    pub description: Option<String>,
    /// The name of the icon the client shows next to the category, e.g. "Utensils".
    pub icon: String,
    /// A CSS color, e.g. "#cc3629".
    pub color: String,
    /// The user that owns the category.
    pub user_id: UserID,
    /// When the category was created.
    pub created_at: OffsetDateTime,
    /// When the category was last changed.
    pub updated_at: OffsetDateTime,
}

/// The data needed to create a category.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    /// The category's display name.
    pub name: CategoryName,
    /// An optional longer explanation of what belongs in the category.
    pub description: Option<String>,
    /// The name of the icon the client shows next to the category.
    pub icon: String,
    /// A CSS color.
    pub color: String,
}

/// A partial update to a category.
///
/// Fields set to `None` are left unchanged. `description` uses a nested
/// option so that `Some(None)` clears the description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryUpdate {
    /// The new name.
    pub name: Option<CategoryName>,
    /// The new description, `Some(None)` removes it.
    pub description: Option<Option<String>>,
    /// The new icon name.
    pub icon: Option<String>,
    /// The new CSS color.
    pub color: Option<String>,
}

impl CategoryUpdate {
    /// Apply the changes to `category`, leaving the fields that are not set unchanged.
    pub(super) fn apply(self, mut category: Category) -> Category {
        if let Some(name) = self.name {
            category.name = name;
        }

        if let Some(description) = self.description {
            category.description = description;
        }

        if let Some(icon) = self.icon {
            category.icon = icon;
        }

        if let Some(color) = self.color {
            category.color = color;
        }

        category
    }
}
