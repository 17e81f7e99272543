use potion::HtmlError;
use sqlx::{Pool, Postgres};

use super::recipes::get_brief_recipe;
use crate::{
    authentication::{jwt::SessionData, permissions::ActionType},
    error::{not_found, query_error},
    schema::{BriefRecipe, CartEntry, FavoriteEntry, Uuid},
};

/// Per-user recipe sets. Both are plain (user, recipe) pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    ShoppingCart,
    Favorites,
}

impl RecipeList {
    fn table(self) -> &'static str {
        match self {
            RecipeList::ShoppingCart => "shopping_cart",
            RecipeList::Favorites => "favorites",
        }
    }

    fn action(self) -> ActionType {
        match self {
            RecipeList::ShoppingCart => ActionType::ManageOwnCart,
            RecipeList::Favorites => ActionType::ManageOwnFavorites,
        }
    }

    fn already_added(self) -> &'static str {
        match self {
            RecipeList::ShoppingCart => "Recipe is already in the shopping list",
            RecipeList::Favorites => "Recipe is already in favorites",
        }
    }

    fn not_added(self) -> &'static str {
        match self {
            RecipeList::ShoppingCart => "Recipe is not in the shopping list",
            RecipeList::Favorites => "Recipe is not in favorites",
        }
    }
}

pub async fn is_listed(
    list: RecipeList,
    recipe_id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, potion::Error> {
    let result: Option<(Uuid,)> = sqlx::query_as(&format!(
        "SELECT recipe_id FROM {} WHERE recipe_id = $1 AND user_id = $2",
        list.table()
    ))
    .bind(recipe_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(query_error)?;

    Ok(result.is_some())
}

pub async fn add_to_list(
    list: RecipeList,
    recipe_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<BriefRecipe, potion::Error> {
    session.authenticate(list.action())?;

    let recipe = get_brief_recipe(recipe_id, pool)
        .await?
        .ok_or_else(|| not_found("No recipe exists with specified id"))?;

    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        list.table()
    ))
    .bind(session.user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(query_error)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new(list.already_added()));
    }

    Ok(recipe)
}

pub async fn remove_from_list(
    list: RecipeList,
    recipe_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    session.authenticate(list.action())?;

    if get_brief_recipe(recipe_id, pool).await?.is_none() {
        return Err(not_found("No recipe exists with specified id"));
    }

    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        list.table()
    ))
    .bind(session.user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(query_error)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new(list.not_added()));
    }

    Ok(())
}

pub async fn add_to_cart(
    recipe_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<BriefRecipe, potion::Error> {
    add_to_list(RecipeList::ShoppingCart, recipe_id, session, pool).await
}

pub async fn remove_from_cart(
    recipe_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    remove_from_list(RecipeList::ShoppingCart, recipe_id, session, pool).await
}

pub async fn is_in_cart(
    recipe_id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, potion::Error> {
    is_listed(RecipeList::ShoppingCart, recipe_id, user_id, pool).await
}

pub async fn list_cart(user_id: Uuid, pool: &Pool<Postgres>) -> Result<Vec<CartEntry>, potion::Error> {
    let rows: Vec<CartEntry> = sqlx::query_as(
        "SELECT user_id, recipe_id FROM shopping_cart WHERE user_id = $1 ORDER BY recipe_id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(query_error)?;

    Ok(rows)
}

pub async fn add_to_favorites(
    recipe_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<BriefRecipe, potion::Error> {
    add_to_list(RecipeList::Favorites, recipe_id, session, pool).await
}

pub async fn remove_from_favorites(
    recipe_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    remove_from_list(RecipeList::Favorites, recipe_id, session, pool).await
}

pub async fn is_favorite(
    recipe_id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, potion::Error> {
    is_listed(RecipeList::Favorites, recipe_id, user_id, pool).await
}

pub async fn list_favorites(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<FavoriteEntry>, potion::Error> {
    let rows: Vec<FavoriteEntry> = sqlx::query_as(
        "SELECT user_id, recipe_id FROM favorites WHERE user_id = $1 ORDER BY recipe_id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(query_error)?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_map_to_their_own_tables_and_permissions() {
        assert_eq!(RecipeList::ShoppingCart.table(), "shopping_cart");
        assert_eq!(RecipeList::Favorites.table(), "favorites");
        assert_eq!(RecipeList::ShoppingCart.action(), ActionType::ManageOwnCart);
        assert_eq!(RecipeList::Favorites.action(), ActionType::ManageOwnFavorites);
    }
}
