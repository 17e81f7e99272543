use potion::HtmlError;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::{jwt::SessionData, permissions::ActionType},
    error::query_error,
    schema::{Ingredient, Uuid},
};

/// Escapes `LIKE` wildcards so a user supplied prefix matches literally.
pub fn like_prefix(prefix: &str) -> String {
    let escaped = prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("{escaped}%")
}

/// Unpaginated, ordered by name. `name` filters by case-insensitive prefix.
pub async fn list_ingredients(
    name: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, potion::Error> {
    let rows: Vec<Ingredient> = match name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => sqlx::query_as(
            "SELECT * FROM ingredients WHERE name ILIKE $1 ESCAPE '\\' ORDER BY name",
        )
        .bind(like_prefix(name))
        .fetch_all(pool)
        .await
        .map_err(query_error)?,
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name")
            .fetch_all(pool)
            .await
            .map_err(query_error)?,
    };

    Ok(rows)
}

pub async fn get_ingredient(
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Option<Ingredient>, potion::Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(query_error)?;

    Ok(row)
}

pub async fn create_ingredient(
    name: &str,
    measurement_unit: &str,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Uuid, potion::Error> {
    session.authenticate(ActionType::ManageIngredients)?;

    let id: Option<(Uuid,)> = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT (name) DO NOTHING
        RETURNING id
    ",
    )
    .bind(name.trim())
    .bind(measurement_unit.trim())
    .fetch_optional(pool)
    .await
    .map_err(query_error)?;

    id.map(|id| id.0)
        .ok_or_else(|| HtmlError::InvalidRequest.new("Ingredient already exists"))
}

/// Number of ids in `ids` that reference an existing ingredient.
pub async fn count_existing_ingredients(
    ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<i64, potion::Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ingredients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_one(pool)
        .await
        .map_err(query_error)?;

    Ok(count.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_wildcards_are_escaped() {
        assert_eq!(like_prefix("sal"), "sal%");
        assert_eq!(like_prefix("100%"), "100\\%%");
        assert_eq!(like_prefix("a_b"), "a\\_b%");
        assert_eq!(like_prefix("c:\\"), "c:\\\\%");
    }
}
