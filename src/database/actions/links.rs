use sqlx::{Pool, Postgres};

use super::recipes::get_brief_recipe;
use crate::{
    config::Config,
    error::{not_found, InvalidArgument},
    schema::Uuid,
    utility::short_link::{resolve_short_link, short_link_path},
};

/// Absolute short url for an existing recipe.
pub async fn recipe_short_link(
    recipe_id: Uuid,
    config: &Config,
    pool: &Pool<Postgres>,
) -> Result<String, potion::Error> {
    if get_brief_recipe(recipe_id, pool).await?.is_none() {
        return Err(not_found("No recipe exists with specified id"));
    }

    let path = short_link_path(recipe_id).map_err(|e: InvalidArgument| -> potion::Error { e.into() })?;
    Ok(config.absolute_url(&path))
}

/// Decodes `code`; malformed codes are reported as missing recipes.
pub fn short_link_target(code: &str) -> Result<(Uuid, String), potion::Error> {
    resolve_short_link(code).map_err(|e| {
        log::debug!("Rejected short link '{code}': {e}");
        not_found("No recipe exists with specified link")
    })
}

/// Canonical recipe path for a short link code.
pub async fn resolve_recipe_link(code: &str, pool: &Pool<Postgres>) -> Result<String, potion::Error> {
    let (recipe_id, path) = short_link_target(code)?;

    match get_brief_recipe(recipe_id, pool).await? {
        Some(_) => Ok(path),
        None => Err(not_found("No recipe exists with specified link")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_codes_are_not_found() {
        for code in ["", "#", "ABC", "zzzzzzzzzzzzzzzz"] {
            let err = short_link_target(code).unwrap_err();
            assert_eq!(err.code, 404, "{code}");
        }
    }

    #[test]
    fn valid_codes_resolve_to_recipe_paths() {
        assert_eq!(
            short_link_target("rs").unwrap(),
            (1000, String::from("/recipes/1000/"))
        );
    }
}
