use sqlx::{Pool, Postgres};

use super::{recipes::list_recipe_parts_for, relations::list_cart};
use crate::{
    authentication::{jwt::SessionData, permissions::ActionType},
    schema::Uuid,
    utility::shopping_list::{build_shopping_list, cart_recipe_ids},
};

/// Plain text shopping list built from every recipe in the caller's cart.
pub async fn download_shopping_list(
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<String, potion::Error> {
    session.authenticate(ActionType::ManageOwnCart)?;

    let cart = list_cart(session.user_id, pool).await?;
    let recipe_ids: Vec<Uuid> = cart_recipe_ids(&cart).into_iter().collect();
    let lines = list_recipe_parts_for(&recipe_ids, pool).await?;

    Ok(build_shopping_list(&cart, lines.as_slice()))
}
