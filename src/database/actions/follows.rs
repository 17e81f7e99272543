use potion::HtmlError;
use sqlx::{Pool, Postgres};

use super::users::{get_user_by_id, user_profile};
use crate::{
    authentication::{jwt::SessionData, permissions::ActionType},
    error::{not_found, query_error},
    pagination::{PageContext, PageRequest},
    schema::{BriefRecipe, FollowEdge, Subscription, UserProfile, UserProfileRow, Uuid},
};

pub async fn is_subscribed(
    follower_id: Uuid,
    followed_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, potion::Error> {
    let result: Option<(Uuid,)> = sqlx::query_as(
        "SELECT followed_id FROM follows WHERE follower_id = $1 AND followed_id = $2",
    )
    .bind(follower_id)
    .bind(followed_id)
    .fetch_optional(pool)
    .await
    .map_err(query_error)?;

    Ok(result.is_some())
}

async fn subscription_for(
    user: UserProfile,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Subscription, potion::Error> {
    let recipes: Vec<BriefRecipe> = sqlx::query_as(
        "
        SELECT id, name, image, cooking_time FROM recipes
        WHERE author_id = $1
        ORDER BY pub_date DESC
        LIMIT $2
    ",
    )
    .bind(user.id)
    .bind(recipes_limit.map(|limit| limit.max(0)))
    .fetch_all(pool)
    .await
    .map_err(query_error)?;

    let recipes_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(user.id)
        .fetch_one(pool)
        .await
        .map_err(query_error)?;

    Ok(Subscription {
        user,
        recipes,
        recipes_count: recipes_count.0,
    })
}

pub async fn subscribe(
    session: &SessionData,
    followed_id: Uuid,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Subscription, potion::Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    if get_user_by_id(pool, followed_id).await?.is_none() {
        return Err(not_found("No user exists with specified id"));
    }
    if session.user_id == followed_id {
        return Err(HtmlError::InvalidRequest.new("You can't subscribe to yourself"));
    }

    let edge: Option<FollowEdge> = sqlx::query_as(
        "
        INSERT INTO follows (follower_id, followed_id) VALUES ($1, $2)
        ON CONFLICT DO NOTHING RETURNING follower_id, followed_id
    ",
    )
    .bind(session.user_id)
    .bind(followed_id)
    .fetch_optional(pool)
    .await
    .map_err(query_error)?;

    match edge {
        Some(edge) => log::info!("User {} subscribed to {}", edge.follower_id, edge.followed_id),
        None => return Err(HtmlError::InvalidRequest.new("You are already subscribed to this user")),
    }

    let profile = user_profile(followed_id, Some(session), pool).await?;
    subscription_for(profile, recipes_limit, pool).await
}

pub async fn unsubscribe(
    session: &SessionData,
    followed_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    if get_user_by_id(pool, followed_id).await?.is_none() {
        return Err(not_found("No user exists with specified id"));
    }
    if session.user_id == followed_id {
        return Err(HtmlError::InvalidRequest.new("You can't unsubscribe from yourself"));
    }

    let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followed_id = $2")
        .bind(session.user_id)
        .bind(followed_id)
        .execute(pool)
        .await
        .map_err(query_error)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new("You are not subscribed to this user"));
    }

    Ok(())
}

pub async fn list_subscriptions(
    session: &SessionData,
    page: PageRequest,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<Subscription>, potion::Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    let rows: Vec<UserProfileRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.avatar,
            TRUE AS is_subscribed,
            COUNT(*) OVER() AS count
        FROM follows f
        INNER JOIN users u ON u.id = f.followed_id
        WHERE f.follower_id = $1
        ORDER BY u.first_name, u.last_name, u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(session.user_id)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(pool)
    .await
    .map_err(query_error)?;

    let total_count = match page.known_total(rows.first().map(|row| row.count)) {
        Some(count) => count,
        None => {
            let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
                .bind(session.user_id)
                .fetch_one(pool)
                .await
                .map_err(query_error)?;
            count.0
        }
    };

    let mut subscriptions = Vec::with_capacity(rows.len());
    for row in rows {
        subscriptions.push(subscription_for(row.into(), recipes_limit, pool).await?);
    }

    Ok(PageContext::from_rows(subscriptions, total_count, page))
}
