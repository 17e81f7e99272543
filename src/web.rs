use std::{collections::HashMap, convert::Infallible, sync::Arc};

use serde_json::json;
use sqlx::{Pool, Postgres};
use warp::{http::Uri, reject::Rejection, reply::Reply, Filter};

use crate::{
    actions::{
        download_shopping_list, fetch_recipes, list_users, recipe_short_link, resolve_recipe_link,
        RecipeFilter,
    },
    config::Config,
    constants::{RECIPE_COUNT_PER_PAGE, SHOPPING_LIST_FILENAME, USER_COUNT_PER_PAGE},
    form::Form,
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    pagination::PageRequest,
    schema::Uuid,
};

fn reject(e: potion::Error) -> Rejection {
    e.into()
}

pub fn with_pool(
    pool: Pool<Postgres>,
) -> impl Filter<Extract = (Pool<Postgres>,), Error = Infallible> + Clone {
    warp::any().map(move || pool.clone())
}

pub fn with_config(
    config: Arc<Config>,
) -> impl Filter<Extract = (Arc<Config>,), Error = Infallible> + Clone {
    warp::any().map(move || config.clone())
}

/// Shopping list served as a downloadable text file.
pub fn shopping_list_reply(text: String) -> impl Reply {
    let reply = warp::reply::with_header(text, "content-type", "text/plain; charset=utf-8");
    warp::reply::with_header(
        reply,
        "content-disposition",
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    )
}

pub fn redirect_reply(path: &str) -> Result<impl Reply, Rejection> {
    let uri = Uri::try_from(path).map_err(|_| warp::reject::not_found())?;
    Ok(warp::redirect::found(uri))
}

pub async fn recipes_handler(
    query: HashMap<String, String>,
    session: Option<SessionData>,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let form = Form::from_query(query);
    let filter = RecipeFilter::from_form(&form).map_err(reject)?;
    let page = PageRequest::from_form(&form, RECIPE_COUNT_PER_PAGE);

    let recipes = fetch_recipes(&filter, page, session.as_ref(), &pool)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&recipes))
}

pub async fn users_handler(
    query: HashMap<String, String>,
    session: Option<SessionData>,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let page = PageRequest::from_form(&Form::from_query(query), USER_COUNT_PER_PAGE);

    let users = list_users(page, session.as_ref(), &pool)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&users))
}

pub async fn shopping_list_handler(
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let text = download_shopping_list(&session, &pool).await.map_err(reject)?;
    Ok(shopping_list_reply(text))
}

pub async fn short_link_handler(
    recipe_id: Uuid,
    config: Arc<Config>,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let url = recipe_short_link(recipe_id, &config, &pool)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&json!({ "short-link": url })))
}

pub async fn redirect_handler(code: String, pool: Pool<Postgres>) -> Result<impl Reply, Rejection> {
    let path = resolve_recipe_link(&code, &pool).await.map_err(reject)?;
    redirect_reply(&path)
}

/// Read-only endpoints: recipe and user listings, the shopping list download,
/// short link creation and the `/s/<code>` redirect.
pub fn routes(
    config: Arc<Config>,
    pool: Pool<Postgres>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let recipes = warp::path!("api" / "recipes")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_possible_session(config.session_key()))
        .and(with_pool(pool.clone()))
        .and_then(recipes_handler);

    let users = warp::path!("api" / "users")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_possible_session(config.session_key()))
        .and(with_pool(pool.clone()))
        .and_then(users_handler);

    let download = warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(config.session_key()))
        .and(with_pool(pool.clone()))
        .and_then(shopping_list_handler);

    let get_link = warp::path!("api" / "recipes" / Uuid / "get-link")
        .and(warp::get())
        .and(with_config(config.clone()))
        .and(with_pool(pool.clone()))
        .and_then(short_link_handler);

    let redirect = warp::path!("s" / String)
        .and(warp::get())
        .and(with_pool(pool))
        .and_then(redirect_handler);

    recipes
        .or(users)
        .or(download)
        .or(get_link)
        .or(redirect)
}
