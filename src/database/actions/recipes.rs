use std::path::Path;

use potion::HtmlError;
use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use super::{ingredients::count_existing_ingredients, users::user_profile};
use crate::{
    authentication::{jwt::SessionData, permissions::ActionType},
    constants::RECIPE_IMAGE_FOLDER,
    error::{not_found, query_error},
    form::Form,
    media::{discard_image, store_image},
    pagination::{PageContext, PageRequest},
    requests::{RecipeForm, RecipeRequest},
    schema::{
        BriefRecipe, Recipe, RecipeDetail, RecipeIngredientLine, RecipePart, RecipeRow, Uuid,
    },
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Uuid>,
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
}

impl RecipeFilter {
    pub fn from_form(form: &Form) -> Result<Self, potion::Error> {
        Ok(Self {
            author: form.get_optional_number("author")?,
            is_favorited: form.get_flag("is_favorited"),
            is_in_shopping_cart: form.get_flag("is_in_shopping_cart"),
        })
    }

    /// Per-user flags mean nothing for anonymous viewers, so they match no recipe.
    pub fn is_unsatisfiable(&self, viewer: Option<&SessionData>) -> bool {
        viewer.is_none() && (self.is_favorited.is_some() || self.is_in_shopping_cart.is_some())
    }
}

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Recipe>, potion::Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(query_error)?;

    Ok(row)
}

/// The recipe, if `session` is allowed to modify it.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, potion::Error> {
    let recipe = get_recipe(id, pool).await?;
    session.authenticate(ActionType::ManageOwnRecipes)?;

    match recipe {
        Some(recipe) => {
            if session.can_manage(
                ActionType::ManageOwnRecipes,
                ActionType::ManageAllRecipes,
                recipe.author_id,
            ) {
                Ok(recipe)
            } else {
                Err(HtmlError::Unauthorized.default())
            }
        }
        None => Err(not_found("No recipe exists with specified id")),
    }
}

pub async fn get_brief_recipe(
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Option<BriefRecipe>, potion::Error> {
    let row: Option<BriefRecipe> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(query_error)?;

    Ok(row)
}

pub async fn list_recipe_parts(
    pool: &Pool<Postgres>,
    recipe_id: Uuid,
) -> Result<Vec<RecipePart>, potion::Error> {
    list_recipe_parts_for(&[recipe_id], pool).await
}

pub async fn list_recipe_parts_for(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipePart>, potion::Error> {
    if recipe_ids.is_empty() {
        return Ok(vec![]);
    }

    let rows: Vec<RecipePart> = sqlx::query_as("
        SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.recipe_id, i.name
    ")
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(query_error)?;

    Ok(rows)
}

async fn check_ingredients(form: &RecipeForm, pool: &Pool<Postgres>) -> Result<(), potion::Error> {
    let ids: Vec<Uuid> = form.ingredients.iter().map(|i| i.id).collect();
    let existing = count_existing_ingredients(&ids, pool).await?;

    if existing != ids.len() as i64 {
        return Err(HtmlError::InvalidRequest.new("Unknown ingredient in recipe"));
    }
    Ok(())
}

fn recipe_lines(recipe_id: Uuid, form: &RecipeForm) -> Vec<RecipeIngredientLine> {
    form.ingredients
        .iter()
        .map(|ingredient| RecipeIngredientLine {
            recipe_id,
            ingredient_id: ingredient.id,
            amount: ingredient.amount,
        })
        .collect()
}

async fn insert_recipe_parts(
    recipe_id: Uuid,
    form: &RecipeForm,
    tx: &mut Transaction<'_, Postgres>,
) -> Result<(), potion::Error> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");

    query.push_values(recipe_lines(recipe_id, form), |mut row, line| {
        row.push_bind(line.recipe_id)
            .push_bind(line.ingredient_id)
            .push_bind(line.amount);
    });

    query
        .build()
        .execute(&mut **tx)
        .await
        .map_err(query_error)?;

    Ok(())
}

async fn write_new_recipe(
    author_id: Uuid,
    form: &RecipeForm,
    image: &str,
    pool: &Pool<Postgres>,
) -> Result<Uuid, potion::Error> {
    let mut tx = pool.begin().await.map_err(query_error)?;

    let id: (Uuid,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&form.name)
    .bind(image)
    .bind(&form.text)
    .bind(form.cooking_time)
    .fetch_one(&mut *tx)
    .await
    .map_err(query_error)?;

    insert_recipe_parts(id.0, form, &mut tx).await?;
    tx.commit().await.map_err(query_error)?;

    Ok(id.0)
}

pub async fn create_recipe(
    session: &SessionData,
    request: RecipeRequest,
    media_root: &Path,
    pool: &Pool<Postgres>,
) -> Result<Uuid, potion::Error> {
    session.authenticate(ActionType::CreateRecipes)?;
    let form = request.validate().map_err(|e| -> potion::Error { e.into() })?;
    check_ingredients(&form, pool).await?;

    let image = store_image(media_root, RECIPE_IMAGE_FOLDER, &form.image)
        .await
        .map_err(|e| -> potion::Error { e.into() })?;

    match write_new_recipe(session.user_id, &form, &image, pool).await {
        Ok(id) => {
            log::info!("User {} created recipe {id}", session.user_id);
            Ok(id)
        }
        Err(e) => {
            discard_image(media_root, &image).await;
            Err(e)
        }
    }
}

async fn write_recipe_update(
    recipe_id: Uuid,
    form: &RecipeForm,
    image: &str,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let mut tx = pool.begin().await.map_err(query_error)?;

    sqlx::query(
        "UPDATE recipes SET name = $1, image = $2, text = $3, cooking_time = $4 WHERE id = $5",
    )
    .bind(&form.name)
    .bind(image)
    .bind(&form.text)
    .bind(form.cooking_time)
    .bind(recipe_id)
    .execute(&mut *tx)
    .await
    .map_err(query_error)?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await
        .map_err(query_error)?;

    insert_recipe_parts(recipe_id, form, &mut tx).await?;
    tx.commit().await.map_err(query_error)?;

    Ok(())
}

/// Replaces every field of the recipe, including its whole ingredient list.
pub async fn update_recipe(
    recipe_id: Uuid,
    session: &SessionData,
    request: RecipeRequest,
    media_root: &Path,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let recipe = get_recipe_mut(recipe_id, session, pool).await?;
    let form = request.validate().map_err(|e| -> potion::Error { e.into() })?;
    check_ingredients(&form, pool).await?;

    let image = store_image(media_root, RECIPE_IMAGE_FOLDER, &form.image)
        .await
        .map_err(|e| -> potion::Error { e.into() })?;

    let (stale, result) = match write_recipe_update(recipe_id, &form, &image, pool).await {
        Ok(()) => (recipe.image, Ok(())),
        Err(e) => (image, Err(e)),
    };

    discard_image(media_root, &stale).await;

    result
}

pub async fn delete_recipe(
    recipe_id: Uuid,
    session: &SessionData,
    media_root: &Path,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let recipe = get_recipe_mut(recipe_id, session, pool).await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(query_error)?;

    discard_image(media_root, &recipe.image).await;
    log::info!("User {} deleted recipe {recipe_id}", session.user_id);

    Ok(())
}

async fn viewer_flags(
    recipe_id: Uuid,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<(bool, bool), potion::Error> {
    let viewer_id = match viewer {
        Some(session) => session.user_id,
        None => return Ok((false, false)),
    };

    let flags: (bool, bool) = sqlx::query_as(
        "
        SELECT
            EXISTS (SELECT 1 FROM favorites WHERE user_id = $1 AND recipe_id = $2),
            EXISTS (SELECT 1 FROM shopping_cart WHERE user_id = $1 AND recipe_id = $2)
    ",
    )
    .bind(viewer_id)
    .bind(recipe_id)
    .fetch_one(pool)
    .await
    .map_err(query_error)?;

    Ok(flags)
}

pub async fn recipe_detail(
    recipe_id: Uuid,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, potion::Error> {
    let recipe = get_recipe(recipe_id, pool)
        .await?
        .ok_or_else(|| not_found("No recipe exists with specified id"))?;

    let author = user_profile(recipe.author_id, viewer, pool).await?;
    let ingredients = list_recipe_parts(pool, recipe_id).await?;
    let (is_favorited, is_in_shopping_cart) = viewer_flags(recipe_id, viewer, pool).await?;

    Ok(RecipeDetail {
        id: recipe.id,
        author,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        pub_date: recipe.pub_date,
    })
}

fn push_relation_filter(
    query: &mut QueryBuilder<'_, Postgres>,
    table: &str,
    wanted: Option<bool>,
    viewer_id: Option<Uuid>,
) {
    if let Some(wanted) = wanted {
        let negation = if wanted { "" } else { "NOT " };
        query.push(format!(
            " AND {negation}EXISTS (SELECT 1 FROM {table} x WHERE x.recipe_id = r.id AND x.user_id = "
        ));
        query.push_bind(viewer_id);
        query.push(")");
    }
}

fn push_recipe_filters(
    query: &mut QueryBuilder<'_, Postgres>,
    filter: &RecipeFilter,
    viewer_id: Option<Uuid>,
) {
    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ");
        query.push_bind(author);
    }
    push_relation_filter(query, "favorites", filter.is_favorited, viewer_id);
    push_relation_filter(query, "shopping_cart", filter.is_in_shopping_cart, viewer_id);
}

fn recipe_count_query<'a>(filter: &RecipeFilter, viewer_id: Option<Uuid>) -> QueryBuilder<'a, Postgres> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
    push_recipe_filters(&mut query, filter, viewer_id);
    query
}

/// Newest first.
pub async fn fetch_recipes(
    filter: &RecipeFilter,
    page: PageRequest,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeRow>, potion::Error> {
    if filter.is_unsatisfiable(viewer) {
        return Ok(PageContext::no_rows());
    }
    let viewer_id = viewer.map(|session| session.user_id);

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT r.*, EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ");
    query.push_bind(viewer_id);
    query.push(") AS is_favorited, EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ");
    query.push_bind(viewer_id);
    query.push(") AS is_in_shopping_cart, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    push_recipe_filters(&mut query, filter, viewer_id);

    query.push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ");
    query.push_bind(page.limit);
    query.push(" OFFSET ");
    query.push_bind(page.offset);

    let rows: Vec<RecipeRow> = query
        .build_query_as::<RecipeRow>()
        .fetch_all(pool)
        .await
        .map_err(query_error)?;

    let total_count = match page.known_total(rows.first().map(|row| row.count)) {
        Some(count) => count,
        None => {
            let mut count_query = recipe_count_query(filter, viewer_id);
            let count: (i64,) = count_query
                .build_query_as::<(i64,)>()
                .fetch_one(pool)
                .await
                .map_err(query_error)?;
            count.0
        }
    };
    Ok(PageContext::from_rows(rows, total_count, page))
}
