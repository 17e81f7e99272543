use std::path::Path;

use chrono::Duration;
use potion::HtmlError;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::{generate_jwt_session, SessionData},
        permissions::ActionType,
    },
    constants::AVATAR_FOLDER,
    error::{not_found, query_error, ValidationError},
    media::{discard_image, store_image},
    pagination::{PageContext, PageRequest},
    requests::{AvatarRequest, LoginRequest, PasswordChangeRequest, RegisterRequest},
    schema::{User, UserProfile, UserProfileRow, Uuid},
};

pub async fn get_user(
    pool: &Pool<Postgres>,
    username: &str,
) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
        .map_err(query_error)?;

    Ok(row)
}

pub async fn get_user_by_id(
    pool: &Pool<Postgres>,
    user_id: Uuid,
) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(query_error)?;

    Ok(row)
}

pub async fn get_user_by_email(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(query_error)?;

    Ok(row)
}

/// Creates a user, storing only the argon2 hash of their password
pub async fn register_user(
    request: RegisterRequest,
    pool: &Pool<Postgres>,
) -> Result<User, potion::Error> {
    request.validate().map_err(|e| -> potion::Error { e.into() })?;

    let password = hash_password(&request.password)
        .map_err(|_| HtmlError::InternalServerError.new("Failed to hash password"))?;

    let user: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING *;
    ",
    )
    .bind(request.normalized_email())
    .bind(&request.username)
    .bind(&request.first_name)
    .bind(&request.last_name)
    .bind(password)
    .fetch_optional(pool)
    .await
    .map_err(query_error)?;

    match user {
        Some(user) => {
            log::info!("Registered user {} ({})", user.username, user.id);
            Ok(user)
        }
        None => Err(HtmlError::InvalidRequest
            .new("A user with this email or username already exists")),
    }
}

/// Returns a signed session token.
pub async fn login_user(
    request: LoginRequest,
    secret: &[u8],
    lifetime: Duration,
    pool: &Pool<Postgres>,
) -> Result<String, potion::Error> {
    let user = match get_user_by_email(pool, &request.email).await? {
        Some(user) => user,
        None => return Err(HtmlError::InvalidRequest.new("Invalid credentials")),
    };

    let authenticated = verify_password(&request.password, &user.password).map_err(|_| {
        log::error!("Stored password hash of user {} is malformed", user.id);
        HtmlError::InternalServerError.new("Failed to verify password")
    })?;
    if !authenticated {
        return Err(HtmlError::InvalidRequest.new("Invalid credentials"));
    }

    generate_jwt_session(&user, secret, lifetime)
}

pub async fn user_profile(
    user_id: Uuid,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<UserProfile, potion::Error> {
    let row: Option<UserProfile> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.avatar,
            EXISTS (SELECT 1 FROM follows f WHERE f.follower_id = $2 AND f.followed_id = u.id) AS is_subscribed
        FROM users u
        WHERE u.id = $1
    ",
    )
    .bind(user_id)
    .bind(viewer.map(|session| session.user_id))
    .fetch_optional(pool)
    .await
    .map_err(query_error)?;

    row.ok_or_else(|| not_found("No user exists with specified id"))
}

pub async fn list_users(
    page: PageRequest,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<UserProfile>, potion::Error> {
    let rows: Vec<UserProfileRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.avatar,
            EXISTS (SELECT 1 FROM follows f WHERE f.follower_id = $1 AND f.followed_id = u.id) AS is_subscribed,
            COUNT(*) OVER() AS count
        FROM users u
        ORDER BY u.first_name, u.last_name, u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(viewer.map(|session| session.user_id))
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(pool)
    .await
    .map_err(query_error)?;

    let total_count = match page.known_total(rows.first().map(|row| row.count)) {
        Some(count) => count,
        None => {
            let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
                .fetch_one(pool)
                .await
                .map_err(query_error)?;
            count.0
        }
    };
    let rows: Vec<UserProfile> = rows.into_iter().map(UserProfile::from).collect();

    Ok(PageContext::from_rows(rows, total_count, page))
}

pub async fn update_password(
    session: &SessionData,
    request: PasswordChangeRequest,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    session.authenticate(ActionType::ManageOwnProfile)?;
    request.validate().map_err(|e| -> potion::Error { e.into() })?;

    let user = get_user_by_id(pool, session.user_id)
        .await?
        .ok_or_else(|| not_found("No user exists with specified id"))?;

    let verify = |password: &str| {
        verify_password(password, &user.password)
            .map_err(|_| HtmlError::InternalServerError.new("Failed to verify password"))
    };

    if !verify(&request.current_password)? {
        return Err(ValidationError::field("current_password", "Current password is incorrect").into());
    }
    if verify(&request.new_password)? {
        return Err(ValidationError::field("new_password", "New password matches the old one").into());
    }

    let password = hash_password(&request.new_password)
        .map_err(|_| HtmlError::InternalServerError.new("Failed to hash password"))?;

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(session.user_id)
        .execute(pool)
        .await
        .map_err(query_error)?;

    log::info!("User {} changed their password", session.user_id);
    Ok(())
}

/// Stores the uploaded avatar and returns its ref. The previous avatar file is removed.
pub async fn set_avatar(
    session: &SessionData,
    request: AvatarRequest,
    media_root: &Path,
    pool: &Pool<Postgres>,
) -> Result<String, potion::Error> {
    session.authenticate(ActionType::ManageOwnProfile)?;
    let upload = request.validate().map_err(|e| -> potion::Error { e.into() })?;

    let file_ref = store_image(media_root, AVATAR_FOLDER, &upload)
        .await
        .map_err(|e| -> potion::Error { e.into() })?;

    let previous: Option<(Option<String>,)> = sqlx::query_as(
        "
        UPDATE users u SET avatar = $1
        FROM (SELECT id, avatar FROM users WHERE id = $2) old
        WHERE u.id = old.id
        RETURNING old.avatar
    ",
    )
    .bind(&file_ref)
    .bind(session.user_id)
    .fetch_optional(pool)
    .await
    .map_err(query_error)?;

    if let Some((Some(old),)) = previous {
        discard_image(media_root, &old).await;
    }

    Ok(file_ref)
}

pub async fn delete_avatar(
    session: &SessionData,
    media_root: &Path,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    session.authenticate(ActionType::ManageOwnProfile)?;

    let user = get_user_by_id(pool, session.user_id)
        .await?
        .ok_or_else(|| not_found("No user exists with specified id"))?;

    let avatar = match user.avatar {
        Some(avatar) => avatar,
        None => return Err(HtmlError::InvalidRequest.new("Avatar is not set")),
    };

    sqlx::query("UPDATE users SET avatar = NULL WHERE id = $1")
        .bind(session.user_id)
        .execute(pool)
        .await
        .map_err(query_error)?;

    discard_image(media_root, &avatar).await;

    Ok(())
}
