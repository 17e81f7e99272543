use std::sync::Arc;

use warp::{
    reject::{self, Rejection},
    Filter,
};

use super::jwt::{verify_jwt_session, SessionData};

#[derive(Debug)]
pub struct Unauthorized;

impl reject::Reject for Unauthorized {}

/// Shared HMAC secret used to verify session tokens.
pub type SessionKey = Arc<Vec<u8>>;

/// Accepts `Authorization: Token <jwt>` / `Bearer <jwt>` or a `session` cookie.
fn session_token() -> impl Filter<Extract = (Option<String>,), Error = std::convert::Infallible> + Clone
{
    warp::header::optional::<String>("authorization")
        .and(warp::cookie::optional::<String>("session"))
        .map(|header: Option<String>, cookie: Option<String>| {
            header
                .and_then(|value| {
                    value
                        .strip_prefix("Token ")
                        .or_else(|| value.strip_prefix("Bearer "))
                        .map(|token| token.trim().to_string())
                })
                .or(cookie)
        })
}

fn resolve(token: Option<String>, key: &SessionKey) -> Option<SessionData> {
    token
        .and_then(|token| verify_jwt_session(&token, key).ok())
        .map(|data| data.into())
}

pub fn with_session(
    key: SessionKey,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    session_token().and_then(move |token: Option<String>| {
        let key = key.clone();
        async move {
            match resolve(token, &key) {
                Some(session) => Ok(session),
                None => Err(warp::reject::custom(Unauthorized)),
            }
        }
    })
}

pub fn with_possible_session(
    key: SessionKey,
) -> impl Filter<Extract = (Option<SessionData>,), Error = std::convert::Infallible> + Clone {
    session_token().map(move |token: Option<String>| resolve(token, &key))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{
        jwt::generate_jwt_session,
        schema::{User, UserRole},
    };

    fn key() -> SessionKey {
        Arc::new(b"middleware-secret".to_vec())
    }

    fn token() -> String {
        let user = User {
            id: 11,
            email: "m@example.com".into(),
            username: "m".into(),
            first_name: "M".into(),
            last_name: "M".into(),
            password: String::new(),
            avatar: None,
            uid: UserRole::User,
        };
        generate_jwt_session(&user, &key(), Duration::hours(1)).unwrap()
    }

    #[tokio::test]
    async fn token_header_is_accepted() {
        let session = warp::test::request()
            .header("authorization", format!("Token {}", token()))
            .filter(&with_session(key()))
            .await
            .unwrap();

        assert_eq!(session.user_id, 11);
    }

    #[tokio::test]
    async fn session_cookie_is_accepted() {
        let session = warp::test::request()
            .header("cookie", format!("session={}", token()))
            .filter(&with_session(key()))
            .await
            .unwrap();

        assert_eq!(session.username, "m");
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let result = warp::test::request().filter(&with_session(key())).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn anonymous_requests_have_no_session() {
        let session = warp::test::request()
            .header("authorization", "Token garbage")
            .filter(&with_possible_session(key()))
            .await
            .unwrap();

        assert!(session.is_none());
    }
}
