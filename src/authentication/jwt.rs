use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use potion::HtmlError;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::User;
use crate::schema::{UserRole, Uuid};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Uuid,
    pub username: String,
    pub user_uid: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Uuid, username: String, uid: UserRole, lifetime: Duration) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            username,
            user_uid: uid,
            iat,
            exp,
        }
    }

    pub fn is_expired(&self) -> bool {
        (self.exp - Local::now().timestamp()).is_negative()
    }
}

/// The authenticated caller, passed explicitly into every action that needs one.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Uuid,
    pub username: String,
    pub user_uid: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), potion::Error> {
        if !action.authenticate(&self) {
            return Err(
                HtmlError::Unauthorized.new("You don't have permission to perform this action")
            );
        }
        Ok(())
    }

    /// Authors may manage their own resources, admins may manage everyone's.
    pub fn can_manage(&self, own: ActionType, all: ActionType, owner_id: Uuid) -> bool {
        if self.user_id == owner_id {
            own.authenticate(self)
        } else {
            all.authenticate(self)
        }
    }
}

impl Into<SessionData> for JwtSessionData {
    fn into(self) -> SessionData {
        SessionData {
            username: self.username,
            user_id: self.user_id,
            is_admin: self.user_uid == UserRole::Admin,
            user_uid: self.user_uid,
        }
    }
}

fn signing_key(secret: &[u8]) -> Result<Hmac<Sha256>, potion::Error> {
    Hmac::new_from_slice(secret).map_err(|_| {
        log::error!("Invalid session signing key");
        HtmlError::InternalServerError.new("Invalid session signing key")
    })
}

pub fn generate_jwt_session(
    user: &User,
    secret: &[u8],
    lifetime: Duration,
) -> Result<String, potion::Error> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(
        user.id,
        user.username.to_owned(),
        user.uid.to_owned(),
        lifetime,
    );

    claims
        .sign_with_key(&key)
        .map_err(|_| HtmlError::InternalServerError.new("Failed to sign session"))
}

pub fn verify_jwt_session(token: &str, secret: &[u8]) -> Result<JwtSessionData, potion::Error> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| HtmlError::InvalidSession.new("Invalid Session; Invalid token"))?;

    if session.is_expired() {
        return Err(HtmlError::InvalidSession.new("Invalid session; Token expired"));
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(uid: UserRole) -> User {
        User {
            id: 3,
            email: "cook@example.com".into(),
            username: "cook".into(),
            first_name: "Jamie".into(),
            last_name: "Oliver".into(),
            password: String::new(),
            avatar: None,
            uid,
        }
    }

    #[test]
    fn session_round_trip() {
        let token = generate_jwt_session(&user(UserRole::Admin), b"test-secret", Duration::hours(1)).unwrap();
        let session: SessionData = verify_jwt_session(&token, b"test-secret").unwrap().into();

        assert_eq!(session.user_id, 3);
        assert_eq!(session.username, "cook");
        assert!(session.is_admin);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_jwt_session(&user(UserRole::User), b"one", Duration::hours(1)).unwrap();

        assert!(verify_jwt_session(&token, b"two").is_err());
    }

    #[test]
    fn expired_session_is_rejected() {
        let token = generate_jwt_session(&user(UserRole::User), b"s", Duration::hours(-2)).unwrap();

        assert!(verify_jwt_session(&token, b"s").is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(verify_jwt_session("not.a.token", b"s").is_err());
    }
}
