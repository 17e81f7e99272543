use chrono::{DateTime, Utc};
use potion::TypeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type Uuid = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_type", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

impl TryFrom<Value> for UserRole {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.as_str() {
            Some(value) => match value {
                "user" => Ok(Self::User),
                "admin" => Ok(Self::Admin),
                _ => Err(TypeError::new("Invalid variant")),
            },
            None => return Err(TypeError::new("Failed to parse value as string")),
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub avatar: Option<String>,
    pub uid: UserRole,
}

/// Public view of a user, as seen by `viewer`.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub is_subscribed: bool,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct UserProfileRow {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub is_subscribed: bool,

    pub count: i64,
}

impl From<UserProfileRow> for UserProfile {
    fn from(row: UserProfileRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            avatar: row.avatar,
            is_subscribed: row.is_subscribed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    #[serde(flatten)]
    pub user: UserProfile,
    pub recipes: Vec<BriefRecipe>,
    pub recipes_count: i64,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,

    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,

    #[serde(skip_serializing)]
    pub count: i64,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BriefRecipe {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

/// One ingredient line of a recipe joined with the ingredient it references.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RecipePart {
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    pub id: Uuid,
    pub author: UserProfile,
    pub ingredients: Vec<RecipePart>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub struct RecipeIngredientLine {
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub amount: i32,
}

#[derive(sqlx::FromRow, Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub struct CartEntry {
    pub user_id: Uuid,
    pub recipe_id: Uuid,
}

#[derive(sqlx::FromRow, Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub struct FavoriteEntry {
    pub user_id: Uuid,
    pub recipe_id: Uuid,
}

#[derive(sqlx::FromRow, Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub struct FollowEdge {
    pub follower_id: Uuid,
    pub followed_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_role_parses_known_variants() {
        assert_eq!(
            UserRole::try_from(Value::String("admin".into())).ok(),
            Some(UserRole::Admin)
        );
        assert_eq!(
            UserRole::try_from(Value::String("user".into())).ok(),
            Some(UserRole::User)
        );
        assert!(UserRole::try_from(Value::String("creator".into())).is_err());
        assert!(UserRole::try_from(Value::Bool(true)).is_err());
    }

    #[test]
    fn user_password_is_never_serialized() {
        let user = User {
            id: 1,
            email: "chef@example.com".into(),
            username: "chef".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            password: "$argon2id$secret".into(),
            avatar: None,
            uid: UserRole::User,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["uid"], "user");
    }

    #[test]
    fn subscription_flattens_profile() {
        let sub = Subscription {
            user: UserProfile {
                id: 7,
                email: "a@b.c".into(),
                username: "cook".into(),
                first_name: "A".into(),
                last_name: "B".into(),
                avatar: None,
                is_subscribed: true,
            },
            recipes: vec![],
            recipes_count: 3,
        };

        let json = serde_json::to_value(&sub).unwrap();
        assert_eq!(json["username"], "cook");
        assert_eq!(json["is_subscribed"], true);
        assert_eq!(json["recipes_count"], 3);
    }
}
