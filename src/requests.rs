use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;
use serde::Deserialize;

use crate::{
    constants::{
        MAX_COOKING_TIME, MAX_EMAIL_LENGTH, MAX_INGREDIENT_AMOUNT, MAX_NAME_LENGTH,
        MAX_PASSWORD_LENGTH, MAX_RECIPE_NAME_LENGTH, MAX_USERNAME_LENGTH, MIN_COOKING_TIME,
        MIN_INGREDIENT_AMOUNT, MIN_PASSWORD_LENGTH,
    },
    error::ValidationError,
    media::ImageUpload,
    schema::Uuid,
};

static USERNAME_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+\z").ok());

fn is_username(value: &str) -> bool {
    USERNAME_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(value))
}

fn check_required(errors: &mut ValidationError, field: &str, value: &str, max_len: usize) {
    if value.trim().is_empty() {
        errors.add(field, "This field is required");
    } else if value.chars().count() > max_len {
        errors.add(field, "Value is too long");
    }
}

pub fn check_password(errors: &mut ValidationError, field: &str, password: &str) {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        errors.add(field, "Password is too short");
    } else if len > MAX_PASSWORD_LENGTH {
        errors.add(field, "Password is too long");
    } else if password.chars().all(|c| c.is_ascii_digit()) {
        errors.add(field, "Password can't be entirely numeric");
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();

        check_required(&mut errors, "email", &self.email, MAX_EMAIL_LENGTH);
        if !is_email(&self.email) {
            errors.add("email", "Enter a valid email address");
        }
        check_required(&mut errors, "username", &self.username, MAX_USERNAME_LENGTH);
        if !is_username(&self.username) {
            errors.add("username", "Invalid characters in username");
        }
        check_required(&mut errors, "first_name", &self.first_name, MAX_NAME_LENGTH);
        check_required(&mut errors, "last_name", &self.last_name, MAX_NAME_LENGTH);
        check_password(&mut errors, "password", &self.password);

        errors.into_result()
    }

    /// Trimmed and lowercased, matching the case-insensitive unique index.
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

fn is_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChangeRequest {
    pub current_password: String,
    pub new_password: String,
}

impl PasswordChangeRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();

        if self.current_password.is_empty() {
            errors.add("current_password", "This field is required");
        }
        check_password(&mut errors, "new_password", &self.new_password);

        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvatarRequest {
    pub avatar: Option<String>,
}

impl AvatarRequest {
    pub fn validate(&self) -> Result<ImageUpload, ValidationError> {
        match self.avatar.as_deref() {
            Some(avatar) if !avatar.is_empty() => ImageUpload::try_from(avatar)
                .map_err(|e| ValidationError::field("avatar", &e.to_string())),
            _ => Err(ValidationError::field("avatar", "This field is required")),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i32,
}

/// Body of recipe create and update. Every field is required for both.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeRequest {
    #[serde(default)]
    pub ingredients: Option<Vec<IngredientAmount>>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub cooking_time: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeForm {
    pub ingredients: Vec<IngredientAmount>,
    pub name: String,
    pub image: ImageUpload,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeRequest {
    pub fn validate(self) -> Result<RecipeForm, ValidationError> {
        let mut errors = ValidationError::new();

        let ingredients = self.ingredients.unwrap_or_default();
        if ingredients.is_empty() {
            errors.add("ingredients", "At least one ingredient is required");
        }
        let mut seen = HashSet::new();
        if !ingredients.iter().all(|i| seen.insert(i.id)) {
            errors.add("ingredients", "Ingredients must not repeat");
        }
        if ingredients
            .iter()
            .any(|i| !(MIN_INGREDIENT_AMOUNT..=MAX_INGREDIENT_AMOUNT).contains(&i.amount))
        {
            errors.add(
                "ingredients",
                &format!("Amount must be between {MIN_INGREDIENT_AMOUNT} and {MAX_INGREDIENT_AMOUNT}"),
            );
        }

        let name = self.name.unwrap_or_default();
        check_required(&mut errors, "name", &name, MAX_RECIPE_NAME_LENGTH);

        let text = self.text.unwrap_or_default();
        check_required(&mut errors, "text", &text, usize::MAX);

        let cooking_time = match self.cooking_time {
            Some(t) if (MIN_COOKING_TIME..=MAX_COOKING_TIME).contains(&t) => t,
            Some(_) => {
                errors.add(
                    "cooking_time",
                    &format!("Cooking time must be between {MIN_COOKING_TIME} and {MAX_COOKING_TIME}"),
                );
                0
            }
            None => {
                errors.add("cooking_time", "This field is required");
                0
            }
        };

        let image = match self.image.as_deref() {
            Some(image) if !image.is_empty() => match ImageUpload::try_from(image) {
                Ok(upload) => Some(upload),
                Err(e) => {
                    errors.add("image", &e.to_string());
                    None
                }
            },
            _ => {
                errors.add("image", "This field is required");
                None
            }
        };

        errors.into_result()?;

        match image {
            Some(image) => Ok(RecipeForm {
                ingredients,
                name,
                image,
                text,
                cooking_time,
            }),
            None => Err(ValidationError::field("image", "This field is required")),
        }
    }
}
