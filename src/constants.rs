pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const USER_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_LIMIT: i64 = 100;

pub const MIN_INGREDIENT_AMOUNT: i32 = 1;
pub const MAX_INGREDIENT_AMOUNT: i32 = 32000;
pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_COOKING_TIME: i32 = 32000;

pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MAX_NAME_LENGTH: usize = 150;
pub const MAX_RECIPE_NAME_LENGTH: usize = 256;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

pub const SHOPPING_LIST_HEADER: &str = "Shopping list:";
pub const SHOPPING_LIST_FILENAME: &str = "my_shopping_list.txt";

pub const SHORT_LINK_PREFIX: &str = "/s/";
pub const RECIPE_PATH_PREFIX: &str = "/recipes/";

pub const RECIPE_IMAGE_FOLDER: &str = "recipes/images";
pub const AVATAR_FOLDER: &str = "users/avatars";
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

pub const TRUTHY_VALUES: &[&str] = &["true", "1"];
