use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

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

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

/// Read projection of a user. Never carries the password hash.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for UserProfile {
    fn from(value: User) -> Self {
        Self {
            id: value.id,
            email: value.email,
            username: value.username,
            first_name: value.first_name,
            last_name: value.last_name,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
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
    pub created_at: DateTime<Utc>,
}

/// Short recipe shape returned by the favorite / shopping cart toggles.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeSummary {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

/// One ingredient row of a recipe as displayed to a reader, joined with the
/// ingredient's name and unit.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeIngredientRow {
    pub id: Uuid,
    pub name: String,
    pub amount: i32,
    pub measurement_unit: String,
}

/// Full read projection of a recipe. The two booleans are computed per request
/// for the viewing principal and are false for anonymous reads.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetails {
    pub id: Uuid,
    pub author: UserProfile,
    pub name: String,
    pub text: String,
    pub image: String,
    pub ingredients: Vec<RecipeIngredientRow>,
    pub tags: Vec<Tag>,
    pub cooking_time: i32,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Write shape for one recipe ingredient: `{"id": ..., "amount": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientSpec {
    pub id: Uuid,
    pub amount: i32,
}

/// Write shape for recipe creation and full replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeWrite {
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    pub ingredients: Vec<IngredientSpec>,
    pub tags: Vec<Uuid>,
}

/// Raw aggregation input: one row per (cart entry, recipe ingredient).
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct ManifestRow {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// One deduplicated line of the shopping manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 1,
            email: "cook@example.com".to_string(),
            username: "cook".to_string(),
            password: "$argon2id$hash".to_string(),
            first_name: "Kaisa".to_string(),
            last_name: "Kokki".to_string(),
            role: UserRole::User,
        }
    }

    #[test]
    fn profile_json_never_carries_the_password() {
        let json = serde_json::to_value(UserProfile::from(user())).unwrap();

        assert_eq!(json["username"], "cook");
        assert!(json.get("password").is_none());
    }

    #[test]
    fn recipe_write_parses_nested_ingredient_specs() {
        let data: RecipeWrite = serde_json::from_str(
            r#"{
                "name": "Soup",
                "text": "Boil everything",
                "image": "image/soup.png",
                "cooking_time": 30,
                "ingredients": [{"id": 3, "amount": 200}],
                "tags": [1, 2]
            }"#,
        )
        .unwrap();

        assert_eq!(data.ingredients.len(), 1);
        assert_eq!(data.ingredients[0].id, 3);
        assert_eq!(data.ingredients[0].amount, 200);
        assert_eq!(data.tags, vec![1, 2]);
    }

    #[test]
    fn user_role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(UserRole::Admin).unwrap(), "admin");
    }
}
