use std::collections::HashMap;

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::{generate_jwt_session, SessionData},
        permissions::ActionType,
    },
    constants::{AMOUNT_MAX, AMOUNT_MIN, COOKING_TIME_MAX, COOKING_TIME_MIN},
    schema::{
        Ingredient, IngredientSpec, ManifestEntry, ManifestRow, Recipe, RecipeDetails,
        RecipeIngredientRow, RecipeSummary, RecipeWrite, Tag, User, UserProfile, Uuid,
    },
};

use super::error::{unique_conflict, Error, QueryError};
use sqlx::{Pool, Postgres, Transaction};

pub async fn get_user(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Uuid) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

/// Creates a user. The password is argon2-hashed before it touches the store.
pub async fn register_user(
    email: &str,
    username: &str,
    first_name: &str,
    last_name: &str,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<Uuid, Error> {
    let password = hash_password(password.to_string())
        .map_err(|e| Error::Internal(format!("Failed to hash password: {e}")))?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING id;
    ",
    )
    .bind(email)
    .bind(username)
    .bind(first_name)
    .bind(last_name)
    .bind(password)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    match row {
        Some(id) => Ok(id.0),
        None => Err(Error::conflict(
            "A user with that email or username already exists",
        )),
    }
}

pub async fn login_user(
    email: &str,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<String, Error> {
    let user = match get_user(pool, email).await? {
        Some(user) => user,
        None => return Err(Error::validation("Invalid credentials")),
    };

    let authenticated = verify_password(password, &user.password)
        .map_err(|e| Error::Internal(format!("Failed to parse password hash: {e}")))?;
    if !authenticated {
        return Err(Error::validation("Invalid credentials"));
    }

    Ok(generate_jwt_session(&user))
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let rows: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name")
        .fetch_all(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(rows)
}

pub async fn get_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Tag>, Error> {
    let row: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

pub async fn list_ingredients(
    search: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let rows: Vec<Ingredient> = match search {
        Some(search) => {
            sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 || '%' ORDER BY name")
                .bind(search)
                .fetch_all(&*pool)
                .await
                .map_err(|e| QueryError::from(e).into())?
        }
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name")
            .fetch_all(&*pool)
            .await
            .map_err(|e| QueryError::from(e).into())?,
    };

    Ok(rows)
}

pub async fn get_ingredient(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

pub async fn list_recipes(
    author: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Recipe>, Error> {
    let rows: Vec<Recipe> = match author {
        Some(author) => {
            sqlx::query_as("SELECT * FROM recipes WHERE author_id = $1 ORDER BY id DESC")
                .bind(author)
                .fetch_all(&*pool)
                .await
                .map_err(|e| QueryError::from(e).into())?
        }
        None => sqlx::query_as("SELECT * FROM recipes ORDER BY id DESC")
            .fetch_all(&*pool)
            .await
            .map_err(|e| QueryError::from(e).into())?,
    };

    Ok(rows)
}

pub async fn find_recipe(name: &str, pool: &Pool<Postgres>) -> Result<Option<Uuid>, Error> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM recipes WHERE name = $1")
        .bind(name)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row.map(|r| r.0))
}

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

/// Resolves a recipe for mutation. Admins holding the manage-all action may
/// touch any recipe, everyone else only their own.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    let recipe = get_recipe(id, pool).await?;
    session.authenticate(ActionType::ManageOwnRecipes)?;

    match recipe {
        Some(recipe) => match session.authenticate(ActionType::ManageAllRecipes) {
            Ok(_) => Ok(recipe),
            Err(_) => {
                if recipe.author_id != session.user_id {
                    Err(Error::forbidden("Only the author can modify a recipe"))
                } else {
                    Ok(recipe)
                }
            }
        },
        None => Err(Error::not_found("No recipe exists with specified id")),
    }
}

/// Field validation for the recipe write shape. Runs before any mutation.
pub fn validate_recipe_write(data: &RecipeWrite) -> Result<(), Error> {
    if data.cooking_time < COOKING_TIME_MIN || data.cooking_time > COOKING_TIME_MAX {
        return Err(Error::validation("Cooking time must be between 1 and 1000"));
    }
    if data.ingredients.is_empty() {
        return Err(Error::validation(
            "Recipe must contain at least one ingredient",
        ));
    }

    // Uniqueness is checked over the whole set before any amount is looked at.
    let mut seen: Vec<Uuid> = Vec::with_capacity(data.ingredients.len());
    for spec in &data.ingredients {
        if seen.contains(&spec.id) {
            return Err(Error::validation("Ingredient must be unique"));
        }
        seen.push(spec.id);
    }

    for spec in &data.ingredients {
        if spec.amount < AMOUNT_MIN || spec.amount > AMOUNT_MAX {
            return Err(Error::validation("Amount must be between 1 and 1000"));
        }
    }

    Ok(())
}

async fn attach_ingredients(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    specs: &[IngredientSpec],
) -> Result<(), Error> {
    for spec in specs {
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = $1")
            .bind(spec.id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| QueryError::from(e).into())?;
        if exists.is_none() {
            return Err(Error::not_found("No ingredient exists with specified id"));
        }

        sqlx::query(
            "
            INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount)
            VALUES ($1, $2, $3);
        ",
        )
        .bind(recipe_id)
        .bind(spec.id)
        .bind(spec.amount)
        .execute(&mut **tx)
        .await
        .map_err(|e| QueryError::from(e).into())?;
    }

    Ok(())
}

async fn attach_tags(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    tags: &[Uuid],
) -> Result<(), Error> {
    for tag_id in tags {
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE id = $1")
            .bind(tag_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| QueryError::from(e).into())?;
        if exists.is_none() {
            return Err(Error::not_found("No tag exists with specified id"));
        }

        sqlx::query(
            "
            INSERT INTO recipe_tags (recipe_id, tag_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING;
        ",
        )
        .bind(recipe_id)
        .bind(tag_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| QueryError::from(e).into())?;
    }

    Ok(())
}

/// Persists a new recipe with its ingredient amounts and tags in one
/// transaction. A failure at any step leaves no partial state behind.
pub async fn create_recipe(
    author: &SessionData,
    data: RecipeWrite,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetails, Error> {
    author.authenticate(ActionType::CreateRecipes)?;

    if find_recipe(&data.name, pool).await?.is_some() {
        return Err(Error::conflict("A recipe with that name already exists"));
    }
    validate_recipe_write(&data)?;

    let mut tx = pool.begin().await.map_err(|e| QueryError::from(e).into())?;

    let recipe: (Uuid,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id;
    ",
    )
    .bind(author.user_id)
    .bind(&data.name)
    .bind(&data.image)
    .bind(&data.text)
    .bind(data.cooking_time)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| unique_conflict(e, "A recipe with that name already exists"))?;

    let recipe_id = recipe.0;
    attach_ingredients(&mut tx, recipe_id, &data.ingredients).await?;
    attach_tags(&mut tx, recipe_id, &data.tags).await?;

    tx.commit().await.map_err(|e| QueryError::from(e).into())?;
    log::debug!("created recipe {recipe_id}");

    read_recipe(recipe_id, Some(author.user_id), pool).await
}

/// Full replacement of a recipe: scalar fields, the entire ingredient set and
/// the entire tag set. Replace semantics, never merge.
pub async fn replace_recipe(
    id: Uuid,
    caller: &SessionData,
    data: RecipeWrite,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetails, Error> {
    get_recipe_mut(id, caller, pool).await?;

    let duplicate: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM recipes WHERE name = $1 AND id <> $2")
            .bind(&data.name)
            .bind(id)
            .fetch_optional(&*pool)
            .await
            .map_err(|e| QueryError::from(e).into())?;
    if duplicate.is_some() {
        return Err(Error::conflict("A recipe with that name already exists"));
    }
    validate_recipe_write(&data)?;

    let mut tx = pool.begin().await.map_err(|e| QueryError::from(e).into())?;

    sqlx::query(
        "
        UPDATE recipes SET name = $1, image = $2, text = $3, cooking_time = $4
        WHERE id = $5;
    ",
    )
    .bind(&data.name)
    .bind(&data.image)
    .bind(&data.text)
    .bind(data.cooking_time)
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(|e| unique_conflict(e, "A recipe with that name already exists"))?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| QueryError::from(e).into())?;
    attach_ingredients(&mut tx, id, &data.ingredients).await?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| QueryError::from(e).into())?;
    attach_tags(&mut tx, id, &data.tags).await?;

    tx.commit().await.map_err(|e| QueryError::from(e).into())?;
    log::debug!("replaced recipe {id}");

    read_recipe(id, Some(caller.user_id), pool).await
}

pub async fn delete_recipe(
    id: Uuid,
    caller: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    get_recipe_mut(id, caller, pool).await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(())
}

pub async fn list_recipe_ingredients(
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeIngredientRow>, Error> {
    let rows: Vec<RecipeIngredientRow> = sqlx::query_as(
        "
        SELECT i.id AS id, i.name AS name, ri.amount AS amount,
               i.measurement_unit AS measurement_unit
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY ri.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(rows)
}

pub async fn list_recipe_tags(recipe_id: Uuid, pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let rows: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.id AS id, t.name AS name, t.color AS color, t.slug AS slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY rt.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(rows)
}

/// Assembles the full read projection of a recipe for the given viewer.
/// The membership booleans are recomputed on every read, never stored.
pub async fn read_recipe(
    id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetails, Error> {
    let recipe = match get_recipe(id, pool).await? {
        Some(recipe) => recipe,
        None => return Err(Error::not_found("No recipe exists with specified id")),
    };

    let author = get_user_by_id(pool, recipe.author_id)
        .await?
        .map(UserProfile::from)
        .ok_or_else(|| Error::Internal(format!("Recipe {id} has no author row")))?;
    let ingredients = list_recipe_ingredients(id, pool).await?;
    let tags = list_recipe_tags(id, pool).await?;

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(user_id) => (
            is_favorite(id, user_id, pool).await?,
            is_in_shopping_cart(id, user_id, pool).await?,
        ),
        None => (false, false),
    };

    Ok(RecipeDetails {
        id: recipe.id,
        author,
        name: recipe.name,
        text: recipe.text,
        image: recipe.image,
        ingredients,
        tags,
        cooking_time: recipe.cooking_time,
        is_favorited,
        is_in_shopping_cart,
    })
}

pub async fn get_recipe_summary(
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeSummary>, Error> {
    let row: Option<RecipeSummary> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(&*pool)
            .await
            .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

pub async fn is_favorite(id: Uuid, user_id: Uuid, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let result: Option<(Uuid,)> = sqlx::query_as(
        "
        SELECT recipe_id FROM favorites WHERE recipe_id = $1 AND user_id = $2
    ",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(result.is_some())
}

pub async fn is_in_shopping_cart(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let result: Option<(Uuid,)> = sqlx::query_as(
        "
        SELECT recipe_id FROM shopping_list WHERE recipe_id = $1 AND user_id = $2
    ",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(result.is_some())
}

pub async fn add_to_favorites(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<RecipeSummary, Error> {
    let summary = get_recipe_summary(id, pool)
        .await?
        .ok_or_else(|| Error::not_found("No recipe exists with specified id"))?;

    let result = sqlx::query(
        "INSERT INTO favorites (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING;",
    )
    .bind(user_id)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| unique_conflict(e, "Recipe is already in favorites"))?;

    if result.rows_affected() == 0 {
        return Err(Error::conflict("Recipe is already in favorites"));
    }

    Ok(summary)
}

pub async fn remove_from_favorites(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found("Recipe is not in favorites"));
    }

    Ok(())
}

pub async fn add_to_shopping_cart(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<RecipeSummary, Error> {
    let summary = get_recipe_summary(id, pool)
        .await?
        .ok_or_else(|| Error::not_found("No recipe exists with specified id"))?;

    let result = sqlx::query(
        "INSERT INTO shopping_list (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING;",
    )
    .bind(user_id)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| unique_conflict(e, "Recipe is already in shopping cart"))?;

    if result.rows_affected() == 0 {
        return Err(Error::conflict("Recipe is already in shopping cart"));
    }

    Ok(summary)
}

pub async fn remove_from_shopping_cart(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM shopping_list WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found("Recipe is not in shopping cart"));
    }

    Ok(())
}

pub async fn list_favorites(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeSummary>, Error> {
    let rows: Vec<RecipeSummary> = sqlx::query_as(
        "
        SELECT r.id AS id, r.name AS name, r.image AS image, r.cooking_time AS cooking_time
        FROM favorites f
        INNER JOIN recipes r ON r.id = f.recipe_id
        WHERE f.user_id = $1
        ORDER BY f.id
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(rows)
}

/// Self-follow is deliberately permitted.
pub async fn follow_author(
    user_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let author = get_user_by_id(pool, author_id).await?;
    if author.is_none() {
        return Err(Error::not_found("No user exists with specified id"));
    }

    let result = sqlx::query(
        "INSERT INTO follows (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING;",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(|e| unique_conflict(e, "Already following this author"))?;

    if result.rows_affected() == 0 {
        return Err(Error::conflict("Already following this author"));
    }

    Ok(())
}

pub async fn unfollow_author(
    user_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found("Not following this author"));
    }

    Ok(())
}

pub async fn list_follows(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<UserProfile>, Error> {
    let rows: Vec<UserProfile> = sqlx::query_as(
        "
        SELECT u.id AS id, u.email AS email, u.username AS username,
               u.first_name AS first_name, u.last_name AS last_name
        FROM follows f
        INNER JOIN users u ON u.id = f.author_id
        WHERE f.user_id = $1
        ORDER BY f.id
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(rows)
}

/// Sums the shopping cart of a user into one deduplicated ingredient manifest.
/// Pure read; no side effects.
pub async fn build_shopping_manifest(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<ManifestEntry>, Error> {
    let rows: Vec<ManifestRow> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_list s
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = s.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE s.user_id = $1
        ORDER BY s.id, ri.id
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(fold_manifest(rows))
}

/// Groups rows by ingredient name and sums the amounts, keeping encounter
/// order and the unit of the first row seen under each name. Two ingredient
/// records sharing a name merge into one line; that is intended behavior.
pub fn fold_manifest(rows: Vec<ManifestRow>) -> Vec<ManifestEntry> {
    let mut entries: Vec<ManifestEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        match index.get(&row.name) {
            Some(i) => entries[*i].amount += row.amount as i64,
            None => {
                index.insert(row.name.clone(), entries.len());
                entries.push(ManifestEntry {
                    name: row.name,
                    measurement_unit: row.measurement_unit,
                    amount: row.amount as i64,
                });
            }
        }
    }

    entries
}
