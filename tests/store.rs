//! Store-level tests covering the toggle and replacement paths that only a
//! live database can exercise. Run them against a scratch Postgres with
//! `DATABASE_URL=... cargo test -- --ignored`.

use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

use kokkaus_sdk::actions;
use kokkaus_sdk::error::Error;
use kokkaus_sdk::jwt::SessionData;
use kokkaus_sdk::schema::{IngredientSpec, RecipeWrite, UserRole, Uuid};
use kokkaus_sdk::MIGRATOR;

fn unique(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{prefix}{nanos}")
}

async fn pool() -> Pool<Postgres> {
    let url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must point at a scratch Postgres database");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .unwrap();
    MIGRATOR.run(&pool).await.unwrap();
    pool
}

async fn seed_user(pool: &Pool<Postgres>) -> SessionData {
    let handle = unique("cook");
    let email = format!("{handle}@example.com");
    let user_id = actions::register_user(&email, &handle, "Kaisa", "Kokki", "hunter2", pool)
        .await
        .unwrap();

    SessionData {
        user_id,
        email,
        username: handle,
        role: UserRole::User,
        is_admin: false,
    }
}

async fn seed_ingredient(pool: &Pool<Postgres>) -> Uuid {
    let row: (Uuid,) =
        sqlx::query_as("INSERT INTO ingredients (name, measurement_unit) VALUES ($1, 'g') RETURNING id")
            .bind(unique("flour"))
            .fetch_one(pool)
            .await
            .unwrap();
    row.0
}

async fn seed_tag(pool: &Pool<Postgres>) -> Uuid {
    let marker = unique("tag");
    let row: (Uuid,) =
        sqlx::query_as("INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING id")
            .bind(&marker)
            .bind(&marker)
            .bind(&marker)
            .fetch_one(pool)
            .await
            .unwrap();
    row.0
}

fn write_payload(name: String, ingredients: Vec<IngredientSpec>, tags: Vec<Uuid>) -> RecipeWrite {
    RecipeWrite {
        name,
        text: "Boil everything".to_string(),
        image: "image/soup.png".to_string(),
        cooking_time: 30,
        ingredients,
        tags,
    }
}

#[tokio::test]
#[ignore = "needs DATABASE_URL pointing at a scratch Postgres"]
async fn second_favorite_add_conflicts_and_second_remove_is_not_found() {
    let pool = pool().await;
    let session = seed_user(&pool).await;
    let ingredient = seed_ingredient(&pool).await;
    let tag = seed_tag(&pool).await;
    let recipe = actions::create_recipe(
        &session,
        write_payload(
            unique("Soup"),
            vec![IngredientSpec {
                id: ingredient,
                amount: 200,
            }],
            vec![tag],
        ),
        &pool,
    )
    .await
    .unwrap();

    actions::add_to_favorites(recipe.id, session.user_id, &pool)
        .await
        .unwrap();
    let second = actions::add_to_favorites(recipe.id, session.user_id, &pool).await;
    assert!(matches!(second, Err(Error::Conflict(_))));

    actions::remove_from_favorites(recipe.id, session.user_id, &pool)
        .await
        .unwrap();
    let gone = actions::remove_from_favorites(recipe.id, session.user_id, &pool).await;
    assert!(matches!(gone, Err(Error::NotFound(_))));
}

#[tokio::test]
#[ignore = "needs DATABASE_URL pointing at a scratch Postgres"]
async fn second_cart_add_conflicts_and_second_remove_is_not_found() {
    let pool = pool().await;
    let session = seed_user(&pool).await;
    let ingredient = seed_ingredient(&pool).await;
    let tag = seed_tag(&pool).await;
    let recipe = actions::create_recipe(
        &session,
        write_payload(
            unique("Stew"),
            vec![IngredientSpec {
                id: ingredient,
                amount: 100,
            }],
            vec![tag],
        ),
        &pool,
    )
    .await
    .unwrap();

    actions::add_to_shopping_cart(recipe.id, session.user_id, &pool)
        .await
        .unwrap();
    let second = actions::add_to_shopping_cart(recipe.id, session.user_id, &pool).await;
    assert!(matches!(second, Err(Error::Conflict(_))));

    actions::remove_from_shopping_cart(recipe.id, session.user_id, &pool)
        .await
        .unwrap();
    let gone = actions::remove_from_shopping_cart(recipe.id, session.user_id, &pool).await;
    assert!(matches!(gone, Err(Error::NotFound(_))));
}

#[tokio::test]
#[ignore = "needs DATABASE_URL pointing at a scratch Postgres"]
async fn second_follow_conflicts_and_second_unfollow_is_not_found() {
    let pool = pool().await;
    let follower = seed_user(&pool).await;
    let author = seed_user(&pool).await;

    actions::follow_author(follower.user_id, author.user_id, &pool)
        .await
        .unwrap();
    let second = actions::follow_author(follower.user_id, author.user_id, &pool).await;
    assert!(matches!(second, Err(Error::Conflict(_))));

    actions::unfollow_author(follower.user_id, author.user_id, &pool)
        .await
        .unwrap();
    let gone = actions::unfollow_author(follower.user_id, author.user_id, &pool).await;
    assert!(matches!(gone, Err(Error::NotFound(_))));
}

#[tokio::test]
#[ignore = "needs DATABASE_URL pointing at a scratch Postgres"]
async fn replacement_drops_stale_ingredients_and_tags() {
    let pool = pool().await;
    let session = seed_user(&pool).await;
    let first = seed_ingredient(&pool).await;
    let second = seed_ingredient(&pool).await;
    let third = seed_ingredient(&pool).await;
    let old_tag = seed_tag(&pool).await;
    let new_tag = seed_tag(&pool).await;

    let recipe = actions::create_recipe(
        &session,
        write_payload(
            unique("Bread"),
            vec![
                IngredientSpec {
                    id: first,
                    amount: 400,
                },
                IngredientSpec {
                    id: second,
                    amount: 50,
                },
            ],
            vec![old_tag],
        ),
        &pool,
    )
    .await
    .unwrap();
    assert_eq!(recipe.ingredients.len(), 2);

    let replaced = actions::replace_recipe(
        recipe.id,
        &session,
        write_payload(
            recipe.name.clone(),
            vec![IngredientSpec {
                id: third,
                amount: 25,
            }],
            vec![new_tag],
        ),
        &pool,
    )
    .await
    .unwrap();

    let ingredient_ids: Vec<Uuid> = replaced.ingredients.iter().map(|i| i.id).collect();
    assert_eq!(ingredient_ids, vec![third]);
    assert_eq!(replaced.ingredients[0].amount, 25);

    let tag_ids: Vec<Uuid> = replaced.tags.iter().map(|t| t.id).collect();
    assert_eq!(tag_ids, vec![new_tag]);
}
