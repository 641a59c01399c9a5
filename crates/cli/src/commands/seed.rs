//! Seed the database with the default catalog, games, badges, and quiz
//! questions.
//!
//! Each table is only seeded when it is empty, so re-running the command
//! never duplicates or overwrites operator-edited rows.
//!
//! # Usage
//!
//! ```bash
//! kudos seed
//! ```

use sqlx::SqlitePool;
use tracing::info;

use kudos_engine::EngineConfig;
use kudos_engine::db::{MIGRATOR, create_pool};

/// (id, name, description, icon, display_order)
const CATEGORIES: &[(&str, &str, &str, &str, i64)] = &[
    ("cosmetics", "Cosmetics", "Profile themes, chat bubbles & more", "🎨", 1),
    ("features", "Features", "Unlock premium features", "⚡", 2),
    ("powerups", "Power-ups", "Assistant enhancement items", "🤖", 3),
    ("utility", "Utility", "Useful items & tools", "🛠️", 4),
];

/// (id, category, name, description, price, item_type, item_value, stock, purchase_limit)
#[allow(clippy::type_complexity)]
const ITEMS: &[(&str, &str, &str, &str, i64, &str, &str, i64, i64)] = &[
    ("theme_dark", "cosmetics", "Dark Theme", "Dark mode for your profile", 500, "theme", "dark", -1, 0),
    ("theme_neon", "cosmetics", "Neon Theme", "Bright neon profile theme", 800, "theme", "neon", -1, 0),
    ("bubble_rounded", "cosmetics", "Rounded Bubbles", "Rounded chat bubbles", 300, "bubble", "rounded", -1, 0),
    ("bubble_modern", "cosmetics", "Modern Bubbles", "Modern chat bubble style", 400, "bubble", "modern", -1, 0),
    ("emoji_premium", "cosmetics", "Premium Emojis", "Exclusive emoji pack", 600, "emoji", "premium", -1, 0),
    ("voice_robot", "cosmetics", "Robot Voice", "Robot style voice", 700, "voice", "robot", -1, 0),
    ("fast_ai", "features", "Fast Responses", "Priority assistant responses", 1000, "feature", "fast_ai", -1, 0),
    ("long_memory", "features", "Long Memory", "Extended conversation memory", 1500, "feature", "long_memory", -1, 0),
    ("creative_mode", "features", "Creative Mode", "More creative responses", 1200, "feature", "creative_mode", -1, 0),
    ("xp_boost", "powerups", "XP Boost", "2x XP for 24 hours", 800, "powerup", "xp_boost", 10, 0),
    ("coin_boost", "powerups", "Coin Boost", "2x coins for 24 hours", 1000, "powerup", "coin_boost", 10, 0),
    ("name_change", "utility", "Name Change", "Change your display name", 2000, "utility", "name_change", 1, 1),
    ("profile_badge", "utility", "Special Badge", "A unique profile badge", 3000, "utility", "profile_badge", 1, 1),
];

/// (id, name, description, game_type, min_players, max_players, coin_reward, xp_reward)
const GAMES: &[(&str, &str, &str, &str, i64, i64, i64, i64)] = &[
    ("quiz", "Quiz Battle", "Test your knowledge", "quiz", 1, 2, 20, 15),
    ("memory", "Memory Game", "Test your memory", "memory", 1, 1, 15, 10),
    ("reaction", "Reaction Test", "How fast are you?", "reaction", 1, 2, 10, 5),
    ("puzzle", "Puzzle Challenge", "Solve the puzzle", "puzzle", 1, 1, 25, 20),
];

/// (id, name, description, requirement_type, requirement_value, coin_reward, xp_reward)
const BADGES: &[(&str, &str, &str, &str, i64, i64, i64)] = &[
    ("beginner", "Beginner", "Complete 10 chats", "messages", 10, 100, 50),
    ("social", "Socialite", "Make 5 friends", "friends", 5, 200, 100),
    ("gamer", "Gamer", "Play 10 games", "games", 10, 300, 150),
    ("streak_7", "7 Day Streak", "7 day login streak", "streak", 7, 500, 200),
    ("streak_30", "30 Day Streak", "30 day login streak", "streak", 30, 2000, 1000),
    ("shopper", "Shopper", "Buy 5 shop items", "purchases", 5, 400, 150),
];

/// (question, options JSON, correct_answer, difficulty)
const QUESTIONS: &[(&str, &str, i64, &str)] = &[
    (
        "Which planet is closest to the sun?",
        r#"["Venus","Mercury","Mars","Earth"]"#,
        1,
        "easy",
    ),
    (
        "What is the largest ocean on Earth?",
        r#"["Atlantic","Indian","Pacific","Arctic"]"#,
        2,
        "easy",
    ),
    (
        "How many sides does a hexagon have?",
        r#"["five","six","seven","eight"]"#,
        1,
        "easy",
    ),
    (
        "Which element has the chemical symbol O?",
        r#"["Gold","Osmium","Oxygen","Silver"]"#,
        2,
        "medium",
    ),
];

/// Seed every empty table with its defaults.
///
/// # Errors
///
/// Returns an error if configuration is missing or a query fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig::from_env()?;
    let pool = create_pool(&config.database_url).await?;
    MIGRATOR.run(&pool).await?;

    seed_categories(&pool).await?;
    seed_items(&pool).await?;
    seed_games(&pool).await?;
    seed_badges(&pool).await?;
    seed_questions(&pool).await?;

    info!("Seeding complete");
    Ok(())
}

async fn table_is_empty(pool: &SqlitePool, table: &str) -> Result<bool, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await?;
    Ok(count == 0)
}

fn now_ts() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(0))
}

async fn seed_categories(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    if !table_is_empty(pool, "shop_categories").await? {
        info!("shop_categories not empty, skipping");
        return Ok(());
    }
    let now = now_ts();
    for (id, name, description, icon, order) in CATEGORIES {
        sqlx::query(
            "INSERT INTO shop_categories (id, name, description, icon, display_order, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(icon)
        .bind(order)
        .bind(now)
        .execute(pool)
        .await?;
    }
    info!(count = CATEGORIES.len(), "seeded shop categories");
    Ok(())
}

async fn seed_items(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    if !table_is_empty(pool, "shop_items").await? {
        info!("shop_items not empty, skipping");
        return Ok(());
    }
    let now = now_ts();
    for (id, category, name, description, price, item_type, item_value, stock, limit) in ITEMS {
        sqlx::query(
            "INSERT INTO shop_items (id, category_id, name, description, price, item_type, \
             item_value, stock, purchase_limit, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(category)
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(item_type)
        .bind(item_value)
        .bind(stock)
        .bind(limit)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;
    }
    info!(count = ITEMS.len(), "seeded shop items");
    Ok(())
}

async fn seed_games(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    if !table_is_empty(pool, "games").await? {
        info!("games not empty, skipping");
        return Ok(());
    }
    let now = now_ts();
    for (id, name, description, game_type, min_players, max_players, coin_reward, xp_reward) in
        GAMES
    {
        sqlx::query(
            "INSERT INTO games (id, name, description, game_type, min_players, max_players, \
             coin_reward, xp_reward, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(game_type)
        .bind(min_players)
        .bind(max_players)
        .bind(coin_reward)
        .bind(xp_reward)
        .bind(now)
        .execute(pool)
        .await?;
    }
    info!(count = GAMES.len(), "seeded games");
    Ok(())
}

async fn seed_badges(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    if !table_is_empty(pool, "badges").await? {
        info!("badges not empty, skipping");
        return Ok(());
    }
    let now = now_ts();
    for (id, name, description, req_type, req_value, coin_reward, xp_reward) in BADGES {
        sqlx::query(
            "INSERT INTO badges (id, name, description, icon, requirement_type, \
             requirement_value, coin_reward, xp_reward, created_at) \
             VALUES (?, ?, ?, '🏆', ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(req_type)
        .bind(req_value)
        .bind(coin_reward)
        .bind(xp_reward)
        .bind(now)
        .execute(pool)
        .await?;
    }
    info!(count = BADGES.len(), "seeded badges");
    Ok(())
}

async fn seed_questions(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    if !table_is_empty(pool, "quiz_questions").await? {
        info!("quiz_questions not empty, skipping");
        return Ok(());
    }
    let now = now_ts();
    for (question, options, correct, difficulty) in QUESTIONS {
        sqlx::query(
            "INSERT INTO quiz_questions (question, options, correct_answer, difficulty, \
             created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(question)
        .bind(options)
        .bind(correct)
        .bind(difficulty)
        .bind(now)
        .execute(pool)
        .await?;
    }
    info!(count = QUESTIONS.len(), "seeded quiz questions");
    Ok(())
}
