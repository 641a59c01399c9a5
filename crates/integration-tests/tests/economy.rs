//! Ledger and daily-claim behavior.

use kudos_core::UserId;
use kudos_engine::EngineError;
use kudos_engine::db::{RepositoryError, UserRepository};
use kudos_integration_tests::{TestContext, now_ts};

const DAY: i64 = 24 * 60 * 60;

#[tokio::test]
async fn new_account_starts_with_configured_balance() {
    let ctx = TestContext::new().await;
    let user = ctx.user("tg:1").await;

    let balance = ctx.engine.economy().balance(&user).await.expect("balance");
    assert_eq!(balance, ctx.engine.config().economy.starting_balance);
}

#[tokio::test]
async fn credit_and_debit_move_the_balance() {
    let ctx = TestContext::new().await;
    let user = ctx.user("tg:1").await;
    let economy = ctx.engine.economy();

    let after_credit = economy.credit(&user, 500, "test").await.expect("credit");
    assert_eq!(after_credit, 1500);

    let after_debit = economy.debit(&user, 300, "test").await.expect("debit");
    assert_eq!(after_debit, 1200);
    assert_eq!(economy.balance(&user).await.expect("balance"), 1200);
}

#[tokio::test]
async fn debit_beyond_balance_is_rejected_and_preserves_funds() {
    let ctx = TestContext::new().await;
    let user = ctx.user("tg:1").await;
    let economy = ctx.engine.economy();

    let err = economy.debit(&user, 1500, "test").await.expect_err("overdraft");
    assert!(matches!(
        err,
        EngineError::InsufficientFunds {
            balance: 1000,
            required: 1500,
            ..
        }
    ));
    assert_eq!(economy.balance(&user).await.expect("balance"), 1000);
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let ctx = TestContext::new().await;
    let user = ctx.user("tg:1").await;
    let economy = ctx.engine.economy();

    for amount in [0, -50] {
        let err = economy.credit(&user, amount, "test").await.expect_err("credit");
        assert!(matches!(err, EngineError::InvalidAmount { .. }));
        let err = economy.debit(&user, amount, "test").await.expect_err("debit");
        assert!(matches!(err, EngineError::InvalidAmount { .. }));
    }
}

#[tokio::test]
async fn credit_to_unknown_user_fails() {
    let ctx = TestContext::new().await;
    let ghost = kudos_core::UserId::new("nope");

    let err = ctx
        .engine
        .economy()
        .credit(&ghost, 100, "test")
        .await
        .expect_err("missing user");
    assert!(matches!(err, EngineError::UserNotFound { .. }));
}

#[tokio::test]
async fn first_daily_claim_starts_a_streak() {
    let ctx = TestContext::new().await;
    let user = ctx.user("tg:1").await;

    let outcome = ctx
        .engine
        .economy()
        .claim_daily(&user)
        .await
        .expect("claim");
    assert_eq!(outcome.streak, 1);
    // base 1000 + 1 * 100 streak bonus
    assert_eq!(outcome.reward, 1100);
    assert_eq!(outcome.new_balance, 2100);
}

#[tokio::test]
async fn second_claim_within_a_day_is_rejected() {
    let ctx = TestContext::new().await;
    let user = ctx.user("tg:1").await;
    let economy = ctx.engine.economy();

    economy.claim_daily(&user).await.expect("first claim");
    let err = economy.claim_daily(&user).await.expect_err("second claim");
    assert!(matches!(err, EngineError::AlreadyClaimed { .. }));
    assert_eq!(economy.balance(&user).await.expect("balance"), 2100);
}

#[tokio::test]
async fn claim_within_forty_eight_hours_continues_the_streak() {
    let ctx = TestContext::new().await;
    let user = ctx.user("tg:1").await;
    let economy = ctx.engine.economy();
    let start = now_ts();

    economy.claim_daily_at(&user, start).await.expect("day 1");
    let outcome = economy
        .claim_daily_at(&user, start + 25 * 60 * 60)
        .await
        .expect("day 2");
    assert_eq!(outcome.streak, 2);
    assert_eq!(outcome.reward, 1200);
}

#[tokio::test]
async fn claim_after_a_missed_day_resets_the_streak() {
    let ctx = TestContext::new().await;
    let user = ctx.user("tg:1").await;
    let economy = ctx.engine.economy();
    let start = now_ts();

    economy.claim_daily_at(&user, start).await.expect("day 1");
    economy
        .claim_daily_at(&user, start + 25 * 60 * 60)
        .await
        .expect("day 2");

    let outcome = economy
        .claim_daily_at(&user, start + 25 * 60 * 60 + 3 * DAY)
        .await
        .expect("late claim");
    assert_eq!(outcome.streak, 1);
    assert_eq!(outcome.reward, 1100);
}

#[tokio::test]
async fn streak_bonus_is_capped() {
    let ctx = TestContext::new().await;
    let user = ctx.user("tg:1").await;
    let now = now_ts();

    sqlx::query("INSERT INTO daily_claims (user_id, last_claim, streak) VALUES (?, ?, 15)")
        .bind(user.as_str())
        .bind(now - 25 * 60 * 60)
        .execute(ctx.engine.pool())
        .await
        .expect("seed claim row");

    let outcome = ctx
        .engine
        .economy()
        .claim_daily_at(&user, now)
        .await
        .expect("claim");
    assert_eq!(outcome.streak, 16);
    // bonus would be 1600, capped at 1000
    assert_eq!(outcome.reward, 2000);
}

#[tokio::test]
async fn failed_claim_payout_releases_the_slot() {
    let ctx = TestContext::new().await;
    let ghost = UserId::new("nobody");
    let repo = UserRepository::new(ctx.engine.pool());

    let now = now_ts();
    let err = repo
        .try_claim(&ghost, now, 1, now - DAY, 1100)
        .await
        .expect_err("credit hits no user row");
    assert!(matches!(err, RepositoryError::NotFound));

    // the rolled-back transaction must not leave the slot taken
    let slots =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM daily_claims WHERE user_id = ?")
            .bind(&ghost)
            .fetch_one(ctx.engine.pool())
            .await
            .expect("count slots");
    assert_eq!(slots, 0);
}

#[tokio::test]
async fn concurrent_claims_resolve_to_one_winner() {
    let ctx = TestContext::new().await;
    let user = ctx.user("tg:1").await;

    let economy = ctx.engine.economy();
    let (a, b) = tokio::join!(economy.claim_daily(&user), economy.claim_daily(&user));

    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one claim must win");
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(
        loser.expect_err("loser"),
        EngineError::AlreadyClaimed { .. }
    ));

    // only one reward was paid out
    assert_eq!(economy.balance(&user).await.expect("balance"), 2100);
}
