//! XP grants, level-ups, and their coin payouts.

use kudos_engine::EngineError;
use kudos_integration_tests::TestContext;

#[tokio::test]
async fn fresh_accounts_start_at_level_one() {
    let ctx = TestContext::new().await;
    let user = ctx.user("tg:1").await;

    let record = ctx.engine.progression().level(&user).await.expect("level");
    assert_eq!(record.level, 1);
    assert_eq!(record.xp, 0);
    assert_eq!(record.total_xp, 0);
    assert_eq!(record.next_level_xp, 100);
}

#[tokio::test]
async fn grant_below_threshold_accumulates() {
    let ctx = TestContext::new().await;
    let user = ctx.user("tg:1").await;

    let outcome = ctx
        .engine
        .progression()
        .grant_xp(&user, 60)
        .await
        .expect("grant");
    assert!(!outcome.leveled_up());
    assert_eq!(outcome.record.level, 1);
    assert_eq!(outcome.record.xp, 60);
    assert_eq!(outcome.coins_awarded, 0);

    // no level-up, no coin payout
    let balance = ctx.engine.economy().balance(&user).await.expect("balance");
    assert_eq!(balance, 1000);
}

#[tokio::test]
async fn single_grant_can_cross_multiple_levels() {
    let ctx = TestContext::new().await;
    let user = ctx.user("tg:1").await;

    // 250 XP from (1, 0, 100): consumes 100 -> level 2 (next 150),
    // consumes 150 -> level 3 (next 225), nothing left over.
    let outcome = ctx
        .engine
        .progression()
        .grant_xp(&user, 250)
        .await
        .expect("grant");
    assert_eq!(outcome.levels_gained, 2);
    assert_eq!(outcome.record.level, 3);
    assert_eq!(outcome.record.xp, 0);
    assert_eq!(outcome.record.total_xp, 250);
    assert_eq!(outcome.record.next_level_xp, 225);

    // 200 for reaching level 2, 300 for level 3
    assert_eq!(outcome.coins_awarded, 500);
    let balance = ctx.engine.economy().balance(&user).await.expect("balance");
    assert_eq!(balance, 1500);
}

#[tokio::test]
async fn non_positive_grants_are_rejected() {
    let ctx = TestContext::new().await;
    let user = ctx.user("tg:1").await;

    let err = ctx
        .engine
        .progression()
        .grant_xp(&user, 0)
        .await
        .expect_err("grant");
    assert!(matches!(err, EngineError::InvalidAmount { amount: 0 }));
}

#[tokio::test]
async fn concurrent_grants_lose_no_xp() {
    let ctx = TestContext::new().await;
    let user = ctx.user("tg:1").await;
    let progression = ctx.engine.progression();

    let (a, b) = tokio::join!(progression.grant_xp(&user, 60), progression.grant_xp(&user, 60));
    a.expect("first grant");
    b.expect("second grant");

    // 120 XP total: one threshold of 100 consumed, 20 carried over.
    let record = progression.level(&user).await.expect("level");
    assert_eq!(record.level, 2);
    assert_eq!(record.xp, 20);
    assert_eq!(record.total_xp, 120);

    let balance = ctx.engine.economy().balance(&user).await.expect("balance");
    assert_eq!(balance, 1200);
}
