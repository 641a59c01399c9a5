//! Badge requirement evaluation and grant idempotency.

use kudos_integration_tests::{TestContext, now_ts};

#[tokio::test]
async fn message_badge_lands_on_the_threshold_message() {
    let ctx = TestContext::new().await;
    let badge = ctx.seed_badge("chatty", "messages", 3, 100, 50).await;
    ctx.user("tg:1").await;
    let users = ctx.engine.users();

    let first = users.record_message("tg:1").await.expect("message 1");
    assert!(first.new_badges.is_empty());
    users.record_message("tg:1").await.expect("message 2");

    let third = users.record_message("tg:1").await.expect("message 3");
    assert_eq!(third.new_badges.len(), 1);
    assert_eq!(third.new_badges[0].id, badge);
}

#[tokio::test]
async fn badge_rewards_are_credited() {
    let ctx = TestContext::new().await;
    ctx.seed_badge("chatty", "messages", 1, 100, 50).await;
    let user = ctx.user("tg:1").await;

    let outcome = ctx
        .engine
        .users()
        .record_message("tg:1")
        .await
        .expect("message");
    assert_eq!(outcome.new_badges.len(), 1);

    // starting 1000 + 5 per message + 100 badge reward
    let balance = ctx.engine.economy().balance(&user).await.expect("balance");
    assert_eq!(balance, 1105);

    // badge XP lands on the level record
    let record = ctx.engine.progression().level(&user).await.expect("level");
    assert_eq!(record.total_xp, 60);
}

#[tokio::test]
async fn a_badge_is_granted_at_most_once() {
    let ctx = TestContext::new().await;
    ctx.seed_badge("chatty", "messages", 1, 100, 50).await;
    let user = ctx.user("tg:1").await;
    let badges = ctx.engine.badges();

    ctx.engine
        .users()
        .record_message("tg:1")
        .await
        .expect("message");
    assert_eq!(badges.earned(&user).await.expect("earned").len(), 1);

    // re-evaluating after the grant finds nothing new
    let again = badges.evaluate(&user).await.expect("evaluate");
    assert!(again.is_empty());
    assert_eq!(badges.earned(&user).await.expect("earned").len(), 1);
}

#[tokio::test]
async fn game_badges_count_completed_sessions() {
    let ctx = TestContext::new().await;
    ctx.seed_badge("gamer", "games", 2, 300, 150).await;
    let user = ctx.user("tg:1").await;
    let game = ctx.seed_game("memory", 1, 1, 15, 10).await;
    let games = ctx.engine.games();
    let badges = ctx.engine.badges();

    let s1 = games.create_session(&game, &user).await.expect("create");
    games.end_session(&s1.id, Some(&user)).await.expect("end");
    assert!(badges.earned(&user).await.expect("earned").is_empty());

    let s2 = games.create_session(&game, &user).await.expect("create");
    games.end_session(&s2.id, Some(&user)).await.expect("end");

    // the second end's fan-out evaluates badges itself
    let earned = badges.earned(&user).await.expect("earned");
    assert_eq!(earned.len(), 1);
}

#[tokio::test]
async fn streak_badges_read_the_claim_streak() {
    let ctx = TestContext::new().await;
    let badge = ctx.seed_badge("regular", "streak", 2, 500, 200).await;
    let user = ctx.user("tg:1").await;
    let economy = ctx.engine.economy();
    let start = now_ts();

    economy.claim_daily_at(&user, start).await.expect("day 1");
    economy
        .claim_daily_at(&user, start + 25 * 60 * 60)
        .await
        .expect("day 2");

    let granted = ctx.engine.badges().evaluate(&user).await.expect("evaluate");
    assert_eq!(granted.len(), 1);
    assert_eq!(granted[0].id, badge);
}

#[tokio::test]
async fn purchase_badges_count_distinct_purchases() {
    let ctx = TestContext::new().await;
    let badge = ctx.seed_badge("shopper", "purchases", 2, 400, 150).await;
    let user = ctx.user("tg:1").await;
    let item = ctx.seed_item("pin", 10, "utility", -1, 0).await;
    let shop = ctx.engine.shop();

    let first = shop.purchase(&user, &item, 1).await.expect("purchase 1");
    assert!(first.new_badges.is_empty());

    let second = shop.purchase(&user, &item, 1).await.expect("purchase 2");
    assert_eq!(second.new_badges.len(), 1);
    assert_eq!(second.new_badges[0].id, badge);
}

#[tokio::test]
async fn friend_badges_count_friendships() {
    let ctx = TestContext::new().await;
    let badge = ctx.seed_badge("social", "friends", 1, 200, 100).await;
    let a = ctx.user("tg:1").await;
    let b = ctx.user("tg:2").await;
    let social = ctx.engine.social();

    social.send_request(&a, &b).await.expect("request");
    social.accept_request(&a, &b).await.expect("accept");

    let granted = ctx.engine.badges().evaluate(&a).await.expect("evaluate");
    assert_eq!(granted.len(), 1);
    assert_eq!(granted[0].id, badge);
}
