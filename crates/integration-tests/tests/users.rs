//! Account lifecycle, message accounting, and conversation memory.

use kudos_core::UserRole;
use kudos_engine::EngineError;
use kudos_integration_tests::TestContext;

#[tokio::test]
async fn creating_the_same_handle_twice_returns_one_account() {
    let ctx = TestContext::new().await;
    let users = ctx.engine.users();

    let first = users.create("tg:1", "Ada").await.expect("create");
    let second = users.create("tg:1", "Someone Else").await.expect("create again");
    assert_eq!(first.user_id, second.user_id);
    assert_eq!(second.display_name, "Ada");
}

#[tokio::test]
async fn accounts_resolve_by_internal_and_external_id() {
    let ctx = TestContext::new().await;
    let users = ctx.engine.users();

    let created = users.create("tg:1", "Ada").await.expect("create");
    let by_external = users.get("tg:1").await.expect("by external");
    let by_internal = users.get(created.user_id.as_str()).await.expect("by internal");
    assert_eq!(by_external.user_id, created.user_id);
    assert_eq!(by_internal.user_id, created.user_id);

    let err = users.get("tg:nobody").await.expect_err("missing");
    assert!(matches!(err, EngineError::UserNotFound { .. }));
}

#[tokio::test]
async fn new_accounts_get_a_referral_code() {
    let ctx = TestContext::new().await;
    let user = ctx
        .engine
        .users()
        .create("tg:1", "Ada")
        .await
        .expect("create");
    assert_eq!(user.referral_code.len(), 8);
}

#[tokio::test]
async fn recording_a_message_grants_coins_and_xp() {
    let ctx = TestContext::new().await;
    ctx.user("tg:1").await;

    let outcome = ctx
        .engine
        .users()
        .record_message("tg:1")
        .await
        .expect("record");
    assert_eq!(outcome.new_balance, 1005);
    assert!(!outcome.leveled_up);
    assert_eq!(outcome.level, 1);

    let user = ctx.engine.users().get("tg:1").await.expect("user");
    assert_eq!(user.total_requests, 1);
    assert_eq!(user.daily_requests, 1);
}

#[tokio::test]
async fn daily_usage_tracks_the_free_allowance() {
    let ctx = TestContext::new().await;
    ctx.user("tg:1").await;
    let users = ctx.engine.users();

    let fresh = users.daily_usage("tg:1").await.expect("usage");
    assert_eq!(fresh.used, 0);
    assert_eq!(fresh.limit, Some(100));
    assert_eq!(fresh.remaining(), Some(100));

    users.record_message("tg:1").await.expect("record");
    let used = users.daily_usage("tg:1").await.expect("usage");
    assert_eq!(used.used, 1);
    assert!(!used.exhausted());
}

#[tokio::test]
async fn moderators_have_no_daily_limit() {
    let ctx = TestContext::new().await;
    ctx.user("tg:1").await;
    ctx.force_role("tg:1", "moderator").await;

    let usage = ctx.engine.users().daily_usage("tg:1").await.expect("usage");
    assert_eq!(usage.limit, None);
    assert_eq!(usage.remaining(), None);
}

#[tokio::test]
async fn admins_can_change_roles_and_users_cannot() {
    let ctx = TestContext::new().await;
    let admin = ctx.user("tg:admin").await;
    let target = ctx.user("tg:2").await;
    ctx.force_role("tg:admin", "admin").await;
    let users = ctx.engine.users();

    let promoted = users
        .set_role(&admin, "tg:2", UserRole::Premium)
        .await
        .expect("promote");
    assert_eq!(promoted.role, UserRole::Premium);

    // premium raises the daily allowance
    let usage = users.daily_usage("tg:2").await.expect("usage");
    assert_eq!(usage.limit, Some(500));

    let err = users
        .set_role(&target, "tg:admin", UserRole::User)
        .await
        .expect_err("demote");
    assert!(matches!(err, EngineError::PermissionDenied { .. }));
}

#[tokio::test]
async fn conversation_memory_keeps_a_rolling_window() {
    let ctx = TestContext::new().await;
    ctx.user("tg:1").await;
    let users = ctx.engine.users();

    for i in 0..25 {
        users
            .remember("tg:1", "user", &format!("line {i}"))
            .await
            .expect("remember");
    }

    let log = users.recall("tg:1").await.expect("recall");
    assert_eq!(log.len(), 20);
    assert_eq!(log[0].content, "line 5");
    assert_eq!(log[19].content, "line 24");

    users.forget("tg:1").await.expect("forget");
    assert!(users.recall("tg:1").await.expect("recall").is_empty());
}

#[tokio::test]
async fn profile_updates_are_visible_through_the_cache() {
    let ctx = TestContext::new().await;
    let user = ctx.user("tg:1").await;
    let users = ctx.engine.users();

    // warm the cache
    users.get("tg:1").await.expect("warm");

    let patch = kudos_engine::models::UserPatch {
        display_name: Some("Grace".to_owned()),
        ..Default::default()
    };
    users.update_profile(&user, &patch).await.expect("update");

    let fresh = users.get("tg:1").await.expect("reread");
    assert_eq!(fresh.display_name, "Grace");
}
