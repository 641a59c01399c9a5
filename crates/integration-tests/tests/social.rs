//! Friend requests, friendships, and blocks.

use kudos_engine::EngineError;
use kudos_engine::services::RequestOutcome;
use kudos_integration_tests::TestContext;

#[tokio::test]
async fn accepting_a_request_makes_a_symmetric_friendship() {
    let ctx = TestContext::new().await;
    let a = ctx.user("tg:1").await;
    let b = ctx.user("tg:2").await;
    let social = ctx.engine.social();

    let sent = social.send_request(&a, &b).await.expect("send");
    assert!(matches!(sent, RequestOutcome::Sent));

    let pending = social.pending_requests(&b).await.expect("pending");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].from_user, a);

    social.accept_request(&a, &b).await.expect("accept");
    assert!(social.are_friends(&a, &b).await.expect("a->b"));
    assert!(social.are_friends(&b, &a).await.expect("b->a"));
    assert_eq!(social.friends(&a).await.expect("friends").len(), 1);
    assert_eq!(social.friends(&b).await.expect("friends").len(), 1);
}

#[tokio::test]
async fn self_requests_are_rejected() {
    let ctx = TestContext::new().await;
    let a = ctx.user("tg:1").await;

    let err = ctx
        .engine
        .social()
        .send_request(&a, &a)
        .await
        .expect_err("send");
    assert!(matches!(err, EngineError::SelfReference { .. }));
}

#[tokio::test]
async fn a_pending_request_cannot_be_duplicated() {
    let ctx = TestContext::new().await;
    let a = ctx.user("tg:1").await;
    let b = ctx.user("tg:2").await;
    let social = ctx.engine.social();

    social.send_request(&a, &b).await.expect("send");
    let err = social.send_request(&a, &b).await.expect_err("resend");
    assert!(matches!(err, EngineError::RequestPending { .. }));
}

#[tokio::test]
async fn reciprocal_requests_auto_accept() {
    let ctx = TestContext::new().await;
    let a = ctx.user("tg:1").await;
    let b = ctx.user("tg:2").await;
    let social = ctx.engine.social();

    social.send_request(&a, &b).await.expect("send");
    let back = social.send_request(&b, &a).await.expect("send back");
    assert!(matches!(back, RequestOutcome::MutualAccepted));
    assert!(social.are_friends(&a, &b).await.expect("friends"));
}

#[tokio::test]
async fn friends_cannot_request_each_other_again() {
    let ctx = TestContext::new().await;
    let a = ctx.user("tg:1").await;
    let b = ctx.user("tg:2").await;
    let social = ctx.engine.social();

    social.send_request(&a, &b).await.expect("send");
    social.accept_request(&a, &b).await.expect("accept");

    let err = social.send_request(&a, &b).await.expect_err("resend");
    assert!(matches!(err, EngineError::AlreadyFriends { .. }));
}

#[tokio::test]
async fn a_rejected_request_can_be_sent_again() {
    let ctx = TestContext::new().await;
    let a = ctx.user("tg:1").await;
    let b = ctx.user("tg:2").await;
    let social = ctx.engine.social();

    social.send_request(&a, &b).await.expect("send");
    social.reject_request(&a, &b).await.expect("reject");
    assert!(social.pending_requests(&b).await.expect("pending").is_empty());

    let resent = social.send_request(&a, &b).await.expect("resend");
    assert!(matches!(resent, RequestOutcome::Sent));
    assert_eq!(social.pending_requests(&b).await.expect("pending").len(), 1);
}

#[tokio::test]
async fn accepting_without_a_pending_request_fails() {
    let ctx = TestContext::new().await;
    let a = ctx.user("tg:1").await;
    let b = ctx.user("tg:2").await;

    let err = ctx
        .engine
        .social()
        .accept_request(&a, &b)
        .await
        .expect_err("accept");
    assert!(matches!(err, EngineError::NoPendingRequest { .. }));
}

#[tokio::test]
async fn removing_a_friend_clears_both_directions() {
    let ctx = TestContext::new().await;
    let a = ctx.user("tg:1").await;
    let b = ctx.user("tg:2").await;
    let social = ctx.engine.social();

    social.send_request(&a, &b).await.expect("send");
    social.accept_request(&a, &b).await.expect("accept");

    social.remove_friend(&a, &b).await.expect("remove");
    assert!(!social.are_friends(&a, &b).await.expect("a->b"));
    assert!(!social.are_friends(&b, &a).await.expect("b->a"));

    let err = social.remove_friend(&a, &b).await.expect_err("remove again");
    assert!(matches!(err, EngineError::NotFriends { .. }));
}

#[tokio::test]
async fn blocking_severs_and_prevents_contact() {
    let ctx = TestContext::new().await;
    let a = ctx.user("tg:1").await;
    let b = ctx.user("tg:2").await;
    let social = ctx.engine.social();

    social.send_request(&a, &b).await.expect("send");
    social.accept_request(&a, &b).await.expect("accept");

    social.block(&a, &b).await.expect("block");
    assert!(!social.are_friends(&a, &b).await.expect("friends"));

    // neither side can open a new request while the block stands
    let err = social.send_request(&b, &a).await.expect_err("blocked send");
    assert!(matches!(err, EngineError::Blocked { .. }));
    let err = social.send_request(&a, &b).await.expect_err("blocker send");
    assert!(matches!(err, EngineError::Blocked { .. }));
}

#[tokio::test]
async fn block_list_tracks_active_blocks() {
    let ctx = TestContext::new().await;
    let a = ctx.user("tg:1").await;
    let b = ctx.user("tg:2").await;
    let social = ctx.engine.social();

    assert!(social.blocked_users(&a).await.expect("list").is_empty());

    social.block(&a, &b).await.expect("block");
    assert_eq!(social.blocked_users(&a).await.expect("list"), vec![b.clone()]);
    // the block is one-directional
    assert!(social.blocked_users(&b).await.expect("list").is_empty());

    social.unblock(&a, &b).await.expect("unblock");
    assert!(social.blocked_users(&a).await.expect("list").is_empty());
}

#[tokio::test]
async fn unblocking_restores_contact() {
    let ctx = TestContext::new().await;
    let a = ctx.user("tg:1").await;
    let b = ctx.user("tg:2").await;
    let social = ctx.engine.social();

    social.block(&a, &b).await.expect("block");
    social.unblock(&a, &b).await.expect("unblock");

    let sent = social.send_request(&b, &a).await.expect("send");
    assert!(matches!(sent, RequestOutcome::Sent));

    let err = social.unblock(&a, &b).await.expect_err("unblock again");
    assert!(matches!(err, EngineError::NotBlocked { .. }));
}
