//! Session lifecycle, rosters, and reward fan-out.

use kudos_core::{GameCommand, RowId, SessionStatus, UserId};
use kudos_engine::EngineError;
use kudos_engine::services::CommandOutcome;
use kudos_integration_tests::TestContext;

#[tokio::test]
async fn solo_games_start_active_immediately() {
    let ctx = TestContext::new().await;
    let user = ctx.user("tg:1").await;
    let game = ctx.seed_game("memory", 1, 1, 15, 10).await;

    let session = ctx
        .engine
        .games()
        .create_session(&game, &user)
        .await
        .expect("create");
    assert_eq!(session.status, SessionStatus::Active);
}

#[tokio::test]
async fn multiplayer_games_wait_for_a_roster() {
    let ctx = TestContext::new().await;
    let host = ctx.user("tg:1").await;
    let game = ctx.seed_game("quiz", 2, 2, 20, 15).await;
    let games = ctx.engine.games();

    let session = games.create_session(&game, &host).await.expect("create");
    assert_eq!(session.status, SessionStatus::Waiting);

    let players = games.players(&session.id).await.expect("players");
    assert_eq!(players.len(), 1);
    assert_eq!(players[0].user_id, host);

    let waiting = games.waiting_sessions(Some(&game)).await.expect("waiting");
    assert_eq!(waiting.len(), 1);
}

#[tokio::test]
async fn session_activates_when_the_minimum_roster_arrives() {
    let ctx = TestContext::new().await;
    let host = ctx.user("tg:1").await;
    let guest = ctx.user("tg:2").await;
    let game = ctx.seed_game("quiz", 2, 2, 20, 15).await;
    let games = ctx.engine.games();

    let session = games.create_session(&game, &host).await.expect("create");
    let joined = games.join_session(&session.id, &guest).await.expect("join");
    assert_eq!(joined.status, SessionStatus::Active);
    assert_eq!(games.players(&session.id).await.expect("players").len(), 2);
}

#[tokio::test]
async fn a_full_session_rejects_further_joins() {
    let ctx = TestContext::new().await;
    let host = ctx.user("tg:1").await;
    let guest = ctx.user("tg:2").await;
    let late = ctx.user("tg:3").await;
    let game = ctx.seed_game("quiz", 2, 2, 20, 15).await;
    let games = ctx.engine.games();

    let session = games.create_session(&game, &host).await.expect("create");
    games.join_session(&session.id, &guest).await.expect("join");

    let err = games
        .join_session(&session.id, &late)
        .await
        .expect_err("late join");
    assert!(matches!(err, EngineError::SessionFull { max_players: 2, .. }));
}

#[tokio::test]
async fn joining_twice_is_rejected() {
    let ctx = TestContext::new().await;
    let host = ctx.user("tg:1").await;
    let game = ctx.seed_game("quiz", 2, 3, 20, 15).await;
    let games = ctx.engine.games();

    let session = games.create_session(&game, &host).await.expect("create");
    let err = games
        .join_session(&session.id, &host)
        .await
        .expect_err("rejoin");
    assert!(matches!(err, EngineError::AlreadyJoined { .. }));
}

#[tokio::test]
async fn racing_joins_for_the_last_seat_resolve_to_one_winner() {
    let ctx = TestContext::new().await;
    let host = ctx.user("tg:1").await;
    let a = ctx.user("tg:2").await;
    let b = ctx.user("tg:3").await;
    let game = ctx.seed_game("quiz", 2, 2, 20, 15).await;
    let games = ctx.engine.games();

    let session = games.create_session(&game, &host).await.expect("create");
    let (ra, rb) = tokio::join!(
        games.join_session(&session.id, &a),
        games.join_session(&session.id, &b)
    );
    let successes = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "one seat, one winner");
    assert_eq!(games.players(&session.id).await.expect("players").len(), 2);
}

#[tokio::test]
async fn ending_rewards_the_winner_fully_and_others_half() {
    let ctx = TestContext::new().await;
    let host = ctx.user("tg:1").await;
    let guest = ctx.user("tg:2").await;
    let game = ctx.seed_game("quiz", 2, 2, 20, 15).await;
    let games = ctx.engine.games();

    let session = games.create_session(&game, &host).await.expect("create");
    games.join_session(&session.id, &guest).await.expect("join");

    let outcome = games
        .end_session(&session.id, Some(&guest))
        .await
        .expect("end");
    assert_eq!(outcome.session.status, SessionStatus::Ended);
    assert_eq!(outcome.session.winner.as_ref(), Some(&guest));

    assert_eq!(outcome.rewards.len(), 2);
    assert_eq!(outcome.rewards[0].user, guest);
    assert_eq!(outcome.rewards[0].coins, 20);
    assert_eq!(outcome.rewards[0].xp, 15);
    assert_eq!(outcome.rewards[1].user, host);
    assert_eq!(outcome.rewards[1].coins, 10);
    assert_eq!(outcome.rewards[1].xp, 7);

    let economy = ctx.engine.economy();
    assert_eq!(economy.balance(&guest).await.expect("balance"), 1020);
    assert_eq!(economy.balance(&host).await.expect("balance"), 1010);
}

#[tokio::test]
async fn ending_without_a_winner_pays_everyone_half() {
    let ctx = TestContext::new().await;
    let host = ctx.user("tg:1").await;
    let guest = ctx.user("tg:2").await;
    let game = ctx.seed_game("quiz", 2, 2, 20, 15).await;
    let games = ctx.engine.games();

    let session = games.create_session(&game, &host).await.expect("create");
    games.join_session(&session.id, &guest).await.expect("join");

    let outcome = games.end_session(&session.id, None).await.expect("end");
    assert_eq!(outcome.session.status, SessionStatus::Ended);
    assert_eq!(outcome.session.winner, None);

    assert_eq!(outcome.rewards.len(), 2);
    for reward in &outcome.rewards {
        assert_eq!(reward.coins, 10);
        assert_eq!(reward.xp, 7);
    }

    let economy = ctx.engine.economy();
    assert_eq!(economy.balance(&host).await.expect("balance"), 1010);
    assert_eq!(economy.balance(&guest).await.expect("balance"), 1010);
}

#[tokio::test]
async fn abandoned_lobbies_grant_nothing() {
    let ctx = TestContext::new().await;
    let host = ctx.user("tg:1").await;
    let game = ctx.seed_game("quiz", 2, 2, 20, 15).await;
    let games = ctx.engine.games();

    let session = games.create_session(&game, &host).await.expect("create");
    let outcome = games.end_session(&session.id, None).await.expect("end");
    assert_eq!(outcome.session.status, SessionStatus::Ended);
    assert!(outcome.rewards.is_empty());
    assert_eq!(ctx.engine.economy().balance(&host).await.expect("balance"), 1000);
}

#[tokio::test]
async fn ending_twice_is_rejected() {
    let ctx = TestContext::new().await;
    let host = ctx.user("tg:1").await;
    let game = ctx.seed_game("memory", 1, 1, 15, 10).await;
    let games = ctx.engine.games();

    let session = games.create_session(&game, &host).await.expect("create");
    games.end_session(&session.id, Some(&host)).await.expect("end");

    let err = games
        .end_session(&session.id, Some(&host))
        .await
        .expect_err("double end");
    assert!(matches!(err, EngineError::SessionEnded { .. }));
}

#[tokio::test]
async fn the_winner_must_hold_a_seat() {
    let ctx = TestContext::new().await;
    let host = ctx.user("tg:1").await;
    let outsider = ctx.user("tg:2").await;
    let game = ctx.seed_game("memory", 1, 1, 15, 10).await;
    let games = ctx.engine.games();

    let session = games.create_session(&game, &host).await.expect("create");
    let err = games
        .end_session(&session.id, Some(&outsider))
        .await
        .expect_err("end");
    assert!(matches!(err, EngineError::WinnerNotInSession { .. }));
}

#[tokio::test]
async fn a_correct_answer_ends_the_session_with_the_answerer_winning() {
    let ctx = TestContext::new().await;
    let user = ctx.user("tg:1").await;
    let game = ctx.seed_game("quiz", 1, 2, 20, 15).await;
    let question = ctx
        .seed_question("2 + 2?", &["3", "4", "5"], 1)
        .await;
    let games = ctx.engine.games();

    let session = games.create_session(&game, &user).await.expect("create");
    let outcome = games
        .answer(&session.id, &user, question, 1)
        .await
        .expect("answer");
    assert!(outcome.correct);
    assert_eq!(outcome.correct_answer, 1);

    let end = outcome.end.expect("session ended");
    assert_eq!(end.session.winner.as_ref(), Some(&user));
    assert_eq!(end.rewards[0].coins, 20);
}

#[tokio::test]
async fn a_wrong_answer_changes_nothing() {
    let ctx = TestContext::new().await;
    let user = ctx.user("tg:1").await;
    let game = ctx.seed_game("quiz", 1, 2, 20, 15).await;
    let question = ctx
        .seed_question("2 + 2?", &["3", "4", "5"], 1)
        .await;
    let games = ctx.engine.games();

    let session = games.create_session(&game, &user).await.expect("create");
    let outcome = games
        .answer(&session.id, &user, question, 0)
        .await
        .expect("answer");
    assert!(!outcome.correct);
    assert!(outcome.end.is_none());

    let session = games.session(&session.id).await.expect("session");
    assert_eq!(session.status, SessionStatus::Active);
}

#[tokio::test]
async fn only_seated_players_may_answer() {
    let ctx = TestContext::new().await;
    let user = ctx.user("tg:1").await;
    let outsider = ctx.user("tg:2").await;
    let game = ctx.seed_game("quiz", 1, 2, 20, 15).await;
    let question = ctx.seed_question("2 + 2?", &["3", "4"], 1).await;
    let games = ctx.engine.games();

    let session = games.create_session(&game, &user).await.expect("create");
    let err = games
        .answer(&session.id, &outsider, question, 1)
        .await
        .expect_err("answer");
    assert!(matches!(err, EngineError::NotInSession { .. }));
}

#[tokio::test]
async fn commands_drive_the_full_quiz_flow() {
    let ctx = TestContext::new().await;
    let user = ctx.user("tg:1").await;
    let game = ctx.seed_game("quiz", 1, 2, 20, 15).await;
    let question = ctx.seed_question("2 + 2?", &["3", "4"], 1).await;
    let games = ctx.engine.games();

    let created = games
        .dispatch(&user, GameCommand::Create { game: game.clone() })
        .await
        .expect("create");
    let CommandOutcome::Created(session) = created else {
        panic!("expected a created session");
    };

    let answered = games
        .dispatch(
            &user,
            GameCommand::Answer {
                session: session.id.clone(),
                option: 1,
                question: RowId::new(question),
            },
        )
        .await
        .expect("answer");
    let CommandOutcome::Answered(outcome) = answered else {
        panic!("expected an answer outcome");
    };
    assert!(outcome.correct);
    assert_eq!(
        outcome.end.expect("ended").session.winner,
        Some(UserId::new(user.as_str()))
    );
}
