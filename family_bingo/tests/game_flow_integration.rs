/// Integration tests for game flow scenarios
///
/// These tests drive the public service API through the lobby, play and end
/// phases: joining, starting, calling, buying, daubing and winning.
use family_bingo::{
    BingoCard, Game, GameCode, GameError, GameRules, GameService, GameStatus, GameStore,
    JoinOutcome, MemoryGameStore, Player, PlayerId, PlayerUpdate, WinOutcome,
};
use std::{collections::HashSet, sync::Arc};

fn known_card() -> BingoCard {
    BingoCard::from_rows([
        [1, 16, 31, 46, 61],
        [2, 17, 32, 47, 62],
        [3, 18, 0, 48, 63],
        [4, 19, 34, 49, 64],
        [5, 20, 35, 50, 65],
    ])
}

/// Playing game with the given players (all holding `known_card`) and calls.
async fn seeded_game(players: &[&str], called: &[u8]) -> (GameService, GameCode) {
    let store = Arc::new(MemoryGameStore::new());
    let code = GameCode::parse("FLOW").unwrap();

    let mut game = Game::new(code.clone(), PlayerId::new("host"));
    for id in players {
        game.players.push(Player::new(
            PlayerId::new(*id),
            id.to_string(),
            100,
            known_card(),
        ));
    }
    game.status = GameStatus::Playing;
    game.called_numbers = called.to_vec();
    game.current_number = called.last().copied();
    store.insert_new(&game).await.unwrap();

    (GameService::new(store, GameRules::default()), code)
}

#[tokio::test]
async fn test_scenario_a_lobby_and_joins() {
    let service = GameService::in_memory();
    let code = service.create_game(&PlayerId::new("host")).await.unwrap();

    let game = service.get_game(&code).await.unwrap();
    assert_eq!(game.status, GameStatus::Waiting);
    assert!(game.players.is_empty());
    assert!(game.called_numbers.is_empty());
    assert_eq!(game.current_number, None);

    for (id, name) in [("p1", "Grandma"), ("p2", "Leo")] {
        let outcome = service
            .join_game(&code, &PlayerId::new(id), name)
            .await
            .unwrap();
        assert_eq!(outcome, JoinOutcome::Joined);
    }

    let game = service.get_game(&code).await.unwrap();
    assert_eq!(game.players.len(), 2);
    for player in &game.players {
        assert_eq!(player.cards.len(), 1);
        assert_eq!(player.coins, 100);
        assert!(player.cards[0].validate().is_ok());
    }
}

#[tokio::test]
async fn test_lowercase_code_finds_game() {
    let service = GameService::in_memory();
    let code = service.create_game(&PlayerId::new("host")).await.unwrap();

    let typed = GameCode::parse(&code.as_str().to_lowercase()).unwrap();
    assert_eq!(service.get_game(&typed).await.unwrap().id, code);
}

#[tokio::test]
async fn test_scenario_b_start_calls_first_number() {
    let service = GameService::in_memory();
    let code = service.create_game(&PlayerId::new("host")).await.unwrap();
    service
        .join_game(&code, &PlayerId::new("p1"), "Ann")
        .await
        .unwrap();

    let first = service.start_game(&code).await.unwrap().unwrap();

    let game = service.get_game(&code).await.unwrap();
    assert_eq!(game.status, GameStatus::Playing);
    assert_eq!(game.current_number, Some(first));
    assert_eq!(game.called_numbers, vec![first]);
    assert!((1..=75).contains(&first));
}

#[tokio::test]
async fn test_scenario_c_fifth_call_completes_row() {
    let card = known_card();
    assert!(!card.has_bingo(&[1, 16, 31, 46]));
    assert!(card.has_bingo(&[1, 16, 31, 46, 61]));

    // The same through the service: the claim fails one short and succeeds after.
    let (service, code) = seeded_game(&["ann"], &[1, 16, 31, 46]).await;
    let ann = PlayerId::new("ann");
    assert!(matches!(
        service.declare_winner(&code, &ann).await,
        Err(GameError::NoBingo)
    ));

    let (service, code) = seeded_game(&["ann"], &[1, 16, 31, 46, 61]).await;
    assert!(service.declare_winner(&code, &ann).await.unwrap().is_declared());
}

#[tokio::test]
async fn test_scenario_d_cannot_afford_card() {
    let (service, code) = seeded_game(&["ann"], &[7]).await;
    let ann = PlayerId::new("ann");
    service
        .update_player_data(&code, &ann, PlayerUpdate::coins(90))
        .await
        .unwrap();

    let before = service.get_game(&code).await.unwrap();
    assert!(!service.buy_new_card(&code, &ann).await.unwrap());
    let after = service.get_game(&code).await.unwrap();

    assert_eq!(after.players[0].coins, 90);
    assert_eq!(after.players[0].cards, before.players[0].cards);
}

#[tokio::test]
async fn test_buying_cards_up_to_the_cap() {
    let (service, code) = seeded_game(&["ann"], &[7]).await;
    let ann = PlayerId::new("ann");

    assert_eq!(service.add_coins(&code, &ann).await.unwrap(), 600);
    assert_eq!(service.add_coins(&code, &ann).await.unwrap(), 1100);

    for expected_cards in 2..=5 {
        assert!(service.buy_new_card(&code, &ann).await.unwrap());
        let player = service.get_game(&code).await.unwrap().players[0].clone();
        assert_eq!(player.cards.len(), expected_cards);
    }

    // Five cards is the cap, however rich the player is.
    assert!(!service.buy_new_card(&code, &ann).await.unwrap());
    let player = service.get_game(&code).await.unwrap().players[0].clone();
    assert_eq!(player.cards.len(), 5);
    assert_eq!(player.coins, 1100 - 4 * 200);
}

#[tokio::test]
async fn test_scenario_e_daub_completes_line_and_wins() {
    let (service, code) = seeded_game(&["ann", "ben"], &[1, 16, 31, 46]).await;
    let ann = PlayerId::new("ann");

    let outcome = service.manual_mark(&code, &ann, 0, 61).await.unwrap();
    assert_eq!(outcome.coins, 50);
    assert!(outcome.bingo);
    assert!(matches!(outcome.win, Some(WinOutcome::Declared { .. })));

    let game = service.get_game(&code).await.unwrap();
    assert_eq!(game.status, GameStatus::Ended);
    let winner = game.winner.unwrap();
    assert_eq!(winner.id, ann);
    assert_eq!(winner.cards[0].manually_marked_numbers, vec![61]);

    // Ben completes the same line afterwards; the game is already decided.
    let err = service
        .manual_mark(&code, &PlayerId::new("ben"), 0, 61)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::WrongStatus { .. }));
}

#[tokio::test]
async fn test_declare_winner_is_idempotent() {
    let (service, code) = seeded_game(&["ann", "ben"], &[1, 16, 31, 46, 61]).await;
    let ann = PlayerId::new("ann");
    let ben = PlayerId::new("ben");

    assert!(service.declare_winner(&code, &ann).await.unwrap().is_declared());
    assert_eq!(
        service.declare_winner(&code, &ben).await.unwrap(),
        WinOutcome::AlreadyDecided {
            winner: Some(ann.clone())
        }
    );
    assert_eq!(
        service.declare_winner(&code, &ann).await.unwrap(),
        WinOutcome::AlreadyDecided {
            winner: Some(ann.clone())
        }
    );

    let game = service.get_game(&code).await.unwrap();
    assert_eq!(game.winner.unwrap().id, ann);
}

#[tokio::test]
async fn test_calls_are_distinct_until_exhausted() {
    let service = GameService::in_memory();
    let code = service.create_game(&PlayerId::new("host")).await.unwrap();
    service.start_game(&code).await.unwrap();

    for _ in 1..75 {
        assert!(service.call_number(&code).await.unwrap().is_some());
    }

    let full = service.get_game(&code).await.unwrap();
    let distinct: HashSet<u8> = full.called_numbers.iter().copied().collect();
    assert_eq!(full.called_numbers.len(), 75);
    assert_eq!(distinct, (1..=75).collect());
    assert_eq!(full.current_number, full.called_numbers.last().copied());

    assert_eq!(service.call_number(&code).await.unwrap(), None);
    assert_eq!(service.get_game(&code).await.unwrap(), full);
}

#[tokio::test]
async fn test_partial_call_sequence_has_no_repeats() {
    let service = GameService::in_memory();
    let code = service.create_game(&PlayerId::new("host")).await.unwrap();
    service.start_game(&code).await.unwrap();

    for _ in 0..29 {
        service.call_number(&code).await.unwrap();
    }

    let game = service.get_game(&code).await.unwrap();
    let distinct: HashSet<u8> = game.called_numbers.iter().copied().collect();
    assert_eq!(game.called_numbers.len(), 30);
    assert_eq!(distinct.len(), 30);
}

#[tokio::test]
async fn test_host_end_stops_play() {
    let (service, code) = seeded_game(&["ann"], &[7]).await;
    service.end_game(&code).await.unwrap();

    assert!(matches!(
        service.call_number(&code).await,
        Err(GameError::WrongStatus { .. })
    ));
    assert!(matches!(
        service.start_game(&code).await,
        Err(GameError::WrongStatus { .. })
    ));
    let game = service.get_game(&code).await.unwrap();
    assert_eq!(game.status, GameStatus::Ended);
    assert!(game.winner.is_none());
}

#[tokio::test]
async fn test_update_touches_only_target_player() {
    let (service, code) = seeded_game(&["ann", "ben"], &[7]).await;
    let before = service.get_game(&code).await.unwrap();

    service
        .update_player_data(&code, &PlayerId::new("ann"), PlayerUpdate::coins(5))
        .await
        .unwrap();

    let after = service.get_game(&code).await.unwrap();
    assert_eq!(after.players[0].coins, 5);
    assert_eq!(after.players[1], before.players[1]);
    assert_eq!(after.called_numbers, before.called_numbers);
}

#[tokio::test]
async fn test_missing_player_is_not_found() {
    let (service, code) = seeded_game(&["ann"], &[7]).await;
    let ghost = PlayerId::new("ghost");

    assert!(matches!(
        service.add_coins(&code, &ghost).await,
        Err(GameError::PlayerNotFound { .. })
    ));
    assert!(matches!(
        service.buy_new_card(&code, &ghost).await,
        Err(GameError::PlayerNotFound { .. })
    ));
}

#[tokio::test]
async fn test_leaderboard_reflects_progress() {
    let (service, code) = seeded_game(&["ann", "ben"], &[1, 16, 31]).await;

    for id in ["ann", "ben"] {
        service
            .refresh_best_numbers(&code, &PlayerId::new(id))
            .await
            .unwrap();
    }
    service
        .manual_mark(&code, &PlayerId::new("ben"), 0, 46)
        .await
        .unwrap();

    let board = service.leaderboard(&code).await.unwrap();
    assert_eq!(board[0].name, "ben");
    assert_eq!(board[0].best_numbers_to_bingo, Some(1));
    assert_eq!(board[0].manual_daubs, 1);
    assert_eq!(board[1].best_numbers_to_bingo, Some(2));
}
