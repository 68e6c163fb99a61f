/// Concurrency tests for the mutation protocol
///
/// Many tasks hit the same game at once. Every write must land on the latest
/// record, so no join, credit or call may be lost and a game never gets two
/// winners.
use family_bingo::{
    BingoCard, Game, GameCode, GameRules, GameService, GameStatus, GameStore, GameUpdate,
    MemoryGameStore, Player, PlayerId, WinOutcome,
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

async fn seeded_game(n_players: usize, called: &[u8]) -> (GameService, GameCode) {
    let store = Arc::new(MemoryGameStore::new());
    let code = GameCode::parse("RACE").unwrap();

    let mut game = Game::new(code.clone(), PlayerId::new("host"));
    for i in 0..n_players {
        game.players.push(Player::new(
            PlayerId::new(format!("p{i}")),
            format!("Player {i}"),
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

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_simultaneous_joins_both_land() {
    let service = GameService::in_memory();
    let code = service.create_game(&PlayerId::new("host")).await.unwrap();

    let a = {
        let service = service.clone();
        let code = code.clone();
        tokio::spawn(async move { service.join_game(&code, &PlayerId::new("a"), "Ann").await })
    };
    let b = {
        let service = service.clone();
        let code = code.clone();
        tokio::spawn(async move { service.join_game(&code, &PlayerId::new("b"), "Ben").await })
    };

    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let game = service.get_game(&code).await.unwrap();
    let ids: Vec<&str> = game.players.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"a"));
    assert!(ids.contains(&"b"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_concurrent_joins_lose_nobody() {
    let service = GameService::in_memory();
    let code = service.create_game(&PlayerId::new("host")).await.unwrap();

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let service = service.clone();
            let code = code.clone();
            tokio::spawn(async move {
                service
                    .join_game(&code, &PlayerId::new(format!("p{i}")), &format!("Kid {i}"))
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let game = service.get_game(&code).await.unwrap();
    let unique: HashSet<_> = game.players.iter().map(|p| p.id.clone()).collect();
    assert_eq!(game.players.len(), 12);
    assert_eq!(unique.len(), 12);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_completions_produce_one_winner() {
    // Every player is one daub away from row 0.
    let (service, code) = seeded_game(6, &[1, 16, 31, 46]).await;

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let service = service.clone();
            let code = code.clone();
            tokio::spawn(async move {
                service
                    .manual_mark(&code, &PlayerId::new(format!("p{i}")), 0, 61)
                    .await
            })
        })
        .collect();

    let mut declared = 0;
    for handle in handles {
        // Late markers find the game ended; that is fine.
        if let Ok(outcome) = handle.await.unwrap()
            && matches!(outcome.win, Some(WinOutcome::Declared { .. }))
        {
            declared += 1;
        }
    }
    assert_eq!(declared, 1);

    let game = service.get_game(&code).await.unwrap();
    assert_eq!(game.status, GameStatus::Ended);
    assert!(game.winner.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_claims_keep_first_winner() {
    let (service, code) = seeded_game(8, &[1, 16, 31, 46, 61]).await;

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let service = service.clone();
            let code = code.clone();
            tokio::spawn(async move {
                service
                    .declare_winner(&code, &PlayerId::new(format!("p{i}")))
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut winners = Vec::new();
    for handle in handles {
        if let WinOutcome::Declared { winner } = handle.await.unwrap() {
            winners.push(winner.id);
        }
    }
    assert_eq!(winners.len(), 1);

    let game = service.get_game(&code).await.unwrap();
    assert_eq!(game.winner.unwrap().id, winners[0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_credits_all_apply() {
    let (service, code) = seeded_game(3, &[7]).await;

    let handles: Vec<_> = (0..15)
        .map(|i| {
            let service = service.clone();
            let code = code.clone();
            tokio::spawn(async move {
                service
                    .add_coins(&code, &PlayerId::new(format!("p{}", i % 3)))
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let game = service.get_game(&code).await.unwrap();
    for player in &game.players {
        assert_eq!(player.coins, 100 + 5 * 500);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_calls_interleaved_with_player_writes() {
    let (service, code) = seeded_game(2, &[7]).await;

    let caller = {
        let service = service.clone();
        let code = code.clone();
        tokio::spawn(async move {
            for _ in 0..40 {
                service.call_number(&code).await.unwrap();
            }
        })
    };
    let buyer = {
        let service = service.clone();
        let code = code.clone();
        tokio::spawn(async move {
            for _ in 0..20 {
                service.add_coins(&code, &PlayerId::new("p1")).await.unwrap();
            }
        })
    };

    caller.await.unwrap();
    buyer.await.unwrap();

    let game = service.get_game(&code).await.unwrap();
    let distinct: HashSet<u8> = game.called_numbers.iter().copied().collect();
    assert_eq!(game.called_numbers.len(), 41);
    assert_eq!(distinct.len(), 41);

    // Match awards from the calls and the top-ups both survive the races.
    let hits = game.called_numbers[1..]
        .iter()
        .filter(|n| known_card().contains(**n))
        .count() as u32;
    assert_eq!(game.players[0].coins, 100 + hits * 10);
    assert_eq!(game.players[1].coins, 100 + 20 * 500 + hits * 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_subscriber_sees_versions_in_order() {
    let (service, code) = seeded_game(2, &[7]).await;
    let mut subscription = service.subscribe(&code).await.unwrap();

    let writers: Vec<_> = (0..4)
        .map(|i| {
            let service = service.clone();
            let code = code.clone();
            tokio::spawn(async move {
                for _ in 0..10 {
                    service
                        .add_coins(&code, &PlayerId::new(format!("p{}", i % 2)))
                        .await
                        .unwrap();
                }
            })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap();
    }

    let mut last = 0;
    let mut final_game = None;
    while let Some(update) = subscription.try_recv() {
        let GameUpdate::Snapshot { version, game } = update else {
            panic!("game vanished");
        };
        assert!(version > last, "version {version} after {last}");
        last = version;
        final_game = Some(game);
    }

    // The newest state always arrives, even if interim ones were skipped.
    let stored = service.get_game(&code).await.unwrap();
    assert_eq!(final_game.as_deref(), Some(&stored));
}
