use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use family_bingo::{
    BingoCard, Game, GameCode, Player, PlayerId, generate_card,
    game::{has_bingo, numbers_to_bingo},
};
use rand::seq::SliceRandom;

/// Game with `n_players` players holding `cards_each` random cards and
/// `n_called` numbers called.
fn setup_game(n_players: usize, cards_each: usize, n_called: usize) -> Game {
    let mut game = Game::new(GameCode::parse("BNCH").unwrap(), PlayerId::new("host"));
    for i in 0..n_players {
        let mut player = Player::new(
            PlayerId::new(format!("p{i}")),
            format!("Player {i}"),
            100,
            generate_card(),
        );
        player.cards.extend((1..cards_each).map(|_| generate_card()));
        game.players.push(player);
    }

    let mut numbers: Vec<u8> = (1..=75).collect();
    numbers.shuffle(&mut rand::rng());
    game.called_numbers = numbers.into_iter().take(n_called).collect();
    game
}

/// Benchmark generating one card
fn bench_generate_card(c: &mut Criterion) {
    c.bench_function("generate_card", |b| {
        b.iter(generate_card);
    });
}

/// Benchmark line detection on a single card at different fill levels
fn bench_card_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("card_evaluation");
    let card: BingoCard = generate_card();

    for n_called in [5usize, 25, 50, 75] {
        let mut numbers: Vec<u8> = (1..=75).collect();
        numbers.shuffle(&mut rand::rng());
        numbers.truncate(n_called);

        group.bench_with_input(
            BenchmarkId::new("has_bingo", n_called),
            &numbers,
            |b, called| {
                b.iter(|| has_bingo(&card.card_data, called, &card.manually_marked_numbers));
            },
        );
        group.bench_with_input(
            BenchmarkId::new("numbers_to_bingo", n_called),
            &numbers,
            |b, called| {
                b.iter(|| numbers_to_bingo(&card.card_data, called, &card.manually_marked_numbers));
            },
        );
    }

    group.finish();
}

/// Benchmark scanning a whole game for winners (what every call triggers)
fn bench_players_with_bingo(c: &mut Criterion) {
    let mut group = c.benchmark_group("players_with_bingo");

    for n_players in [2usize, 10, 50] {
        let game = setup_game(n_players, 5, 30);
        group.bench_with_input(BenchmarkId::from_parameter(n_players), &game, |b, g| {
            b.iter(|| g.players_with_bingo().count());
        });
    }

    group.finish();
}

/// Benchmark serializing a snapshot as pushed to subscribers
fn bench_snapshot_json(c: &mut Criterion) {
    let game = setup_game(10, 3, 40);
    c.bench_function("snapshot_json", |b| {
        b.iter(|| serde_json::to_vec(&game).unwrap());
    });
}

criterion_group!(cards, bench_generate_card, bench_card_evaluation);

criterion_group!(game_operations, bench_players_with_bingo, bench_snapshot_json);

criterion_main!(cards, game_operations);
