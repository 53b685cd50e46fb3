use std::io::Cursor;
use std::sync::Arc;

use qfleet_core::{
    Cell, DualKind, GameConfig, Inventory, LocalOracle, Outcome, ReplayOracle, Session, SessionPhase, ShotOutcome,
};
use qfleet_host::config::HostConfig;
use qfleet_host::game::{fire, play, run_demo};
use qfleet_host::visualize::{display_board_str, status_line};
use rand::{rngs::StdRng, Rng, SeedableRng};

// End-to-end games driven through the host layer: visualisation, the demo
// loop, scripted interactive sessions and randomized full games.

fn inventory(classical: u32, ghost: u32, biased: u32) -> Inventory {
    Inventory { classical, ghost, biased, ..Inventory::empty() }
}

fn run_script(config: GameConfig, oracle: Arc<dyn qfleet_core::RandomOracle>, script: &str) -> (qfleet_core::SessionSnapshot, String) {
    let session = Session::new(config, oracle).unwrap();
    let mut out = Vec::new();
    let mut rng = StdRng::seed_from_u64(5);
    let snapshot = play(Cursor::new(script.to_string()), &mut out, session, &mut rng).unwrap();
    (snapshot, String::from_utf8(out).unwrap())
}

#[test]
fn test_visualization_hidden_and_revealed() {
    let mut s = Session::new(GameConfig::new(8, 30, inventory(1, 1, 0)), Arc::new(ReplayOracle::new([Outcome::One])))
        .unwrap();
    s.place_classical((0, 0)).unwrap();
    s.place_dual(DualKind::Ghost, (2, 2), (3, 3), None).unwrap();

    let hidden = display_board_str(&s.snapshot(), false);
    let revealed = display_board_str(&s.snapshot(), true);
    assert!(!hidden.contains('C') && !hidden.contains('G'), "hidden board leaked piece markers");
    assert!(revealed.contains('C'));
    assert_eq!(revealed.matches('G').count(), 2);

    // Ghost escapes to (3, 3); the old cell shows as a plain targeted cell.
    assert_eq!(s.resolve((2, 2)), Ok(ShotOutcome::HitCollapsedSurvived));
    let revealed = display_board_str(&s.snapshot(), true);
    assert_eq!(revealed.matches('G').count(), 0);
    assert_eq!(revealed.matches('C').count(), 2);
    assert_eq!(revealed.matches('o').count(), 1);

    assert_eq!(s.resolve((0, 0)), Ok(ShotOutcome::HitClassicalDestroyed));
    let hidden = display_board_str(&s.snapshot(), false);
    assert_eq!(hidden.matches('X').count(), 1);
    assert!(!hidden.contains('C'));
    assert!(status_line(&s.snapshot()).contains("round 02/30"));
}

#[test]
fn test_demo_is_reproducible_for_a_seed() {
    let config = GameConfig::default();
    let first = run_demo(&config, Arc::new(LocalOracle::seeded(11)), 3).unwrap();
    let second = run_demo(&config, Arc::new(LocalOracle::seeded(11)), 3).unwrap();

    assert!(first.phase.is_terminal());
    assert_eq!(first.phase, second.phase);
    assert_eq!(first.history, second.history);
    assert_eq!(first.pieces, second.pieces);
    assert_ne!(first.id, second.id);
    assert_ne!(first.commit().unwrap(), second.commit().unwrap());
}

#[test]
fn test_randomized_full_game_simulations() {
    for seed in 0_u64..10_u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let oracle = Arc::new(LocalOracle::seeded(rng.gen()));
        let mut session = Session::new(GameConfig::default(), oracle).unwrap();
        session.place_remaining_randomly(&mut rng).unwrap();
        assert_eq!(session.fleet().len(), 6);

        while !session.phase().is_terminal() {
            assert!(fire(&mut session, &mut rng).unwrap().is_some());
        }

        let snapshot = session.snapshot();
        assert!(snapshot.stats.rounds_used <= 30, "seed {seed}: round budget exceeded");
        assert_eq!(snapshot.targeted.len() as u32, snapshot.stats.rounds_used);
        assert_eq!(snapshot.history.len() as u32, snapshot.stats.rounds_used);
        let collapses = snapshot.history.iter().filter(|r| r.collapsed_to.is_some()).count() as u32;
        assert_eq!(collapses, snapshot.stats.collapses);
        match snapshot.phase {
            SessionPhase::Won => assert_eq!(snapshot.stats.active_pieces, 0, "seed {seed}"),
            SessionPhase::Lost => {
                assert!(snapshot.stats.active_pieces > 0, "seed {seed}");
                assert_eq!(snapshot.stats.rounds_used, 30);
            }
            other => panic!("seed {seed}: unexpected phase {other:?}"),
        }
    }
}

#[test]
fn test_fire_retries_and_forfeits_after_oracle_failure() {
    // Two ghosts cover the whole 2x2 board, so every shot needs the oracle.
    let mut s = Session::new(GameConfig::new(2, 4, inventory(0, 2, 0)), Arc::new(ReplayOracle::default())).unwrap();
    s.place_dual(DualKind::Ghost, (0, 0), (0, 1), None).unwrap();
    s.place_dual(DualKind::Ghost, (1, 0), (1, 1), None).unwrap();
    let mut rng = StdRng::seed_from_u64(1);

    let err = fire(&mut s, &mut rng).unwrap_err();
    assert!(err.is_oracle_failure());
    let pending = s.pending_target().unwrap();

    assert!(fire(&mut s, &mut rng).unwrap_err().is_oracle_failure());
    assert_eq!(s.pending_target(), Some(pending));
    assert_eq!(s.board().targeted_count(), 1);

    assert_eq!(s.forfeit_pending(), Ok(pending));
    assert_eq!(s.pending_target(), None);
    assert_eq!(s.rounds_used(), 1);
    assert_eq!(s.fleet().active_count(), 2);
    assert!(s.history().is_empty());
}

#[test]
fn test_scripted_play_until_fleet_destroyed() {
    // 16 cells and 16 rounds: the lone piece is always found.
    let config = GameConfig::new(4, 16, inventory(1, 0, 0));
    let script = format!("\nbogus\nc 0 0\n{}", "\n".repeat(20));
    let (snapshot, out) = run_script(config, Arc::new(LocalOracle::seeded(2)), &script);

    assert_eq!(snapshot.phase, SessionPhase::Won);
    assert!(out.contains("Place the rest of the fleet first"));
    assert!(out.contains("unrecognised command 'bogus'"));
    assert!(out.contains("Placed classical piece #1 at (0, 0)."));
    assert!(out.contains("Direct hit!"));
    assert!(out.contains("The system wins"));
    assert_eq!(snapshot.history.last().map(|r| r.target), Some(Cell::new(0, 0)));
}

#[test]
fn test_scripted_play_reports_placement_errors() {
    let config = GameConfig::new(8, 30, inventory(1, 0, 1));
    let script = "c 9 9\nb 0 0 1 1 1.5\nc 2 2\nb 2 2 3 3\nb 4 4 5 5\nq\n";
    let (snapshot, out) = run_script(config, Arc::new(LocalOracle::seeded(2)), script);

    assert!(out.contains("outside the 8x8 board"), "{out}");
    assert!(out.contains("1.5"), "{out}");
    assert!(out.contains("occupied"), "{out}");
    assert!(out.contains("Session abandoned."));
    assert_eq!(snapshot.phase, SessionPhase::Placing);
    assert_eq!(snapshot.pieces.len(), 2);
    // A biased piece without a weight takes the configured default.
    assert_eq!(snapshot.pieces[1].bias().map(|b| b.probability()), Some(0.75));
}

#[test]
fn test_scripted_play_oracle_failure_then_forfeit() {
    let config = GameConfig::new(2, 4, inventory(0, 2, 0));
    let script = "g 0 0 0 1\ng 1 0 1 1\n\n\nf\nq\n";
    let (snapshot, out) = run_script(config, Arc::new(ReplayOracle::default()), script);

    assert_eq!(out.matches("Press enter to retry").count(), 2);
    assert!(out.contains("forfeited"));
    assert_eq!(snapshot.stats.rounds_used, 1);
    assert_eq!(snapshot.phase, SessionPhase::Placing);
}

#[test]
fn test_host_config_drives_a_session() {
    let config: HostConfig = serde_json::from_str(
        r#"{
            "game": { "board_size": 5, "round_limit": 3, "inventory": { "classical": 1, "ghost": 0, "biased": 0 } },
            "oracle": { "backend": "local", "seed": 4 }
        }"#,
    )
    .unwrap();
    let oracle = config.oracle.build().unwrap();
    assert_eq!(oracle.name(), "local");

    let snapshot = run_demo(&config.game, oracle, 9).unwrap();
    assert!(snapshot.phase.is_terminal());
    assert!(snapshot.stats.rounds_used <= 3);
    assert_eq!(snapshot.config.board_size, 5);
}
