// Game drivers: a scripted demo and a line-based interactive session.
//
// Both drive a `qfleet_core::Session` the same way: the player lays out the
// fleet, then the system fires one shot per turn at a randomly chosen
// untargeted cell until the fleet is gone or the round budget runs out.
// All drawing is plain text.

use std::io::{BufRead, Write};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use qfleet_core::{Cell, DualKind, GameConfig, RandomOracle, Session, SessionError, SessionPhase, SessionSnapshot, ShotOutcome};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::visualize::{display_board, display_board_str, status_line};

/// A parsed line of player input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Classical(Cell),
    Dual { kind: DualKind, a: Cell, b: Cell, bias: Option<f64> },
    RandomFleet,
    Show,
    Fire,
    Forfeit,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<_> = s.split_whitespace().collect();
        let Some((head, args)) = parts.split_first() else {
            return Ok(Command::Fire);
        };
        let coords = |args: &[&str]| -> Result<Vec<u32>, String> {
            args.iter().map(|a| a.parse::<u32>().map_err(|_| format!("invalid coordinate '{a}'"))).collect()
        };
        match (head.to_ascii_lowercase().as_str(), args.len()) {
            ("c", 2) => {
                let v = coords(args)?;
                Ok(Command::Classical(Cell::new(v[0], v[1])))
            }
            ("g", 4) => {
                let v = coords(args)?;
                Ok(Command::Dual { kind: DualKind::Ghost, a: Cell::new(v[0], v[1]), b: Cell::new(v[2], v[3]), bias: None })
            }
            ("b", 4 | 5) => {
                let v = coords(&args[..4])?;
                let bias = match args.get(4) {
                    Some(w) => Some(w.parse::<f64>().map_err(|_| format!("invalid weight '{w}'"))?),
                    None => None,
                };
                Ok(Command::Dual { kind: DualKind::Biased, a: Cell::new(v[0], v[1]), b: Cell::new(v[2], v[3]), bias })
            }
            ("r" | "random", 0) => Ok(Command::RandomFleet),
            ("show", 0) => Ok(Command::Show),
            ("fire", 0) => Ok(Command::Fire),
            ("f" | "forfeit", 0) => Ok(Command::Forfeit),
            ("q" | "quit", 0) => Ok(Command::Quit),
            _ => Err(format!("unrecognised command '{}'", s.trim())),
        }
    }
}

/// Take one turn: resolve the pending target if an earlier attempt failed,
/// otherwise pick a fresh one. `Ok(None)` means no target was available.
pub fn fire<R: Rng + ?Sized>(session: &mut Session, rng: &mut R) -> Result<Option<(Cell, ShotOutcome)>, SessionError> {
    let target = match session.pending_target() {
        Some(pending) => pending,
        None => match session.pick_target(rng)? {
            Some(t) => t,
            None => return Ok(None),
        },
    };
    let outcome = session.resolve(target)?;
    Ok(Some((target, outcome)))
}

fn describe(outcome: ShotOutcome) -> &'static str {
    match outcome {
        ShotOutcome::HitClassicalDestroyed => "Direct hit! Classical piece destroyed.",
        ShotOutcome::HitCollapsedDestroyed => "Collapse! The piece was caught and destroyed.",
        ShotOutcome::HitCollapsedSurvived => "Collapse! The piece escaped to its other cell.",
        ShotOutcome::Miss => "Miss.",
    }
}

/// Place the fleet randomly and let the system fire until the session ends.
/// Oracle failures forfeit the shot and play continues.
pub fn run_demo(config: &GameConfig, oracle: Arc<dyn RandomOracle>, seed: u64) -> Result<SessionSnapshot> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut session = Session::new(config.clone(), oracle)?;
    session.place_remaining_randomly(&mut rng)?;
    println!("{}", display_board_str(&session.snapshot(), true));

    while !session.phase().is_terminal() {
        match fire(&mut session, &mut rng) {
            Ok(Some((target, outcome))) => println!("{target}: {}", describe(outcome)),
            Ok(None) => break,
            Err(e) if e.is_oracle_failure() => {
                println!("Oracle failed ({e}); shot forfeited.");
                session.forfeit_pending()?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let snapshot = session.snapshot();
    display_board(&snapshot, true);
    Ok(snapshot)
}

const HELP: &str = "\
Placement: c x y | g x1 y1 x2 y2 | b x1 y1 x2 y2 [weight] | r (random fill)
Battle:    <enter> or fire | f (forfeit a stuck shot) | show | q";

/// Interactive session over any line-based input/output.
pub fn play<I: BufRead, O: Write, R: Rng>(mut input: I, mut output: O, mut session: Session, rng: &mut R) -> Result<SessionSnapshot> {
    writeln!(output, "{HELP}")?;
    writeln!(output, "{}", display_board_str(&session.snapshot(), true))?;

    while !session.phase().is_terminal() {
        let inv = session.remaining_inventory();
        if inv.total() > 0 {
            write!(output, "Left to place: {} classical, {} ghost, {} biased > ", inv.classical, inv.ghost, inv.biased)?;
        } else {
            write!(output, "{} > ", status_line(&session.snapshot()))?;
        }
        output.flush().ok();

        let mut line = String::new();
        if input.read_line(&mut line).context("reading input")? == 0 {
            break;
        }
        let command = match line.parse::<Command>() {
            Ok(c) => c,
            Err(msg) => {
                writeln!(output, "{msg}")?;
                continue;
            }
        };

        let placing = session.remaining_inventory().total() > 0 && session.rounds_used() == 0;
        let result = match command {
            Command::Quit => break,
            Command::Show => {
                writeln!(output, "{}", display_board_str(&session.snapshot(), true))?;
                continue;
            }
            Command::Classical(cell) => session.place_classical(cell).map(|id| format!("Placed classical piece {id} at {cell}.")),
            Command::Dual { kind, a, b, bias } => {
                session.place_dual(kind, a, b, bias).map(|id| format!("Placed {kind:?} piece {id} over {a} and {b}."))
            }
            Command::RandomFleet => session.place_remaining_randomly(rng).map(|ids| format!("Placed {} pieces at random.", ids.len())),
            // Enter during placement should not start the battle by accident.
            Command::Fire if placing => Ok("Place the rest of the fleet first (or 'r' to fill at random).".to_string()),
            Command::Fire => match fire(&mut session, rng) {
                Ok(Some((target, outcome))) => Ok(format!("System fires at {target}. {}", describe(outcome))),
                Ok(None) => Ok("No cells left to target.".to_string()),
                Err(e) => Err(e),
            },
            Command::Forfeit => session.forfeit_pending().map(|cell| format!("Shot at {cell} forfeited.")),
        };
        match result {
            Ok(msg) => writeln!(output, "{msg}")?,
            Err(e) if e.is_oracle_failure() => writeln!(output, "{e}. Press enter to retry or 'f' to forfeit the shot.")?,
            Err(e) => writeln!(output, "{e}")?,
        }
    }

    let snapshot = session.snapshot();
    match snapshot.phase {
        SessionPhase::Won => writeln!(output, "The system wins: fleet destroyed.")?,
        SessionPhase::Lost => writeln!(output, "You held out for {} rounds and win!", snapshot.stats.rounds_used)?,
        _ => writeln!(output, "Session abandoned.")?,
    }
    writeln!(output, "{}", display_board_str(&snapshot, true))?;
    Ok(snapshot)
}

/// `play` on stdin/stdout with an entropy-seeded RNG.
pub fn run_interactive(config: &GameConfig, oracle: Arc<dyn RandomOracle>) -> Result<SessionSnapshot> {
    let session = Session::new(config.clone(), oracle)?;
    let stdin = std::io::stdin();
    let mut rng = StdRng::from_entropy();
    play(stdin.lock(), std::io::stdout(), session, &mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("c 2 3".parse(), Ok(Command::Classical(Cell::new(2, 3))));
        assert_eq!(
            "g 0 0 1 1".parse(),
            Ok(Command::Dual { kind: DualKind::Ghost, a: Cell::new(0, 0), b: Cell::new(1, 1), bias: None })
        );
        assert_eq!(
            "B 4 4 5 5 0.9".parse(),
            Ok(Command::Dual { kind: DualKind::Biased, a: Cell::new(4, 4), b: Cell::new(5, 5), bias: Some(0.9) })
        );
        assert_eq!("".parse(), Ok(Command::Fire));
        assert_eq!("  \n".parse(), Ok(Command::Fire));
        assert_eq!("q".parse(), Ok(Command::Quit));
        assert!("c 1".parse::<Command>().is_err());
        assert!("c -1 2".parse::<Command>().is_err());
        assert!("b 0 0 1 1 heavy".parse::<Command>().is_err());
    }
}
