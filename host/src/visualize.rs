// Simple ASCII visualization of a session snapshot.
//
// Legend:
//   .  untouched cell          o  targeted, nothing there
//   X  destroyed piece         C  classical piece
//   G  half of a ghost piece   B  half of a biased piece
//
// With `reveal` off, active pieces are hidden so the board can be shown to
// the side doing the guessing.

use qfleet_core::{Cell, PieceKind, SessionPhase, SessionSnapshot};

pub fn display_board_str(snapshot: &SessionSnapshot, reveal: bool) -> String {
    let size = snapshot.config.board_size;
    let mut out = String::from("   ");
    for x in 0..size {
        out.push_str(&format!("{:2} ", x));
    }
    out.push('\n');

    for y in 0..size {
        out.push_str(&format!("{:2} ", y));
        for x in 0..size {
            out.push_str(&format!(" {} ", cell_char(snapshot, Cell::new(x, y), reveal)));
        }
        out.push('\n');
    }
    out
}

fn cell_char(snapshot: &SessionSnapshot, cell: Cell, reveal: bool) -> char {
    match snapshot.piece_at(cell) {
        Some(piece) if !piece.is_active() => 'X',
        Some(piece) if reveal => match piece.kind() {
            PieceKind::Classical => 'C',
            PieceKind::Ghost => 'G',
            PieceKind::Biased => 'B',
        },
        _ if snapshot.targeted.contains(&cell) => 'o',
        _ => '.',
    }
}

/// One-line HUD: rounds, remaining pieces, oracle backend and phase.
pub fn status_line(snapshot: &SessionSnapshot) -> String {
    let phase = match snapshot.phase {
        SessionPhase::Placing => "ready".to_string(),
        SessionPhase::Resolving { target } => format!("resolving {target}"),
        SessionPhase::Won => "fleet destroyed".to_string(),
        SessionPhase::Lost => "fleet survived".to_string(),
    };
    format!(
        "round {:02}/{}  pieces {}  collapses {}  oracle {}  [{}]",
        snapshot.stats.rounds_used,
        snapshot.config.round_limit,
        snapshot.stats.active_pieces,
        snapshot.stats.collapses,
        snapshot.oracle,
        phase
    )
}

pub fn display_board(snapshot: &SessionSnapshot, reveal: bool) {
    println!("{}", status_line(snapshot));
    print!("{}", display_board_str(snapshot, reveal));
}
