use thiserror::Error;

use crate::board::Board;
use crate::types::{Color, EndReason, GameState, GameStatus, Player};

/// Why a move attempt left the state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveRejection {
    #[error("game is not in progress")]
    NotPlaying,
    #[error("it is not the player's turn")]
    NotYourTurn,
    #[error("placement flips nothing")]
    IllegalPlacement,
}

impl GameState {
    /// Empty room: initial board, black to move, nobody seated.
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            current_player: Color::Black,
            players: Vec::new(),
            status: GameStatus::Waiting,
            winner: None,
            pass_count: 0,
            end_reason: None,
        }
    }

    /// Fresh match already in progress for an existing roster.
    pub fn rematch(players: Vec<Player>) -> Self {
        Self {
            players,
            status: GameStatus::Playing,
            ..Self::new()
        }
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }

    fn finish(&self, board: Board, reason: EndReason, pass_count: u32) -> Self {
        Self {
            board,
            status: GameStatus::Finished,
            winner: Some(board.determine_winner()),
            end_reason: Some(reason),
            pass_count,
            ..self.clone()
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

/// Advances `state` by one placement from `player_id`.
///
/// Contract:
/// - `Err` means the state must be treated as unchanged.
/// - Annihilation and full board are checked before turn handover.
/// - A reply-less opponent costs one pass; if neither side can move the game
///   ends with `BothPass` and the pass counter grows by two.
pub fn process_move(
    state: &GameState,
    row: u8,
    col: u8,
    player_id: &str,
) -> Result<GameState, MoveRejection> {
    if state.status != GameStatus::Playing {
        return Err(MoveRejection::NotPlaying);
    }

    let mover = state.current_player;
    match state.player(player_id) {
        Some(player) if player.color == mover => {}
        _ => return Err(MoveRejection::NotYourTurn),
    }

    if state.board.flippable(row, col, mover).is_empty() {
        return Err(MoveRejection::IllegalPlacement);
    }

    let board = state.board.apply_move(row, col, mover);

    if let Some(reason @ (EndReason::Annihilated | EndReason::Full)) = board.check_game_end(0) {
        return Ok(state.finish(board, reason, 0));
    }

    let opponent = mover.opponent();
    if board.has_valid_move(opponent) {
        return Ok(GameState {
            board,
            current_player: opponent,
            pass_count: 0,
            ..state.clone()
        });
    }

    if board.has_valid_move(mover) {
        return Ok(GameState {
            board,
            current_player: mover,
            pass_count: state.pass_count + 1,
            ..state.clone()
        });
    }

    Ok(state.finish(board, EndReason::BothPass, state.pass_count + 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::tests::board_from_rows;
    use crate::types::{PieceCount, Winner};

    const BLACK_ID: &str = "conn-black";
    const WHITE_ID: &str = "conn-white";

    fn roster() -> Vec<Player> {
        vec![
            Player {
                id: BLACK_ID.to_string(),
                color: Color::Black,
                name: "Alice".to_string(),
            },
            Player {
                id: WHITE_ID.to_string(),
                color: Color::White,
                name: "Bob".to_string(),
            },
        ]
    }

    fn playing_with(board: Board, current_player: Color) -> GameState {
        GameState {
            board,
            current_player,
            ..GameState::rematch(roster())
        }
    }

    #[test]
    fn initial_state_is_waiting_with_black_to_move() {
        let state = GameState::new();

        assert_eq!(state.status, GameStatus::Waiting);
        assert_eq!(state.current_player, Color::Black);
        assert!(state.players.is_empty());
        assert_eq!(state.winner, None);
        assert_eq!(state.end_reason, None);
        assert_eq!(state.pass_count, 0);
        assert_eq!(state.board.count(), PieceCount { black: 2, white: 2 });
    }

    #[test]
    fn opening_move_hands_turn_to_white() {
        let state = GameState::rematch(roster());

        let next = process_move(&state, 2, 3, BLACK_ID).unwrap();

        assert_eq!(next.current_player, Color::White);
        assert_eq!(next.pass_count, 0);
        assert_eq!(next.status, GameStatus::Playing);
        assert_eq!(next.board.cell(3, 3), Some(Color::Black));
        assert_eq!(next.players, state.players);
    }

    #[test]
    fn handover_clears_earlier_pass() {
        let state = GameState {
            pass_count: 1,
            ..GameState::rematch(roster())
        };

        let next = process_move(&state, 2, 3, BLACK_ID).unwrap();

        assert_eq!(next.current_player, Color::White);
        assert_eq!(next.pass_count, 0);
        assert_eq!(next.status, GameStatus::Playing);
    }

    #[test]
    fn rejects_when_not_playing() {
        let state = GameState {
            players: roster(),
            ..GameState::new()
        };

        assert_eq!(
            process_move(&state, 2, 3, BLACK_ID),
            Err(MoveRejection::NotPlaying)
        );
    }

    #[test]
    fn rejects_wrong_player_and_unknown_sender() {
        let state = GameState::rematch(roster());

        assert_eq!(
            process_move(&state, 2, 3, WHITE_ID),
            Err(MoveRejection::NotYourTurn)
        );
        assert_eq!(
            process_move(&state, 2, 3, "stranger"),
            Err(MoveRejection::NotYourTurn)
        );
    }

    #[test]
    fn rejects_placement_that_flips_nothing() {
        let state = GameState::rematch(roster());

        assert_eq!(
            process_move(&state, 0, 0, BLACK_ID),
            Err(MoveRejection::IllegalPlacement)
        );
        assert_eq!(
            process_move(&state, 3, 3, BLACK_ID),
            Err(MoveRejection::IllegalPlacement)
        );
        assert_eq!(
            process_move(&state, 8, 8, BLACK_ID),
            Err(MoveRejection::IllegalPlacement)
        );
    }

    #[test]
    fn opponent_without_reply_passes_once() {
        let board = board_from_rows([
            "BW......",
            "........",
            "........",
            "........",
            "........",
            "........",
            "........",
            "BW......",
        ]);
        let state = playing_with(board, Color::Black);

        let next = process_move(&state, 0, 2, BLACK_ID).unwrap();

        assert_eq!(next.status, GameStatus::Playing);
        assert_eq!(next.current_player, Color::Black);
        assert_eq!(next.pass_count, 1);
        assert_eq!(next.winner, None);
        assert_eq!(next.end_reason, None);
    }

    #[test]
    fn neither_side_moving_ends_with_both_pass() {
        let board = board_from_rows([
            "BW......",
            "........",
            "........",
            "........",
            "........",
            "........",
            "........",
            ".......W",
        ]);
        let state = playing_with(board, Color::Black);

        let next = process_move(&state, 0, 2, BLACK_ID).unwrap();

        assert_eq!(next.status, GameStatus::Finished);
        assert_eq!(next.end_reason, Some(EndReason::BothPass));
        assert_eq!(next.winner, Some(Winner::Black));
        assert_eq!(next.pass_count, 2);
    }

    #[test]
    fn capturing_last_opponent_stone_annihilates() {
        let board = board_from_rows([
            ".WB.....",
            "........",
            "........",
            "........",
            "........",
            "........",
            "........",
            "........",
        ]);
        let state = GameState {
            pass_count: 1,
            ..playing_with(board, Color::Black)
        };

        let next = process_move(&state, 0, 0, BLACK_ID).unwrap();

        assert_eq!(next.status, GameStatus::Finished);
        assert_eq!(next.end_reason, Some(EndReason::Annihilated));
        assert_eq!(next.winner, Some(Winner::Black));
        assert_eq!(next.pass_count, 0);
    }

    #[test]
    fn filling_last_square_ends_with_full_board() {
        let empty_and_black = 0b111u64;
        let board = Board::from_bitboards(0b100, (u64::MAX ^ empty_and_black) | 0b010);
        let state = playing_with(board, Color::Black);

        let next = process_move(&state, 0, 0, BLACK_ID).unwrap();

        assert!(next.board.is_full());
        assert_eq!(next.status, GameStatus::Finished);
        assert_eq!(next.end_reason, Some(EndReason::Full));
        assert_eq!(next.winner, Some(Winner::White));
        assert_eq!(next.board.count(), PieceCount { black: 3, white: 61 });
    }

    #[test]
    fn rejection_leaves_caller_state_untouched() {
        let state = GameState::rematch(roster());
        let before = state.clone();

        let _ = process_move(&state, 0, 0, BLACK_ID);
        let _ = process_move(&state, 2, 3, BLACK_ID);

        assert_eq!(state, before);
    }
}
