//! Core types for chess.
//!
//! This crate provides the fundamental types shared by the analysis
//! pipeline:
//! - [`Piece`] and [`Color`] for piece representation
//! - [`Square`] for board coordinates
//! - [`UciMove`] for compact move identifiers
//! - [`Board`] for FEN board snapshots

mod color;
mod fen;
mod mov;
mod piece;
mod square;

pub use color::Color;
pub use fen::{Board, FenError};
pub use mov::{MoveParseError, UciMove};
pub use piece::Piece;
pub use square::Square;
