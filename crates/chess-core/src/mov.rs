//! Compact move identifier in UCI long algebraic notation.

use crate::{Piece, Square};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a UCI move string cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid UCI move: '{0}'")]
pub struct MoveParseError(pub String);

/// Origin, destination and optional promotion piece of a move
/// (e.g. `e2e4`, `e7e8q`).
///
/// This carries no legality information; the rules engine that produced
/// the transcript is trusted for that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UciMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Piece>,
}

impl UciMove {
    /// Parses a move from UCI notation.
    pub fn parse(s: &str) -> Result<Self, MoveParseError> {
        let err = || MoveParseError(s.to_string());
        if !s.is_ascii() || !(4..=5).contains(&s.len()) {
            return Err(err());
        }
        let from = Square::from_algebraic(&s[0..2]).ok_or_else(err)?;
        let to = Square::from_algebraic(&s[2..4]).ok_or_else(err)?;
        let promotion = match s[4..].chars().next() {
            Some(c) => Some(Piece::from_promotion_char(c).ok_or_else(err)?),
            None => None,
        };
        if from == to {
            return Err(err());
        }
        Ok(Self { from, to, promotion })
    }

    /// Returns true if the move promotes a pawn.
    #[inline]
    pub fn is_promotion(&self) -> bool {
        self.promotion.is_some()
    }
}

impl fmt::Display for UciMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(piece) = self.promotion {
            write!(f, "{}", piece.to_char())?;
        }
        Ok(())
    }
}

impl FromStr for UciMove {
    type Err = MoveParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for UciMove {
    type Error = MoveParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UciMove> for String {
    fn from(mv: UciMove) -> Self {
        mv.to_string()
    }
}
