//! Board square representation.

use std::fmt;

/// A square on the chess board, indexed 0-63.
///
/// Little-endian rank-file mapping: a1 = 0, h1 = 7, a8 = 56, h8 = 63.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(u8);

impl Square {
    /// Creates a square from zero-based file and rank indexes.
    #[inline]
    pub const fn from_coords(file: u8, rank: u8) -> Option<Self> {
        if file < 8 && rank < 8 {
            Some(Square(rank * 8 + file))
        } else {
            None
        }
    }

    /// Creates a square from index (0-63).
    #[inline]
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 64 {
            Some(Square(index))
        } else {
            None
        }
    }

    /// Parses a square from algebraic notation (e.g., "e4").
    pub fn from_algebraic(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        let file = chars.next()?;
        let rank = chars.next()?;
        if chars.next().is_some() || !('a'..='h').contains(&file) || !('1'..='8').contains(&rank)
        {
            return None;
        }
        Self::from_coords(file as u8 - b'a', rank as u8 - b'1')
    }

    /// Returns the index (0-63).
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Zero-based file (0 = a-file).
    #[inline]
    pub const fn file(self) -> u8 {
        self.0 % 8
    }

    /// Zero-based rank (0 = first rank).
    #[inline]
    pub const fn rank(self) -> u8 {
        self.0 / 8
    }
}

impl fmt::Debug for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Square({})", self)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            (b'a' + self.file()) as char,
            (b'1' + self.rank()) as char
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algebraic_round_trip_on_corners() {
        for name in ["a1", "h1", "a8", "h8", "e4"] {
            let sq = Square::from_algebraic(name).unwrap();
            assert_eq!(sq.to_string(), name);
        }
    }

    #[test]
    fn index_layout() {
        assert_eq!(Square::from_algebraic("a1").unwrap().index(), 0);
        assert_eq!(Square::from_algebraic("e4").unwrap().index(), 28);
        assert_eq!(Square::from_algebraic("h8").unwrap().index(), 63);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(Square::from_algebraic("i1"), None);
        assert_eq!(Square::from_algebraic("a9"), None);
        assert_eq!(Square::from_algebraic("e44"), None);
        assert_eq!(Square::from_algebraic(""), None);
        assert_eq!(Square::from_index(64), None);
    }

    proptest::proptest! {
        #[test]
        fn every_index_round_trips_through_algebraic(index in 0u8..64) {
            let sq = Square::from_index(index).unwrap();
            let parsed = Square::from_algebraic(&sq.to_string()).unwrap();
            proptest::prop_assert_eq!(parsed, sq);
            proptest::prop_assert_eq!(parsed.index(), index as usize);
        }
    }
}
