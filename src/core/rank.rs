//! Rank comparison.
//!
//! Unit parameters and effect strengths are graded on the letter ladder
//! `E < D < C < B < A < EX`, optionally trailed by `+`/`-` modifiers
//! (`"A++"`, `"C-"`). Ranks order by numeric value: each letter is worth
//! 10 more than the one below and modifiers shift the value by 1 each,
//! clamped so no amount of stacking can bridge a letter boundary.
//!
//! Resistance negation is a rank comparison: a defense rank dominates an
//! attack rank when its value is greater or equal.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::error::{EngineError, Result};

/// Letter grades, weakest first so derived ordering matches the ladder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RankLetter {
    /// Bottom of the ladder.
    E,
    /// Below average.
    D,
    /// Average.
    C,
    /// Above average.
    B,
    /// Exceptional.
    A,
    /// Beyond rating.
    Ex,
}

impl RankLetter {
    /// Numeric worth of the bare letter (10 per step).
    #[must_use]
    pub const fn base_value(self) -> i32 {
        match self {
            Self::E => 0,
            Self::D => 10,
            Self::C => 20,
            Self::B => 30,
            Self::A => 40,
            Self::Ex => 50,
        }
    }

    /// Canonical string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::E => "E",
            Self::D => "D",
            Self::C => "C",
            Self::B => "B",
            Self::A => "A",
            Self::Ex => "EX",
        }
    }
}

/// A letter rank with its net modifier count.
///
/// `modifiers` is the number of `+` marks minus the number of `-` marks.
/// The count is stored unclamped; [`Rank::value`] clamps it to ±4.9 so
/// equality and ordering saturate past four modifiers.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Rank {
    /// Letter grade.
    pub letter: RankLetter,
    /// Net `+`/`-` count.
    pub modifiers: i8,
}

/// Widest modifier swing that still counts, in tenths.
const MODIFIER_CAP_TENTHS: i32 = 49;

impl Rank {
    /// Create an unmodified rank.
    #[must_use]
    pub const fn new(letter: RankLetter) -> Self {
        Self {
            letter,
            modifiers: 0,
        }
    }

    /// Create a rank with a net modifier count.
    #[must_use]
    pub const fn modified(letter: RankLetter, modifiers: i8) -> Self {
        Self { letter, modifiers }
    }

    /// Parse a rank string like `"A"`, `"EX"`, `"B++"` or `"c-"`.
    ///
    /// Case-insensitive. Anything other than one letter grade followed by
    /// `+`/`-` marks is an error; use [`Rank::parse_lossy`] at trust
    /// boundaries where a bad string must not abort the action.
    pub fn parse(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();

        let (letter, marks) = if let Some(rest) = upper.strip_prefix("EX") {
            (RankLetter::Ex, rest)
        } else {
            let mut chars = upper.chars();
            let letter = match chars.next() {
                Some('A') => RankLetter::A,
                Some('B') => RankLetter::B,
                Some('C') => RankLetter::C,
                Some('D') => RankLetter::D,
                Some('E') => RankLetter::E,
                _ => return Err(EngineError::MalformedRank(s.to_string())),
            };
            (letter, chars.as_str())
        };

        let mut modifiers: i8 = 0;
        for mark in marks.chars() {
            match mark {
                '+' => modifiers = modifiers.saturating_add(1),
                '-' => modifiers = modifiers.saturating_sub(1),
                _ => return Err(EngineError::MalformedRank(s.to_string())),
            }
        }

        Ok(Self { letter, modifiers })
    }

    /// Parse, falling back to an unmodified `E` on malformed input.
    ///
    /// Malformed rank strings come from untrusted payloads; the weakest
    /// rank is the fallback so bad data never grants strength.
    #[must_use]
    pub fn parse_lossy(s: &str) -> Self {
        match Self::parse(s) {
            Ok(rank) => rank,
            Err(_) => {
                tracing::warn!(rank = s, "unparseable rank, falling back to E");
                Self::new(RankLetter::E)
            }
        }
    }

    /// Comparison key in tenths: letter worth plus the clamped modifier swing.
    const fn key(self) -> i32 {
        let swing = self.modifiers as i32 * 10;
        let clamped = if swing > MODIFIER_CAP_TENTHS {
            MODIFIER_CAP_TENTHS
        } else if swing < -MODIFIER_CAP_TENTHS {
            -MODIFIER_CAP_TENTHS
        } else {
            swing
        };
        self.letter.base_value() * 10 + clamped
    }

    /// Numeric value: `base + clamp(modifiers, -4.9, 4.9)`.
    ///
    /// The clamp guarantees `E++++++` can never reach `D-` territory.
    #[must_use]
    pub fn value(self) -> f64 {
        f64::from(self.key()) / 10.0
    }

    /// Negation test: does this rank meet or beat `other`?
    ///
    /// Used with `self` as the defense rank and `other` as the attack rank.
    #[must_use]
    pub fn dominates(self, other: Self) -> bool {
        self >= other
    }
}

impl Default for Rank {
    fn default() -> Self {
        Self::new(RankLetter::E)
    }
}

impl PartialEq for Rank {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Rank {}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl Hash for Rank {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter.as_str())?;
        let mark = if self.modifiers >= 0 { '+' } else { '-' };
        for _ in 0..self.modifiers.unsigned_abs() {
            write!(f, "{}", mark)?;
        }
        Ok(())
    }
}
