//! Dice formula parsing and evaluation.
//!
//! Effect magnitudes and territory bonuses are configured as dice
//! formula strings in the `NdS±K` shape: `"2d10+20"`, `"3d6"`, `"d10"`
//! (count defaults to 1), `"1d100-5"`. A bare integer like `"15"` is a
//! constant formula with no dice. Rolls are uniform per die and
//! deterministic given the room's RNG state.

use serde::{Deserialize, Serialize};

use super::rng::BattleRng;
use crate::error::{EngineError, Result};

/// A parsed `NdS±K` dice formula.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiceFormula {
    /// Number of dice rolled (0 for constant formulas).
    pub count: u32,
    /// Sides per die.
    pub sides: u32,
    /// Flat bonus added after the dice.
    pub bonus: i64,
}

impl DiceFormula {
    /// The zero formula: no dice, no bonus. Always rolls 0.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            count: 0,
            sides: 0,
            bonus: 0,
        }
    }

    /// A constant formula that always rolls `value`.
    #[must_use]
    pub const fn constant(value: i64) -> Self {
        Self {
            count: 0,
            sides: 0,
            bonus: value,
        }
    }

    /// Create a formula directly.
    #[must_use]
    pub const fn new(count: u32, sides: u32, bonus: i64) -> Self {
        Self {
            count,
            sides,
            bonus,
        }
    }

    /// Parse a formula string.
    ///
    /// Accepts `NdS`, `dS` (one die), `NdS+K`, `NdS-K` and bare
    /// integers. Use [`DiceFormula::parse_lossy`] at trust boundaries
    /// where a bad string must not abort the action.
    pub fn parse(s: &str) -> Result<Self> {
        let text = s.trim();
        if text.is_empty() {
            return Err(EngineError::MalformedFormula(s.to_string()));
        }

        let malformed = || EngineError::MalformedFormula(s.to_string());

        let Some(d_pos) = text.find(['d', 'D']) else {
            // No dice marker: the whole string is a constant.
            let value = text.parse::<i64>().map_err(|_| malformed())?;
            return Ok(Self::constant(value));
        };

        let count_part = &text[..d_pos];
        let rest = &text[d_pos + 1..];

        let count = if count_part.is_empty() {
            1
        } else {
            count_part.parse::<u32>().map_err(|_| malformed())?
        };
        if count == 0 {
            return Err(malformed());
        }

        let (sides_part, bonus) = match rest.find(['+', '-']) {
            Some(sign_pos) => {
                let bonus = rest[sign_pos..].parse::<i64>().map_err(|_| malformed())?;
                (&rest[..sign_pos], bonus)
            }
            None => (rest, 0),
        };

        let sides = sides_part.parse::<u32>().map_err(|_| malformed())?;
        if sides == 0 {
            return Err(malformed());
        }

        Ok(Self {
            count,
            sides,
            bonus,
        })
    }

    /// Parse, falling back to the zero formula on malformed input.
    ///
    /// Malformed formulas come from untrusted payloads; rolling 0 is the
    /// fallback so bad data never grants strength.
    #[must_use]
    pub fn parse_lossy(s: &str) -> Self {
        match Self::parse(s) {
            Ok(formula) => formula,
            Err(_) => {
                tracing::warn!(formula = s, "unparseable dice formula, rolling zero");
                Self::zero()
            }
        }
    }

    /// Roll the formula.
    pub fn roll(&self, rng: &mut BattleRng) -> i64 {
        let mut total = self.bonus;
        for _ in 0..self.count {
            total += rng.die(self.sides);
        }
        total
    }

    /// Smallest possible roll.
    #[must_use]
    pub fn min(&self) -> i64 {
        i64::from(self.count) + self.bonus
    }

    /// Largest possible roll.
    #[must_use]
    pub fn max(&self) -> i64 {
        i64::from(self.count) * i64::from(self.sides) + self.bonus
    }
}

impl Default for DiceFormula {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for DiceFormula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            return write!(f, "{}", self.bonus);
        }
        write!(f, "{}d{}", self.count, self.sides)?;
        if self.bonus > 0 {
            write!(f, "+{}", self.bonus)?;
        } else if self.bonus < 0 {
            write!(f, "{}", self.bonus)?;
        }
        Ok(())
    }
}
