//! Battle configuration.
//!
//! Rooms configure the engine at startup: probability bases, the Noble
//! Phantasm unlock round, default command-seal allowance. The engine
//! never hardcodes these numbers inline; every formula reads its base
//! from the room's config so game balance lives in one place.

use serde::{Deserialize, Serialize};

/// Tunable numbers for one battle room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleConfig {
    /// Base critical hit chance before attacker/defender modifiers.
    pub base_crit_chance: i32,

    /// Base effect application chance before bonuses and resistances.
    pub base_effect_chance: i32,

    /// Base chance for luck/agility checks before the rank value is added.
    pub check_base: i32,

    /// First round in which Noble Phantasm attacks are allowed.
    pub np_unlock_round: u32,

    /// Command seals a master-class unit starts with.
    pub default_command_seals: u8,
}

impl BattleConfig {
    /// Set the base critical chance.
    #[must_use]
    pub fn with_base_crit_chance(mut self, chance: i32) -> Self {
        self.base_crit_chance = chance;
        self
    }

    /// Set the base effect application chance.
    #[must_use]
    pub fn with_base_effect_chance(mut self, chance: i32) -> Self {
        self.base_effect_chance = chance;
        self
    }

    /// Set the luck/agility check base.
    #[must_use]
    pub fn with_check_base(mut self, base: i32) -> Self {
        self.check_base = base;
        self
    }

    /// Set the Noble Phantasm unlock round.
    #[must_use]
    pub fn with_np_unlock_round(mut self, round: u32) -> Self {
        self.np_unlock_round = round;
        self
    }

    /// Set the default command-seal allowance.
    #[must_use]
    pub fn with_default_command_seals(mut self, seals: u8) -> Self {
        self.default_command_seals = seals;
        self
    }
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            base_crit_chance: 50,
            base_effect_chance: 85,
            check_base: 40,
            np_unlock_round: 2,
            default_command_seals: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BattleConfig::default();
        assert_eq!(config.base_crit_chance, 50);
        assert_eq!(config.base_effect_chance, 85);
        assert_eq!(config.check_base, 40);
        assert_eq!(config.np_unlock_round, 2);
        assert_eq!(config.default_command_seals, 3);
    }

    #[test]
    fn test_builder_overrides() {
        let config = BattleConfig::default()
            .with_base_crit_chance(30)
            .with_base_effect_chance(70)
            .with_np_unlock_round(5);

        assert_eq!(config.base_crit_chance, 30);
        assert_eq!(config.base_effect_chance, 70);
        assert_eq!(config.np_unlock_round, 5);
        // Untouched knobs keep their defaults.
        assert_eq!(config.check_base, 40);
    }

    #[test]
    fn test_serde() {
        let config = BattleConfig::default().with_check_base(35);
        let json = serde_json::to_string(&config).unwrap();
        let back: BattleConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
