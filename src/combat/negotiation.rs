//! Attack negotiation state machine.
//!
//! A pending attack is resolved through a short conversation between
//! the two sides. Step 1 asks the defender for a stance. An evade
//! attempt rolls agility and opens step 2: if the evasion succeeded the
//! attacker may try to land the hit with luck, and a successful
//! luck-hit re-opens the defender's luck window; if the evasion failed
//! the defender may immediately try luck or spend a command seal. Any
//! failed check, declined window, or non-evade stance falls through to
//! step 3, where both sides confirm and damage is committed.
//!
//! Every transition guards the current step and the awaiting flag
//! before mutating, so an out-of-order or replayed message gets a typed
//! error instead of corrupting the record.

use serde::{Deserialize, Serialize};

use crate::core::config::BattleConfig;
use crate::core::rank::Rank;
use crate::core::rng::BattleRng;
use crate::error::{EngineError, Result};

/// Where the negotiation currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum NegotiationStep {
    /// Waiting for the defender's stance.
    ChooseResponse = 1,
    /// A luck window is open for one side.
    LuckWindow = 2,
    /// Outcome decided; waiting on confirmations.
    Confirm = 3,
}

impl NegotiationStep {
    /// Step number as shown to clients.
    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }
}

/// The defender's initial stance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefenseChoice {
    /// Brace: defensive stat buckets apply to the incoming damage.
    Defend,
    /// Attempt to dodge with an agility check.
    Evade,
    /// Take the hit without bracing.
    DoNothing,
}

/// Final word on whether the attack connects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CombatOutcome {
    Hit,
    Evaded,
}

/// One ability check's result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub success: bool,
    pub chance: i32,
    pub roll: i32,
}

impl CheckOutcome {
    /// Outcome of a percent roll against a chance.
    #[must_use]
    pub const fn rolled(chance: i32, roll: i32) -> Self {
        Self {
            success: roll <= chance,
            chance,
            roll,
        }
    }

    /// A success granted without a roll (command seals).
    #[must_use]
    pub const fn granted() -> Self {
        Self {
            success: true,
            chance: 100,
            roll: 0,
        }
    }
}

/// Roll an ability check for a parameter rank.
pub fn roll_check(rank: Rank, rng: &mut BattleRng, config: &BattleConfig) -> CheckOutcome {
    let chance = config.check_base + rank.value().round() as i32;
    CheckOutcome::rolled(chance, rng.percent())
}

/// Negotiation progress for one pending attack.
///
/// Lives inside the combat record and is replaced whole on every
/// update, so both sides' copies stay byte-identical.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub step: NegotiationStep,
    pub choice: Option<DefenseChoice>,
    pub agility_evasion: Option<CheckOutcome>,
    pub luck_hit: Option<CheckOutcome>,
    pub luck_evade: Option<CheckOutcome>,
    pub seal_evade: Option<CheckOutcome>,
    pub awaiting_attacker: bool,
    pub awaiting_defender: bool,
}

impl Default for ResponseRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseRecord {
    /// Fresh negotiation: step 1, defender to act.
    #[must_use]
    pub fn new() -> Self {
        Self {
            step: NegotiationStep::ChooseResponse,
            choice: None,
            agility_evasion: None,
            luck_hit: None,
            luck_evade: None,
            seal_evade: None,
            awaiting_attacker: false,
            awaiting_defender: true,
        }
    }

    fn guard_step(&self, expected: NegotiationStep) -> Result<()> {
        if self.step != expected {
            return Err(EngineError::WrongNegotiationStep {
                expected: expected.number(),
                actual: self.step.number(),
            });
        }
        Ok(())
    }

    fn guard_defender_window(&self) -> Result<()> {
        if !self.awaiting_defender {
            return Err(EngineError::WindowClosed { side: "defender" });
        }
        Ok(())
    }

    fn guard_attacker_window(&self) -> Result<()> {
        if !self.awaiting_attacker {
            return Err(EngineError::WindowClosed { side: "attacker" });
        }
        Ok(())
    }

    fn close_windows(&mut self) {
        self.awaiting_attacker = false;
        self.awaiting_defender = false;
    }

    fn advance_to_confirm(&mut self) {
        self.step = NegotiationStep::Confirm;
        self.close_windows();
    }

    /// Record the defender's stance.
    ///
    /// `Evade` requires the agility check outcome; the other stances
    /// skip straight to confirmation.
    pub fn choose(&mut self, choice: DefenseChoice, agility: Option<CheckOutcome>) -> Result<()> {
        self.guard_step(NegotiationStep::ChooseResponse)?;
        self.guard_defender_window()?;

        self.choice = Some(choice);
        match choice {
            DefenseChoice::Defend | DefenseChoice::DoNothing => {
                self.advance_to_confirm();
            }
            DefenseChoice::Evade => {
                let outcome = agility.ok_or_else(|| {
                    EngineError::InvalidAction("evade stance requires an agility check".into())
                })?;
                self.agility_evasion = Some(outcome);
                self.step = NegotiationStep::LuckWindow;
                // Successful dodge: the attacker may answer with luck.
                // Failed dodge: the defender keeps the window instead.
                self.awaiting_attacker = outcome.success;
                self.awaiting_defender = !outcome.success;
            }
        }
        Ok(())
    }

    /// Attacker tries to land the hit through luck.
    ///
    /// Success hands the window back to the defender for a final
    /// luck-evade; failure settles the negotiation.
    pub fn record_luck_hit(&mut self, outcome: CheckOutcome) -> Result<()> {
        self.guard_step(NegotiationStep::LuckWindow)?;
        self.guard_attacker_window()?;

        self.luck_hit = Some(outcome);
        if outcome.success {
            self.awaiting_attacker = false;
            self.awaiting_defender = true;
        } else {
            self.advance_to_confirm();
        }
        Ok(())
    }

    /// Defender tries to evade through luck. Settles either way.
    pub fn record_luck_evade(&mut self, outcome: CheckOutcome) -> Result<()> {
        self.guard_step(NegotiationStep::LuckWindow)?;
        self.guard_defender_window()?;

        self.luck_evade = Some(outcome);
        self.advance_to_confirm();
        Ok(())
    }

    /// Defender burns a command seal for a guaranteed evade.
    ///
    /// The seal itself is spent by the caller; this only records the
    /// granted outcome and settles the negotiation.
    pub fn record_seal_evade(&mut self) -> Result<()> {
        self.guard_step(NegotiationStep::LuckWindow)?;
        self.guard_defender_window()?;

        self.seal_evade = Some(CheckOutcome::granted());
        self.advance_to_confirm();
        Ok(())
    }

    /// Attacker passes on the luck-hit window.
    pub fn decline_luck_hit(&mut self) -> Result<()> {
        self.guard_step(NegotiationStep::LuckWindow)?;
        self.guard_attacker_window()?;
        self.advance_to_confirm();
        Ok(())
    }

    /// Defender passes on the luck-evade window.
    pub fn decline_luck_evade(&mut self) -> Result<()> {
        self.guard_step(NegotiationStep::LuckWindow)?;
        self.guard_defender_window()?;
        self.advance_to_confirm();
        Ok(())
    }

    /// Negotiation has settled and confirmations may proceed.
    #[must_use]
    pub fn is_confirmable(&self) -> bool {
        self.step == NegotiationStep::Confirm
    }

    /// Did the defender brace for the hit?
    #[must_use]
    pub fn braced(&self) -> bool {
        self.choice == Some(DefenseChoice::Defend)
    }

    /// Decide the attack's outcome from the recorded checks.
    ///
    /// A command-seal evade always wins. Otherwise the two luck checks
    /// are compared: when exactly one succeeded, that side wins; when
    /// both or neither did, the agility evasion decides. An empty
    /// record is a plain hit.
    #[must_use]
    pub fn resolve_outcome(&self) -> CombatOutcome {
        if self.seal_evade.is_some_and(|check| check.success) {
            return CombatOutcome::Evaded;
        }

        let luck_hit = self.luck_hit.is_some_and(|check| check.success);
        let luck_evade = self.luck_evade.is_some_and(|check| check.success);
        if luck_hit != luck_evade {
            return if luck_hit {
                CombatOutcome::Hit
            } else {
                CombatOutcome::Evaded
            };
        }

        if self.agility_evasion.is_some_and(|check| check.success) {
            CombatOutcome::Evaded
        } else {
            CombatOutcome::Hit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rank::RankLetter;

    fn success() -> CheckOutcome {
        CheckOutcome::rolled(80, 10)
    }

    fn failure() -> CheckOutcome {
        CheckOutcome::rolled(20, 90)
    }

    #[test]
    fn test_fresh_record_awaits_defender() {
        let record = ResponseRecord::new();
        assert_eq!(record.step, NegotiationStep::ChooseResponse);
        assert!(record.awaiting_defender);
        assert!(!record.awaiting_attacker);
    }

    #[test]
    fn test_defend_goes_straight_to_confirm() {
        let mut record = ResponseRecord::new();
        record.choose(DefenseChoice::Defend, None).unwrap();
        assert!(record.is_confirmable());
        assert!(record.braced());
        assert_eq!(record.resolve_outcome(), CombatOutcome::Hit);
    }

    #[test]
    fn test_do_nothing_is_a_hit_without_bracing() {
        let mut record = ResponseRecord::new();
        record.choose(DefenseChoice::DoNothing, None).unwrap();
        assert!(record.is_confirmable());
        assert!(!record.braced());
        assert_eq!(record.resolve_outcome(), CombatOutcome::Hit);
    }

    #[test]
    fn test_evade_requires_agility_outcome() {
        let mut record = ResponseRecord::new();
        let err = record.choose(DefenseChoice::Evade, None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAction(_)));
    }

    #[test]
    fn test_failed_evade_opens_defender_luck_window() {
        let mut record = ResponseRecord::new();
        record.choose(DefenseChoice::Evade, Some(failure())).unwrap();
        assert_eq!(record.step, NegotiationStep::LuckWindow);
        assert!(record.awaiting_defender);
        assert!(!record.awaiting_attacker);
    }

    #[test]
    fn test_successful_evade_opens_attacker_luck_window() {
        let mut record = ResponseRecord::new();
        record.choose(DefenseChoice::Evade, Some(success())).unwrap();
        assert_eq!(record.step, NegotiationStep::LuckWindow);
        assert!(record.awaiting_attacker);
        assert!(!record.awaiting_defender);
    }

    #[test]
    fn test_luck_hit_success_reopens_defender_window() {
        let mut record = ResponseRecord::new();
        record.choose(DefenseChoice::Evade, Some(success())).unwrap();
        record.record_luck_hit(success()).unwrap();
        assert_eq!(record.step, NegotiationStep::LuckWindow);
        assert!(record.awaiting_defender);
    }

    #[test]
    fn test_luck_hit_failure_settles() {
        let mut record = ResponseRecord::new();
        record.choose(DefenseChoice::Evade, Some(success())).unwrap();
        record.record_luck_hit(failure()).unwrap();
        assert!(record.is_confirmable());
        assert_eq!(record.resolve_outcome(), CombatOutcome::Evaded);
    }

    #[test]
    fn test_full_chain_hit_then_evade() {
        // Dodge lands, luck-hit answers, luck-evade answers back.
        // Both luck checks succeeded, so the agility success decides.
        let mut record = ResponseRecord::new();
        record.choose(DefenseChoice::Evade, Some(success())).unwrap();
        record.record_luck_hit(success()).unwrap();
        record.record_luck_evade(success()).unwrap();
        assert!(record.is_confirmable());
        assert_eq!(record.resolve_outcome(), CombatOutcome::Evaded);
    }

    #[test]
    fn test_luck_hit_wins_when_luck_evade_fails() {
        let mut record = ResponseRecord::new();
        record.choose(DefenseChoice::Evade, Some(success())).unwrap();
        record.record_luck_hit(success()).unwrap();
        record.record_luck_evade(failure()).unwrap();
        assert_eq!(record.resolve_outcome(), CombatOutcome::Hit);
    }

    #[test]
    fn test_lone_luck_evade_wins() {
        let mut record = ResponseRecord::new();
        record.choose(DefenseChoice::Evade, Some(failure())).unwrap();
        record.record_luck_evade(success()).unwrap();
        assert_eq!(record.resolve_outcome(), CombatOutcome::Evaded);
    }

    #[test]
    fn test_seal_evade_beats_everything() {
        let mut record = ResponseRecord::new();
        record.choose(DefenseChoice::Evade, Some(failure())).unwrap();
        record.record_seal_evade().unwrap();
        assert!(record.is_confirmable());
        assert_eq!(record.resolve_outcome(), CombatOutcome::Evaded);
        assert!(record.seal_evade.is_some_and(|check| check.success));
    }

    #[test]
    fn test_declines_settle_the_negotiation() {
        let mut record = ResponseRecord::new();
        record.choose(DefenseChoice::Evade, Some(success())).unwrap();
        record.decline_luck_hit().unwrap();
        assert!(record.is_confirmable());
        assert_eq!(record.resolve_outcome(), CombatOutcome::Evaded);

        let mut record = ResponseRecord::new();
        record.choose(DefenseChoice::Evade, Some(failure())).unwrap();
        record.decline_luck_evade().unwrap();
        assert!(record.is_confirmable());
        assert_eq!(record.resolve_outcome(), CombatOutcome::Hit);
    }

    #[test]
    fn test_wrong_step_is_rejected() {
        let mut record = ResponseRecord::new();
        let err = record.record_luck_hit(success()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::WrongNegotiationStep {
                expected: 2,
                actual: 1
            }
        ));

        record.choose(DefenseChoice::Defend, None).unwrap();
        let err = record
            .choose(DefenseChoice::DoNothing, None)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::WrongNegotiationStep {
                expected: 1,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_closed_window_is_rejected() {
        let mut record = ResponseRecord::new();
        record.choose(DefenseChoice::Evade, Some(success())).unwrap();
        // Attacker's window is open, not the defender's.
        let err = record.record_luck_evade(success()).unwrap_err();
        assert!(matches!(err, EngineError::WindowClosed { side: "defender" }));

        record.record_luck_hit(failure()).unwrap();
        let err = record.record_luck_hit(success()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::WrongNegotiationStep {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_roll_check_uses_rank_value() {
        let config = BattleConfig::default();
        let mut rng = BattleRng::new(7);
        let outcome = roll_check(Rank::new(RankLetter::A), &mut rng, &config);
        assert_eq!(outcome.chance, config.check_base + 40);
        assert!((1..=100).contains(&outcome.roll));
        assert_eq!(outcome.success, outcome.roll <= outcome.chance);
    }

    #[test]
    fn test_outcome_default_is_hit() {
        let record = ResponseRecord::new();
        assert_eq!(record.resolve_outcome(), CombatOutcome::Hit);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut record = ResponseRecord::new();
        record.choose(DefenseChoice::Evade, Some(success())).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        let back: ResponseRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
