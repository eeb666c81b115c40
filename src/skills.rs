//! Skill, Noble Phantasm and basic action lookup.
//!
//! Usable abilities are data: a [`SkillSpec`] names its targeting rule
//! and the effect candidates it tries to land. Using one routes every
//! candidate through the effect application pipeline and emits the
//! matching event so passives can react. An unknown key is a typed
//! error the caller reports, never a panic.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::effect::Effect;
use crate::core::state::BattleState;
use crate::core::unit::{Unit, UnitId};
use crate::effects::{apply, ApplicationReport};
use crate::error::{EngineError, Result};
use crate::triggers::BattleEvent;

/// What a skill may be aimed at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetRule {
    /// The caster only.
    #[default]
    SelfOnly,
    /// Any unit of the caster's player.
    Ally,
    /// Any unit of the opposing player.
    Enemy,
    /// No restriction.
    Any,
}

impl TargetRule {
    /// Does this rule allow aiming at `target`?
    #[must_use]
    pub fn allows(self, caster: &Unit, target: &Unit) -> bool {
        match self {
            Self::SelfOnly => caster.id == target.id,
            Self::Ally => caster.player == target.player,
            Self::Enemy => caster.player != target.player,
            Self::Any => true,
        }
    }
}

/// Skill flavor; decides the unlock gate and the emitted event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkillKind {
    /// A class or personal skill.
    Skill,
    /// A Noble Phantasm, locked until the unlock round.
    NoblePhantasm,
    /// A basic action anyone can take.
    Action,
}

/// A usable ability: targeting plus candidate effects.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SkillSpec {
    pub key: String,
    /// Display name; becomes the source of granted effects.
    pub name: String,
    pub kind: SkillKind,
    pub target: TargetRule,
    /// Applied in order through the application pipeline.
    pub effects: Vec<Effect>,
}

impl SkillSpec {
    pub fn new(key: impl Into<String>, name: impl Into<String>, kind: SkillKind) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            kind,
            target: TargetRule::default(),
            effects: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: TargetRule) -> Self {
        self.target = target;
        self
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn is_np(&self) -> bool {
        self.kind == SkillKind::NoblePhantasm
    }
}

/// Key to spec lookup, loaded from campaign data at room setup.
#[derive(Clone, Debug, Default)]
pub struct SkillRegistry {
    skills: FxHashMap<String, SkillSpec>,
}

impl SkillRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a spec; re-registering a key replaces it.
    pub fn register(&mut self, spec: SkillSpec) {
        self.skills.insert(spec.key.clone(), spec);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SkillSpec> {
        self.skills.get(key)
    }

    /// Look a key up or fail with a typed error.
    pub fn resolve(&self, key: &str) -> Result<&SkillSpec> {
        self.skills
            .get(key)
            .ok_or_else(|| EngineError::UnknownSkill(key.to_owned()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

/// What one skill use did.
#[derive(Clone, Debug)]
pub struct SkillReport {
    pub key: String,
    pub caster: UnitId,
    pub target: UnitId,
    /// The emitted use event, for trigger dispatch.
    pub event: BattleEvent,
    /// One report per candidate effect, in spec order.
    pub applications: Vec<ApplicationReport>,
}

/// Use a skill on a target.
///
/// Guards run before any mutation: unknown key, Noble Phantasm round
/// lock, defeated caster and targeting rule all reject the use with
/// the battle untouched. On success the use event is logged and each
/// candidate effect goes through the application pipeline.
pub fn use_skill(
    state: &mut BattleState,
    skills: &SkillRegistry,
    caster_id: UnitId,
    target_id: UnitId,
    key: &str,
) -> Result<SkillReport> {
    let spec = skills.resolve(key)?.clone();
    if spec.is_np() && state.round < state.config.np_unlock_round {
        return Err(EngineError::NoblePhantasmLocked {
            round: state.round,
            unlock: state.config.np_unlock_round,
        });
    }

    let caster = state.require_unit(caster_id)?;
    if caster.is_defeated() {
        return Err(EngineError::InvalidAction(
            "defeated units cannot use skills".into(),
        ));
    }
    let target = state.require_unit(target_id)?;
    if !spec.target.allows(caster, target) {
        return Err(EngineError::InvalidAction(format!(
            "{} cannot target {}",
            spec.key, target.name
        )));
    }

    let event = match spec.kind {
        SkillKind::Skill => BattleEvent::skill_used(caster_id, spec.key.as_str()),
        SkillKind::NoblePhantasm => BattleEvent::np_used(caster_id, spec.key.as_str()),
        SkillKind::Action => BattleEvent::action_used(caster_id, spec.key.as_str()),
    };
    state.record_event(event.clone());

    let mut applications = Vec::with_capacity(spec.effects.len());
    for candidate in &spec.effects {
        applications.push(apply(
            state,
            caster_id,
            target_id,
            candidate.clone(),
            spec.name.as_str(),
        )?);
    }

    Ok(SkillReport {
        key: spec.key,
        caster: caster_id,
        target: target_id,
        event,
        applications,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::BattleConfig;
    use crate::core::effect::EffectKind;
    use crate::core::unit::PlayerId;
    use crate::effects::ApplicationOutcome;
    use crate::triggers::EventKind;

    fn registry() -> SkillRegistry {
        let mut skills = SkillRegistry::new();
        skills.register(
            SkillSpec::new("charisma", "Charisma", SkillKind::Skill)
                .with_target(TargetRule::Ally)
                .with_effect(Effect::new("Charisma", EffectKind::AttackPercent, 20.0)),
        );
        skills.register(
            SkillSpec::new("excalibur_aura", "Excalibur", SkillKind::NoblePhantasm)
                .with_effect(Effect::new("Radiance", EffectKind::CritChanceUp, 30.0)),
        );
        skills.register(SkillSpec::new("brace", "Brace", SkillKind::Action).with_effect(
            Effect::new("Braced", EffectKind::DefenseFlat, 10.0).with_duration(1),
        ));
        skills
    }

    /// `base_effect_chance` 100 makes every application land.
    fn battle() -> (BattleState, UnitId, UnitId) {
        let config = BattleConfig::default().with_base_effect_chance(100);
        let mut state = BattleState::new(config, 5);
        let caster = state.spawn(|id| Unit::new(id, "saber", PlayerId::new(0)).with_hp(500));
        let enemy = state.spawn(|id| Unit::new(id, "berserker", PlayerId::new(1)).with_hp(500));
        (state, caster, enemy)
    }

    #[test]
    fn test_skill_applies_effects_and_logs_event() {
        let (mut state, caster, _) = battle();
        let report = use_skill(&mut state, &registry(), caster, caster, "charisma").unwrap();

        assert_eq!(report.event.kind, EventKind::SkillUsed);
        assert_eq!(report.event.label(), "charisma");
        assert_eq!(report.applications.len(), 1);
        assert_eq!(report.applications[0].outcome, ApplicationOutcome::Applied);

        let effect = &state.unit(caster).unwrap().effects[0];
        assert_eq!(effect.kind, EffectKind::AttackPercent);
        assert_eq!(effect.source, "Charisma");
    }

    #[test]
    fn test_unknown_key_is_typed_failure() {
        let (mut state, caster, _) = battle();
        let err = use_skill(&mut state, &registry(), caster, caster, "gate_of_babylon")
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownSkill(key) if key == "gate_of_babylon"));
    }

    #[test]
    fn test_np_locked_before_unlock_round() {
        let (mut state, caster, _) = battle();
        assert_eq!(state.round, 1);

        let err = use_skill(&mut state, &registry(), caster, caster, "excalibur_aura")
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::NoblePhantasmLocked { round: 1, unlock: 2 }
        ));
        assert!(state.unit(caster).unwrap().effects.is_empty());

        // Two turns hand the round to 2 and the lock opens.
        state.advance_turn();
        state.advance_turn();
        let report = use_skill(&mut state, &registry(), caster, caster, "excalibur_aura").unwrap();
        assert_eq!(report.event.kind, EventKind::NpUsed);
    }

    #[test]
    fn test_target_rule_rejects_enemies_of_ally_skill() {
        let (mut state, caster, enemy) = battle();
        let err = use_skill(&mut state, &registry(), caster, enemy, "charisma").unwrap_err();
        assert!(matches!(err, EngineError::InvalidAction(_)));
        assert!(state.unit(enemy).unwrap().effects.is_empty());
    }

    #[test]
    fn test_defeated_caster_cannot_act() {
        let (mut state, caster, _) = battle();
        state.unit_mut(caster).unwrap().apply_damage(500);

        let err = use_skill(&mut state, &registry(), caster, caster, "brace").unwrap_err();
        assert!(matches!(err, EngineError::InvalidAction(_)));
    }

    #[test]
    fn test_action_emits_action_event() {
        let (mut state, caster, _) = battle();
        let report = use_skill(&mut state, &registry(), caster, caster, "brace").unwrap();
        assert_eq!(report.event.kind, EventKind::ActionUsed);
    }
}
