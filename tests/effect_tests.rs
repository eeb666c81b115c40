//! Skill and effect integration tests.
//!
//! The application pipeline has unit tests next to it; these follow an
//! effect through its whole life instead: a skill lands it, the
//! modifier collection reads it during combat, the turn clock expires
//! it. Forced chances (`base_effect_chance` 100, `check_base` -100,
//! crits off) keep every number exact.

use skirmish::combat::engine;
use skirmish::{
    use_skill, ApplicationOutcome, Archetype, AttackProfile, BattleConfig, BattleState,
    DefenseChoice, Effect, EffectFilter, EffectKind, Parameters, PlayerId, Rank, RankLetter,
    SkillKind, SkillRegistry, SkillSpec, TargetRule, Unit, UnitId,
};

fn battle() -> (BattleState, UnitId, UnitId) {
    let config = BattleConfig::default()
        .with_check_base(-100)
        .with_base_crit_chance(0)
        .with_base_effect_chance(100);
    let mut state = BattleState::new(config, 31);
    let caster = state.spawn(|id| {
        Unit::new(id, "caster", PlayerId::new(0))
            .with_hp(1_000)
            .with_parameters(Parameters::uniform(120, Rank::new(RankLetter::B)))
    });
    let enemy = state.spawn(|id| {
        Unit::new(id, "berserker", PlayerId::new(1))
            .with_hp(1_000)
            .with_parameters(Parameters::uniform(80, Rank::new(RankLetter::C)))
    });
    (state, caster, enemy)
}

/// Undefended magic attack, returning the damage that landed.
fn swing(state: &mut BattleState, attacker: UnitId, defender: UnitId) -> i64 {
    swing_with(state, attacker, defender, DefenseChoice::DoNothing)
}

fn swing_with(
    state: &mut BattleState,
    attacker: UnitId,
    defender: UnitId,
    choice: DefenseChoice,
) -> i64 {
    let report = engine::initiate(state, attacker, &[defender], AttackProfile::new(1.0, 0.0))
        .unwrap();
    let combat = report.records[0].id;
    engine::receive(state, defender, combat).unwrap();
    engine::choose_defense(state, defender, combat, choice).unwrap();
    engine::finalize(state, combat).unwrap();
    let confirm = engine::confirm_received(state, defender, combat, false).unwrap();
    engine::confirm_sent(state, attacker, combat).unwrap();
    confirm.damage_applied
}

#[test]
fn test_skill_buff_raises_the_next_swing() {
    let (mut state, caster, enemy) = battle();
    let mut skills = SkillRegistry::new();
    skills.register(
        SkillSpec::new("charisma", "Charisma", SkillKind::Skill)
            .with_target(TargetRule::Ally)
            .with_effect(Effect::new("Charisma", EffectKind::AttackPercent, 20.0)),
    );

    let report = use_skill(&mut state, &skills, caster, caster, "charisma").unwrap();
    assert_eq!(report.applications[0].outcome, ApplicationOutcome::Applied);

    // 120 force at +20%.
    assert_eq!(swing(&mut state, caster, enemy), 144);
}

#[test]
fn test_defense_debuff_bites_only_a_braced_defender() {
    let (mut state, caster, enemy) = battle();
    let mut skills = SkillRegistry::new();
    skills.register(
        SkillSpec::new("armor_crack", "Armor Crack", SkillKind::Skill)
            .with_target(TargetRule::Enemy)
            .with_effect(
                Effect::new("Armor Crack", EffectKind::DefensePercent, -30.0)
                    .with_archetype(Archetype::Debuff),
            ),
    );

    use_skill(&mut state, &skills, caster, enemy, "armor_crack").unwrap();

    // Bracing exposes the cracked armor: -30% defense swings the
    // multiplier to 1.3. Refusing to brace zeroes the stat buckets,
    // debuff included.
    assert_eq!(
        swing_with(&mut state, caster, enemy, DefenseChoice::Defend),
        156
    );
    assert_eq!(swing(&mut state, caster, enemy), 120);
}

#[test]
fn test_ward_blocks_the_first_hex_only() {
    let (mut state, caster, enemy) = battle();
    state
        .grant_effect(
            enemy,
            Effect::new("Seal of Purity", EffectKind::Ward, 0.0)
                .with_filter(EffectFilter::Archetype(Archetype::Debuff))
                .with_uses(1),
        )
        .unwrap();
    let mut skills = SkillRegistry::new();
    skills.register(
        SkillSpec::new("hex", "Hex", SkillKind::Skill)
            .with_target(TargetRule::Enemy)
            .with_effect(
                Effect::new("Hex", EffectKind::Marker, -5.0).with_archetype(Archetype::Debuff),
            ),
    );

    let first = use_skill(&mut state, &skills, caster, enemy, "hex").unwrap();
    assert_eq!(first.applications[0].outcome, ApplicationOutcome::Blocked);
    assert!(state.unit(enemy).unwrap().effects.is_empty());

    let second = use_skill(&mut state, &skills, caster, enemy, "hex").unwrap();
    assert_eq!(second.applications[0].outcome, ApplicationOutcome::Applied);
    assert_eq!(state.unit(enemy).unwrap().effects.len(), 1);
}

#[test]
fn test_timed_buff_expires_before_the_late_swing() {
    let (mut state, caster, enemy) = battle();
    let mut skills = SkillRegistry::new();
    skills.register(
        SkillSpec::new("war_cry", "War Cry", SkillKind::Skill).with_effect(
            Effect::new("War Cry", EffectKind::AttackPercent, 50.0).with_duration(1),
        ),
    );

    use_skill(&mut state, &skills, caster, caster, "war_cry").unwrap();
    assert_eq!(swing(&mut state, caster, enemy), 180);

    // Two hand-offs bring the turn back; the cry lasted one turn.
    state.advance_turn();
    state.advance_turn();
    assert!(state.unit(caster).unwrap().effects.is_empty());
    assert_eq!(swing(&mut state, caster, enemy), 120);
}

#[test]
fn test_one_shot_buff_spends_on_the_swing_that_read_it() {
    let (mut state, caster, enemy) = battle();
    let mut skills = SkillRegistry::new();
    skills.register(
        SkillSpec::new("battle_cry", "Battle Cry", SkillKind::Action).with_effect(
            Effect::new("Battle Cry", EffectKind::AttackFlat, 50.0).with_uses(1),
        ),
    );

    use_skill(&mut state, &skills, caster, caster, "battle_cry").unwrap();

    assert_eq!(swing(&mut state, caster, enemy), 170);
    assert!(state.unit(caster).unwrap().effects.is_empty());
    assert_eq!(swing(&mut state, caster, enemy), 120);
}

#[test]
fn test_multi_effect_skill_applies_in_spec_order() {
    let (mut state, caster, _) = battle();
    let mut skills = SkillRegistry::new();
    skills.register(
        SkillSpec::new("golden_rule", "Golden Rule", SkillKind::Skill)
            .with_effect(Effect::new("Wealth", EffectKind::Marker, 0.0))
            .with_effect(Effect::new("Greed", EffectKind::CritChanceUp, 10.0)),
    );

    let report = use_skill(&mut state, &skills, caster, caster, "golden_rule").unwrap();

    assert_eq!(report.applications.len(), 2);
    let names: Vec<_> = state
        .unit(caster)
        .unwrap()
        .effects
        .iter()
        .map(|effect| effect.name.as_str())
        .collect();
    assert_eq!(names, vec!["Wealth", "Greed"]);
    assert!(state
        .unit(caster)
        .unwrap()
        .effects
        .iter()
        .all(|effect| effect.source == "Golden Rule"));
}
