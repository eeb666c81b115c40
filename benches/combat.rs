//! Benchmarks for the combat hot paths.
//!
//! Covers the full negotiated combat lifecycle, the bare damage
//! arithmetic, trigger dispatch over a populated battlefield and state
//! snapshotting.
//!
//! Run with: `cargo bench`

#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use skirmish::combat::damage::compute_breakdown;
use skirmish::combat::engine;
use skirmish::{
    handle_event, AttackProfile, AttackerMods, BattleConfig, BattleEvent, BattleState, CombatId,
    Composition, CriticalRoll, DefenderMods, DefenseChoice, Parameters, PlayerId, Rank,
    RankLetter, TriggerRef, TriggerRegistry, Unit, UnitId,
};

fn spawn_pair(state: &mut BattleState) -> (UnitId, UnitId) {
    let attacker = state.spawn(|id| {
        Unit::new(id, "saber", PlayerId::new(0))
            .with_hp(10_000)
            .with_parameters(Parameters::uniform(120, Rank::new(RankLetter::B)))
    });
    let defender = state.spawn(|id| {
        Unit::new(id, "archer", PlayerId::new(1))
            .with_hp(10_000)
            .with_parameters(Parameters::uniform(80, Rank::new(RankLetter::C)))
    });
    (attacker, defender)
}

/// One attack walked through the whole negotiation, fresh battle each
/// iteration.
fn bench_full_combat(c: &mut Criterion) {
    c.bench_function("full_combat", |b| {
        b.iter(|| {
            let mut state = BattleState::new(BattleConfig::default(), black_box(42));
            let (attacker, defender) = spawn_pair(&mut state);

            let report = engine::initiate(
                &mut state,
                attacker,
                &[defender],
                AttackProfile::new(1.0, 0.0).with_multiplier(2.0),
            )
            .unwrap();
            let combat = report.records[0].id;
            engine::receive(&mut state, defender, combat).unwrap();
            engine::choose_defense(&mut state, defender, combat, DefenseChoice::DoNothing)
                .unwrap();
            engine::finalize(&mut state, combat).unwrap();
            engine::confirm_received(&mut state, defender, combat, false).unwrap();
            engine::confirm_sent(&mut state, attacker, combat).unwrap();
            black_box(state)
        });
    });
}

/// The bare damage arithmetic, no state or RNG.
fn bench_damage_pipeline(c: &mut Criterion) {
    let profile = AttackProfile::new(0.7, 0.3)
        .with_multiplier(5.0)
        .with_flat_bonus(200.0);
    let composition = Composition::derive(120, 80, &profile);

    let mut attacker = AttackerMods::default();
    attacker.percent = 30.0;
    attacker.flat = 50.0;
    attacker.crit_damage = 60.0;

    let mut defender = DefenderMods::default();
    defender.percent = 15.0;
    defender.flat = 20.0;

    let critical = CriticalRoll {
        chance: 60,
        roll: 10,
        is_critical: true,
    };

    c.bench_function("damage_pipeline", |b| {
        b.iter(|| {
            compute_breakdown(
                black_box(&composition),
                black_box(&profile),
                black_box(&attacker),
                black_box(&defender),
                black_box(&critical),
            )
        });
    });
}

/// Trigger dispatch over a battlefield where every unit carries
/// passive abilities; the gather pass scans them all.
fn bench_trigger_dispatch(c: &mut Criterion) {
    let registry = TriggerRegistry::with_stock_behaviors();
    let mut base = BattleState::new(BattleConfig::default(), 42);

    let mut victim = None;
    for index in 0..8 {
        let player = PlayerId::new(index % 2);
        let id = base.spawn(|id| {
            Unit::new(id, format!("servant-{index}"), player)
                .with_hp(500)
                .with_parameters(Parameters::uniform(80, Rank::new(RankLetter::C)))
        });
        let unit = base.unit_mut(id).unwrap();
        unit.triggers
            .push(TriggerRef::new("vengeance").with_param("gain", 10));
        unit.triggers
            .push(TriggerRef::new("guts").with_uses(1).with_param("restore", 100));
        victim.get_or_insert(id);
    }
    let victim = victim.unwrap();
    let event = BattleEvent::damage_received(victim, victim, CombatId::new(1), 50);

    c.bench_function("trigger_dispatch_8_units", |b| {
        b.iter(|| {
            let mut state = base.clone();
            black_box(handle_event(&mut state, &registry, black_box(&event)))
        });
    });
}

/// Snapshot a battle that has already seen some fighting.
fn bench_state_snapshot(c: &mut Criterion) {
    let mut state = BattleState::new(BattleConfig::default(), 42);
    let (attacker, defender) = spawn_pair(&mut state);

    for _ in 0..10 {
        let report = engine::initiate(
            &mut state,
            attacker,
            &[defender],
            AttackProfile::new(1.0, 0.0),
        )
        .unwrap();
        let combat = report.records[0].id;
        engine::receive(&mut state, defender, combat).unwrap();
        engine::choose_defense(&mut state, defender, combat, DefenseChoice::DoNothing).unwrap();
        engine::finalize(&mut state, combat).unwrap();
        engine::confirm_received(&mut state, defender, combat, false).unwrap();
        engine::confirm_sent(&mut state, attacker, combat).unwrap();
        state.advance_turn();
    }

    c.bench_function("state_snapshot", |b| {
        b.iter(|| black_box(&state).to_bytes().unwrap());
    });
}

criterion_group!(
    benches,
    bench_full_combat,
    bench_damage_pipeline,
    bench_trigger_dispatch,
    bench_state_snapshot
);
criterion_main!(benches);
