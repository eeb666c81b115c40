//! Per-room session orchestration.
//!
//! One [`RoomSession`] owns the authoritative [`BattleState`] for a
//! room plus the behavior registries, all injected at construction.
//! `handle` processes one inbound action to completion, chained
//! trigger dispatch included, before returning; the `&mut self`
//! receiver is the per-room serialization point, so no further
//! locking exists anywhere in the engine.
//!
//! Every failure becomes an `ACTION_FAILED` message to the sender
//! with the state untouched; nothing in here panics or kills the
//! coordinator.

use tracing::{info, warn};

use super::message::{ClientMessage, GameAction, ResponseUpdate, ServerMessage, StateView};
use crate::combat::engine::{self, ConfirmReport, ConfirmSide};
use crate::combat::{AttackProfile, CombatId, CombatOutcome, CombatPhase};
use crate::core::state::BattleState;
use crate::core::unit::{PlayerId, UnitId};
use crate::error::{EngineError, Result};
use crate::skills::{use_skill, SkillKind, SkillRegistry};
use crate::triggers::{handle_event, BattleEvent, EventKind, FiredTrigger, TriggerRegistry};

/// Who an outbound message goes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Audience {
    Player(PlayerId),
    Both,
}

/// One message to deliver.
#[derive(Clone, Debug)]
pub struct Outbound {
    pub to: Audience,
    pub message: ServerMessage,
}

/// Decides what a player's state view contains. The room/socket layer
/// injects fog-of-war here; the engine itself hides nothing.
pub type VisibilityFilter = fn(&BattleState, PlayerId) -> StateView;

/// Identity filter: everyone sees everything.
#[must_use]
pub fn full_visibility(state: &BattleState, player: PlayerId) -> StateView {
    StateView {
        player,
        turn: state.turn,
        round: state.round,
        active_player: state.active_player,
        units: state.units().to_vec(),
    }
}

/// One room's authoritative session.
#[derive(Debug)]
pub struct RoomSession {
    state: BattleState,
    triggers: TriggerRegistry,
    skills: SkillRegistry,
    visibility: VisibilityFilter,
}

impl RoomSession {
    pub fn new(state: BattleState, triggers: TriggerRegistry, skills: SkillRegistry) -> Self {
        Self {
            state,
            triggers,
            skills,
            visibility: full_visibility,
        }
    }

    /// Swap in a visibility filter (builder pattern).
    #[must_use]
    pub fn with_visibility(mut self, visibility: VisibilityFilter) -> Self {
        self.visibility = visibility;
        self
    }

    /// Read access to the live state.
    #[must_use]
    pub fn state(&self) -> &BattleState {
        &self.state
    }

    /// Parse and handle one raw JSON line from `sender`.
    pub fn handle_json(&mut self, sender: PlayerId, json: &str) -> Vec<Outbound> {
        match ClientMessage::from_json(json) {
            Ok(message) => self.handle(sender, message),
            Err(error) => vec![Outbound {
                to: Audience::Player(sender),
                message: ServerMessage::ActionFailed {
                    action: "GAME_ACTION".to_owned(),
                    error: error.to_string(),
                },
            }],
        }
    }

    /// Handle one inbound message from `sender` to completion.
    pub fn handle(&mut self, sender: PlayerId, message: ClientMessage) -> Vec<Outbound> {
        let ClientMessage::GameAction { action } = message;
        match self.dispatch_action(sender, &action) {
            Ok(outbound) => outbound,
            Err(error) => vec![Outbound {
                to: Audience::Player(sender),
                message: ServerMessage::ActionFailed {
                    action: action.name().to_owned(),
                    error: error.to_string(),
                },
            }],
        }
    }

    /// Hand the turn to the opponent, dispatching boundary events.
    pub fn advance_turn(&mut self) -> Vec<Outbound> {
        let transition = self.state.advance_turn();
        let fired = self.dispatch_events(&transition.events);
        self.respond(fired, Vec::new())
    }

    fn dispatch_action(&mut self, sender: PlayerId, action: &GameAction) -> Result<Vec<Outbound>> {
        match action {
            GameAction::Attack {
                attacker,
                targets,
                profile,
            } => self.attack(sender, *attacker, targets, *profile),
            GameAction::ReceiveAttack { defender, combat } => {
                self.ensure_owner(sender, *defender)?;
                engine::receive(&mut self.state, *defender, *combat)?;
                Ok(self.respond(Vec::new(), Vec::new()))
            }
            GameAction::UpdateCombatResponse {
                unit,
                combat,
                update,
            } => self.update_response(sender, *unit, *combat, *update),
            GameAction::ProcessCombatAndInitiateCounter { defender, combat } => {
                self.ensure_owner(sender, *defender)?;
                self.ensure_finalized(*combat)?;
                let report = engine::confirm_received(&mut self.state, *defender, *combat, true)?;
                self.finish_confirm(*defender, report)
            }
            GameAction::ProcessCombatComplete { unit, combat } => {
                self.ensure_owner(sender, *unit)?;
                self.process_complete(*unit, *combat)
            }
            GameAction::CombatFailed { unit, combat } => {
                self.ensure_owner(sender, *unit)?;
                engine::fail_combat(&mut self.state, *combat)?;
                let closers = vec![
                    ServerMessage::CloseCombatMenu { combat: *combat },
                    ServerMessage::CloseCombatMenuResponse { combat: *combat },
                ];
                Ok(self.respond(Vec::new(), closers))
            }
            GameAction::UseSkill {
                caster,
                target,
                key,
            } => self.use_ability(sender, *caster, *target, key, SkillKind::Skill),
            GameAction::UseNp {
                caster,
                target,
                key,
            } => self.use_ability(sender, *caster, *target, key, SkillKind::NoblePhantasm),
            GameAction::UseAction {
                caster,
                target,
                key,
            } => self.use_ability(sender, *caster, *target, key, SkillKind::Action),
        }
    }

    // === Verb handlers ===

    fn attack(
        &mut self,
        sender: PlayerId,
        attacker: UnitId,
        targets: &[UnitId],
        profile: AttackProfile,
    ) -> Result<Vec<Outbound>> {
        self.ensure_owner(sender, attacker)?;
        // An attack aimed exactly at the recorded counter target goes
        // through the counter path, which clears the granted right.
        let counter = {
            let unit = self.state.require_unit(attacker)?;
            unit.can_counter
                && targets.len() == 1
                && unit.countering_against == Some(targets[0])
        };
        let report = if counter {
            engine::initiate_counter(&mut self.state, attacker, profile)?
        } else {
            engine::initiate(&mut self.state, attacker, targets, profile)?
        };
        let fired = self.dispatch_events(&report.events);
        Ok(self.respond(fired, Vec::new()))
    }

    fn update_response(
        &mut self,
        sender: PlayerId,
        unit: UnitId,
        combat: CombatId,
        update: ResponseUpdate,
    ) -> Result<Vec<Outbound>> {
        self.ensure_owner(sender, unit)?;
        match update {
            ResponseUpdate::Choose { choice } => {
                engine::choose_defense(&mut self.state, unit, combat, choice)?;
            }
            ResponseUpdate::LuckHit => {
                engine::attempt_luck_hit(&mut self.state, unit, combat)?;
            }
            ResponseUpdate::DeclineLuckHit => {
                engine::decline_luck_hit(&mut self.state, unit, combat)?;
            }
            ResponseUpdate::LuckEvade => {
                engine::attempt_luck_evade(&mut self.state, unit, combat)?;
            }
            ResponseUpdate::DeclineLuckEvade => {
                engine::decline_luck_evade(&mut self.state, unit, combat)?;
            }
            ResponseUpdate::SealEvade => {
                engine::evade_with_seal(&mut self.state, unit, combat)?;
            }
        }
        Ok(self.respond(Vec::new(), Vec::new()))
    }

    fn process_complete(&mut self, unit: UnitId, combat: CombatId) -> Result<Vec<Outbound>> {
        let receiving_side = {
            let unit_ref = self.state.require_unit(unit)?;
            unit_ref
                .combat_received
                .as_ref()
                .is_some_and(|r| r.id == combat)
                || unit_ref
                    .processed_combat_received
                    .iter()
                    .any(|r| r.id == combat)
        };
        if receiving_side {
            self.ensure_finalized(combat)?;
            let report = engine::confirm_received(&mut self.state, unit, combat, false)?;
            self.finish_confirm(unit, report)
        } else {
            self.ensure_finalized(combat)?;
            let report = engine::confirm_sent(&mut self.state, unit, combat)?;
            self.finish_confirm(unit, report)
        }
    }

    fn use_ability(
        &mut self,
        sender: PlayerId,
        caster: UnitId,
        target: UnitId,
        key: &str,
        expected: SkillKind,
    ) -> Result<Vec<Outbound>> {
        self.ensure_owner(sender, caster)?;
        let actual = self.skills.resolve(key)?.kind;
        if actual != expected {
            return Err(EngineError::InvalidAction(format!(
                "{key} is not usable through this verb"
            )));
        }
        let report = use_skill(&mut self.state, &self.skills, caster, target, key)?;
        let fired = self.dispatch_events(std::slice::from_ref(&report.event));
        Ok(self.respond(fired, Vec::new()))
    }

    // === Shared plumbing ===

    /// Roll the damage once if the negotiation reached confirmation
    /// but nobody has finalized yet. Already-finalized and replayed
    /// combats pass through untouched.
    fn ensure_finalized(&mut self, combat: CombatId) -> Result<()> {
        let live_unfinalized = self.state.units().iter().any(|unit| {
            unit.combat_received
                .as_ref()
                .is_some_and(|r| r.id == combat && r.phase != CombatPhase::Finalized)
        });
        if live_unfinalized {
            engine::finalize(&mut self.state, combat)?;
        }
        Ok(())
    }

    fn finish_confirm(&mut self, unit: UnitId, report: ConfirmReport) -> Result<Vec<Outbound>> {
        if report.replayed {
            warn!(combat = %report.combat, unit = %unit, "replayed confirmation ignored");
            return Ok(self.respond(Vec::new(), Vec::new()));
        }
        let outcome = if report
            .events
            .iter()
            .any(|event| event.kind == EventKind::AttackLanded)
        {
            CombatOutcome::Hit
        } else {
            CombatOutcome::Evaded
        };
        let side = report.side;
        let fired = self.dispatch_events(&report.events);
        let mut extra = Vec::new();
        if side == ConfirmSide::Defender {
            info!(
                combat = %report.combat,
                defender = %unit,
                outcome = ?outcome,
                damage = report.damage_applied,
                "combat resolved"
            );
            extra.push(ServerMessage::CombatCompletionNotification {
                combat: report.combat,
                defender: unit,
                outcome,
                damage: report.damage_applied,
                defender_defeated: report.defeated,
                counter_granted: report.counter_granted,
            });
        }
        Ok(self.respond(fired, extra))
    }

    /// Run every event through trigger dispatch, in order. A defeat
    /// event whose unit a revival trigger already saved is dropped.
    fn dispatch_events(&mut self, events: &[BattleEvent]) -> Vec<FiredTrigger> {
        let mut fired = Vec::new();
        for event in events {
            if event.kind == EventKind::UnitDefeated {
                let revived = event
                    .target
                    .and_then(|id| self.state.unit(id))
                    .is_some_and(|unit| !unit.is_defeated());
                if revived {
                    continue;
                }
            }
            fired.extend(handle_event(&mut self.state, &self.triggers, event));
        }
        fired
    }

    fn respond(&self, fired: Vec<FiredTrigger>, extra: Vec<ServerMessage>) -> Vec<Outbound> {
        let mut outbound = Vec::new();
        if !fired.is_empty() {
            outbound.push(Outbound {
                to: Audience::Both,
                message: ServerMessage::TriggerEffectNotification { fired },
            });
        }
        for message in extra {
            outbound.push(Outbound {
                to: Audience::Both,
                message,
            });
        }
        for player in [PlayerId::new(0), PlayerId::new(1)] {
            outbound.push(Outbound {
                to: Audience::Player(player),
                message: ServerMessage::GameStateUpdate {
                    view: (self.visibility)(&self.state, player),
                },
            });
        }
        outbound
    }

    fn ensure_owner(&self, sender: PlayerId, unit_id: UnitId) -> Result<()> {
        let unit = self.state.require_unit(unit_id)?;
        if unit.player != sender {
            return Err(EngineError::InvalidAction(format!(
                "{} is not controlled by {}",
                unit.name, sender
            )));
        }
        Ok(())
    }
}
