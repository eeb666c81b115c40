//! Effect data model.
//!
//! An effect is a named, serializable modifier attached to a unit: stat
//! buffs and debuffs, critical modifiers, nullification, resistances,
//! immunities, wards and plain markers. The `kind` tag decides which
//! modifier bucket the effect feeds during combat; `value` carries the
//! magnitude. Timed effects expire by turn, finite-use effects are
//! consumed as they are read.

use serde::{Deserialize, Serialize};

use super::rank::Rank;

/// Unique identifier for an attached effect instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EffectId(pub u64);

impl EffectId {
    /// Sentinel for effects not yet attached to a unit.
    pub const UNSET: Self = Self(0);

    /// Create a new effect ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EffectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Effect({})", self.0)
    }
}

/// Whether an effect helps or hinders its holder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Archetype {
    /// Beneficial.
    Buff,
    /// Harmful.
    Debuff,
    /// Unclassified; resolved from the kind and sign at use.
    #[default]
    Neutral,
}

/// Coarse grouping used by wards and specific bonuses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EffectCategory {
    /// Attack-side modifiers.
    Offense,
    /// Defense-side modifiers.
    Defense,
    /// Luck and critical modifiers.
    Fortune,
    /// Mind-affecting statuses (charm, fear, stun).
    Mental,
    /// Everything utilitarian.
    #[default]
    Utility,
    /// Unique mechanics that refuse the other boxes.
    Special,
}

/// Modifier bucket tag.
///
/// Combat reads attacker buckets from the attacker's effects and defender
/// buckets from the defender's; effect application reads the chance and
/// resistance vocabulary. `Marker` feeds no bucket at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// Flat attack bonus.
    AttackFlat,
    /// Percent attack bonus.
    AttackPercent,
    /// Flat damage reduction when defending.
    DefenseFlat,
    /// Percent damage reduction when defending.
    DefensePercent,
    /// Critical chance bonus (attacker).
    CritChanceUp,
    /// Critical damage bonus (attacker).
    CritDamageUp,
    /// Critical chance reduction (defender).
    CritResistUp,
    /// Flat shaving of resistance reductions (attacker).
    NullifyFlat,
    /// Percent shaving of resistance reductions (attacker).
    NullifyPercent,
    /// Flat magical damage reduction, rank-compared for negation.
    MagicResistFlat,
    /// Percent magical damage reduction, rank-compared for negation.
    MagicResistPercent,
    /// Flat physical damage reduction, rank-compared for negation.
    StrengthResistFlat,
    /// Percent physical damage reduction, rank-compared for negation.
    StrengthResistPercent,
    /// Better odds when applying buffs.
    BuffChanceUp,
    /// Better odds when applying debuffs.
    DebuffChanceUp,
    /// Scales the magnitude of effects this unit applies.
    EffectPowerUp,
    /// Worse odds for buffs applied to this unit.
    BuffResist,
    /// Worse odds for debuffs applied to this unit.
    DebuffResist,
    /// Blocks incoming effects that match the filter exactly.
    Immunity,
    /// Blocks incoming effects by filter, typically finite-use.
    Ward,
    /// Pure named status with no numeric bucket.
    Marker,
}

impl EffectKind {
    /// Default archetype when the effect carries none.
    #[must_use]
    pub const fn default_archetype(self) -> Archetype {
        match self {
            Self::Marker => Archetype::Neutral,
            _ => Archetype::Buff,
        }
    }
}

/// Predicate over effects, used by immunities, wards and specific
/// chance/power bonuses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EffectFilter {
    /// Exact name match.
    Name(String),
    /// Exact kind match.
    Kind(EffectKind),
    /// Category match.
    Category(EffectCategory),
    /// Matches the effect's resolved archetype.
    Archetype(Archetype),
    /// Matches if any sub-filter matches.
    Any(Vec<EffectFilter>),
}

impl EffectFilter {
    /// Does this filter match the given effect?
    #[must_use]
    pub fn matches(&self, effect: &Effect) -> bool {
        match self {
            Self::Name(name) => effect.name == *name,
            Self::Kind(kind) => effect.kind == *kind,
            Self::Category(category) => effect.category == *category,
            Self::Archetype(archetype) => effect.classify() == *archetype,
            Self::Any(filters) => filters.iter().any(|f| f.matches(effect)),
        }
    }
}

/// A modifier attached to a unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    /// Unique instance identifier, assigned when attached.
    pub id: EffectId,

    /// Display name; immunities match on it.
    pub name: String,

    /// Which modifier bucket this feeds.
    pub kind: EffectKind,

    /// Magnitude (bucket-specific meaning).
    pub value: f64,

    /// Alternate magnitude against Noble Phantasm attacks.
    pub np_value: Option<f64>,

    /// Lifetime in turns. `None` is permanent.
    pub duration: Option<u32>,

    /// Turn the effect was applied.
    pub applied_at: u32,

    /// Remaining consumptions. `None` is unlimited.
    pub uses: Option<u32>,

    /// Attribution (unit name, skill name).
    pub source: String,

    /// Explicit buff/debuff classification, `Neutral` to infer.
    pub archetype: Archetype,

    /// Coarse grouping for filters.
    pub category: EffectCategory,

    /// Stored rank, rank-compared against Noble Phantasm attack ranks.
    pub rank: Option<Rank>,

    /// Match rule for immunities, wards and specific bonuses.
    pub filter: Option<EffectFilter>,
}

impl Effect {
    /// Create an effect with the given name, kind and magnitude.
    pub fn new(name: impl Into<String>, kind: EffectKind, value: f64) -> Self {
        Self {
            id: EffectId::UNSET,
            name: name.into(),
            kind,
            value,
            np_value: None,
            duration: None,
            applied_at: 0,
            uses: None,
            source: String::new(),
            archetype: Archetype::Neutral,
            category: EffectCategory::default(),
            rank: None,
            filter: None,
        }
    }

    /// Set the NP-variant magnitude (builder pattern).
    #[must_use]
    pub fn with_np_value(mut self, value: f64) -> Self {
        self.np_value = Some(value);
        self
    }

    /// Set a lifetime in turns (builder pattern).
    #[must_use]
    pub fn with_duration(mut self, turns: u32) -> Self {
        self.duration = Some(turns);
        self
    }

    /// Set limited uses (builder pattern).
    #[must_use]
    pub fn with_uses(mut self, uses: u32) -> Self {
        self.uses = Some(uses);
        self
    }

    /// Set the attribution string (builder pattern).
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Set an explicit archetype (builder pattern).
    #[must_use]
    pub fn with_archetype(mut self, archetype: Archetype) -> Self {
        self.archetype = archetype;
        self
    }

    /// Set the category (builder pattern).
    #[must_use]
    pub fn with_category(mut self, category: EffectCategory) -> Self {
        self.category = category;
        self
    }

    /// Set the stored rank (builder pattern).
    #[must_use]
    pub fn with_rank(mut self, rank: Rank) -> Self {
        self.rank = Some(rank);
        self
    }

    /// Set the match filter (builder pattern).
    #[must_use]
    pub fn with_filter(mut self, filter: EffectFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Is the effect still live on the given turn?
    ///
    /// Permanent effects are always live. A timed effect is live until
    /// `applied_at + duration` turns have started. Exhausted uses are
    /// removed at consumption time, so liveness only checks time.
    #[must_use]
    pub fn is_active(&self, turn: u32) -> bool {
        match self.duration {
            None => true,
            Some(duration) => turn < self.applied_at.saturating_add(duration),
        }
    }

    /// Resolved buff/debuff classification.
    ///
    /// Explicit archetype wins; otherwise a negative magnitude reads as
    /// a debuff and the kind's default list decides the rest.
    #[must_use]
    pub fn classify(&self) -> Archetype {
        if self.archetype != Archetype::Neutral {
            return self.archetype;
        }
        if self.value < 0.0 {
            return Archetype::Debuff;
        }
        self.kind.default_archetype()
    }

    /// Magnitude to use for the given attack flavor.
    #[must_use]
    pub fn magnitude(&self, versus_np: bool) -> f64 {
        if versus_np {
            self.np_value.unwrap_or(self.value)
        } else {
            self.value
        }
    }

    /// Any consumptions left?
    #[must_use]
    pub fn has_uses_left(&self) -> bool {
        self.uses.is_none_or(|u| u > 0)
    }

    /// Consume one use. Returns `true` when the effect is now exhausted
    /// and should be removed.
    pub fn consume_use(&mut self) -> bool {
        if let Some(ref mut uses) = self.uses {
            *uses = uses.saturating_sub(1);
            *uses == 0
        } else {
            false
        }
    }
}
