//! Ability System - Types and Enums
//!
//! Immutable ability reference data as the decision engine sees it.
//! Concrete definitions come from the shared catalog (`ability_config`),
//! loaded once from `assets/config/abilities.ron`.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Stable numeric ability id, as used by the simulation's spell store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbilityId(pub u32);

/// Spell schools. Used for immunity and reflection checks.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum SpellSchool {
    Physical,
    Holy,
    Fire,
    Nature,
    Frost,
    Shadow,
    Arcane,
}

impl SpellSchool {
    pub fn mask(self) -> SchoolMask {
        SchoolMask(1 << self as u8)
    }
}

/// Bit set of spell schools.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchoolMask(pub u8);

impl SchoolMask {
    pub const NONE: SchoolMask = SchoolMask(0);
    pub const ALL: SchoolMask = SchoolMask(0x7F);

    pub fn contains(self, school: SpellSchool) -> bool {
        self.0 & school.mask().0 != 0
    }

    pub fn intersects(self, other: SchoolMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn with(self, school: SpellSchool) -> SchoolMask {
        SchoolMask(self.0 | school.mask().0)
    }
}

/// How an ability's damage is classified. Only `Magic` can be reflected.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum DamageClass {
    #[default]
    None,
    Magic,
    Melee,
    Ranged,
}

/// Resource pools. `Health` is used by abilities that cost life (Life Tap).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum PowerType {
    #[default]
    Mana,
    Rage,
    Energy,
    Health,
}

/// Dispel categories an aura can belong to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum DispelType {
    #[default]
    None,
    Magic,
    Curse,
    Disease,
    Poison,
}

/// Effect mechanics relevant to immunity checks.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Mechanic {
    Charm,
    Disorient,
    Fear,
    Root,
    Silence,
    Sleep,
    Snare,
    Stun,
    Polymorph,
    Banish,
    Shield,
    Shackle,
    Bandage,
}

impl Mechanic {
    pub fn bit(self) -> u32 {
        1 << self as u32
    }
}

/// Conditional states an ability may require on its caster or target
/// (e.g. Execute needs the target below 20% health).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum AuraState {
    /// Set after dodging/blocking/parrying (Revenge, Overpower, Riposte).
    Defense,
    /// Target below 20% health (Execute, Hammer of Wrath).
    HealthBelow20,
    /// Set after a critical hit.
    Crit,
    /// Hunter parry window (Mongoose Bite, Counterattack).
    HunterParry,
    /// Target has a Fire debuff that can be consumed (Conflagrate).
    Immolated,
    /// Caster is stealthed (openers).
    Stealthed,
}

impl AuraState {
    pub fn bit(self) -> u32 {
        1 << self as u32
    }
}

/// Shapeshift forms and stances.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum ShapeshiftForm {
    #[default]
    None,
    Bear,
    DireBear,
    Cat,
    Travel,
    Aquatic,
    Moonkin,
    BattleStance,
    DefensiveStance,
    BerserkerStance,
    Shadowform,
    GhostWolf,
    Stealth,
}

impl ShapeshiftForm {
    /// Bear and Dire Bear are interchangeable for every form check.
    pub fn is_bear(self) -> bool {
        matches!(self, ShapeshiftForm::Bear | ShapeshiftForm::DireBear)
    }
}

/// Declared effects, used to classify abilities into heal/taunt/resurrection
/// lists without looking at their names.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum AbilityEffect {
    Damage,
    Heal,
    PeriodicHeal,
    PeriodicDamage,
    Taunt,
    /// Area taunt (Challenging Shout / Roar). Never put on the taunt list.
    AreaTaunt,
    Resurrect,
    Dispel(DispelType),
    Interrupt,
    Summon,
    WeaponEnchant,
    Shapeshift(ShapeshiftForm),
    Stealth,
    FeignDeath,
    Mount,
    Absorb,
    Threat,
}

/// Aura properties of abilities that leave an aura behind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuraSpec {
    /// Maximum stack count (1 = does not stack).
    #[serde(default = "default_max_stack")]
    pub max_stack: u32,
    /// Beneficial aura (buff) vs harmful (debuff).
    #[serde(default)]
    pub positive: bool,
    #[serde(default)]
    pub dispel: DispelType,
    #[serde(default)]
    pub mechanic: Option<Mechanic>,
    /// Damage breaks the effect (Polymorph, Sap, Gouge).
    #[serde(default)]
    pub breaks_on_damage: bool,
    /// Only one instance per caster may be active (Polymorph, Banish).
    #[serde(default)]
    pub single_target: bool,
    /// Buffs in the same group overwrite each other; the higher
    /// `group_power` wins (Mark of the Wild vs Gift of the Wild).
    #[serde(default)]
    pub exclusive_group: Option<u32>,
    #[serde(default)]
    pub group_power: u32,
    /// Aura duration in milliseconds
    #[serde(default = "default_aura_duration")]
    pub duration_ms: u32,
}

fn default_max_stack() -> u32 {
    1
}

fn default_aura_duration() -> u32 {
    30_000
}

impl Default for AuraSpec {
    fn default() -> Self {
        Self {
            max_stack: 1,
            positive: false,
            dispel: DispelType::None,
            mechanic: None,
            breaks_on_damage: false,
            single_target: false,
            exclusive_group: None,
            group_power: 0,
            duration_ms: default_aura_duration(),
        }
    }
}

/// Immutable ability reference data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AbilityInfo {
    pub id: AbilityId,
    pub name: String,
    /// Rank within the ability's chain (1 = first rank)
    #[serde(default = "default_rank")]
    pub rank: u8,
    /// Id of the first rank of the chain (None = this is the first rank)
    #[serde(default)]
    pub first_rank: Option<AbilityId>,
    #[serde(default = "default_school")]
    pub school: SpellSchool,
    #[serde(default)]
    pub damage_class: DamageClass,
    #[serde(default)]
    pub power_type: PowerType,
    #[serde(default)]
    pub cost: u32,
    /// Minimum range in yards (0 = none)
    #[serde(default)]
    pub min_range: f32,
    /// Maximum range in yards. `None` means the range entry is missing and
    /// the ability is never eligible on another unit.
    #[serde(default)]
    pub max_range: Option<f32>,
    /// Cast time in milliseconds (0 = instant)
    #[serde(default)]
    pub cast_time_ms: u32,
    #[serde(default)]
    pub cooldown_ms: u32,
    /// Triggers the global cooldown when cast
    #[serde(default = "default_true")]
    pub on_global_cooldown: bool,
    /// Total healing (direct amount, or all periodic ticks summed)
    #[serde(default)]
    pub heal_amount: i32,
    /// Nominal damage, used only by the sandbox host
    #[serde(default)]
    pub damage_amount: i32,
    /// Targets the caster (or an area around the caster) regardless of the
    /// requested target.
    #[serde(default)]
    pub self_targeted: bool,
    #[serde(default)]
    pub passive: bool,
    /// Client-hidden helper spells that are never cast directly.
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub effects: SmallVec<[AbilityEffect; 2]>,
    #[serde(default)]
    pub aura: Option<AuraSpec>,
    #[serde(default)]
    pub caster_aura_state: Option<AuraState>,
    #[serde(default)]
    pub target_aura_state: Option<AuraState>,
    /// Forms the caster must be in. Empty = usable in any form.
    #[serde(default)]
    pub required_forms: SmallVec<[ShapeshiftForm; 2]>,
    /// Forms in which the ability cannot be used.
    #[serde(default)]
    pub excluded_forms: SmallVec<[ShapeshiftForm; 2]>,
    /// Item consumed on cast (arrows, soul shards, powders)
    #[serde(default)]
    pub reagent: Option<u32>,
}

fn default_rank() -> u8 {
    1
}

fn default_school() -> SpellSchool {
    SpellSchool::Physical
}

fn default_true() -> bool {
    true
}

impl AbilityInfo {
    /// Id of the first rank of this ability's chain.
    pub fn chain_head(&self) -> AbilityId {
        self.first_rank.unwrap_or(self.id)
    }

    /// True if both abilities are ranks of the same chain.
    pub fn same_chain(&self, other: &AbilityInfo) -> bool {
        self.chain_head() == other.chain_head()
    }

    pub fn has_effect(&self, effect: AbilityEffect) -> bool {
        self.effects.contains(&effect)
    }

    pub fn applies_aura(&self) -> bool {
        self.aura.is_some()
    }

    /// Dispel types this ability removes.
    pub fn dispels(&self) -> impl Iterator<Item = DispelType> + '_ {
        self.effects.iter().filter_map(|effect| match effect {
            AbilityEffect::Dispel(kind) => Some(*kind),
            _ => None,
        })
    }

    pub fn is_dispel(&self) -> bool {
        self.dispels().next().is_some()
    }

    /// Damage breaks the aura this ability applies.
    pub fn breaks_on_damage(&self) -> bool {
        self.aura.as_ref().map(|a| a.breaks_on_damage).unwrap_or(false)
    }

    pub fn is_single_target_aura(&self) -> bool {
        self.aura.as_ref().map(|a| a.single_target).unwrap_or(false)
    }

    pub fn mechanic(&self) -> Option<Mechanic> {
        self.aura.as_ref().and_then(|a| a.mechanic)
    }

    pub fn is_positive(&self) -> bool {
        self.aura.as_ref().map(|a| a.positive).unwrap_or(false)
    }

    /// Whether this ability may be cast in `form`.
    pub fn usable_in_form(&self, form: ShapeshiftForm) -> bool {
        if self.excluded_forms.contains(&form) {
            return false;
        }
        if self.required_forms.is_empty() {
            return true;
        }
        self.required_forms
            .iter()
            .any(|f| *f == form || (f.is_bear() && form.is_bear()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: u32) -> AbilityInfo {
        AbilityInfo {
            id: AbilityId(id),
            name: "Test".to_string(),
            rank: 1,
            first_rank: None,
            school: SpellSchool::Holy,
            damage_class: DamageClass::Magic,
            power_type: PowerType::Mana,
            cost: 0,
            min_range: 0.0,
            max_range: Some(40.0),
            cast_time_ms: 0,
            cooldown_ms: 0,
            on_global_cooldown: true,
            heal_amount: 0,
            damage_amount: 0,
            self_targeted: false,
            passive: false,
            hidden: false,
            effects: SmallVec::new(),
            aura: None,
            caster_aura_state: None,
            target_aura_state: None,
            required_forms: SmallVec::new(),
            excluded_forms: SmallVec::new(),
            reagent: None,
        }
    }

    #[test]
    fn test_school_mask_contains() {
        let mask = SpellSchool::Fire.mask().with(SpellSchool::Frost);
        assert!(mask.contains(SpellSchool::Fire));
        assert!(mask.contains(SpellSchool::Frost));
        assert!(!mask.contains(SpellSchool::Shadow));
        assert!(SchoolMask::ALL.contains(SpellSchool::Arcane));
    }

    #[test]
    fn test_chain_head_defaults_to_self() {
        let mut rank3 = info(3);
        assert_eq!(rank3.chain_head(), AbilityId(3));
        rank3.first_rank = Some(AbilityId(1));
        assert_eq!(rank3.chain_head(), AbilityId(1));
        assert!(rank3.same_chain(&info(1)));
    }

    #[test]
    fn test_required_forms_accept_either_bear() {
        let mut maul = info(6807);
        maul.required_forms.push(ShapeshiftForm::Bear);
        assert!(maul.usable_in_form(ShapeshiftForm::DireBear));
        assert!(!maul.usable_in_form(ShapeshiftForm::Cat));
        assert!(!maul.usable_in_form(ShapeshiftForm::None));
    }

    #[test]
    fn test_excluded_forms() {
        let mut heal = info(2054);
        heal.excluded_forms.push(ShapeshiftForm::Shadowform);
        assert!(heal.usable_in_form(ShapeshiftForm::None));
        assert!(!heal.usable_in_form(ShapeshiftForm::Shadowform));
    }

    #[test]
    fn test_dispels_lists_every_type() {
        let mut cleanse = info(4987);
        cleanse.effects.push(AbilityEffect::Dispel(DispelType::Magic));
        cleanse.effects.push(AbilityEffect::Dispel(DispelType::Poison));
        let kinds: Vec<_> = cleanse.dispels().collect();
        assert_eq!(kinds, vec![DispelType::Magic, DispelType::Poison]);
        assert!(cleanse.is_dispel());
    }
}
