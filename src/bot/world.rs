//! World Interfaces
//!
//! Everything the decision engine knows about the simulation arrives through
//! two read-only traits:
//!
//! - [`WorldQuery`]: units, auras, group rosters, line of sight, threat;
//! - [`AbilityBook`]: the ability catalog plus per-agent knowledge and
//!   cooldowns.
//!
//! Units are exposed as [`UnitInfo`] snapshots. Snapshots are `Copy` and are
//! taken fresh every time they are needed; nothing here holds a reference
//! into the host's storage across a tick.

use bevy::prelude::*;
use smallvec::SmallVec;

use super::abilities::{
    AbilityId, AbilityInfo, AuraState, DispelType, Mechanic, PowerType, SchoolMask, ShapeshiftForm,
};
use super::character::{CharacterClass, Race};
use super::role::Role;
use super::timers::SaturatingCountdown;

/// Short unit lists (attackers, roster members) rarely exceed eight.
pub type UnitList = SmallVec<[Entity; 8]>;

/// Distance a melee swing reaches when the host does not say otherwise.
pub const DEFAULT_MELEE_REACH: f32 = 5.0;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum UnitKind {
    /// A player character, bot-controlled or not.
    Player,
    /// A non-player creature.
    Creature,
    /// A pet or guardian; `owner` is set.
    Pet,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum LifeState {
    #[default]
    Alive,
    /// Dead, body still in the world.
    Corpse,
    /// Dead and released.
    Ghost,
}

/// Creature families that some abilities care about.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum CreatureType {
    #[default]
    Humanoid,
    Beast,
    Demon,
    Dragonkin,
    Elemental,
    Giant,
    Undead,
    Mechanical,
}

/// Weapon slot state; only what enchant decisions need.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct WeaponSlot {
    pub equipped: bool,
    pub enchanted: bool,
}

/// The two hands a temporary weapon enchant can go on.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum WeaponHand {
    MainHand,
    OffHand,
}

/// One snapshot of a unit's state.
#[derive(Clone, Copy, Debug)]
pub struct UnitInfo {
    pub entity: Entity,
    pub kind: UnitKind,
    pub class: Option<CharacterClass>,
    pub race: Option<Race>,
    pub level: u32,
    /// Creature template id; 0 for players.
    pub entry: u32,
    pub creature_type: CreatureType,
    /// Owner of a pet.
    pub owner: Option<Entity>,
    /// Pet of a player.
    pub pet: Option<Entity>,
    pub map_id: u32,
    pub position: Vec3,
    pub bounding_radius: f32,
    pub melee_reach: f32,
    pub life: LifeState,
    pub health: u32,
    pub max_health: u32,
    pub power_type: PowerType,
    pub power: u32,
    pub max_power: u32,
    pub in_combat: bool,
    /// Unit being attacked.
    pub victim: Option<Entity>,
    /// Unit currently selected.
    pub target: Option<Entity>,
    pub melee_attacking: bool,
    pub casting: bool,
    pub auto_repeating: bool,
    pub moving: bool,
    /// Unit being followed by the host's follow movement, if any.
    pub following: Option<Entity>,
    /// Unit being chased by the host's chase movement, if any.
    pub chasing: Option<Entity>,
    pub mounted: bool,
    pub form: ShapeshiftForm,
    pub stealthed: bool,
    pub feigning_death: bool,
    /// Stunned, feared, charmed, confused, or otherwise not in control.
    pub lost_control: bool,
    pub rooted: bool,
    pub snared: bool,
    pub enraged: bool,
    /// Cannot be interacted with (evading, phased, in a separate area).
    pub isolated: bool,
    /// Under crowd control that breaks on damage.
    pub breakable_cc: bool,
    pub in_battleground: bool,
    /// On a taxi or other scripted transit.
    pub in_transit: bool,
    /// Boat/zeppelin the unit is riding.
    pub transport: Option<u32>,
    pub in_instance: bool,
    pub subgroup: u8,
    pub combo_points: u32,
    /// Active `AuraState` bits.
    pub aura_states: u32,
    pub immune_schools: SchoolMask,
    /// Immune `Mechanic` bits.
    pub immune_mechanics: u32,
    pub reflect_schools: SchoolMask,
    /// Carries a shield in the off hand.
    pub has_shield: bool,
    pub main_hand: WeaponSlot,
    pub off_hand: WeaponSlot,
}

impl UnitInfo {
    /// A living level-1 creature at `position`. Hosts and tests fill in the
    /// rest with struct update syntax.
    pub fn new(entity: Entity, kind: UnitKind, position: Vec3) -> Self {
        Self {
            entity,
            kind,
            class: None,
            race: None,
            level: 1,
            entry: 0,
            creature_type: CreatureType::Humanoid,
            owner: None,
            pet: None,
            map_id: 0,
            position,
            bounding_radius: 0.5,
            melee_reach: DEFAULT_MELEE_REACH,
            life: LifeState::Alive,
            health: 100,
            max_health: 100,
            power_type: PowerType::Mana,
            power: 100,
            max_power: 100,
            in_combat: false,
            victim: None,
            target: None,
            melee_attacking: false,
            casting: false,
            auto_repeating: false,
            moving: false,
            following: None,
            chasing: None,
            mounted: false,
            form: ShapeshiftForm::None,
            stealthed: false,
            feigning_death: false,
            lost_control: false,
            rooted: false,
            snared: false,
            enraged: false,
            isolated: false,
            breakable_cc: false,
            in_battleground: false,
            in_transit: false,
            transport: None,
            in_instance: false,
            subgroup: 0,
            combo_points: 0,
            aura_states: 0,
            immune_schools: SchoolMask::NONE,
            immune_mechanics: 0,
            reflect_schools: SchoolMask::NONE,
            has_shield: false,
            main_hand: WeaponSlot::default(),
            off_hand: WeaponSlot::default(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.life == LifeState::Alive
    }

    pub fn is_dead(&self) -> bool {
        !self.is_alive()
    }

    pub fn is_player(&self) -> bool {
        self.kind == UnitKind::Player
    }

    pub fn is_pet(&self) -> bool {
        self.kind == UnitKind::Pet
    }

    /// Health as a percentage (0-100)
    pub fn health_pct(&self) -> f32 {
        if self.max_health == 0 {
            return 0.0;
        }
        self.health as f32 / self.max_health as f32 * 100.0
    }

    /// Power as a percentage (0-100). Units without a pool report 0.
    pub fn power_pct(&self) -> f32 {
        if self.max_power == 0 {
            return 0.0;
        }
        self.power as f32 / self.max_power as f32 * 100.0
    }

    pub fn missing_health(&self) -> u32 {
        self.max_health.saturating_sub(self.health)
    }

    pub fn uses_mana(&self) -> bool {
        self.power_type == PowerType::Mana && self.max_power > 0
    }

    /// Current value of the given pool.
    pub fn power_of(&self, power_type: PowerType) -> u32 {
        match power_type {
            PowerType::Health => self.health,
            other if other == self.power_type => self.power,
            _ => 0,
        }
    }

    pub fn distance_to(&self, other: &UnitInfo) -> f32 {
        self.position.distance(other.position)
    }

    /// Edge-to-edge distance, the way spell ranges are measured.
    pub fn combat_distance_to(&self, other: &UnitInfo) -> f32 {
        (self.distance_to(other) - self.bounding_radius - other.bounding_radius).max(0.0)
    }

    pub fn distance_2d_to(&self, other: &UnitInfo) -> f32 {
        self.position.truncate().distance(other.position.truncate())
    }

    /// Can `self` hit `other` with a melee swing from where it stands.
    pub fn can_reach_with_melee(&self, other: &UnitInfo) -> bool {
        self.combat_distance_to(other) <= self.melee_reach.max(DEFAULT_MELEE_REACH)
    }

    /// Planar angle from `self` to `other`, in radians.
    pub fn angle_to(&self, other: &UnitInfo) -> f32 {
        let delta = other.position - self.position;
        delta.y.atan2(delta.x)
    }

    pub fn has_aura_state(&self, state: AuraState) -> bool {
        self.aura_states & state.bit() != 0
    }

    pub fn is_immune_to_mechanic(&self, mechanic: Mechanic) -> bool {
        self.immune_mechanics & mechanic.bit() != 0
    }

    /// Units that cast spells as their main damage source.
    pub fn is_caster(&self) -> bool {
        self.power_type == PowerType::Mana
            && !matches!(
                self.class,
                Some(CharacterClass::Hunter) | Some(CharacterClass::Paladin)
            )
    }
}

/// One aura on a unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AuraInfo {
    pub ability: AbilityId,
    /// First rank of the ability that applied it.
    pub chain_head: AbilityId,
    pub caster: Option<Entity>,
    pub stacks: u32,
    pub positive: bool,
    pub dispel: DispelType,
    pub periodic_heal: bool,
    pub exclusive_group: Option<u32>,
    pub group_power: u32,
}

/// Raid target icons, in marker order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RaidMarker {
    Star,
    Circle,
    Diamond,
    Triangle,
    Moon,
    Square,
    Cross,
    Skull,
}

impl RaidMarker {
    /// Markers that request crowd control.
    pub const CROWD_CONTROL: [RaidMarker; 3] = [RaidMarker::Moon, RaidMarker::Square, RaidMarker::Diamond];
    /// Markers that request focus fire.
    pub const FOCUS: [RaidMarker; 2] = [RaidMarker::Skull, RaidMarker::Cross];
}

/// The group (party or raid) a unit belongs to.
#[derive(Clone, Debug, Default)]
pub struct GroupInfo {
    pub leader: Option<Entity>,
    pub raid: bool,
    pub members: UnitList,
    pub marks: SmallVec<[(RaidMarker, Entity); 8]>,
}

impl GroupInfo {
    pub fn contains(&self, unit: Entity) -> bool {
        self.members.contains(&unit)
    }

    pub fn marked(&self, marker: RaidMarker) -> Option<Entity> {
        self.marks.iter().find(|(m, _)| *m == marker).map(|(_, e)| *e)
    }
}

/// Heal claims on one unit. While a countdown runs, other healers skip the
/// unit for that kind of heal.
#[derive(Clone, Copy, Debug, Default)]
pub struct HealClaim {
    pub direct: SaturatingCountdown,
    pub periodic: SaturatingCountdown,
}

impl HealClaim {
    pub fn tick(&mut self, elapsed: u32) {
        self.direct.tick(elapsed);
        self.periodic.tick(elapsed);
    }
}

/// Which heal-claim timer a claim refers to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HealKind {
    Direct,
    Periodic,
}

/// Read-only view of the simulation.
pub trait WorldQuery {
    fn unit(&self, entity: Entity) -> Option<UnitInfo>;
    fn auras(&self, entity: Entity) -> Vec<AuraInfo>;
    /// Units currently attacking `entity`.
    fn attackers(&self, entity: Entity) -> UnitList;
    fn group(&self, entity: Entity) -> Option<GroupInfo>;
    fn in_line_of_sight(&self, from: Entity, to: Entity) -> bool;
    /// Hostile, attackable, and visible to `attacker`.
    fn can_attack(&self, attacker: Entity, target: Entity) -> bool;
    fn threat(&self, hostile: Entity, unit: Entity) -> f32;
    /// Hostile units within `radius` of `center`.
    fn hostiles_near(&self, center: Vec3, radius: f32, viewer: Entity) -> UnitList;
    /// Positions of world objects with template `entry` within `radius`.
    fn objects_near(&self, center: Vec3, radius: f32, entry: u32) -> Vec<Vec3>;
    fn heal_claim(&self, entity: Entity) -> HealClaim;
    /// `caster` already has an instance of a single-target aura from this
    /// ability active somewhere.
    fn single_target_aura_active(&self, caster: Entity, ability: AbilityId) -> bool;
    /// Role of another bot-controlled unit, when the host tracks one.
    fn bot_role(&self, _entity: Entity) -> Option<Role> {
        None
    }
}

/// One known-ability roster entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KnownAbility {
    pub id: AbilityId,
    pub disabled: bool,
    pub removed: bool,
}

impl KnownAbility {
    pub fn active(id: AbilityId) -> Self {
        Self {
            id,
            disabled: false,
            removed: false,
        }
    }
}

/// Ability catalog plus per-agent ability state.
pub trait AbilityBook {
    fn ability(&self, id: AbilityId) -> Option<&AbilityInfo>;
    fn known_abilities(&self, agent: Entity) -> Vec<KnownAbility>;
    fn cooldown_remaining(&self, agent: Entity, id: AbilityId) -> u32;
    fn global_cooldown_remaining(&self, agent: Entity, id: AbilityId) -> u32;
    fn knows(&self, agent: Entity, id: AbilityId) -> bool;
}

/// Helpers shared by every `WorldQuery` implementation.
pub trait WorldQueryExt: WorldQuery {
    fn has_aura(&self, entity: Entity, ability: AbilityId) -> bool {
        self.auras(entity).iter().any(|a| a.ability == ability)
    }

    /// Aura of any rank of the chain headed by `head`.
    fn has_aura_chain(&self, entity: Entity, head: AbilityId) -> bool {
        self.auras(entity).iter().any(|a| a.chain_head == head)
    }

    fn aura_stacks(&self, entity: Entity, ability: AbilityId) -> u32 {
        self.auras(entity)
            .iter()
            .filter(|a| a.ability == ability)
            .map(|a| a.stacks)
            .max()
            .unwrap_or(0)
    }

    fn has_periodic_heal(&self, entity: Entity) -> bool {
        self.auras(entity).iter().any(|a| a.periodic_heal)
    }

    /// Attackers of `entity` within `range` of it.
    fn attackers_within(&self, entity: Entity, range: f32) -> usize {
        let Some(me) = self.unit(entity) else {
            return 0;
        };
        self.attackers(entity)
            .iter()
            .filter_map(|a| self.unit(*a))
            .filter(|a| me.distance_to(a) <= range)
            .count()
    }
}

impl<T: WorldQuery + ?Sized> WorldQueryExt for T {}
