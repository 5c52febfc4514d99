//! Party Bot Agent
//!
//! `PartyBot` owns one agent's state and runs its decision loop. The host
//! calls `update` every frame; the loop body only runs when the update
//! interval elapses.
//!
//! ## Tick order
//! 1. Timers
//! 2. First-tick setup (role, loadout, consumables, pet)
//! 3. Leader gate
//! 4. Environment gates (battleground, transit, feign death, death, casting)
//! 5. Target upkeep
//! 6. In-combat routine, or the out-of-combat routine

use bevy::prelude::*;
use std::sync::Arc;

use super::abilities::{AbilityId, ShapeshiftForm};
use super::character::CharacterClass;
use super::class_ai::{attack_start, behavior_for, ClassBehavior, PopulateInput};
use super::commands::{CancelAura, CommandQueue, CommandSink, OutboundCommand};
use super::consumables::{
    Consumables, BANDAGE_BELOW_PCT, DRINK, DRINK_50, DRINK_BELOW_PCT, EAT_BELOW_PCT, FOOD,
    POTION_BELOW_PCT,
};
use super::context::BotContext;
use super::loadout::Loadout;
use super::mechanics::{check_mechanics, MechanicsVerdict};
use super::movement::{chase, follow_leader_default, maintain_distance, move_toward};
use super::rng::BotRng;
use super::role::{classify_role, Role};
use super::slot_table::SlotTable;
use super::timers::{IntervalTimer, SaturatingCountdown, Stopwatch};
use super::world::{AbilityBook, GroupInfo, LifeState, RaidMarker, UnitInfo, WorldQuery};

pub const UPDATE_INTERVAL_MS: u32 = 1000;
pub const FIRST_UPDATE_DELAY_MS: u32 = 2000;

pub const SPELL_THROTTLE_CEILING_MS: u32 = 35_000;
pub const AOE_THROTTLE_CEILING_MS: u32 = 35_000;
pub const THREAT_CHECK_CEILING_MS: u32 = 3_000;

/// Dead agents revive on their own after waiting this long.
pub const AUTO_REVIVE_WAIT_MS: u32 = 120_000;

/// Feign death is held while hostiles are this close.
pub const FEIGN_DEATH_HOLD_RADIUS: f32 = 20.0;

pub const STEALTH_TRAIL_DISTANCE: f32 = 15.0;
pub const TELEPORT_DISTANCE: f32 = 100.0;
pub const TELEPORT_PLANAR_DISTANCE: f32 = 90.0;
pub const TELEPORT_VERTICAL_DISTANCE: f32 = 19.2;
pub const FOLLOW_TRAIL_DISTANCE: f32 = 6.6;

pub const HEALER_MAX_DISTANCE: f32 = 32.0;
pub const HEALER_REPOSITION_DISTANCE: f32 = 25.0;
pub const RANGED_CLOSE_IN_DISTANCE: f32 = 28.0;

/// Debuff left by a bandage.
pub const RECENTLY_BANDAGED: AbilityId = AbilityId(11196);

/// Everything an agent remembers between ticks.
pub struct BotState {
    pub role: Role,
    pub loadout: Loadout,
    pub rng: BotRng,
    /// Spaces long crowd control (Banish and the like).
    pub spell_throttle: SaturatingCountdown,
    /// Gates area abilities.
    pub aoe_throttle: SaturatingCountdown,
    /// While running, `threat_ok` is the cached threat answer.
    pub threat_check: SaturatingCountdown,
    pub threat_ok: bool,
    pub resurrect_wait: Stopwatch,
    pub cc_marks: Vec<RaidMarker>,
    pub focus_marks: Vec<RaidMarker>,
    /// Set while a buff round is in progress.
    pub is_buffing: bool,
    pub battleground_invite: bool,
    pub consumables: Consumables,
}

impl BotState {
    pub fn new(role: Role, rng: BotRng) -> Self {
        Self {
            role,
            loadout: Loadout::default(),
            rng,
            spell_throttle: SaturatingCountdown::with_ceiling(SPELL_THROTTLE_CEILING_MS),
            aoe_throttle: SaturatingCountdown::with_ceiling(AOE_THROTTLE_CEILING_MS),
            threat_check: SaturatingCountdown::with_ceiling(THREAT_CHECK_CEILING_MS),
            threat_ok: true,
            resurrect_wait: Stopwatch::default(),
            cc_marks: RaidMarker::CROWD_CONTROL.to_vec(),
            focus_marks: RaidMarker::FOCUS.to_vec(),
            is_buffing: false,
            battleground_invite: false,
            consumables: Consumables::default(),
        }
    }

    fn tick_timers(&mut self, diff: u32) {
        self.spell_throttle.tick(diff);
        self.aoe_throttle.tick(diff);
        self.threat_check.tick(diff);
    }
}

/// One autonomous party member.
pub struct PartyBot {
    entity: Entity,
    class: CharacterClass,
    leader: Entity,
    role_override: Option<Role>,
    behavior: Box<dyn ClassBehavior>,
    slot_table: Arc<SlotTable>,
    state: BotState,
    update_timer: IntervalTimer,
    initialized: bool,
    outbound: CommandQueue,
}

impl PartyBot {
    /// `role` forces a role; `None` classifies from known abilities on the
    /// first tick.
    pub fn new(
        entity: Entity,
        class: CharacterClass,
        leader: Entity,
        role: Option<Role>,
        slot_table: Arc<SlotTable>,
        rng: BotRng,
    ) -> Self {
        Self {
            entity,
            class,
            leader,
            role_override: role,
            behavior: behavior_for(class),
            slot_table,
            state: BotState::new(role.unwrap_or(Role::MeleeDps), rng),
            update_timer: IntervalTimer::new(UPDATE_INTERVAL_MS, FIRST_UPDATE_DELAY_MS),
            initialized: false,
            outbound: CommandQueue::default(),
        }
    }

    /// Replace the raid markers this agent crowd-controls and focuses.
    pub fn with_marks(mut self, cc_marks: Vec<RaidMarker>, focus_marks: Vec<RaidMarker>) -> Self {
        self.state.cc_marks = cc_marks;
        self.state.focus_marks = focus_marks;
        self
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn class(&self) -> CharacterClass {
        self.class
    }

    pub fn leader(&self) -> Entity {
        self.leader
    }

    pub fn role(&self) -> Role {
        self.state.role
    }

    pub fn state(&self) -> &BotState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut BotState {
        &mut self.state
    }

    pub fn outbound(&mut self) -> &mut CommandQueue {
        &mut self.outbound
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Forget everything learned since login. The next tick after the
    /// first-update delay repeats the first-tick setup.
    pub fn reset(&mut self) {
        let rng = std::mem::take(&mut self.state.rng);
        let mut state = BotState::new(self.role_override.unwrap_or(Role::MeleeDps), rng);
        state.cc_marks = std::mem::take(&mut self.state.cc_marks);
        state.focus_marks = std::mem::take(&mut self.state.focus_marks);
        self.state = state;
        self.update_timer = IntervalTimer::new(UPDATE_INTERVAL_MS, FIRST_UPDATE_DELAY_MS);
        self.initialized = false;
    }

    /// Rebuild the loadout from the current roster. Hosts call this when
    /// the agent learns or loses abilities.
    pub fn repopulate(&mut self, book: &dyn AbilityBook, me: &UnitInfo) {
        let roster = book.known_abilities(self.entity);
        let mut loadout = Loadout::populate(&roster, book, &self.slot_table);
        self.behavior.populate_abilities(
            &mut loadout,
            PopulateInput {
                role: self.state.role,
                me: *me,
                rng: &mut self.state.rng,
            },
        );
        self.state.loadout = loadout;
    }

    /// Advance the agent by `diff` ms.
    pub fn update(
        &mut self,
        diff: u32,
        world: &dyn WorldQuery,
        book: &dyn AbilityBook,
        commands: &mut dyn CommandSink,
    ) {
        self.state.tick_timers(diff);

        let Some(me) = world.unit(self.entity) else {
            return;
        };
        if me.is_dead() {
            self.state.resurrect_wait.tick(diff);
        }

        if !self.update_timer.tick(diff) {
            return;
        }

        if !self.initialized {
            self.initialize(&me, world, book, commands);
            return;
        }

        let group = world.group(self.entity);
        let Some(leader) = self.party_leader(world, &me, group.as_ref()) else {
            info!("{:?} has no leader to follow, requesting removal", self.entity);
            commands.request_removal(self.entity);
            return;
        };

        let mut ctx = BotContext {
            world,
            book,
            commands,
            state: &mut self.state,
            me,
            leader: Some(leader),
            group,
        };
        run_tick(self.behavior.as_ref(), &mut ctx, &mut self.outbound);
    }

    fn initialize(
        &mut self,
        me: &UnitInfo,
        world: &dyn WorldQuery,
        book: &dyn AbilityBook,
        commands: &mut dyn CommandSink,
    ) {
        self.state.role = match self.role_override {
            Some(role) => role,
            None => classify_role(self.class, |id| book.knows(self.entity, id)),
        };
        info!(
            "{:?} {} assigned role {}",
            self.entity,
            self.class.name(),
            self.state.role.name()
        );

        self.repopulate(book, me);
        self.state.consumables = Consumables::choose(me.level, me.race, self.class, self.state.role);

        let mut ctx = BotContext {
            world,
            book,
            commands,
            state: &mut self.state,
            me: *me,
            leader: world.unit(self.leader),
            group: world.group(self.entity),
        };
        self.behavior.summon_pet(&mut ctx);
        self.initialized = true;
    }

    /// The leader this agent follows, or `None` when it should leave.
    fn party_leader(
        &self,
        world: &dyn WorldQuery,
        me: &UnitInfo,
        group: Option<&GroupInfo>,
    ) -> Option<UnitInfo> {
        let group = group?;
        let leader = world.unit(self.leader)?;
        if leader.in_battleground == me.in_battleground {
            if !group.contains(self.leader) {
                return None;
            }
            if group.leader == Some(me.entity) && !me.in_battleground {
                return None;
            }
        }
        Some(leader)
    }
}

// ============================================================================
// Tick Body
// ============================================================================

fn run_tick(behavior: &dyn ClassBehavior, ctx: &mut BotContext, outbound: &mut CommandQueue) {
    let me = ctx.me;
    let Some(leader) = ctx.leader else {
        return;
    };

    if leader.in_battleground && !me.in_battleground {
        if ctx.state.battleground_invite {
            outbound.push(OutboundCommand::BattlegroundPort { accept: true });
            ctx.state.battleground_invite = false;
        }
        return;
    }

    if leader.in_transit || leader.transport.is_some() && me.transport != leader.transport {
        if me.moving {
            ctx.commands.request_stop_movement(me.entity);
        }
        return;
    }

    if me.feigning_death {
        if ctx.enemies_near(FEIGN_DEATH_HOLD_RADIUS) > 0 {
            return;
        }
        ctx.commands.request_cancel_aura(me.entity, CancelAura::FeignDeath);
    }

    if me.lost_control {
        return;
    }

    if me.is_dead() {
        if me.in_battleground {
            if me.life == LifeState::Corpse {
                ctx.commands.request_release_spirit(me.entity);
            }
        } else if should_auto_revive(ctx, &leader) {
            info!("{:?} reviving at its leader", me.entity);
            ctx.state.resurrect_wait.reset();
            ctx.commands.request_revive(me.entity);
            ctx.commands.request_teleport_to(me.entity, leader.entity);
        }
        return;
    }
    ctx.state.resurrect_wait.reset();

    if me.casting {
        return;
    }

    let verdict = if !leader.mounted && (me.victim.is_some() || me.in_combat) {
        check_mechanics(ctx)
    } else {
        MechanicsVerdict::CONTINUE
    };
    if !verdict.proceed {
        return;
    }

    let victim = if ctx.role() == Role::Healer {
        ctx.select_attack_target()
    } else {
        me.victim
    };

    if verdict.engage && ctx.role() != Role::Healer && me.transport.is_none() && !leader.mounted {
        let victim_ok = victim
            .and_then(|v| ctx.unit(v))
            .map(|v| !v.breakable_cc && ctx.is_valid_hostile_target(&v))
            .unwrap_or(false);
        if !victim_ok {
            if let Some(target) = ctx.select_attack_target() {
                attack_start(ctx, target);
                return;
            }
        }
    }

    if victim.is_none() && me.auto_repeating {
        ctx.commands.request_stop_auto_repeat(me.entity);
    }

    if !leader.mounted && (victim.is_some() || me.in_combat) {
        update_in_combat(behavior, ctx, verdict);
        return;
    }

    if victim.is_none() && !me.in_combat {
        if leader.is_alive() {
            let distance = me.distance_to(&leader);

            if distance > STEALTH_TRAIL_DISTANCE && me.stealthed && !leader.in_combat {
                ctx.commands.request_cancel_aura(me.entity, CancelAura::Stealth);
            }

            if needs_teleport(&me, &leader) {
                if me.moving {
                    ctx.commands.request_stop_movement(me.entity);
                }
                debug!("{:?} too far from leader, teleporting", me.entity);
                ctx.commands.request_teleport_to(me.entity, leader.entity);
                return;
            }

            if distance > FOLLOW_TRAIL_DISTANCE {
                if me.following != Some(leader.entity) {
                    follow_leader_default(ctx);
                }
                return;
            }
        }

        if !me.mounted {
            if drink_and_eat(ctx) {
                return;
            }
            if update_out_of_combat(behavior, ctx) || ctx.state.is_buffing {
                return;
            }
        }

        if leader.mounted {
            if !me.mounted {
                mount_up(ctx);
                return;
            }
        } else if me.mounted {
            ctx.commands.request_cancel_aura(me.entity, CancelAura::Mount);
        }
    }

    if leader.is_alive() && !me.moving && victim.is_none() && me.following != Some(leader.entity) {
        follow_leader_default(ctx);
    }
}

fn should_auto_revive(ctx: &BotContext, leader: &UnitInfo) -> bool {
    if ctx.me.life == LifeState::Ghost {
        return true;
    }
    leader.is_alive()
        && !leader.in_combat
        && (leader.map_id != ctx.me.map_id || ctx.state.resurrect_wait.elapsed() > AUTO_REVIVE_WAIT_MS)
}

fn needs_teleport(me: &UnitInfo, leader: &UnitInfo) -> bool {
    me.map_id != leader.map_id
        || me.distance_to(leader) > TELEPORT_DISTANCE
        || me.transport != leader.transport
        || me.distance_2d_to(leader) > TELEPORT_PLANAR_DISTANCE
        || (me.position.z - leader.position.z).abs() > TELEPORT_VERTICAL_DISTANCE
}

fn mount_up(ctx: &mut BotContext) {
    let me = ctx.me;
    if me.stealthed {
        ctx.commands.request_cancel_aura(me.entity, CancelAura::Stealth);
    }
    if me.form != ShapeshiftForm::None {
        ctx.commands.request_cancel_aura(me.entity, CancelAura::Shapeshift);
    }
    if let Some(mount) = ctx.state.consumables.mount {
        if me.moving {
            ctx.commands.request_stop_movement(me.entity);
        }
        ctx.commands.request_use_consumable(me.entity, mount);
    }
}

/// Eat and drink back up between fights. True while the agent needs to
/// keep resting.
pub fn drink_and_eat(ctx: &mut BotContext) -> bool {
    if ctx.state.is_buffing || ctx.me.victim.is_some() {
        return false;
    }
    let me = ctx.me;

    let need_eat = me.health_pct() < EAT_BELOW_PCT;
    let need_drink = me.uses_mana() && me.power_pct() < DRINK_BELOW_PCT;
    let eating = ctx.has_aura(me.entity, FOOD);
    let drinking = ctx.has_aura(me.entity, DRINK) || ctx.has_aura(me.entity, DRINK_50);

    if need_eat && !eating {
        if me.moving {
            ctx.commands.request_stop_movement(me.entity);
        }
        ctx.commands.request_use_consumable(me.entity, FOOD);
        return true;
    }

    if need_drink && !drinking {
        if me.moving {
            ctx.commands.request_stop_movement(me.entity);
        }
        let drink = if me.level >= 50 { DRINK_50 } else { DRINK };
        ctx.commands.request_use_consumable(me.entity, drink);
        return true;
    }

    need_eat || need_drink
}

/// Cast the class's crowd control on the first marked hostile that takes it.
pub fn crowd_control_marked_targets(behavior: &dyn ClassBehavior, ctx: &mut BotContext) -> bool {
    let Some(ability) = behavior.crowd_control_ability(ctx) else {
        return false;
    };
    for target in ctx.crowd_control_candidates() {
        if ctx.try_cast(target, ability) {
            debug!("{:?} crowd-controlling marked {:?}", ctx.me.entity, target);
            ctx.commands.request_attack_stop(ctx.me.entity);
            ctx.me.melee_attacking = false;
            return true;
        }
    }
    false
}

fn update_out_of_combat(behavior: &dyn ClassBehavior, ctx: &mut BotContext) -> bool {
    let me = ctx.me.entity;

    if let Some(resurrection) = ctx.state.loadout.resurrection {
        if let Some(target) = ctx.select_resurrection_target() {
            if ctx.try_cast(target, resurrection) {
                return true;
            }
        }
    }

    if let Some(elixir) = ctx.state.consumables.elixir {
        if !ctx.has_aura(me, elixir) && use_consumable(ctx, elixir) {
            return true;
        }
    }

    if ctx.in_raid() {
        if let Some(flask) = ctx.state.consumables.flask {
            if !ctx.has_aura(me, flask) && use_consumable(ctx, flask) {
                return true;
            }
        }
    }

    if ctx.role() != Role::Tank
        && ctx.me.victim.is_some()
        && crowd_control_marked_targets(behavior, ctx)
    {
        return true;
    }

    behavior.update_out_of_combat(ctx)
}

fn use_consumable(ctx: &mut BotContext, ability: AbilityId) -> bool {
    let me = ctx.me.entity;
    if ctx.book.cooldown_remaining(me, ability) > 0 {
        return false;
    }
    ctx.commands.request_use_consumable(me, ability).is_ok()
}

fn update_in_combat(behavior: &dyn ClassBehavior, ctx: &mut BotContext, verdict: MechanicsVerdict) {
    if try_survival_consumables(ctx) {
        return;
    }
    if !verdict.engage {
        return;
    }

    let me = ctx.me;
    let role = ctx.role();
    let victim = me.victim;

    if role == Role::Tank {
        let victim_on_me = victim
            .and_then(|v| ctx.unit(v))
            .map(|v| v.victim == Some(me.entity))
            .unwrap_or(false);
        if victim.is_none() || victim_on_me {
            if let Some(target) = ctx.select_party_attack_target() {
                if victim != Some(target) {
                    ctx.commands.request_attack_stop(me.entity);
                    attack_start(ctx, target);
                    return;
                }
            }
        }
        if let Some(target) = victim {
            if try_taunt(ctx, target) {
                return;
            }
        }
    }

    if role == Role::Healer && reposition_healer(ctx) {
        return;
    }

    match victim.and_then(|v| ctx.unit(v)) {
        Some(target) if role != Role::Healer => {
            if !ctx.me.melee_attacking && ctx.is_valid_hostile_target(&target) {
                attack_start(ctx, target.entity);
                return;
            }
            let out_of_reach = match role {
                Role::Tank | Role::MeleeDps => !ctx.me.can_reach_with_melee(&target),
                Role::RangeDps => ctx.me.distance_to(&target) > RANGED_CLOSE_IN_DISTANCE,
                Role::Healer => false,
            };
            if out_of_reach && chase(ctx, &target) {
                return;
            }
        }
        _ => {
            if role != Role::Tank && crowd_control_marked_targets(behavior, ctx) {
                return;
            }
        }
    }

    if behavior.update_in_combat(ctx) {
        return;
    }

    // Nothing to cast: healers drift along with the fight.
    if role == Role::Healer {
        if let Some(target) = ctx.select_attack_target().and_then(|t| ctx.unit(t)) {
            chase(ctx, &target);
        }
    }
}

/// Bring a healer back in sight of the leader and in range of the fight.
/// Returns true if a movement was issued.
fn reposition_healer(ctx: &mut BotContext) -> bool {
    let me = ctx.me;
    if let Some(leader) = ctx.leader {
        if leader.is_alive() && !ctx.world.in_line_of_sight(me.entity, leader.entity) {
            move_toward(ctx, &leader, 1.0);
            return true;
        }
    }
    let Some(target) = ctx.select_attack_target().and_then(|t| ctx.unit(t)) else {
        return false;
    };
    if me.distance_to(&target) > HEALER_MAX_DISTANCE {
        maintain_distance(ctx, &target, HEALER_REPOSITION_DISTANCE);
        return true;
    }
    false
}

/// Bandage, restorative and emergency potion, in that order.
fn try_survival_consumables(ctx: &mut BotContext) -> bool {
    let me = ctx.me;
    let consumables = ctx.state.consumables;

    if let Some(bandage) = consumables.bandage {
        if !matches!(ctx.role(), Role::Healer | Role::Tank)
            && !ctx.world.heal_claim(me.entity).direct.is_running()
            && me.health_pct() <= BANDAGE_BELOW_PCT
            && !ctx.has_aura(me.entity, RECENTLY_BANDAGED)
            && use_consumable(ctx, bandage)
        {
            return true;
        }
    }

    if let Some(restorative) = consumables.restorative {
        if ctx.is_valid_dispel_target(&me, restorative) && use_consumable(ctx, restorative) {
            return true;
        }
    }

    if let Some(potion) = consumables.potion {
        if me.health_pct() <= POTION_BELOW_PCT && use_consumable(ctx, potion) {
            return true;
        }
    }

    false
}

/// Pull `target` back off a non-tank player.
fn try_taunt(ctx: &mut BotContext, target: Entity) -> bool {
    let Some(victim_of_target) = ctx
        .unit(target)
        .and_then(|t| t.victim)
        .and_then(|v| ctx.unit(v))
    else {
        return false;
    };
    if !victim_of_target.is_player()
        || victim_of_target.entity == ctx.me.entity
        || ctx.is_tank(&victim_of_target)
    {
        return false;
    }
    let taunts = ctx.state.loadout.taunts.clone();
    taunts.into_iter().any(|taunt| ctx.try_cast(target, taunt))
}
