//! Hunter AI
//!
//! Ranged rotation around Auto Shot with traps, stings and shots; melee
//! abilities and a step back out when something closes in.

use crate::bot::abilities::AbilityId;
use crate::bot::character::CharacterClass;
use crate::bot::choice::choose_one;
use crate::bot::context::BotContext;
use crate::bot::movement::{flee, DEFAULT_FLEE_DISTANCE};
use crate::bot::role::Role;
use crate::bot::slot_table::Slot;
use crate::bot::world::CreatureType;

use super::ClassBehavior;

pub const AUTO_SHOT: AbilityId = AbilityId(75);
pub const REVIVE_PET: AbilityId = AbilityId(982);

/// Auto Shot and most shots do not work inside this range.
pub const DEAD_ZONE: f32 = 8.0;

/// Hunters tame their first pet at this level.
pub const PET_LEVEL: u32 = 10;

pub struct HunterBehavior;

impl ClassBehavior for HunterBehavior {
    fn class(&self) -> CharacterClass {
        CharacterClass::Hunter
    }

    fn update_out_of_combat(&self, ctx: &mut BotContext) -> bool {
        if ctx.try_self(Slot::AspectOfTheHawk) {
            return true;
        }

        if ctx.try_self(Slot::TrueshotAura) {
            ctx.state.is_buffing = true;
            return true;
        }

        self.summon_pet(ctx)
    }

    fn update_in_combat(&self, ctx: &mut BotContext) -> bool {
        let Some(victim) = ctx.victim() else {
            return false;
        };
        let me = ctx.me.entity;
        let distance = ctx.me.combat_distance_to(&victim);

        if !ctx.me.auto_repeating && ctx.me.distance_to(&victim) <= 30.0 {
            let traps: Vec<AbilityId> = ctx
                .loadout()
                .present(&[
                    Slot::FrostTrap,
                    Slot::FreezingTrap,
                    Slot::ImmolationTrap,
                    Slot::ExplosiveTrap,
                ])
                .into_iter()
                .filter(|t| ctx.can_attempt(me, *t))
                .collect();
            if let Some(trap) = choose_one(&traps, &mut ctx.state.rng) {
                if ctx.do_cast(me, trap).is_ok() {
                    return true;
                }
            }
        }

        if let Some(pet) = ctx.me.pet.and_then(|p| ctx.unit(p)) {
            if pet.is_alive() && pet.victim != Some(victim.entity) {
                ctx.commands.request_pet_attack(me, victim.entity);
            }
        }

        if ctx.try_slot(victim.entity, Slot::HuntersMark) {
            return true;
        }

        if ctx.me.auto_repeating && distance < DEAD_ZONE {
            ctx.commands.request_stop_auto_repeat(me);
            ctx.me.auto_repeating = false;
        }

        if ctx.book.knows(me, AUTO_SHOT)
            && !ctx.me.moving
            && distance >= DEAD_ZONE
            && !ctx.me.auto_repeating
            && ctx.can_attempt(victim.entity, AUTO_SHOT)
            && ctx.do_cast(victim.entity, AUTO_SHOT).is_ok()
        {
            ctx.me.auto_repeating = true;
            return true;
        }

        if victim.enraged && ctx.try_slot(victim.entity, Slot::TranquilizingShot) {
            return true;
        }

        if ctx.aoe_ready()
            && victim.health_pct() < 75.0
            && ctx.enemies_near_unit(&victim, 10.0) > 3
            && ctx.try_slot(victim.entity, Slot::Volley)
        {
            return true;
        }

        if victim.moving && !victim.rooted && !victim.snared {
            if ctx.try_slot(victim.entity, Slot::ConcussiveShot)
                || ctx.try_slot(victim.entity, Slot::Intimidation)
            {
                return true;
            }
        }

        if ctx.try_self(Slot::BestialWrath) {
            return true;
        }

        if victim.health > 2 * ctx.me.max_health && ctx.try_self(Slot::RapidFire) {
            return true;
        }

        if victim.is_caster() && victim.power_pct() > 10.0 {
            if ctx.try_slot(victim.entity, Slot::ViperSting) {
                return true;
            }
        } else if ctx.try_slot(victim.entity, Slot::SerpentSting) {
            return true;
        }

        if ctx.try_slot(victim.entity, Slot::ArcaneShot) {
            return true;
        }

        if ctx.aoe_ready() && ctx.try_slot(victim.entity, Slot::MultiShot) {
            return true;
        }

        if ctx.try_slot(victim.entity, Slot::AimedShot) {
            return true;
        }

        if ctx.attackers_in_range_count(DEAD_ZONE) > 0 {
            if let Some(attacker) = ctx.attackers().first().and_then(|a| ctx.unit(*a)) {
                if ctx.me.health_pct() < 50.0 && ctx.try_self(Slot::Deterrence) {
                    return true;
                }
                if ctx.me.health_pct() < 15.0 && ctx.try_self(Slot::FeignDeath) {
                    return true;
                }
                if ctx.try_slot(attacker.entity, Slot::Disengage) {
                    return true;
                }
                if ctx.try_self(Slot::AspectOfTheMonkey) {
                    return true;
                }
                if attacker.creature_type == CreatureType::Beast
                    && ctx.try_slot(attacker.entity, Slot::ScareBeast)
                {
                    return true;
                }
            }
        }

        if victim.can_reach_with_melee(&ctx.me) {
            let melee = [
                Slot::Counterattack,
                Slot::WingClip,
                Slot::MongooseBite,
                Slot::RaptorStrike,
            ];
            if melee.into_iter().any(|slot| ctx.try_slot(victim.entity, slot)) {
                return true;
            }
        } else if ctx.try_self(Slot::AspectOfTheHawk) {
            return true;
        }

        if !ctx.me.rooted && distance < DEAD_ZONE && ctx.role() != Role::MeleeDps {
            flee(ctx, &victim, DEFAULT_FLEE_DISTANCE, true);
            return true;
        }

        false
    }

    fn crowd_control_ability(&self, ctx: &BotContext) -> Option<AbilityId> {
        ctx.slot(Slot::ScareBeast)
    }

    fn summon_pet(&self, ctx: &mut BotContext) -> bool {
        let me = ctx.me.entity;
        if let Some(pet) = ctx.me.pet.and_then(|p| ctx.unit(p)) {
            if pet.is_alive() {
                return false;
            }
            if ctx.book.knows(me, REVIVE_PET) {
                return ctx.try_cast(me, REVIVE_PET);
            }
        }

        if ctx.me.level < PET_LEVEL {
            return false;
        }
        ctx.commands.request_summon_companion(me);
        true
    }
}
