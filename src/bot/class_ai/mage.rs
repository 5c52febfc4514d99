//! Mage AI
//!
//! Intellect and armor out of combat. In combat: decurse, defensive
//! cooldowns when attacked, area spells on packs, Polymorph on a second
//! attacker, then a talent-driven single-target nuke.

use crate::bot::abilities::AbilityId;
use crate::bot::character::CharacterClass;
use crate::bot::choice::choose_present;
use crate::bot::context::BotContext;
use crate::bot::loadout::Loadout;
use crate::bot::movement::{flee, DEFAULT_FLEE_DISTANCE};
use crate::bot::slot_table::{Slot, Talent};
use crate::bot::world::WorldQueryExt;

use super::{finish_buff_round, try_auto_repeat, try_dispel, try_group_buff, ClassBehavior, PopulateInput};

/// Wand auto-repeat.
pub const SHOOT: AbilityId = AbilityId(5019);

/// Fire Vulnerability, stacked by Improved Scorch.
const FIRE_VULNERABILITY: AbilityId = AbilityId(22959);
const FIRE_VULNERABILITY_MAX_STACKS: u32 = 5;

pub struct MageBehavior;

impl ClassBehavior for MageBehavior {
    fn class(&self) -> CharacterClass {
        CharacterClass::Mage
    }

    fn populate_abilities(&self, loadout: &mut Loadout, input: PopulateInput) {
        if !loadout.has(Slot::IceArmor) {
            let frost_armor = loadout.get(Slot::FrostArmor);
            loadout.set(Slot::IceArmor, frost_armor);
        }

        let polymorph = choose_present(
            &[
                loadout.get(Slot::PolymorphSheep),
                loadout.get(Slot::PolymorphCow),
                loadout.get(Slot::PolymorphPig),
                loadout.get(Slot::PolymorphTurtle),
            ],
            input.rng,
        );
        loadout.set(Slot::Polymorph, polymorph);
    }

    fn update_out_of_combat(&self, ctx: &mut BotContext) -> bool {
        let intellect = if ctx.loadout().has(Slot::ArcaneBrilliance) {
            Slot::ArcaneBrilliance
        } else {
            Slot::ArcaneIntellect
        };
        if try_group_buff(ctx, intellect) {
            return true;
        }

        if ctx.try_self(Slot::IceArmor) {
            ctx.state.is_buffing = true;
            return true;
        }

        finish_buff_round(ctx, Slot::ArcaneIntellect);

        try_dispel(ctx, Slot::RemoveLesserCurse)
    }

    fn update_in_combat(&self, ctx: &mut BotContext) -> bool {
        if try_dispel(ctx, Slot::RemoveLesserCurse) {
            return true;
        }

        let Some(victim) = ctx.victim() else {
            return false;
        };
        let me = ctx.me.entity;

        let presence_of_mind = ctx
            .slot(Slot::PresenceOfMind)
            .map(|pom| ctx.has_aura(me, pom))
            .unwrap_or(false);
        let opener = !victim.in_combat
            && victim.max_health > ctx.me.max_health
            && ctx.me.distance_to(&victim) > 30.0;
        if (presence_of_mind || opener) && ctx.try_slot(victim.entity, Slot::Pyroblast) {
            return true;
        }

        if ctx.me.health_pct() < 10.0 && ctx.try_self(Slot::IceBlock) {
            return true;
        }

        if !ctx.attackers().is_empty() && ctx.try_self(Slot::IceBarrier) {
            return true;
        }

        if ctx.attackers_in_range_count(10.0) > 1 {
            if ctx.me.power_pct() > 20.0 && ctx.try_self(Slot::ManaShield) {
                return true;
            }

            if (ctx.me.rooted || ctx.me.snared) && ctx.try_self(Slot::Blink) {
                return true;
            }

            if !ctx.me.rooted && !victim.lost_control {
                if let Some(nova) = ctx.slot(Slot::FrostNova) {
                    if ctx.has_aura_any_rank(victim.entity, nova) {
                        if victim.can_reach_with_melee(&ctx.me) {
                            flee(ctx, &victim, DEFAULT_FLEE_DISTANCE, true);
                            return true;
                        }
                    } else if !victim.rooted && ctx.can_attempt(me, nova) && ctx.do_cast(me, nova).is_ok() {
                        return true;
                    }
                }
            }
        }

        if ctx.enemies_near(10.0) > 2 && ctx.aoe_ready() {
            let improved_explosion = ctx.loadout().has_talent(Talent::ImprovedArcaneExplosion);
            if improved_explosion && ctx.try_self(Slot::ArcaneExplosion) {
                return true;
            }
            if ctx.try_self(Slot::BlastWave) {
                return true;
            }
            if let Some(cone) = ctx.slot(Slot::ConeOfCold) {
                if ctx.can_attempt(me, cone) && ctx.do_cast(victim.entity, cone).is_ok() {
                    return true;
                }
            }
            if ctx.try_self(Slot::ArcaneExplosion) {
                return true;
            }
        }

        if victim.casting && ctx.try_slot(victim.entity, Slot::Counterspell) {
            return true;
        }

        if ctx.enemies_near_unit(&victim, 10.0) > 3 && ctx.aoe_ready() && victim.health_pct() < 75.0 {
            if ctx.loadout().has_talent(Talent::ImprovedArcaneExplosion) {
                if let Some(explosion) = ctx.slot(Slot::ArcaneExplosion) {
                    if ctx.is_ready(explosion)
                        && ctx.me.distance_to(&victim) > 5.0
                        && ctx.me.chasing != Some(victim.entity)
                    {
                        ctx.commands.request_chase(me, victim.entity, 5.0);
                        return true;
                    }
                }
            }
            if ctx.loadout().has_talent(Talent::ImprovedFlamestrike)
                && ctx.try_slot(victim.entity, Slot::Flamestrike)
            {
                return true;
            }
            if ctx.try_slot(victim.entity, Slot::Blizzard) {
                return true;
            }
        }

        if let Some(polymorph) = ctx.slot(Slot::Polymorph) {
            let second = ctx
                .select_attacker_different_from(Some(victim.entity))
                .and_then(|a| ctx.unit(a));
            if let Some(target) = second {
                if target.health_pct() > 20.0
                    && ctx.can_use_crowd_control(polymorph, target.entity)
                    && ctx.try_cast(target.entity, polymorph)
                {
                    return true;
                }
            }
        }

        if ctx.try_slot(victim.entity, Slot::Combustion) {
            return true;
        }

        if ctx.me.power_pct() > 20.0 && ctx.try_self(Slot::ArcanePower) {
            return true;
        }

        if ctx.try_self(Slot::PresenceOfMind) {
            return true;
        }

        if ctx.loadout().has_talent(Talent::ImprovedFireball) {
            if ctx.try_slot(victim.entity, Slot::FireBlast) {
                return true;
            }

            let vulnerability = ctx.world.aura_stacks(victim.entity, FIRE_VULNERABILITY);
            let scorch = victim.health_pct() < 10.0
                || (ctx.loadout().has_talent(Talent::ImprovedScorch)
                    && vulnerability < FIRE_VULNERABILITY_MAX_STACKS);
            if scorch && ctx.try_slot(victim.entity, Slot::Scorch) {
                return true;
            }

            if ctx.try_slot_stack(victim.entity, Slot::Fireball, 2) {
                return true;
            }
        }

        if ctx.loadout().has_talent(Talent::ImprovedArcaneMissiles)
            && ctx.try_slot_stack(victim.entity, Slot::ArcaneMissiles, 2)
        {
            return true;
        }

        if ctx.try_slot_stack(victim.entity, Slot::Frostbolt, 2)
            || ctx.try_slot_stack(victim.entity, Slot::Fireball, 2)
        {
            return true;
        }

        if ctx.me.power_pct() < 30.0
            && ctx.attackers_in_range_count(10.0) == 0
            && ctx.try_self(Slot::Evocation)
        {
            return true;
        }

        ctx.book.knows(me, SHOOT) && try_auto_repeat(ctx, SHOOT)
    }

    fn crowd_control_ability(&self, ctx: &BotContext) -> Option<AbilityId> {
        ctx.slot(Slot::Polymorph)
    }
}
