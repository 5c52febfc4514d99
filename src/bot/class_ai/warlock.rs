//! Warlock AI
//!
//! Armor and a demon out of combat. In combat the warlock keeps its dots
//! and curse rolling, banishes a second target now and then, and fills
//! with Shadow Bolt; Life Tap and Dark Pact when mana runs dry.

use bevy::prelude::*;

use crate::bot::abilities::AbilityId;
use crate::bot::character::CharacterClass;
use crate::bot::choice::{choose_present, choose_weighted};
use crate::bot::context::BotContext;
use crate::bot::loadout::Loadout;
use crate::bot::slot_table::Slot;

use super::mage::SHOOT;
use super::{finish_buff_round, try_auto_repeat, try_group_buff, ClassBehavior, PopulateInput};

/// Demonic Sacrifice buff from a sacrificed Voidwalker.
pub const TOUCH_OF_SHADOW: AbilityId = AbilityId(18791);

/// Banish is not recast on a new target for this long.
const BANISH_INTERVAL_MS: u32 = 15_000;

pub struct WarlockBehavior;

impl ClassBehavior for WarlockBehavior {
    fn class(&self) -> CharacterClass {
        CharacterClass::Warlock
    }

    fn populate_abilities(&self, loadout: &mut Loadout, input: PopulateInput) {
        let curse = choose_present(
            &[loadout.get(Slot::CurseOfShadow), loadout.get(Slot::CurseOfTheElements)],
            input.rng,
        );
        loadout.set(Slot::RaidCurse, curse);

        if !loadout.has(Slot::DemonArmor) {
            let skin = loadout.get(Slot::DemonSkin);
            loadout.set(Slot::DemonArmor, skin);
        }

        let imp = loadout.get(Slot::SummonImp);
        let demon = if loadout.has(Slot::DemonicSacrifice) {
            loadout.get(Slot::SummonSuccubus).or(imp)
        } else if input.me.in_instance {
            imp
        } else {
            let weighted: Vec<(AbilityId, u32)> = [
                (imp, 3),
                (loadout.get(Slot::SummonFelhunter), 1),
                (loadout.get(Slot::SummonSuccubus), 1),
            ]
            .into_iter()
            .filter_map(|(demon, weight)| demon.map(|d| (d, weight)))
            .collect();
            choose_weighted(&weighted, input.rng).or(imp)
        };
        loadout.set(Slot::Demon, demon);
    }

    fn update_out_of_combat(&self, ctx: &mut BotContext) -> bool {
        if !ctx.in_raid() && try_group_buff(ctx, Slot::DetectInvisibility) {
            return true;
        }

        if ctx.try_self(Slot::DemonArmor) {
            ctx.state.is_buffing = true;
            return true;
        }

        finish_buff_round(ctx, Slot::DetectInvisibility);

        let me = ctx.me.entity;
        if ctx.has_aura(me, TOUCH_OF_SHADOW) {
            return false;
        }

        if sacrifice_demon(ctx) {
            return true;
        }
        self.summon_pet(ctx)
    }

    fn update_in_combat(&self, ctx: &mut BotContext) -> bool {
        let Some(victim) = ctx.victim() else {
            return false;
        };
        let me = ctx.me.entity;

        if ctx.me.health_pct() < 65.0
            && victim.victim == Some(me)
            && victim.can_reach_with_melee(&ctx.me)
            && ctx.try_slot(victim.entity, Slot::DeathCoil)
        {
            return true;
        }

        if let Some(pet) = ctx.me.pet.and_then(|p| ctx.unit(p)) {
            if pet.is_alive() && pet.victim.is_none() && !ctx.me.in_instance {
                ctx.commands.request_pet_attack(me, victim.entity);
            }
        }

        if ctx.me.health_pct() < 30.0
            && ctx.attackers_in_range_count(10.0) > 1
            && ctx.try_self(Slot::HowlOfTerror)
        {
            return true;
        }

        if victim.health_pct() < 10.0 && ctx.try_slot(victim.entity, Slot::Shadowburn) {
            return true;
        }

        if try_banish(ctx, victim.entity) {
            return true;
        }

        if ctx.aoe_ready()
            && ctx.enemies_near_unit(&victim, 10.0) > 3
            && victim.health_pct() < 75.0
            && ctx.try_slot(victim.entity, Slot::RainOfFire)
        {
            return true;
        }

        if sacrifice_demon(ctx) {
            return true;
        }

        if ctx.in_raid() && ctx.try_slot(victim.entity, Slot::RaidCurse) {
            return true;
        }

        if ctx.try_slot(victim.entity, Slot::Immolate) || ctx.try_slot(victim.entity, Slot::Corruption) {
            return true;
        }

        if ctx.me.health_pct() < 80.0 && ctx.try_slot(victim.entity, Slot::SiphonLife) {
            return true;
        }

        if !ctx.in_raid() {
            let tongues = victim.is_caster().then(|| ctx.slot(Slot::CurseOfTongues)).flatten();
            match tongues {
                Some(tongues) => {
                    if ctx.try_cast(victim.entity, tongues) {
                        return true;
                    }
                }
                None => {
                    if ctx.try_slot(victim.entity, Slot::CurseOfAgony) {
                        return true;
                    }
                }
            }
        }

        if ctx.me.health_pct() < 50.0 && ctx.try_slot(victim.entity, Slot::DrainLife) {
            return true;
        }

        if ctx.try_slot(victim.entity, Slot::Conflagrate) {
            return true;
        }

        if victim.victim == Some(me) && ctx.try_slot(victim.entity, Slot::Fear) {
            return true;
        }

        if victim.health_pct() < 20.0 && ctx.try_slot(victim.entity, Slot::SearingPain) {
            return true;
        }

        if ctx.try_slot(victim.entity, Slot::ShadowBolt) {
            return true;
        }

        if ctx.me.power_pct() < 10.0 {
            if ctx.me.health_pct() > 70.0 && ctx.try_self(Slot::LifeTap) {
                return true;
            }
            if ctx.try_self(Slot::DarkPact) {
                return true;
            }
        }

        ctx.book.knows(me, SHOOT) && try_auto_repeat(ctx, SHOOT)
    }

    fn crowd_control_ability(&self, ctx: &BotContext) -> Option<AbilityId> {
        ctx.slot(Slot::Banish).or_else(|| ctx.slot(Slot::Fear))
    }

    fn summon_pet(&self, ctx: &mut BotContext) -> bool {
        if let Some(pet) = ctx.me.pet.and_then(|p| ctx.unit(p)) {
            if pet.is_alive() {
                return false;
            }
        }

        let sacrifice = ctx.loadout().has(Slot::DemonicSacrifice);
        let demon = if !sacrifice && ctx.me.in_instance {
            ctx.slot(Slot::SummonImp)
        } else {
            ctx.slot(Slot::Demon)
        };
        let Some(demon) = demon else {
            return false;
        };
        let me = ctx.me.entity;
        if ctx.try_cast(me, demon) {
            debug!("{:?} summoning demon {:?}", me, demon);
            return true;
        }
        false
    }
}

/// Sacrifice a living demon for its buff.
fn sacrifice_demon(ctx: &mut BotContext) -> bool {
    let Some(pet) = ctx.me.pet.and_then(|p| ctx.unit(p)) else {
        return false;
    };
    pet.is_alive() && ctx.try_slot(pet.entity, Slot::DemonicSacrifice)
}

/// Banish a random other hostile near the victim, at most once per interval.
fn try_banish(ctx: &mut BotContext, victim: Entity) -> bool {
    let Some(banish) = ctx.slot(Slot::Banish) else {
        return false;
    };
    if ctx.state.spell_throttle.is_running() {
        return false;
    }
    let Some(target) = ctx.select_spell_target_different_from(banish, Some(victim), 20.0) else {
        return false;
    };
    if ctx.do_cast(target, banish).is_ok() {
        ctx.state.spell_throttle.set(BANISH_INTERVAL_MS);
        return true;
    }
    false
}
