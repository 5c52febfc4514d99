//! Encounter Mechanics
//!
//! Per-map rules that override the generic cascade for specific encounters:
//! stepping out of ground effects, keeping distance from bosses, and holding
//! damage until the tank has enough threat.
//!
//! Hooks are looked up by map id with `hook_for_map`, the same way class
//! behaviors are looked up by class. They only run inside instances or raid
//! groups.

use bevy::prelude::*;

use super::abilities::AbilityId;
use super::context::BotContext;
use super::coordination::check_threat;
use super::movement::{flee, flee_area, flee_object};
use super::role::Role;
use super::world::{UnitInfo, WorldQueryExt};

/// What the encounter rules decided for this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MechanicsVerdict {
    /// False: the hook took this tick's action (usually a move); stop here.
    pub proceed: bool,
    /// False: survival actions are fine, but do not engage the target.
    pub engage: bool,
}

impl MechanicsVerdict {
    pub const CONTINUE: MechanicsVerdict = MechanicsVerdict { proceed: true, engage: true };
    pub const STOP: MechanicsVerdict = MechanicsVerdict { proceed: false, engage: true };
}

/// Encounter rules for one map.
pub trait MechanicsHook {
    fn map_id(&self) -> u32;

    /// `target` is the unit the agent is working on (the healer's chosen
    /// attack target, everyone else's victim).
    fn evaluate(&self, ctx: &mut BotContext, target: Option<UnitInfo>) -> MechanicsVerdict;
}

/// Hook registered for a map, if any.
pub fn hook_for_map(map_id: u32) -> Option<Box<dyn MechanicsHook>> {
    match map_id {
        molten_core::MAP_ID => Some(Box::new(molten_core::MoltenCore)),
        _ => None,
    }
}

/// Run the encounter rules for the agent's current map.
pub fn check_mechanics(ctx: &mut BotContext) -> MechanicsVerdict {
    if !(ctx.me.in_instance || ctx.in_raid()) {
        return MechanicsVerdict::CONTINUE;
    }
    let Some(hook) = hook_for_map(ctx.me.map_id) else {
        return MechanicsVerdict::CONTINUE;
    };

    let target = if ctx.role() == Role::Healer {
        ctx.select_attack_target().and_then(|t| ctx.unit(t))
    } else {
        ctx.victim()
    };

    let verdict = hook.evaluate(ctx, target);
    if verdict != MechanicsVerdict::CONTINUE {
        debug!("{:?} encounter rules on map {}: {:?}", ctx.me.entity, hook.map_id(), verdict);
    }
    verdict
}

/// Damage dealers hold back while their threat is too close to the tank's.
fn dps_threat_gate(ctx: &mut BotContext, target: &UnitInfo) -> bool {
    match ctx.role() {
        Role::MeleeDps | Role::RangeDps => check_threat(ctx, target.entity),
        _ => true,
    }
}

pub mod molten_core {
    use super::*;
    use bevy::math::Vec3;

    pub const MAP_ID: u32 = 409;

    /// Magmadar's fire bomb object.
    pub const FIRE_BOMB: u32 = 177704;
    /// Gehennas' Rain of Fire.
    pub const RAIN_OF_FIRE: AbilityId = AbilityId(19717);
    /// Baron Geddon's Living Bomb.
    pub const LIVING_BOMB: AbilityId = AbilityId(20475);
    /// Baron Geddon's Inferno.
    pub const INFERNO: AbilityId = AbilityId(19695);

    pub const GARR: u32 = 12057;
    pub const BARON_GEDDON: u32 = 12056;
    /// Targets where damage dealers wait for the tank's threat.
    pub const THREAT_GATED: [u32; 7] = [12119, 11664, 12259, 12118, 11658, 11982, 12264];

    /// Where Living Bomb carriers go to explode.
    pub const BOMB_DROP: (f32, f32) = (680.0, -810.0);

    pub struct MoltenCore;

    impl MechanicsHook for MoltenCore {
        fn map_id(&self) -> u32 {
            MAP_ID
        }

        fn evaluate(&self, ctx: &mut BotContext, target: Option<UnitInfo>) -> MechanicsVerdict {
            let bombs = ctx.world.objects_near(ctx.me.position, 10.0, FIRE_BOMB);
            if !bombs.is_empty() {
                let hazards = ctx.world.objects_near(ctx.me.position, 25.0, FIRE_BOMB);
                flee_object(ctx, &hazards, 12.5);
                return MechanicsVerdict::STOP;
            }

            if ctx.world.has_aura(ctx.me.entity, RAIN_OF_FIRE) {
                flee_area(ctx, 12.0);
                return MechanicsVerdict::STOP;
            }

            if ctx.world.has_aura(ctx.me.entity, LIVING_BOMB) {
                let destination = Vec3::new(BOMB_DROP.0, BOMB_DROP.1, ctx.me.position.z);
                ctx.commands.request_stop_movement(ctx.me.entity);
                ctx.commands.request_move(ctx.me.entity, destination);
                return MechanicsVerdict::STOP;
            }

            let Some(target) = target else {
                return MechanicsVerdict::CONTINUE;
            };

            let mut verdict = MechanicsVerdict::CONTINUE;
            let role = ctx.role();
            let distance = ctx.me.distance_to(&target);

            if target.entry == GARR {
                verdict.engage = dps_threat_gate(ctx, &target);
                ctx.state.aoe_throttle.set(30_000);
                if matches!(role, Role::RangeDps | Role::Healer) && distance < 20.0 {
                    flee(ctx, &target, 25.0, true);
                    return MechanicsVerdict { proceed: false, ..verdict };
                }
            } else if THREAT_GATED.contains(&target.entry) {
                verdict.engage = dps_threat_gate(ctx, &target);
            } else if target.entry == BARON_GEDDON {
                if role == Role::Tank {
                    return MechanicsVerdict::CONTINUE;
                }
                verdict.engage = dps_threat_gate(ctx, &target);

                if ctx.world.has_aura(target.entity, INFERNO) || target.health_pct() < 2.5 {
                    if distance < 22.0 {
                        flee(ctx, &target, 25.0, false);
                        return MechanicsVerdict { proceed: false, ..verdict };
                    }
                    if role == Role::MeleeDps {
                        return MechanicsVerdict { proceed: false, engage: false };
                    }
                }

                if matches!(role, Role::RangeDps | Role::Healer) && distance < 20.0 {
                    flee(ctx, &target, 25.0, true);
                    return MechanicsVerdict { proceed: false, ..verdict };
                }
            }

            verdict
        }
    }
}
