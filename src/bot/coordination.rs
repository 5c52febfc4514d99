//! Group Coordination
//!
//! The little shared knowledge agents use to avoid stepping on each other:
//! who else is working on a target, and whether our threat is safe.

use bevy::prelude::*;

use super::context::BotContext;

/// Threat fraction of the current tank we stay under.
pub const THREAT_MARGIN: f32 = 0.95;

/// Recheck delay after a passing threat check, in ms.
pub const THREAT_RECHECK_OK_MS: u32 = 1000;

/// Recheck delay after a failing threat check, in ms.
pub const THREAT_RECHECK_BAD_MS: u32 = 300;

/// Roster members, other than the agent and the target itself, that have
/// `target` selected and are actively working on it (swinging or casting).
pub fn others_on_same_target(ctx: &BotContext, target: Entity) -> usize {
    let Some(group) = &ctx.group else {
        return 0;
    };
    group
        .members
        .iter()
        .filter(|m| **m != ctx.me.entity && **m != target)
        .filter_map(|m| ctx.world.unit(*m))
        .filter(|m| m.target == Some(target) && (m.melee_attacking || m.casting))
        .count()
}

/// Whether attacking `target` keeps us safely below its current victim's
/// threat. The answer is cached until the recheck timer expires.
pub fn check_threat(ctx: &mut BotContext, target: Entity) -> bool {
    if ctx.state.threat_check.is_running() {
        return ctx.state.threat_ok;
    }

    let mine = ctx.world.threat(target, ctx.me.entity);
    let current = ctx
        .world
        .unit(target)
        .and_then(|t| t.victim)
        .map(|victim| ctx.world.threat(target, victim) * THREAT_MARGIN)
        .unwrap_or(0.0);

    let ok = current > mine;
    ctx.state.threat_ok = ok;
    ctx.state
        .threat_check
        .set(if ok { THREAT_RECHECK_OK_MS } else { THREAT_RECHECK_BAD_MS });

    if !ok {
        debug!("{:?} holding back on {:?}: threat {} vs {}", ctx.me.entity, target, mine, current);
    }
    ok
}
