//! Session Hooks
//!
//! Entry points the host's session layer calls for a bot-controlled agent.
//! Protocol messages addressed to the agent are answered by pushing an
//! `OutboundCommand` onto the agent's queue; the transport drains it.

use bevy::prelude::*;

use super::agent::PartyBot;
use super::commands::{CommandSink, OutboundCommand};
use super::world::{AbilityBook, WorldQuery};

/// Trade window states the agent reacts to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TradeStatus {
    Begin,
    Accept,
    Cancel,
}

/// Messages delivered to a bot-controlled agent.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SessionMessage {
    ResurrectRequest { caster: Entity },
    LootStartRoll { roll_id: u32 },
    TradeStatus(TradeStatus),
    /// Moved by a near teleport.
    Teleport,
    /// Moved to another map.
    NewWorld,
    BattlegroundStatus { invited: bool },
}

/// The agent (re)entered the world. Everything but the random stream and
/// the marker lists is forgotten.
pub fn on_login(bot: &mut PartyBot) {
    debug!("{:?} logged in", bot.entity());
    bot.reset();
}

/// Per-frame tick.
pub fn on_tick(
    bot: &mut PartyBot,
    elapsed: u32,
    world: &dyn WorldQuery,
    book: &dyn AbilityBook,
    commands: &mut dyn CommandSink,
) {
    bot.update(elapsed, world, book, commands);
}

/// Answer a protocol message. `in_battleground` is the agent's own state;
/// an invite received inside a battleground is ignored.
pub fn on_message(bot: &mut PartyBot, message: SessionMessage, in_battleground: bool) {
    let reply = match message {
        SessionMessage::ResurrectRequest { caster } => Some(OutboundCommand::AcceptResurrect { caster }),
        SessionMessage::LootStartRoll { roll_id } => Some(OutboundCommand::PassLootRoll { roll_id }),
        SessionMessage::TradeStatus(TradeStatus::Begin) => Some(OutboundCommand::BeginTrade),
        SessionMessage::TradeStatus(TradeStatus::Accept) => Some(OutboundCommand::AcceptTrade),
        SessionMessage::TradeStatus(TradeStatus::Cancel) => None,
        SessionMessage::Teleport => Some(OutboundCommand::TeleportAck),
        SessionMessage::NewWorld => Some(OutboundCommand::WorldPortAck),
        SessionMessage::BattlegroundStatus { invited } => {
            bot.state_mut().battleground_invite = invited && !in_battleground;
            None
        }
    };

    if let Some(reply) = reply {
        debug!("{:?} answering {:?} with {:?}", bot.entity(), message, reply);
        bot.outbound().push(reply);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::character::CharacterClass;
    use crate::bot::rng::BotRng;
    use crate::bot::role::Role;
    use crate::bot::slot_table::SlotTable;
    use std::sync::Arc;

    fn bot() -> PartyBot {
        PartyBot::new(
            Entity::from_raw(1),
            CharacterClass::Warrior,
            Entity::from_raw(2),
            Some(Role::Tank),
            Arc::new(SlotTable::from_ron_str("(version: 1, bindings: {})", "inline").unwrap()),
            BotRng::from_seed(7),
        )
    }

    #[test]
    fn test_trade_cancel_is_not_answered() {
        let mut bot = bot();
        on_message(&mut bot, SessionMessage::TradeStatus(TradeStatus::Cancel), false);
        assert!(bot.outbound().is_empty());
    }

    #[test]
    fn test_invite_inside_battleground_is_ignored() {
        let mut bot = bot();
        on_message(&mut bot, SessionMessage::BattlegroundStatus { invited: true }, true);
        assert!(!bot.state().battleground_invite);

        on_message(&mut bot, SessionMessage::BattlegroundStatus { invited: true }, false);
        assert!(bot.state().battleground_invite);
    }
}
